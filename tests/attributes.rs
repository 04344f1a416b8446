use creme_dom::{
	attributes::{reserved, AttributeValue, Statics},
	attrs, AttributeBag, Error,
};

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

#[test]
fn reserved_names_are_split_off() {
	init_logging();

	let bag = attrs::<()>()
		.attr("class", "a")
		.on("click", |_| ())
		.key("k")
		.statics(vec![("title", "t")])
		.computed("data-x", |_: &()| 1)
		.reference()
		.attr("role", "button");

	let classified = bag.classify().unwrap();
	assert_eq!(classified.key(), Some("k"));
	assert_eq!(classified.statics(), &[("title".to_owned(), AttributeValue::from("t"))]);
	assert_eq!(classified.computed().len(), 1);
	assert_eq!(classified.events().len(), 1);
	assert!(classified.exposes_node());
	assert_eq!(
		classified.plain(),
		&[("class".to_owned(), AttributeValue::from("a")), ("role".to_owned(), AttributeValue::from("button"))]
	);
	assert!(classified.plain().iter().all(|(name, _)| !reserved::is_reserved(name)));
}

#[test]
fn classification_leaves_the_bag_untouched() {
	init_logging();

	let bag = attrs::<()>().key("k").statics(vec![("class", "x")]).attr("title", "t");
	let first = bag.classify().unwrap();
	let second = bag.classify().unwrap();

	assert_eq!(bag.len(), 3);
	assert!(bag.get(reserved::KEY).is_some());
	assert!(bag.get(reserved::STATIC).is_some());
	assert_eq!(first.key(), second.key());
	assert_eq!(first.statics(), second.statics());
	assert_eq!(first.plain(), second.plain());
}

#[test]
fn statics_without_key() {
	init_logging();

	let bag = attrs::<()>().statics(vec![("class", "x")]);
	assert_eq!(bag.classify().unwrap_err(), Error::MissingKey);

	let bag = attrs::<()>().key("").statics(Vec::<(&str, &str)>::new());
	assert_eq!(bag.classify().unwrap_err(), Error::MissingKey);
}

#[test]
fn empty_key_is_absent() {
	let classified = attrs::<()>().key("").classify().unwrap();
	assert_eq!(classified.key(), None);
}

#[test]
fn falsy_keys_are_absent() {
	init_logging();

	for key in vec![AttributeValue::from(false), AttributeValue::from(0), AttributeValue::from(f64::NAN)] {
		let classified = attrs::<()>().attr(reserved::KEY, key.clone()).classify().unwrap();
		assert_eq!(classified.key(), None, "{:?}", key);

		let bag = attrs::<()>().attr(reserved::KEY, key).statics(vec![("class", "x")]);
		assert_eq!(bag.classify().unwrap_err(), Error::MissingKey);
	}

	let classified = attrs::<()>().attr(reserved::KEY, 7).classify().unwrap();
	assert_eq!(classified.key(), Some("7"));
	let classified = attrs::<()>().attr(reserved::KEY, true).classify().unwrap();
	assert_eq!(classified.key(), Some("true"));
}

#[test]
fn flat_statics() {
	init_logging();

	let classified = attrs::<()>().key("k").static_pairs(vec!["class", "x", "title", "t", "dangling"]).classify().unwrap();
	assert_eq!(
		classified.statics(),
		&[("class".to_owned(), AttributeValue::from("x")), ("title".to_owned(), AttributeValue::from("t"))]
	);
}

#[test]
fn wrong_kinds_of_values() {
	init_logging();

	let mut bag = AttributeBag::<()>::new();
	bag.insert(reserved::KEY, Statics::map(vec![("a", "b")]));
	assert_eq!(
		bag.classify().unwrap_err(),
		Error::InvalidAttribute {
			name: reserved::KEY.to_owned(),
			expected: "a value"
		}
	);

	let mut bag = AttributeBag::<()>::new();
	bag.insert("class", Statics::flat(Vec::<&str>::new()));
	assert_eq!(
		bag.classify().unwrap_err(),
		Error::InvalidAttribute {
			name: "class".to_owned(),
			expected: "a value"
		}
	);

	let mut bag = AttributeBag::<()>::new();
	bag.insert(reserved::EVENTS, "click");
	assert!(matches!(bag.classify(), Err(Error::InvalidAttribute { .. })));
}

#[test]
fn insert_keeps_position() {
	let mut bag = attrs::<()>().attr("a", 1).attr("b", 2);
	assert!(bag.insert("a", 3).is_some());

	let classified = bag.classify().unwrap();
	assert_eq!(
		classified.plain(),
		&[("a".to_owned(), AttributeValue::Number(3.0)), ("b".to_owned(), AttributeValue::Number(2.0))]
	);
}

#[test]
fn id_variants() {
	let classified = attrs::<()>().id("main").classify().unwrap();
	assert_eq!(classified.id(), Some("main"));
	assert!(classified.exposes_node());

	let classified = attrs::<()>().id(true).classify().unwrap();
	assert_eq!(classified.id(), None);
	assert!(classified.exposes_node());

	let classified = attrs::<()>().id("").classify().unwrap();
	assert_eq!(classified.id(), None);
	assert!(!classified.exposes_node());
}

#[test]
fn boolean_values() {
	assert_eq!(AttributeValue::from(true).as_dom_value().as_deref(), Some(""));
	assert_eq!(AttributeValue::from(false).as_dom_value(), None);
	assert_eq!(AttributeValue::from(2).as_dom_value().as_deref(), Some("2"));
}
