use creme_dom::{
	attrs, computed,
	html::{br, div, img},
	AttributeValue, EventListener, Patcher, Result,
};

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
	OpenStart {
		tag: String,
		key: Option<String>,
		statics: Vec<(String, AttributeValue)>,
	},
	Attribute(String, AttributeValue),
	Listen(String),
	OpenEnd(String),
	Close(String),
	Text(String),
	VoidTag {
		tag: String,
		key: Option<String>,
		statics: Vec<(String, AttributeValue)>,
	},
}

/// Records every call instead of touching a tree.
#[derive(Default)]
struct Recorder {
	calls: Vec<Call>,
	transactions: usize,
}

impl Recorder {
	fn take(&mut self) -> Vec<Call> {
		std::mem::take(&mut self.calls)
	}

	fn next_node(&self) -> usize {
		self.calls.len()
	}
}

impl Patcher for Recorder {
	type Node = usize;
	type Target = ();

	fn patch<T>(&mut self, _target: &(), render: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		self.transactions += 1;
		render(self)
	}

	fn open_start(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> usize {
		let node = self.next_node();
		self.calls.push(Call::OpenStart {
			tag: tag.to_owned(),
			key: key.map(ToOwned::to_owned),
			statics: statics.to_vec(),
		});
		node
	}

	fn attribute(&mut self, name: &str, value: &AttributeValue) {
		self.calls.push(Call::Attribute(name.to_owned(), value.clone()));
	}

	fn listen(&mut self, event: &str, _listener: &EventListener) {
		self.calls.push(Call::Listen(event.to_owned()));
	}

	fn open_end(&mut self, tag: &str) {
		self.calls.push(Call::OpenEnd(tag.to_owned()));
	}

	fn close(&mut self, tag: &str) {
		self.calls.push(Call::Close(tag.to_owned()));
	}

	fn text(&mut self, text: &str) {
		self.calls.push(Call::Text(text.to_owned()));
	}

	fn void_tag(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> usize {
		let node = self.next_node();
		self.calls.push(Call::VoidTag {
			tag: tag.to_owned(),
			key: key.map(ToOwned::to_owned),
			statics: statics.to_vec(),
		});
		node
	}
}

fn attribute(name: &str, value: impl Into<AttributeValue>) -> Call {
	Call::Attribute(name.to_owned(), value.into())
}

fn class_x() -> Vec<(String, AttributeValue)> {
	vec![("class".to_owned(), AttributeValue::from("x"))]
}

#[test]
fn element_call_sequence() {
	init_logging();

	let element = div::<()>((
		attrs()
			.key("k")
			.statics(vec![("class", "x")])
			.attr("title", "t")
			.on("click", |_| ())
			.id("main")
			.computed_value("role", "r"),
		computed(|_: &()| "text"),
	));

	let mut recorder = Recorder::default();
	element.patch_into(&mut recorder, &(), &()).unwrap();
	assert_eq!(recorder.transactions, 1);
	assert_eq!(
		recorder.take(),
		vec![
			Call::OpenStart {
				tag: "div".to_owned(),
				key: Some("k".to_owned()),
				statics: class_x(),
			},
			attribute("role", "r"),
			attribute("id", "main"),
			attribute("title", "t"),
			Call::Listen("click".to_owned()),
			Call::OpenEnd("div".to_owned()),
			Call::Text("text".to_owned()),
			Call::Close("div".to_owned()),
		]
	);
}

#[test]
fn plain_attributes_are_sent_on_every_render() {
	init_logging();

	let element = div::<()>(attrs().key("k").statics(vec![("class", "x")]).attr("title", "t"));
	let mut recorder = Recorder::default();
	element.patch_into(&mut recorder, &(), &()).unwrap();
	element.patch_into(&mut recorder, &(), &()).unwrap();

	let calls = recorder.take();
	assert_eq!(calls.iter().filter(|call| **call == attribute("title", "t")).count(), 2);
	assert!(calls.iter().all(|call| match call {
		Call::Attribute(name, _) => name != "class",
		_ => true,
	}));
	assert_eq!(calls.iter().filter(|call| matches!(call, Call::OpenStart { statics, .. } if *statics == class_x())).count(), 2);
}

#[test]
fn static_void_elements_use_void_tag() {
	init_logging();

	let mut recorder = Recorder::default();
	let node = br::<()>(attrs().key("b").statics(vec![("class", "x")])).patch_into(&mut recorder, &(), &()).unwrap();
	assert_eq!(node, 0);
	assert_eq!(
		recorder.take(),
		vec![Call::VoidTag {
			tag: "br".to_owned(),
			key: Some("b".to_owned()),
			statics: class_x(),
		}]
	);

	br::<()>(()).patch_into(&mut recorder, &(), &()).unwrap();
	assert_eq!(
		recorder.take(),
		vec![Call::VoidTag {
			tag: "br".to_owned(),
			key: None,
			statics: vec![],
		}]
	);
}

#[test]
fn dynamic_void_elements_are_opened_and_closed() {
	init_logging();

	let mut recorder = Recorder::default();
	img::<()>(attrs().attr("src", "a")).patch_into(&mut recorder, &(), &()).unwrap();
	assert_eq!(
		recorder.take(),
		vec![
			Call::OpenStart {
				tag: "img".to_owned(),
				key: None,
				statics: vec![],
			},
			attribute("src", "a"),
			Call::OpenEnd("img".to_owned()),
			Call::Close("img".to_owned()),
		]
	);
}
