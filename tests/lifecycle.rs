use creme_dom::{
	attrs, computed,
	html::{div, li, p, span, ul},
	memory::{Dom, NodeId},
	notifications::{LifecycleObserver, NodeRecord},
	Error, Lifecycle, Registry,
};
use std::{cell::RefCell, rc::Rc};

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

type Log = Rc<RefCell<Vec<(bool, NodeId)>>>;

fn recorder(log: &Log) -> impl Fn(Lifecycle<&NodeId>) + 'static {
	let log = Rc::clone(log);
	move |lifecycle| {
		let removed = lifecycle.is_removed();
		log.borrow_mut().push((removed, *lifecycle.into_node()));
	}
}

fn setup() -> (Dom, NodeId, Rc<Registry<NodeId>>) {
	init_logging();

	let registry = Rc::new(Registry::new());
	let mut dom = Dom::new();
	dom.observe(Rc::clone(&registry) as Rc<dyn LifecycleObserver<NodeId>>);
	let root = dom.create_element("main");
	(dom, root, registry)
}

#[test]
fn created_once_then_removed() {
	let (mut dom, root, registry) = setup();
	let log = Log::default();
	let handle = registry.add("item", recorder(&log));

	let item = div::<()>(attrs().key("item"));
	let node = item.patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(*log.borrow(), vec![(false, node)]);

	item.patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(log.borrow().len(), 1);

	span::<()>(()).patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(*log.borrow(), vec![(false, node), (true, node)]);

	assert!(registry.remove(&handle));
	let fresh = dom.create_element("main");
	item.patch_into(&mut dom, &fresh, &()).unwrap();
	assert_eq!(log.borrow().len(), 2);
}

#[test]
fn unkeyed_and_unregistered_nodes_are_skipped() {
	let (mut dom, root, registry) = setup();
	let log = Log::default();
	let _handle = registry.add("registered", recorder(&log));

	div::<()>(vec![span(attrs().key("other")), span(())]).patch_into(&mut dom, &root, &()).unwrap();
	assert!(log.borrow().is_empty());
}

#[test]
fn removal_includes_keyed_descendants() {
	let (mut dom, root, registry) = setup();
	let log = Log::default();
	let _handle = registry.add("inner", recorder(&log));

	let tree = ul::<()>(li(attrs().key("inner")));
	let ul = tree.patch_into(&mut dom, &root, &()).unwrap();
	let inner = dom.first_child(ul).unwrap();

	p::<()>(()).patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(*log.borrow(), vec![(false, inner), (true, inner)]);
}

#[test]
fn stale_handles_do_not_remove_newer_registrations() {
	init_logging();

	let registry = Registry::<NodeId>::new();
	let first = registry.add("k", |_| ());
	let second = registry.add("k", |_| ());
	assert_eq!(registry.len(), 1);

	assert!(!registry.remove(&first));
	assert!(registry.contains("k"));
	assert!(registry.remove(&second));
	assert!(!registry.contains("k"));
	assert!(!registry.remove(&second));
	assert!(registry.is_empty());
}

#[test]
fn callbacks_may_register_more_callbacks() {
	let (mut dom, root, registry) = setup();
	let log = Log::default();

	let _handle = registry.add("a", {
		let registry = Rc::downgrade(&registry);
		let log = Rc::clone(&log);
		move |_| {
			if let Some(registry) = registry.upgrade() {
				let _ = registry.add("b", recorder(&log));
			}
		}
	});

	div::<()>(attrs().key("a")).patch_into(&mut dom, &root, &()).unwrap();
	assert!(registry.contains("b"));
	assert!(log.borrow().is_empty());
}

#[test]
fn aborted_patches_still_report_inserted_nodes() {
	let (mut dom, root, registry) = setup();
	let log = Log::default();
	let _handle = registry.add("outer", recorder(&log));

	let broken = div::<()>((attrs().key("outer"), computed(|_: &()| span::<()>(attrs().statics(vec![("class", "x")])))));
	assert_eq!(broken.validate(), Ok(()));
	assert_eq!(broken.patch_into(&mut dom, &root, &()), Err(Error::MissingKey));

	let outer = dom.first_child(root).unwrap();
	assert_eq!(dom.key(outer), Some("outer"));
	assert_eq!(*log.borrow(), vec![(false, outer)]);

	div::<()>(attrs().key("outer")).patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(log.borrow().len(), 1, "The keyed node was reused, not created.");

	p::<()>(()).patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(*log.borrow(), vec![(false, outer), (true, outer)]);
}

#[derive(Default)]
struct Batches(RefCell<Vec<(usize, usize)>>);
impl LifecycleObserver<NodeId> for Batches {
	fn nodes_created(&self, records: &[NodeRecord<NodeId>]) {
		self.0.borrow_mut().push((records.len(), 0));
	}

	fn nodes_removed(&self, records: &[NodeRecord<NodeId>]) {
		self.0.borrow_mut().push((0, records.len()));
	}
}

#[test]
fn batches_per_transaction() {
	init_logging();

	let batches = Rc::new(Batches::default());
	let mut dom = Dom::new();
	dom.observe(Rc::clone(&batches) as Rc<dyn LifecycleObserver<NodeId>>);
	let root = dom.create_element("main");

	div::<()>(vec![span("a"), span("b")]).patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(*batches.0.borrow(), vec![(5, 0)]);

	p::<()>(()).patch_into(&mut dom, &root, &()).unwrap();
	assert_eq!(*batches.0.borrow(), vec![(5, 0), (1, 0), (0, 5)]);
}
