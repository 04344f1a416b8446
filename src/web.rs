//! A [`Patcher`] that mutates the browser DOM through [`web_sys`].
//!
//! Keys, dynamic attribute names and bound listeners are tracked per node on the Rust side.
//! Nodes are linked to that state through a numeric expando property.

use crate::{
	attributes::AttributeValue,
	event::{Event, EventListener},
	notifications::{LifecycleObserver, Notifier},
	render::Patcher,
	Error, Result,
};
use core::{
	fmt::{self, Debug, Formatter},
	mem,
};
use hashbrown::HashMap;
use js_sys::Reflect;
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};
use wasm_bindgen::{closure::Closure, throw_val, JsCast, JsValue};

const ID_PROPERTY: &str = "__cremeId";

#[derive(Default)]
struct NodeState {
	key: Option<String>,
	dynamic: Vec<String>,
	listeners: Vec<(String, Closure<dyn Fn(web_sys::Event)>)>,
}

#[derive(Debug, Clone)]
struct Frame {
	parent: web_sys::Element,
	cursor: u32,
}

struct Open {
	element: web_sys::Element,
	attributes: Vec<(String, Option<String>)>,
	listeners: Vec<(String, EventListener)>,
}

/// Patches the child nodes of [`web_sys::Element`]s of one [`web_sys::Document`].
///
/// # Safety
///
/// Event listeners are owned by the instance. If it is dropped, listeners it bound will start throwing
/// errors into JavaScript when their events fire.
pub struct WebPatcher {
	document: web_sys::Document,
	nodes: HashMap<u32, NodeState>,
	next_id: u32,
	frames: Vec<Frame>,
	open: Option<Open>,
	notifier: Notifier<web_sys::Node>,
}

impl Debug for WebPatcher {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebPatcher")
			.field("document", &self.document)
			.field("nodes", &self.nodes.len())
			.field("frames", &self.frames)
			.field("open", &self.open.as_ref().map(|open| &open.element))
			.field("notifier", &self.notifier)
			.finish()
	}
}

impl WebPatcher {
	#[must_use]
	#[instrument]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			nodes: HashMap::new(),
			next_id: 0,
			frames: Vec::new(),
			open: None,
			notifier: Notifier::new(),
		}
	}

	/// Creates a patcher for the current window's document, if there is one.
	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window()?.document().map(Self::new)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Subscribes `observer` to the created and removed nodes of each transaction.
	pub fn observe(&mut self, observer: Rc<dyn LifecycleObserver<web_sys::Node>>) {
		self.notifier.observe(observer);
	}

	/// The identity key `node` was created with by this patcher.
	#[must_use]
	pub fn key(&self, node: &web_sys::Node) -> Option<&str> {
		id_of(node).and_then(|id| self.nodes.get(&id)).and_then(|state| state.key.as_deref())
	}

	fn state_mut(&mut self, node: &web_sys::Node) -> &mut NodeState {
		let id = match id_of(node) {
			Some(id) => id,
			None => {
				let id = self.next_id;
				self.next_id = self.next_id.wrapping_add(1);
				if let Err(error) = Reflect::set(node.as_ref(), &JsValue::from_str(ID_PROPERTY), &JsValue::from(id)) {
					error!("Failed to tag node: {:?}", error);
				}
				id
			}
		};
		self.nodes.entry(id).or_default()
	}

	fn matching(&self, node: &web_sys::Node, tag: &str, key: Option<&str>) -> Option<web_sys::Element> {
		let element = node.dyn_ref::<web_sys::Element>()?;
		if element.tag_name().eq_ignore_ascii_case(tag) && self.key(node) == key {
			Some(element.clone())
		} else {
			None
		}
	}

	fn create(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> web_sys::Element {
		let span = trace_span!("Creating element", tag, ?key);
		let _enter = span.enter();

		let element = match self.document.create_element(tag) {
			Ok(element) => element,
			Err(error) => {
				error!("Failed to create <{}>: {:?}", tag, error);
				throw_val(error)
			}
		};
		for (name, value) in statics {
			if let Some(value) = value.as_dom_value() {
				if let Err(error) = element.set_attribute(name, &value) {
					error!("Could not set static attribute {:?}: {:?}", name, error);
				}
			}
		}
		if let Some(key) = key {
			self.state_mut(element.as_ref()).key = Some(key.to_owned());
		}
		element
	}

	fn element_at(&mut self, frame: &Frame, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> web_sys::Element {
		let child_nodes = frame.parent.child_nodes();
		let current = child_nodes.get(frame.cursor);
		if let Some(element) = current.as_ref().and_then(|current| self.matching(current, tag, key)) {
			trace!("Reusing <{}> at {}.", tag, frame.cursor);
			return element;
		}

		if key.is_some() {
			for index in frame.cursor + 1..child_nodes.length() {
				let sibling = match child_nodes.get(index) {
					Some(sibling) => sibling,
					None => break,
				};
				if let Some(element) = self.matching(&sibling, tag, key) {
					trace!("Moving keyed <{}> from {} to {}.", tag, index, frame.cursor);
					if let Err(error) = frame.parent.insert_before(&sibling, current.as_ref()) {
						error!("Failed to move keyed <{}>: {:?}", tag, error);
					}
					return element;
				}
			}
		}

		let element = self.create(tag, key, statics);
		if let Err(error) = frame.parent.insert_before(element.as_ref(), current.as_ref()) {
			error!("Failed to insert <{}>: {:?}", tag, error);
		}
		self.notifier.created(element.clone().into(), key);
		element
	}

	fn apply_open(&mut self, open: Open) {
		let Open { element, attributes, listeners } = open;
		let state = self.state_mut(element.as_ref());

		for stale in mem::take(&mut state.dynamic).iter().filter(|name| !attributes.iter().any(|(current, _)| current == *name)) {
			if let Err(error) = element.remove_attribute(stale) {
				warn!("Could not remove attribute {:?}: {:?}", stale, error);
			}
		}
		for (name, value) in attributes {
			match value {
				Some(value) => {
					if element.get_attribute(&name).as_deref() != Some(value.as_str()) {
						if let Err(error) = element.set_attribute(&name, &value) {
							error!("Could not set attribute {:?}: {:?}", name, error);
						}
					}
					state.dynamic.push(name);
				}
				None => {
					if let Err(error) = element.remove_attribute(&name) {
						warn!("Could not remove attribute {:?}: {:?}", name, error);
					}
				}
			}
		}

		for (name, closure) in mem::take(&mut state.listeners) {
			if let Err(error) = element.remove_event_listener_with_callback(&name, closure.as_ref().unchecked_ref()) {
				error!("Failed to remove event listener {:?}: {:?}", name, error);
			}
		}
		for (name, listener) in listeners {
			let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
				let span = trace_span!("Event listener", kind = %event.type_());
				let _enter = span.enter();
				listener(&Event::from_web(event));
			}) as Box<dyn Fn(web_sys::Event)>);
			if let Err(error) = element.add_event_listener_with_callback(&name, closure.as_ref().unchecked_ref()) {
				error!("Failed to add event listener {:?}: {:?}", name, error);
			}
			state.listeners.push((name, closure));
		}
	}

	fn truncate_children(&mut self, parent: &web_sys::Element, cursor: u32) {
		let child_nodes = parent.child_nodes();
		while child_nodes.length() > cursor {
			let node = match child_nodes.get(cursor) {
				Some(node) => node,
				None => break,
			};
			self.forget(&node);
			if let Err(error) = parent.remove_child(&node) {
				error!("Failed to remove node: {:?}", error);
				break;
			}
		}
	}

	/// Reports `node` and its descendants as removed and unbinds their listeners.
	fn forget(&mut self, node: &web_sys::Node) {
		let state = id_of(node).and_then(|id| self.nodes.remove(&id));
		let key = state.as_ref().and_then(|state| state.key.as_deref());
		let span = trace_span!("Removing node", ?key);
		let _enter = span.enter();
		self.notifier.removed(node.clone(), key);

		if let (Some(state), Some(element)) = (&state, node.dyn_ref::<web_sys::Element>()) {
			for (name, closure) in &state.listeners {
				if let Err(error) = element.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
					error!("Failed to remove event listener {:?}: {:?}", name, error);
				}
			}
		}

		let child_nodes = node.child_nodes();
		for index in 0..child_nodes.length() {
			if let Some(child) = child_nodes.get(index) {
				self.forget(&child);
			}
		}
	}
}

impl Patcher for WebPatcher {
	type Node = web_sys::Node;
	type Target = web_sys::Element;

	#[instrument(skip(self, render))]
	fn patch<T>(&mut self, target: &web_sys::Element, render: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		if target.owner_document().as_ref() != Some(&self.document) {
			return Err(Error::InvalidTarget(format!("{:?} doesn't belong to this patcher's document", target)));
		}

		let base = self.frames.len();
		self.frames.push(Frame {
			parent: target.clone(),
			cursor: 0,
		});
		let result = render(self);
		let frame = self.frames.get(base).cloned();
		self.frames.truncate(base);

		match (&result, frame) {
			(Ok(_), Some(frame)) => self.truncate_children(&frame.parent, frame.cursor),
			(Ok(_), None) => error!("The patch target was closed during the transaction."),
			(Err(error), _) => {
				warn!("Aborting patch: {}", error);
				self.open = None;
			}
		}

		// Nodes inserted before a failure stay in place, so their records are dispatched too.
		if base == 0 {
			self.notifier.flush();
		}
		result
	}

	fn open_start(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> web_sys::Node {
		if self.open.is_some() {
			error!("`open_start` for <{}> before `open_end` of the previous element.", tag);
		}
		let element = match self.frames.last().cloned() {
			Some(frame) => self.element_at(&frame, tag, key, statics),
			None => {
				error!("`open_start` for <{}> outside of a patch transaction. Creating a detached element.", tag);
				self.create(tag, key, statics)
			}
		};
		let node = element.clone().into();
		self.open = Some(Open {
			element,
			attributes: Vec::new(),
			listeners: Vec::new(),
		});
		node
	}

	fn attribute(&mut self, name: &str, value: &AttributeValue) {
		match &mut self.open {
			Some(open) => open.attributes.push((name.to_owned(), value.as_dom_value().map(Into::into))),
			None => error!("`attribute` {:?} outside of an open tag.", name),
		}
	}

	fn listen(&mut self, event: &str, listener: &EventListener) {
		match &mut self.open {
			Some(open) => open.listeners.push((event.to_owned(), Rc::clone(listener))),
			None => error!("`listen` for {:?} outside of an open tag.", event),
		}
	}

	fn open_end(&mut self, tag: &str) {
		let open = match self.open.take() {
			Some(open) => open,
			None => return error!("`open_end` for <{}> without `open_start`.", tag),
		};
		let element = open.element.clone();
		self.apply_open(open);
		if let Some(frame) = self.frames.last_mut() {
			frame.cursor += 1;
		}
		self.frames.push(Frame { parent: element, cursor: 0 });
	}

	fn close(&mut self, tag: &str) {
		let frame = match self.frames.pop() {
			Some(frame) => frame,
			None => return error!("`close` for <{}> outside of a patch transaction.", tag),
		};
		if STATIC_MAX_LEVEL >= Level::WARN && !frame.parent.tag_name().eq_ignore_ascii_case(tag) {
			warn!("Closing <{}> but <{}> is open.", tag, frame.parent.tag_name());
		}
		self.truncate_children(&frame.parent, frame.cursor);
	}

	fn text(&mut self, text: &str) {
		let frame = match self.frames.last().cloned() {
			Some(frame) => frame,
			None => return error!("`text` outside of a patch transaction."),
		};

		let current = frame.parent.child_nodes().get(frame.cursor);
		match current.as_ref().and_then(|current| current.dyn_ref::<web_sys::Text>()) {
			Some(existing) => {
				if existing.data() != text {
					trace!("Updating text at {}.", frame.cursor);
					existing.set_data(text);
				}
			}
			None => {
				let node = self.document.create_text_node(text);
				if let Err(error) = frame.parent.insert_before(node.as_ref(), current.as_ref()) {
					error!("Failed to insert text: {:?}", error);
				}
				self.notifier.created(node.into(), None);
			}
		}

		if let Some(frame) = self.frames.last_mut() {
			frame.cursor += 1;
		}
	}
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn id_of(node: &web_sys::Node) -> Option<u32> {
	Reflect::get(node.as_ref(), &JsValue::from_str(ID_PROPERTY)).ok()?.as_f64().map(|id| id as u32)
}
