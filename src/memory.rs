//! An in-memory document with a keyed, incremental [`Patcher`].
//!
//! [`Dom`] keeps its nodes in an arena and hands out [`NodeId`]s. Nodes are never freed:
//! removed nodes are merely detached and stay readable, much like detached DOM nodes.
//!
//! Useful outside of browsers, for example in tests or to pre-render markup.

use crate::{
	attributes::AttributeValue,
	event::{Event, EventListener},
	html::factory,
	notifications::{LifecycleObserver, Notifier},
	render::Patcher,
	Error, Result,
};
use core::fmt::{self, Debug, Formatter, Write as _};
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Handle of a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
	Element { tag: String },
	Text(String),
}

struct NodeData {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	key: Option<String>,
	attributes: Vec<(String, String)>,
	/// Attribute names set during the last render, as opposed to statics.
	dynamic: Vec<String>,
	listeners: Vec<(String, EventListener)>,
}

impl NodeData {
	fn new(kind: NodeKind, key: Option<&str>) -> Self {
		Self {
			kind,
			parent: None,
			children: Vec::new(),
			key: key.map(ToOwned::to_owned),
			attributes: Vec::new(),
			dynamic: Vec::new(),
			listeners: Vec::new(),
		}
	}

	fn set_attribute(&mut self, name: &str, value: String) {
		match self.attributes.iter_mut().find(|(existing, _)| existing == name) {
			Some((_, slot)) => {
				if *slot != value {
					*slot = value;
				}
			}
			None => self.attributes.push((name.to_owned(), value)),
		}
	}

	fn remove_attribute(&mut self, name: &str) {
		self.attributes.retain(|(existing, _)| existing != name);
	}
}

#[derive(Debug, Clone, Copy)]
struct Frame {
	parent: NodeId,
	cursor: usize,
}

/// An element between `open_start` and `open_end`.
struct Open {
	node: NodeId,
	attributes: Vec<(String, Option<String>)>,
	listeners: Vec<(String, EventListener)>,
}

/// An in-memory document that is also a [`Patcher`], with [`NodeId`] nodes and targets.
///
/// The arena only grows, since every [`NodeId`] ever handed out stays valid.
/// Meant for tests and pre-rendering, not for long-running documents that churn through nodes.
#[derive(Default)]
pub struct Dom {
	nodes: Vec<NodeData>,
	frames: Vec<Frame>,
	open: Option<Open>,
	notifier: Notifier<NodeId>,
}

impl Debug for Dom {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dom")
			.field("nodes", &self.nodes.len())
			.field("frames", &self.frames)
			.field("open", &self.open.as_ref().map(|open| open.node))
			.field("notifier", &self.notifier)
			.finish()
	}
}

impl Dom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes `observer` to the created and removed nodes of each transaction.
	pub fn observe(&mut self, observer: Rc<dyn LifecycleObserver<NodeId>>) {
		self.notifier.observe(observer);
	}

	/// Creates a detached element, typically to serve as patch target.
	pub fn create_element(&mut self, tag: &str) -> NodeId {
		self.alloc(NodeData::new(NodeKind::Element { tag: tag.to_owned() }, None))
	}

	/// Appends `child` to `parent`, detaching it from its previous parent first.
	///
	/// # Errors
	///
	/// [`Error::InvalidTarget`] if `parent` isn't an element of this document or `child` isn't a node of it.
	pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		if !self.is_element(parent) || self.data(child).is_none() {
			return Err(Error::InvalidTarget(format!("can't append {:?} to {:?}", child, parent)));
		}
		let end = self.nodes[parent.0].children.len();
		self.insert_child(parent, end, child);
		Ok(())
	}

	/// How many nodes were ever allocated, including detached ones.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	#[must_use]
	pub fn is_element(&self, node: NodeId) -> bool {
		matches!(self.data(node), Some(NodeData { kind: NodeKind::Element { .. }, .. }))
	}

	/// The tag name of an element, or [`None`] for text nodes.
	#[must_use]
	pub fn tag_name(&self, node: NodeId) -> Option<&str> {
		match &self.data(node)?.kind {
			NodeKind::Element { tag } => Some(tag),
			NodeKind::Text(_) => None,
		}
	}

	/// The data of a text node, or [`None`] for elements.
	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.data(node)?.kind {
			NodeKind::Text(text) => Some(text),
			NodeKind::Element { .. } => None,
		}
	}

	/// The identity key the node was created with.
	#[must_use]
	pub fn key(&self, node: NodeId) -> Option<&str> {
		self.data(node)?.key.as_deref()
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.data(node)?.parent
	}

	/// Whether `node` is a descendant of `root`.
	#[must_use]
	pub fn is_attached(&self, node: NodeId, root: NodeId) -> bool {
		let mut current = self.parent(node);
		while let Some(parent) = current {
			if parent == root {
				return true;
			}
			current = self.parent(parent);
		}
		false
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		self.data(node).map_or(&[][..], |data| data.children.as_slice())
	}

	#[must_use]
	pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
		self.children(node).first().copied()
	}

	#[must_use]
	pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
		self.children(node).last().copied()
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		self.attributes(node).iter().find(|(existing, _)| existing == name).map(|(_, value)| value.as_str())
	}

	/// All attributes of `node`, statics first, then in the order they were first set.
	#[must_use]
	pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
		self.data(node).map_or(&[][..], |data| data.attributes.as_slice())
	}

	/// The concatenated data of all text nodes in `node`, in document order.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		let mut content = String::new();
		self.collect_text(node, &mut content);
		content
	}

	fn collect_text(&self, node: NodeId, content: &mut String) {
		if let Some(data) = self.data(node) {
			match &data.kind {
				NodeKind::Text(text) => content.push_str(text),
				NodeKind::Element { .. } => {
					for &child in &data.children {
						self.collect_text(child, content);
					}
				}
			}
		}
	}

	/// Calls the listeners bound for `event` on `node`, returning how many there were.
	pub fn dispatch_event(&self, node: NodeId, event: &str) -> usize {
		let listeners: Vec<EventListener> = match self.data(node) {
			Some(data) => data.listeners.iter().filter(|(name, _)| name == event).map(|(_, listener)| Rc::clone(listener)).collect(),
			None => return 0,
		};
		let span = trace_span!("Dispatching event", ?node, event, listeners = listeners.len());
		let _enter = span.enter();
		let event = Event::new(event);
		for listener in &listeners {
			listener(&event);
		}
		listeners.len()
	}

	/// Serializes `node` and its descendants as HTML.
	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	/// Serializes the children of `node` as HTML.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		for &child in self.children(node) {
			self.write_html(child, &mut html);
		}
		html
	}

	fn write_html(&self, node: NodeId, html: &mut String) {
		let data = match self.data(node) {
			Some(data) => data,
			None => return,
		};
		match &data.kind {
			NodeKind::Text(text) => escape(text, false, html),
			NodeKind::Element { tag } => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in &data.attributes {
					// Infallible for `String`.
					let _ = write!(html, " {}=\"", name);
					escape(value, true, html);
					html.push('"');
				}
				html.push('>');
				if factory(tag).map_or(false, |factory| factory.is_void()) {
					return;
				}
				for &child in &data.children {
					self.write_html(child, html);
				}
				let _ = write!(html, "</{}>", tag);
			}
		}
	}

	fn data(&self, node: NodeId) -> Option<&NodeData> {
		self.nodes.get(node.0)
	}

	fn alloc(&mut self, data: NodeData) -> NodeId {
		self.nodes.push(data);
		NodeId(self.nodes.len() - 1)
	}

	fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
		if let Some(previous_parent) = self.nodes[child.0].parent {
			let siblings = &mut self.nodes[previous_parent.0].children;
			if let Some(position) = siblings.iter().position(|&sibling| sibling == child) {
				siblings.remove(position);
			}
		}
		let children = &mut self.nodes[parent.0].children;
		let index = index.min(children.len());
		children.insert(index, child);
		self.nodes[child.0].parent = Some(parent);
	}

	fn matches(&self, node: NodeId, tag: &str, key: Option<&str>) -> bool {
		let data = &self.nodes[node.0];
		match &data.kind {
			NodeKind::Element { tag: existing } => existing.eq_ignore_ascii_case(tag) && data.key.as_deref() == key,
			NodeKind::Text(_) => false,
		}
	}

	fn create_keyed(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> NodeId {
		let mut data = NodeData::new(NodeKind::Element { tag: tag.to_owned() }, key);
		for (name, value) in statics {
			if let Some(value) = value.as_dom_value() {
				data.set_attribute(name, value.into_owned());
			}
		}
		self.alloc(data)
	}

	fn element_at(&mut self, frame: Frame, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> NodeId {
		let current = self.nodes[frame.parent.0].children.get(frame.cursor).copied();
		if let Some(current) = current {
			if self.matches(current, tag, key) {
				trace!("Reusing <{}> at {}.", tag, frame.cursor);
				return current;
			}
		}

		if key.is_some() {
			let moved = self.nodes[frame.parent.0].children.iter().skip(frame.cursor + 1).copied().find(|&sibling| self.matches(sibling, tag, key));
			if let Some(moved) = moved {
				trace!("Moving keyed <{}> to {}.", tag, frame.cursor);
				self.insert_child(frame.parent, frame.cursor, moved);
				return moved;
			}
		}

		let span = trace_span!("Creating element", tag, ?key);
		let _enter = span.enter();
		let node = self.create_keyed(tag, key, statics);
		self.insert_child(frame.parent, frame.cursor, node);
		self.notifier.created(node, key);
		node
	}

	fn apply_open(&mut self, open: Open) {
		let data = &mut self.nodes[open.node.0];
		let previous = core::mem::take(&mut data.dynamic);
		for stale in previous.iter().filter(|name| !open.attributes.iter().any(|(current, _)| current == *name)) {
			data.remove_attribute(stale);
		}
		for (name, value) in open.attributes {
			match value {
				Some(value) => {
					data.set_attribute(&name, value);
					data.dynamic.push(name);
				}
				None => data.remove_attribute(&name),
			}
		}
		data.listeners = open.listeners;
	}

	/// Detaches all children of `parent` from `cursor` on.
	fn truncate_children(&mut self, parent: NodeId, cursor: usize) {
		let children = &mut self.nodes[parent.0].children;
		let removed = children.split_off(cursor.min(children.len()));
		for node in removed {
			let span = trace_span!("Removing node", ?node, key = ?self.nodes[node.0].key);
			let _enter = span.enter();
			self.nodes[node.0].parent = None;
			self.notify_removed(node);
		}
	}

	fn notify_removed(&mut self, node: NodeId) {
		let key = self.nodes[node.0].key.clone();
		self.notifier.removed(node, key.as_deref());
		for child in self.nodes[node.0].children.clone() {
			self.notify_removed(child);
		}
	}
}

impl Patcher for Dom {
	type Node = NodeId;
	type Target = NodeId;

	#[instrument(skip(self, render))]
	fn patch<T>(&mut self, target: &NodeId, render: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		if !self.is_element(*target) {
			return Err(Error::InvalidTarget(format!("{:?} is not an element of this document", target)));
		}

		let base = self.frames.len();
		self.frames.push(Frame { parent: *target, cursor: 0 });
		let result = render(self);
		let frame = self.frames.get(base).copied();
		self.frames.truncate(base);

		match (&result, frame) {
			(Ok(_), Some(frame)) => self.truncate_children(frame.parent, frame.cursor),
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

	fn open_start(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> NodeId {
		if self.open.is_some() {
			error!("`open_start` for <{}> before `open_end` of the previous element.", tag);
		}
		let node = match self.frames.last().copied() {
			Some(frame) => self.element_at(frame, tag, key, statics),
			None => {
				error!("`open_start` for <{}> outside of a patch transaction. Creating a detached element.", tag);
				self.create_keyed(tag, key, statics)
			}
		};
		self.open = Some(Open {
			node,
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
		let node = open.node;
		self.apply_open(open);
		if let Some(frame) = self.frames.last_mut() {
			frame.cursor += 1;
		}
		self.frames.push(Frame { parent: node, cursor: 0 });
	}

	fn close(&mut self, tag: &str) {
		let frame = match self.frames.pop() {
			Some(frame) => frame,
			None => return error!("`close` for <{}> outside of a patch transaction.", tag),
		};
		if STATIC_MAX_LEVEL >= Level::WARN && !self.matches_tag(frame.parent, tag) {
			warn!("Closing <{}> but {:?} is open.", tag, self.tag_name(frame.parent));
		}
		self.truncate_children(frame.parent, frame.cursor);
	}

	fn text(&mut self, text: &str) {
		let frame = match self.frames.last().copied() {
			Some(frame) => frame,
			None => return error!("`text` outside of a patch transaction."),
		};

		let current = self.nodes[frame.parent.0].children.get(frame.cursor).copied();
		match current {
			Some(current) if Dom::text(self, current).is_some() => {
				if let NodeKind::Text(data) = &mut self.nodes[current.0].kind {
					if data.as_str() != text {
						trace!("Updating text at {}.", frame.cursor);
						*data = text.to_owned();
					}
				}
			}
			_ => {
				let node = self.alloc(NodeData::new(NodeKind::Text(text.to_owned()), None));
				self.insert_child(frame.parent, frame.cursor, node);
				self.notifier.created(node, None);
			}
		}

		if let Some(frame) = self.frames.last_mut() {
			frame.cursor += 1;
		}
	}
}

impl Dom {
	fn matches_tag(&self, node: NodeId, tag: &str) -> bool {
		self.tag_name(node).map_or(false, |existing| existing.eq_ignore_ascii_case(tag))
	}
}

fn escape(text: &str, attribute: bool, html: &mut String) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'"' if attribute => html.push_str("&quot;"),
			c => html.push(c),
		}
	}
}
