//! The render protocol: turning an [`Element`] tree into calls against a keyed [`Patcher`].

use crate::{
	attributes::AttributeValue,
	element::{Child, Element},
	event::EventListener,
	Error, Result,
};
use tracing::{instrument, trace, trace_span};

/// How deep nested elements and function children may resolve before rendering fails with [`Error::DepthLimit`].
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

/// An incremental, keyed DOM patching engine.
///
/// The engine walks the live tree alongside the calls it receives. Elements are matched by tag name and key,
/// so that re-rendering the same tree only mutates what changed.
///
/// # Correct Use
///
/// All calls except [`patch`](`Patcher::patch`) must happen inside a patch transaction, and must be balanced:
/// every [`open_start`](`Patcher::open_start`) is followed by any number of [`attribute`](`Patcher::attribute`)
/// and [`listen`](`Patcher::listen`) calls, one [`open_end`](`Patcher::open_end`), the element's content
/// and finally one [`close`](`Patcher::close`).
pub trait Patcher {
	/// A handle to a live node.
	type Node: Clone + 'static;
	/// The live container a transaction patches the children of.
	type Target: ?Sized;

	/// Runs `render` as one patch transaction against the children of `target`.
	///
	/// Children of `target` that weren't visited by `render` are removed afterwards.
	/// Lifecycle notifications are dispatched once the outermost transaction ends, also when it fails,
	/// for the nodes that were created or removed up to that point.
	///
	/// # Errors
	///
	/// Errors returned by `render` abort the transaction and are passed through.
	/// Engines may also fail with [`Error::InvalidTarget`].
	fn patch<T>(&mut self, target: &Self::Target, render: impl FnOnce(&mut Self) -> Result<T>) -> Result<T>;

	/// Opens an element, reusing the live one at the current position if tag and key match.
	///
	/// `statics` are only applied when the element is created.
	fn open_start(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> Self::Node;

	/// Sets an attribute on the element opened last. Attributes that were set during the previous render
	/// but not during this one are removed at [`open_end`](`Patcher::open_end`).
	fn attribute(&mut self, name: &str, value: &AttributeValue);

	/// Binds an event listener on the element opened last, replacing the one bound during the previous render.
	fn listen(&mut self, event: &str, listener: &EventListener);

	fn open_end(&mut self, tag: &str);

	/// Closes the innermost open element, removing any of its children that weren't visited.
	fn close(&mut self, tag: &str);

	fn text(&mut self, text: &str);

	/// Opens and closes an element without attributes or children.
	fn void_tag(&mut self, tag: &str, key: Option<&str>, statics: &[(String, AttributeValue)]) -> Self::Node {
		let node = self.open_start(tag, key, statics);
		self.open_end(tag);
		self.close(tag);
		node
	}
}

#[derive(Debug, Clone, Copy)]
struct Depth {
	limit: usize,
	remaining: usize,
}

impl Depth {
	fn new(limit: usize) -> Self {
		Self { limit, remaining: limit }
	}

	fn descend(self, tag: &str) -> Result<Self> {
		match self.remaining.checked_sub(1) {
			Some(remaining) => Ok(Self { remaining, ..self }),
			None => Err(Error::DepthLimit {
				limit: self.limit,
				tag: tag.to_owned(),
			}),
		}
	}
}

impl<D> Element<D> {
	/// Renders this element at the current position of an open patch transaction.
	///
	/// # Errors
	///
	/// A classification error of this element or a descendant, or [`Error::DepthLimit`].
	pub fn render<P: Patcher>(&self, patcher: &mut P, data: &D) -> Result<P::Node> {
		self.render_with_depth_limit(patcher, data, DEFAULT_DEPTH_LIMIT)
	}

	/// # Errors
	///
	/// See [`Element::render`].
	pub fn render_with_depth_limit<P: Patcher>(&self, patcher: &mut P, data: &D, depth_limit: usize) -> Result<P::Node> {
		self.render_at(patcher, data, Depth::new(depth_limit))
	}

	/// Patches this element into `target` as the only top-level node of a new transaction,
	/// and returns the live node it rendered to.
	///
	/// # Errors
	///
	/// Classification errors of statically known elements are reported before the transaction starts,
	/// in which case `target` is left untouched. Errors raised while rendering abort the transaction.
	pub fn patch_into<P: Patcher>(&self, patcher: &mut P, target: &P::Target, data: &D) -> Result<P::Node> {
		self.patch_into_with_depth_limit(patcher, target, data, DEFAULT_DEPTH_LIMIT)
	}

	/// # Errors
	///
	/// See [`Element::patch_into`].
	#[instrument(skip(self, patcher, target, data), fields(tag = %self.tag_name(), key = ?self.key()), err)]
	pub fn patch_into_with_depth_limit<P: Patcher>(&self, patcher: &mut P, target: &P::Target, data: &D, depth_limit: usize) -> Result<P::Node> {
		self.validate()?;
		patcher.patch(target, |patcher| self.render_with_depth_limit(patcher, data, depth_limit))
	}

	fn render_at<P: Patcher>(&self, patcher: &mut P, data: &D, depth: Depth) -> Result<P::Node> {
		let depth = depth.descend(self.tag_name())?;
		if let Some(error) = self.classification_error() {
			return Err(error.clone());
		}

		let tag = self.tag_name();
		let attributes = self.attributes();
		let span = trace_span!("Rendering element", tag, key = ?attributes.key());
		let _enter = span.enter();

		let node = if self.is_void() && !attributes.is_dynamic() {
			patcher.void_tag(tag, attributes.key(), attributes.statics())
		} else {
			let node = patcher.open_start(tag, attributes.key(), attributes.statics());
			for (name, computed) in attributes.computed() {
				patcher.attribute(name, &computed.evaluate(data));
			}
			if let Some(id) = attributes.id() {
				patcher.attribute("id", &AttributeValue::Text(id.to_owned()));
			}
			for (name, value) in attributes.plain() {
				patcher.attribute(name, value);
			}
			for (event, listener) in attributes.events() {
				patcher.listen(event, listener);
			}
			patcher.open_end(tag);

			if !self.is_void() {
				for child in self.children() {
					resolve(child, tag, patcher, data, depth)?;
				}
			}
			patcher.close(tag);
			node
		};

		if attributes.exposes_node() {
			self.expose(node.clone());
		}
		Ok(node)
	}
}

fn resolve<D, P: Patcher>(child: &Child<D>, parent_tag: &str, patcher: &mut P, data: &D, depth: Depth) -> Result<()> {
	match child {
		Child::Text(text) => {
			if cfg!(feature = "dangerous-logging") {
				trace!("Text child {:?}", text);
			} else {
				trace!("Text child ({} bytes)", text.len());
			}
			patcher.text(text);
		}
		Child::Element(element) => {
			element.render_at(patcher, data, depth)?;
		}
		Child::Computed(function) => {
			let depth = depth.descend(parent_tag)?;
			let resolved = function(data);
			resolve(&resolved, parent_tag, patcher, data, depth)?;
		}
		Child::Fragment(children) => {
			for child in children {
				resolve(child, parent_tag, patcher, data, depth)?;
			}
		}
		Child::Empty => trace!("Skipping empty child."),
	}
	Ok(())
}
