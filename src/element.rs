//! The declarative element tree.

use crate::{
	attributes::{AttributeBag, Classified},
	Error, Result,
};
use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	iter::FromIterator,
};
use std::{borrow::Cow, rc::Rc};
use tracing::{trace, warn};

/// A child descriptor, resolved lazily at render time.
pub enum Child<D> {
	Text(String),
	Element(Element<D>),
	/// Called with the render data on every render. The returned descriptor is resolved in turn,
	/// so functions may return further functions.
	///
	/// Resolution chains must be finite; overly deep ones fail with [`Error::DepthLimit`].
	Computed(Rc<dyn Fn(&D) -> Child<D>>),
	/// Resolved member by member, in order, as if the members were direct children.
	Fragment(Vec<Child<D>>),
	/// Renders nothing.
	Empty,
}

/// Shorthand for [`Child::computed`].
pub fn computed<D, C: Into<Child<D>>>(function: impl Fn(&D) -> C + 'static) -> Child<D> {
	Child::computed(function)
}

impl<D> Child<D> {
	pub fn computed<C: Into<Self>>(function: impl Fn(&D) -> C + 'static) -> Self {
		Self::Computed(Rc::new(move |data: &D| function(data).into()))
	}

	/// Flattens a top-level fragment into a child list.
	#[must_use]
	pub fn into_children(self) -> Vec<Self> {
		match self {
			Self::Fragment(children) => children,
			Self::Empty => Vec::new(),
			child => vec![child],
		}
	}
}

impl<D> Debug for Child<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Element(element) => f.debug_tuple("Element").field(element).finish(),
			Self::Computed(function) => f.debug_tuple("Computed").field(&Rc::as_ptr(function)).finish(),
			Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
			Self::Empty => f.write_str("Empty"),
		}
	}
}

impl<D> From<&str> for Child<D> {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl<D> From<String> for Child<D> {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl<D> From<&String> for Child<D> {
	fn from(text: &String) -> Self {
		Self::Text(text.clone())
	}
}

impl<D> From<Element<D>> for Child<D> {
	fn from(element: Element<D>) -> Self {
		Self::Element(element)
	}
}

impl<D> From<Vec<Child<D>>> for Child<D> {
	fn from(children: Vec<Child<D>>) -> Self {
		Self::Fragment(children)
	}
}

impl<D> From<Vec<Element<D>>> for Child<D> {
	fn from(elements: Vec<Element<D>>) -> Self {
		elements.into_iter().collect()
	}
}

impl<D, T: Into<Child<D>>> From<Option<T>> for Child<D> {
	fn from(child: Option<T>) -> Self {
		child.map_or(Self::Empty, Into::into)
	}
}

impl<D> From<()> for Child<D> {
	fn from((): ()) -> Self {
		Self::Empty
	}
}

impl<D> FromIterator<Child<D>> for Child<D> {
	fn from_iter<I: IntoIterator<Item = Child<D>>>(iter: I) -> Self {
		Self::Fragment(iter.into_iter().collect())
	}
}

impl<D> FromIterator<Element<D>> for Child<D> {
	fn from_iter<I: IntoIterator<Item = Element<D>>>(iter: I) -> Self {
		Self::Fragment(iter.into_iter().map(Self::Element).collect())
	}
}

/// What a tag constructor was called with.
///
/// This replaces guessing from the argument's shape: each call shape has its own variant,
/// and the [`From`] implementations pick the right one for the usual argument types.
pub enum Content<D> {
	Empty,
	/// Children without attributes.
	Children(Vec<Child<D>>),
	/// A single child without attributes.
	Child(Child<D>),
	/// An attribute bag and the children following it.
	Attributed(AttributeBag<D>, Vec<Child<D>>),
}

impl<D> Content<D> {
	#[must_use]
	pub fn into_parts(self) -> (Option<AttributeBag<D>>, Vec<Child<D>>) {
		match self {
			Self::Empty => (None, Vec::new()),
			Self::Children(children) => (None, children),
			Self::Child(child) => (None, child.into_children()),
			Self::Attributed(attributes, children) => (Some(attributes), children),
		}
	}
}

impl<D> From<()> for Content<D> {
	fn from((): ()) -> Self {
		Self::Empty
	}
}

impl<D> From<Vec<Child<D>>> for Content<D> {
	fn from(children: Vec<Child<D>>) -> Self {
		Self::Children(children)
	}
}

impl<D> From<Vec<Element<D>>> for Content<D> {
	fn from(elements: Vec<Element<D>>) -> Self {
		Self::Children(elements.into_iter().map(Child::Element).collect())
	}
}

impl<D> From<Child<D>> for Content<D> {
	fn from(child: Child<D>) -> Self {
		Self::Child(child)
	}
}

impl<D> From<Element<D>> for Content<D> {
	fn from(element: Element<D>) -> Self {
		Self::Child(Child::Element(element))
	}
}

impl<D> From<&str> for Content<D> {
	fn from(text: &str) -> Self {
		Self::Child(text.into())
	}
}

impl<D> From<String> for Content<D> {
	fn from(text: String) -> Self {
		Self::Child(text.into())
	}
}

impl<D> From<AttributeBag<D>> for Content<D> {
	fn from(attributes: AttributeBag<D>) -> Self {
		Self::Attributed(attributes, Vec::new())
	}
}

impl<D, C: Into<Child<D>>> From<(AttributeBag<D>, C)> for Content<D> {
	fn from((attributes, children): (AttributeBag<D>, C)) -> Self {
		Self::Attributed(attributes, children.into().into_children())
	}
}

/// A declarative element: tag name, void flag, classified attributes and children.
///
/// Immutable after construction, except for the live node it remembers when
/// `$ref` or `$id` was given.
pub struct Element<D> {
	tag_name: Cow<'static, str>,
	is_void: bool,
	attributes: Classified<D>,
	classification_error: Option<Error>,
	children: Vec<Child<D>>,
	node: RefCell<Option<Box<dyn Any>>>,
}

impl<D> Debug for Element<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Element")
			.field("tag_name", &self.tag_name)
			.field("is_void", &self.is_void)
			.field("attributes", &self.attributes)
			.field("classification_error", &self.classification_error)
			.field("children", &self.children)
			.field("has_node", &self.node.borrow().is_some())
			.finish()
	}
}

impl<D> Element<D> {
	#[must_use]
	pub fn new(tag_name: impl Into<Cow<'static, str>>, is_void: bool) -> Self {
		Self::with_children(tag_name, is_void, Vec::new())
	}

	#[must_use]
	pub fn with_children(tag_name: impl Into<Cow<'static, str>>, is_void: bool, children: Vec<Child<D>>) -> Self {
		Self::assemble(tag_name.into(), is_void, Ok(Classified::default()), children)
	}

	/// Classifies `attributes` without modifying them.
	///
	/// A classification failure doesn't panic here. It is kept and returned by [`Element::validate`],
	/// [`Element::render`] and [`Element::patch_into`] before anything is emitted for this element.
	#[must_use]
	pub fn with_attributes(tag_name: impl Into<Cow<'static, str>>, is_void: bool, attributes: &AttributeBag<D>, children: Vec<Child<D>>) -> Self {
		Self::assemble(tag_name.into(), is_void, attributes.classify(), children)
	}

	#[must_use]
	pub fn build(tag_name: impl Into<Cow<'static, str>>, is_void: bool, content: impl Into<Content<D>>) -> Self {
		match content.into().into_parts() {
			(Some(attributes), children) => Self::with_attributes(tag_name, is_void, &attributes, children),
			(None, children) => Self::with_children(tag_name, is_void, children),
		}
	}

	/// Like [`Element::build`], but fails immediately if the attributes can't be classified.
	///
	/// # Errors
	///
	/// See [`AttributeBag::classify`].
	pub fn try_new(tag_name: impl Into<Cow<'static, str>>, is_void: bool, content: impl Into<Content<D>>) -> Result<Self> {
		let element = Self::build(tag_name, is_void, content);
		if let Some(error) = element.classification_error.clone() {
			return Err(error);
		}
		Ok(element)
	}

	fn assemble(tag_name: Cow<'static, str>, is_void: bool, attributes: Result<Classified<D>>, mut children: Vec<Child<D>>) -> Self {
		if is_void && !children.is_empty() {
			trace!("Dropping {} child(ren) of void <{}>.", children.len(), tag_name);
			children = Vec::new();
		}
		let (attributes, classification_error) = match attributes {
			Ok(attributes) => (attributes, None),
			Err(error) => {
				warn!("Could not classify attributes of <{}>: {}", tag_name, error);
				(Classified::default(), Some(error))
			}
		};
		Self {
			tag_name,
			is_void,
			attributes,
			classification_error,
			children,
			node: RefCell::new(None),
		}
	}

	#[must_use]
	pub fn tag_name(&self) -> &str {
		&self.tag_name
	}

	#[must_use]
	pub fn is_void(&self) -> bool {
		self.is_void
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.attributes.key()
	}

	#[must_use]
	pub fn attributes(&self) -> &Classified<D> {
		&self.attributes
	}

	/// Always empty for void elements.
	#[must_use]
	pub fn children(&self) -> &[Child<D>] {
		&self.children
	}

	#[must_use]
	pub fn classification_error(&self) -> Option<&Error> {
		self.classification_error.as_ref()
	}

	/// Checks this element and all statically known descendants for classification errors.
	///
	/// Elements produced by [`Child::Computed`] only exist at render time and aren't covered.
	///
	/// # Errors
	///
	/// The first classification error found, in document order.
	pub fn validate(&self) -> Result<()> {
		fn validate_child<D>(child: &Child<D>) -> Result<()> {
			match child {
				Child::Element(element) => element.validate(),
				Child::Fragment(children) => children.iter().try_for_each(validate_child),
				Child::Text(_) | Child::Computed(_) | Child::Empty => Ok(()),
			}
		}

		if let Some(error) = &self.classification_error {
			return Err(error.clone());
		}
		self.children.iter().try_for_each(validate_child)
	}

	/// The live node this element last rendered to, if `$ref` or `$id` asked for it.
	///
	/// `N` is the patcher's [`Node`](`crate::Patcher::Node`) type.
	#[must_use]
	pub fn node<N: Clone + 'static>(&self) -> Option<N> {
		self.node.borrow().as_ref().and_then(|node| node.downcast_ref::<N>()).cloned()
	}

	pub(crate) fn expose<N: 'static>(&self, node: N) {
		*self.node.borrow_mut() = Some(Box::new(node));
	}
}
