//! Raw attribute bags and their classification into the categories the patch engine cares about.
//!
//! An [`AttributeBag`] is what callers write. Reserved names (see [`reserved`]) are consumed by
//! [`AttributeBag::classify`], everything else is passed through as a plain attribute on every render.
//! Classification borrows the bag and never changes it, so the same bag can be classified again (or reused
//! for another element) with identical results.

use crate::{
	event::{self, Event, EventListener},
	Error, Result,
};
use core::fmt::{self, Debug, Display, Formatter};
use std::{borrow::Cow, rc::Rc};
use tracing::{trace, warn};

/// Attribute names with special meaning. They are never emitted as plain attributes.
pub mod reserved {
	/// Identity key used by the patch engine to match element instances across renders.
	pub const KEY: &str = "$key";
	/// Attributes that never change for a keyed instance. Requires [`KEY`].
	pub const STATIC: &str = "$static";
	/// Attributes recalculated from the render data on every render.
	pub const COMPUTED: &str = "$computed";
	/// Requests that the element remembers the live node it rendered to.
	pub const REF: &str = "$ref";
	/// Sets the live element's `id` and implies [`REF`].
	pub const ID: &str = "$id";
	/// DOM event listeners bound on the live node.
	pub const EVENTS: &str = "$events";

	pub const ALL: [&str; 6] = [KEY, STATIC, COMPUTED, REF, ID, EVENTS];

	#[must_use]
	pub fn is_reserved(name: &str) -> bool {
		ALL.contains(&name)
	}
}

/// A single attribute value.
///
/// Engines treat [`Bool(false)`](`AttributeValue::Bool`) as an absent attribute and [`Bool(true)`](`AttributeValue::Bool`)
/// as a present but empty one, which matches HTML boolean attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
	Text(String),
	Number(f64),
	Bool(bool),
}

impl AttributeValue {
	/// The value to write into the DOM, or [`None`] if the attribute should be absent.
	#[must_use]
	pub fn as_dom_value(&self) -> Option<Cow<'_, str>> {
		match self {
			Self::Text(text) => Some(Cow::Borrowed(text)),
			Self::Number(number) => Some(Cow::Owned(number.to_string())),
			Self::Bool(true) => Some(Cow::Borrowed("")),
			Self::Bool(false) => None,
		}
	}

	#[must_use]
	pub fn is_truthy(&self) -> bool {
		match self {
			Self::Text(text) => !text.is_empty(),
			Self::Number(number) => *number != 0.0 && !number.is_nan(),
			Self::Bool(value) => *value,
		}
	}
}

impl Display for AttributeValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Text(text) => f.write_str(text),
			Self::Number(number) => Display::fmt(number, f),
			Self::Bool(value) => Display::fmt(value, f),
		}
	}
}

impl From<&str> for AttributeValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}

impl From<String> for AttributeValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

impl From<&String> for AttributeValue {
	fn from(text: &String) -> Self {
		Self::Text(text.clone())
	}
}

impl From<bool> for AttributeValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<f64> for AttributeValue {
	fn from(number: f64) -> Self {
		Self::Number(number)
	}
}

impl From<i32> for AttributeValue {
	fn from(number: i32) -> Self {
		Self::Number(number.into())
	}
}

impl From<u32> for AttributeValue {
	fn from(number: u32) -> Self {
		Self::Number(number.into())
	}
}

impl From<usize> for AttributeValue {
	#[allow(clippy::cast_precision_loss)]
	fn from(number: usize) -> Self {
		Self::Number(number as f64)
	}
}

/// A `$computed` entry: either a literal or a function of the render data.
pub enum Computed<D> {
	Value(AttributeValue),
	Function(Rc<dyn Fn(&D) -> AttributeValue>),
}

impl<D> Computed<D> {
	pub fn function<V: Into<AttributeValue>>(function: impl Fn(&D) -> V + 'static) -> Self {
		Self::Function(Rc::new(move |data: &D| function(data).into()))
	}

	/// Evaluates this entry for one render. Functions are called every time.
	pub fn evaluate(&self, data: &D) -> AttributeValue {
		match self {
			Self::Value(value) => value.clone(),
			Self::Function(function) => function(data),
		}
	}
}

impl<D> Clone for Computed<D> {
	fn clone(&self) -> Self {
		match self {
			Self::Value(value) => Self::Value(value.clone()),
			Self::Function(function) => Self::Function(Rc::clone(function)),
		}
	}
}

impl<D> Debug for Computed<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Function(function) => f.debug_tuple("Function").field(&Rc::as_ptr(function)).finish(),
		}
	}
}

/// The two accepted shapes of a `$static` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Statics {
	Map(Vec<(String, AttributeValue)>),
	/// Alternating names and values, `[name, value, name, value, …]`.
	Flat(Vec<AttributeValue>),
}

impl Statics {
	pub fn map<N: Into<String>, V: Into<AttributeValue>>(entries: impl IntoIterator<Item = (N, V)>) -> Self {
		Self::Map(entries.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
	}

	pub fn flat<V: Into<AttributeValue>>(items: impl IntoIterator<Item = V>) -> Self {
		Self::Flat(items.into_iter().map(Into::into).collect())
	}

	fn to_pairs(&self) -> Vec<(String, AttributeValue)> {
		match self {
			Self::Map(pairs) => pairs.clone(),
			Self::Flat(items) => {
				let mut chunks = items.chunks_exact(2);
				let pairs = chunks.by_ref().map(|pair| (pair[0].to_string(), pair[1].clone())).collect();
				if let [dangling] = chunks.remainder() {
					warn!("Dropping `$static` name {:?} without a value.", dangling.to_string());
				}
				pairs
			}
		}
	}
}

/// A value as written into an [`AttributeBag`], before classification.
pub enum RawAttribute<D> {
	Value(AttributeValue),
	Statics(Statics),
	Computed(Vec<(String, Computed<D>)>),
	Events(Vec<(String, EventListener)>),
}

impl<D> RawAttribute<D> {
	fn kind(&self) -> &'static str {
		match self {
			Self::Value(_) => "value",
			Self::Statics(_) => "statics",
			Self::Computed(_) => "computed map",
			Self::Events(_) => "event map",
		}
	}
}

impl<D> Debug for RawAttribute<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Statics(statics) => f.debug_tuple("Statics").field(statics).finish(),
			Self::Computed(computed) => f.debug_tuple("Computed").field(computed).finish(),
			Self::Events(events) => f.debug_tuple("Events").field(&EventNames(events)).finish(),
		}
	}
}

macro_rules! raw_attribute_from_value {
	($($type:ty),*$(,)?) => {$(
		impl<D> From<$type> for RawAttribute<D> {
			fn from(value: $type) -> Self {
				Self::Value(value.into())
			}
		}
	)*};
}
raw_attribute_from_value!(AttributeValue, &str, String, &String, bool, f64, i32, u32, usize);

impl<D> From<Statics> for RawAttribute<D> {
	fn from(statics: Statics) -> Self {
		Self::Statics(statics)
	}
}

/// An ordered attribute map as supplied by the caller.
///
/// Inserting a name that is already present replaces its value but keeps its original position,
/// so plain attributes are emitted in first-insertion order.
pub struct AttributeBag<D> {
	entries: Vec<(String, RawAttribute<D>)>,
}

/// Shorthand for [`AttributeBag::new`].
#[must_use]
pub fn attrs<D>() -> AttributeBag<D> {
	AttributeBag::new()
}

impl<D> Default for AttributeBag<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D> Debug for AttributeBag<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.entries.iter().map(|(name, value)| (name, value))).finish()
	}
}

impl<D> AttributeBag<D> {
	#[must_use]
	pub fn new() -> Self {
		Self { entries: Vec::new() }
	}

	/// Sets `name` to `value`, returning the replaced value.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawAttribute<D>>) -> Option<RawAttribute<D>> {
		let name = name.into();
		let value = value.into();
		match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
			Some((_, slot)) => Some(core::mem::replace(slot, value)),
			None => {
				self.entries.push((name, value));
				None
			}
		}
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&RawAttribute<D>> {
		self.entries.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &RawAttribute<D>)> {
		self.entries.iter().map(|(name, value)| (name.as_str(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Plain attribute, emitted as-is on every render.
	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
		self.insert(name, RawAttribute::Value(value.into()));
		self
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<String>) -> Self {
		self.insert(reserved::KEY, AttributeValue::Text(key.into()));
		self
	}

	#[must_use]
	pub fn statics<N: Into<String>, V: Into<AttributeValue>>(mut self, entries: impl IntoIterator<Item = (N, V)>) -> Self {
		self.insert(reserved::STATIC, Statics::map(entries));
		self
	}

	/// Statics given as alternating names and values.
	#[must_use]
	pub fn static_pairs<V: Into<AttributeValue>>(mut self, items: impl IntoIterator<Item = V>) -> Self {
		self.insert(reserved::STATIC, Statics::flat(items));
		self
	}

	#[must_use]
	pub fn computed<V: Into<AttributeValue>>(self, name: impl Into<String>, function: impl Fn(&D) -> V + 'static) -> Self {
		self.push_computed(name.into(), Computed::function(function))
	}

	/// A literal `$computed` entry, emitted before plain attributes.
	#[must_use]
	pub fn computed_value(self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
		self.push_computed(name.into(), Computed::Value(value.into()))
	}

	#[must_use]
	pub fn reference(mut self) -> Self {
		self.insert(reserved::REF, true);
		self
	}

	#[must_use]
	pub fn id(mut self, id: impl Into<AttributeValue>) -> Self {
		self.insert(reserved::ID, RawAttribute::Value(id.into()));
		self
	}

	#[must_use]
	pub fn on(mut self, name: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
		let binding = (name.into(), event::listener(handler));
		match self.entries.iter_mut().find(|(name, _)| name == reserved::EVENTS) {
			Some((_, RawAttribute::Events(events))) => events.push(binding),
			Some((_, slot)) => *slot = RawAttribute::Events(vec![binding]),
			None => self.entries.push((reserved::EVENTS.to_owned(), RawAttribute::Events(vec![binding]))),
		}
		self
	}

	fn push_computed(mut self, name: String, computed: Computed<D>) -> Self {
		let entry = (name, computed);
		match self.entries.iter_mut().find(|(name, _)| name == reserved::COMPUTED) {
			Some((_, RawAttribute::Computed(list))) => list.push(entry),
			Some((_, slot)) => *slot = RawAttribute::Computed(vec![entry]),
			None => self.entries.push((reserved::COMPUTED.to_owned(), RawAttribute::Computed(vec![entry]))),
		}
		self
	}

	/// Splits this bag into its [`Classified`] parts.
	///
	/// Reserved names are applied in the order `$key`, `$static`, `$computed`, `$ref`, `$id`, `$events`,
	/// independently of where they were inserted.
	///
	/// # Errors
	///
	/// [`Error::MissingKey`] if `$static` is present without a truthy `$key`.
	/// [`Error::InvalidAttribute`] if an entry holds the wrong kind of value for its name.
	pub fn classify(&self) -> Result<Classified<D>> {
		let mut classified = Classified::default();

		if let Some(key) = self.get(reserved::KEY) {
			classified.key = match key {
				RawAttribute::Value(value) => Some(value).filter(|value| value.is_truthy()).map(ToString::to_string),
				other => return Err(invalid(reserved::KEY, "a value", other)),
			};
		}

		if let Some(statics) = self.get(reserved::STATIC) {
			if classified.key.is_none() {
				return Err(Error::MissingKey);
			}
			classified.statics = match statics {
				RawAttribute::Statics(statics) => statics.to_pairs(),
				other => return Err(invalid(reserved::STATIC, "statics", other)),
			};
		}

		if let Some(computed) = self.get(reserved::COMPUTED) {
			classified.computed = match computed {
				RawAttribute::Computed(computed) => computed.clone(),
				other => return Err(invalid(reserved::COMPUTED, "a computed map", other)),
			};
		}

		if let Some(reference) = self.get(reserved::REF) {
			classified.exposes_node = match reference {
				RawAttribute::Value(value) => value.is_truthy(),
				other => return Err(invalid(reserved::REF, "a value", other)),
			};
		}

		if let Some(id) = self.get(reserved::ID) {
			match id {
				RawAttribute::Value(AttributeValue::Bool(expose)) => classified.exposes_node |= *expose,
				RawAttribute::Value(value) if value.is_truthy() => {
					classified.id = Some(value.to_string());
					classified.exposes_node = true;
				}
				RawAttribute::Value(_) => trace!("Ignoring empty `$id`."),
				other => return Err(invalid(reserved::ID, "a value", other)),
			}
		}

		if let Some(events) = self.get(reserved::EVENTS) {
			classified.events = match events {
				RawAttribute::Events(events) => events.clone(),
				other => return Err(invalid(reserved::EVENTS, "an event map", other)),
			};
		}

		for (name, value) in self.entries.iter().filter(|(name, _)| !reserved::is_reserved(name)) {
			match value {
				RawAttribute::Value(value) => classified.plain.push((name.clone(), value.clone())),
				other => return Err(invalid(name, "a value", other)),
			}
		}

		Ok(classified)
	}
}

fn invalid<D>(name: &str, expected: &'static str, found: &RawAttribute<D>) -> Error {
	warn!("Attribute {:?} expects {} but holds a {}.", name, expected, found.kind());
	Error::InvalidAttribute { name: name.to_owned(), expected }
}

/// The result of [`AttributeBag::classify`]. Immutable once built.
pub struct Classified<D> {
	key: Option<String>,
	statics: Vec<(String, AttributeValue)>,
	computed: Vec<(String, Computed<D>)>,
	plain: Vec<(String, AttributeValue)>,
	id: Option<String>,
	exposes_node: bool,
	events: Vec<(String, EventListener)>,
}

impl<D> Default for Classified<D> {
	fn default() -> Self {
		Self {
			key: None,
			statics: Vec::new(),
			computed: Vec::new(),
			plain: Vec::new(),
			id: None,
			exposes_node: false,
			events: Vec::new(),
		}
	}
}

impl<D> Clone for Classified<D> {
	fn clone(&self) -> Self {
		Self {
			key: self.key.clone(),
			statics: self.statics.clone(),
			computed: self.computed.clone(),
			plain: self.plain.clone(),
			id: self.id.clone(),
			exposes_node: self.exposes_node,
			events: self.events.clone(),
		}
	}
}

impl<D> Debug for Classified<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Classified")
			.field("key", &self.key)
			.field("statics", &self.statics)
			.field("computed", &self.computed)
			.field("plain", &self.plain)
			.field("id", &self.id)
			.field("exposes_node", &self.exposes_node)
			.field("events", &EventNames(&self.events))
			.finish()
	}
}

impl<D> Classified<D> {
	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	#[must_use]
	pub fn statics(&self) -> &[(String, AttributeValue)] {
		&self.statics
	}

	#[must_use]
	pub fn computed(&self) -> &[(String, Computed<D>)] {
		&self.computed
	}

	/// Attributes passed through unchanged. Never contains a [reserved] name.
	#[must_use]
	pub fn plain(&self) -> &[(String, AttributeValue)] {
		&self.plain
	}

	/// The `id` requested through `$id`, if it was given as text.
	#[must_use]
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	/// Whether `$ref` or `$id` asked for the live node to be exposed.
	#[must_use]
	pub fn exposes_node(&self) -> bool {
		self.exposes_node
	}

	#[must_use]
	pub fn events(&self) -> &[(String, EventListener)] {
		&self.events
	}

	/// Whether anything beyond the key and statics has to be emitted on each render.
	#[must_use]
	pub fn is_dynamic(&self) -> bool {
		!self.computed.is_empty() || !self.plain.is_empty() || self.id.is_some() || !self.events.is_empty()
	}
}

struct EventNames<'a>(&'a [(String, EventListener)]);
impl Debug for EventNames<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.0.iter().map(|(name, _)| name)).finish()
	}
}
