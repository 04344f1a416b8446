//! Node lifecycle notifications, and a key-indexed [`Registry`] that routes them to application callbacks.

use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	mem,
};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{trace, trace_span};

/// A node that was just created or is being removed by a patch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle<N> {
	Created(N),
	Removed(N),
}

impl<N> Lifecycle<N> {
	#[must_use]
	pub fn node(&self) -> &N {
		match self {
			Self::Created(node) | Self::Removed(node) => node,
		}
	}

	#[must_use]
	pub fn into_node(self) -> N {
		match self {
			Self::Created(node) | Self::Removed(node) => node,
		}
	}

	#[must_use]
	pub fn is_removed(&self) -> bool {
		matches!(self, Self::Removed(_))
	}
}

/// A node as reported by a patch engine, together with the identity key it was created with, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord<N> {
	pub node: N,
	pub key: Option<String>,
}

/// Receives the batches of created and removed nodes at the end of each patch transaction.
pub trait LifecycleObserver<N> {
	fn nodes_created(&self, records: &[NodeRecord<N>]);
	fn nodes_removed(&self, records: &[NodeRecord<N>]);
}

/// Buffers lifecycle records during a transaction, for patch engines.
pub struct Notifier<N> {
	observers: Vec<Rc<dyn LifecycleObserver<N>>>,
	created: Vec<NodeRecord<N>>,
	removed: Vec<NodeRecord<N>>,
}

impl<N> Default for Notifier<N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<N> Debug for Notifier<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Notifier")
			.field("observers", &self.observers.len())
			.field("created", &self.created.len())
			.field("removed", &self.removed.len())
			.finish()
	}
}

impl<N> Notifier<N> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			observers: Vec::new(),
			created: Vec::new(),
			removed: Vec::new(),
		}
	}

	pub fn observe(&mut self, observer: Rc<dyn LifecycleObserver<N>>) {
		self.observers.push(observer);
	}

	pub fn created(&mut self, node: N, key: Option<&str>) {
		if !self.observers.is_empty() {
			self.created.push(NodeRecord { node, key: key.map(ToOwned::to_owned) });
		}
	}

	pub fn removed(&mut self, node: N, key: Option<&str>) {
		if !self.observers.is_empty() {
			self.removed.push(NodeRecord { node, key: key.map(ToOwned::to_owned) });
		}
	}

	/// Dispatches buffered records, created ones first.
	pub fn flush(&mut self) {
		let created = mem::take(&mut self.created);
		let removed = mem::take(&mut self.removed);
		trace!("Dispatching {} created and {} removed node(s).", created.len(), removed.len());
		if !created.is_empty() {
			for observer in &self.observers {
				observer.nodes_created(&created);
			}
		}
		if !removed.is_empty() {
			for observer in &self.observers {
				observer.nodes_removed(&removed);
			}
		}
	}
}

type Callback<N> = Rc<dyn Fn(Lifecycle<&N>)>;

struct Registration<N> {
	id: u64,
	callback: Callback<N>,
}

/// Identifies one [`Registry::add`] call. Needed to undo it with [`Registry::remove`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use = "A `ListenerHandle` is the only way to remove its registration."]
pub struct ListenerHandle {
	key: String,
	id: u64,
}

impl ListenerHandle {
	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}
}

/// Maps identity keys to lifecycle callbacks, one per key.
///
/// Attach it to a patch engine as [`LifecycleObserver`]. For each created or removed node that carries a key,
/// the callback registered for that key (if any) is called. Nodes without keys are skipped.
///
/// Registrations are never dropped automatically, not even when their node is removed.
/// Callbacks may add and remove registrations while they are being dispatched.
pub struct Registry<N> {
	listeners: RefCell<HashMap<String, Registration<N>>>,
	next_id: Cell<u64>,
}

impl<N> Default for Registry<N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<N> Debug for Registry<N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("keys", &self.listeners.borrow().keys().collect::<Vec<_>>())
			.field("next_id", &self.next_id.get())
			.finish()
	}
}

impl<N> Registry<N> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			listeners: RefCell::default(),
			next_id: Cell::new(0),
		}
	}

	/// Registers `callback` for `key`, replacing any previous registration for the same key.
	pub fn add(&self, key: impl Into<String>, callback: impl Fn(Lifecycle<&N>) + 'static) -> ListenerHandle {
		let key = key.into();
		let id = self.next_id.get();
		self.next_id.set(id + 1);

		let previous = self.listeners.borrow_mut().insert(key.clone(), Registration { id, callback: Rc::new(callback) });
		if previous.is_some() {
			trace!("Replaced lifecycle listener for key {:?}.", key);
		}
		ListenerHandle { key, id }
	}

	/// Removes the registration `handle` came from.
	///
	/// Returns `false` without changing anything if that registration was already replaced or removed.
	pub fn remove(&self, handle: &ListenerHandle) -> bool {
		let mut listeners = self.listeners.borrow_mut();
		let is_current = listeners.get(&handle.key).map_or(false, |registration| registration.id == handle.id);
		if is_current {
			listeners.remove(&handle.key);
		} else {
			trace!("Ignoring stale lifecycle listener handle for key {:?}.", handle.key);
		}
		is_current
	}

	#[must_use]
	pub fn contains(&self, key: &str) -> bool {
		self.listeners.borrow().contains_key(key)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.listeners.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.listeners.borrow().is_empty()
	}

	pub fn clear(&self) {
		self.listeners.borrow_mut().clear();
	}

	fn dispatch(&self, records: &[NodeRecord<N>], removed: bool) {
		for record in records {
			let key = match record.key.as_deref() {
				Some(key) => key,
				None => continue,
			};
			let callback = self.listeners.borrow().get(key).map(|registration| Rc::clone(&registration.callback));
			match callback {
				Some(callback) => {
					let span = trace_span!("Lifecycle callback", key, removed);
					let _enter = span.enter();
					callback(if removed { Lifecycle::Removed(&record.node) } else { Lifecycle::Created(&record.node) });
				}
				None => trace!("No lifecycle listener for key {:?}.", key),
			}
		}
	}
}

impl<N> LifecycleObserver<N> for Registry<N> {
	fn nodes_created(&self, records: &[NodeRecord<N>]) {
		self.dispatch(records, false);
	}

	fn nodes_removed(&self, records: &[NodeRecord<N>]) {
		self.dispatch(records, true);
	}
}
