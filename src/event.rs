use std::rc::Rc;

/// A DOM event as seen by listeners bound through the `$events` reserved attribute.
#[derive(Debug, Clone)]
pub struct Event {
	kind: String,
	web: Option<web_sys::Event>,
}

/// Listener bound on a live node by the patch engine.
pub type EventListener = Rc<dyn Fn(&Event)>;

impl Event {
	/// Creates an event that isn't backed by a browser event, as dispatched by [`memory::Dom`](`crate::memory::Dom`).
	#[must_use]
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into(), web: None }
	}

	#[must_use]
	pub fn from_web(event: web_sys::Event) -> Self {
		Self { kind: event.type_(), web: Some(event) }
	}

	/// The event type, like `"click"`.
	#[must_use]
	pub fn kind(&self) -> &str {
		&self.kind
	}

	/// The underlying browser event, if there is one.
	#[must_use]
	pub fn as_web(&self) -> Option<&web_sys::Event> {
		self.web.as_ref()
	}
}

pub fn listener(handler: impl Fn(&Event) + 'static) -> EventListener {
	Rc::new(handler)
}
