#![doc(html_root_url = "https://docs.rs/creme-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod attributes;
pub mod element;
mod error;
pub mod event;
pub mod html;
mod interpolate;
pub mod memory;
pub mod notifications;
pub mod render;
pub mod web;

pub use attributes::{attrs, AttributeBag, AttributeValue};
pub use element::{computed, Child, Content, Element};
pub use error::{Error, Result};
pub use event::{Event, EventListener};
pub use interpolate::interpolate;
pub use notifications::{Lifecycle, ListenerHandle, Registry};
pub use render::{Patcher, DEFAULT_DEPTH_LIMIT};
