use thiserror::Error;

/// Fatal conditions raised while classifying or rendering an element tree.
///
/// These are programmer errors rather than transient failures: nothing here is retried,
/// and none of them are swallowed on the way out of [`Element::render`](`crate::Element::render`)
/// or [`Element::patch_into`](`crate::Element::patch_into`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
	#[error("missing `$key` for node with `$static` attributes")]
	MissingKey,

	#[error("attribute `{name}` expects {expected}")]
	InvalidAttribute { name: String, expected: &'static str },

	#[error("depth limit ({limit}) reached while rendering <{tag}>")]
	DepthLimit { limit: usize, tag: String },

	#[error("invalid patch target: {0}")]
	InvalidTarget(String),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
