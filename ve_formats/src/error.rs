use thiserror::Error;

/// Fatal failures while reading an event document or generating code from it.
///
/// Translation is all-or-nothing: any of these aborts the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("malformed graph: {0}")]
    MalformedGraph(String),
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
    #[error("missing content: {0}")]
    MissingContent(String),
}

pub type Result<T, E = EventError> = std::result::Result<T, E>;
