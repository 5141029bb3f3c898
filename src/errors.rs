use thiserror::Error;

/// Errors that can occur while loading, validating or annotating a
/// documentation tree.
#[derive(Error, Debug)]
pub enum XrefError {
    #[error("file error: {message} (path: {path})")]
    File { message: String, path: String },

    #[error("parse error: {message} (path: {path}, line: {line:?})")]
    Parse {
        message: String,
        path: String,
        line: Option<u32>,
    },

    #[error("malformed documentation tree: {message}")]
    MalformedTree { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `XrefError`.
pub type Result<T> = std::result::Result<T, XrefError>;

/// Reasons a symbol reference cannot be turned into a lookup.
///
/// These are local to a single `@uses` tag and never abort a pass. Only
/// [`ReferenceError::ControlCharacter`] counts as a failed lookup; the
/// others describe references that simply match nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("empty reference")]
    Empty,

    #[error("reference '{0}' has no class name")]
    MissingClass(String),

    #[error("reference '{0}' has no member name")]
    MissingMember(String),

    #[error("reference '{0}' contains control characters")]
    ControlCharacter(String),
}
