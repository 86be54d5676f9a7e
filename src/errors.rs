use thiserror::Error;

/// Errors that can occur while building a call graph.
#[derive(Error, Debug)]
pub enum CallScopeError {
    #[error("file error: {message} (path: {path})")]
    File { message: String, path: String },

    #[error("parse error: {message} (path: {path}, line: {line:?})")]
    Parse {
        message: String,
        path: String,
        line: Option<u32>,
    },

    #[error("lookup error: {message} (identifier: {identifier})")]
    Lookup { message: String, identifier: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("task error: {message}")]
    Task { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `CallScopeError`.
pub type Result<T> = std::result::Result<T, CallScopeError>;
