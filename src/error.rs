//! Unified error type.

/// The error type returned by xrequestid's fallible operations.
///
/// Two families live here. Startup failures (binding a port, decoding
/// configuration, resolving a module ID) surface before any request is
/// served. [`Error::Handler`] is the only variant that travels through the
/// middleware chain: a handler produces it and every middleware passes it
/// back to its caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid listen address `{0}`")]
    InvalidAddress(String),

    #[error("invalid header name `{0}`")]
    InvalidHeaderName(String),

    #[error("invalid value for header `{0}`")]
    InvalidHeaderValue(String),

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("module `{0}` is already registered")]
    DuplicateModule(String),

    #[error("handler: {0}")]
    Handler(String),
}

impl Error {
    /// Shorthand for a downstream handler failure.
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}
