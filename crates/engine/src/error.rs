use std::fmt;

/// Engine-level failure. Every error carries a short message suitable for
/// the caller; the variant is the wire-level error kind.
#[derive(Debug)]
pub enum EngineError {
    /// Bad mapping, unsupported extension, or empty input after decode.
    Input(String),
    /// Format converter failure, zip without a usable member, malformed data.
    Decode(String),
    /// Row-count or file-size policy limit exceeded.
    Limit(String),
    /// Staging store, cursor, or IO failure.
    Internal(String),
}

impl EngineError {
    /// Stable error-kind constant for API surfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "INPUT_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Limit(_) => "LIMIT_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Input(msg) | Self::Decode(msg) | Self::Limit(msg) | Self::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(msg) => write!(f, "input error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Limit(msg) => write!(f, "limit exceeded: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Internal(format!("staging store: {e}"))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(format!("IO: {e}"))
    }
}

impl From<cdrecon_io::DecodeError> for EngineError {
    fn from(e: cdrecon_io::DecodeError) -> Self {
        match e {
            // The engine validates declared extensions up front, so a decoder
            // complaint about one is still a decode-level failure here.
            cdrecon_io::DecodeError::Io(msg) => Self::Internal(format!("IO: {msg}")),
            other => Self::Decode(other.to_string()),
        }
    }
}
