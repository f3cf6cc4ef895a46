use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    /// The backing file could not be opened, read or written.
    Stream,
    /// Bad magic, unsupported version, truncated or malformed record.
    Format,
    /// Grid dimensions outside the persistable range.
    Bounds,
    /// In-memory collections disagree with themselves; nothing was written.
    Consistency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Stream, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Format, message)
    }

    pub fn bounds(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Bounds, message)
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Consistency, message)
    }

    /// Wraps an I/O failure on the backing file, keeping the file label.
    pub fn from_stream(what: &str, err: &io::Error) -> Self {
        Self::stream(format!("{what}: {err}"))
    }

    /// Wraps a decode failure. Decoding runs over bytes already in memory,
    /// so every I/O error it raises is a format problem.
    pub fn from_decode(what: &str, err: &io::Error) -> Self {
        Self::format(format!("{what}: {err}"))
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
