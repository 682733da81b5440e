//! Shared primitives used across PixelDust crates.

use core::fmt;

/// Result alias used across the workspace.
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Top-level error type shared by every crate in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserError {
    pub code: &'static str,
    pub message: String,
}

impl BrowserError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for BrowserError {}

/// Stable identifier of a browser view (tab or frame).
///
/// The same value is used as the opaque page identity on the content-process
/// side of the IPC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u64);

impl ViewId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Handle to a network response that is still waiting for a body.
///
/// Failures raised while serving such a request are answered by finishing the
/// request with generated content instead of loading a new document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}
