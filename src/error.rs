//! Unified error types for curlhandle.
//!
//! Every fallible operation on a [`Handle`](crate::Handle) fails with exactly
//! one [`Error`] variant:
//! - argument misuse while constructing a handle
//! - use of a handle that was closed or detached
//! - a libcurl call that failed, or a warning escalated while it ran
//! - a transfer (or pause) that libcurl reported as failed
//!
//! Runtime failures keep their cause reachable through
//! [`std::error::Error::source`].

use thiserror::Error;

/// Unified error type for all curlhandle operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input given to a constructor or factory.
    ///
    /// The message names what was received.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The libcurl handle has been closed or detached.
    #[error("libcurl handle has been closed or detached")]
    NoOpenHandle,

    /// A libcurl call failed, or a warning was escalated while it ran.
    #[error("{message}")]
    Runtime {
        /// Description of the operation that failed
        message: String,
        /// The failure that caused it, if any
        #[source]
        source: Option<Box<Error>>,
    },

    /// libcurl reported a failed transfer or pause request.
    #[error("libcurl error {code}: {message}")]
    Transfer {
        /// Native `CURLcode`
        code: i32,
        /// Error buffer contents, or the generic description of `code`
        message: String,
    },

    /// A soft failure captured while a libcurl call was in progress.
    #[error("warning: {0}")]
    Warning(String),
}

impl Error {
    pub(crate) fn runtime(message: impl Into<String>, source: Self) -> Self {
        Self::Runtime {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn runtime_msg(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    /// Build a transfer error from a native code, using libcurl's own
    /// description when no better message is at hand.
    pub(crate) fn transfer(code: curl_sys::CURLcode, message: Option<String>) -> Self {
        let message = message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| describe(code));
        Self::Transfer {
            code: code_number(code),
            message,
        }
    }

    /// Native error code carried by a transfer error.
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Transfer { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check if this error belongs to the runtime family.
    ///
    /// Transfer and no-open-handle errors are specialised runtime errors.
    pub const fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::Runtime { .. } | Self::Transfer { .. } | Self::NoOpenHandle
        )
    }

    /// Check if the handle was closed or detached.
    pub const fn is_no_open_handle(&self) -> bool {
        matches!(self, Self::NoOpenHandle)
    }

    /// Check if libcurl reported a failed transfer or pause.
    pub const fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }

    /// Get the error category.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NoOpenHandle => ErrorKind::NoOpenHandle,
            Self::Runtime { .. } => ErrorKind::Runtime,
            Self::Transfer { .. } => ErrorKind::Transfer,
            Self::Warning(_) => ErrorKind::Warning,
        }
    }
}

// `CURLcode` is unsigned outside MSVC; every defined code fits an `i32`.
#[allow(clippy::cast_possible_wrap)]
const fn code_number(code: curl_sys::CURLcode) -> i32 {
    code as i32
}

fn describe(code: curl_sys::CURLcode) -> String {
    curl::Error::new(code).description().to_owned()
}

/// Error category labels.
///
/// Used for classifying errors in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid constructor input
    InvalidArgument,
    /// Closed or detached handle
    NoOpenHandle,
    /// Failed libcurl call
    Runtime,
    /// Failed transfer or pause
    Transfer,
    /// Escalated warning
    Warning,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::NoOpenHandle => write!(f, "no_open_handle"),
            Self::Runtime => write!(f, "runtime"),
            Self::Transfer => write!(f, "transfer"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Result type alias for curlhandle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn runtime_keeps_cause() {
        let err = Error::runtime(
            "error occurred while setting libcurl session option",
            Error::warning("bad value"),
        );
        assert!(err.is_runtime());
        let source = err.source().expect("cause");
        assert_eq!(source.to_string(), "warning: bad value");
    }

    #[test]
    fn transfer_and_no_open_handle_are_runtime() {
        assert!(Error::NoOpenHandle.is_runtime());
        assert!(Error::transfer(6, Some("Could not resolve host".into())).is_runtime());
        assert!(!Error::InvalidArgument("x".into()).is_runtime());
        assert!(!Error::warning("x").is_runtime());
    }

    #[test]
    fn transfer_falls_back_to_native_description() {
        let err = Error::transfer(6, None);
        assert_eq!(err.code(), Some(6));
        assert!(!err.to_string().ends_with(": "));
        let err = Error::transfer(7, Some(String::new()));
        assert!(matches!(err, Error::Transfer { ref message, .. } if !message.is_empty()));
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Error::NoOpenHandle.kind().to_string(), "no_open_handle");
        assert_eq!(Error::transfer(28, None).kind(), ErrorKind::Transfer);
        assert_eq!(Error::runtime_msg("x").kind(), ErrorKind::Runtime);
    }
}
