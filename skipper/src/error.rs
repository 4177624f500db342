use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failure, independent of which backend produced it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input: unparsable URL, unsupported context type, invalid
    /// description field. During adaptor binding this is a decline, not an
    /// operational failure.
    BadParameter,
    /// Generic operational failure: backend unreachable, external tool
    /// exited nonzero, filesystem trouble.
    NoSuccess,
    /// The operation is not valid for the job's current lifecycle state.
    IncorrectState,
    /// An operation's time bound was exceeded.
    Timeout,
    /// The backend does not implement this operation.
    Unsupported,
    /// No adaptor is registered for, or accepted, the requested target.
    NotFound,
}

impl ErrorKind {
    /// String form used in log fields and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadParameter => "bad parameter",
            ErrorKind::NoSuccess => "no success",
            ErrorKind::IncorrectState => "incorrect state",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::NotFound => "not found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error value carried by every fallible operation in the crate.
///
/// An error is its classification, a human-readable message, and an optional
/// chained cause (the underlying I/O or tool error). Diagnostic context such
/// as captured stderr belongs in the message; stack traces are a logging
/// concern and are deliberately not part of this type.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Shorthand for [`ErrorKind::BadParameter`].
    pub fn bad_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadParameter, message)
    }

    /// Shorthand for [`ErrorKind::NoSuccess`].
    pub fn no_success(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoSuccess, message)
    }

    /// Shorthand for [`ErrorKind::IncorrectState`].
    pub fn incorrect_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IncorrectState, message)
    }

    /// Shorthand for [`ErrorKind::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Shorthand for [`ErrorKind::Unsupported`].
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    /// Shorthand for [`ErrorKind::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Attach the underlying error that caused this one.
    pub fn with_cause(
        mut self,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// The error's classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message, without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a binding attempt that returned this error should be treated
    /// as "this adaptor cannot handle the target" rather than a failure.
    ///
    /// The dispatch scan advances past declines and fails fast on anything
    /// else.
    pub fn is_decline(&self) -> bool {
        self.kind == ErrorKind::BadParameter
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
