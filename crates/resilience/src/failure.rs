// crates/resilience/src/failure.rs
//! Fatal vs. recoverable failure classification
//!
//! A failure seen while talking to a server falls into one of a fixed set of
//! kinds. Four of them can never be fixed by simply asking again and are
//! fatal; everything else is recoverable.

use std::error::Error as StdError;
use std::fmt;
use std::io;

/// Classification of an I/O failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The operation was interrupted or timed out
    Interrupted,
    /// Host name could not be resolved
    UnknownHost,
    /// The remote end refused the connection
    ConnectionRefused,
    /// TLS handshake or certificate failure
    Tls,
    /// Any other I/O failure (reset, broken pipe, truncated body, ...)
    Other,
}

impl FailureKind {
    /// Returns true for kinds that must never be retried
    pub fn is_fatal(self) -> bool {
        !matches!(self, FailureKind::Other)
    }

    /// Returns true for kinds that may be retried
    pub fn is_recoverable(self) -> bool {
        !self.is_fatal()
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::UnknownHost => write!(f, "unknown host"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::Tls => write!(f, "TLS"),
            Self::Other => write!(f, "I/O"),
        }
    }
}

/// Classifies a standard I/O error by its kind
pub fn classify_io_error(error: &io::Error) -> FailureKind {
    match error.kind() {
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut => FailureKind::Interrupted,
        io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
        _ => classify_message(&error.to_string()).unwrap_or(FailureKind::Other),
    }
}

/// Classifies an error by walking its source chain
///
/// `io::Error`s are classified by kind, then by their own message. Wrapper
/// errors are skipped: their text may embed the request URL, so only a leaf
/// error (one without a source) is matched on its message.
pub fn classify_error_chain(error: &(dyn StdError + 'static)) -> FailureKind {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);

    while let Some(err) = current {
        let source = err.source();

        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            let kind = classify_io_error(io_err);
            if kind != FailureKind::Other {
                return kind;
            }
        } else if source.is_none() {
            if let Some(kind) = classify_message(&err.to_string()) {
                return kind;
            }
        }

        current = source;
    }

    FailureKind::Other
}

fn classify_message(message: &str) -> Option<FailureKind> {
    let message = message.to_ascii_lowercase();

    if message.contains("dns error")
        || message.contains("failed to lookup address")
        || message.contains("name or service not known")
        || message.contains("no such host")
    {
        Some(FailureKind::UnknownHost)
    } else if message.contains("connection refused") {
        Some(FailureKind::ConnectionRefused)
    } else if message.contains("certificate")
        || message.contains("tls")
        || message.contains("handshake")
    {
        Some(FailureKind::Tls)
    } else if message.contains("timed out") {
        Some(FailureKind::Interrupted)
    } else {
        None
    }
}
