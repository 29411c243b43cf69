// crates/resilience/src/lib.rs
//! Failure classification and retry policies
//!
//! This crate provides:
//! - Classification of I/O failures into fatal and recoverable kinds
//! - Retry with exponential backoff for ordinary requests
//!
//! # Example
//!
//! ```rust
//! use stowage_resilience::{classify_io_error, FailureKind, RetryPolicy};
//! use std::io;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3).with_initial_delay(Duration::from_millis(100));
//! assert_eq!(policy.max_attempts(), 3);
//!
//! let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
//! assert_eq!(classify_io_error(&reset), FailureKind::Other);
//! assert!(!FailureKind::Other.is_fatal());
//! ```

mod failure;
mod retry;

pub use failure::{classify_error_chain, classify_io_error, FailureKind};
pub use retry::{with_retry, RetryPolicy};
