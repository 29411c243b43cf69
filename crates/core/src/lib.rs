//! Shared value types for the stowage object-storage client
//!
//! The byte-range model lives here so that the network layer, the CLI and
//! any other consumer agree on how `Range` and `Content-Range` headers are
//! parsed, rendered and compared.

pub mod error;
pub mod types;

pub use error::{RangeError, RangeField, RangeResult};
pub use types::{HttpRange, RangeKind};
