//! Domain value types

mod range;

pub use range::{HttpRange, RangeKind};
