//! Validation and field assignment for config sections

use std::fmt::Display;
use std::str::FromStr;

pub use crate::error::ValidationError;

/// A `[section]` of the config file
pub trait ConfigSection: Default {
    /// Table name in the TOML file
    const NAME: &'static str;

    /// Field names accepted by [`ConfigSection::set`]
    const FIELDS: &'static [&'static str];

    /// Returns every invalid field, or `Ok` when the section is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Assigns `field` from its textual form
    ///
    /// Returns `Ok(false)` when the section has no such field.
    fn set(&mut self, field: &str, value: &str) -> Result<bool, ValidationError>;
}

pub struct Validator;

impl Validator {
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min || value > max {
            Err(
                ValidationError::new(field, format!("must be between {} and {}", min, max))
                    .with_value(value),
            )
        } else {
            Ok(())
        }
    }

    /// Visible ASCII, spaces and tabs only, so the value is safe in a header
    pub fn header_value(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.bytes().all(|b| b == b' ' || b == b'\t' || b.is_ascii_graphic()) {
            Ok(())
        } else {
            Err(ValidationError::new(field, "must be printable ASCII").with_value(value.escape_debug()))
        }
    }

    /// Parses a value given on the command line or in the environment
    pub fn parse<T: FromStr>(value: &str, field: &str) -> Result<T, ValidationError> {
        value
            .trim()
            .parse()
            .map_err(|_| ValidationError::new(field, "cannot parse value").with_value(value))
    }

    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(Result::err).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
