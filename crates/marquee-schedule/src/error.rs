//! Error types for schedule evaluation.

use thiserror::Error;

/// Errors raised while interpreting a schedule document.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The document is structurally unusable: missing or empty `items`,
    /// or item entries that are not objects.
    #[error("invalid schedule data: {0}")]
    InvalidDocument(String),

    /// A time-defined window carries a date or time field that is missing
    /// or cannot be parsed. The window fails closed.
    #[error("window {field} is missing or unparsable: {value}")]
    UnparsableTime { field: &'static str, value: String },
}
