use thiserror::Error;

/// Why a single stored record could not become a [`crate::Message`].
///
/// Decode errors never fail a whole page; the offending record is skipped.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Timestamp is null")]
    NullTimestamp,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Malformed field: {0}")]
    Malformed(&'static str),
}
