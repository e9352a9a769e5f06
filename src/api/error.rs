use thiserror::Error;

use crate::auth::token::DecodeError;

/// A form that must not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{0} is required")]
  Required(&'static str),

  #[error("Invalid email address")]
  InvalidEmail,

  #[error("{field} must be at least {min} characters")]
  TooShort { field: &'static str, min: usize },

  #[error("{field} is not a date (expected YYYY-MM-DD): {value}")]
  InvalidDate { field: &'static str, value: String },

  #[error("{field} is not a valid id: {value}")]
  InvalidId { field: &'static str, value: String },
}

/// Every way an API operation can fail. None of these are fatal; they belong
/// to the single action that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
  #[error("invalid credential: {0}")]
  Decode(#[from] DecodeError),

  /// The request never got a response
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with a failure; `message` is the server's own text
  #[error("{message}")]
  Api { status: u16, message: String },

  /// Rejected before anything was sent
  #[error(transparent)]
  Validation(#[from] ValidationError),

  /// A success response whose body did not match the expected schema
  #[error("unexpected response: {0}")]
  Envelope(String),

  #[error("storage error: {0}")]
  Storage(String),
}
