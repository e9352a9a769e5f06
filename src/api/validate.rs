//! Client-side form checks, run before a request is built.

use regex::Regex;
use std::sync::OnceLock;

use super::error::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
  static EMAIL: OnceLock<Regex> = OnceLock::new();
  EMAIL.get_or_init(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern is valid")
  })
}

/// Reject empty or whitespace-only values.
pub fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    return Err(ValidationError::Required(field));
  }
  Ok(())
}

pub fn email(value: &str) -> Result<(), ValidationError> {
  required("Email", value)?;
  if !email_pattern().is_match(value.trim()) {
    return Err(ValidationError::InvalidEmail);
  }
  Ok(())
}

pub fn password(value: &str) -> Result<(), ValidationError> {
  required("Password", value)?;
  if value.chars().count() < MIN_PASSWORD_LEN {
    return Err(ValidationError::TooShort {
      field: "Password",
      min: MIN_PASSWORD_LEN,
    });
  }
  Ok(())
}

/// Turn a `YYYY-MM-DD` date into the midnight-UTC timestamp the server
/// stores. Values that already carry a time part pass through untouched.
pub fn normalize_date(field: &'static str, value: &str) -> Result<String, ValidationError> {
  let value = value.trim();
  required(field, value)?;

  if value.contains('T') {
    return Ok(value.to_string());
  }

  chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .map(|date| format!("{}T00:00:00.000Z", date.format("%Y-%m-%d")))
    .map_err(|_| ValidationError::InvalidDate {
      field,
      value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_email_shape() {
    assert_eq!(email("owner@example.com"), Ok(()));
    assert_eq!(email("Owner.Name+tag@Mail.Example.IO"), Ok(()));
    assert_eq!(email(""), Err(ValidationError::Required("Email")));
    assert_eq!(email("owner@example"), Err(ValidationError::InvalidEmail));
    assert_eq!(email("no-at-sign.com"), Err(ValidationError::InvalidEmail));
  }

  #[test]
  fn test_password_length() {
    assert_eq!(password("secret"), Ok(()));
    assert_eq!(
      password("12345"),
      Err(ValidationError::TooShort {
        field: "Password",
        min: 6
      })
    );
    assert_eq!(password("   "), Err(ValidationError::Required("Password")));
  }

  #[test]
  fn test_normalize_date() {
    assert_eq!(
      normalize_date("Start date", "2023-04-01").unwrap(),
      "2023-04-01T00:00:00.000Z"
    );
    assert_eq!(
      normalize_date("Start date", "2023-04-01T09:30:00.000Z").unwrap(),
      "2023-04-01T09:30:00.000Z"
    );
    assert_eq!(
      normalize_date("End date", "04/01/2023"),
      Err(ValidationError::InvalidDate {
        field: "End date",
        value: "04/01/2023".to_string()
      })
    );
    assert_eq!(
      normalize_date("End date", ""),
      Err(ValidationError::Required("End date"))
    );
  }
}
