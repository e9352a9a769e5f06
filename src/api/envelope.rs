//! The `{success, message, data}` wrapper every API response uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ClientError;

/// Decoded response envelope around a typed payload.
///
/// Only successful envelopes decode, so the `success` flag is not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
  #[serde(default)]
  pub message: String,
  pub data: T,
}

/// First decoding pass: the envelope with an untyped payload.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
  success: bool,
  #[serde(default)]
  message: String,
  #[serde(default)]
  data: serde_json::Value,
}

/// Error bodies only promise a message.
#[derive(Debug, Deserialize)]
struct ErrorBody {
  message: String,
}

impl<T: DeserializeOwned> ApiResponse<T> {
  /// Decode a response, checking the status, then the envelope, then the
  /// payload against `T`.
  pub fn decode(status: u16, body: &[u8]) -> Result<Self, ClientError> {
    if !(200..300).contains(&status) {
      return Err(ClientError::Api {
        status,
        message: error_message(status, body),
      });
    }

    let raw: RawEnvelope =
      serde_json::from_slice(body).map_err(|e| ClientError::Envelope(e.to_string()))?;

    // A 2xx that says it failed is still a failure
    if !raw.success {
      return Err(ClientError::Api {
        status,
        message: raw.message,
      });
    }

    let data = serde_json::from_value(raw.data)
      .map_err(|e| ClientError::Envelope(format!("payload: {}", e)))?;

    Ok(Self {
      message: raw.message,
      data,
    })
  }
}

fn error_message(status: u16, body: &[u8]) -> String {
  if let Ok(err) = serde_json::from_slice::<ErrorBody>(body) {
    return err.message;
  }
  let text = String::from_utf8_lossy(body);
  let text = text.trim();
  if text.is_empty() {
    format!("request failed with status {}", status)
  } else {
    text.to_string()
  }
}
