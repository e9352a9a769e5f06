//! Credential decoding.
//!
//! Signatures are never checked here: trust in a credential belongs to the
//! server that issued it. The client only reads the claims to make routing
//! decisions and to show who is logged in.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Why a credential could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
  #[error("invalid token format: expected 3 segments, found {0}")]
  Segments(usize),

  #[error("token payload is not base64url: {0}")]
  Base64(String),

  #[error("token payload is not a valid claim set: {0}")]
  Claims(String),
}

/// Role claim carried by a credential.
///
/// Matching is case-sensitive. The issuer is expected to send `Admin` or
/// `User`; anything else is kept verbatim so it can be reported, and it never
/// matches an allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
  User,
  Admin,
  Unrecognized(String),
}

impl Role {
  pub fn parse(raw: &str) -> Self {
    match raw {
      "Admin" => Role::Admin,
      "User" => Role::User,
      other => Role::Unrecognized(other.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Role::Admin => "Admin",
      Role::User => "User",
      Role::Unrecognized(raw) => raw,
    }
  }

  pub fn is_recognized(&self) -> bool {
    !matches!(self, Role::Unrecognized(_))
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for Role {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for Role {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(Role::parse(&raw))
  }
}

/// Identity decoded from a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClaim")]
pub struct Claim {
  /// Subject id
  pub id: String,
  pub role: Role,
  /// Empty when the issuer left it out
  pub email: String,
  /// Issued-at, seconds since the epoch
  #[serde(skip_serializing_if = "Option::is_none")]
  pub iat: Option<i64>,
  /// Expiry, seconds since the epoch
  #[serde(skip_serializing_if = "Option::is_none")]
  pub exp: Option<i64>,
}

/// Claim set as issued. Issuers send the subject as `id`, `sub` or both.
#[derive(Deserialize)]
struct RawClaim {
  id: Option<String>,
  sub: Option<String>,
  role: Role,
  #[serde(default)]
  email: String,
  iat: Option<i64>,
  exp: Option<i64>,
}

impl TryFrom<RawClaim> for Claim {
  type Error = String;

  fn try_from(raw: RawClaim) -> Result<Self, Self::Error> {
    let id = raw
      .id
      .or(raw.sub)
      .ok_or_else(|| "missing field `id` or `sub`".to_string())?;
    Ok(Self {
      id,
      role: raw.role,
      email: raw.email,
      iat: raw.iat,
      exp: raw.exp,
    })
  }
}

impl Claim {
  pub fn issued_at(&self) -> Option<DateTime<Utc>> {
    self.iat.and_then(|t| DateTime::from_timestamp(t, 0))
  }

  pub fn expires_at(&self) -> Option<DateTime<Utc>> {
    self.exp.and_then(|t| DateTime::from_timestamp(t, 0))
  }

  /// A claim without an `exp` never expires on the client side.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at().is_some_and(|exp| exp <= now)
  }

  pub fn is_expired(&self) -> bool {
    self.is_expired_at(Utc::now())
  }
}

/// Decode a credential into its claims without verifying the signature.
pub fn decode_token(token: &str) -> Result<Claim, DecodeError> {
  let segments: Vec<&str> = token.trim().split('.').collect();
  let [_header, payload, _signature] = segments.as_slice() else {
    return Err(DecodeError::Segments(segments.len()));
  };

  let bytes = URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .map_err(|e| DecodeError::Base64(e.to_string()))?;

  serde_json::from_slice(&bytes).map_err(|e| DecodeError::Claims(e.to_string()))
}

/// Build an unsigned token around a JSON payload. Test helper for every module
/// that needs a credential.
#[cfg(test)]
pub(crate) fn unsigned_token(payload: &serde_json::Value) -> String {
  let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
  let body = URL_SAFE_NO_PAD.encode(payload.to_string());
  let signature = URL_SAFE_NO_PAD.encode("not-a-real-signature");
  format!("{header}.{body}.{signature}")
}

#[cfg(test)]
pub(crate) fn token_for(role: &str) -> String {
  unsigned_token(&serde_json::json!({
    "id": "64f0c2",
    "role": role,
    "email": "owner@example.com",
    "iat": 1_700_000_000,
    "exp": 4_102_444_800_i64,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn test_decodes_admin_claim() {
    let claim = decode_token(&token_for("Admin")).unwrap();

    assert_eq!(
      claim,
      Claim {
        id: "64f0c2".to_string(),
        role: Role::Admin,
        email: "owner@example.com".to_string(),
        iat: Some(1_700_000_000),
        exp: Some(4_102_444_800),
      }
    );
    assert!(!claim.is_expired());
  }

  #[test]
  fn test_role_casing_is_not_folded() {
    let claim = decode_token(&token_for("ADMIN")).unwrap();
    assert_eq!(claim.role, Role::Unrecognized("ADMIN".to_string()));
    assert!(!claim.role.is_recognized());
  }

  #[test]
  fn test_accepts_sub_as_subject_id() {
    let token = unsigned_token(&json!({"sub": "u1", "role": "User", "email": "a@b.io"}));
    let claim = decode_token(&token).unwrap();
    assert_eq!(claim.id, "u1");
    assert_eq!(claim.role, Role::User);
    assert_eq!(claim.exp, None);
    assert!(!claim.is_expired());
  }

  #[test]
  fn test_accepts_both_id_and_sub() {
    let token = unsigned_token(&json!({
      "id": "u1", "sub": "u1", "role": "Admin", "email": "a@b.io", "exp": 4_102_444_800_i64
    }));
    let claim = decode_token(&token).unwrap();
    assert_eq!(claim.id, "u1");
    assert_eq!(claim.role, Role::Admin);
  }

  #[test]
  fn test_id_wins_over_sub() {
    let token = unsigned_token(&json!({"id": "mongo-id", "sub": "other", "role": "User"}));
    let claim = decode_token(&token).unwrap();
    assert_eq!(claim.id, "mongo-id");
    assert_eq!(claim.email, "");
  }

  #[test]
  fn test_claim_survives_serialization() {
    let claim = decode_token(&token_for("Admin")).unwrap();
    let raw = serde_json::to_string(&claim).unwrap();
    assert_eq!(serde_json::from_str::<Claim>(&raw).unwrap(), claim);
  }

  #[test]
  fn test_expired_claim() {
    let token = unsigned_token(&json!({
      "id": "u1", "role": "Admin", "email": "a@b.io", "exp": 1_000
    }));
    let claim = decode_token(&token).unwrap();
    assert!(claim.is_expired());
  }

  #[test]
  fn test_rejects_wrong_segment_count() {
    assert_eq!(decode_token("not-a-jwt"), Err(DecodeError::Segments(1)));
    assert_eq!(decode_token("a.b.c.d"), Err(DecodeError::Segments(4)));
    assert_eq!(decode_token(""), Err(DecodeError::Segments(1)));
  }

  #[test]
  fn test_rejects_non_base64_payload() {
    let err = decode_token("header.%%%.sig").unwrap_err();
    assert!(matches!(err, DecodeError::Base64(_)));
  }

  #[test]
  fn test_rejects_payload_missing_claims() {
    let token = unsigned_token(&json!({"id": "u1"}));
    let err = decode_token(&token).unwrap_err();
    assert!(matches!(err, DecodeError::Claims(_)));

    let no_subject = unsigned_token(&json!({"role": "Admin", "email": "a@b.io"}));
    let err = decode_token(&no_subject).unwrap_err();
    assert!(err.to_string().contains("missing field `id` or `sub`"));

    let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("plain text"));
    assert!(matches!(decode_token(&not_json), Err(DecodeError::Claims(_))));
  }

  #[test]
  fn test_tolerates_padded_payload() {
    let token = token_for("User");
    let mut parts: Vec<String> = token.split('.').map(String::from).collect();
    parts[1].push_str("==");
    let claim = decode_token(&parts.join(".")).unwrap();
    assert_eq!(claim.role, Role::User);
  }
}
