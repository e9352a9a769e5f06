use super::base::{BaseClient, HttpTransport, Method, RequestBody, Transport};
use super::error::ClientError;
use super::types::{LoginInput, LoginResponse};
use super::validate;
use crate::cache::{Endpoint, Mutation, Tag};

pub static LOGIN: Endpoint = Endpoint::mutation("login", &[Tag::User]);

#[cfg(test)]
pub fn endpoints() -> [&'static Endpoint; 1] {
  [&LOGIN]
}

pub struct AuthClient<T: Transport = HttpTransport> {
  base: BaseClient<T>,
}

impl<T: Transport> AuthClient<T> {
  pub fn new(base: BaseClient<T>) -> Self {
    Self { base }
  }

  /// Exchange credentials for an access token.
  pub fn login(&self, input: LoginInput) -> Result<Mutation<LoginResponse>, ClientError> {
    validate::email(&input.email)?;
    validate::password(&input.password)?;

    let body = serde_json::to_value(&input).map_err(|e| ClientError::Envelope(e.to_string()))?;
    Ok(self.base.mutation(
      &LOGIN,
      Method::POST,
      "auth/login".to_string(),
      RequestBody::Json(body),
    ))
  }
}
