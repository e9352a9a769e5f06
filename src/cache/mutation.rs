use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;

use super::tags::Endpoint;
use crate::api::{ApiResponse, ClientError};

/// A prepared, not yet sent, write operation.
///
/// Building one runs client-side validation; nothing goes over the wire
/// until it is executed.
pub struct Mutation<T> {
  endpoint: &'static Endpoint,
  future: BoxFuture<'static, Result<ApiResponse<T>, ClientError>>,
}

impl<T> Mutation<T> {
  pub fn new<Fut>(endpoint: &'static Endpoint, future: Fut) -> Self
  where
    Fut: Future<Output = Result<ApiResponse<T>, ClientError>> + Send + 'static,
  {
    Self {
      endpoint,
      future: Box::pin(future),
    }
  }

  pub fn endpoint(&self) -> &'static Endpoint {
    self.endpoint
  }

  /// Send the request without touching any cache.
  pub async fn send(self) -> Result<ApiResponse<T>, ClientError> {
    self.future.await
  }
}

impl<T> fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Mutation")
      .field("endpoint", &self.endpoint.name)
      .finish_non_exhaustive()
  }
}
