//! Shared HTTP plumbing for the resource clients.

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
pub use reqwest::Method;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use url::Url;

use super::envelope::ApiResponse;
use super::error::{ClientError, ValidationError};
use crate::cache::{Endpoint, Mutation, QueryDef};
use crate::storage::{CookieJar, ACCESS_TOKEN_COOKIE};

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
  pub file_name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

impl FilePart {
  pub fn new(
    file_name: impl Into<String>,
    content_type: impl Into<String>,
    bytes: Vec<u8>,
  ) -> Self {
    Self {
      file_name: file_name.into(),
      content_type: content_type.into(),
      bytes,
    }
  }

  /// Read a file from disk, guessing the content type from its extension.
  pub async fn read(path: &Path) -> std::io::Result<Self> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());
    Ok(Self::new(file_name, content_type_for(path), bytes))
  }
}

fn content_type_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .map(|e| e.to_string_lossy().to_lowercase())
    .unwrap_or_default();
  match ext.as_str() {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "svg" => "image/svg+xml",
    "avif" => "image/avif",
    _ => "application/octet-stream",
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
  Text(String),
  File(FilePart),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
  Empty,
  Json(serde_json::Value),
  Multipart(Vec<(String, FormField)>),
}

/// One outgoing request, relative to the API root.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub body: RequestBody,
  /// Raw credential for the `authorization` header
  pub authorization: Option<String>,
}

/// Status and body of a response, before envelope decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

/// Something that can carry an `ApiRequest` to the server.
///
/// No retries, no timeout beyond the transport's own defaults.
pub trait Transport: Send + Sync + 'static {
  fn send(
    &self,
    request: ApiRequest,
  ) -> impl Future<Output = Result<RawResponse, ClientError>> + Send;
}

/// Transport over HTTP via reqwest.
pub struct HttpTransport {
  client: reqwest::Client,
  root: Url,
}

impl HttpTransport {
  /// `root` is the API root, e.g. `https://example.com/api/`.
  pub fn new(root: Url) -> Result<Self, ClientError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("folio-admin/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| ClientError::Network(e.to_string()))?;
    Ok(Self { client, root })
  }

  fn url(&self, path: &str) -> Result<Url, ClientError> {
    self
      .root
      .join(path.trim_start_matches('/'))
      .map_err(|e| ClientError::Network(format!("bad request path '{}': {}", path, e)))
  }
}

fn multipart_form(fields: Vec<(String, FormField)>) -> Result<Form, ClientError> {
  let mut form = Form::new();
  for (name, field) in fields {
    form = match field {
      FormField::Text(text) => form.text(name, text),
      FormField::File(file) => {
        let part = Part::bytes(file.bytes)
          .file_name(file.file_name)
          .mime_str(&file.content_type)
          .map_err(|e| ClientError::Network(e.to_string()))?;
        form.part(name, part)
      }
    };
  }
  Ok(form)
}

impl Transport for HttpTransport {
  async fn send(&self, request: ApiRequest) -> Result<RawResponse, ClientError> {
    let url = self.url(&request.path)?;
    let mut builder = self.client.request(request.method, url);

    if let Some(token) = request.authorization {
      builder = builder.header(AUTHORIZATION, token);
    }

    builder = match request.body {
      RequestBody::Empty => builder,
      RequestBody::Json(value) => builder.json(&value),
      RequestBody::Multipart(fields) => builder.multipart(multipart_form(fields)?),
    };

    let response = builder
      .send()
      .await
      .map_err(|e| ClientError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let body = response
      .bytes()
      .await
      .map_err(|e| ClientError::Network(e.to_string()))?
      .to_vec();

    Ok(RawResponse { status, body })
  }
}

/// Base client shared by every resource client.
///
/// Reads the current credential from the cookie jar on each request, so a
/// login or logout takes effect on the next call without rebuilding clients.
pub struct BaseClient<T: Transport = HttpTransport> {
  transport: Arc<T>,
  cookies: CookieJar,
}

impl<T: Transport> Clone for BaseClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      cookies: self.cookies.clone(),
    }
  }
}

impl<T: Transport> BaseClient<T> {
  pub fn new(transport: Arc<T>, cookies: CookieJar) -> Self {
    Self { transport, cookies }
  }

  /// Send a request and decode the envelope around an `R` payload.
  pub async fn request<R: DeserializeOwned>(
    &self,
    method: Method,
    path: &str,
    body: RequestBody,
  ) -> Result<ApiResponse<R>, ClientError> {
    let authorization = self
      .cookies
      .get(ACCESS_TOKEN_COOKIE)
      .map_err(|e| ClientError::Storage(e.to_string()))?;

    tracing::debug!(%method, path, authenticated = authorization.is_some(), "api request");

    let response = self
      .transport
      .send(ApiRequest {
        method: method.clone(),
        path: path.to_string(),
        body,
        authorization,
      })
      .await;

    let response = match response {
      Ok(response) => response,
      Err(e) => {
        tracing::warn!(%method, path, error = %e, "api request failed");
        return Err(e);
      }
    };

    tracing::debug!(%method, path, status = response.status, "api response");
    ApiResponse::decode(response.status, &response.body)
  }

  pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<R>, ClientError> {
    self.request(Method::GET, path, RequestBody::Empty).await
  }

  /// A cacheable GET whose payload is the envelope's `data`.
  pub(crate) fn query<R>(
    &self,
    endpoint: &'static Endpoint,
    arg: Option<String>,
    path: String,
  ) -> QueryDef<R>
  where
    R: DeserializeOwned + Send + Sync + 'static,
  {
    let client = self.clone();
    QueryDef::new(endpoint, arg, move || {
      let client = client.clone();
      let path = path.clone();
      async move { client.get::<R>(&path).await.map(|res| res.data) }
    })
  }

  /// A write request, prepared but not sent.
  pub(crate) fn mutation<R>(
    &self,
    endpoint: &'static Endpoint,
    method: Method,
    path: String,
    body: RequestBody,
  ) -> Mutation<R>
  where
    R: DeserializeOwned + Send + 'static,
  {
    let client = self.clone();
    Mutation::new(endpoint, async move { client.request(method, &path, body).await })
  }
}

/// Path of one item under `resource`, with the id as a single escaped segment.
///
/// `.` and `..` would be resolved as dot segments against the API root, so
/// they are refused outright.
pub fn resource_path(
  resource: &str,
  field: &'static str,
  id: &str,
) -> Result<String, ValidationError> {
  if id.trim().is_empty() {
    return Err(ValidationError::Required(field));
  }
  if id == "." || id == ".." {
    return Err(ValidationError::InvalidId {
      field,
      value: id.to_string(),
    });
  }
  Ok(format!("{}/{}", resource, urlencoding::encode(id)))
}

/// Multipart body with a JSON `data` field and an optional file.
pub fn data_with_file(
  data: serde_json::Value,
  file_field: &str,
  file: Option<FilePart>,
) -> RequestBody {
  let mut fields = vec![("data".to_string(), FormField::Text(data.to_string()))];
  if let Some(file) = file {
    fields.push((file_field.to_string(), FormField::File(file)));
  }
  RequestBody::Multipart(fields)
}


#[cfg(test)]
mod tests {
  use super::testing::ScriptedTransport;
  use super::*;
  use crate::storage::MemoryStorage;
  use chrono::Duration;
  use serde_json::json;

  fn client(transport: &Arc<ScriptedTransport>) -> (CookieJar, BaseClient<ScriptedTransport>) {
    let cookies = CookieJar::new(Arc::new(MemoryStorage::new()));
    (cookies.clone(), BaseClient::new(transport.clone(), cookies))
  }

  #[tokio::test]
  async fn test_attaches_credential_when_present() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::GET, "skill", json!([]));
    let (cookies, client) = client(&transport);

    client.get::<Vec<serde_json::Value>>("skill").await.unwrap();
    cookies
      .set(ACCESS_TOKEN_COOKIE, "tok-123", Duration::days(7))
      .unwrap();
    client.get::<Vec<serde_json::Value>>("skill").await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].authorization, None);
    assert_eq!(requests[1].authorization.as_deref(), Some("tok-123"));
  }

  #[tokio::test]
  async fn test_api_error_is_surfaced_not_retried() {
    let transport = ScriptedTransport::new();
    transport.reply(
      Method::DELETE,
      "skill/1",
      404,
      json!({"success": false, "message": "Skill not found"}),
    );
    let (_, client) = client(&transport);

    let err = client
      .request::<serde_json::Value>(Method::DELETE, "skill/1", RequestBody::Empty)
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Skill not found");
    assert_eq!(transport.count(Method::DELETE, "skill/1"), 1);
  }

  #[tokio::test]
  async fn test_network_error_is_surfaced() {
    let transport = ScriptedTransport::new();
    let (_, client) = client(&transport);

    let err = client.get::<serde_json::Value>("nowhere").await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
  }

  #[test]
  fn test_data_with_file_layout() {
    let file = FilePart::new("a.png", "image/png", vec![1, 2]);
    let body = data_with_file(json!({"name": "Rust"}), "file", Some(file.clone()));

    assert_eq!(
      body,
      RequestBody::Multipart(vec![
        (
          "data".to_string(),
          FormField::Text(r#"{"name":"Rust"}"#.to_string())
        ),
        ("file".to_string(), FormField::File(file)),
      ])
    );
  }

  #[test]
  fn test_resource_path_keeps_id_in_one_segment() {
    assert_eq!(resource_path("blog", "Blog id", "abc123").unwrap(), "blog/abc123");
    assert_eq!(
      resource_path("blog", "Blog id", "../auth/login").unwrap(),
      "blog/..%2Fauth%2Flogin"
    );
    assert_eq!(
      resource_path("skill", "Skill id", "a b?c#d").unwrap(),
      "skill/a%20b%3Fc%23d"
    );
  }

  #[test]
  fn test_resource_path_refuses_dot_segments_and_blanks() {
    for id in [".", ".."] {
      assert_eq!(
        resource_path("blog", "Blog id", id),
        Err(ValidationError::InvalidId {
          field: "Blog id",
          value: id.to_string()
        })
      );
    }
    assert_eq!(
      resource_path("blog", "Blog id", "  "),
      Err(ValidationError::Required("Blog id"))
    );
  }

  #[test]
  fn test_escaped_id_stays_under_resource() {
    let transport = HttpTransport::new(Url::parse("https://folio.test/api/").unwrap()).unwrap();
    let path = resource_path("blog", "Blog id", "../auth/login").unwrap();
    assert_eq!(
      transport.url(&path).unwrap().as_str(),
      "https://folio.test/api/blog/..%2Fauth%2Flogin"
    );
  }

  #[test]
  fn test_content_type_guess() {
    assert_eq!(content_type_for(Path::new("x/Logo.PNG")), "image/png");
    assert_eq!(content_type_for(Path::new("photo.jpeg")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
  }

  #[test]
  fn test_http_transport_joins_paths_under_root() {
    let transport = HttpTransport::new(Url::parse("https://folio.test/api/").unwrap()).unwrap();
    assert_eq!(
      transport.url("/blog/all").unwrap().as_str(),
      "https://folio.test/api/blog/all"
    );
    assert_eq!(
      transport.url("skill/42").unwrap().as_str(),
      "https://folio.test/api/skill/42"
    );
  }
}
