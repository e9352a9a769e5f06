use serde_json::{json, Value};

use super::base::{
  data_with_file, resource_path, BaseClient, FilePart, FormField, HttpTransport, Method,
  RequestBody, Transport,
};
use super::error::{ClientError, ValidationError};
use super::types::{Blog, BlogInput, UploadedImage};
use super::validate;
use crate::cache::{Endpoint, Mutation, QueryDef, Tag};

pub static GET_ALL_BLOGS: Endpoint = Endpoint::query("getAllBlogs", &[Tag::Blog]);
pub static GET_BLOG: Endpoint = Endpoint::query("getBlog", &[Tag::Blog]);
pub static ADD_BLOG: Endpoint = Endpoint::mutation("addBlog", &[Tag::Blog]);
pub static UPDATE_BLOG: Endpoint = Endpoint::mutation("updateBlog", &[Tag::Blog]);
pub static DELETE_BLOG: Endpoint = Endpoint::mutation("deleteBlog", &[Tag::Blog]);
pub static EDITOR_UPLOAD: Endpoint = Endpoint::mutation("editorUpload", &[Tag::Blog]);

#[cfg(test)]
pub fn endpoints() -> [&'static Endpoint; 6] {
  [
    &GET_ALL_BLOGS,
    &GET_BLOG,
    &ADD_BLOG,
    &UPDATE_BLOG,
    &DELETE_BLOG,
    &EDITOR_UPLOAD,
  ]
}

/// Blog posts, plus the image upload used by the post editor.
pub struct BlogClient<T: Transport = HttpTransport> {
  base: BaseClient<T>,
}

impl<T: Transport> BlogClient<T> {
  pub fn new(base: BaseClient<T>) -> Self {
    Self { base }
  }

  pub fn all_blogs(&self) -> QueryDef<Vec<Blog>> {
    self.base.query(&GET_ALL_BLOGS, None, "blog/all".to_string())
  }

  pub fn blog(&self, id: &str) -> Result<QueryDef<Blog>, ClientError> {
    let path = resource_path("blog", "Blog id", id)?;
    Ok(self.base.query(&GET_BLOG, Some(id.to_string()), path))
  }

  /// New post. Title, content and a thumbnail are all required.
  pub fn add_blog(&self, input: BlogInput) -> Result<Mutation<Value>, ClientError> {
    validate_post(&input)?;
    let thumbnail = input
      .thumbnail
      .ok_or(ValidationError::Required("Thumbnail"))?;

    let body = data_with_file(
      json!({"title": input.title, "content": input.content}),
      "thumbnail",
      Some(thumbnail),
    );
    Ok(self.base.mutation(&ADD_BLOG, Method::POST, "blog/create".to_string(), body))
  }

  /// Edit a post. The thumbnail is only replaced when one is given.
  pub fn update_blog(&self, id: &str, input: BlogInput) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("blog", "Blog id", id)?;
    validate_post(&input)?;

    let body = data_with_file(
      json!({"title": input.title, "content": input.content}),
      "thumbnail",
      input.thumbnail,
    );
    Ok(self.base.mutation(&UPDATE_BLOG, Method::PATCH, path, body))
  }

  pub fn delete_blog(&self, id: &str) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("blog", "Blog id", id)?;
    Ok(self.base.mutation(&DELETE_BLOG, Method::DELETE, path, RequestBody::Empty))
  }

  /// Upload an image to embed in post content; the payload carries its URL.
  pub fn editor_upload(&self, image: FilePart) -> Mutation<UploadedImage> {
    let body = RequestBody::Multipart(vec![("file".to_string(), FormField::File(image))]);
    self.base.mutation(
      &EDITOR_UPLOAD,
      Method::POST,
      "blog/editor-upload".to_string(),
      body,
    )
  }
}

fn validate_post(input: &BlogInput) -> Result<(), ValidationError> {
  validate::required("Title", &input.title)?;
  validate::required("Content", &input.content)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::base::testing::ScriptedTransport;
  use crate::cache::QueryCache;
  use crate::storage::{CookieJar, MemoryStorage};
  use std::sync::Arc;

  fn client(transport: &Arc<ScriptedTransport>) -> BlogClient<ScriptedTransport> {
    let cookies = CookieJar::new(Arc::new(MemoryStorage::new()));
    BlogClient::new(BaseClient::new(transport.clone(), cookies))
  }

  fn thumbnail() -> FilePart {
    FilePart::new("cover.png", "image/png", vec![0x89, 0x50])
  }

  #[tokio::test]
  async fn test_create_without_thumbnail_sends_nothing() {
    let transport = ScriptedTransport::new();
    let blogs = client(&transport);

    let err = blogs
      .add_blog(BlogInput {
        title: "Hello".into(),
        content: "<p>World</p>".into(),
        thumbnail: None,
      })
      .unwrap_err();

    assert_eq!(
      err,
      ClientError::Validation(ValidationError::Required("Thumbnail"))
    );
    assert!(transport.requests().is_empty());
  }

  #[tokio::test]
  async fn test_blank_title_is_rejected() {
    let transport = ScriptedTransport::new();
    let err = client(&transport)
      .update_blog(
        "b1",
        BlogInput {
          title: "  ".into(),
          content: "body".into(),
          thumbnail: None,
        },
      )
      .unwrap_err();
    assert_eq!(err, ClientError::Validation(ValidationError::Required("Title")));
  }

  #[tokio::test]
  async fn test_create_sends_data_and_thumbnail() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::POST, "blog/create", json!({"_id": "b1"}));
    let blogs = client(&transport);

    let res = blogs
      .add_blog(BlogInput {
        title: "Hello".into(),
        content: "<p>World</p>".into(),
        thumbnail: Some(thumbnail()),
      })
      .unwrap()
      .send()
      .await
      .unwrap();
    assert_eq!(res.message, "ok");

    let request = &transport.requests()[0];
    let RequestBody::Multipart(fields) = &request.body else {
      panic!("expected multipart body");
    };
    let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["data", "thumbnail"]);
  }

  #[tokio::test]
  async fn test_update_without_thumbnail_sends_only_data() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::PATCH, "blog/b1", json!(null));

    client(&transport)
      .update_blog(
        "b1",
        BlogInput {
          title: "Hello".into(),
          content: "Edited".into(),
          thumbnail: None,
        },
      )
      .unwrap()
      .send()
      .await
      .unwrap();

    let RequestBody::Multipart(fields) = &transport.requests()[0].body else {
      panic!("expected multipart body");
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(
      fields[0],
      (
        "data".to_string(),
        FormField::Text(r#"{"content":"Edited","title":"Hello"}"#.to_string())
      )
    );
  }

  #[tokio::test]
  async fn test_editor_upload_returns_url() {
    let transport = ScriptedTransport::new();
    transport.ok(
      Method::POST,
      "blog/editor-upload",
      json!({"file": {"url": "https://cdn.test/inline.png"}}),
    );

    let res = client(&transport)
      .editor_upload(thumbnail())
      .send()
      .await
      .unwrap();
    assert_eq!(res.data.url(), "https://cdn.test/inline.png");
  }

  #[tokio::test]
  async fn test_id_cannot_reach_another_route() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::DELETE, "blog/..%2Fauth%2Flogin", json!(null));
    let blogs = client(&transport);

    blogs
      .delete_blog("../auth/login")
      .unwrap()
      .send()
      .await
      .unwrap();
    assert_eq!(transport.requests()[0].path, "blog/..%2Fauth%2Flogin");

    let err = blogs.blog("..").unwrap_err();
    assert!(matches!(
      err,
      ClientError::Validation(ValidationError::InvalidId { .. })
    ));
    assert_eq!(transport.requests().len(), 1);
  }

  #[tokio::test]
  async fn test_delete_refreshes_blog_list() {
    let transport = ScriptedTransport::new();
    transport.ok(
      Method::GET,
      "blog/all",
      json!([{"_id": "b1", "title": "One"}, {"_id": "b2", "title": "Two"}]),
    );
    transport.ok(Method::GET, "blog/all", json!([{"_id": "b2", "title": "Two"}]));
    transport.ok(Method::DELETE, "blog/b1", json!(null));
    let blogs = client(&transport);
    let mut cache = QueryCache::default();

    let list = cache.subscribe(blogs.all_blogs());
    cache.settle().await;
    assert_eq!(cache.read(&list).data.unwrap().len(), 2);

    cache.execute(blogs.delete_blog("b1").unwrap()).await.unwrap();
    cache.settle().await;

    let remaining = cache.read(&list).data.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "b2");
    assert_eq!(transport.count(Method::GET, "blog/all"), 2);
  }
}
