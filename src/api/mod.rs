//! Clients for the portfolio content API.
//!
//! Every request goes to `<base>/api/...`, carries the stored credential and
//! comes back in the `{success, message, data}` envelope. Reads are exposed
//! as `QueryDef`s for the cache, writes as `Mutation`s.

pub mod auth;
pub mod base;
pub mod blog;
pub mod contact;
mod envelope;
mod error;
pub mod experience;
pub mod project;
pub mod skill;
pub mod types;
pub mod validate;

use std::sync::Arc;

pub use auth::AuthClient;
pub use base::{BaseClient, FilePart, HttpTransport, Transport};
pub use blog::BlogClient;
pub use contact::ContactClient;
pub use envelope::ApiResponse;
pub use error::ClientError;
pub use experience::ExperienceClient;
pub use project::ProjectClient;
pub use skill::SkillClient;

#[cfg(test)]
use crate::cache::Endpoint;
use crate::storage::CookieJar;

/// One client per resource, all sharing a transport and the cookie jar.
pub struct Api<T: Transport = HttpTransport> {
  pub auth: AuthClient<T>,
  pub blog: BlogClient<T>,
  pub project: ProjectClient<T>,
  pub skill: SkillClient<T>,
  pub experience: ExperienceClient<T>,
  pub contact: ContactClient<T>,
}

impl<T: Transport> Api<T> {
  pub fn new(transport: Arc<T>, cookies: CookieJar) -> Self {
    let base = BaseClient::new(transport, cookies);
    Self {
      auth: AuthClient::new(base.clone()),
      blog: BlogClient::new(base.clone()),
      project: ProjectClient::new(base.clone()),
      skill: SkillClient::new(base.clone()),
      experience: ExperienceClient::new(base.clone()),
      contact: ContactClient::new(base),
    }
  }
}

/// Every endpoint the clients can call.
#[cfg(test)]
pub fn all_endpoints() -> Vec<&'static Endpoint> {
  let mut endpoints = Vec::new();
  endpoints.extend(auth::endpoints());
  endpoints.extend(blog::endpoints());
  endpoints.extend(project::endpoints());
  endpoints.extend(skill::endpoints());
  endpoints.extend(experience::endpoints());
  endpoints.extend(contact::endpoints());
  endpoints
}
