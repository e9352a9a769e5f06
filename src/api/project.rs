use serde_json::{json, Value};

use super::base::{
  data_with_file, resource_path, BaseClient, HttpTransport, Method, RequestBody, Transport,
};
use super::error::{ClientError, ValidationError};
use super::types::{Project, ProjectInput};
use super::validate;
use crate::cache::{Endpoint, Mutation, QueryDef, Tag};

pub static GET_ALL_PROJECTS: Endpoint = Endpoint::query("getAllProjects", &[Tag::Project]);
pub static GET_PROJECT: Endpoint = Endpoint::query("getProject", &[Tag::Project]);
pub static ADD_PROJECT: Endpoint = Endpoint::mutation("addProject", &[Tag::Project]);
pub static UPDATE_PROJECT: Endpoint = Endpoint::mutation("updateProject", &[Tag::Project]);
pub static DELETE_PROJECT: Endpoint = Endpoint::mutation("deleteProject", &[Tag::Project]);

#[cfg(test)]
pub fn endpoints() -> [&'static Endpoint; 5] {
  [
    &GET_ALL_PROJECTS,
    &GET_PROJECT,
    &ADD_PROJECT,
    &UPDATE_PROJECT,
    &DELETE_PROJECT,
  ]
}

pub struct ProjectClient<T: Transport = HttpTransport> {
  base: BaseClient<T>,
}

impl<T: Transport> ProjectClient<T> {
  pub fn new(base: BaseClient<T>) -> Self {
    Self { base }
  }

  pub fn all_projects(&self) -> QueryDef<Vec<Project>> {
    self.base.query(&GET_ALL_PROJECTS, None, "project".to_string())
  }

  pub fn project(&self, id: &str) -> Result<QueryDef<Project>, ClientError> {
    let path = resource_path("project", "Project id", id)?;
    Ok(self.base.query(&GET_PROJECT, Some(id.to_string()), path))
  }

  pub fn add_project(&self, input: ProjectInput) -> Result<Mutation<Value>, ClientError> {
    let body = project_body(input)?;
    Ok(self.base.mutation(&ADD_PROJECT, Method::POST, "project".to_string(), body))
  }

  pub fn update_project(
    &self,
    id: &str,
    input: ProjectInput,
  ) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("project", "Project id", id)?;
    let body = project_body(input)?;
    Ok(self.base.mutation(&UPDATE_PROJECT, Method::PATCH, path, body))
  }

  pub fn delete_project(&self, id: &str) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("project", "Project id", id)?;
    Ok(self.base.mutation(&DELETE_PROJECT, Method::DELETE, path, RequestBody::Empty))
  }
}

/// Text fields travel as JSON in `data`; the image, if any, as `file`.
fn project_body(input: ProjectInput) -> Result<RequestBody, ValidationError> {
  validate::required("Title", &input.title)?;
  validate::required("Description", &input.description)?;

  let data = json!({
    "title": input.title,
    "description": input.description,
    "technology": input.technology,
    "duration": input.duration,
    "liveUrl": input.live_url,
    "backendrepoUrl": input.backend_repo_url,
    "frontendrepoUrl": input.frontend_repo_url,
  });
  Ok(data_with_file(data, "file", input.image))
}
