use serde_json::{json, Value};

use super::base::{resource_path, BaseClient, HttpTransport, Method, RequestBody, Transport};
use super::error::{ClientError, ValidationError};
use super::types::{Experience, ExperienceInput};
use super::validate;
use crate::cache::{Endpoint, Mutation, QueryDef, Tag};

pub static GET_ALL_EXPERIENCES: Endpoint =
  Endpoint::query("getAllExperiences", &[Tag::Experience]);
pub static GET_EXPERIENCE: Endpoint = Endpoint::query("getExperience", &[Tag::Experience]);
pub static ADD_EXPERIENCE: Endpoint = Endpoint::mutation("addExperience", &[Tag::Experience]);
pub static UPDATE_EXPERIENCE: Endpoint =
  Endpoint::mutation("updateExperience", &[Tag::Experience]);
pub static DELETE_EXPERIENCE: Endpoint =
  Endpoint::mutation("deleteExperience", &[Tag::Experience]);

#[cfg(test)]
pub fn endpoints() -> [&'static Endpoint; 5] {
  [
    &GET_ALL_EXPERIENCES,
    &GET_EXPERIENCE,
    &ADD_EXPERIENCE,
    &UPDATE_EXPERIENCE,
    &DELETE_EXPERIENCE,
  ]
}

/// Work history entries. Bodies are plain JSON.
pub struct ExperienceClient<T: Transport = HttpTransport> {
  base: BaseClient<T>,
}

impl<T: Transport> ExperienceClient<T> {
  pub fn new(base: BaseClient<T>) -> Self {
    Self { base }
  }

  pub fn all_experiences(&self) -> QueryDef<Vec<Experience>> {
    self.base.query(&GET_ALL_EXPERIENCES, None, "experience".to_string())
  }

  pub fn experience(&self, id: &str) -> Result<QueryDef<Experience>, ClientError> {
    let path = resource_path("experience", "Experience id", id)?;
    Ok(self.base.query(&GET_EXPERIENCE, Some(id.to_string()), path))
  }

  pub fn add_experience(&self, input: ExperienceInput) -> Result<Mutation<Value>, ClientError> {
    let data = experience_data(input)?;
    Ok(self.base.mutation(
      &ADD_EXPERIENCE,
      Method::POST,
      "experience".to_string(),
      RequestBody::Json(data),
    ))
  }

  pub fn update_experience(
    &self,
    id: &str,
    input: ExperienceInput,
  ) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("experience", "Experience id", id)?;
    let mut data = experience_data(input)?;
    data["id"] = Value::String(id.to_string());
    Ok(self.base.mutation(
      &UPDATE_EXPERIENCE,
      Method::PATCH,
      path,
      RequestBody::Json(data),
    ))
  }

  pub fn delete_experience(&self, id: &str) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("experience", "Experience id", id)?;
    Ok(self.base.mutation(
      &DELETE_EXPERIENCE,
      Method::DELETE,
      path,
      RequestBody::Empty,
    ))
  }
}

fn experience_data(input: ExperienceInput) -> Result<Value, ValidationError> {
  validate::required("Company", &input.company)?;
  validate::required("Position", &input.position)?;
  let start_date = validate::normalize_date("Start date", &input.start_date)?;
  let end_date = validate::normalize_date("End date", &input.end_date)?;
  validate::required("Description", &input.description)?;

  Ok(json!({
    "company": input.company,
    "position": input.position,
    "startDate": start_date,
    "endDate": end_date,
    "description": input.description,
  }))
}
