use serde_json::{json, Value};

use super::base::{
  data_with_file, resource_path, BaseClient, HttpTransport, Method, RequestBody, Transport,
};
use super::error::{ClientError, ValidationError};
use super::types::{Skill, SkillInput};
use super::validate;
use crate::cache::{Endpoint, Mutation, QueryDef, Tag};

pub static GET_ALL_SKILLS: Endpoint = Endpoint::query("getAllSkills", &[Tag::Skill]);
pub static GET_SKILL: Endpoint = Endpoint::query("getSkill", &[Tag::Skill]);
pub static ADD_SKILL: Endpoint = Endpoint::mutation("addSkill", &[Tag::Skill]);
pub static UPDATE_SKILL: Endpoint = Endpoint::mutation("updateSkill", &[Tag::Skill]);
pub static DELETE_SKILL: Endpoint = Endpoint::mutation("deleteSkill", &[Tag::Skill]);

#[cfg(test)]
pub fn endpoints() -> [&'static Endpoint; 5] {
  [
    &GET_ALL_SKILLS,
    &GET_SKILL,
    &ADD_SKILL,
    &UPDATE_SKILL,
    &DELETE_SKILL,
  ]
}

pub struct SkillClient<T: Transport = HttpTransport> {
  base: BaseClient<T>,
}

impl<T: Transport> SkillClient<T> {
  pub fn new(base: BaseClient<T>) -> Self {
    Self { base }
  }

  pub fn all_skills(&self) -> QueryDef<Vec<Skill>> {
    self.base.query(&GET_ALL_SKILLS, None, "skill".to_string())
  }

  pub fn skill(&self, id: &str) -> Result<QueryDef<Skill>, ClientError> {
    let path = resource_path("skill", "Skill id", id)?;
    Ok(self.base.query(&GET_SKILL, Some(id.to_string()), path))
  }

  /// New skill. Needs a name and an icon.
  pub fn add_skill(&self, input: SkillInput) -> Result<Mutation<Value>, ClientError> {
    validate::required("Skill name", &input.name)?;
    let icon = input.icon.ok_or(ValidationError::Required("Skill icon"))?;

    let body = data_with_file(json!({"name": input.name}), "file", Some(icon));
    Ok(self.base.mutation(&ADD_SKILL, Method::POST, "skill".to_string(), body))
  }

  /// Rename a skill, replacing its icon only when one is given.
  pub fn update_skill(&self, id: &str, input: SkillInput) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("skill", "Skill id", id)?;
    validate::required("Skill name", &input.name)?;

    let body = data_with_file(json!({"id": id, "name": input.name}), "file", input.icon);
    Ok(self.base.mutation(&UPDATE_SKILL, Method::PATCH, path, body))
  }

  pub fn delete_skill(&self, id: &str) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("skill", "Skill id", id)?;
    Ok(self.base.mutation(&DELETE_SKILL, Method::DELETE, path, RequestBody::Empty))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::base::testing::ScriptedTransport;
  use crate::api::base::FilePart;
  use crate::cache::QueryCache;
  use crate::storage::{CookieJar, MemoryStorage};
  use std::sync::Arc;
  use std::time::Duration;

  fn client(transport: &Arc<ScriptedTransport>) -> SkillClient<ScriptedTransport> {
    let cookies = CookieJar::new(Arc::new(MemoryStorage::new()));
    SkillClient::new(BaseClient::new(transport.clone(), cookies))
  }

  fn rename(name: &str) -> SkillInput {
    SkillInput {
      name: name.to_string(),
      icon: None,
    }
  }

  #[test]
  fn test_add_requires_icon() {
    let transport = ScriptedTransport::new();
    let err = client(&transport).add_skill(rename("Rust")).unwrap_err();
    assert_eq!(
      err,
      ClientError::Validation(ValidationError::Required("Skill icon"))
    );
  }

  #[tokio::test]
  async fn test_add_refreshes_skill_list() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::GET, "skill", json!([]));
    transport.ok(Method::GET, "skill", json!([{"_id": "s1", "name": "Rust"}]));
    transport.ok(Method::POST, "skill", json!({"_id": "s1"}));
    let skills = client(&transport);
    let mut cache = QueryCache::default();

    let list = cache.subscribe(skills.all_skills());
    cache.settle().await;
    assert!(cache.read(&list).data.unwrap().is_empty());

    let add = skills
      .add_skill(SkillInput {
        name: "Rust".into(),
        icon: Some(FilePart::new("rust.svg", "image/svg+xml", b"<svg/>".to_vec())),
      })
      .unwrap();
    cache.execute(add).await.unwrap();
    cache.settle().await;

    assert_eq!(cache.read(&list).data.unwrap()[0].name, "Rust");
  }

  #[tokio::test]
  async fn test_back_to_back_edits_end_on_latest_list() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::GET, "skill", json!([{"_id": "s1", "name": "Rust"}]));
    // The refetch after the first edit is slow and returns the first name
    transport.reply_after(
      Method::GET,
      "skill",
      200,
      json!({"success": true, "message": "ok", "data": [{"_id": "s1", "name": "Rust 1.80"}]}),
      Duration::from_millis(80),
    );
    transport.ok(Method::GET, "skill", json!([{"_id": "s1", "name": "Rust 2024"}]));
    transport.ok(Method::PATCH, "skill/s1", json!(null));
    let skills = client(&transport);
    let mut cache = QueryCache::default();

    let list = cache.subscribe(skills.all_skills());
    cache.settle().await;

    cache
      .execute(skills.update_skill("s1", rename("Rust 1.80")).unwrap())
      .await
      .unwrap();
    cache
      .execute(skills.update_skill("s1", rename("Rust 2024")).unwrap())
      .await
      .unwrap();
    cache.settle().await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    cache.poll();
    assert_eq!(cache.read(&list).data.unwrap()[0].name, "Rust 2024");
  }

  #[tokio::test]
  async fn test_update_data_carries_id() {
    let transport = ScriptedTransport::new();
    transport.ok(Method::PATCH, "skill/s1", json!(null));
    client(&transport)
      .update_skill("s1", rename("Go"))
      .unwrap()
      .send()
      .await
      .unwrap();

    let RequestBody::Multipart(fields) = &transport.requests()[0].body else {
      panic!("expected multipart body");
    };
    assert_eq!(fields.len(), 1);
    assert_eq!(
      fields[0].1,
      crate::api::base::FormField::Text(r#"{"id":"s1","name":"Go"}"#.to_string())
    );
  }
}
