//! Payload types for the content API.
//!
//! Response types mirror the server's camelCase JSON and tolerate unknown
//! fields. Input types are what the operator fills in; each client turns them
//! into the request body the endpoint expects.

use serde::{Deserialize, Serialize};

use super::base::FilePart;

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
  #[serde(alias = "_id")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub content: String,
  pub thumbnail: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  #[serde(alias = "_id")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub technology: Vec<String>,
  pub duration: Option<String>,
  pub live_url: Option<String>,
  // The server spells these two in lowercase
  #[serde(rename = "backendrepoUrl")]
  pub backend_repo_url: Option<String>,
  #[serde(rename = "frontendrepoUrl")]
  pub frontend_repo_url: Option<String>,
  pub image_url: Option<String>,
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
  #[serde(alias = "_id")]
  pub id: String,
  pub name: String,
  pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
  #[serde(alias = "_id")]
  pub id: String,
  pub company: String,
  pub position: String,
  pub start_date: String,
  pub end_date: String,
  #[serde(default)]
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  #[serde(alias = "_id")]
  pub id: String,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub message: String,
  pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedFile {
  pub url: String,
}

/// Response of the editor image upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedImage {
  pub file: UploadedFile,
}

impl UploadedImage {
  pub fn url(&self) -> &str {
    &self.file.url
  }
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginInput {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlogInput {
  pub title: String,
  pub content: String,
  /// Required on create, optional on update
  pub thumbnail: Option<FilePart>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInput {
  pub title: String,
  pub description: String,
  pub technology: Vec<String>,
  pub duration: String,
  pub live_url: String,
  pub backend_repo_url: String,
  pub frontend_repo_url: String,
  pub image: Option<FilePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillInput {
  pub name: String,
  /// Required on create, optional on update
  pub icon: Option<FilePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceInput {
  pub company: String,
  pub position: String,
  /// `YYYY-MM-DD` or a full ISO-8601 timestamp
  pub start_date: String,
  pub end_date: String,
  pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactInput {
  pub name: String,
  pub email: String,
  pub message: String,
}
