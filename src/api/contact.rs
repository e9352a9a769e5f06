use serde_json::Value;

use super::base::{resource_path, BaseClient, HttpTransport, Method, RequestBody, Transport};
use super::error::ClientError;
use super::types::{Contact, ContactInput};
use super::validate;
use crate::cache::{Endpoint, Mutation, QueryDef, Tag};

pub static GET_ALL_CONTACTS: Endpoint = Endpoint::query("getAllContacts", &[Tag::Contact]);
pub static ADD_CONTACT: Endpoint = Endpoint::mutation("addContact", &[Tag::Contact]);
pub static DELETE_CONTACT: Endpoint = Endpoint::mutation("deleteContact", &[Tag::Contact]);

#[cfg(test)]
pub fn endpoints() -> [&'static Endpoint; 3] {
  [&GET_ALL_CONTACTS, &ADD_CONTACT, &DELETE_CONTACT]
}

/// Messages left through the public contact form.
pub struct ContactClient<T: Transport = HttpTransport> {
  base: BaseClient<T>,
}

impl<T: Transport> ContactClient<T> {
  pub fn new(base: BaseClient<T>) -> Self {
    Self { base }
  }

  pub fn all_contacts(&self) -> QueryDef<Vec<Contact>> {
    self.base.query(&GET_ALL_CONTACTS, None, "contact".to_string())
  }

  pub fn add_contact(&self, input: ContactInput) -> Result<Mutation<Value>, ClientError> {
    validate::required("Name", &input.name)?;
    validate::email(&input.email)?;
    validate::required("Message", &input.message)?;

    let body = serde_json::to_value(&input).map_err(|e| ClientError::Envelope(e.to_string()))?;
    Ok(self.base.mutation(
      &ADD_CONTACT,
      Method::POST,
      "contact".to_string(),
      RequestBody::Json(body),
    ))
  }

  pub fn delete_contact(&self, id: &str) -> Result<Mutation<Value>, ClientError> {
    let path = resource_path("contact", "Contact id", id)?;
    Ok(self.base.mutation(
      &DELETE_CONTACT,
      Method::DELETE,
      path,
      RequestBody::Empty,
    ))
  }
}
