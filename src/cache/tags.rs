//! Resource tags and endpoint descriptors.

use std::fmt;

/// Label for a family of cached queries tied to one backend resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
  Project,
  User,
  Skill,
  Experience,
  Blog,
  Contact,
}

impl Tag {
  pub fn as_str(self) -> &'static str {
    match self {
      Tag::Project => "project",
      Tag::User => "user",
      Tag::Skill => "skill",
      Tag::Experience => "experience",
      Tag::Blog => "blog",
      Tag::Contact => "contact",
    }
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
  Query,
  Mutation,
}

/// Static description of one API operation and its cache tags.
///
/// Queries list the tags they provide, mutations the tags they invalidate.
#[derive(Debug, PartialEq, Eq)]
pub struct Endpoint {
  pub name: &'static str,
  pub kind: EndpointKind,
  pub tags: &'static [Tag],
}

impl Endpoint {
  pub const fn query(name: &'static str, provides: &'static [Tag]) -> Self {
    Self {
      name,
      kind: EndpointKind::Query,
      tags: provides,
    }
  }

  pub const fn mutation(name: &'static str, invalidates: &'static [Tag]) -> Self {
    Self {
      name,
      kind: EndpointKind::Mutation,
      tags: invalidates,
    }
  }

  pub fn provides(&self) -> &'static [Tag] {
    match self.kind {
      EndpointKind::Query => self.tags,
      EndpointKind::Mutation => &[],
    }
  }

  pub fn invalidates(&self) -> &'static [Tag] {
    match self.kind {
      EndpointKind::Query => &[],
      EndpointKind::Mutation => self.tags,
    }
  }
}
