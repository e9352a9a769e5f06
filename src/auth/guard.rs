//! Navigation gating by role.
//!
//! Every guarded navigation reads the access-token cookie, decodes it and
//! checks the target path against the role's allow-list. Anything that cannot
//! be decoded is handled exactly like a missing credential.

use regex::Regex;
use std::collections::BTreeMap;

use super::token::{decode_token, Claim, Role};
use crate::config::GuardConfig;
use crate::storage::{CookieJar, ACCESS_TOKEN_COOKIE};

/// Built-in allow-lists.
const DEFAULT_ROLE_ROUTES: &[(&str, &[&str])] = &[
  ("Admin", &["^/dashboard", "^/profile", "^/register"]),
  ("User", &["^/profile"]),
];

/// Paths the guard runs on at all. Everything else is public.
const DEFAULT_PROTECTED: &[&str] = &["^/register$", "^/profile$", "^/dashboard$", "^/dashboard/"];

pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Role → allowed path patterns.
#[derive(Debug, Clone)]
pub struct RouteTable {
  roles: BTreeMap<Role, Vec<Regex>>,
}

impl RouteTable {
  pub fn builtin() -> Result<Self, regex::Error> {
    Self::from_patterns(DEFAULT_ROLE_ROUTES.iter().map(|(role, patterns)| {
      (
        Role::parse(role),
        patterns.iter().map(|p| p.to_string()).collect(),
      )
    }))
  }

  pub fn from_patterns<I>(entries: I) -> Result<Self, regex::Error>
  where
    I: IntoIterator<Item = (Role, Vec<String>)>,
  {
    let mut roles = BTreeMap::new();
    for (role, patterns) in entries {
      let compiled = patterns
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
      roles.insert(role, compiled);
    }
    Ok(Self { roles })
  }

  /// True iff `path` matches one of `role`'s patterns.
  pub fn allows(&self, role: &Role, path: &str) -> bool {
    self
      .roles
      .get(role)
      .is_some_and(|patterns| patterns.iter().any(|p| p.is_match(path)))
  }
}

/// Where a navigation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
  Unauthenticated,
  AuthenticatedAllowed,
  AuthenticatedDenied,
}

/// What the caller should do with the navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Redirect {
    location: String,
    /// The credential cookie must be dropped before following the redirect
    clear_credential: bool,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
  pub state: GuardState,
  pub decision: Decision,
  pub claim: Option<Claim>,
}

impl Verdict {
  pub fn is_allowed(&self) -> bool {
    self.decision == Decision::Allow
  }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
  table: RouteTable,
  protected: Vec<Regex>,
  auth_routes: Vec<String>,
  login_path: String,
}

impl RouteGuard {
  pub fn new(table: RouteTable, auth_routes: Vec<String>, login_path: String) -> Self {
    Self {
      table,
      protected: Vec::new(),
      auth_routes,
      login_path,
    }
  }

  /// Restrict which paths `applies_to` reports as guarded.
  pub fn with_protected(mut self, protected: Vec<Regex>) -> Self {
    self.protected = protected;
    self
  }

  pub fn from_config(config: &GuardConfig) -> Result<Self, regex::Error> {
    let table = match &config.roles {
      Some(roles) => RouteTable::from_patterns(
        roles
          .iter()
          .map(|(role, patterns)| (Role::parse(role), patterns.clone())),
      )?,
      None => RouteTable::builtin()?,
    };

    let protected = match &config.protected {
      Some(patterns) => patterns
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?,
      None => DEFAULT_PROTECTED
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(
      Self::new(
        table,
        config.auth_routes.clone(),
        config.login_path.clone(),
      )
      .with_protected(protected),
    )
  }

  /// Whether navigations to `path` go through the guard.
  pub fn applies_to(&self, path: &str) -> bool {
    self.protected.iter().any(|p| p.is_match(path))
  }

  fn is_auth_route(&self, path: &str) -> bool {
    self.auth_routes.iter().any(|r| r == path)
  }

  /// Decide a navigation to `path` given the raw credential, if any.
  pub fn evaluate(&self, path: &str, credential: Option<&str>) -> Verdict {
    let claim = credential.and_then(|token| match decode_token(token) {
      Ok(claim) if claim.is_expired() => {
        tracing::debug!(email = %claim.email, "credential expired");
        None
      }
      Ok(claim) => Some(claim),
      Err(e) => {
        tracing::debug!(error = %e, "credential rejected");
        None
      }
    });

    let Some(claim) = claim else {
      if self.is_auth_route(path) {
        return Verdict {
          state: GuardState::Unauthenticated,
          decision: Decision::Allow,
          claim: None,
        };
      }
      return Verdict {
        state: GuardState::Unauthenticated,
        decision: Decision::Redirect {
          location: format!("{}?redirectPath={}", self.login_path, path),
          clear_credential: false,
        },
        claim: None,
      };
    };

    if !claim.role.is_recognized() {
      tracing::warn!(
        role = %claim.role,
        "credential carries a role spelling with no allow-list; check the issuer's role casing"
      );
    }

    if self.table.allows(&claim.role, path) {
      Verdict {
        state: GuardState::AuthenticatedAllowed,
        decision: Decision::Allow,
        claim: Some(claim),
      }
    } else {
      tracing::warn!(path, role = %claim.role, "navigation denied");
      Verdict {
        state: GuardState::AuthenticatedDenied,
        decision: Decision::Redirect {
          location: self.login_path.clone(),
          clear_credential: true,
        },
        claim: Some(claim),
      }
    }
  }

  /// Run the guard against the cookie jar, clearing the credential on denial.
  pub fn navigate(&self, path: &str, cookies: &CookieJar) -> Verdict {
    let credential = match cookies.get(ACCESS_TOKEN_COOKIE) {
      Ok(credential) => credential,
      Err(e) => {
        tracing::warn!(error = %e, "could not read credential cookie");
        None
      }
    };

    let verdict = self.evaluate(path, credential.as_deref());

    if let Decision::Redirect {
      clear_credential: true,
      ..
    } = verdict.decision
    {
      if let Err(e) = cookies.remove(ACCESS_TOKEN_COOKIE) {
        tracing::warn!(error = %e, "could not clear credential cookie");
      }
    }

    verdict
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::token::{token_for, unsigned_token};
  use crate::storage::MemoryStorage;
  use chrono::Duration;
  use std::sync::Arc;

  fn guard() -> RouteGuard {
    RouteGuard::from_config(&GuardConfig::default()).unwrap()
  }

  fn redirect_to_login(path: &str) -> Decision {
    Decision::Redirect {
      location: format!("/login?redirectPath={}", path),
      clear_credential: false,
    }
  }

  #[test]
  fn test_admin_reaches_dashboard() {
    let verdict = guard().evaluate("/dashboard", Some(&token_for("Admin")));
    assert_eq!(verdict.state, GuardState::AuthenticatedAllowed);
    assert!(verdict.is_allowed());
    assert_eq!(verdict.claim.unwrap().role, Role::Admin);
  }

  #[test]
  fn test_admin_reaches_nested_dashboard_pages() {
    let guard = guard();
    let token = token_for("Admin");
    for path in ["/dashboard/admin/blog", "/profile", "/register"] {
      assert!(guard.evaluate(path, Some(&token)).is_allowed(), "{path}");
    }
  }

  #[test]
  fn test_user_is_denied_dashboard_and_credential_cleared() {
    let verdict = guard().evaluate("/dashboard", Some(&token_for("User")));
    assert_eq!(verdict.state, GuardState::AuthenticatedDenied);
    assert_eq!(
      verdict.decision,
      Decision::Redirect {
        location: "/login".to_string(),
        clear_credential: true,
      }
    );
  }

  #[test]
  fn test_missing_credential_redirects_with_resume_path() {
    let verdict = guard().evaluate("/dashboard", None);
    assert_eq!(verdict.state, GuardState::Unauthenticated);
    assert_eq!(verdict.decision, redirect_to_login("/dashboard"));
  }

  #[test]
  fn test_missing_credential_allows_login() {
    let verdict = guard().evaluate("/login", None);
    assert_eq!(verdict.state, GuardState::Unauthenticated);
    assert!(verdict.is_allowed());
  }

  #[test]
  fn test_undecodable_credentials_never_grant_access() {
    let guard = guard();
    let missing_email = unsigned_token(&serde_json::json!({"id": "1", "role": "Admin"}));
    let garbage: [&str; 6] = [
      "",
      "abc",
      "a.b",
      "a.%%%.c",
      "x.eyJub3QiOiJjbGFpbXMifQ.y",
      missing_email.as_str(),
    ];

    for token in garbage {
      for path in ["/dashboard", "/dashboard/admin/skill", "/profile", "/register", "/"] {
        let verdict = guard.evaluate(path, Some(token));
        assert_eq!(verdict.state, GuardState::Unauthenticated, "{token} {path}");
        assert_eq!(verdict.decision, redirect_to_login(path), "{token} {path}");
      }
      assert!(guard.evaluate("/login", Some(token)).is_allowed());
    }
  }

  #[test]
  fn test_expired_credential_is_unauthenticated() {
    let token = unsigned_token(&serde_json::json!({
      "id": "1", "role": "Admin", "email": "a@b.io", "exp": 10
    }));
    let verdict = guard().evaluate("/dashboard", Some(&token));
    assert_eq!(verdict.state, GuardState::Unauthenticated);
  }

  #[test]
  fn test_unrecognized_role_spelling_is_denied() {
    let verdict = guard().evaluate("/dashboard", Some(&token_for("ADMIN")));
    assert_eq!(verdict.state, GuardState::AuthenticatedDenied);
  }

  #[test]
  fn test_access_is_a_pure_function_of_role_and_path() {
    let table = RouteTable::builtin().unwrap();
    let cases = [
      (Role::Admin, "/dashboard", true),
      (Role::Admin, "/dashboards", true),
      (Role::Admin, "/profile/edit", true),
      (Role::Admin, "/blog", false),
      (Role::User, "/profile", true),
      (Role::User, "/dashboard", false),
      (Role::User, "/register", false),
      (Role::Unrecognized("admin".to_string()), "/dashboard", false),
    ];

    // Forwards, backwards and repeated: the answer never depends on history.
    for _ in 0..2 {
      for (role, path, expected) in cases.iter().chain(cases.iter().rev()) {
        assert_eq!(table.allows(role, path), *expected, "{role} {path}");
      }
    }
  }

  #[test]
  fn test_protected_matcher() {
    let guard = guard();
    assert!(guard.applies_to("/dashboard"));
    assert!(guard.applies_to("/dashboard/admin/project"));
    assert!(guard.applies_to("/profile"));
    assert!(!guard.applies_to("/"));
    assert!(!guard.applies_to("/blog"));
    assert!(!guard.applies_to("/login"));
  }

  #[test]
  fn test_custom_role_table() {
    let mut roles = BTreeMap::new();
    roles.insert("User".to_string(), vec!["^/dashboard/admin/contact".to_string()]);
    let config = GuardConfig {
      roles: Some(roles),
      ..GuardConfig::default()
    };
    let guard = RouteGuard::from_config(&config).unwrap();
    let token = token_for("User");

    assert!(guard.evaluate("/dashboard/admin/contact", Some(&token)).is_allowed());
    assert!(!guard.evaluate("/profile", Some(&token)).is_allowed());
    assert!(!guard.evaluate("/dashboard", Some(&token_for("Admin"))).is_allowed());
  }

  #[test]
  fn test_navigate_with_and_without_cookie() {
    let guard = guard();
    let cookies = CookieJar::new(Arc::new(MemoryStorage::new()));
    cookies
      .set(ACCESS_TOKEN_COOKIE, &token_for("Admin"), Duration::days(7))
      .unwrap();

    assert!(guard.navigate("/dashboard", &cookies).is_allowed());

    cookies.remove(ACCESS_TOKEN_COOKIE).unwrap();
    let verdict = guard.navigate("/dashboard", &cookies);
    assert_eq!(verdict.decision, redirect_to_login("/dashboard"));
  }

  #[test]
  fn test_navigate_denied_clears_cookie() {
    let guard = guard();
    let cookies = CookieJar::new(Arc::new(MemoryStorage::new()));
    cookies
      .set(ACCESS_TOKEN_COOKIE, &token_for("User"), Duration::days(7))
      .unwrap();

    let verdict = guard.navigate("/dashboard", &cookies);
    assert_eq!(verdict.state, GuardState::AuthenticatedDenied);
    assert_eq!(cookies.get(ACCESS_TOKEN_COOKIE).unwrap(), None);
  }
}
