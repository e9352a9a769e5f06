//! Application context: one session, one cache, one set of API clients.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;

use crate::api::types::LoginInput;
use crate::api::{Api, ApiResponse, ClientError, HttpTransport, Transport};
use crate::auth::{decode_token, Claim, RouteGuard, Session, SessionStore, Verdict};
use crate::cache::{Mutation, QueryCache, QueryDef, QueryState, Subscription};
use crate::config::Config;
use crate::storage::{
  CookieJar, SqliteStorage, Storage, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};

/// Lifetime of the credential cookie set on login.
pub const CREDENTIAL_MAX_AGE_DAYS: i64 = 7;

/// Totals shown on the dashboard landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
  pub projects: usize,
  pub blogs: usize,
  pub experiences: usize,
  pub skills: usize,
}

/// Everything a command needs, wired together once at startup.
pub struct AppContext<T: Transport = HttpTransport> {
  cookies: CookieJar,
  session: SessionStore,
  guard: RouteGuard,
  pub cache: QueryCache,
  pub api: Api<T>,
}

impl AppContext<HttpTransport> {
  /// Open the on-disk state and build an HTTP-backed context.
  pub fn new(config: Config) -> Result<Self> {
    let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::open_at(&config.storage_path()?)?);
    let transport = HttpTransport::new(config.api_root()?)
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Self::with_parts(config, storage, Arc::new(transport))
  }
}

impl<T: Transport> AppContext<T> {
  pub fn with_parts(config: Config, storage: Arc<dyn Storage>, transport: Arc<T>) -> Result<Self> {
    let guard = RouteGuard::from_config(&config.guard)
      .map_err(|e| eyre!("Invalid route pattern in config: {}", e))?;
    let cookies = CookieJar::new(storage.clone());
    let session = SessionStore::rehydrate(storage)?;
    let api = Api::new(transport, cookies.clone());
    let cache = QueryCache::new(config.cache.keep_unused());

    Ok(Self {
      cookies,
      session,
      guard,
      cache,
      api,
    })
  }

  pub fn session(&self) -> &Session {
    self.session.session()
  }

  pub fn current_user(&self) -> Option<&Claim> {
    self.session.current_user()
  }

  /// Authenticate and start a session.
  ///
  /// The credential is decoded before anything is stored, so a token the
  /// client cannot read leaves the previous state untouched. The session is
  /// written before the cookie and put back if the cookie cannot be stored,
  /// so the guard never sees a credential the session does not hold.
  pub async fn login(&mut self, email: &str, password: &str) -> Result<Claim, ClientError> {
    let mutation = self.api.auth.login(LoginInput {
      email: email.trim().to_string(),
      password: password.to_string(),
    })?;
    let response = self.cache.execute(mutation).await?;

    let token = response.data.access_token;
    let claim = decode_token(&token)?;

    let previous = self.session.session().clone();
    self
      .session
      .set_user(claim.clone(), token.clone())
      .map_err(|e| ClientError::Storage(e.to_string()))?;

    let stored = self.cookies.set(
      ACCESS_TOKEN_COOKIE,
      &token,
      Duration::days(CREDENTIAL_MAX_AGE_DAYS),
    );
    if let Err(e) = stored {
      tracing::warn!(error = %e, "could not store credential cookie, restoring session");
      if let Err(restore) = self.session.restore(previous) {
        tracing::warn!(error = %restore, "could not restore previous session");
      }
      return Err(ClientError::Storage(e.to_string()));
    }

    Ok(claim)
  }

  /// Drop the credential cookies, the session and every cached result.
  ///
  /// Every step is attempted even when an earlier one fails; the first
  /// failure is returned.
  pub fn logout(&mut self) -> Result<()> {
    let results = [
      self.session.logout(),
      self.cookies.remove(ACCESS_TOKEN_COOKIE),
      self.cookies.remove(REFRESH_TOKEN_COOKIE),
    ];
    self.cache.reset();

    let mut first = None;
    for result in results {
      if let Err(e) = result {
        tracing::warn!(error = %e, "logout step failed");
        first.get_or_insert(e);
      }
    }
    match first {
      Some(e) => Err(eyre!("Failed to log out cleanly: {}", e)),
      None => Ok(()),
    }
  }

  /// Gate a navigation. `None` means the path is not guarded at all.
  pub fn navigate(&self, path: &str) -> Option<Verdict> {
    if !self.guard.applies_to(path) {
      tracing::debug!(path, "path is not guarded");
      return None;
    }
    Some(self.guard.navigate(path, &self.cookies))
  }

  /// Fetch one query through the cache and release it.
  pub async fn fetch<R: Send + Sync + 'static>(
    &mut self,
    def: QueryDef<R>,
  ) -> Result<Arc<R>, ClientError> {
    let subscription = self.cache.subscribe(def);
    self.cache.settle().await;
    let snapshot = self.cache.read(&subscription);
    self.cache.unsubscribe(subscription);
    self.cache.collect_garbage();

    tracing::debug!(
      fetches = snapshot.fetch_count,
      stale = snapshot.is_stale,
      "query read"
    );
    match snapshot.state() {
      QueryState::Success(data) => Ok(data),
      QueryState::Error(e) => Err(e),
      QueryState::Loading | QueryState::Idle => {
        Err(ClientError::Network("Query was cancelled".to_string()))
      }
    }
  }

  /// Run a mutation through the cache so dependent queries refresh.
  pub async fn mutate<R>(&mut self, mutation: Mutation<R>) -> Result<ApiResponse<R>, ClientError> {
    self.cache.execute(mutation).await
  }

  /// Resource totals, fetched concurrently.
  pub async fn dashboard_stats(&mut self) -> Result<DashboardStats, ClientError> {
    let projects = self.cache.subscribe(self.api.project.all_projects());
    let blogs = self.cache.subscribe(self.api.blog.all_blogs());
    let experiences = self.cache.subscribe(self.api.experience.all_experiences());
    let skills = self.cache.subscribe(self.api.skill.all_skills());
    self.cache.settle().await;

    let counts = [
      count(&self.cache, &projects),
      count(&self.cache, &blogs),
      count(&self.cache, &experiences),
      count(&self.cache, &skills),
    ];

    self.cache.unsubscribe(projects);
    self.cache.unsubscribe(blogs);
    self.cache.unsubscribe(experiences);
    self.cache.unsubscribe(skills);
    self.cache.collect_garbage();

    let [projects, blogs, experiences, skills] = counts;
    Ok(DashboardStats {
      projects: projects?,
      blogs: blogs?,
      experiences: experiences?,
      skills: skills?,
    })
  }
}

fn count<R: Send + Sync + 'static>(
  cache: &QueryCache,
  subscription: &Subscription<Vec<R>>,
) -> Result<usize, ClientError> {
  let snapshot = cache.read(subscription);
  if let Some(e) = snapshot.error {
    return Err(e);
  }
  Ok(snapshot.data.map(|items| items.len()).unwrap_or(0))
}
