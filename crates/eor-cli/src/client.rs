//! Async HTTP client wrapping the EoR JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use eor_core::{
  log::ObservationLog,
  observation::{FutureObservationCounts, Observation},
  tag::TagMask,
  user::{ProfileUpdate, User, UserDraft, UserId},
};
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;

/// Connection settings for the EoR API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the EoR JSON REST API.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

#[derive(Deserialize)]
struct ObservationList {
  observations: Vec<Observation>,
}

#[derive(Deserialize)]
struct LogList {
  observation_logs: Vec<ObservationLog>,
}

#[derive(Deserialize)]
struct LatestLog {
  observation_log: Option<ObservationLog>,
}

#[derive(Deserialize)]
struct UserList {
  users: Vec<User>,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Turn a response into `T`, or into an error carrying the server's message.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  let status = resp.status();
  if !status.is_success() {
    let message = resp
      .json::<ErrorBody>()
      .await
      .map(|b| b.error)
      .unwrap_or_default();
    return Err(anyhow!("{what} → {status} {message}"));
  }
  resp.json().await.with_context(|| format!("deserialising {what}"))
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
    let resp = self
      .auth(self.client.get(self.url(path)))
      .query(query)
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    decode(resp, &format!("GET {path}")).await
  }

  // ── Telescope ─────────────────────────────────────────────────────────────

  /// `GET /api/mit_data/observations`
  pub async fn recent_observations(&self) -> Result<Vec<Observation>> {
    let list: ObservationList = self.get("/mit_data/observations", &[]).await?;
    Ok(list.observations)
  }

  /// `GET /api/mit_data/future_observation_counts`
  pub async fn future_observation_counts(&self) -> Result<FutureObservationCounts> {
    self.get("/mit_data/future_observation_counts", &[]).await
  }

  // ── Observation logs ──────────────────────────────────────────────────────

  /// `GET /api/observation_logs/latest`
  pub async fn latest_log(&self) -> Result<Option<ObservationLog>> {
    let latest: LatestLog = self.get("/observation_logs/latest", &[]).await?;
    Ok(latest.observation_log)
  }

  /// `GET /api/observation_logs?tags=&limit=&offset=`
  pub async fn list_logs(
    &self,
    tags: TagMask,
    limit: u32,
    offset: u32,
  ) -> Result<Vec<ObservationLog>> {
    let list: LogList = self
      .get(
        "/observation_logs",
        &[
          ("tags", tags.bits().to_string()),
          ("limit", limit.to_string()),
          ("offset", offset.to_string()),
        ],
      )
      .await?;
    Ok(list.observation_logs)
  }

  /// `POST /api/observation_logs`
  pub async fn create_log(
    &self,
    observed_date: &str,
    note: &str,
    tags: TagMask,
  ) -> Result<ObservationLog> {
    let resp = self
      .auth(self.client.post(self.url("/observation_logs")))
      .json(&json!({
        "observed_date": observed_date,
        "note": note,
        "tags": tags.bits(),
      }))
      .send()
      .await
      .context("POST /observation_logs failed")?;
    decode(resp, "POST /observation_logs").await
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  /// `GET /api/users`
  pub async fn list_users(&self) -> Result<Vec<User>> {
    let list: UserList = self.get("/users", &[]).await?;
    Ok(list.users)
  }

  /// `POST /api/users` (admin only).
  pub async fn create_user(&self, draft: &UserDraft) -> Result<User> {
    let resp = self
      .auth(self.client.post(self.url("/users")))
      .json(&json!({
        "username": draft.username,
        "name": draft.name,
        "email": draft.email,
        "password": draft.password,
      }))
      .send()
      .await
      .context("POST /users failed")?;
    decode(resp, "POST /users").await
  }

  /// `GET /api/current_user`
  pub async fn current_user(&self) -> Result<User> { self.get("/current_user", &[]).await }

  /// `PUT /api/current_user`; absent fields are left unchanged.
  pub async fn update_current_user(&self, update: &ProfileUpdate) -> Result<User> {
    let resp = self
      .auth(self.client.put(self.url("/current_user")))
      .json(&json!({
        "name": update.name,
        "email": update.email,
        "password": update.password,
      }))
      .send()
      .await
      .context("PUT /current_user failed")?;
    decode(resp, "PUT /current_user").await
  }

  /// `PUT /api/users/{id}` with `{"deactivate":true}` or `{"reactivate":true}`.
  pub async fn set_user_active(&self, id: UserId, active: bool) -> Result<User> {
    let body = if active {
      json!({ "reactivate": true })
    } else {
      json!({ "deactivate": true })
    };
    let resp = self
      .auth(self.client.put(self.url(&format!("/users/{id}"))))
      .json(&body)
      .send()
      .await
      .with_context(|| format!("PUT /users/{id} failed"))?;
    decode(resp, &format!("PUT /users/{id}")).await
  }
}
