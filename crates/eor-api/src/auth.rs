//! Password hashing and the authenticated-user extractors.
//!
//! A request is authenticated by the `eor_session` cookie issued at login,
//! or by HTTP Basic credentials for scripted clients. Deactivated users are
//! refused either way.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use eor_core::{
  store::{DashboardStore, ObservationSource},
  user::User,
};
use rand_core::OsRng;

use crate::{ApiState, error::ApiError, session::token_from_cookies};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

/// Whether `password` matches the stored PHC string. A malformed hash never
/// matches.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
  PasswordHash::new(password_hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Check a username and password against the store.
///
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub async fn check_credentials<S: DashboardStore>(
  store: &S,
  username: &str,
  password: &str,
) -> Result<User, ApiError> {
  let (user, hash) = store
    .get_credentials(username)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  if !verify_password(password, &hash) {
    return Err(ApiError::Unauthorized);
  }
  if !user.is_active() {
    return Err(ApiError::Forbidden(format!("user {} is deactivated", user.username)));
  }
  Ok(user)
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// The authenticated, active user making the request.
pub struct CurrentUser(pub User);

/// A [`CurrentUser`] with `admin_level ≥ 1`.
pub struct AdminUser(pub User);

impl<S, O> FromRequestParts<ApiState<S, O>> for CurrentUser
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, O>,
  ) -> Result<Self, Self::Rejection> {
    let token = parts
      .headers
      .get(header::COOKIE)
      .and_then(|v| v.to_str().ok())
      .and_then(token_from_cookies);

    if let Some(token) = token
      && let Some(user_id) = state.sessions.get(token).await
    {
      let user = state
        .store
        .get_user(user_id)
        .await
        .map_err(ApiError::store)?
        .filter(User::is_active)
        .ok_or(ApiError::Unauthorized)?;
      return Ok(CurrentUser(user));
    }

    let (username, password) =
      basic_credentials(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let user = check_credentials(state.store.as_ref(), &username, &password).await?;
    Ok(CurrentUser(user))
  }
}

impl<S, O> FromRequestParts<ApiState<S, O>> for AdminUser
where
  S: DashboardStore + Clone + 'static,
  O: ObservationSource + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, O>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
    if !user.is_admin() {
      return Err(ApiError::Forbidden("admin access required".into()));
    }
    Ok(AdminUser(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashes_verify_only_their_password() {
    let hash = hash_password("hunter2").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter2", &hash));
    assert!(!verify_password("hunter3", &hash));
  }

  #[test]
  fn malformed_hash_never_matches() {
    assert!(!verify_password("anything", "not-a-phc-string"));
  }

  #[test]
  fn basic_header_is_decoded() {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode("ann:pa:ss")).parse().unwrap(),
    );
    assert_eq!(
      basic_credentials(&headers),
      Some(("ann".to_owned(), "pa:ss".to_owned()))
    );

    headers.insert(header::AUTHORIZATION, "Basic !!!".parse().unwrap());
    assert_eq!(basic_credentials(&headers), None);
  }
}
