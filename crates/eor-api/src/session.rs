//! In-memory login sessions.

use std::collections::HashMap;

use eor_core::user::UserId;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "eor_session";

/// Maps opaque session tokens to the user they were issued to. Sessions
/// last until logout, deactivation of their user, or a server restart.
#[derive(Default)]
pub struct SessionStore {
  sessions: RwLock<HashMap<Uuid, UserId>>,
}

impl SessionStore {
  pub async fn create(&self, user: UserId) -> Uuid {
    let token = Uuid::new_v4();
    self.sessions.write().await.insert(token, user);
    token
  }

  pub async fn get(&self, token: Uuid) -> Option<UserId> {
    self.sessions.read().await.get(&token).copied()
  }

  pub async fn remove(&self, token: Uuid) { self.sessions.write().await.remove(&token); }

  /// Drop every session issued to `user`, returning how many there were.
  pub async fn revoke_user(&self, user: UserId) -> usize {
    let mut sessions = self.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, owner| *owner != user);
    before - sessions.len()
  }
}

/// The session token in a `Cookie` header value, if any.
pub fn token_from_cookies(header: &str) -> Option<Uuid> {
  header
    .split(';')
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value establishing `token`.
pub fn set_cookie(token: Uuid) -> String {
  format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value that expires the session cookie.
pub fn clear_cookie() -> String {
  format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn sessions_resolve_until_removed() {
    let store = SessionStore::default();
    let token = store.create(7).await;
    assert_eq!(store.get(token).await, Some(7));
    store.remove(token).await;
    assert_eq!(store.get(token).await, None);
  }

  #[tokio::test]
  async fn revoking_a_user_keeps_other_sessions() {
    let store = SessionStore::default();
    let first = store.create(7).await;
    let second = store.create(7).await;
    let other = store.create(8).await;

    assert_eq!(store.revoke_user(7).await, 2);
    assert_eq!(store.get(first).await, None);
    assert_eq!(store.get(second).await, None);
    assert_eq!(store.get(other).await, Some(8));
    assert_eq!(store.revoke_user(7).await, 0);
  }

  #[test]
  fn token_is_found_among_other_cookies() {
    let token = Uuid::new_v4();
    let header = format!("theme=dark; {SESSION_COOKIE}={token}; lang=en");
    assert_eq!(token_from_cookies(&header), Some(token));
    assert_eq!(token_from_cookies("theme=dark"), None);
    assert_eq!(token_from_cookies(&format!("{SESSION_COOKIE}=garbage")), None);
  }
}
