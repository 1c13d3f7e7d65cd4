//! Single-value response cache with a fixed time-to-live.

use std::{future::Future, time::Duration};

use tokio::{sync::Mutex, time::Instant};

/// Holds the last successful value of an expensive fetch for `ttl`.
///
/// The lock is held across a refresh, so concurrent callers wait for one
/// fetch instead of all hitting the backend. Failed fetches are not cached.
pub struct Cached<T> {
  ttl:  Duration,
  slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> Cached<T> {
  pub fn new(ttl: Duration) -> Self { Self { ttl, slot: Mutex::new(None) } }

  pub async fn get_or_refresh<F, Fut, E>(&self, fetch: F) -> Result<T, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let mut slot = self.slot.lock().await;
    if let Some((at, value)) = slot.as_ref()
      && at.elapsed() < self.ttl
    {
      return Ok(value.clone());
    }

    let value = fetch().await?;
    *slot = Some((Instant::now(), value.clone()));
    Ok(value)
  }
}
