//! Dashboard users and their activation lifecycle.
//!
//! Users are never deleted. The only lifecycle is
//! `active → deactivated → active`, and admins can never leave `active`
//! through it, so the last admin cannot lock everyone out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type UserId = i64;

/// A user as exposed to callers. The password hash never leaves the store
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:               UserId,
  pub username:         String,
  pub name:             String,
  pub email:            String,
  pub created_at:       DateTime<Utc>,
  /// `None` while the user is active.
  pub deactivated_date: Option<DateTime<Utc>>,
  /// 0 is a normal user; anything ≥ 1 is an admin.
  pub admin_level:      i32,
}

/// The computed activation state of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UserStatus {
  Active,
  Deactivated { since: DateTime<Utc> },
}

/// A requested change of activation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
  Deactivate,
  Reactivate,
}

impl User {
  pub fn is_admin(&self) -> bool { self.admin_level >= 1 }

  pub fn is_active(&self) -> bool { self.deactivated_date.is_none() }

  pub fn status(&self) -> UserStatus {
    match self.deactivated_date {
      None => UserStatus::Active,
      Some(since) => UserStatus::Deactivated { since },
    }
  }

  /// The `deactivated_date` this user would have after `transition` at
  /// `now`, or the reason the transition is illegal.
  pub fn transition(
    &self,
    transition: Transition,
    now: DateTime<Utc>,
  ) -> Result<Option<DateTime<Utc>>> {
    match (transition, self.status()) {
      (Transition::Deactivate, UserStatus::Deactivated { .. }) => {
        Err(Error::AlreadyDeactivated(self.id))
      }
      (Transition::Deactivate, UserStatus::Active) if self.is_admin() => {
        Err(Error::AdminNotDeactivatable(self.id))
      }
      (Transition::Deactivate, UserStatus::Active) => Ok(Some(now)),
      (Transition::Reactivate, UserStatus::Active) => {
        Err(Error::NotDeactivated(self.id))
      }
      (Transition::Reactivate, UserStatus::Deactivated { .. }) => Ok(None),
    }
  }
}

// ─── Creation ────────────────────────────────────────────────────────────────

/// Unvalidated input for `POST /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDraft {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

/// Validated user fields. The password is handed to the caller separately
/// for hashing and is never stored in plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
  pub username:    String,
  pub name:        String,
  pub email:       String,
  pub admin_level: i32,
}

impl UserDraft {
  /// Returns the validated user and the plain-text password.
  pub fn validate(self) -> Result<(NewUser, String)> {
    let required = |value: String, field| {
      let trimmed = value.trim().to_owned();
      if trimmed.is_empty() {
        Err(Error::MissingField(field))
      } else {
        Ok(trimmed)
      }
    };

    let username = required(self.username, "username")?;
    let name = required(self.name, "name")?;
    let email = required(self.email, "email")?;
    if self.password.is_empty() {
      return Err(Error::MissingField("password"));
    }

    Ok((NewUser { username, name, email, admin_level: 0 }, self.password))
  }
}

// ─── Self-service ────────────────────────────────────────────────────────────

/// Changes a user may make to their own account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub name:     Option<String>,
  pub email:    Option<String>,
  pub password: Option<String>,
}

impl ProfileUpdate {
  /// Trim fields and reject ones that were supplied but left blank.
  /// A blank password means "unchanged", matching the account form.
  pub fn normalized(self) -> Result<Self> {
    let keep = |value: Option<String>, field| match value {
      None => Ok(None),
      Some(v) if v.trim().is_empty() => Err(Error::MissingField(field)),
      Some(v) => Ok(Some(v.trim().to_owned())),
    };
    Ok(Self {
      name:     keep(self.name, "name")?,
      email:    keep(self.email, "email")?,
      password: self.password.filter(|p| !p.trim().is_empty()),
    })
  }
}
