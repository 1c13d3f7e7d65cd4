//! Error types for `eor-core`.

use chrono::NaiveDate;
use thiserror::Error;

use crate::{log::LogId, user::UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────

  #[error("invalid date {value:?}: {reason}")]
  InvalidDate { value: String, reason: &'static str },

  #[error("at least one tag is required")]
  EmptyTagMask,

  #[error("unknown tag: {0:?}")]
  UnknownTag(String),

  #[error("unknown tag index: {0}")]
  UnknownTagIndex(usize),

  #[error("unknown tag bits: {0:#x}")]
  UnknownTagBits(u32),

  #[error("required field missing: {0}")]
  MissingField(&'static str),

  #[error("from_date {from} is after to_date {to}")]
  InvalidDateRange { from: NaiveDate, to: NaiveDate },

  // ── Authorization ───────────────────────────────────────────────────────

  #[error("only the author or an admin may modify observation log {0}")]
  NotAuthorized(LogId),

  // ── User lifecycle ──────────────────────────────────────────────────────

  #[error("user {0} is already deactivated")]
  AlreadyDeactivated(UserId),

  #[error("user {0} is not deactivated")]
  NotDeactivated(UserId),

  #[error("admin user {0} cannot be deactivated")]
  AdminNotDeactivatable(UserId),

  #[error("username already exists: {0}")]
  UsernameTaken(String),

  // ── Lookups ─────────────────────────────────────────────────────────────

  #[error("observation log not found: {0}")]
  LogNotFound(LogId),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("no user named {0:?}")]
  UsernameNotFound(String),

  // ── Upstream data ───────────────────────────────────────────────────────

  #[error("{0}")]
  ListingParse(&'static str),
}

impl Error {
  /// Whether this error is a rejected input rather than a state conflict.
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      Self::InvalidDate { .. }
        | Self::EmptyTagMask
        | Self::UnknownTag(_)
        | Self::UnknownTagIndex(_)
        | Self::UnknownTagBits(_)
        | Self::MissingField(_)
        | Self::InvalidDateRange { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
