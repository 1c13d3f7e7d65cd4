//! Observation-log tags and the integer bitmask they are stored as.
//!
//! Bit `i` of a [`TagMask`] always means `Tag::ALL[i]`. Stored masks outlive
//! any single release, so the enumeration may only ever be appended to:
//! reordering or removing a variant silently changes the meaning of every
//! historical log entry.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Tag ─────────────────────────────────────────────────────────────────────

/// A single observation-log category. The discriminant is the bit position.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[repr(u8)]
pub enum Tag {
  #[serde(rename = "bad")]
  Bad              = 0,
  #[serde(rename = "fine")]
  Fine             = 1,
  #[serde(rename = "no data")]
  NoData           = 2,
  #[serde(rename = "hardware issue")]
  HardwareIssue    = 3,
  #[serde(rename = "dataflow issue")]
  DataflowIssue    = 4,
  #[serde(rename = "correlation issue")]
  CorrelationIssue = 5,
  #[serde(rename = "got email from ops")]
  GotEmailFromOps  = 6,
}

impl Tag {
  /// Every tag in bit order. Append only.
  pub const ALL: [Tag; 7] = [
    Tag::Bad,
    Tag::Fine,
    Tag::NoData,
    Tag::HardwareIssue,
    Tag::DataflowIssue,
    Tag::CorrelationIssue,
    Tag::GotEmailFromOps,
  ];

  pub const fn bit(self) -> u32 { self as u32 }

  /// The single-bit mask value, i.e. `2^bit`.
  pub const fn value(self) -> u32 { 1 << self.bit() }

  /// Human-readable name, as shown on the dashboard and accepted on input.
  pub const fn name(self) -> &'static str {
    match self {
      Self::Bad => "bad",
      Self::Fine => "fine",
      Self::NoData => "no data",
      Self::HardwareIssue => "hardware issue",
      Self::DataflowIssue => "dataflow issue",
      Self::CorrelationIssue => "correlation issue",
      Self::GotEmailFromOps => "got email from ops",
    }
  }

  /// Look a tag up by its position in [`Tag::ALL`].
  pub fn from_index(index: usize) -> Option<Self> {
    Self::ALL.get(index).copied()
  }
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Tag {
  type Err = Error;

  /// Accepts the display name (`"hardware issue"`) case-insensitively, with
  /// `_` or `-` allowed in place of spaces.
  fn from_str(s: &str) -> Result<Self> {
    let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
    Self::ALL
      .into_iter()
      .find(|t| t.name() == normalized)
      .ok_or_else(|| Error::UnknownTag(s.to_owned()))
  }
}

// ─── TagMask ─────────────────────────────────────────────────────────────────

/// A set of [`Tag`]s packed into an integer, exactly as stored and sent on
/// the wire.
///
/// Bits above the known enumeration are kept as-is so that a mask read from
/// storage is written back unchanged, but they never decode to a name.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TagMask(u32);

impl TagMask {
  pub const EMPTY: TagMask = TagMask(0);

  /// Every bit that names a member of [`Tag::ALL`].
  pub const KNOWN: TagMask = TagMask((1u32 << Tag::ALL.len()) - 1);

  pub const fn from_bits(bits: u32) -> Self { Self(bits) }

  pub const fn bits(self) -> u32 { self.0 }

  pub const fn is_empty(self) -> bool { self.0 == 0 }

  /// Bits set in this mask that no [`Tag`] accounts for.
  pub const fn unknown_bits(self) -> u32 { self.0 & !Self::KNOWN.0 }

  /// Encode a selection of checked positions in [`Tag::ALL`].
  pub fn from_indices<I>(indices: I) -> Result<Self>
  where
    I: IntoIterator<Item = usize>,
  {
    indices.into_iter().try_fold(Self::EMPTY, |mask, i| {
      Tag::from_index(i)
        .map(|t| mask.with(t))
        .ok_or(Error::UnknownTagIndex(i))
    })
  }

  /// Encode a selection of tag names.
  pub fn from_names<I, S>(names: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    names
      .into_iter()
      .map(|n| n.as_ref().parse::<Tag>())
      .collect()
  }

  pub const fn contains(self, tag: Tag) -> bool { self.0 & tag.value() != 0 }

  #[must_use]
  pub const fn with(self, tag: Tag) -> Self { Self(self.0 | tag.value()) }

  #[must_use]
  pub const fn without(self, tag: Tag) -> Self { Self(self.0 & !tag.value()) }

  #[must_use]
  pub const fn toggled(self, tag: Tag) -> Self { Self(self.0 ^ tag.value()) }

  pub const fn intersects(self, other: TagMask) -> bool {
    self.0 & other.0 != 0
  }

  /// Whether an entry carrying `self` passes the list filter `filter`.
  ///
  /// An empty filter means "all"; otherwise any shared bit is a match.
  pub const fn matches_filter(self, filter: TagMask) -> bool {
    filter.is_empty() || self.intersects(filter)
  }

  /// Known tags whose bit is set, in enumeration order.
  pub fn iter(self) -> impl Iterator<Item = Tag> {
    Tag::ALL.into_iter().filter(move |t| self.contains(*t))
  }

  pub fn names(self) -> Vec<&'static str> { self.iter().map(Tag::name).collect() }
}

impl FromIterator<Tag> for TagMask {
  fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
    iter.into_iter().fold(Self::EMPTY, TagMask::with)
  }
}

impl From<Tag> for TagMask {
  fn from(tag: Tag) -> Self { Self(tag.value()) }
}

impl fmt::Display for TagMask {
  /// Comma-separated tag names, e.g. `fine, hardware issue`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.names().join(", "))
  }
}
