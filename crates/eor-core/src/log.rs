//! Observation-log entries: the operator's day-by-day notes on observing
//! conditions, each tagged with a [`TagMask`].
//!
//! Input arrives as loosely-typed drafts and patches; [`NewLog`] is the only
//! shape a store will persist, and it can only be built through validation.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
  Error, Result,
  tag::TagMask,
  user::{User, UserId},
};

pub type LogId = i64;

// ─── Observed date ───────────────────────────────────────────────────────────

/// Parse a strict `YYYY-MM-DD` date.
///
/// The shape and the month/day ranges are checked first so that the error
/// names the offending part; the date must then also exist on the calendar.
pub fn parse_observed_date(s: &str) -> Result<NaiveDate> {
  let invalid = |reason| Error::InvalidDate { value: s.to_owned(), reason };

  let bytes = s.as_bytes();
  let shape_ok = bytes.len() == 10
    && bytes[4] == b'-'
    && bytes[7] == b'-'
    && bytes
      .iter()
      .enumerate()
      .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
  if !shape_ok {
    return Err(invalid("expected YYYY-MM-DD"));
  }

  let field = |range: std::ops::Range<usize>| {
    s[range].parse::<u32>().map_err(|_| invalid("expected YYYY-MM-DD"))
  };
  let year = field(0..4)?;
  let month = field(5..7)?;
  let day = field(8..10)?;

  if !(1..=12).contains(&month) {
    return Err(invalid("month out of range"));
  }
  if !(1..=31).contains(&day) {
    return Err(invalid("day out of range"));
  }

  NaiveDate::from_ymd_opt(year as i32, month, day)
    .ok_or_else(|| invalid("no such calendar date"))
}

/// Serde adapter: an observed date travels as a midnight-UTC timestamp, and
/// either that or a bare `YYYY-MM-DD` is accepted back.
pub mod observed_date_format {
  use super::*;

  pub fn serialize<S: Serializer>(
    date: &NaiveDate,
    serializer: S,
  ) -> std::result::Result<S::Ok, S::Error> {
    date
      .and_time(NaiveTime::MIN)
      .and_utc()
      .serialize(serializer)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> std::result::Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
      return Ok(dt.with_timezone(&Utc).date_naive());
    }
    parse_observed_date(&raw).map_err(serde::de::Error::custom)
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// A persisted log entry, with the author's display name joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationLog {
  pub id:               LogId,
  /// Server-assigned; never changes after creation.
  pub created_date:     DateTime<Utc>,
  #[serde(with = "observed_date_format")]
  pub observed_date:    NaiveDate,
  pub author_user_id:   UserId,
  pub author_user_name: String,
  pub note:             String,
  pub tags:             TagMask,
}

impl ObservationLog {
  /// The author-or-admin rule shared by update and delete.
  pub fn authorize_modify(&self, actor: &User) -> Result<()> {
    if actor.id == self.author_user_id || actor.is_admin() {
      Ok(())
    } else {
      Err(Error::NotAuthorized(self.id))
    }
  }

  /// The validated fields of this entry, as a starting point for a patch.
  fn as_new(&self) -> NewLog {
    NewLog {
      observed_date: self.observed_date,
      note:          self.note.clone(),
      tags:          self.tags,
    }
  }
}

// ─── Write inputs ────────────────────────────────────────────────────────────

/// Unvalidated input for a new entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogDraft {
  pub observed_date: String,
  #[serde(default)]
  pub note:          Option<String>,
  #[serde(default)]
  pub tags:          TagMask,
}

impl LogDraft {
  pub fn validate(self) -> Result<NewLog> {
    if self.observed_date.trim().is_empty() {
      return Err(Error::MissingField("observed_date"));
    }
    NewLog::new(
      parse_observed_date(self.observed_date.trim())?,
      self.note.unwrap_or_default(),
      self.tags,
    )
  }
}

/// A partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogPatch {
  pub observed_date: Option<String>,
  pub note:          Option<String>,
  pub tags:          Option<TagMask>,
}

impl LogPatch {
  /// Apply onto `current` and re-run the creation rules on the result, so an
  /// update can never produce an entry that could not have been created.
  pub fn apply(self, current: &ObservationLog) -> Result<NewLog> {
    let base = current.as_new();
    let observed_date = match self.observed_date {
      Some(raw) => parse_observed_date(raw.trim())?,
      None => base.observed_date,
    };
    NewLog::new(
      observed_date,
      self.note.unwrap_or(base.note),
      self.tags.unwrap_or(base.tags),
    )
  }
}

/// A validated entry ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLog {
  observed_date: NaiveDate,
  note:          String,
  tags:          TagMask,
}

impl NewLog {
  pub fn new(observed_date: NaiveDate, note: String, tags: TagMask) -> Result<Self> {
    if tags.is_empty() {
      return Err(Error::EmptyTagMask);
    }
    match tags.unknown_bits() {
      0 => Ok(Self { observed_date, note, tags }),
      bits => Err(Error::UnknownTagBits(bits)),
    }
  }

  pub fn observed_date(&self) -> NaiveDate { self.observed_date }

  pub fn note(&self) -> &str { &self.note }

  pub fn tags(&self) -> TagMask { self.tags }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Page size used when the caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 10;
/// Upper bound on a single page.
pub const MAX_LIMIT: u32 = 100;

/// A validated list query. Results are newest `observed_date` first, ties
/// broken by newest `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
  /// Empty means every entry; otherwise entries sharing any bit.
  pub tags:      TagMask,
  /// Inclusive lower bound on `observed_date`.
  pub from_date: Option<NaiveDate>,
  /// Inclusive upper bound on `observed_date`.
  pub to_date:   Option<NaiveDate>,
  pub limit:     u32,
  pub offset:    u32,
}

impl Default for LogQuery {
  fn default() -> Self {
    Self {
      tags:      TagMask::EMPTY,
      from_date: None,
      to_date:   None,
      limit:     DEFAULT_LIMIT,
      offset:    0,
    }
  }
}

impl LogQuery {
  /// Build a query from raw request parameters.
  ///
  /// Blank date strings are treated as absent. A limit of 0 falls back to
  /// the default; larger limits are clamped to [`MAX_LIMIT`].
  pub fn from_params(
    tags: Option<u32>,
    from_date: Option<&str>,
    to_date: Option<&str>,
    limit: Option<u32>,
    offset: Option<u32>,
  ) -> Result<Self> {
    let date = |raw: Option<&str>| {
      raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_observed_date)
        .transpose()
    };
    let from_date = date(from_date)?;
    let to_date = date(to_date)?;

    if let (Some(from), Some(to)) = (from_date, to_date) {
      if from > to {
        return Err(Error::InvalidDateRange { from, to });
      }
    }

    let limit = match limit {
      None | Some(0) => DEFAULT_LIMIT,
      Some(n) => n.min(MAX_LIMIT),
    };

    Ok(Self {
      tags: TagMask::from_bits(tags.unwrap_or(0)),
      from_date,
      to_date,
      limit,
      offset: offset.unwrap_or(0),
    })
  }

  /// Whether `entry` satisfies the tag filter and date range (paging aside).
  pub fn matches(&self, entry: &ObservationLog) -> bool {
    entry.tags.matches_filter(self.tags)
      && self.from_date.is_none_or(|d| entry.observed_date >= d)
      && self.to_date.is_none_or(|d| entry.observed_date <= d)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::tag::Tag;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn user(id: UserId, admin_level: i32) -> User {
    User {
      id,
      username: format!("user{id}"),
      name: format!("User {id}"),
      email: format!("user{id}@example.org"),
      created_at: Utc.with_ymd_and_hms(2014, 7, 1, 0, 0, 0).unwrap(),
      deactivated_date: None,
      admin_level,
    }
  }

  fn entry(author: UserId, tags: TagMask) -> ObservationLog {
    ObservationLog {
      id: 7,
      created_date: Utc.with_ymd_and_hms(2014, 8, 2, 3, 4, 5).unwrap(),
      observed_date: date(2014, 8, 1),
      author_user_id: author,
      author_user_name: format!("User {author}"),
      note: "clouds".into(),
      tags,
    }
  }

  // ── Dates ───────────────────────────────────────────────────────────────

  #[test]
  fn parses_well_formed_date() {
    assert_eq!(parse_observed_date("2024-02-29").unwrap(), date(2024, 2, 29));
  }

  #[test]
  fn month_thirteen_is_rejected() {
    assert_eq!(
      parse_observed_date("2024-13-01"),
      Err(Error::InvalidDate {
        value:  "2024-13-01".into(),
        reason: "month out of range",
      })
    );
  }

  #[test]
  fn day_out_of_range_is_rejected() {
    assert!(matches!(
      parse_observed_date("2024-01-32"),
      Err(Error::InvalidDate { reason: "day out of range", .. })
    ));
    assert!(matches!(
      parse_observed_date("2024-01-00"),
      Err(Error::InvalidDate { reason: "day out of range", .. })
    ));
  }

  #[test]
  fn malformed_shapes_are_rejected() {
    for bad in ["2024/01/01", "24-01-01", "2024-1-01", "2024-01-01T00:00", "", "abcd-ef-gh"] {
      assert!(parse_observed_date(bad).is_err(), "{bad:?} accepted");
    }
  }

  #[test]
  fn nonexistent_calendar_date_is_rejected() {
    assert!(matches!(
      parse_observed_date("2023-02-29"),
      Err(Error::InvalidDate { reason: "no such calendar date", .. })
    ));
  }

  #[test]
  fn observed_date_serializes_as_midnight_utc() {
    let e = entry(1, Tag::Fine.into());
    let json = serde_json::to_value(&e).unwrap();
    assert_eq!(json["observed_date"], "2014-08-01T00:00:00Z");
    assert_eq!(json["tags"], 2);

    let back: ObservationLog = serde_json::from_value(json).unwrap();
    assert_eq!(back, e);
  }

  // ── Drafts and patches ──────────────────────────────────────────────────

  #[test]
  fn draft_with_zero_mask_is_rejected() {
    let draft = LogDraft {
      observed_date: "2014-08-01".into(),
      note:          Some("nothing".into()),
      tags:          TagMask::EMPTY,
    };
    assert_eq!(draft.validate(), Err(Error::EmptyTagMask));
  }

  #[test]
  fn draft_with_unnamed_bits_is_rejected() {
    let only_unknown = LogDraft {
      observed_date: "2014-08-04".into(),
      note:          None,
      tags:          TagMask::from_bits(128),
    };
    assert_eq!(only_unknown.validate(), Err(Error::UnknownTagBits(128)));

    let mixed = NewLog::new(date(2014, 8, 4), String::new(), TagMask::from_bits(129));
    assert_eq!(mixed, Err(Error::UnknownTagBits(128)));
  }

  #[test]
  fn draft_without_date_is_rejected() {
    let draft = LogDraft { tags: Tag::Bad.into(), ..Default::default() };
    assert_eq!(draft.validate(), Err(Error::MissingField("observed_date")));
  }

  #[test]
  fn draft_note_defaults_to_empty() {
    let draft = LogDraft {
      observed_date: "2014-08-01".into(),
      note:          None,
      tags:          Tag::Fine.into(),
    };
    let new = draft.validate().unwrap();
    assert_eq!(new.note(), "");
    assert_eq!(new.observed_date(), date(2014, 8, 1));
  }

  #[test]
  fn patch_keeps_absent_fields() {
    let current = entry(1, Tag::Fine.into());
    let patch = LogPatch { note: Some("rain".into()), ..Default::default() };
    let new = patch.apply(&current).unwrap();
    assert_eq!(new.note(), "rain");
    assert_eq!(new.tags(), current.tags);
    assert_eq!(new.observed_date(), current.observed_date);
  }

  #[test]
  fn patch_clearing_all_tags_is_rejected() {
    let current = entry(1, Tag::Fine.into());
    let patch = LogPatch { tags: Some(TagMask::EMPTY), ..Default::default() };
    assert_eq!(patch.apply(&current), Err(Error::EmptyTagMask));
  }

  #[test]
  fn patch_with_bad_date_is_rejected() {
    let current = entry(1, Tag::Fine.into());
    let patch = LogPatch {
      observed_date: Some("2014-13-01".into()),
      ..Default::default()
    };
    assert!(matches!(patch.apply(&current), Err(Error::InvalidDate { .. })));
  }

  // ── Authorization ───────────────────────────────────────────────────────

  #[test]
  fn author_may_modify() {
    assert!(entry(1, Tag::Bad.into()).authorize_modify(&user(1, 0)).is_ok());
  }

  #[test]
  fn admin_may_modify_others() {
    assert!(entry(1, Tag::Bad.into()).authorize_modify(&user(2, 1)).is_ok());
  }

  #[test]
  fn stranger_may_not_modify() {
    assert_eq!(
      entry(1, Tag::Bad.into()).authorize_modify(&user(2, 0)),
      Err(Error::NotAuthorized(7))
    );
  }

  // ── Query ───────────────────────────────────────────────────────────────

  #[test]
  fn query_defaults() {
    let q = LogQuery::from_params(None, None, None, None, None).unwrap();
    assert_eq!(q, LogQuery::default());
  }

  #[test]
  fn query_limit_is_clamped() {
    let q = LogQuery::from_params(None, None, None, Some(5000), Some(20)).unwrap();
    assert_eq!(q.limit, MAX_LIMIT);
    assert_eq!(q.offset, 20);
  }

  #[test]
  fn inverted_range_is_rejected() {
    assert_eq!(
      LogQuery::from_params(None, Some("2014-08-10"), Some("2014-08-01"), None, None),
      Err(Error::InvalidDateRange {
        from: date(2014, 8, 10),
        to:   date(2014, 8, 1),
      })
    );
  }

  #[test]
  fn malformed_range_bound_is_rejected() {
    assert!(
      LogQuery::from_params(None, Some("yesterday"), None, None, None).is_err()
    );
  }

  #[test]
  fn blank_bounds_are_ignored() {
    let q = LogQuery::from_params(Some(3), Some(""), Some("  "), None, None).unwrap();
    assert_eq!(q.from_date, None);
    assert_eq!(q.to_date, None);
    assert_eq!(q.tags.bits(), 3);
  }

  #[test]
  fn query_matches_range_inclusively() {
    let e = entry(1, Tag::Fine.into());
    let q = LogQuery::from_params(None, Some("2014-08-01"), Some("2014-08-01"), None, None)
      .unwrap();
    assert!(q.matches(&e));

    let q = LogQuery::from_params(None, Some("2014-08-02"), None, None, None).unwrap();
    assert!(!q.matches(&e));
  }

  #[test]
  fn query_matches_any_tag() {
    let e = entry(1, TagMask::from(Tag::Fine).with(Tag::NoData));
    let any = LogQuery { tags: TagMask::from(Tag::NoData).with(Tag::Bad), ..Default::default() };
    assert!(any.matches(&e));
    let none = LogQuery { tags: Tag::Bad.into(), ..Default::default() };
    assert!(!none.matches(&e));
  }
}
