//! [`SqliteStore`]: the SQLite implementation of [`DashboardStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use eor_core::{
  graph::{GraphPoint, NewGraphPoint},
  log::{LogId, LogQuery, NewLog, ObservationLog},
  store::DashboardStore,
  user::{NewUser, ProfileUpdate, User, UserId},
};

use crate::{
  Error, Result,
  encode::{
    GRAPH_COLUMNS, LOG_COLUMNS, RawGraphPoint, RawLog, RawUser, USER_COLUMNS, encode_date,
    encode_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The dashboard's own tables, backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened dashboard store");
    Ok(store)
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record a chart sample with an explicit timestamp. Backfills and tests
  /// use this; [`DashboardStore::record_graph_point`] stamps the current
  /// time.
  pub async fn record_graph_point_at(
    &self,
    point: NewGraphPoint,
    created_date: DateTime<Utc>,
  ) -> Result<GraphPoint> {
    let at_str = encode_dt(created_date);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO graph_data (
             created_date, hours_scheduled, hours_observed,
             hours_with_data, hours_with_uvfits, data_transfer_rate
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            at_str,
            point.hours_scheduled,
            point.hours_observed,
            point.hours_with_data,
            point.hours_with_uvfits,
            point.data_transfer_rate,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    let raw: RawGraphPoint = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT {GRAPH_COLUMNS} FROM graph_data WHERE id = ?1"),
          rusqlite::params![id],
          RawGraphPoint::from_row,
        )?)
      })
      .await?;

    raw.into_point()
  }

  /// Re-read a user after a write that matched `rows` rows.
  async fn user_after_write(&self, id: UserId, rows: usize) -> Result<User> {
    if rows == 0 {
      return Err(eor_core::Error::UserNotFound(id).into());
    }
    self
      .get_user(id)
      .await?
      .ok_or_else(|| eor_core::Error::UserNotFound(id).into())
  }

  /// Run an `UPDATE users ... WHERE username = ?1` and return the result.
  async fn update_by_username(
    &self,
    username: &str,
    sql: &'static str,
    value: rusqlite::types::Value,
  ) -> Result<User> {
    let name = username.to_owned();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let rows = conn.execute(sql, rusqlite::params![name, value])?;
        if rows == 0 {
          return Ok(None);
        }
        Ok(Some(conn.query_row(
          "SELECT id FROM users WHERE username = ?1",
          rusqlite::params![name],
          |r| r.get(0),
        )?))
      })
      .await?;

    let id = id.ok_or_else(|| eor_core::Error::UsernameNotFound(username.to_owned()))?;
    self.user_after_write(id, 1).await
  }
}

// ─── DashboardStore impl ─────────────────────────────────────────────────────

impl DashboardStore for SqliteStore {
  type Error = Error;

  // ── Observation logs ──────────────────────────────────────────────────────

  async fn create_log(&self, author: UserId, log: NewLog) -> Result<ObservationLog> {
    let created_str = encode_dt(Utc::now());
    let observed_str = encode_date(log.observed_date());
    let note = log.note().to_owned();
    let tags = log.tags().bits();

    let raw: RawLog = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observation_logs (
             created_date, observed_date, author_user_id, note, tags
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![created_str, observed_str, author, note, tags],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!(
            "SELECT {LOG_COLUMNS}
             FROM observation_logs l JOIN users u ON u.id = l.author_user_id
             WHERE l.id = ?1"
          ),
          rusqlite::params![id],
          RawLog::from_row,
        )?)
      })
      .await?;

    raw.into_log()
  }

  async fn get_log(&self, id: LogId) -> Result<Option<ObservationLog>> {
    let raw: Option<RawLog> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {LOG_COLUMNS}
                 FROM observation_logs l JOIN users u ON u.id = l.author_user_id
                 WHERE l.id = ?1"
              ),
              rusqlite::params![id],
              RawLog::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLog::into_log).transpose()
  }

  async fn update_log(&self, id: LogId, log: NewLog) -> Result<ObservationLog> {
    let observed_str = encode_date(log.observed_date());
    let note = log.note().to_owned();
    let tags = log.tags().bits();

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE observation_logs
           SET observed_date = ?2, note = ?3, tags = ?4
           WHERE id = ?1",
          rusqlite::params![id, observed_str, note, tags],
        )?)
      })
      .await?;

    if rows == 0 {
      return Err(eor_core::Error::LogNotFound(id).into());
    }
    self
      .get_log(id)
      .await?
      .ok_or_else(|| eor_core::Error::LogNotFound(id).into())
  }

  async fn delete_log(&self, id: LogId) -> Result<bool> {
    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM observation_logs WHERE id = ?1",
          rusqlite::params![id],
        )?)
      })
      .await?;
    Ok(rows > 0)
  }

  async fn list_logs(&self, query: &LogQuery) -> Result<Vec<ObservationLog>> {
    let tags = query.tags.bits();
    let from_str = query.from_date.map(encode_date);
    let to_str = query.to_date.map(encode_date);
    let limit_val = i64::from(query.limit);
    let offset_val = i64::from(query.offset);

    let raws: Vec<RawLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOG_COLUMNS}
           FROM observation_logs l JOIN users u ON u.id = l.author_user_id
           WHERE (?1 = 0 OR (l.tags & ?1) != 0)
             AND (?2 IS NULL OR l.observed_date >= ?2)
             AND (?3 IS NULL OR l.observed_date <= ?3)
           ORDER BY l.observed_date DESC, l.id DESC
           LIMIT ?4 OFFSET ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![tags, from_str, to_str, limit_val, offset_val],
            RawLog::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLog::into_log).collect()
  }

  async fn latest_log(&self) -> Result<Option<ObservationLog>> {
    let query = LogQuery { limit: 1, ..LogQuery::default() };
    Ok(self.list_logs(&query).await?.into_iter().next())
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, user: NewUser, password_hash: String) -> Result<User> {
    let username = user.username.clone();
    let created_str = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             username, name, email, password_hash, created_at, admin_level
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            user.username,
            user.name,
            user.email,
            password_hash,
            created_str,
            user.admin_level,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(Error::from);

    let id = match inserted {
      Ok(id) => id,
      Err(e) if e.is_unique_violation() => {
        return Err(eor_core::Error::UsernameTaken(username).into());
      }
      Err(e) => return Err(e),
    };

    self.user_after_write(id, 1).await
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
    let name = username.to_owned();

    let raw: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"
              ),
              rusqlite::params![name],
              |row| Ok((RawUser::from_row(row)?, row.get(7)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(user, hash)| user.into_user().map(|u| (u, hash)))
      .transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn set_deactivated_date(
    &self,
    id: UserId,
    deactivated_date: Option<DateTime<Utc>>,
  ) -> Result<User> {
    let date_str = deactivated_date.map(encode_dt);

    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET deactivated_date = ?2 WHERE id = ?1",
          rusqlite::params![id, date_str],
        )?)
      })
      .await?;

    self.user_after_write(id, rows).await
  }

  async fn update_profile(
    &self,
    id: UserId,
    update: ProfileUpdate,
    password_hash: Option<String>,
  ) -> Result<User> {
    let rows = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
           SET name          = COALESCE(?2, name),
               email         = COALESCE(?3, email),
               password_hash = COALESCE(?4, password_hash)
           WHERE id = ?1",
          rusqlite::params![id, update.name, update.email, password_hash],
        )?)
      })
      .await?;

    self.user_after_write(id, rows).await
  }

  async fn set_password_hash(&self, username: &str, password_hash: String) -> Result<User> {
    self
      .update_by_username(
        username,
        "UPDATE users SET password_hash = ?2 WHERE username = ?1",
        password_hash.into(),
      )
      .await
  }

  async fn set_admin_level(&self, username: &str, admin_level: i32) -> Result<User> {
    self
      .update_by_username(
        username,
        "UPDATE users SET admin_level = ?2 WHERE username = ?1",
        i64::from(admin_level).into(),
      )
      .await
  }

  // ── Chart samples ─────────────────────────────────────────────────────────

  async fn record_graph_point(&self, point: NewGraphPoint) -> Result<GraphPoint> {
    self.record_graph_point_at(point, Utc::now()).await
  }

  async fn list_graph_points(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<GraphPoint>> {
    let since_str = since.map(encode_dt);

    let raws: Vec<RawGraphPoint> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GRAPH_COLUMNS} FROM graph_data
           WHERE (?1 IS NULL OR created_date >= ?1)
           ORDER BY created_date, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![since_str], RawGraphPoint::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGraphPoint::into_point).collect()
  }
}
