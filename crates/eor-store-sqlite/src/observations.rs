//! [`SqliteObservationSource`]: the telescope schedule read from a local
//! SQLite mirror.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension as _, types::Value};

use eor_core::{
  observation::{FutureObservationCounts, Observation, utc_to_gps},
  store::ObservationSource,
};

use crate::{
  Result,
  encode::{OBSERVATION_COLUMNS, RawObservation},
  schema::OBSERVATION_SCHEMA,
};

/// Read-only view over the `mwa_setting` and `data_files` tables.
///
/// `projects` are the project ids counted as "ours" by the recent and
/// future listings; the current-observation lookup ignores them.
#[derive(Clone)]
pub struct SqliteObservationSource {
  conn:     tokio_rusqlite::Connection,
  projects: Vec<String>,
}

/// `?{first}, ?{first + 1}, ...` for `count` positional parameters.
fn placeholders(first: usize, count: usize) -> String {
  (first..first + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

impl SqliteObservationSource {
  pub async fn open(path: impl AsRef<Path>, projects: Vec<String>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let source = Self { conn, projects };
    source.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened observation database");
    Ok(source)
  }

  pub async fn open_in_memory(projects: Vec<String>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let source = Self { conn, projects };
    source.init_schema().await?;
    Ok(source)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(OBSERVATION_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Mirror maintenance ────────────────────────────────────────────────────

  /// Insert or replace one scheduled observation (GPS seconds).
  pub async fn load_observation(
    &self,
    starttime: i64,
    stoptime: i64,
    obsname: &str,
    projectid: &str,
  ) -> Result<()> {
    let obsname = obsname.to_owned();
    let projectid = projectid.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO mwa_setting (starttime, stoptime, obsname, projectid)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![starttime, stoptime, obsname, projectid],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record one archived data file for an observation.
  pub async fn load_data_file(&self, observation_num: i64, filename: &str) -> Result<()> {
    let filename = filename.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO data_files (observation_num, filename) VALUES (?1, ?2)",
          rusqlite::params![observation_num, filename],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Query helpers ─────────────────────────────────────────────────────────

  /// Run a query selecting [`OBSERVATION_COLUMNS`] with positional `params`.
  async fn query_observations(
    &self,
    sql: String,
    params: Vec<Value>,
  ) -> Result<Vec<Observation>> {
    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawObservation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawObservation::into_observation).collect())
  }

  async fn count(&self, sql: String, params: Vec<Value>) -> Result<i64> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |r| r.get(0))?)
        })
        .await?,
    )
  }

  fn project_values(&self) -> impl Iterator<Item = Value> + '_ {
    self.projects.iter().cloned().map(Value::Text)
  }
}

// ─── ObservationSource impl ──────────────────────────────────────────────────

impl ObservationSource for SqliteObservationSource {
  type Error = crate::Error;

  async fn recent_observations(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<Observation>> {
    let sql = format!(
      "SELECT {OBSERVATION_COLUMNS}
       FROM mwa_setting s
       LEFT OUTER JOIN data_files f ON f.observation_num = s.starttime
       WHERE s.starttime < ?1 AND s.projectid IN ({})
       GROUP BY s.starttime
       ORDER BY s.starttime DESC
       LIMIT ?2",
      placeholders(3, self.projects.len())
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let params = [Value::Integer(utc_to_gps(now)), Value::Integer(limit)]
      .into_iter()
      .chain(self.project_values())
      .collect();

    self.query_observations(sql, params).await
  }

  async fn future_observation_counts(
    &self,
    now: DateTime<Utc>,
  ) -> Result<FutureObservationCounts> {
    let now_gps = utc_to_gps(now);
    let horizon_gps = utc_to_gps(now + Duration::hours(24));

    let total = self
      .count(
        format!(
          "SELECT COUNT(*) FROM mwa_setting
           WHERE starttime > ?1 AND projectid IN ({})",
          placeholders(2, self.projects.len())
        ),
        std::iter::once(Value::Integer(now_gps))
          .chain(self.project_values())
          .collect(),
      )
      .await?;

    let next_24 = self
      .count(
        format!(
          "SELECT COUNT(*) FROM mwa_setting
           WHERE starttime > ?1 AND stoptime < ?2 AND projectid IN ({})",
          placeholders(3, self.projects.len())
        ),
        [Value::Integer(now_gps), Value::Integer(horizon_gps)]
          .into_iter()
          .chain(self.project_values())
          .collect(),
      )
      .await?;

    Ok(FutureObservationCounts { total, next_24 })
  }

  async fn current_observation(&self, now: DateTime<Utc>) -> Result<Option<Observation>> {
    let now_gps = utc_to_gps(now);

    let raw: Option<RawObservation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {OBSERVATION_COLUMNS}
                 FROM mwa_setting s
                 LEFT OUTER JOIN data_files f ON f.observation_num = s.starttime
                 WHERE s.starttime <= ?1 AND s.stoptime > ?1
                 GROUP BY s.starttime
                 ORDER BY s.starttime DESC
                 LIMIT 1"
              ),
              rusqlite::params![now_gps],
              RawObservation::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawObservation::into_observation))
  }

  async fn last_observations(
    &self,
    now: DateTime<Utc>,
    project: &str,
    limit: usize,
  ) -> Result<Vec<Observation>> {
    let sql = format!(
      "SELECT {OBSERVATION_COLUMNS}
       FROM mwa_setting s
       LEFT OUTER JOIN data_files f ON f.observation_num = s.starttime
       WHERE s.stoptime < ?1 AND s.projectid = ?2
       GROUP BY s.starttime
       ORDER BY s.starttime DESC
       LIMIT ?3"
    );
    let params = vec![
      Value::Integer(utc_to_gps(now)),
      Value::Text(project.to_owned()),
      Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)),
    ];

    self.query_observations(sql, params).await
  }

  async fn project_observations(&self) -> Result<Vec<Observation>> {
    let sql = format!(
      "SELECT {OBSERVATION_COLUMNS}
       FROM mwa_setting s
       LEFT OUTER JOIN data_files f ON f.observation_num = s.starttime
       WHERE s.projectid IN ({})
       GROUP BY s.starttime
       ORDER BY s.starttime ASC",
      placeholders(1, self.projects.len())
    );

    self.query_observations(sql, self.project_values().collect()).await
  }

  async fn next_observation(
    &self,
    now: DateTime<Utc>,
    project: &str,
  ) -> Result<Option<Observation>> {
    let sql = format!(
      "SELECT {OBSERVATION_COLUMNS}
       FROM mwa_setting s
       LEFT OUTER JOIN data_files f ON f.observation_num = s.starttime
       WHERE s.starttime > ?1 AND s.projectid = ?2
       GROUP BY s.starttime
       ORDER BY s.starttime ASC
       LIMIT 1"
    );
    let params = vec![Value::Integer(utc_to_gps(now)), Value::Text(project.to_owned())];

    Ok(self.query_observations(sql, params).await?.into_iter().next())
  }
}
