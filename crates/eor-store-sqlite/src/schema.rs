//! SQL schemas.
//!
//! Both are idempotent thanks to `CREATE TABLE IF NOT EXISTS` and run once
//! per connection at startup.

/// Tables owned by the dashboard.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    username         TEXT    NOT NULL UNIQUE,
    name             TEXT    NOT NULL,
    email            TEXT    NOT NULL,
    password_hash    TEXT    NOT NULL,   -- argon2 PHC string
    created_at       TEXT    NOT NULL,
    deactivated_date TEXT,               -- NULL while active
    admin_level      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS observation_logs (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    created_date   TEXT    NOT NULL,
    observed_date  TEXT    NOT NULL,     -- YYYY-MM-DD, sorts lexically
    author_user_id INTEGER NOT NULL REFERENCES users(id),
    note           TEXT    NOT NULL DEFAULT '',
    tags           INTEGER NOT NULL      -- tag bitmask
);

CREATE TABLE IF NOT EXISTS graph_data (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    created_date       TEXT NOT NULL,
    hours_scheduled    REAL NOT NULL DEFAULT 0,
    hours_observed     REAL NOT NULL DEFAULT 0,
    hours_with_data    REAL NOT NULL DEFAULT 0,
    hours_with_uvfits  REAL NOT NULL DEFAULT 0,
    data_transfer_rate REAL NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS logs_observed_idx ON observation_logs(observed_date, id);
CREATE INDEX IF NOT EXISTS graph_created_idx ON graph_data(created_date);

PRAGMA user_version = 1;
";

/// The subset of the telescope schedule this service reads. Times are GPS
/// seconds; an observation is identified by its start second.
pub const OBSERVATION_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS mwa_setting (
    starttime INTEGER PRIMARY KEY,
    stoptime  INTEGER NOT NULL,
    obsname   TEXT    NOT NULL,
    projectid TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS data_files (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    observation_num INTEGER NOT NULL,
    filename        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS data_files_obs_idx ON data_files(observation_num);
";
