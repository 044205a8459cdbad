//! SQL schema for the ROM SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Measurements are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS measurements (
    measurement_id TEXT PRIMARY KEY,
    subject_id     TEXT NOT NULL,
    recorded_at    TEXT NOT NULL,   -- fixed-width RFC 3339 UTC, sorts lexically
    flexion        REAL,            -- degrees; NULL when not captured
    extension      REAL,
    abduction      REAL,
    adduction      REAL
);

-- One warning per subject, day, and type. `resolved` is the only column
-- ever updated.
CREATE TABLE IF NOT EXISTS warnings (
    warning_id   TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL,
    date         TEXT NOT NULL,     -- YYYY-MM-DD
    warning_type TEXT NOT NULL,     -- WarningType label, e.g. 'Flexion Low'
    details      TEXT NOT NULL DEFAULT '',
    resolved     INTEGER NOT NULL DEFAULT 0 CHECK (resolved IN (0, 1)),
    created_at   TEXT NOT NULL,
    UNIQUE (subject_id, date, warning_type)
);

CREATE INDEX IF NOT EXISTS measurements_subject_idx
    ON measurements(subject_id, recorded_at);
CREATE INDEX IF NOT EXISTS warnings_subject_idx  ON warnings(subject_id);
CREATE INDEX IF NOT EXISTS warnings_resolved_idx ON warnings(resolved, created_at);

PRAGMA user_version = 1;
";
