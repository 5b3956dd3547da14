use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::tracker::{PeriodKey, Tier, TierRecord};

use super::error::StorageError;
use super::schema::init_database;
use super::{TierStore, TIER_DB_FILENAME};

const RECORD_COLUMNS: &str = "user_id, tier, used_this_period, period_limit, period_key";

/// SQLite-backed [`TierStore`].
pub struct TierDatabase {
    db_path: PathBuf,
    conn: Mutex<Connection>,
}

/// Row as SQLite hands it back, before range and tier checks.
struct StoredRow {
    user_id: String,
    tier: String,
    used_this_period: i64,
    period_limit: i64,
    period_key: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            tier: row.get(1)?,
            used_this_period: row.get(2)?,
            period_limit: row.get(3)?,
            period_key: row.get(4)?,
        })
    }
}

impl TryFrom<StoredRow> for TierRecord {
    type Error = StorageError;

    fn try_from(row: StoredRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StorageError::CorruptRecord {
            user_id: row.user_id.clone(),
            reason,
        };

        let tier = row
            .tier
            .parse::<Tier>()
            .map_err(|err| corrupt(err.to_string()))?;
        let used_this_period = u64::try_from(row.used_this_period)
            .map_err(|_| corrupt(format!("negative usage {}", row.used_this_period)))?;
        let limit = u64::try_from(row.period_limit)
            .map_err(|_| corrupt(format!("negative limit {}", row.period_limit)))?;

        Ok(TierRecord {
            tier,
            used_this_period,
            limit,
            period_key: PeriodKey::from(row.period_key),
            user_id: row.user_id,
        })
    }
}

impl TierDatabase {
    pub fn new(data_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join(TIER_DB_FILENAME);
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_database(&conn)?;

        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection poisoned".into()))
    }

    fn query_record(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<TierRecord>, StorageError> {
        conn.query_row(sql, params, StoredRow::from_row)
            .optional()?
            .map(TierRecord::try_from)
            .transpose()
    }
}

impl TierStore for TierDatabase {
    fn fetch(&self, user_id: &str) -> Result<Option<TierRecord>, StorageError> {
        let conn = self.connection()?;
        Self::query_record(
            &conn,
            &format!("SELECT {RECORD_COLUMNS} FROM user_tiers WHERE user_id = ?1"),
            params![user_id],
        )
    }

    fn insert_if_absent(&self, record: &TierRecord) -> Result<TierRecord, StorageError> {
        let used = to_sql_integer("used_this_period", record.used_this_period)?;
        let limit = to_sql_integer("limit", record.limit)?;
        let conn = self.connection()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            r#"
            INSERT INTO user_tiers (user_id, tier, used_this_period, period_limit, period_key, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT(user_id) DO NOTHING
            "#,
            params![
                record.user_id,
                record.tier.as_str(),
                used,
                limit,
                record.period_key.as_str(),
                now
            ],
        )?;

        Self::query_record(
            &conn,
            &format!("SELECT {RECORD_COLUMNS} FROM user_tiers WHERE user_id = ?1"),
            params![record.user_id],
        )?
        .ok_or_else(|| StorageError::Unavailable("inserted row not readable".into()))
    }

    fn update(&self, record: &TierRecord) -> Result<Option<TierRecord>, StorageError> {
        let used = to_sql_integer("used_this_period", record.used_this_period)?;
        let limit = to_sql_integer("limit", record.limit)?;
        let conn = self.connection()?;
        let now = Utc::now().to_rfc3339();

        Self::query_record(
            &conn,
            &format!(
                r#"
                UPDATE user_tiers SET
                    tier = ?2,
                    used_this_period = ?3,
                    period_limit = ?4,
                    period_key = ?5,
                    updated_at = ?6
                WHERE user_id = ?1
                RETURNING {RECORD_COLUMNS}
                "#
            ),
            params![
                record.user_id,
                record.tier.as_str(),
                used,
                limit,
                record.period_key.as_str(),
                now
            ],
        )
    }

    fn begin_period(
        &self,
        user_id: &str,
        period: &PeriodKey,
    ) -> Result<Option<TierRecord>, StorageError> {
        let conn = self.connection()?;
        let now = Utc::now().to_rfc3339();

        Self::query_record(
            &conn,
            &format!(
                r#"
                UPDATE user_tiers SET
                    used_this_period = 0,
                    period_key = ?2,
                    updated_at = ?3
                WHERE user_id = ?1 AND period_key <> ?2
                RETURNING {RECORD_COLUMNS}
                "#
            ),
            params![user_id, period.as_str(), now],
        )
    }

    fn increment_usage(
        &self,
        user_id: &str,
        period: &PeriodKey,
    ) -> Result<Option<TierRecord>, StorageError> {
        let conn = self.connection()?;
        let now = Utc::now().to_rfc3339();

        Self::query_record(
            &conn,
            &format!(
                r#"
                UPDATE user_tiers SET
                    used_this_period = used_this_period + 1,
                    updated_at = ?3
                WHERE user_id = ?1
                    AND period_key = ?2
                    AND used_this_period < period_limit
                RETURNING {RECORD_COLUMNS}
                "#
            ),
            params![user_id, period.as_str(), now],
        )
    }

    fn update_limit_for_tier(&self, tier: Tier, limit: u64) -> Result<usize, StorageError> {
        let limit = to_sql_integer("limit", limit)?;
        let conn = self.connection()?;
        let now = Utc::now().to_rfc3339();

        let changed = conn.execute(
            "UPDATE user_tiers SET period_limit = ?2, updated_at = ?3 WHERE tier = ?1",
            params![tier.as_str(), limit, now],
        )?;
        Ok(changed)
    }

    fn list(&self) -> Result<Vec<TierRecord>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM user_tiers ORDER BY user_id"
        ))?;

        let rows = stmt.query_map([], StoredRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(TierRecord::try_from(row?)?);
        }
        Ok(records)
    }
}

fn to_sql_integer(field: &'static str, value: u64) -> Result<i64, StorageError> {
    i64::try_from(value).map_err(|_| StorageError::ValueOutOfRange { field, value })
}
