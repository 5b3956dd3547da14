use rusqlite::Connection;

use super::StorageError;

pub const USER_TIERS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS user_tiers (
    user_id TEXT PRIMARY KEY,
    tier TEXT NOT NULL CHECK (tier IN ('free', 'premium')),
    used_this_period INTEGER NOT NULL DEFAULT 0,
    period_limit INTEGER NOT NULL,
    period_key TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub const USER_TIERS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_user_tiers_tier ON user_tiers(tier);
"#;

pub fn init_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(USER_TIERS_TABLE_SCHEMA)?;
    conn.execute_batch(USER_TIERS_INDEXES)?;
    Ok(())
}
