#![doc = include_str!("../README.md")]

pub mod queries;
mod store;

pub use store::Store;

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use vigil_core::config::DatabaseConfig;
use vigil_core::error::{StorageError, VigilError};

/// SQLite 커넥션 풀을 생성합니다.
///
/// WAL 저널 모드와 busy_timeout, 외래키 강제를 적용합니다.
/// 파일이 없으면 새로 만듭니다.
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool<Sqlite>, VigilError> {
    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| VigilError::Storage(StorageError::Connection(e.to_string())))?;

    Ok(pool)
}

/// 스키마를 초기화합니다. 이미 존재하는 테이블은 건드리지 않습니다.
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<(), VigilError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS assets (
            asset_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            vendor TEXT NOT NULL,
            product TEXT NOT NULL,
            version TEXT NOT NULL,
            cpe TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (vendor, product, version)
        )",
        "CREATE TABLE IF NOT EXISTS vulnerabilities (
            cve_id TEXT PRIMARY KEY,
            severity TEXT NOT NULL,
            score REAL NOT NULL,
            identifiers TEXT NOT NULL,
            version_ranges TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS asset_vulnerability_matches (
            asset_id TEXT NOT NULL REFERENCES assets(asset_id) ON DELETE CASCADE,
            cve_id TEXT NOT NULL REFERENCES vulnerabilities(cve_id) ON DELETE CASCADE,
            match_reason TEXT NOT NULL,
            matched_at INTEGER NOT NULL,
            PRIMARY KEY (asset_id, cve_id)
        )",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| VigilError::Storage(StorageError::Migration(e.to_string())))?;
    }

    Ok(())
}
