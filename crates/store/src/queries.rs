//! 런타임 SQL 쿼리 — 자산/취약점/매칭 결과 CRUD
//!
//! 모든 쿼리는 런타임 바인딩(`sqlx::query().bind()`)을 사용합니다.
//! 타임스탬프는 유닉스 초(i64)로 저장합니다.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::{Pool, QueryBuilder, Row, Sqlite};

use vigil_core::error::{StorageError, VigilError};
use vigil_core::types::{
    AssetProvenance, AssetRecord, MatchReason, MatchRow, Severity, VulnerabilityRecord,
};
use vigil_matcher::engine::UpsertReport;

fn query_err(e: sqlx::Error) -> VigilError {
    VigilError::Storage(StorageError::Query(e.to_string()))
}

fn json_err(e: serde_json::Error) -> VigilError {
    VigilError::Storage(StorageError::Query(format!("json column: {e}")))
}

fn to_unix(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn from_unix(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

/// 자산을 등록합니다.
///
/// (vendor, product, version) 유니크 제약 위반은 쿼리 에러로 전파됩니다.
pub async fn insert_asset(pool: &Pool<Sqlite>, asset: &AssetRecord) -> Result<(), VigilError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO assets (asset_id, name, vendor, product, version, cpe, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(&asset.asset_id)
    .bind(&asset.name)
    .bind(&asset.vendor)
    .bind(&asset.product)
    .bind(&asset.version)
    .bind(&asset.cpe)
    .bind(asset.source.as_str())
    .bind(now)
    .execute(pool)
    .await
    .map_err(query_err)?;

    Ok(())
}

/// 자산을 삭제합니다. 연관된 매칭 행은 CASCADE로 함께 삭제됩니다.
///
/// 삭제된 행이 있으면 `true`를 반환합니다.
pub async fn delete_asset(pool: &Pool<Sqlite>, asset_id: &str) -> Result<bool, VigilError> {
    let result = sqlx::query("DELETE FROM assets WHERE asset_id = ?1")
        .bind(asset_id)
        .execute(pool)
        .await
        .map_err(query_err)?;
    Ok(result.rows_affected() > 0)
}

/// 등록된 모든 자산을 조회합니다.
pub async fn list_assets(pool: &Pool<Sqlite>) -> Result<Vec<AssetRecord>, VigilError> {
    let rows = sqlx::query(
        "SELECT asset_id, name, vendor, product, version, cpe, source
         FROM assets ORDER BY vendor, product, version",
    )
    .fetch_all(pool)
    .await
    .map_err(query_err)?;

    let assets = rows
        .into_iter()
        .map(|row| {
            let source: String = row.get("source");
            AssetRecord {
                asset_id: row.get("asset_id"),
                name: row.get("name"),
                vendor: row.get("vendor"),
                product: row.get("product"),
                version: row.get("version"),
                cpe: row.get("cpe"),
                source: AssetProvenance::from_str_loose(&source).unwrap_or_default(),
            }
        })
        .collect();

    Ok(assets)
}

/// 취약점을 upsert합니다. 같은 cve_id가 있으면 내용을 갱신합니다.
pub async fn upsert_vulnerability(
    pool: &Pool<Sqlite>,
    vuln: &VulnerabilityRecord,
) -> Result<(), VigilError> {
    let identifiers = serde_json::to_string(&vuln.identifiers).map_err(json_err)?;
    let version_ranges = serde_json::to_string(&vuln.version_ranges).map_err(json_err)?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO vulnerabilities (cve_id, severity, score, identifiers, version_ranges, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(cve_id) DO UPDATE SET
             severity = excluded.severity,
             score = excluded.score,
             identifiers = excluded.identifiers,
             version_ranges = excluded.version_ranges,
             updated_at = excluded.updated_at",
    )
    .bind(&vuln.cve_id)
    .bind(vuln.severity.to_string())
    .bind(vuln.score)
    .bind(identifiers)
    .bind(version_ranges)
    .bind(now)
    .execute(pool)
    .await
    .map_err(query_err)?;

    Ok(())
}

/// 수집된 모든 취약점을 조회합니다.
pub async fn list_vulnerabilities(
    pool: &Pool<Sqlite>,
) -> Result<Vec<VulnerabilityRecord>, VigilError> {
    let rows = sqlx::query(
        "SELECT cve_id, severity, score, identifiers, version_ranges
         FROM vulnerabilities ORDER BY cve_id",
    )
    .fetch_all(pool)
    .await
    .map_err(query_err)?;

    let mut vulnerabilities = Vec::with_capacity(rows.len());
    for row in rows {
        let severity: String = row.get("severity");
        let identifiers: String = row.get("identifiers");
        let version_ranges: String = row.get("version_ranges");
        vulnerabilities.push(VulnerabilityRecord {
            cve_id: row.get("cve_id"),
            severity: Severity::from_str_loose(&severity).unwrap_or_default(),
            score: row.get("score"),
            identifiers: serde_json::from_str(&identifiers).map_err(json_err)?,
            version_ranges: serde_json::from_str(&version_ranges).map_err(json_err)?,
        });
    }

    Ok(vulnerabilities)
}

/// 저장된 모든 매칭 결과를 조회합니다.
pub async fn list_matches(pool: &Pool<Sqlite>) -> Result<Vec<MatchRow>, VigilError> {
    let rows = sqlx::query(
        "SELECT asset_id, cve_id, match_reason, matched_at
         FROM asset_vulnerability_matches ORDER BY asset_id, cve_id",
    )
    .fetch_all(pool)
    .await
    .map_err(query_err)?;

    let mut matches = Vec::with_capacity(rows.len());
    for row in rows {
        let reason: String = row.get("match_reason");
        let reason = MatchReason::from_str_loose(&reason).ok_or_else(|| {
            VigilError::Storage(StorageError::Query(format!(
                "unknown match_reason '{reason}'"
            )))
        })?;
        matches.push(MatchRow {
            asset_id: row.get("asset_id"),
            cve_id: row.get("cve_id"),
            reason,
            matched_at: from_unix(row.get("matched_at")),
        });
    }

    Ok(matches)
}

/// 매칭 결과 전체를 멱등하게 반영합니다.
///
/// 하나의 트랜잭션 안에서:
/// 1. 이번 배치에 없는 기존 행을 삭제하고
/// 2. 배치를 (asset_id, cve_id) 키 upsert로 기록합니다.
///
/// 트랜잭션이므로 전체가 커밋되거나 전체가 롤백됩니다.
pub async fn replace_matches(
    pool: &Pool<Sqlite>,
    rows: &[MatchRow],
    chunk_size: usize,
) -> Result<UpsertReport, VigilError> {
    let mut tx = pool.begin().await.map_err(query_err)?;

    let existing_rows = sqlx::query("SELECT asset_id, cve_id FROM asset_vulnerability_matches")
        .fetch_all(&mut *tx)
        .await
        .map_err(query_err)?;
    let existing: HashSet<(String, String)> = existing_rows
        .into_iter()
        .map(|row| (row.get("asset_id"), row.get("cve_id")))
        .collect();
    let incoming: HashSet<(&str, &str)> = rows
        .iter()
        .map(|r| (r.asset_id.as_str(), r.cve_id.as_str()))
        .collect();

    // 1. 구식 행 삭제
    let mut deleted_stale = 0;
    for (asset_id, cve_id) in &existing {
        if !incoming.contains(&(asset_id.as_str(), cve_id.as_str())) {
            sqlx::query(
                "DELETE FROM asset_vulnerability_matches WHERE asset_id = ?1 AND cve_id = ?2",
            )
            .bind(asset_id)
            .bind(cve_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
            deleted_stale += 1;
        }
    }

    // 2. 배치 upsert (청크 단위 multi-row insert)
    for chunk in rows.chunks(chunk_size.max(1)) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO asset_vulnerability_matches (asset_id, cve_id, match_reason, matched_at) ",
        );
        builder.push_values(chunk, |mut values, row| {
            values
                .push_bind(&row.asset_id)
                .push_bind(&row.cve_id)
                .push_bind(row.reason.as_str())
                .push_bind(to_unix(row.matched_at));
        });
        builder.push(
            " ON CONFLICT(asset_id, cve_id) DO UPDATE SET
                 match_reason = excluded.match_reason,
                 matched_at = excluded.matched_at",
        );
        builder.build().execute(&mut *tx).await.map_err(query_err)?;
    }

    tx.commit().await.map_err(query_err)?;

    let updated = incoming
        .iter()
        .filter(|(asset_id, cve_id)| {
            existing.contains(&((*asset_id).to_owned(), (*cve_id).to_owned()))
        })
        .count();

    Ok(UpsertReport {
        inserted: incoming.len() - updated,
        updated,
        deleted_stale,
    })
}
