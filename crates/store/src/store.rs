//! [`Store`] — 매칭 엔진의 소스/싱크 trait을 구현하는 스토리지 핸들

use sqlx::{Pool, Sqlite};

use vigil_core::error::VigilError;
use vigil_core::types::{AssetRecord, MatchRow, VulnerabilityRecord};
use vigil_matcher::engine::{AssetSource, MatchSink, UpsertReport, VulnerabilitySource};

use crate::queries;

/// 스토리지 핸들
///
/// 커넥션 풀을 감싸는 얇은 핸들입니다. `Clone`이 저렴하므로 매칭 엔진의
/// 소스/싱크 세 자리에 복제하여 주입합니다.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
    /// 매칭 결과 upsert 배치 크기
    chunk_size: usize,
}

impl Store {
    /// 스토리지 핸들을 만듭니다.
    pub fn new(pool: Pool<Sqlite>, chunk_size: usize) -> Self {
        Self { pool, chunk_size }
    }

    /// 내부 커넥션 풀에 접근합니다.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// 자산을 등록합니다.
    pub async fn add_asset(&self, asset: &AssetRecord) -> Result<(), VigilError> {
        queries::insert_asset(&self.pool, asset).await
    }

    /// 자산을 삭제합니다. 연관 매칭 행은 CASCADE로 삭제됩니다.
    pub async fn remove_asset(&self, asset_id: &str) -> Result<bool, VigilError> {
        queries::delete_asset(&self.pool, asset_id).await
    }

    /// 등록된 자산 전체를 조회합니다.
    pub async fn assets(&self) -> Result<Vec<AssetRecord>, VigilError> {
        queries::list_assets(&self.pool).await
    }

    /// 취약점을 upsert합니다.
    pub async fn upsert_vulnerability(&self, vuln: &VulnerabilityRecord) -> Result<(), VigilError> {
        queries::upsert_vulnerability(&self.pool, vuln).await
    }

    /// 수집된 취약점 전체를 조회합니다.
    pub async fn vulnerabilities(&self) -> Result<Vec<VulnerabilityRecord>, VigilError> {
        queries::list_vulnerabilities(&self.pool).await
    }

    /// 저장된 매칭 결과 전체를 조회합니다.
    pub async fn matches(&self) -> Result<Vec<MatchRow>, VigilError> {
        queries::list_matches(&self.pool).await
    }
}

impl AssetSource for Store {
    async fn load_assets(&self) -> Result<Vec<AssetRecord>, VigilError> {
        queries::list_assets(&self.pool).await
    }
}

impl VulnerabilitySource for Store {
    async fn load_vulnerabilities(&self) -> Result<Vec<VulnerabilityRecord>, VigilError> {
        queries::list_vulnerabilities(&self.pool).await
    }
}

impl MatchSink for Store {
    async fn replace_matches(&self, rows: &[MatchRow]) -> Result<UpsertReport, VigilError> {
        queries::replace_matches(&self.pool, rows, self.chunk_size).await
    }
}
