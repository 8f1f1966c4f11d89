//! 배치 매칭 엔진 — 전체 교차곱 평가와 멱등 기록
//!
//! [`MatchEngine`]은 자산과 취약점의 전체 스냅샷을 한 번 로드하고,
//! 모든 (자산, 취약점) 쌍에 대해 [`resolver::resolve`]를 호출한 뒤,
//! 성립한 매칭을 싱크에 한 번의 멱등 쓰기로 기록합니다.
//!
//! # 실행 흐름
//!
//! ```text
//! AssetSource ----+
//!                 +--> cross product --> resolve --> Vec<MatchRow>
//! VulnSource -----+         |                            |
//!                    PreparedVulnerability        MatchSink.replace_matches
//!                    (식별자 사전 파싱)                    |
//!                                                  MatchSummary
//! ```
//!
//! 같은 입력으로 몇 번을 다시 실행해도 저장된 행 수는 변하지 않습니다.
//! 싱크의 쓰기는 (asset_id, cve_id) 키 upsert이며, 이번 배치에 없는
//! 기존 행은 같은 쓰기 안에서 삭제됩니다.

use std::time::{Instant, SystemTime};

use tokio::sync::Mutex;
use tracing::{info, warn};

use vigil_core::error::VigilError;
use vigil_core::types::{AssetRecord, MatchReason, MatchRow, MatchSummary, VulnerabilityRecord};

use crate::cpe::Cpe;
use crate::error::MatcherError;
use crate::resolver::{self, PreparedVulnerability};

/// 자산 스냅샷 소스
pub trait AssetSource: Send + Sync {
    /// 현재 등록된 모든 자산을 로드합니다.
    async fn load_assets(&self) -> Result<Vec<AssetRecord>, VigilError>;
}

/// 취약점 스냅샷 소스
pub trait VulnerabilitySource: Send + Sync {
    /// 현재 수집된 모든 취약점을 로드합니다.
    async fn load_vulnerabilities(&self) -> Result<Vec<VulnerabilityRecord>, VigilError>;
}

/// 매칭 결과 싱크
pub trait MatchSink: Send + Sync {
    /// 매칭 결과 전체를 멱등하게 반영합니다.
    ///
    /// (asset_id, cve_id) 키 upsert로 배치를 기록하고, 이번 배치에 없는
    /// 기존 행은 삭제합니다. 전체 반영은 하나의 논리적 단위여야 합니다.
    async fn replace_matches(&self, rows: &[MatchRow]) -> Result<UpsertReport, VigilError>;
}

/// 싱크 쓰기 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertReport {
    /// 새로 삽입된 행 수
    pub inserted: usize,
    /// 갱신된 기존 행 수
    pub updated: usize,
    /// 삭제된 구식 행 수
    pub deleted_stale: usize,
}

/// 배치 매칭 엔진
///
/// 소스/싱크를 trait으로 받아 스토리지 구현과 분리되어 있습니다.
/// 테스트에서는 인메모리 구현을 주입합니다.
pub struct MatchEngine<A, V, S> {
    assets: A,
    vulnerabilities: V,
    sink: S,
    /// 동시 실행 방지 가드. 진행 중인 실행이 있으면 즉시 거부합니다.
    run_guard: Mutex<()>,
}

impl<A, V, S> MatchEngine<A, V, S>
where
    A: AssetSource,
    V: VulnerabilitySource,
    S: MatchSink,
{
    /// 엔진을 생성합니다.
    pub fn new(assets: A, vulnerabilities: V, sink: S) -> Self {
        Self {
            assets,
            vulnerabilities,
            sink,
            run_guard: Mutex::new(()),
        }
    }

    /// 전체 매칭을 실행합니다.
    ///
    /// 스냅샷 로드 → 교차곱 평가 → 멱등 기록 → 요약 반환.
    ///
    /// # 에러
    ///
    /// - 이미 실행 중이면 [`MatcherError::AlreadyRunning`]
    /// - 소스 로드 실패, 싱크 쓰기 실패는 그대로 전파됩니다.
    ///
    /// 잘못된 식별자를 가진 자산은 경고 후 건너뛰며 실행을 중단하지 않습니다.
    pub async fn run_full_matching(&self) -> Result<MatchSummary, VigilError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| MatcherError::AlreadyRunning)?;

        let started = Instant::now();
        info!("starting full matching run");

        let assets = self.assets.load_assets().await?;
        let vulnerabilities = self.vulnerabilities.load_vulnerabilities().await?;

        info!(
            assets = assets.len(),
            vulnerabilities = vulnerabilities.len(),
            "loaded matching snapshot"
        );

        // 식별자는 실행당 한 번만 파싱
        let prepared: Vec<PreparedVulnerability> = vulnerabilities
            .iter()
            .map(PreparedVulnerability::prepare)
            .collect();

        let matched_at = SystemTime::now();
        let mut summary = MatchSummary {
            total_assets: assets.len(),
            total_vulnerabilities: vulnerabilities.len(),
            ..MatchSummary::default()
        };
        let mut rows = Vec::new();

        for asset in &assets {
            let asset_cpe = match Cpe::parse(&asset.cpe) {
                Ok(cpe) => cpe,
                Err(error) => {
                    warn!(
                        asset_id = %asset.asset_id,
                        identifier = %asset.cpe,
                        error = %error,
                        "skipping asset with malformed identifier"
                    );
                    continue;
                }
            };

            for vuln in &prepared {
                if let Some(reason) = resolver::resolve(&asset_cpe, vuln) {
                    match reason {
                        MatchReason::ExactMatch => summary.exact_matches += 1,
                        MatchReason::VersionRange => summary.version_range_matches += 1,
                        MatchReason::WildcardMatch => summary.wildcard_matches += 1,
                    }
                    rows.push(MatchRow {
                        asset_id: asset.asset_id.clone(),
                        cve_id: vuln.cve_id.clone(),
                        reason,
                        matched_at,
                    });
                }
            }
        }

        summary.total_matches = rows.len();

        let report = self.sink.replace_matches(&rows).await?;
        summary.inserted = report.inserted;
        summary.updated = report.updated;
        summary.deleted_stale = report.deleted_stale;
        summary.duration = started.elapsed();

        info!(
            matches = summary.total_matches,
            exact = summary.exact_matches,
            range = summary.version_range_matches,
            wildcard = summary.wildcard_matches,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted_stale,
            duration_ms = summary.duration.as_millis() as u64,
            "full matching run complete"
        );

        Ok(summary)
    }
}
