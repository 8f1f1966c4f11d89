//! 도메인 타입 — 자산, 취약점, 매칭 결과
//!
//! 모든 크레이트가 공유하는 데이터 구조를 정의합니다.
//! 자산과 취약점은 스토어에 저장되고, 매칭 엔진이 이 타입들로 교차 비교를 수행합니다.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// 자산의 등록 경로
///
/// 자산이 어떤 입력 소스로부터 등록되었는지를 나타냅니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetProvenance {
    /// 수동 등록
    #[default]
    Manual,
    /// composer.json (PHP)
    Composer,
    /// package.json / npm 레지스트리
    Npm,
    /// Docker 이미지
    Docker,
}

impl AssetProvenance {
    /// 문자열에서 등록 경로를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Some(Self::Manual),
            "composer" => Some(Self::Composer),
            "npm" => Some(Self::Npm),
            "docker" => Some(Self::Docker),
            _ => None,
        }
    }

    /// 저장용 문자열 표현을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Composer => "composer",
            Self::Npm => "npm",
            Self::Docker => "docker",
        }
    }
}

impl fmt::Display for AssetProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 관리 대상 자산
///
/// 소프트웨어 하나를 vendor/product/version 좌표와
/// 정규화된 CPE 2.3 식별자로 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    /// 자산 ID (UUID)
    pub asset_id: String,
    /// 표시용 이름
    pub name: String,
    /// 벤더 (정규화됨)
    pub vendor: String,
    /// 제품명 (정규화됨)
    pub product: String,
    /// 버전 (정규화됨)
    pub version: String,
    /// 생성된 CPE 2.3 식별자 문자열
    pub cpe: String,
    /// 등록 경로
    pub source: AssetProvenance,
}

impl fmt::Display for AssetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{}:{}) [{}]",
            self.name, self.vendor, self.product, self.version, self.source,
        )
    }
}

/// 버전 범위
///
/// NVD 설정 노드의 네 가지 경계값을 그대로 담습니다.
/// 모든 경계는 선택적이며, 지정된 경계는 전부 AND로 결합됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionRange {
    /// 시작 경계 (포함)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_including: Option<String>,
    /// 시작 경계 (미포함)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_excluding: Option<String>,
    /// 끝 경계 (포함)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_including: Option<String>,
    /// 끝 경계 (미포함)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_excluding: Option<String>,
}

impl VersionRange {
    /// 경계가 하나도 지정되지 않았는지 확인합니다.
    pub fn is_unbounded(&self) -> bool {
        self.start_including.is_none()
            && self.start_excluding.is_none()
            && self.end_including.is_none()
            && self.end_excluding.is_none()
    }
}

/// 취약점 레코드
///
/// CVE 하나와 그 영향 범위(CPE 식별자 목록, 제품별 버전 범위)를 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityRecord {
    /// CVE ID (예: CVE-2024-1234)
    pub cve_id: String,
    /// 심각도
    pub severity: Severity,
    /// CVSS 점수
    pub score: f64,
    /// 영향받는 CPE 2.3 식별자 목록
    #[serde(default)]
    pub identifiers: Vec<String>,
    /// 제품 키 → 버전 범위 매핑
    ///
    /// 키는 `product` 또는 `vendor:product` 형태입니다.
    #[serde(default)]
    pub version_ranges: HashMap<String, VersionRange>,
}

impl fmt::Display for VulnerabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] score={} identifiers={}",
            self.cve_id,
            self.severity,
            self.score,
            self.identifiers.len(),
        )
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성 이벤트
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" | "none" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// 매칭 판정 근거
///
/// 우선순위가 높은 순서대로 정의되어 있으며, 한 (자산, 취약점) 쌍에는
/// 가장 먼저 성립한 근거 하나만 기록됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    /// CPE 비교 단위(앞 8개 토큰) 완전 일치
    ExactMatch,
    /// 버전 범위 경계 충족
    VersionRange,
    /// 와일드카드 식별자 매칭
    WildcardMatch,
}

impl MatchReason {
    /// 저장용 문자열 표현을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::VersionRange => "version_range",
            Self::WildcardMatch => "wildcard_match",
        }
    }

    /// 저장된 문자열에서 판정 근거를 복원합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exact_match" => Some(Self::ExactMatch),
            "version_range" => Some(Self::VersionRange),
            "wildcard_match" => Some(Self::WildcardMatch),
            _ => None,
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 매칭 결과 행
///
/// (자산, CVE) 쌍 하나의 판정을 나타냅니다.
/// 같은 쌍이 다시 매칭되면 기존 행이 갱신됩니다 (멱등 upsert).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRow {
    /// 자산 ID
    pub asset_id: String,
    /// CVE ID
    pub cve_id: String,
    /// 판정 근거
    pub reason: MatchReason,
    /// 매칭 시각
    pub matched_at: SystemTime,
}

/// 매칭 실행 요약
///
/// 전체 배치 실행 한 번의 통계입니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSummary {
    /// 조회된 자산 수
    pub total_assets: usize,
    /// 조회된 취약점 수
    pub total_vulnerabilities: usize,
    /// 성립한 매칭 수
    pub total_matches: usize,
    /// exact_match 판정 수
    pub exact_matches: usize,
    /// version_range 판정 수
    pub version_range_matches: usize,
    /// wildcard_match 판정 수
    pub wildcard_matches: usize,
    /// 새로 삽입된 행 수
    pub inserted: usize,
    /// 갱신된 기존 행 수
    pub updated: usize,
    /// 삭제된 구식 행 수
    pub deleted_stale: usize,
    /// 실행 소요 시간
    pub duration: Duration,
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "assets={} vulns={} matches={} (exact={} range={} wildcard={}) inserted={} updated={} deleted={} in {:?}",
            self.total_assets,
            self.total_vulnerabilities,
            self.total_matches,
            self.exact_matches,
            self.version_range_matches,
            self.wildcard_matches,
            self.inserted,
            self.updated,
            self.deleted_stale,
            self.duration,
        )
    }
}
