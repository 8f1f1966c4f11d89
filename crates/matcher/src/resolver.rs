//! 매칭 판정 — 단일 (자산, 취약점) 쌍의 판정 로직
//!
//! 상태 없는 순수 판정 함수입니다. 고정된 우선순위로 세 가지 검사를
//! 순서대로 시도하며, 먼저 성립하는 근거에서 단락(short-circuit)합니다:
//!
//! 1. exact — 비교 단위(앞 8개 토큰) 완전 일치
//! 2. version_range — 제품 키로 찾은 범위 경계 충족
//! 3. wildcard — part/vendor/product 일치 + 와일드카드 꼬리
//!
//! 취약점 레코드의 식별자는 [`PreparedVulnerability::prepare`]에서 실행당
//! 한 번만 파싱됩니다. 잘못된 식별자는 그 하나만 건너뛰고 나머지 유효한
//! 식별자로 계속 매칭합니다.

use std::collections::HashMap;

use tracing::debug;
use vigil_core::types::{MatchReason, VersionRange, VulnerabilityRecord};

use crate::cpe::Cpe;
use crate::version;

/// 매칭 준비가 끝난 취약점
///
/// 식별자 문자열을 미리 파싱해 두어 교차곱 평가 중 반복 파싱을 피합니다.
#[derive(Debug, Clone)]
pub struct PreparedVulnerability {
    /// CVE ID
    pub cve_id: String,
    /// 파싱에 성공한 식별자들 (잘못된 항목은 제외됨)
    pub identifiers: Vec<Cpe>,
    /// 제품 키 → 버전 범위
    pub version_ranges: HashMap<String, VersionRange>,
}

impl PreparedVulnerability {
    /// 취약점 레코드를 매칭용으로 준비합니다.
    ///
    /// 파싱에 실패한 식별자는 diagnostic 레벨로 기록하고 건너뜁니다.
    /// 손상된 피드 항목 하나가 같은 취약점의 나머지 유효한 식별자 매칭을
    /// 막아서는 안 됩니다.
    pub fn prepare(record: &VulnerabilityRecord) -> Self {
        let mut identifiers = Vec::with_capacity(record.identifiers.len());
        for text in &record.identifiers {
            match Cpe::parse(text) {
                Ok(cpe) => identifiers.push(cpe),
                Err(error) => debug!(
                    cve_id = %record.cve_id,
                    identifier = %text,
                    error = %error,
                    "skipping malformed vulnerability identifier"
                ),
            }
        }
        Self {
            cve_id: record.cve_id.clone(),
            identifiers,
            version_ranges: record.version_ranges.clone(),
        }
    }
}

/// 자산 하나와 취약점 하나의 매칭 여부를 판정합니다.
///
/// 성립하지 않으면 `None`을 반환합니다. 불일치는 에러가 아니라 부재입니다.
pub fn resolve(asset: &Cpe, vuln: &PreparedVulnerability) -> Option<MatchReason> {
    // 1. exact (최우선)
    if vuln
        .identifiers
        .iter()
        .any(|vuln_cpe| vuln_cpe.comparison_prefix() == asset.comparison_prefix())
    {
        return Some(MatchReason::ExactMatch);
    }

    // 2. version range — 제품명 키, 폴백으로 vendor:product 키
    if let Some(range) = lookup_range(asset, &vuln.version_ranges)
        && version::in_range(&asset.version, range)
    {
        return Some(MatchReason::VersionRange);
    }

    // 3. wildcard (최하위)
    if vuln.identifiers.iter().any(|vuln_cpe| {
        vuln_cpe.part == asset.part
            && vuln_cpe.vendor == asset.vendor
            && vuln_cpe.product == asset.product
            && vuln_cpe.is_wildcard_tail()
    }) {
        return Some(MatchReason::WildcardMatch);
    }

    None
}

/// 자산의 제품 키로 버전 범위를 찾습니다.
///
/// `product` 키를 먼저 보고, 없으면 `vendor:product` 키로 폴백합니다.
fn lookup_range<'a>(
    asset: &Cpe,
    ranges: &'a HashMap<String, VersionRange>,
) -> Option<&'a VersionRange> {
    if ranges.is_empty() {
        return None;
    }
    ranges
        .get(&asset.product)
        .or_else(|| ranges.get(&format!("{}:{}", asset.vendor, asset.product)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::types::Severity;

    fn vuln(identifiers: Vec<&str>, ranges: HashMap<String, VersionRange>) -> PreparedVulnerability {
        PreparedVulnerability::prepare(&VulnerabilityRecord {
            cve_id: "CVE-2024-0001".to_owned(),
            severity: Severity::High,
            score: 8.1,
            identifiers: identifiers.into_iter().map(str::to_owned).collect(),
            version_ranges: ranges,
        })
    }

    fn asset() -> Cpe {
        Cpe::parse("cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*").unwrap()
    }

    fn nginx_range() -> HashMap<String, VersionRange> {
        let mut ranges = HashMap::new();
        ranges.insert(
            "nginx".to_owned(),
            VersionRange {
                start_including: Some("1.25.0".to_owned()),
                end_excluding: Some("1.25.4".to_owned()),
                ..VersionRange::default()
            },
        );
        ranges
    }

    #[test]
    fn exact_match_on_comparison_prefix() {
        let v = vuln(
            vec!["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
            HashMap::new(),
        );
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::ExactMatch));
    }

    #[test]
    fn exact_match_ignores_fields_beyond_edition() {
        // 9번째 이후 필드가 달라도 비교 단위(앞 8개)만 같으면 exact
        let v = vuln(
            vec!["cpe:2.3:a:nginx:nginx:1.25.3:*:*:ko:*:linux:x64"],
            HashMap::new(),
        );
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::ExactMatch));
    }

    #[test]
    fn different_version_is_not_exact() {
        let v = vuln(
            vec!["cpe:2.3:a:nginx:nginx:1.25.4:*:*:*:*:*:*:*"],
            HashMap::new(),
        );
        assert_eq!(resolve(&asset(), &v), None);
    }

    #[test]
    fn version_range_match_by_product_key() {
        let v = vuln(vec![], nginx_range());
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::VersionRange));
    }

    #[test]
    fn version_range_match_by_vendor_product_fallback_key() {
        let mut ranges = HashMap::new();
        ranges.insert(
            "nginx:nginx".to_owned(),
            VersionRange {
                start_including: Some("1.0.0".to_owned()),
                ..VersionRange::default()
            },
        );
        let v = vuln(vec![], ranges);
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::VersionRange));
    }

    #[test]
    fn version_outside_range_no_match() {
        let mut ranges = HashMap::new();
        ranges.insert(
            "nginx".to_owned(),
            VersionRange {
                start_including: Some("1.26.0".to_owned()),
                ..VersionRange::default()
            },
        );
        let v = vuln(vec![], ranges);
        assert_eq!(resolve(&asset(), &v), None);
    }

    #[test]
    fn range_for_other_product_no_match() {
        let mut ranges = HashMap::new();
        ranges.insert(
            "httpd".to_owned(),
            VersionRange {
                start_including: Some("1.0.0".to_owned()),
                ..VersionRange::default()
            },
        );
        let v = vuln(vec![], ranges);
        assert_eq!(resolve(&asset(), &v), None);
    }

    #[test]
    fn wildcard_match_on_product() {
        let v = vuln(
            vec!["cpe:2.3:a:nginx:nginx:*:*:*:*:*:*:*:*"],
            HashMap::new(),
        );
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::WildcardMatch));
    }

    #[test]
    fn wildcard_requires_matching_product() {
        let v = vuln(
            vec!["cpe:2.3:a:nginx:other:*:*:*:*:*:*:*:*"],
            HashMap::new(),
        );
        assert_eq!(resolve(&asset(), &v), None);
    }

    #[test]
    fn wildcard_requires_matching_part() {
        let v = vuln(
            vec!["cpe:2.3:o:nginx:nginx:*:*:*:*:*:*:*:*"],
            HashMap::new(),
        );
        assert_eq!(resolve(&asset(), &v), None);
    }

    #[test]
    fn exact_wins_over_version_range() {
        let v = vuln(
            vec!["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
            nginx_range(),
        );
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::ExactMatch));
    }

    #[test]
    fn version_range_wins_over_wildcard() {
        let v = vuln(
            vec!["cpe:2.3:a:nginx:nginx:*:*:*:*:*:*:*:*"],
            nginx_range(),
        );
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::VersionRange));
    }

    #[test]
    fn malformed_identifier_skipped_valid_ones_still_match() {
        let v = vuln(
            vec![
                "not-a-cpe",
                "cpe:2.3:x:bad:part:1.0:*:*:*:*:*:*:*",
                "cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*",
            ],
            HashMap::new(),
        );
        assert_eq!(v.identifiers.len(), 1);
        assert_eq!(resolve(&asset(), &v), Some(MatchReason::ExactMatch));
    }

    #[test]
    fn no_identifiers_no_ranges_no_match() {
        let v = vuln(vec![], HashMap::new());
        assert_eq!(resolve(&asset(), &v), None);
    }
}
