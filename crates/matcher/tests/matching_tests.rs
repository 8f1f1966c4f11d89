//! 매칭 엔진 통합 테스트
//!
//! 인메모리 소스/싱크로 엔진 전체 흐름을 검증합니다.
//! 결정성, 멱등성, 우선순위, 와일드카드 범위, 손상 허용을 다룹니다.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use vigil_core::error::{MatchError, VigilError};
use vigil_core::types::{
    AssetProvenance, AssetRecord, MatchReason, MatchRow, Severity, VersionRange,
    VulnerabilityRecord,
};
use vigil_matcher::engine::{AssetSource, MatchEngine, MatchSink, UpsertReport, VulnerabilitySource};
use vigil_matcher::generator::CpeGenerator;

/// 인메모리 스토어 — 소스와 싱크를 겸합니다.
#[derive(Default)]
struct MemoryStore {
    assets: Vec<AssetRecord>,
    vulnerabilities: Vec<VulnerabilityRecord>,
    matches: Mutex<HashMap<(String, String), MatchRow>>,
    fail_source: bool,
}

impl MemoryStore {
    fn match_count(&self) -> usize {
        self.matches.lock().unwrap().len()
    }

    fn reason_for(&self, asset_id: &str, cve_id: &str) -> Option<MatchReason> {
        self.matches
            .lock()
            .unwrap()
            .get(&(asset_id.to_owned(), cve_id.to_owned()))
            .map(|row| row.reason)
    }
}

impl AssetSource for &MemoryStore {
    async fn load_assets(&self) -> Result<Vec<AssetRecord>, VigilError> {
        if self.fail_source {
            return Err(MatchError::SourceUnavailable("asset registry down".to_owned()).into());
        }
        Ok(self.assets.clone())
    }
}

impl VulnerabilitySource for &MemoryStore {
    async fn load_vulnerabilities(&self) -> Result<Vec<VulnerabilityRecord>, VigilError> {
        Ok(self.vulnerabilities.clone())
    }
}

impl MatchSink for &MemoryStore {
    async fn replace_matches(&self, rows: &[MatchRow]) -> Result<UpsertReport, VigilError> {
        let mut stored = self.matches.lock().unwrap();
        let incoming: HashSet<(String, String)> = rows
            .iter()
            .map(|r| (r.asset_id.clone(), r.cve_id.clone()))
            .collect();

        let before = stored.len();
        stored.retain(|key, _| incoming.contains(key));
        let deleted_stale = before - stored.len();

        let mut report = UpsertReport {
            deleted_stale,
            ..UpsertReport::default()
        };
        for row in rows {
            let key = (row.asset_id.clone(), row.cve_id.clone());
            if stored.insert(key, row.clone()).is_some() {
                report.updated += 1;
            } else {
                report.inserted += 1;
            }
        }
        Ok(report)
    }
}

fn asset(id: &str, vendor: &str, product: &str, version: &str) -> AssetRecord {
    let generator = CpeGenerator::new();
    let cpe = generator.from_manual(vendor, product, version);
    AssetRecord {
        asset_id: id.to_owned(),
        name: product.to_owned(),
        vendor: vendor.to_owned(),
        product: product.to_owned(),
        version: version.to_owned(),
        cpe: cpe.to_string(),
        source: AssetProvenance::Manual,
    }
}

fn vuln(cve_id: &str, identifiers: &[&str]) -> VulnerabilityRecord {
    VulnerabilityRecord {
        cve_id: cve_id.to_owned(),
        severity: Severity::High,
        score: 7.5,
        identifiers: identifiers.iter().map(|s| (*s).to_owned()).collect(),
        version_ranges: HashMap::new(),
    }
}

fn vuln_with_range(cve_id: &str, product_key: &str, range: VersionRange) -> VulnerabilityRecord {
    let mut ranges = HashMap::new();
    ranges.insert(product_key.to_owned(), range);
    VulnerabilityRecord {
        cve_id: cve_id.to_owned(),
        severity: Severity::Medium,
        score: 5.0,
        identifiers: vec![],
        version_ranges: ranges,
    }
}

fn engine(store: &MemoryStore) -> MatchEngine<&MemoryStore, &MemoryStore, &MemoryStore> {
    MatchEngine::new(store, store, store)
}

#[tokio::test]
async fn end_to_end_single_exact_match() {
    let store = MemoryStore {
        assets: vec![asset("a-1", "nginx", "nginx", "1.25.3")],
        vulnerabilities: vec![vuln(
            "CVE-2024-0001",
            &["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
        )],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();

    assert_eq!(summary.total_matches, 1);
    assert_eq!(summary.exact_matches, 1);
    assert_eq!(summary.version_range_matches, 0);
    assert_eq!(summary.wildcard_matches, 0);
    assert_eq!(
        store.reason_for("a-1", "CVE-2024-0001"),
        Some(MatchReason::ExactMatch)
    );
}

#[tokio::test]
async fn two_runs_produce_identical_summaries() {
    let store = MemoryStore {
        assets: vec![
            asset("a-1", "nginx", "nginx", "1.25.3"),
            asset("a-2", "postgresql", "postgres", "15.2"),
        ],
        vulnerabilities: vec![
            vuln(
                "CVE-2024-0001",
                &["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
            ),
            vuln(
                "CVE-2024-0002",
                &["cpe:2.3:a:postgresql:postgres:*:*:*:*:*:*:*:*"],
            ),
        ],
        ..MemoryStore::default()
    };
    let engine = engine(&store);

    let first = engine.run_full_matching().await.unwrap();
    let second = engine.run_full_matching().await.unwrap();

    assert_eq!(first.total_matches, second.total_matches);
    assert_eq!(first.exact_matches, second.exact_matches);
    assert_eq!(first.wildcard_matches, second.wildcard_matches);
    assert_eq!(store.match_count(), 2);
}

#[tokio::test]
async fn three_runs_keep_stable_row_count() {
    let store = MemoryStore {
        assets: vec![asset("a-1", "nginx", "nginx", "1.25.3")],
        vulnerabilities: vec![vuln(
            "CVE-2024-0001",
            &["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
        )],
        ..MemoryStore::default()
    };
    let engine = engine(&store);

    for _ in 0..3 {
        engine.run_full_matching().await.unwrap();
        assert_eq!(store.match_count(), 1);
    }
}

#[tokio::test]
async fn exact_takes_priority_over_version_range() {
    let mut vulnerability = vuln(
        "CVE-2024-0003",
        &["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
    );
    vulnerability.version_ranges.insert(
        "nginx".to_owned(),
        VersionRange {
            start_including: Some("1.25.0".to_owned()),
            end_excluding: Some("1.25.4".to_owned()),
            ..VersionRange::default()
        },
    );

    let store = MemoryStore {
        assets: vec![asset("a-1", "nginx", "nginx", "1.25.3")],
        vulnerabilities: vec![vulnerability],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();
    assert_eq!(summary.exact_matches, 1);
    assert_eq!(summary.version_range_matches, 0);
    assert_eq!(
        store.reason_for("a-1", "CVE-2024-0003"),
        Some(MatchReason::ExactMatch)
    );
}

#[tokio::test]
async fn version_range_boundaries() {
    let range = VersionRange {
        start_including: Some("1.25.0".to_owned()),
        end_excluding: Some("1.25.4".to_owned()),
        ..VersionRange::default()
    };
    let store = MemoryStore {
        assets: vec![
            asset("a-floor", "nginx", "nginx", "1.25.0"),
            asset("a-mid", "nginx", "nginx", "1.25.3"),
            asset("a-below", "nginx", "nginx", "1.24.9"),
            asset("a-ceiling", "nginx", "nginx", "1.25.4"),
        ],
        vulnerabilities: vec![vuln_with_range("CVE-2024-0004", "nginx", range)],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();

    assert_eq!(summary.total_matches, 2);
    assert!(store.reason_for("a-floor", "CVE-2024-0004").is_some());
    assert!(store.reason_for("a-mid", "CVE-2024-0004").is_some());
    assert!(store.reason_for("a-below", "CVE-2024-0004").is_none());
    assert!(store.reason_for("a-ceiling", "CVE-2024-0004").is_none());
}

#[tokio::test]
async fn wildcard_scoped_to_same_product() {
    let store = MemoryStore {
        assets: vec![asset("a-1", "nginx", "nginx", "1.25.3")],
        vulnerabilities: vec![
            vuln(
                "CVE-2024-0005",
                &["cpe:2.3:a:nginx:nginx:*:*:*:*:*:*:*:*"],
            ),
            vuln(
                "CVE-2024-0006",
                &["cpe:2.3:a:nginx:other:*:*:*:*:*:*:*:*"],
            ),
        ],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();

    assert_eq!(summary.total_matches, 1);
    assert_eq!(summary.wildcard_matches, 1);
    assert_eq!(
        store.reason_for("a-1", "CVE-2024-0005"),
        Some(MatchReason::WildcardMatch)
    );
    assert!(store.reason_for("a-1", "CVE-2024-0006").is_none());
}

#[tokio::test]
async fn malformed_identifier_does_not_suppress_valid_ones() {
    let store = MemoryStore {
        assets: vec![asset("a-1", "nginx", "nginx", "1.25.3")],
        vulnerabilities: vec![vuln(
            "CVE-2024-0007",
            &[
                "garbage",
                "cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*",
                "cpe:2.3:a:nginx:nginx:*:*:*:*:*:*:*:*",
            ],
        )],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();
    assert_eq!(summary.total_matches, 1);
    assert_eq!(summary.exact_matches, 1);
}

#[tokio::test]
async fn cross_product_evaluates_all_pairs() {
    let store = MemoryStore {
        assets: vec![
            asset("a-1", "nginx", "nginx", "1.25.3"),
            asset("a-2", "expressjs", "express", "4.18.2"),
        ],
        vulnerabilities: vec![
            vuln(
                "CVE-2024-0008",
                &["cpe:2.3:a:nginx:nginx:*:*:*:*:*:*:*:*"],
            ),
            vuln(
                "CVE-2024-0009",
                &["cpe:2.3:a:expressjs:express:4.18.2:*:*:*:*:*:*:*"],
            ),
        ],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();

    assert_eq!(summary.total_assets, 2);
    assert_eq!(summary.total_vulnerabilities, 2);
    assert_eq!(summary.total_matches, 2);
    assert!(store.reason_for("a-1", "CVE-2024-0008").is_some());
    assert!(store.reason_for("a-2", "CVE-2024-0009").is_some());
    assert!(store.reason_for("a-1", "CVE-2024-0009").is_none());
    assert!(store.reason_for("a-2", "CVE-2024-0008").is_none());
}

#[tokio::test]
async fn source_failure_is_fatal_to_the_run() {
    let store = MemoryStore {
        fail_source: true,
        ..MemoryStore::default()
    };

    let result = engine(&store).run_full_matching().await;
    assert!(matches!(
        result,
        Err(VigilError::Match(MatchError::SourceUnavailable(_)))
    ));
    assert_eq!(store.match_count(), 0);
}

#[tokio::test]
async fn generated_assets_match_feed_identifiers() {
    // 생성기가 만든 식별자와 피드 식별자가 exact로 비교 가능해야 합니다.
    let generator = CpeGenerator::new();
    let docker_cpe = generator.from_docker("nginx", "1.25.3-alpine");

    let store = MemoryStore {
        assets: vec![AssetRecord {
            asset_id: "a-docker".to_owned(),
            name: "nginx".to_owned(),
            vendor: docker_cpe.vendor.clone(),
            product: docker_cpe.product.clone(),
            version: docker_cpe.version.clone(),
            cpe: docker_cpe.to_string(),
            source: AssetProvenance::Docker,
        }],
        vulnerabilities: vec![vuln(
            "CVE-2024-0010",
            &["cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*"],
        )],
        ..MemoryStore::default()
    };

    let summary = engine(&store).run_full_matching().await.unwrap();
    assert_eq!(summary.exact_matches, 1);
}
