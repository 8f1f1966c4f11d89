//! 버전 비교 — 관대한(tolerant) 전순서 비교와 범위 판정
//!
//! 버전 문자열을 `.`과 `-`로 분할하여 세그먼트 단위로 비교합니다.
//! 양쪽 모두 숫자인 세그먼트는 숫자로, 그 외는 사전순으로 비교하며,
//! 짧은 쪽은 `0` 세그먼트로 채워 비교합니다 (`1.2` == `1.2.0`).
//!
//! SemVer를 강제하지 않습니다. 외부 피드의 버전 표기는 제각각이라
//! 파싱 실패로 배치를 중단하는 대신 비교 가능한 범위에서 최선을 다합니다.

use std::cmp::Ordering;

use tracing::debug;
use vigil_core::types::VersionRange;

/// 두 버전 문자열의 전순서를 비교합니다.
///
/// # 비교 규칙
///
/// - `.`과 `-`로 분할한 세그먼트를 왼쪽부터 비교
/// - 양쪽 모두 숫자면 숫자 비교 (`1.9` < `1.10`)
/// - 한쪽이라도 숫자가 아니면 사전순 비교
/// - 짧은 쪽은 `0`으로 패딩 (`1.2` == `1.2.0`)
pub fn compare(a: &str, b: &str) -> Ordering {
    let segs_a: Vec<&str> = a.split(['.', '-']).collect();
    let segs_b: Vec<&str> = b.split(['.', '-']).collect();
    let len = segs_a.len().max(segs_b.len());

    for i in 0..len {
        let seg_a = segs_a.get(i).copied().unwrap_or("0");
        let seg_b = segs_b.get(i).copied().unwrap_or("0");
        let ord = compare_segment(seg_a, seg_b);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

/// 단일 세그먼트 비교 — 숫자면 숫자로, 아니면 사전순으로
fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(num_a), Ok(num_b)) => num_a.cmp(&num_b),
        _ => a.cmp(b),
    }
}

/// 주어진 버전이 범위에 포함되는지 판정합니다.
///
/// # 판정 규칙
///
/// - 경계가 하나도 없는 범위는 아무것도 매칭하지 않음 (부재로 취급)
/// - `start_including = s` → `version < s`이면 거부
/// - `start_excluding = s` → `version <= s`이면 거부
/// - `end_including = e` → `version > e`이면 거부
/// - `end_excluding = e` → `version >= e`이면 거부
/// - 지정된 경계는 전부 통과해야 함 (AND)
///
/// 해석 불가능한 경계 리터럴은 해당 경계 하나가 실패한 것으로 취급하여
/// 버전을 거부합니다. 잘못된 advisory 하나가 배치 전체를 중단시키지 않습니다.
pub fn in_range(version: &str, range: &VersionRange) -> bool {
    if range.is_unbounded() {
        return false;
    }

    if !is_parsable(version) {
        debug!(version, "rejecting unparsable asset version");
        return false;
    }

    if let Some(ref start) = range.start_including {
        if !is_parsable(start) {
            debug!(bound = %start, "unparsable startIncluding bound, rejecting");
            return false;
        }
        if compare(version, start) == Ordering::Less {
            return false;
        }
    }

    if let Some(ref start) = range.start_excluding {
        if !is_parsable(start) {
            debug!(bound = %start, "unparsable startExcluding bound, rejecting");
            return false;
        }
        if compare(version, start) != Ordering::Greater {
            return false;
        }
    }

    if let Some(ref end) = range.end_including {
        if !is_parsable(end) {
            debug!(bound = %end, "unparsable endIncluding bound, rejecting");
            return false;
        }
        if compare(version, end) == Ordering::Greater {
            return false;
        }
    }

    if let Some(ref end) = range.end_excluding {
        if !is_parsable(end) {
            debug!(bound = %end, "unparsable endExcluding bound, rejecting");
            return false;
        }
        if compare(version, end) != Ordering::Less {
            return false;
        }
    }

    true
}

/// 비교 가능한 버전 리터럴인지 확인합니다.
fn is_parsable(s: &str) -> bool {
    !s.trim().is_empty()
}
