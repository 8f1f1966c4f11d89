//! 매칭 엔진 에러 타입
//!
//! [`MatcherError`]는 매칭 크레이트가 직접 만드는 에러를 나타냅니다.
//! `From<MatcherError> for VigilError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! 식별자 파싱 실패는 데이터 품질 노이즈로 취급되어 호출부에서 국소적으로
//! 복구됩니다. 해석 불가능한 버전 경계는 에러 없이 해당 경계가 실패한 것으로
//! 처리되고, 소스 조회/결과 기록 실패는 소스/싱크 구현이
//! [`vigil_core::error::MatchError`]와 `StorageError`로 직접 보고합니다.

use vigil_core::error::{MatchError, VigilError};

/// 매칭 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// CPE 식별자 파싱 실패
    #[error("malformed identifier '{identifier}': {reason}")]
    MalformedIdentifier {
        /// 파싱 대상 식별자 문자열
        identifier: String,
        /// 실패 사유
        reason: String,
    },

    /// 매칭 실행이 이미 진행 중
    #[error("matching run already in progress")]
    AlreadyRunning,
}

impl From<MatcherError> for VigilError {
    fn from(err: MatcherError) -> Self {
        match err {
            MatcherError::MalformedIdentifier { identifier, reason } => VigilError::Match(
                MatchError::SourceUnavailable(format!(
                    "malformed identifier '{identifier}': {reason}"
                )),
            ),
            MatcherError::AlreadyRunning => VigilError::Match(MatchError::AlreadyRunning),
        }
    }
}
