//! 에러 타입 — 도메인별 에러 정의

/// Vigil 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 매칭 엔진 에러
    #[error("match error: {0}")]
    Match(#[from] MatchError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 매칭 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// 자산/취약점 소스 조회 실패
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// 매칭 실행이 이미 진행 중
    #[error("matching run already in progress")]
    AlreadyRunning,

    /// 매칭 결과 기록 실패
    #[error("sink write failed: {0}")]
    SinkWrite(String),
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),

    /// 스키마 초기화 실패
    #[error("migration failed: {0}")]
    Migration(String),
}
