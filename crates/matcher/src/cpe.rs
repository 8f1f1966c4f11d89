//! CPE 2.3 식별자 — 파싱, 직렬화, 비교 단위 추출
//!
//! CPE 2.3 식별자는 콜론으로 구분된 12개 필드로 직렬화됩니다:
//!
//! ```text
//! cpe:2.3:part:vendor:product:version:update:edition:language:sw_edition:target_sw:target_hw
//! ```
//!
//! 매칭에 사용되는 비교 단위는 앞 8개 토큰(edition까지)입니다.
//! 8개 이상의 토큰만 있으면 나머지 꼬리 필드는 와일드카드(`*`)로 채워 파싱을
//! 허용합니다. 외부 피드의 식별자가 꼬리를 생략하는 경우가 흔하기 때문입니다.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MatcherError;

/// 와일드카드 토큰
pub const WILDCARD: &str = "*";

/// CPE part 필드 — 식별 대상의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpePart {
    /// 애플리케이션 (`a`)
    Application,
    /// 운영체제 (`o`)
    OperatingSystem,
    /// 하드웨어 (`h`)
    Hardware,
}

impl CpePart {
    /// 단일 문자 코드를 반환합니다.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Application => "a",
            Self::OperatingSystem => "o",
            Self::Hardware => "h",
        }
    }

    /// 단일 문자 코드에서 part를 파싱합니다.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::Application),
            "o" => Some(Self::OperatingSystem),
            "h" => Some(Self::Hardware),
            _ => None,
        }
    }
}

impl fmt::Display for CpePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// CPE 2.3 식별자
///
/// 한 번 만들어지면 변경하지 않는 값 타입입니다. 자산 등록 시 또는 취약점
/// 피드 수집 시 한 번 생성/파싱되고 이후에는 읽기만 합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cpe {
    /// 식별 대상 종류
    pub part: CpePart,
    /// 벤더
    pub vendor: String,
    /// 제품명
    pub product: String,
    /// 버전 (`*`는 모든 버전)
    pub version: String,
    /// 업데이트
    pub update: String,
    /// 에디션
    pub edition: String,
    /// 언어
    pub language: String,
    /// 소프트웨어 에디션
    pub sw_edition: String,
    /// 대상 소프트웨어
    pub target_sw: String,
    /// 대상 하드웨어
    pub target_hw: String,
}

impl Cpe {
    /// 애플리케이션 식별자를 생성합니다. 나머지 필드는 전부 와일드카드입니다.
    pub fn application(vendor: impl Into<String>, product: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            part: CpePart::Application,
            vendor: vendor.into(),
            product: product.into(),
            version: version.into(),
            update: WILDCARD.to_owned(),
            edition: WILDCARD.to_owned(),
            language: WILDCARD.to_owned(),
            sw_edition: WILDCARD.to_owned(),
            target_sw: WILDCARD.to_owned(),
            target_hw: WILDCARD.to_owned(),
        }
    }

    /// CPE 2.3 문자열을 파싱합니다.
    ///
    /// # 에러
    ///
    /// - 접두사가 `cpe:2.3`이 아니면 [`MatcherError::MalformedIdentifier`]
    /// - 토큰이 8개 미만이면 [`MatcherError::MalformedIdentifier`]
    /// - part 코드가 `a`/`o`/`h`가 아니면 [`MatcherError::MalformedIdentifier`]
    ///
    /// 8번째 이후의 꼬리 필드가 생략된 경우 와일드카드로 채웁니다.
    pub fn parse(text: &str) -> Result<Self, MatcherError> {
        let tokens: Vec<&str> = text.split(':').collect();

        if tokens.len() < 8 {
            return Err(MatcherError::MalformedIdentifier {
                identifier: text.to_owned(),
                reason: format!("expected at least 8 fields, got {}", tokens.len()),
            });
        }

        if tokens[0] != "cpe" || tokens[1] != "2.3" {
            return Err(MatcherError::MalformedIdentifier {
                identifier: text.to_owned(),
                reason: "unsupported prefix (expected 'cpe:2.3')".to_owned(),
            });
        }

        let part = CpePart::from_code(tokens[2]).ok_or_else(|| MatcherError::MalformedIdentifier {
            identifier: text.to_owned(),
            reason: format!("unknown part code '{}'", tokens[2]),
        })?;

        // 생략된 꼬리 필드는 와일드카드로 간주
        let field = |idx: usize| tokens.get(idx).copied().unwrap_or(WILDCARD).to_owned();

        Ok(Self {
            part,
            vendor: field(3),
            product: field(4),
            version: field(5),
            update: field(6),
            edition: field(7),
            language: field(8),
            sw_edition: field(9),
            target_sw: field(10),
            target_hw: field(11),
        })
    }

    /// 비교 단위 — 앞 8개 토큰을 반환합니다.
    ///
    /// exact 매칭은 이 8개 토큰의 필드별 동등성으로 판정합니다.
    pub fn comparison_prefix(&self) -> [&str; 8] {
        [
            "cpe",
            "2.3",
            self.part.code(),
            &self.vendor,
            &self.product,
            &self.version,
            &self.update,
            &self.edition,
        ]
    }

    /// product 이후의 모든 필드가 와일드카드인지 확인합니다.
    ///
    /// 와일드카드 매칭("이 제품의 모든 버전이 영향받음")에 사용됩니다.
    pub fn is_wildcard_tail(&self) -> bool {
        [
            &self.version,
            &self.update,
            &self.edition,
            &self.language,
            &self.sw_edition,
            &self.target_sw,
            &self.target_hw,
        ]
        .iter()
        .all(|f| f.as_str() == WILDCARD)
    }
}

impl fmt::Display for Cpe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpe:2.3:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.part,
            self.vendor,
            self.product,
            self.version,
            self.update,
            self.edition,
            self.language,
            self.sw_edition,
            self.target_sw,
            self.target_hw,
        )
    }
}

impl FromStr for Cpe {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Cpe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cpe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(DeError::custom)
    }
}
