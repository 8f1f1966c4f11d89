//! CPE 생성기 — 이기종 입력에서 CPE 2.3 식별자 생성
//!
//! 수동 입력, Composer(PHP), NPM(JavaScript), Docker 이미지 네 가지 경로를
//! 지원합니다. 생성 규칙은 순수하고 결정적입니다. 같은 입력은 항상 같은
//! 식별자를 만들며, 이는 자산 저장소의 (vendor, product, version) 유니크
//! 제약과 exact 매칭의 안정성이 의존하는 계약입니다.
//!
//! 벤더 조회 테이블은 프로세스 전역 상태가 아니라 생성 시점에 주입되는
//! 불변 데이터입니다. 테스트에서는 [`CpeGenerator::with_tables`]로 대체
//! 테이블을 주입할 수 있습니다.

use std::collections::HashMap;

use crate::cpe::Cpe;

/// 주요 NPM 패키지의 벤더 매핑 (기본 테이블)
///
/// 테이블에 없는 패키지는 `npmjs`로 폴백합니다.
const NPM_VENDOR_TABLE: &[(&str, &str)] = &[
    ("react", "facebook"),
    ("react-dom", "facebook"),
    ("react-native", "facebook"),
    ("vue", "vuejs"),
    ("@vue/cli", "vuejs"),
    ("angular", "angular"),
    ("@angular/core", "angular"),
    ("express", "expressjs"),
    ("next", "vercel"),
    ("nuxt", "nuxtlabs"),
    ("gatsby", "gatsbyjs"),
    ("svelte", "svelte"),
    ("ember", "emberjs"),
    ("backbone", "backbonejs"),
    ("jquery", "jquery"),
    ("lodash", "lodash"),
    ("axios", "axios"),
    ("webpack", "webpack"),
    ("vite", "vitejs"),
    ("typescript", "microsoft"),
    ("eslint", "eslint"),
    ("prettier", "prettier"),
];

/// 주요 Docker 이미지의 벤더 매핑 (기본 테이블)
///
/// 테이블에 없는 이미지는 `docker`로 폴백합니다.
const DOCKER_VENDOR_TABLE: &[(&str, &str)] = &[
    ("nginx", "nginx"),
    ("apache", "apache"),
    ("httpd", "apache"),
    ("postgres", "postgresql"),
    ("postgresql", "postgresql"),
    ("mysql", "mysql"),
    ("mariadb", "mariadb"),
    ("redis", "redis"),
    ("memcached", "memcached"),
    ("mongodb", "mongodb"),
    ("elasticsearch", "elastic"),
    ("node", "nodejs"),
    ("python", "python"),
    ("php", "php"),
    ("ruby", "ruby"),
    ("golang", "golang"),
    ("openjdk", "openjdk"),
    ("ubuntu", "canonical"),
    ("debian", "debian"),
    ("alpine", "alpinelinux"),
    ("centos", "centos"),
    ("fedora", "fedoraproject"),
];

/// CPE 식별자 생성기
///
/// 벤더 조회 테이블과 에코시스템별 기본 벤더를 들고 있는 순수 함수 모음입니다.
#[derive(Debug, Clone)]
pub struct CpeGenerator {
    npm_vendors: HashMap<String, String>,
    docker_vendors: HashMap<String, String>,
    npm_default: String,
    docker_default: String,
}

impl Default for CpeGenerator {
    fn default() -> Self {
        let to_map = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect()
        };
        Self {
            npm_vendors: to_map(NPM_VENDOR_TABLE),
            docker_vendors: to_map(DOCKER_VENDOR_TABLE),
            npm_default: "npmjs".to_owned(),
            docker_default: "docker".to_owned(),
        }
    }
}

impl CpeGenerator {
    /// 기본 벤더 테이블로 생성기를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 대체 벤더 테이블을 주입하여 생성기를 만듭니다.
    pub fn with_tables(
        npm_vendors: HashMap<String, String>,
        docker_vendors: HashMap<String, String>,
        npm_default: impl Into<String>,
        docker_default: impl Into<String>,
    ) -> Self {
        Self {
            npm_vendors,
            docker_vendors,
            npm_default: npm_default.into(),
            docker_default: docker_default.into(),
        }
    }

    /// 수동 입력에서 CPE를 생성합니다.
    ///
    /// vendor/product는 정규화하고, version은 앞뒤 공백만 제거하여
    /// 그대로 사용합니다.
    ///
    /// ```
    /// # use vigil_matcher::generator::CpeGenerator;
    /// let generator = CpeGenerator::new();
    /// let cpe = generator.from_manual("Nginx", "Nginx", "1.25.3");
    /// assert_eq!(cpe.to_string(), "cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*");
    /// ```
    pub fn from_manual(&self, vendor: &str, product: &str, version: &str) -> Cpe {
        Cpe::application(
            normalize_name(vendor),
            normalize_name(product),
            version.trim().to_owned(),
        )
    }

    /// Composer 패키지(PHP)에서 CPE를 생성합니다.
    ///
    /// `vendor/product` 형태의 패키지명을 분할하며, `/`가 없으면 패키지명을
    /// vendor와 product 양쪽에 사용합니다.
    ///
    /// ```
    /// # use vigil_matcher::generator::CpeGenerator;
    /// let generator = CpeGenerator::new();
    /// let cpe = generator.from_composer("symfony/console", "^5.4");
    /// assert_eq!(cpe.to_string(), "cpe:2.3:a:symfony:console:5.4:*:*:*:*:*:*:*");
    /// ```
    pub fn from_composer(&self, package_name: &str, version: &str) -> Cpe {
        let (vendor, product) = match package_name.split_once('/') {
            Some((vendor, product)) => (vendor, product),
            None => (package_name, package_name),
        };
        Cpe::application(
            normalize_name(vendor),
            normalize_name(product),
            normalize_version(version),
        )
    }

    /// NPM 패키지(JavaScript)에서 CPE를 생성합니다.
    ///
    /// 벤더는 테이블에서 패키지명(스코프 포함)으로 조회하고, 없으면 기본
    /// 벤더로 폴백합니다. 제품명은 `@scope/`를 제거한 마지막 경로 세그먼트입니다.
    ///
    /// ```
    /// # use vigil_matcher::generator::CpeGenerator;
    /// let generator = CpeGenerator::new();
    /// let cpe = generator.from_npm("react", "^18.2.0");
    /// assert_eq!(cpe.to_string(), "cpe:2.3:a:facebook:react:18.2.0:*:*:*:*:*:*:*");
    /// ```
    pub fn from_npm(&self, package_name: &str, version: &str) -> Cpe {
        let vendor = self
            .npm_vendors
            .get(package_name)
            .map(String::as_str)
            .unwrap_or(&self.npm_default);

        // "@vue/cli" → "cli"
        let product = package_name
            .trim_start_matches('@')
            .rsplit('/')
            .next()
            .unwrap_or(package_name);

        Cpe::application(
            normalize_name(vendor),
            normalize_name(product),
            normalize_version(version),
        )
    }

    /// Docker 이미지에서 CPE를 생성합니다.
    ///
    /// 벤더는 테이블에서 이미지명으로 조회하고, 없으면 기본 벤더로 폴백합니다.
    /// 태그의 변형 접미사(`-alpine`, `-slim` 등)는 버전 정규화로 제거됩니다.
    ///
    /// ```
    /// # use vigil_matcher::generator::CpeGenerator;
    /// let generator = CpeGenerator::new();
    /// let cpe = generator.from_docker("nginx", "1.25.3-alpine");
    /// assert_eq!(cpe.to_string(), "cpe:2.3:a:nginx:nginx:1.25.3:*:*:*:*:*:*:*");
    /// ```
    pub fn from_docker(&self, image_name: &str, image_tag: &str) -> Cpe {
        let vendor = self
            .docker_vendors
            .get(image_name)
            .map(String::as_str)
            .unwrap_or(&self.docker_default);

        Cpe::application(
            normalize_name(vendor),
            normalize_name(image_name),
            normalize_version(image_tag),
        )
    }
}

/// vendor/product 이름을 정규화합니다.
///
/// 소문자로 변환하고 공백과 `/`를 언더스코어로 바꿉니다.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '/'], "_")
}

/// 버전 문자열을 정규화합니다.
///
/// 범위 연산자 접두사(`^`, `~`, `>=`, `<=`, `>`, `<`)를 제거하고,
/// 첫 `-` 또는 `_` 이후의 변형 접미사를 잘라냅니다.
pub fn normalize_version(version: &str) -> String {
    let stripped = version.trim_start_matches(['^', '~', '>', '=', '<']);
    let base = stripped
        .split(['-', '_'])
        .next()
        .unwrap_or(stripped);
    base.trim().to_owned()
}
