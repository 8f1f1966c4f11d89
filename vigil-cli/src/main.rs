use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use vigil_core::config::VigilConfig;
use vigil_core::error::{ConfigError, VigilError};
use vigil_core::types::{AssetProvenance, AssetRecord, VulnerabilityRecord};
use vigil_matcher::engine::MatchEngine;
use vigil_matcher::generator::CpeGenerator;
use vigil_store::{Store, create_pool, init_schema};

/// Vigil CLI — 자산/취약점 관리와 CPE 매칭 명령줄 도구
#[derive(Parser)]
#[command(name = "vigil", version, about)]
struct Cli {
    /// 설정 파일 경로
    #[arg(short, long, default_value = "vigil.toml")]
    config: String,

    /// 로그 레벨
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 전체 매칭을 실행하고 요약을 출력
    Run,
    /// 자산 관리 명령
    Asset {
        #[command(subcommand)]
        action: AssetAction,
    },
    /// 취약점 관리 명령
    Vuln {
        #[command(subcommand)]
        action: VulnAction,
    },
    /// 저장된 매칭 결과 조회
    Matches,
}

#[derive(Subcommand)]
enum AssetAction {
    /// 수동 입력으로 자산 등록
    Add {
        /// 표시용 이름
        name: String,
        /// 벤더
        vendor: String,
        /// 제품명
        product: String,
        /// 버전
        version: String,
    },
    /// 패키지 매니페스트 항목으로 자산 등록
    AddPackage {
        /// 패키지 에코시스템
        #[arg(value_enum)]
        ecosystem: Ecosystem,
        /// 패키지명 또는 이미지명
        name: String,
        /// 버전 표현식 또는 이미지 태그
        version: String,
    },
    /// 자산 목록 조회
    List,
    /// 자산 삭제 (연관 매칭 행은 CASCADE 삭제)
    Remove {
        /// 자산 ID
        asset_id: String,
    },
}

#[derive(Subcommand)]
enum VulnAction {
    /// JSON 파일에서 취약점 일괄 upsert
    Import {
        /// 취약점 레코드 배열이 담긴 JSON 파일 경로
        path: String,
    },
    /// 취약점 목록 조회
    List,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ecosystem {
    Composer,
    Npm,
    Docker,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).await?;

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(cli.log_level.as_str())
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(cli.log_level.as_str())
            .init();
    }

    tracing::info!(config = %cli.config, db = %config.database.path, "vigil-cli starting");

    let pool = create_pool(&config.database).await?;
    init_schema(&pool).await?;
    let store = Store::new(pool, config.matching.chunk_size);

    match cli.command {
        Commands::Run => {
            let engine = MatchEngine::new(store.clone(), store.clone(), store.clone());
            let summary = engine.run_full_matching().await?;
            println!("Matching complete: {summary}");
        }
        Commands::Asset { action } => handle_asset_command(&store, action).await?,
        Commands::Vuln { action } => handle_vuln_command(&store, action).await?,
        Commands::Matches => {
            let matches = store.matches().await?;
            println!("{:<38} {:<18} {:<16}", "Asset", "CVE", "Reason");
            println!("{}", "-".repeat(72));
            for row in &matches {
                println!(
                    "{:<38} {:<18} {:<16}",
                    row.asset_id,
                    row.cve_id,
                    row.reason.as_str()
                );
            }
            println!("{} match(es)", matches.len());
        }
    }

    Ok(())
}

/// 설정 파일을 로드합니다. 파일이 없으면 기본값으로 동작합니다.
async fn load_config(path: &str) -> Result<VigilConfig> {
    match VigilConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(VigilError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = VigilConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_asset_command(store: &Store, action: AssetAction) -> Result<()> {
    let generator = CpeGenerator::new();

    match action {
        AssetAction::Add {
            name,
            vendor,
            product,
            version,
        } => {
            let cpe = generator.from_manual(&vendor, &product, &version);
            let asset = AssetRecord {
                asset_id: Uuid::new_v4().to_string(),
                name,
                vendor: cpe.vendor.clone(),
                product: cpe.product.clone(),
                version: cpe.version.clone(),
                cpe: cpe.to_string(),
                source: AssetProvenance::Manual,
            };
            store.add_asset(&asset).await?;
            println!("✓ Asset {} registered ({})", asset.asset_id, asset.cpe);
        }
        AssetAction::AddPackage {
            ecosystem,
            name,
            version,
        } => {
            let (cpe, source) = match ecosystem {
                Ecosystem::Composer => (
                    generator.from_composer(&name, &version),
                    AssetProvenance::Composer,
                ),
                Ecosystem::Npm => (generator.from_npm(&name, &version), AssetProvenance::Npm),
                Ecosystem::Docker => (
                    generator.from_docker(&name, &version),
                    AssetProvenance::Docker,
                ),
            };
            let asset = AssetRecord {
                asset_id: Uuid::new_v4().to_string(),
                name,
                vendor: cpe.vendor.clone(),
                product: cpe.product.clone(),
                version: cpe.version.clone(),
                cpe: cpe.to_string(),
                source,
            };
            store.add_asset(&asset).await?;
            println!("✓ Asset {} registered ({})", asset.asset_id, asset.cpe);
        }
        AssetAction::List => {
            let assets = store.assets().await?;
            println!(
                "{:<38} {:<20} {:<16} {:<16} {:<12} {:<10}",
                "ID", "Name", "Vendor", "Product", "Version", "Source"
            );
            println!("{}", "-".repeat(112));
            for asset in &assets {
                println!(
                    "{:<38} {:<20} {:<16} {:<16} {:<12} {:<10}",
                    asset.asset_id,
                    asset.name,
                    asset.vendor,
                    asset.product,
                    asset.version,
                    asset.source
                );
            }
            println!("{} asset(s)", assets.len());
        }
        AssetAction::Remove { asset_id } => {
            if store.remove_asset(&asset_id).await? {
                println!("✓ Asset {asset_id} removed");
            } else {
                println!("Asset {asset_id} not found");
            }
        }
    }

    Ok(())
}

async fn handle_vuln_command(store: &Store, action: VulnAction) -> Result<()> {
    match action {
        VulnAction::Import { path } => {
            let content = tokio::fs::read_to_string(&path).await?;
            let records: Vec<VulnerabilityRecord> = serde_json::from_str(&content)?;
            for record in &records {
                store.upsert_vulnerability(record).await?;
            }
            println!("✓ Imported {} vulnerability record(s)", records.len());
        }
        VulnAction::List => {
            let vulnerabilities = store.vulnerabilities().await?;
            println!(
                "{:<18} {:<10} {:<7} {:<12} {:<8}",
                "CVE", "Severity", "Score", "Identifiers", "Ranges"
            );
            println!("{}", "-".repeat(55));
            for vuln in &vulnerabilities {
                println!(
                    "{:<18} {:<10} {:<7} {:<12} {:<8}",
                    vuln.cve_id,
                    vuln.severity.to_string(),
                    vuln.score,
                    vuln.identifiers.len(),
                    vuln.version_ranges.len()
                );
            }
            println!("{} vulnerability record(s)", vulnerabilities.len());
        }
    }

    Ok(())
}
