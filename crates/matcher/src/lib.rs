#![doc = include_str!("../README.md")]

pub mod cpe;
pub mod engine;
pub mod error;
pub mod generator;
pub mod resolver;
pub mod version;

// --- 주요 타입 re-export ---

pub use cpe::{Cpe, CpePart};
pub use engine::{AssetSource, MatchEngine, MatchSink, UpsertReport, VulnerabilitySource};
pub use error::MatcherError;
pub use generator::CpeGenerator;
pub use resolver::PreparedVulnerability;
