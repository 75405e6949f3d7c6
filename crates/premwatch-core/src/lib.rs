//! Shared domain types and configuration for the premises-licence pipeline.

pub mod app_config;
pub mod config;
pub mod error;
pub mod outcome;
pub mod records;
pub mod strategy;
pub mod targets;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, ErrorKind, RecordError};
pub use outcome::{
    AttemptDiagnostic, CouncilBreakdown, ExtractionOutcome, ExtractionStatus, RunSummary,
    StatusCounts, StrategyResult,
};
pub use records::{
    BusinessCategory, CanonicalLicenceRecord, LicenceCategory, LicenceFields, LicenceStatus,
    LicenceType, RawLicenceRecord, RecordOrigin,
};
pub use strategy::{
    BlockedStrategy, StrategyAttempt, StrategyHistory, StrategyKind, StrategyParameters,
    StrategyPlan,
};
pub use targets::{
    load_targets, parse_targets, ExtractionTarget, FormHints, TargetConfig, TargetsFile,
};
