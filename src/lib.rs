pub mod agent;
pub mod card;
pub mod cli;
pub mod config;
pub mod error;
pub mod eval;
pub mod hub;
pub mod pipeline;
pub mod replay;
pub mod stage;

pub use agent::{EvalEnv, ModelArtifact, NormalizationStats, Policy, StepOutcome};
pub use card::{CardMetadata, ModelCard};
pub use config::AppConfig;
pub use error::{AgentPackError, Result};
pub use eval::{EvalSummary, Evaluator};
pub use hub::{HubClient, RepoId};
pub use pipeline::{assemble_bundle, PackageOptions, Packager};
pub use replay::ReplayRecorder;
pub use stage::{StagedConfig, StagingDir, SystemInfo};

#[cfg(feature = "burn-models")]
pub use agent::BurnArtifact;
