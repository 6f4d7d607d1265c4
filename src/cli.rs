//! agentpack CLI
//!
//! Commands:
//! - `agentpack push` - Upload a single file to a hub repository
//! - `agentpack publish` - Upload a staged artifact folder, refreshing its card
//! - `agentpack card` - Render a model card from staged artifacts

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::card::ModelCard;
use crate::config::{AppConfig, LoggingConfig};
use crate::error::Result;
use crate::eval::EvalSummary;
use crate::hub::{HubClient, RepoId};
use crate::pipeline::Packager;
use crate::stage::StagedConfig;

/// Package and publish reinforcement-learning agents to a model hub
#[derive(Parser, Debug)]
#[command(name = "agentpack")]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration file (default: Agentpack.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hub endpoint, overriding the configured one
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Hub authentication token
    #[arg(long, global = true, env = "HUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a single file (model zip, replay video, ...) to a repository
    Push {
        /// Target repository as namespace/name
        #[arg(long)]
        repo_id: String,

        /// Local file to upload
        #[arg(long)]
        file: PathBuf,

        /// Commit message
        #[arg(short = 'm', long, default_value = "Upload with agentpack")]
        commit_message: String,
    },

    /// Upload a staged artifact folder, regenerating its model card first
    Publish {
        /// Target repository as namespace/name
        #[arg(long)]
        repo_id: String,

        /// Folder holding the staged artifacts (config.json, results.json, ...)
        #[arg(long)]
        folder: PathBuf,

        /// Model name for the card (default: repository name)
        #[arg(long)]
        model_name: Option<String>,

        /// Commit message
        #[arg(short = 'm', long, default_value = "Upload with agentpack")]
        commit_message: String,

        /// Create the repository as private
        #[arg(long)]
        private: bool,
    },

    /// Render the model card for a staged artifact folder
    Card {
        /// Folder holding the staged artifacts
        #[arg(long)]
        folder: PathBuf,

        /// Write the card here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Resolve the effective configuration: file, environment, then
    /// global flags
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::load()?,
        };
        if let Some(endpoint) = &self.endpoint {
            config.hub.endpoint = endpoint.clone();
        }
        if let Some(token) = &self.token {
            config.hub.token = Some(token.clone());
        }
        Ok(config)
    }

    pub async fn run(self, config: AppConfig) -> Result<()> {
        match self.command {
            Commands::Push {
                repo_id,
                file,
                commit_message,
            } => {
                let repo_id: RepoId = repo_id.parse()?;
                let hub = HubClient::new(&config.hub.endpoint, config.hub.token.clone())?;
                let url = Packager::new(hub)
                    .push_to_hub(&repo_id, &file, &commit_message)
                    .await?;
                println!("{}", url);
                Ok(())
            }

            Commands::Publish {
                repo_id,
                folder,
                model_name,
                commit_message,
                private,
            } => {
                let repo_id: RepoId = repo_id.parse()?;
                let model_name = model_name.unwrap_or_else(|| repo_id.name.clone());

                // Refresh the card from the staged evaluation results
                let card_path = render_card(&folder, &model_name)?;
                info!("Refreshed model card at {:?}", card_path);

                let hub = HubClient::new(&config.hub.endpoint, config.hub.token.clone())?;
                let url = hub.create_repo(&repo_id, private, true).await?;
                hub.upload_folder(&repo_id, &folder, &commit_message).await?;
                println!("{}", url);
                Ok(())
            }

            Commands::Card { folder, output } => {
                let staged = StagedConfig::load(&folder)?;
                let summary = EvalSummary::load(&folder)?;
                let env_kwargs = load_env_kwargs(&folder)?;

                // Default model name follows the algo-env convention
                let model_name = format!("{}-{}", staged.algo.to_lowercase(), staged.env_id);
                let card = ModelCard {
                    model_name: &model_name,
                    algo_name: &staged.algo,
                    env_id: &staged.env_id,
                    summary: &summary,
                    hyperparams: &staged.hyperparams,
                    env_kwargs: &env_kwargs,
                }
                .render()?;

                match output {
                    Some(path) => fs::write(path, card)?,
                    None => print!("{}", card),
                }
                Ok(())
            }
        }
    }
}

/// Log filter for the process: RUST_LOG wins, otherwise the configured level
pub fn logging_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

/// Initialize tracing from the logging configuration
pub fn init_logging(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(logging_filter(logging));
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Render and write the card for a staged folder from its own artifacts
fn render_card(folder: &std::path::Path, model_name: &str) -> Result<PathBuf> {
    let staged = StagedConfig::load(folder)?;
    let summary = EvalSummary::load(folder)?;
    let env_kwargs = load_env_kwargs(folder)?;

    ModelCard {
        model_name,
        algo_name: &staged.algo,
        env_id: &staged.env_id,
        summary: &summary,
        hyperparams: &staged.hyperparams,
        env_kwargs: &env_kwargs,
    }
    .save(folder)
}

fn load_env_kwargs(folder: &std::path::Path) -> Result<BTreeMap<String, serde_json::Value>> {
    let path = folder.join("env_kwargs.yml");
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    let yaml = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_push_args_parse() {
        let cli = Cli::parse_from([
            "agentpack",
            "push",
            "--repo-id",
            "org/ppo-CartPole-v1",
            "--file",
            "model.mpk",
        ]);
        match cli.command {
            Commands::Push {
                repo_id,
                file,
                commit_message,
            } => {
                assert_eq!(repo_id, "org/ppo-CartPole-v1");
                assert_eq!(file, PathBuf::from("model.mpk"));
                assert_eq!(commit_message, "Upload with agentpack");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::parse_from([
            "agentpack",
            "--endpoint",
            "https://hub.example",
            "--token",
            "secret-token",
            "push",
            "--repo-id",
            "org/model",
            "--file",
            "model.mpk",
        ]);

        let config = cli.load_config().unwrap();
        assert_eq!(config.hub.endpoint, "https://hub.example");
        assert_eq!(config.hub.token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_logging_filter_uses_configured_level() {
        std::env::remove_var("RUST_LOG");
        let logging = LoggingConfig {
            level: "debug".to_string(),
            json: false,
        };
        assert_eq!(logging_filter(&logging).to_string(), "debug");
    }

    #[test]
    fn test_load_env_kwargs_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let kwargs = load_env_kwargs(dir.path()).unwrap();
        assert!(kwargs.is_empty());
    }
}
