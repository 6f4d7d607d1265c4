use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Base URL of the model hub
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Authentication token. Usually left unset and taken from HUB_TOKEN
    #[serde(default)]
    pub token: Option<String>,
    /// Create repositories as private
    #[serde(default)]
    pub private: bool,
}

fn default_endpoint() -> String {
    "https://huggingface.co".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            private: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalConfig {
    /// Number of evaluation episodes
    #[serde(default = "default_eval_episodes")]
    pub n_eval_episodes: usize,
    /// Use deterministic actions during evaluation
    #[serde(default = "default_true")]
    pub deterministic: bool,
    /// Step cap per episode so a non-terminating env cannot hang the pipeline
    #[serde(default = "default_max_episode_steps")]
    pub max_episode_steps: usize,
}

fn default_eval_episodes() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_episode_steps() -> usize {
    100_000
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            n_eval_episodes: default_eval_episodes(),
            deterministic: true,
            max_episode_steps: default_max_episode_steps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    /// Record a replay video during packaging
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Length of the replay in environment steps
    #[serde(default = "default_video_length")]
    pub video_length: usize,
    /// Frames per second of the encoded video
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Encoder binary to invoke
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_bin: String,
}

fn default_video_length() -> usize {
    1000
}

fn default_fps() -> u32 {
    30
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            video_length: default_video_length(),
            fps: default_fps(),
            ffmpeg_bin: default_ffmpeg(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `Agentpack.toml` and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("Agentpack.toml")
    }

    /// Load configuration from a specific file and environment overrides
    /// (AGENTPACK_HUB__ENDPOINT, AGENTPACK_EVAL__N_EVAL_EPISODES, etc.)
    pub fn load_from<P: AsRef<Path>>(config_file: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(config_file.as_ref().to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("AGENTPACK")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.eval.n_eval_episodes, 10);
        assert!(config.eval.deterministic);
        assert_eq!(config.video.video_length, 1000);
        assert_eq!(config.video.fps, 30);
        assert_eq!(config.hub.endpoint, "https://huggingface.co");
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("/nonexistent/Agentpack.toml").unwrap();
        assert_eq!(config.eval.n_eval_episodes, 10);
        assert_eq!(config.video.ffmpeg_bin, "ffmpeg");
    }
}
