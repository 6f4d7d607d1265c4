//! Trait seams for the external RL collaborators
//!
//! The pipeline never runs inference, simulates environments or owns a
//! serialization format itself. Callers plug their framework in behind
//! these traits and the pipeline orchestrates the calls.

#[cfg(feature = "burn-models")]
mod burn_artifact;

#[cfg(feature = "burn-models")]
pub use burn_artifact::BurnArtifact;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Next observation
    pub obs: Vec<f32>,
    /// Reward for the transition
    pub reward: f64,
    /// Episode terminated (or was truncated) after this step
    pub done: bool,
}

/// A trained policy, queried for actions during evaluation and replay
///
/// Stateful so recurrent policies can carry hidden state between steps.
pub trait Policy {
    /// Select an action for the given observation
    fn act(&mut self, obs: &[f32], deterministic: bool) -> Result<Vec<f32>>;

    /// Clear any internal state at episode boundaries
    fn reset_state(&mut self) {}
}

/// Environment used for evaluation and replay recording
pub trait EvalEnv {
    /// Identifier of the environment (e.g. "CartPole-v1")
    fn env_id(&self) -> &str;

    /// Reset the environment, returning the initial observation
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Apply an action
    fn step(&mut self, action: &[f32]) -> Result<StepOutcome>;

    /// Frame dimensions in pixels, if the env can render
    fn frame_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Render the current state as a packed RGB24 frame
    /// (`width * height * 3` bytes, row-major)
    fn render_frame(&mut self) -> Result<Vec<u8>> {
        Err(crate::error::AgentPackError::Replay(
            "environment does not support rendering".to_string(),
        ))
    }

    /// Whether this env should be evaluated with stochastic actions even
    /// when the caller asked for deterministic ones (Atari-style envs)
    fn prefers_stochastic_eval(&self) -> bool {
        false
    }
}

/// A saveable trained model, the stand-in for the RL framework's own
/// serialization
pub trait ModelArtifact {
    /// Name of the algorithm (DQN, PPO, SAC, ...)
    fn algo_name(&self) -> &str;

    /// Hyperparameters used for training, embedded into the staged
    /// `config.json` and the model card
    fn hyperparams(&self) -> serde_json::Value {
        serde_json::Value::Object(serde_json::Map::new())
    }

    /// Write the model weights under `dest_dir`, returning the written path
    fn save(&self, dest_dir: &Path, model_name: &str) -> Result<PathBuf>;
}

/// Observation normalization statistics captured during training
///
/// Saved alongside the model so downstream consumers can reproduce the
/// exact observation scaling at inference time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Running mean per observation dimension
    pub obs_mean: Vec<f64>,
    /// Running variance per observation dimension
    pub obs_var: Vec<f64>,
    /// Observations are clipped to [-clip_obs, clip_obs] after scaling
    pub clip_obs: f64,
    /// Variance floor to avoid division by zero
    pub epsilon: f64,
    /// Stats still update on new observations
    pub training: bool,
    /// Rewards are normalized as well
    pub norm_reward: bool,
}

impl NormalizationStats {
    pub fn new(obs_mean: Vec<f64>, obs_var: Vec<f64>, clip_obs: f64) -> Self {
        Self {
            obs_mean,
            obs_var,
            clip_obs,
            epsilon: 1e-8,
            training: true,
            norm_reward: true,
        }
    }

    /// Mark the stats eval-only: no further updates, no reward scaling.
    /// Done before saving so published stats are frozen.
    pub fn freeze(&mut self) {
        self.training = false;
        self.norm_reward = false;
    }

    /// Normalize an observation with the captured statistics
    pub fn normalize_obs(&self, obs: &[f32]) -> Vec<f32> {
        obs.iter()
            .zip(self.obs_mean.iter().zip(self.obs_var.iter()))
            .map(|(x, (mean, var))| {
                let scaled = (*x as f64 - mean) / (var + self.epsilon).sqrt();
                scaled.clamp(-self.clip_obs, self.clip_obs) as f32
            })
            .collect()
    }

    /// Write the stats as JSON under `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load stats previously written by [`NormalizationStats::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze_disables_training_and_reward_norm() {
        let mut stats = NormalizationStats::new(vec![0.0], vec![1.0], 10.0);
        assert!(stats.training);
        assert!(stats.norm_reward);

        stats.freeze();
        assert!(!stats.training);
        assert!(!stats.norm_reward);
    }

    #[test]
    fn test_normalize_obs_centers_and_clips() {
        let stats = NormalizationStats::new(vec![1.0, 0.0], vec![4.0, 1.0], 2.0);

        let normalized = stats.normalize_obs(&[3.0, 100.0]);
        assert!((normalized[0] - 1.0).abs() < 1e-4);
        // Far outlier is clipped to clip_obs
        assert!((normalized[1] - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vec_normalize.json");

        let mut stats = NormalizationStats::new(vec![0.5, -0.5], vec![1.5, 2.5], 10.0);
        stats.freeze();
        stats.save(&path).unwrap();

        let loaded = NormalizationStats::load(&path).unwrap();
        assert_eq!(loaded.obs_mean, vec![0.5, -0.5]);
        assert!(!loaded.training);
    }
}
