//! Agent evaluation
//!
//! Runs full episodes through the policy/env seam and summarizes the
//! per-episode returns into the `results.json` staged next to the model.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::agent::{EvalEnv, Policy};
use crate::error::{AgentPackError, Result};

/// Summary statistics over the evaluation episodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub mean_reward: f64,
    pub std_reward: f64,
    pub is_deterministic: bool,
    pub n_eval_episodes: usize,
    /// ISO-8601 timestamp of the evaluation
    pub eval_datetime: String,
}

impl EvalSummary {
    /// Write the summary as `results.json` under `dest_dir`
    pub fn save(&self, dest_dir: &Path) -> Result<()> {
        let path = dest_dir.join("results.json");
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load a summary previously written by [`EvalSummary::save`]
    pub fn load(dir: &Path) -> Result<Self> {
        let json = fs::read_to_string(dir.join("results.json"))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Episode-loop evaluator
pub struct Evaluator {
    n_eval_episodes: usize,
    deterministic: bool,
    max_episode_steps: usize,
}

impl Evaluator {
    pub fn new(n_eval_episodes: usize, deterministic: bool) -> Self {
        Self {
            n_eval_episodes,
            deterministic,
            max_episode_steps: 100_000,
        }
    }

    /// Cap the number of steps per episode
    pub fn with_max_episode_steps(mut self, max_episode_steps: usize) -> Self {
        self.max_episode_steps = max_episode_steps;
        self
    }

    /// Run the evaluation episodes and summarize the returns
    pub fn evaluate<P: Policy, E: EvalEnv>(
        &self,
        policy: &mut P,
        env: &mut E,
    ) -> Result<EvalSummary> {
        if self.n_eval_episodes == 0 {
            return Err(AgentPackError::Evaluation(
                "n_eval_episodes must be at least 1".to_string(),
            ));
        }

        let mut episode_returns = Vec::with_capacity(self.n_eval_episodes);

        for episode in 0..self.n_eval_episodes {
            policy.reset_state();
            let mut obs = env.reset()?;
            let mut episode_return = 0.0;

            let mut steps = 0;
            loop {
                let action = policy.act(&obs, self.deterministic)?;
                let outcome = env.step(&action)?;
                episode_return += outcome.reward;
                obs = outcome.obs;
                steps += 1;

                if outcome.done {
                    break;
                }
                if steps >= self.max_episode_steps {
                    warn!(
                        "Episode {} hit the {}-step cap without terminating",
                        episode, self.max_episode_steps
                    );
                    break;
                }
            }

            episode_returns.push(episode_return);
        }

        let (mean_reward, std_reward) = mean_std(&episode_returns);
        info!(
            "Evaluated {} episodes on {}: {:.2} +/- {:.2}",
            self.n_eval_episodes,
            env.env_id(),
            mean_reward,
            std_reward
        );

        Ok(EvalSummary {
            mean_reward,
            std_reward,
            is_deterministic: self.deterministic,
            n_eval_episodes: self.n_eval_episodes,
            eval_datetime: Utc::now().to_rfc3339(),
        })
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
