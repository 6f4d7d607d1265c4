//! Model card generation
//!
//! Renders the `README.md` uploaded with the bundle: YAML front matter the
//! hub indexes (tags plus a model-index entry carrying the evaluation
//! metric) followed by a human-readable markdown body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::eval::EvalSummary;

/// YAML front matter of the model card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardMetadata {
    pub library_name: String,
    pub tags: Vec<String>,
    #[serde(rename = "model-index")]
    pub model_index: Vec<ModelIndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelIndexEntry {
    pub name: String,
    pub results: Vec<TaskResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: TaskInfo,
    pub dataset: DatasetInfo,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(rename = "type")]
    pub task_type: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub dataset_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub value: String,
    pub name: String,
    pub verified: bool,
}

impl CardMetadata {
    /// Tags and evaluation metric for an agent on a given environment
    pub fn for_agent(model_name: &str, env_id: &str, summary: &EvalSummary) -> Self {
        Self {
            library_name: "agentpack".to_string(),
            tags: vec![
                env_id.to_string(),
                "deep-reinforcement-learning".to_string(),
                "reinforcement-learning".to_string(),
                "agentpack".to_string(),
            ],
            model_index: vec![ModelIndexEntry {
                name: model_name.to_string(),
                results: vec![TaskResult {
                    task: TaskInfo {
                        task_type: "reinforcement-learning".to_string(),
                        name: "reinforcement-learning".to_string(),
                    },
                    dataset: DatasetInfo {
                        name: env_id.to_string(),
                        dataset_type: env_id.to_string(),
                    },
                    metrics: vec![Metric {
                        metric_type: "mean_reward".to_string(),
                        value: format!(
                            "{:.2} +/- {:.2}",
                            summary.mean_reward, summary.std_reward
                        ),
                        name: "mean_reward".to_string(),
                        verified: false,
                    }],
                }],
            }],
        }
    }
}

/// Inputs for the rendered card
pub struct ModelCard<'a> {
    pub model_name: &'a str,
    pub algo_name: &'a str,
    pub env_id: &'a str,
    pub summary: &'a EvalSummary,
    pub hyperparams: &'a serde_json::Value,
    pub env_kwargs: &'a BTreeMap<String, serde_json::Value>,
}

impl ModelCard<'_> {
    /// Render the full card: front matter plus markdown body
    pub fn render(&self) -> Result<String> {
        let metadata = CardMetadata::for_agent(self.model_name, self.env_id, self.summary);
        let front_matter = serde_yaml::to_string(&metadata)?;

        let mut card = format!(
            "---\n{front_matter}---\n\n\
             # **{algo}** Agent playing **{env}**\n\n\
             This is a trained model of a **{algo}** agent playing **{env}**,\n\
             packaged and published with [agentpack](https://github.com/agentpack/agentpack).\n\n\
             ## Evaluation Results\n\n\
             mean_reward: `{mean:.2} +/- {std:.2}` over {episodes} episodes\n\
             ({mode} actions, evaluated at {datetime}).\n\n\
             ## Usage\n\n\
             Download the bundle and load the weights with the framework that\n\
             trained the agent. `config.json` carries the training\n\
             hyperparameters, `vec_normalize.json` (when present) the\n\
             observation normalization statistics to apply at inference time.\n\n\
             ```bash\n\
             agentpack push --repo-id <namespace>/{model_name} --file {model_name}.mpk\n\
             ```\n\n\
             ## Hyperparameters\n\n\
             ```json\n{hyperparams}\n```\n",
            front_matter = front_matter,
            algo = self.algo_name,
            env = self.env_id,
            mean = self.summary.mean_reward,
            std = self.summary.std_reward,
            episodes = self.summary.n_eval_episodes,
            mode = if self.summary.is_deterministic {
                "deterministic"
            } else {
                "stochastic"
            },
            datetime = self.summary.eval_datetime,
            model_name = self.model_name,
            hyperparams = serde_json::to_string_pretty(self.hyperparams)?,
        );

        if !self.env_kwargs.is_empty() {
            card.push_str(&format!(
                "\n## Environment Arguments\n\n```json\n{}\n```\n",
                serde_json::to_string_pretty(self.env_kwargs)?
            ));
        }

        Ok(card)
    }

    /// Render and write the card as `README.md` under `dest_dir`
    pub fn save(&self, dest_dir: &Path) -> Result<PathBuf> {
        let path = dest_dir.join("README.md");
        fs::write(&path, self.render()?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> EvalSummary {
        EvalSummary {
            mean_reward: 200.512,
            std_reward: 14.237,
            is_deterministic: true,
            n_eval_episodes: 10,
            eval_datetime: "2026-08-30T12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_metadata_carries_metric_and_tags() {
        let metadata = CardMetadata::for_agent("ppo-CartPole-v1", "CartPole-v1", &summary());

        assert_eq!(metadata.library_name, "agentpack");
        assert!(metadata.tags.contains(&"CartPole-v1".to_string()));
        assert!(metadata.tags.contains(&"reinforcement-learning".to_string()));

        let metric = &metadata.model_index[0].results[0].metrics[0];
        assert_eq!(metric.metric_type, "mean_reward");
        assert_eq!(metric.value, "200.51 +/- 14.24");
    }

    #[test]
    fn test_render_has_front_matter_and_body() {
        let env_kwargs = BTreeMap::new();
        let hyperparams = serde_json::json!({ "gamma": 0.99 });
        let card = ModelCard {
            model_name: "ppo-CartPole-v1",
            algo_name: "PPO",
            env_id: "CartPole-v1",
            summary: &summary(),
            hyperparams: &hyperparams,
            env_kwargs: &env_kwargs,
        };

        let rendered = card.render().unwrap();
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("model-index"));
        assert!(rendered.contains("# **PPO** Agent playing **CartPole-v1**"));
        assert!(rendered.contains("200.51 +/- 14.24"));
        assert!(rendered.contains("\"gamma\": 0.99"));
        // No env kwargs section when the map is empty
        assert!(!rendered.contains("Environment Arguments"));
    }

    #[test]
    fn test_render_includes_env_kwargs_when_present() {
        let mut env_kwargs = BTreeMap::new();
        env_kwargs.insert("frameskip".to_string(), serde_json::json!(4));
        let hyperparams = serde_json::json!({});
        let card = ModelCard {
            model_name: "dqn-Breakout-v5",
            algo_name: "DQN",
            env_id: "Breakout-v5",
            summary: &summary(),
            hyperparams: &hyperparams,
            env_kwargs: &env_kwargs,
        };

        let rendered = card.render().unwrap();
        assert!(rendered.contains("Environment Arguments"));
        assert!(rendered.contains("frameskip"));
    }

    #[test]
    fn test_save_writes_readme() {
        let dir = tempfile::tempdir().unwrap();
        let env_kwargs = BTreeMap::new();
        let hyperparams = serde_json::json!({});
        let card = ModelCard {
            model_name: "a2c-Pendulum-v1",
            algo_name: "A2C",
            env_id: "Pendulum-v1",
            summary: &summary(),
            hyperparams: &hyperparams,
            env_kwargs: &env_kwargs,
        };

        let path = card.save(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "README.md");
        assert!(path.is_file());
    }
}
