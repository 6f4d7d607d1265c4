//! Package-and-publish pipeline
//!
//! The ordered sequence behind `package_to_hub`:
//!
//!   save model → stage config → evaluate → record replay (best-effort)
//!   → generate card → upload
//!
//! Everything happens inside one staging directory whose lifetime spans the
//! call. Only the replay step tolerates failure; every other step aborts
//! the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::agent::{EvalEnv, ModelArtifact, NormalizationStats, Policy};
use crate::card::ModelCard;
use crate::config::AppConfig;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::hub::{HubClient, RepoId};
use crate::replay::ReplayRecorder;
use crate::stage::StagingDir;

/// Options for a packaging run
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub commit_message: String,
    pub n_eval_episodes: usize,
    /// Use deterministic actions; flipped per-env when the env prefers
    /// stochastic evaluation
    pub deterministic: bool,
    pub max_episode_steps: usize,
    pub generate_video: bool,
    pub video_length: usize,
    pub video_fps: u32,
    pub ffmpeg_bin: String,
    /// Training log directory copied into the bundle
    pub log_dir: Option<PathBuf>,
    /// Environment constructor arguments, staged and embedded in the card
    pub env_kwargs: BTreeMap<String, serde_json::Value>,
    /// Create the repository as private
    pub private: bool,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            commit_message: "Upload with agentpack".to_string(),
            n_eval_episodes: 10,
            deterministic: true,
            max_episode_steps: 100_000,
            generate_video: true,
            video_length: 1000,
            video_fps: 30,
            ffmpeg_bin: "ffmpeg".to_string(),
            log_dir: None,
            env_kwargs: BTreeMap::new(),
            private: false,
        }
    }
}

impl PackageOptions {
    /// Options seeded from the loaded configuration
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            n_eval_episodes: config.eval.n_eval_episodes,
            deterministic: config.eval.deterministic,
            max_episode_steps: config.eval.max_episode_steps,
            generate_video: config.video.enabled,
            video_length: config.video.video_length,
            video_fps: config.video.fps,
            ffmpeg_bin: config.video.ffmpeg_bin.clone(),
            private: config.hub.private,
            ..Self::default()
        }
    }
}

/// Runs the packaging pipeline against a hub
pub struct Packager {
    hub: HubClient,
}

impl Packager {
    pub fn new(hub: HubClient) -> Self {
        Self { hub }
    }

    /// Package a trained agent and publish the bundle, returning the repo URL
    ///
    /// The full pipeline of the crate: saves the model and its
    /// normalization statistics, evaluates it, records a replay when
    /// possible, renders the model card and uploads everything in one
    /// commit.
    pub async fn package_to_hub<A, P, E>(
        &self,
        model_name: &str,
        artifact: &A,
        policy: &mut P,
        env: &mut E,
        norm_stats: Option<&NormalizationStats>,
        repo_id: &RepoId,
        opts: &PackageOptions,
    ) -> Result<String>
    where
        A: ModelArtifact,
        P: Policy,
        E: EvalEnv,
    {
        info!(
            "Packaging {} for {}: save, evaluate, record, document, upload",
            model_name, repo_id
        );

        let repo_url = self.hub.create_repo(repo_id, opts.private, true).await?;

        let staging =
            assemble_bundle(model_name, artifact, policy, env, norm_stats, opts)?;

        info!("Pushing repo {} to the hub", repo_id);
        self.hub
            .upload_folder(repo_id, staging.path(), &opts.commit_message)
            .await?;

        info!("Model uploaded, available at {}", repo_url);
        Ok(repo_url)
    }

    /// Upload a single file into a repository, creating it if absent
    pub async fn push_to_hub(
        &self,
        repo_id: &RepoId,
        file: &Path,
        commit_message: &str,
    ) -> Result<String> {
        let repo_url = self.hub.create_repo(repo_id, false, true).await?;

        let path_in_repo = file
            .file_name()
            .ok_or_else(|| {
                crate::error::AgentPackError::Internal(format!("no file name in {:?}", file))
            })?
            .to_string_lossy()
            .to_string();

        info!("Pushing '{}' to '{}'", path_in_repo, repo_id);
        self.hub
            .upload_file(repo_id, file, &path_in_repo, commit_message)
            .await?;

        info!("File uploaded, available at {}", repo_url);
        Ok(repo_url)
    }
}

/// Run every local pipeline step, returning the populated staging
/// directory without uploading it
///
/// Useful as a dry run; the directory is deleted when the handle drops.
pub fn assemble_bundle<A, P, E>(
    model_name: &str,
    artifact: &A,
    policy: &mut P,
    env: &mut E,
    norm_stats: Option<&NormalizationStats>,
    opts: &PackageOptions,
) -> Result<StagingDir>
where
    A: ModelArtifact,
    P: Policy,
    E: EvalEnv,
{
    let staging = StagingDir::new()?;

    // Step 1: model weights and frozen normalization statistics
    artifact.save(staging.path(), model_name)?;
    if let Some(stats) = norm_stats {
        let mut frozen = stats.clone();
        frozen.freeze();
        frozen.save(&staging.path().join("vec_normalize.json"))?;
    }

    // Step 2: agent config with host info
    staging.write_config(artifact, env.env_id())?;

    // Deterministic by default, except for envs that prefer stochastic
    // evaluation (Atari-style)
    let deterministic = opts.deterministic && !env.prefers_stochastic_eval();

    // Step 3: evaluation
    let summary = Evaluator::new(opts.n_eval_episodes, deterministic)
        .with_max_episode_steps(opts.max_episode_steps)
        .evaluate(policy, env)?;
    summary.save(staging.path())?;

    // Step 4: replay video, best-effort only
    if opts.generate_video {
        ReplayRecorder::new(opts.video_length, opts.video_fps, deterministic)
            .with_ffmpeg_bin(&opts.ffmpeg_bin)
            .record_best_effort(policy, env, staging.path());
    }

    // Step 5: model card
    let hyperparams = artifact.hyperparams();
    ModelCard {
        model_name,
        algo_name: artifact.algo_name(),
        env_id: env.env_id(),
        summary: &summary,
        hyperparams: &hyperparams,
        env_kwargs: &opts.env_kwargs,
    }
    .save(staging.path())?;

    if !opts.env_kwargs.is_empty() {
        staging.write_env_kwargs(&opts.env_kwargs)?;
    }

    // Step 6: training logs and saved run metadata
    if let Some(log_dir) = &opts.log_dir {
        staging.attach_run_metadata(log_dir)?;
        staging.attach_logs(log_dir)?;
    }

    Ok(staging)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_original_pipeline() {
        let opts = PackageOptions::default();
        assert_eq!(opts.n_eval_episodes, 10);
        assert_eq!(opts.video_length, 1000);
        assert!(opts.deterministic);
        assert!(opts.generate_video);
        assert!(!opts.private);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AppConfig::default();
        config.eval.n_eval_episodes = 25;
        config.video.enabled = false;
        config.hub.private = true;

        let opts = PackageOptions::from_config(&config);
        assert_eq!(opts.n_eval_episodes, 25);
        assert!(!opts.generate_video);
        assert!(opts.private);
    }
}
