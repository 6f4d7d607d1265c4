//! Staging directory for artifact bundles
//!
//! Everything the pipeline produces lands in one staging directory whose
//! lifetime spans the packaging call. The directory is removed on drop,
//! including on error paths, so a failed run leaves nothing behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::agent::ModelArtifact;
use crate::error::Result;

/// Host information embedded into the staged `config.json` so published
/// models record where they were packaged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub agentpack_version: String,
    pub packaged_at: DateTime<Utc>,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            agentpack_version: env!("CARGO_PKG_VERSION").to_string(),
            packaged_at: Utc::now(),
        }
    }
}

/// Contents of the staged `config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedConfig {
    pub algo: String,
    pub env_id: String,
    pub hyperparams: serde_json::Value,
    pub system_info: SystemInfo,
}

impl StagedConfig {
    /// Load a config previously staged by [`StagingDir::write_config`]
    pub fn load(dir: &Path) -> Result<Self> {
        let json = fs::read_to_string(dir.join("config.json"))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A staging directory holding the artifact bundle until upload
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Create a staging directory under the system temp dir
    pub fn new() -> Result<Self> {
        let dir = TempDir::with_prefix("agentpack-")?;
        debug!("Created staging directory {:?}", dir.path());
        Ok(Self { dir })
    }

    /// Create a staging directory under a caller-supplied root
    pub fn new_in<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        let dir = TempDir::with_prefix_in("agentpack-", root)?;
        debug!("Created staging directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `config.json` describing the artifact and the packaging host
    pub fn write_config(&self, artifact: &dyn ModelArtifact, env_id: &str) -> Result<PathBuf> {
        let staged = StagedConfig {
            algo: artifact.algo_name().to_string(),
            env_id: env_id.to_string(),
            hyperparams: artifact.hyperparams(),
            system_info: SystemInfo::collect(),
        };

        let path = self.path().join("config.json");
        fs::write(&path, serde_json::to_string_pretty(&staged)?)?;
        Ok(path)
    }

    /// Copy a training log directory into the bundle as `logs/`,
    /// replacing any earlier copy
    pub fn attach_logs(&self, logdir: &Path) -> Result<()> {
        if !logdir.is_dir() {
            warn!("Log directory {:?} does not exist, skipping", logdir);
            return Ok(());
        }

        let dest = self.path().join("logs");
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        copy_dir_recursive(logdir, &dest)?;
        Ok(())
    }

    /// Copy saved run metadata (`args.yml`, `config.yml`, monitor CSVs)
    /// from a training log folder, when present
    pub fn attach_run_metadata(&self, log_dir: &Path) -> Result<()> {
        for name in ["args.yml", "config.yml"] {
            let src = log_dir.join(name);
            if src.is_file() {
                fs::copy(&src, self.path().join(name))?;
            }
        }

        // Monitor CSVs carry the per-episode training returns
        if log_dir.is_dir() {
            for entry in fs::read_dir(log_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "csv") {
                    if let Some(name) = path.file_name() {
                        fs::copy(&path, self.path().join(name))?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Write environment constructor arguments as `env_kwargs.yml`
    pub fn write_env_kwargs(
        &self,
        env_kwargs: &BTreeMap<String, serde_json::Value>,
    ) -> Result<PathBuf> {
        let path = self.path().join("env_kwargs.yml");
        fs::write(&path, serde_yaml::to_string(env_kwargs)?)?;
        Ok(path)
    }

    /// Persist the directory instead of deleting it on drop,
    /// returning its path
    pub fn keep(self) -> PathBuf {
        self.dir.into_path()
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
