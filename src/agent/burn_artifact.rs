//! Burn-backed model artifact
//!
//! Persists any Burn module through the named-MessagePack recorder so a
//! Burn-trained policy can go through the packaging pipeline without the
//! caller writing serialization code.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use super::ModelArtifact;
use crate::error::{AgentPackError, Result};

/// [`ModelArtifact`] implementation for Burn modules
pub struct BurnArtifact<B: Backend, M: Module<B>> {
    module: M,
    algo_name: String,
    hyperparams: serde_json::Value,
    _backend: PhantomData<B>,
}

impl<B: Backend, M: Module<B>> BurnArtifact<B, M> {
    pub fn new(module: M, algo_name: impl Into<String>) -> Self {
        Self {
            module,
            algo_name: algo_name.into(),
            hyperparams: serde_json::Value::Object(serde_json::Map::new()),
            _backend: PhantomData,
        }
    }

    /// Attach training hyperparameters for the staged config and model card
    pub fn with_hyperparams(mut self, hyperparams: serde_json::Value) -> Self {
        self.hyperparams = hyperparams;
        self
    }
}

impl<B: Backend, M: Module<B>> ModelArtifact for BurnArtifact<B, M> {
    fn algo_name(&self) -> &str {
        &self.algo_name
    }

    fn hyperparams(&self) -> serde_json::Value {
        self.hyperparams.clone()
    }

    fn save(&self, dest_dir: &Path, model_name: &str) -> Result<PathBuf> {
        let path = dest_dir.join(format!("{}.mpk", model_name));

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        self.module
            .clone()
            .save_file(&path, &recorder)
            .map_err(|e| AgentPackError::Artifact(format!("failed to save model: {}", e)))?;

        Ok(path)
    }
}
