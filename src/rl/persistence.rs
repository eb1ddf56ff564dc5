//! Checkpointing of trained policies
//!
//! Weights go through Burn's Record system into a `.mpk` file; a JSON
//! sidecar carries the configuration needed to rebuild the network and the
//! training progress counters. The core treats the weight file as an opaque
//! blob; only the sidecar is inspected here.

use anyhow::{Context, Result};
use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::agent::PongAgent;
use super::config::PpoConfig;
use super::policy::{PolicyConfig, PolicyNet};
use super::preprocess::PreprocessConfig;

/// Metadata saved next to the weight file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// PPO hyperparameters used during training
    pub ppo_config: PpoConfig,

    /// Network layout, needed to reconstruct the module before loading
    pub policy_config: PolicyConfig,

    /// Preprocessing pipeline the policy was trained against
    pub preprocess_config: PreprocessConfig,

    /// Number of episodes trained
    pub episodes_trained: usize,

    /// Crate version that wrote the checkpoint
    pub version: String,
}

/// Save a trained agent's policy to `path` (plus a `.meta.json` sidecar).
///
/// Creates parent directories if they don't exist.
pub fn save_model<B: AutodiffBackend>(agent: &PongAgent<B>, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {:?}", parent))?;
    }

    let record = agent.network().clone().into_record();
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(record, path.to_path_buf())
        .context("failed to save policy weights")?;

    let metadata = ModelMetadata {
        ppo_config: agent.config().clone(),
        policy_config: agent.policy_config().clone(),
        preprocess_config: agent.preprocess_config().clone(),
        episodes_trained: agent.episodes_trained(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let meta_path = path.with_extension("meta.json");
    let meta_json =
        serde_json::to_string_pretty(&metadata).context("failed to serialize metadata")?;
    std::fs::write(&meta_path, meta_json)
        .with_context(|| format!("failed to write metadata to {:?}", meta_path))?;

    Ok(())
}

/// Load a policy network and its metadata from `path`.
///
/// Fails if either the weight file or the metadata sidecar is missing or
/// unreadable; use [`load_network_if_exists`] to tolerate absence.
pub fn load_network<B: AutodiffBackend>(
    path: &Path,
    device: &B::Device,
) -> Result<(PolicyNet<B>, ModelMetadata)> {
    let meta_path = path.with_extension("meta.json");
    let meta_json = std::fs::read_to_string(&meta_path)
        .with_context(|| format!("failed to read metadata from {:?}", meta_path))?;
    let metadata: ModelMetadata =
        serde_json::from_str(&meta_json).context("failed to deserialize metadata")?;

    let network = metadata.policy_config.init::<B>(device);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(path.to_path_buf(), device)
        .with_context(|| format!("failed to load policy weights from {:?}", path))?;

    Ok((network.load_record(record), metadata))
}

/// Like [`load_network`], but a missing checkpoint yields `Ok(None)`.
///
/// Absence of a checkpoint is expected on a fresh training run and must
/// not abort it; the caller logs a notice and keeps its initialized
/// weights.
pub fn load_network_if_exists<B: AutodiffBackend>(
    path: &Path,
    device: &B::Device,
) -> Result<Option<(PolicyNet<B>, ModelMetadata)>> {
    // Burn appends the .mpk extension when recording.
    let weight_path = path.with_extension("mpk");
    if !weight_path.exists() && !path.exists() {
        return Ok(None);
    }
    load_network(path, device).map(Some)
}
