// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Decides WHERE and WHEN models are saved. The model owns the
// format through `Persistable`; this manager only hands it paths.
//
// Layout of a checkpoint directory:
//
//   checkpoints/
//     classify-120        <- whatever the model wrote for step 120
//     classify-240
//     checkpoint.json     <- pointer to the most recent checkpoint
//     fit_config.json     <- configuration of the run
//
// `checkpoint.json` is rewritten after every save, so recovering
// "the last checkpoint" after early stopping restores the best
// epoch: with early stopping on, checkpoints are only written
// on improvement.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::traits::Persistable;

const POINTER_FILE: &str = "checkpoint.json";

/// Contents of `checkpoint.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// File name of the newest checkpoint, relative to the directory
    pub latest: Option<String>,
    /// Every checkpoint written, oldest first
    pub all: Vec<String>,
}

pub struct CheckpointManager {
    dir: PathBuf,
    prefix: String,
}

impl CheckpointManager {
    /// Create the manager and its directory.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir, prefix: prefix.into() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a checkpoint for `step` is written to
    pub fn path_for(&self, step: usize) -> PathBuf {
        self.dir.join(format!("{}-{step}", self.prefix))
    }

    /// Save `model` for `step` and point `checkpoint.json` at it.
    pub fn save<M: Persistable + ?Sized>(&self, model: &M, step: usize) -> Result<PathBuf> {
        let path = self.path_for(step);
        model
            .save(&path)
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let name = format!("{}-{step}", self.prefix);
        let mut state = self.state()?;
        state.all.retain(|n| n != &name);
        state.all.push(name.clone());
        state.latest = Some(name);
        self.write_json(POINTER_FILE, &state)?;

        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }

    /// Current pointer file, empty if nothing was saved yet
    pub fn state(&self) -> Result<CheckpointState> {
        let path = self.dir.join(POINTER_FILE);
        if !path.exists() {
            return Ok(CheckpointState::default());
        }
        self.read_json(POINTER_FILE)
    }

    /// Path of the most recent checkpoint, if any
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.state()?.latest.map(|name| self.dir.join(name)))
    }

    /// Restore `model` from the most recent checkpoint.
    pub fn restore_latest<M: Persistable + ?Sized>(&self, model: &mut M) -> Result<PathBuf> {
        let path = self
            .latest()?
            .with_context(|| format!("No checkpoint found in '{}'. Has training run?", self.dir.display()))?;

        tracing::info!("Reloading {}", path.display());
        model
            .restore(&path)
            .with_context(|| format!("Cannot restore checkpoint '{}'", path.display()))?;
        Ok(path)
    }

    /// Write a run configuration next to the checkpoints
    pub fn save_config<T: Serialize>(&self, name: &str, cfg: &T) -> Result<()> {
        self.write_json(name, cfg)
    }

    pub fn load_config<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.read_json(name)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}
