//! Boundary to whatever actually fits the model.

use anyhow::{Context, Result};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::CompiledModel;
use crate::vocab::Vocabulary;

pub const MODEL_FILE: &str = "model.json";
pub const TENSORS_FILE: &str = "tensors.bin";
pub const VOCABULARY_FILE: &str = "vocabulary.json";

/// Owns the fit loop: epochs, checkpointing, early stopping.
pub trait TrainingRuntime {
    fn fit(
        &mut self,
        model: &CompiledModel,
        inputs: ArrayView3<'_, f32>,
        targets: ArrayView2<'_, f32>,
    ) -> Result<()>;
}

#[derive(Serialize)]
struct TensorsRef<'i, 't> {
    inputs: ArrayView3<'i, f32>,
    targets: ArrayView2<'t, f32>,
}

/// Tensors as written to [`TENSORS_FILE`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandoffTensors {
    pub inputs: Array3<f32>,
    pub targets: Array2<f32>,
}

/// Writes everything an external trainer needs into one directory.
#[derive(Debug, Clone)]
pub struct HandoffExporter {
    dir: PathBuf,
    vocabulary: Option<Vocabulary>,
}

impl HandoffExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            vocabulary: None,
        }
    }

    /// Also write the code → token table, so predictions can be decoded.
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_tensors(dir: &Path) -> Result<HandoffTensors> {
        let path = dir.join(TENSORS_FILE);
        let bytes =
            std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        bincode::deserialize(&bytes)
            .with_context(|| format!("Failed to decode tensors from {}", path.display()))
    }

    pub fn load_model(dir: &Path) -> Result<CompiledModel> {
        let path = dir.join(MODEL_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        CompiledModel::from_json(&json)
            .with_context(|| format!("Failed to decode model from {}", path.display()))
    }
}

impl TrainingRuntime for HandoffExporter {
    fn fit(
        &mut self,
        model: &CompiledModel,
        inputs: ArrayView3<'_, f32>,
        targets: ArrayView2<'_, f32>,
    ) -> Result<()> {
        anyhow::ensure!(
            inputs.shape()[0] == targets.shape()[0],
            "inputs hold {} examples but targets hold {}",
            inputs.shape()[0],
            targets.shape()[0]
        );
        anyhow::ensure!(
            targets.shape()[1] == model.num_classes(),
            "targets are {} wide but the model predicts {} classes",
            targets.shape()[1],
            model.num_classes()
        );

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let model_path = self.dir.join(MODEL_FILE);
        std::fs::write(&model_path, model.to_json()?)
            .with_context(|| format!("Failed to write {}", model_path.display()))?;

        let tensors_path = self.dir.join(TENSORS_FILE);
        let bytes = bincode::serialize(&TensorsRef { inputs, targets })
            .context("Failed to serialize tensors")?;
        std::fs::write(&tensors_path, &bytes)
            .with_context(|| format!("Failed to write {}", tensors_path.display()))?;

        if let Some(vocabulary) = &self.vocabulary {
            let vocab_path = self.dir.join(VOCABULARY_FILE);
            let json = serde_json::to_string_pretty(vocabulary.tokens())?;
            std::fs::write(&vocab_path, json)
                .with_context(|| format!("Failed to write {}", vocab_path.display()))?;
        }

        info!(
            dir = %self.dir.display(),
            examples = inputs.shape()[0],
            parameters = model.parameter_count(),
            tensor_bytes = bytes.len(),
            "wrote training handoff"
        );
        Ok(())
    }
}
