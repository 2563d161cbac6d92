//! Next-token classifier topology.
//!
//! The network is described, not executed: [`build_model`] validates shapes,
//! lays out the fixed layer stack, and produces a [`CompiledModel`] that a
//! [`TrainingRuntime`](crate::train::TrainingRuntime) can fit or export.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("input shape {shape:?} must be (examples, window, features) with non-zero window and features")]
    ShapeMismatch { shape: Vec<usize> },

    #[error("model needs at least one target class")]
    NoClasses,

    #[error("invalid model config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Softmax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    CategoricalCrossentropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Optimizer {
    RmsProp {
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
    },
}

impl Optimizer {
    pub fn rmsprop() -> Self {
        Self::RmsProp {
            learning_rate: 0.001,
            rho: 0.9,
            epsilon: 1e-7,
        }
    }
}

/// One layer of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum LayerSpec {
    Lstm {
        units: usize,
        recurrent_dropout: f32,
        return_sequences: bool,
    },
    BatchNormalization,
    Dropout {
        rate: f32,
    },
    Dense {
        units: usize,
    },
    Activation {
        activation: Activation,
    },
}

impl LayerSpec {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lstm { .. } => "lstm",
            Self::BatchNormalization => "batch_normalization",
            Self::Dropout { .. } => "dropout",
            Self::Dense { .. } => "dense",
            Self::Activation { .. } => "activation",
        }
    }

    /// Output shape (batch omitted) for a given input shape.
    fn output_shape(&self, input: &[usize]) -> Vec<usize> {
        match self {
            Self::Lstm {
                units,
                return_sequences,
                ..
            } => {
                if *return_sequences {
                    vec![input[0], *units]
                } else {
                    vec![*units]
                }
            }
            Self::Dense { units } => {
                let mut shape = input.to_vec();
                if let Some(last) = shape.last_mut() {
                    *last = *units;
                }
                shape
            }
            Self::BatchNormalization | Self::Dropout { .. } | Self::Activation { .. } => {
                input.to_vec()
            }
        }
    }

    /// Trainable plus non-trainable parameters, given the input feature width.
    fn parameter_count(&self, features: usize) -> usize {
        match self {
            Self::Lstm { units, .. } => 4 * units * (features + units + 1),
            // gamma, beta, moving mean, moving variance
            Self::BatchNormalization => 4 * features,
            Self::Dense { units } => features * units + units,
            Self::Dropout { .. } | Self::Activation { .. } => 0,
        }
    }
}

/// Layer sizes and rates. Loss and optimizer are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub lstm_units: usize,
    pub recurrent_dropout: f32,
    pub dropout: f32,
    pub dense_units: usize,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            lstm_units: 512,
            recurrent_dropout: 0.3,
            dropout: 0.3,
            dense_units: 256,
            hidden_activation: Activation::Relu,
            output_activation: Activation::Softmax,
        }
    }
}

impl From<&tuneconf::ModelSection> for ModelConfig {
    fn from(section: &tuneconf::ModelSection) -> Self {
        Self {
            lstm_units: section.lstm_units,
            recurrent_dropout: section.recurrent_dropout,
            dropout: section.dropout,
            dense_units: section.dense_units,
            ..Self::default()
        }
    }
}

impl ModelConfig {
    fn validate(&self) -> Result<(), ModelError> {
        if self.lstm_units == 0 || self.dense_units == 0 {
            return Err(ModelError::InvalidConfig(
                "layer widths must be non-zero".to_string(),
            ));
        }
        for (name, rate) in [
            ("recurrent_dropout", self.recurrent_dropout),
            ("dropout", self.dropout),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be in [0, 1), got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// One row of [`CompiledModel::summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub output_shape: Vec<usize>,
    pub parameters: usize,
}

/// A fully specified network ready to hand to a training runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledModel {
    input_shape: Vec<usize>,
    num_classes: usize,
    layers: Vec<LayerSpec>,
    loss: Loss,
    optimizer: Optimizer,
}

impl CompiledModel {
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// `(window, features)`, batch omitted.
    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn loss(&self) -> Loss {
        self.loss
    }

    pub fn optimizer(&self) -> Optimizer {
        self.optimizer
    }

    /// Output shape of every layer, batch omitted.
    pub fn output_shapes(&self) -> Vec<Vec<usize>> {
        self.layer_summaries()
            .into_iter()
            .map(|s| s.output_shape)
            .collect()
    }

    pub fn layer_summaries(&self) -> Vec<LayerSummary> {
        let mut shape = self.input_shape.clone();
        let mut seen = std::collections::HashMap::<&str, usize>::new();

        self.layers
            .iter()
            .map(|layer| {
                let features = shape.last().copied().unwrap_or(0);
                let parameters = layer.parameter_count(features);
                shape = layer.output_shape(&shape);

                let n = seen.entry(layer.name()).or_insert(0);
                let name = if *n == 0 {
                    layer.name().to_string()
                } else {
                    format!("{}_{}", layer.name(), n)
                };
                *n += 1;

                LayerSummary {
                    name,
                    output_shape: shape.clone(),
                    parameters,
                }
            })
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layer_summaries().iter().map(|s| s.parameters).sum()
    }

    /// Human-readable layer table.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<24} {:<20} {:>12}", "Layer", "Output Shape", "Param #");
        let _ = writeln!(out, "{}", "=".repeat(58));
        for row in self.layer_summaries() {
            let dims: Vec<String> = row.output_shape.iter().map(|d| d.to_string()).collect();
            let shape = format!("(None, {})", dims.join(", "));
            let _ = writeln!(out, "{:<24} {:<20} {:>12}", row.name, shape, row.parameters);
        }
        let _ = writeln!(out, "{}", "=".repeat(58));
        let _ = writeln!(out, "Total params: {}", self.parameter_count());
        let _ = writeln!(out, "Loss: {:?}", self.loss);
        let _ = write!(out, "Optimizer: {:?}", self.optimizer);
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Lay out the classifier for inputs of `input_shape` (`(examples, window,
/// features)`) predicting one of `num_classes` tokens.
pub fn build_model(
    input_shape: &[usize],
    num_classes: usize,
    config: &ModelConfig,
) -> Result<CompiledModel, ModelError> {
    let shape_error = || ModelError::ShapeMismatch {
        shape: input_shape.to_vec(),
    };
    let [.., window, features] = input_shape else {
        return Err(shape_error());
    };
    if input_shape.len() < 3 || *window == 0 || *features == 0 {
        return Err(shape_error());
    }
    if num_classes == 0 {
        return Err(ModelError::NoClasses);
    }
    config.validate()?;

    let layers = vec![
        LayerSpec::Lstm {
            units: config.lstm_units,
            recurrent_dropout: config.recurrent_dropout,
            return_sequences: true,
        },
        LayerSpec::Lstm {
            units: config.lstm_units,
            recurrent_dropout: config.recurrent_dropout,
            return_sequences: true,
        },
        LayerSpec::Lstm {
            units: config.lstm_units,
            recurrent_dropout: 0.0,
            return_sequences: false,
        },
        LayerSpec::BatchNormalization,
        LayerSpec::Dropout {
            rate: config.dropout,
        },
        LayerSpec::Dense {
            units: config.dense_units,
        },
        LayerSpec::Activation {
            activation: config.hidden_activation,
        },
        LayerSpec::BatchNormalization,
        LayerSpec::Dropout {
            rate: config.dropout,
        },
        LayerSpec::Dense { units: num_classes },
        LayerSpec::Activation {
            activation: config.output_activation,
        },
    ];

    let model = CompiledModel {
        input_shape: vec![*window, *features],
        num_classes,
        layers,
        loss: Loss::CategoricalCrossentropy,
        optimizer: Optimizer::rmsprop(),
    };
    debug!(
        window,
        features,
        num_classes,
        parameters = model.parameter_count(),
        "built model"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_stack_for_three_classes() {
        let model = build_model(&[2, 100, 1], 3, &ModelConfig::default()).unwrap();

        let names: Vec<&str> = model.layers().iter().map(LayerSpec::name).collect();
        assert_eq!(
            names,
            vec![
                "lstm",
                "lstm",
                "lstm",
                "batch_normalization",
                "dropout",
                "dense",
                "activation",
                "batch_normalization",
                "dropout",
                "dense",
                "activation",
            ]
        );
        assert_eq!(model.input_shape(), &[100, 1]);
        assert_eq!(model.loss(), Loss::CategoricalCrossentropy);
        assert_eq!(model.optimizer(), Optimizer::rmsprop());
    }

    #[test]
    fn recurrent_layers_follow_fixed_topology() {
        let model = build_model(&[0, 100, 1], 3, &ModelConfig::default()).unwrap();
        let layers = model.layers();

        assert_eq!(
            layers[0],
            LayerSpec::Lstm {
                units: 512,
                recurrent_dropout: 0.3,
                return_sequences: true
            }
        );
        assert_eq!(
            layers[1],
            LayerSpec::Lstm {
                units: 512,
                recurrent_dropout: 0.3,
                return_sequences: true
            }
        );
        assert!(matches!(
            layers[2],
            LayerSpec::Lstm {
                units: 512,
                return_sequences: false,
                ..
            }
        ));
        assert_eq!(layers[4], LayerSpec::Dropout { rate: 0.3 });
        assert_eq!(
            layers[6],
            LayerSpec::Activation {
                activation: Activation::Relu
            }
        );
        assert_eq!(
            layers[10],
            LayerSpec::Activation {
                activation: Activation::Softmax
            }
        );
    }

    #[test]
    fn output_shapes_collapse_sequence_then_reach_class_count() {
        let model = build_model(&[2, 100, 1], 3, &ModelConfig::default()).unwrap();
        assert_eq!(
            model.output_shapes(),
            vec![
                vec![100, 512],
                vec![100, 512],
                vec![512],
                vec![512],
                vec![512],
                vec![256],
                vec![256],
                vec![256],
                vec![256],
                vec![3],
                vec![3],
            ]
        );
    }

    #[test]
    fn parameter_count_matches_layer_formulas() {
        let model = build_model(&[2, 100, 1], 3, &ModelConfig::default()).unwrap();
        let per_layer: Vec<usize> = model
            .layer_summaries()
            .iter()
            .map(|s| s.parameters)
            .collect();

        assert_eq!(
            per_layer,
            vec![1_052_672, 2_099_200, 2_099_200, 2_048, 0, 131_328, 0, 1_024, 0, 771, 0]
        );
        assert_eq!(model.parameter_count(), 5_386_243);
    }

    #[test]
    fn window_length_does_not_change_parameter_count() {
        let short = build_model(&[1, 2, 1], 3, &ModelConfig::default()).unwrap();
        let long = build_model(&[1, 100, 1], 3, &ModelConfig::default()).unwrap();
        assert_eq!(short.parameter_count(), long.parameter_count());
    }

    #[test]
    fn shapes_without_window_and_features_are_rejected() {
        let config = ModelConfig::default();
        let shapes: [&[usize]; 5] = [&[], &[100], &[100, 1], &[2, 0, 1], &[2, 100, 0]];
        for shape in shapes {
            let err = build_model(shape, 3, &config).unwrap_err();
            assert!(
                matches!(err, ModelError::ShapeMismatch { .. }),
                "shape {shape:?}"
            );
        }
    }

    #[test]
    fn zero_classes_is_rejected() {
        let err = build_model(&[2, 100, 1], 0, &ModelConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::NoClasses));
    }

    #[test]
    fn config_is_validated() {
        let config = ModelConfig {
            dropout: 1.0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            build_model(&[2, 100, 1], 3, &config),
            Err(ModelError::InvalidConfig(_))
        ));

        let config = ModelConfig {
            lstm_units: 0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            build_model(&[2, 100, 1], 3, &config),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn smaller_config_changes_widths() {
        let config = ModelConfig {
            lstm_units: 8,
            dense_units: 4,
            ..ModelConfig::default()
        };
        let model = build_model(&[5, 2, 1], 3, &config).unwrap();
        // lstm 4*8*(1+8+1) + 2 * 4*8*(8+8+1) + bn 32 + dense 8*4+4 + bn 16 + dense 4*3+3
        assert_eq!(model.parameter_count(), 320 + 2 * 544 + 32 + 36 + 16 + 15);
    }

    #[test]
    fn config_section_maps_onto_model_config() {
        let section = tuneconf::ModelSection::default();
        assert_eq!(ModelConfig::from(&section), ModelConfig::default());
    }

    #[test]
    fn json_export_roundtrips() {
        let model = build_model(&[2, 2, 1], 3, &ModelConfig::default()).unwrap();
        let json = model.to_json().unwrap();
        assert!(json.contains("\"layer\": \"lstm\""));
        assert!(json.contains("categorical_crossentropy"));
        assert_eq!(CompiledModel::from_json(&json).unwrap(), model);
    }

    #[test]
    fn summary_lists_every_layer_and_total() {
        let model = build_model(&[2, 2, 1], 3, &ModelConfig::default()).unwrap();
        let text = model.summary();
        assert!(text.contains("lstm_2"));
        assert!(text.contains("dense_1"));
        assert!(text.contains("(None, 2, 512)"));
        assert!(text.contains("Total params: 5386243"));
    }
}
