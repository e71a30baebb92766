// Local ONNX text classifiers.
//
// Runs entirely on the local CPU with no API calls and no rate limits. Two
// models are supported through `ModelSpec`:
//   - toxic-bert: six independent toxicity labels, sigmoid over logits
//   - distilbert SST-2: NEGATIVE / POSITIVE sentiment, softmax over logits
//
// Files come from `download::download_models()`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::traits::{ClassifierService, LabelScore};
use crate::output::truncate_chars;

/// How raw logits become probabilities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Independent per-label probabilities (multi-label).
    Sigmoid,
    /// Probabilities that sum to one (single-label).
    Softmax,
}

/// Static description of an exported model.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub name: &'static str,
    /// Labels in the order the model emits logits.
    pub labels: &'static [&'static str],
    pub activation: Activation,
    pub pad_id: i64,
    /// BERT exports take `token_type_ids`; DistilBERT exports do not.
    pub token_type_ids: bool,
}

pub const TOXIC_BERT: ModelSpec = ModelSpec {
    name: "toxic-bert",
    labels: &[
        "toxic",
        "severe_toxic",
        "obscene",
        "threat",
        "insult",
        "identity_hate",
    ],
    activation: Activation::Sigmoid,
    pad_id: 0,
    token_type_ids: true,
};

pub const SST2_SENTIMENT: ModelSpec = ModelSpec {
    name: "sst2-sentiment",
    labels: &["NEGATIVE", "POSITIVE"],
    activation: Activation::Softmax,
    pad_id: 0,
    token_type_ids: false,
};

/// ONNX-backed classifier. The session sits behind Arc<Mutex> because
/// `Session::run` takes `&mut self` and inference runs on spawn_blocking.
pub struct OnnxClassifier {
    spec: ModelSpec,
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxClassifier {
    /// Load `model_quantized.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path, spec: ModelSpec) -> Result<Self> {
        let model_path = model_dir.join(super::download::MODEL_FILE);
        let tokenizer_path = model_dir.join(super::download::TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `sentinel download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `sentinel download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!(model = spec.name, dir = %model_dir.display(), "Loaded ONNX classifier");

        Ok(Self {
            spec,
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl ClassifierService for OnnxClassifier {
    fn name(&self) -> &str {
        self.spec.name
    }

    async fn evaluate(&self, text: &str) -> Result<Vec<LabelScore>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let spec = self.spec;
        let text = text.to_string();

        // Tokenization and inference are CPU-bound; keep them off the runtime.
        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
            let mask: Vec<i64> = encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect();
            let seq_len = if ids.is_empty() { 1 } else { ids.len() };
            let ids = if ids.is_empty() { vec![spec.pad_id] } else { ids };
            let mask = if mask.is_empty() { vec![0] } else { mask };
            let shape = [1_i64, seq_len as i64];

            let input_ids = Tensor::from_array((shape, ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask = Tensor::from_array((shape, mask))
                .context("Failed to create attention_mask tensor")?;

            let logits: Vec<f32> = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = if spec.token_type_ids {
                    let token_type_ids = Tensor::from_array((shape, vec![0_i64; seq_len]))
                        .context("Failed to create token_type_ids tensor")?;
                    session
                        .run(ort::inputs! {
                            "input_ids" => input_ids,
                            "attention_mask" => attention_mask,
                            "token_type_ids" => token_type_ids
                        })
                        .context("ONNX inference failed")?
                } else {
                    session
                        .run(ort::inputs! {
                            "input_ids" => input_ids,
                            "attention_mask" => attention_mask
                        })
                        .context("ONNX inference failed")?
                };

                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;
                data.to_vec()
            };

            if logits.len() < spec.labels.len() {
                anyhow::bail!(
                    "{} returned {} logits, expected {}",
                    spec.name,
                    logits.len(),
                    spec.labels.len()
                );
            }

            let logits: Vec<f64> = logits[..spec.labels.len()]
                .iter()
                .map(|&l| l as f64)
                .collect();
            let scores = activate(&logits, spec.activation);

            let labels: Vec<LabelScore> = spec
                .labels
                .iter()
                .zip(scores)
                .map(|(label, score)| LabelScore::new(*label, score))
                .collect();

            debug!(
                model = spec.name,
                labels = ?labels,
                text_preview = %truncate_chars(&text, 50),
                "ONNX classified text"
            );

            Ok(labels)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

fn activate(logits: &[f64], activation: Activation) -> Vec<f64> {
    match activation {
        Activation::Sigmoid => logits.iter().map(|&x| sigmoid(x)).collect(),
        Activation::Softmax => softmax(logits),
    }
}

/// Sigmoid activation: maps any real number to (0, 1).
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [0.5, 1.0, 2.0, 5.0] {
            let sum = sigmoid(x) + sigmoid(-x);
            assert!((sum - 1.0).abs() < 1e-10, "sigmoid({x}) + sigmoid(-{x}) = {sum}");
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, -1.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-10);
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn test_softmax_large_logits_do_not_overflow() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_activation_dispatch() {
        assert_eq!(activate(&[0.0, 0.0], Activation::Sigmoid), vec![0.5, 0.5]);
        assert_eq!(activate(&[0.0, 0.0], Activation::Softmax), vec![0.5, 0.5]);
    }

    #[test]
    fn test_model_specs_match_label_vocabularies() {
        assert_eq!(TOXIC_BERT.labels.len(), 6);
        assert_eq!(SST2_SENTIMENT.labels, &["NEGATIVE", "POSITIVE"]);
    }
}
