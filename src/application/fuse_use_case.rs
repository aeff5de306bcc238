// ============================================================
// Layer 2 — FuseUseCase
// ============================================================
// Runs the fusion core end to end over a set of examples:
//
//   Step 1: Pick a source             (Layer 4 - file or synthetic)
//   Step 2: Load the examples         (Layer 4 - data)
//   Step 3: Build the fusion model    (Layer 5 - ml)
//   Step 4: Pad each chunk of examples into a batch (Layer 4)
//   Step 5: Forward + summarise       (Layer 5 - ml)
//   Step 6: Collect the FuseReport    (Layer 3 - domain)
//
// The use case is generic over the Burn backend; Layer 1
// decides which one to run on.
//
// Reference: Burn Book §3 (Backends)

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{loader::ExampleLoader, synthetic::SyntheticSource};
use crate::domain::report::FuseReport;
use crate::domain::traits::ExampleSource;
use crate::domain::SimilarityMode;
use crate::ml::masking::check_mask_magnitude;
use crate::ml::model::FusionModelConfig;

// ─── Fuse Configuration ──────────────────────────────────────────────────────
// Everything one `fuse` run needs. Can be saved to JSON with
// `--save-config` and replayed with `--config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    /// JSON file of examples; None = generate `synthetic` examples
    pub input:            Option<String>,
    pub synthetic:        usize,
    pub seed:             u64,
    pub batch_size:       usize,
    pub d_model:          usize,
    pub max_sentences:    usize,
    pub max_sentence_len: usize,
    pub max_query_len:    usize,
    pub mode:             SimilarityMode,
    pub dropout:          f64,
    pub highway_depth:    usize,
    pub gate_bias:        f64,
    pub mask_magnitude:   f64,
    pub validate_masks:   bool,
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            input:            None,
            synthetic:        8,
            seed:             42,
            batch_size:       4,
            d_model:          64,
            max_sentences:    4,
            max_sentence_len: 32,
            max_query_len:    16,
            mode:             SimilarityMode::Trilinear,
            dropout:          0.2,
            highway_depth:    2,
            gate_bias:        0.0,
            mask_magnitude:   1e30,
            validate_masks:   true,
        }
    }
}

impl FuseConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config JSON in '{}'", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config to '{}'", path.display()))?;
        tracing::info!("Config saved to '{}'", path.display());
        Ok(())
    }

    pub fn model_config(&self) -> FusionModelConfig {
        FusionModelConfig::new(self.d_model)
            .with_max_sentences(self.max_sentences)
            .with_max_sentence_len(self.max_sentence_len)
            .with_max_query_len(self.max_query_len)
            .with_mode(self.mode)
            .with_dropout(self.dropout)
            .with_highway_depth(self.highway_depth)
            .with_gate_bias(self.gate_bias)
            .with_mask_magnitude(self.mask_magnitude)
            .with_validate_masks(self.validate_masks)
    }

    fn source(&self) -> Box<dyn ExampleSource> {
        match &self.input {
            Some(path) => Box::new(ExampleLoader::new(path.clone())),
            None => Box::new(SyntheticSource::new(
                self.synthetic,
                self.d_model,
                self.model_config().capacity(),
                self.seed,
            )),
        }
    }
}

// ─── FuseUseCase ──────────────────────────────────────────────────────────────
pub struct FuseUseCase {
    config: FuseConfig,
}

impl FuseUseCase {
    pub fn new(config: FuseConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: B::Device, backend_name: &str) -> Result<FuseReport> {
        let cfg = &self.config;
        anyhow::ensure!(cfg.batch_size > 0, "batch_size must be at least 1");
        check_mask_magnitude(cfg.mask_magnitude).context("Invalid --mask-magnitude")?;

        // ── Steps 1-2: Load examples ─────────────────────────────────────────
        let source = cfg.source();
        tracing::info!("Loading examples from {}", source.describe());
        let examples = source.load_all()?;

        // ── Step 3: Build the model ───────────────────────────────────────────
        let model_cfg = cfg.model_config();
        let model     = model_cfg.init::<B>(&device);
        let batcher   = model.batcher(device);
        let capacity  = model.capacity();

        let mut report = FuseReport::new(
            model.mode(),
            backend_name,
            [
                cfg.batch_size.min(examples.len()),
                capacity.max_sentences,
                capacity.max_sentence_len,
                4 * cfg.d_model,
            ],
        );

        if examples.is_empty() {
            tracing::warn!("No examples to fuse");
            return Ok(report);
        }

        tracing::info!(
            "Fusing {} examples in batches of {} ({} mode, {} backend)",
            examples.len(), cfg.batch_size, model.mode(), backend_name,
        );

        // ── Steps 4-6: Batch, fuse, summarise ─────────────────────────────────
        for (index, chunk) in examples.chunks(cfg.batch_size).enumerate() {
            let batch = batcher
                .batch(chunk)
                .with_context(|| format!("Cannot batch chunk {index}"))?;
            let output = model
                .forward(&batch)
                .with_context(|| format!("Fusion failed on chunk {index}"))?;

            for summary in model.summarise(&batch, &output)? {
                tracing::debug!(
                    "{}: {} doc tokens, {} query tokens, mean norm {:.4}",
                    summary.id, summary.document_tokens, summary.query_tokens, summary.mean_fused_norm,
                );
                report.push(summary);
            }
        }

        if !report.all_finite {
            tracing::warn!("Fused output contains non-finite values");
        }
        tracing::info!("Fused {} examples", report.examples.len());
        Ok(report)
    }
}
