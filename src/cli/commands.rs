// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `fuse` and `init-config`, and all
// their flags.
//
// Model flags are all optional: whatever is given overrides the
// base config (the `--config` file, or the defaults), whatever
// is left out keeps the base value.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::fuse_use_case::FuseConfig;
use crate::domain::SimilarityMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run highway + bi-attention fusion and print a JSON report
    Fuse(FuseArgs),

    /// Write a config file with every default filled in
    InitConfig(InitConfigArgs),
}

/// Compute backend for the fusion run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// NdArray on the CPU
    #[default]
    Cpu,
    /// Wgpu on the default GPU adapter
    Wgpu,
}

impl BackendArg {
    pub fn name(self) -> &'static str {
        match self {
            BackendArg::Cpu  => "cpu",
            BackendArg::Wgpu => "wgpu",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Project [doc ; query]
    Bilinear,
    /// Project [doc ; query ; doc * query]
    Trilinear,
}

impl From<ModeArg> for SimilarityMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Bilinear  => SimilarityMode::Bilinear,
            ModeArg::Trilinear => SimilarityMode::Trilinear,
        }
    }
}

/// All arguments for the `fuse` command
#[derive(Args, Debug)]
pub struct FuseArgs {
    /// JSON file with one example or an array of examples
    #[arg(long, conflicts_with = "synthetic")]
    pub input: Option<String>,

    /// Generate this many random examples instead of reading --input
    #[arg(long)]
    pub synthetic: Option<usize>,

    /// Seed for --synthetic
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = BackendArg::Cpu)]
    pub backend: BackendArg,

    /// Load the base config from this JSON file
    #[arg(long)]
    pub config: Option<String>,

    /// Write the resolved config to this file before running
    #[arg(long)]
    pub save_config: Option<String>,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub output: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Model and batching knobs shared by `fuse` and `init-config`
#[derive(Args, Debug, Default)]
pub struct ModelArgs {
    /// Examples per forward pass
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Feature width of every document and query token
    #[arg(long)]
    pub d_model: Option<usize>,

    /// Padded sentence count
    #[arg(long)]
    pub max_sentences: Option<usize>,

    /// Padded tokens per sentence
    #[arg(long)]
    pub max_sentence_len: Option<usize>,

    /// Padded query tokens
    #[arg(long)]
    pub max_query_len: Option<usize>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Dropout on the similarity features (training backends only)
    #[arg(long)]
    pub dropout: Option<f64>,

    /// Number of highway gates applied before attention
    #[arg(long)]
    pub highway_depth: Option<usize>,

    /// Initial bias of every highway gate; negative favours carrying the input
    #[arg(long, allow_hyphen_values = true)]
    pub gate_bias: Option<f64>,

    /// Penalty added to padded logits; must stay finite in f32 when doubled
    #[arg(long)]
    pub mask_magnitude: Option<f64>,

    /// Skip the host-side mask validation pass
    #[arg(long)]
    pub no_validate_masks: bool,
}

impl ModelArgs {
    /// Overwrite every field of `cfg` that was given on the command line.
    pub fn apply(self, cfg: &mut FuseConfig) {
        if let Some(v) = self.batch_size       { cfg.batch_size = v; }
        if let Some(v) = self.d_model          { cfg.d_model = v; }
        if let Some(v) = self.max_sentences    { cfg.max_sentences = v; }
        if let Some(v) = self.max_sentence_len { cfg.max_sentence_len = v; }
        if let Some(v) = self.max_query_len    { cfg.max_query_len = v; }
        if let Some(v) = self.mode             { cfg.mode = v.into(); }
        if let Some(v) = self.dropout          { cfg.dropout = v; }
        if let Some(v) = self.highway_depth    { cfg.highway_depth = v; }
        if let Some(v) = self.gate_bias        { cfg.gate_bias = v; }
        if let Some(v) = self.mask_magnitude   { cfg.mask_magnitude = v; }
        if self.no_validate_masks {
            cfg.validate_masks = false;
        }
    }
}

impl FuseArgs {
    /// Apply the source and model flags on top of `base`.
    pub fn resolve(self, mut base: FuseConfig) -> FuseConfig {
        if let Some(input) = self.input {
            base.input = Some(input);
        }
        if let Some(count) = self.synthetic {
            base.input     = None;
            base.synthetic = count;
        }
        if let Some(seed) = self.seed {
            base.seed = seed;
        }
        self.model.apply(&mut base);
        base
    }
}

/// Convert CLI FuseArgs into the application-layer FuseConfig,
/// starting from the defaults.
impl From<FuseArgs> for FuseConfig {
    fn from(args: FuseArgs) -> Self {
        args.resolve(FuseConfig::default())
    }
}

/// All arguments for the `init-config` command
#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the config
    #[arg(long, default_value = "fuse_config.json")]
    pub path: String,

    #[command(flatten)]
    pub model: ModelArgs,
}

impl From<InitConfigArgs> for FuseConfig {
    fn from(args: InitConfigArgs) -> Self {
        let mut cfg = FuseConfig::default();
        args.model.apply(&mut cfg);
        cfg
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn fuse_args(argv: &[&str]) -> FuseArgs {
        let mut full = vec!["bidaf-fusion", "fuse"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Fuse(args) => args,
            other => panic!("expected fuse, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_survive_without_flags() {
        let args = fuse_args(&[]);
        assert_eq!(args.backend, BackendArg::Cpu);
        assert_eq!(FuseConfig::from(args), FuseConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = fuse_args(&[
            "--synthetic", "3", "--seed", "9", "--d-model", "16",
            "--mode", "bilinear", "--gate-bias", "-1.5", "--no-validate-masks",
            "--mask-magnitude", "1e20",
        ]);
        let cfg = FuseConfig::from(args);
        assert_eq!(cfg.synthetic, 3);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.d_model, 16);
        assert_eq!(cfg.mode, SimilarityMode::Bilinear);
        assert_eq!(cfg.gate_bias, -1.5);
        assert!(!cfg.validate_masks);
        assert_eq!(cfg.mask_magnitude, 1e20);
    }

    #[test]
    fn test_unset_flags_keep_loaded_values() {
        let base = FuseConfig { d_model: 32, highway_depth: 5, ..FuseConfig::default() };
        let cfg = fuse_args(&["--highway-depth", "1"]).resolve(base);
        assert_eq!(cfg.d_model, 32);
        assert_eq!(cfg.highway_depth, 1);
    }

    #[test]
    fn test_synthetic_replaces_input_from_config() {
        let base = FuseConfig { input: Some("old.json".into()), ..FuseConfig::default() };
        let cfg = fuse_args(&["--synthetic", "2"]).resolve(base);
        assert_eq!(cfg.input, None);
        assert_eq!(cfg.synthetic, 2);
    }

    #[test]
    fn test_input_and_synthetic_conflict() {
        let argv = ["bidaf-fusion", "fuse", "--input", "a.json", "--synthetic", "2"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_backend_flag() {
        assert_eq!(fuse_args(&["--backend", "wgpu"]).backend.name(), "wgpu");
    }
}
