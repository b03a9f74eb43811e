pub mod report;

use crate::types::{ConversionConfig, Modality, ModalityCompletenessPolicy, DEFAULT_SPLIT_SEED};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for mmstack
#[derive(Parser, Debug)]
#[command(name = "mmstack")]
#[command(about = "Assemble a channel-stacked BPH/PCA prostate MRI dataset")]
#[command(version)]
pub struct Cli {
    /// Source root holding BPH/, PCA/ and the label directory
    #[arg(short, long, value_name = "DIR")]
    pub source: PathBuf,

    /// Directory the dataset directory is created in
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Numeric dataset identifier
    #[arg(long, default_value_t = 1)]
    pub dataset_id: u16,

    /// Dataset name suffix
    #[arg(long, default_value = "BPH_PCA")]
    pub dataset_name: String,

    /// Modality completeness policy
    #[arg(short, long, default_value = "similarity-fill")]
    pub policy: PolicyArg,

    /// Minimum number of present modalities (min-count, zero-fill, similarity-fill)
    #[arg(short = 'k', long, default_value_t = 4)]
    pub min_modalities: usize,

    /// Modality synthesized when absent (similarity-fill)
    #[arg(long, default_value = "t2-high-res")]
    pub estimable: ModalityArg,

    /// Modality the estimable one is synthesized from (similarity-fill)
    #[arg(long, default_value = "t2-no-fat-sat")]
    pub imputation_source: ModalityArg,

    /// Fraction of included cases assigned to training
    #[arg(long, default_value_t = 1.0)]
    pub train_ratio: f64,

    /// Seed of the train/test shuffle
    #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
    pub seed: u64,

    /// Label directory name under the source root
    #[arg(long, default_value = crate::types::DEFAULT_LABEL_DIR)]
    pub label_dir: String,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,

    /// Pre-computed reference statistics (JSON)
    #[arg(long, value_name = "FILE")]
    pub reference_stats: Option<PathBuf>,

    /// Maximum volumes read per modality when computing reference statistics
    #[arg(long)]
    pub stats_sample_limit: Option<usize>,

    /// Also write labels of test cases
    #[arg(long)]
    pub keep_test_labels: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Builds the run configuration from the parsed arguments
    pub fn to_config(&self) -> ConversionConfig {
        let k = self.min_modalities;
        let policy = match self.policy {
            PolicyArg::Strict => ModalityCompletenessPolicy::Strict,
            PolicyArg::Core => ModalityCompletenessPolicy::CoreSubset,
            PolicyArg::MinCount => ModalityCompletenessPolicy::MinimumCount(k),
            PolicyArg::ZeroFill => ModalityCompletenessPolicy::ZeroFill { min_count: k },
            PolicyArg::SimilarityFill => ModalityCompletenessPolicy::SimilarityFill {
                min_count: k,
                estimable: self.estimable.into(),
                source: self.imputation_source.into(),
            },
        };

        let mut config = ConversionConfig::new(&self.source, &self.output)
            .dataset_id(self.dataset_id)
            .dataset_name(&self.dataset_name)
            .with_policy(policy)
            .train_ratio(self.train_ratio)
            .split_seed(self.seed)
            .label_dir(&self.label_dir)
            .workers(self.workers)
            .keep_test_labels(self.keep_test_labels);

        if let Some(path) = &self.reference_stats {
            config = config.reference_stats(path);
        }
        if let Some(limit) = self.stats_sample_limit {
            config = config.stats_sample_limit(limit);
        }
        config
    }
}

/// Completeness policy options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// All five modalities required
    Strict,
    /// ADC, DWI and both T2 series required; high-res T2 ignored
    Core,
    /// At least k modalities; only present ones are written
    MinCount,
    /// At least k modalities; absent ones become zero channels
    ZeroFill,
    /// As zero-fill, but the estimable modality is synthesized from its source
    SimilarityFill,
}

/// Modality options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModalityArg {
    Adc,
    Dwi,
    #[value(name = "t2-fat-sat")]
    T2FatSat,
    #[value(name = "t2-no-fat-sat")]
    T2NoFatSat,
    #[value(name = "t2-high-res")]
    T2HighRes,
}

impl From<ModalityArg> for Modality {
    fn from(arg: ModalityArg) -> Self {
        match arg {
            ModalityArg::Adc => Modality::Adc,
            ModalityArg::Dwi => Modality::Dwi,
            ModalityArg::T2FatSat => Modality::T2FatSat,
            ModalityArg::T2NoFatSat => Modality::T2NoFatSat,
            ModalityArg::T2HighRes => Modality::T2HighRes,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["mmstack", "--source", "in", "--output", "out"]);
        let config = cli.to_config();

        assert_eq!(config.policy, ModalityCompletenessPolicy::default());
        assert_eq!(config.split_seed, DEFAULT_SPLIT_SEED);
        assert_eq!(config.dataset_dir(), PathBuf::from("out/Dataset001_BPH_PCA"));
        assert!(config.reference_stats.is_none());
    }

    #[test]
    fn test_policy_flags() {
        let cli = Cli::parse_from([
            "mmstack",
            "-s",
            "in",
            "-o",
            "out",
            "--policy",
            "min-count",
            "-k",
            "3",
            "--train-ratio",
            "0.8",
            "--stats-sample-limit",
            "10",
        ]);
        let config = cli.to_config();

        assert_eq!(config.policy, ModalityCompletenessPolicy::MinimumCount(3));
        assert_eq!(config.train_ratio, 0.8);
        assert_eq!(config.stats_sample_limit, Some(10));
    }

    #[test]
    fn test_similarity_fill_modalities() {
        let cli = Cli::parse_from([
            "mmstack",
            "-s",
            "in",
            "-o",
            "out",
            "--estimable",
            "dwi",
            "--imputation-source",
            "adc",
        ]);
        assert_eq!(
            cli.to_config().policy,
            ModalityCompletenessPolicy::SimilarityFill {
                min_count: 4,
                estimable: Modality::Dwi,
                source: Modality::Adc,
            }
        );
    }
}
