use super::{Modality, ModalityCompletenessPolicy};
use crate::error::{ConvertError, Result};
use std::path::PathBuf;

/// Fixed seed of the train/test shuffle
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Name of the label directory under the source root
pub const DEFAULT_LABEL_DIR: &str = "ROI(BPH+PCA)";

/// Configuration for a conversion run
///
/// # Example
///
/// ```
/// use mmstack_core::{ConversionConfig, ModalityCompletenessPolicy};
///
/// let config = ConversionConfig::new("data/BPH-PCA", "nnUNet_raw")
///     .dataset_id(7)
///     .with_policy(ModalityCompletenessPolicy::MinimumCount(3))
///     .train_ratio(0.8);
///
/// assert_eq!(config.dataset_dir_name(), "Dataset007_BPH_PCA");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Root holding the per-class modality directories and the label directory
    pub source_root: PathBuf,

    /// Directory the dataset directory is created in
    pub output_root: PathBuf,

    /// Numeric dataset identifier
    pub dataset_id: u16,

    /// Dataset name suffix
    pub dataset_name: String,

    /// Fraction of included cases assigned to training
    pub train_ratio: f64,

    /// Seed of the deterministic train/test shuffle
    pub split_seed: u64,

    /// Completeness policy
    pub policy: ModalityCompletenessPolicy,

    /// Label directory name under `source_root`
    pub label_dir: String,

    /// Worker threads for per-case processing (0 = one per CPU)
    pub workers: usize,

    /// Pre-computed reference statistics to use instead of scanning the corpus
    pub reference_stats: Option<PathBuf>,

    /// Cap on volumes read per modality when computing reference statistics
    pub stats_sample_limit: Option<usize>,

    /// Also write labels of test cases (to `labelsTest/`)
    pub keep_test_labels: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("data/BPH-PCA"),
            output_root: PathBuf::from("nnUNet_raw"),
            dataset_id: 1,
            dataset_name: "BPH_PCA".to_string(),
            train_ratio: 1.0, // Default: everything goes to training
            split_seed: DEFAULT_SPLIT_SEED,
            policy: ModalityCompletenessPolicy::default(),
            label_dir: DEFAULT_LABEL_DIR.to_string(),
            workers: 0,
            reference_stats: None,
            stats_sample_limit: None,
            keep_test_labels: false,
        }
    }
}

impl ConversionConfig {
    /// Creates a config with default settings for the given roots
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// Builder: Set dataset identifier
    pub fn dataset_id(mut self, id: u16) -> Self {
        self.dataset_id = id;
        self
    }

    /// Builder: Set dataset name suffix
    pub fn dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }

    /// Builder: Set train ratio
    pub fn train_ratio(mut self, ratio: f64) -> Self {
        self.train_ratio = ratio;
        self
    }

    /// Builder: Set split seed
    pub fn split_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self
    }

    /// Builder: Set completeness policy
    pub fn with_policy(mut self, policy: ModalityCompletenessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder: Set label directory name
    pub fn label_dir(mut self, name: impl Into<String>) -> Self {
        self.label_dir = name.into();
        self
    }

    /// Builder: Set worker count
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder: Load reference statistics from a file
    pub fn reference_stats(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_stats = Some(path.into());
        self
    }

    /// Builder: Cap volumes read per modality for statistics
    pub fn stats_sample_limit(mut self, limit: usize) -> Self {
        self.stats_sample_limit = Some(limit);
        self
    }

    /// Builder: Keep test labels
    pub fn keep_test_labels(mut self, keep: bool) -> Self {
        self.keep_test_labels = keep;
        self
    }

    /// Name of the dataset directory, e.g. `Dataset001_BPH_PCA`
    pub fn dataset_dir_name(&self) -> String {
        format!("Dataset{:03}_{}", self.dataset_id, self.dataset_name)
    }

    /// Full path of the dataset directory
    pub fn dataset_dir(&self) -> PathBuf {
        self.output_root.join(self.dataset_dir_name())
    }

    /// Rejects inconsistent settings
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::InvalidConfig` if:
    /// - the train ratio is outside `[0, 1]`
    /// - a minimum modality count is 0 or exceeds the vocabulary size
    /// - the estimable modality is its own imputation source
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.train_ratio) {
            return Err(ConvertError::InvalidConfig(format!(
                "train ratio must be within [0, 1], got {}",
                self.train_ratio
            )));
        }

        if let Some(k) = self.policy.min_count() {
            if k == 0 || k > Modality::ALL.len() {
                return Err(ConvertError::InvalidConfig(format!(
                    "minimum modality count must be within 1..={}, got {}",
                    Modality::ALL.len(),
                    k
                )));
            }
        }

        if let ModalityCompletenessPolicy::SimilarityFill {
            estimable, source, ..
        } = self.policy
        {
            if estimable == source {
                return Err(ConvertError::InvalidConfig(format!(
                    "{} cannot be imputed from itself",
                    estimable
                )));
            }
        }

        if self.dataset_name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "dataset name must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
