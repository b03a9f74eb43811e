use crate::assembly::{
    split_cases, CaseWriter, OutputLayout, OutputManifest, Partition, RunReport, Split,
    WrittenCase,
};
use crate::collection::{CaseCollector, CaseRecord};
use crate::error::{ConvertError, Result};
use crate::evaluation::{evaluate, ChannelPlan, ChannelSource, Decision, ExclusionReason};
use crate::imputation::{compute_reference_stats, impute, ImputationProfile, ReferenceStats};
use crate::reconcile::{reconcile, CorpusProfile};
use crate::types::{ConversionConfig, DiseaseClass, Modality, ModalityCompletenessPolicy};
use crate::volume::{remap_label, NiftiIo, Volume, VolumeIo};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub const MANIFEST_FILE: &str = "dataset.json";
pub const REPORT_FILE: &str = "conversion_report.json";
pub const REFERENCE_STATS_FILE: &str = "reference_stats.json";

/// Converts a BPH/PCA source collection into a channel-stacked dataset
///
/// Runs the whole pipeline: collect cases, evaluate them against the
/// completeness policy, compute reference statistics when imputation may be
/// needed, split into train and test, then load, impute, reconcile and write
/// every included case on a worker pool. Per-case failures exclude that case
/// and are recorded in the returned [`RunReport`]; they never abort the run.
///
/// # Example
///
/// ```no_run
/// use mmstack_core::{ConversionConfig, DatasetConverter};
///
/// let config = ConversionConfig::new("data/BPH-PCA", "nnUNet_raw").train_ratio(0.8);
/// let report = DatasetConverter::new(config).run()?;
/// println!("{} cases written", report.included_count());
/// # Ok::<(), mmstack_core::ConvertError>(())
/// ```
pub struct DatasetConverter<I: VolumeIo = NiftiIo> {
    config: ConversionConfig,
    io: I,
}

impl DatasetConverter<NiftiIo> {
    /// Creates a converter reading and writing NIfTI files
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_io(config, NiftiIo)
    }
}

/// Everything a worker needs to process one case; shared read-only
struct CaseContext<'a> {
    io: &'a dyn VolumeIo,
    layout: &'a OutputLayout,
    imputation: Option<ImputationProfile>,
    primary: Option<Modality>,
}

type CaseOutcome = std::result::Result<WrittenCase, ExclusionReason>;

impl<I: VolumeIo> DatasetConverter<I> {
    /// Creates a converter with a custom volume accessor
    pub fn with_io(config: ConversionConfig, io: I) -> Self {
        Self { config, io }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Runs the conversion
    ///
    /// # Errors
    ///
    /// Only structural problems are errors:
    /// - invalid configuration
    /// - missing source root, or no case found under it
    /// - the dataset directory, manifest or report cannot be written
    pub fn run(&self) -> Result<RunReport> {
        let config = &self.config;
        config.validate()?;

        info!("Collecting cases from {}", config.source_root.display());
        let records = CaseCollector::new(&config.source_root, &config.label_dir).collect()?;
        if records.is_empty() {
            return Err(ConvertError::NoCasesFound(config.source_root.clone()));
        }

        let dataset_dir = config.dataset_dir();
        let mut report = RunReport {
            dataset_dir: dataset_dir.clone(),
            policy: config.policy.to_string(),
            discovered: records.len(),
            ..Default::default()
        };
        for modality in Modality::ALL {
            report.available.insert(modality, 0);
        }
        for class in DiseaseClass::ALL {
            report.included_by_class.insert(class, 0);
        }

        // Evaluate
        let decisions: Vec<Decision> = records
            .iter()
            .map(|record| evaluate(record, &config.policy))
            .collect();
        for (record, decision) in records.iter().zip(&decisions) {
            report.record_discovered(record);
            if record.is_degraded() {
                report.degraded.push(record.key());
            }
            if let Some(reason) = decision.reason() {
                warn!("Excluding {}: {}", record.key(), reason);
                report.exclude(record.key(), reason);
            }
        }
        let candidates: Vec<(&CaseRecord, &ChannelPlan)> = records
            .iter()
            .zip(&decisions)
            .filter_map(|(record, decision)| decision.plan().map(|plan| (record, plan)))
            .collect();
        for (record, plan) in &candidates {
            debug!("{}: {}", record.key(), plan);
        }
        info!(
            "{} of {} cases pass policy {}",
            decisions.iter().filter(|d| d.is_included()).count(),
            records.len(),
            config.policy
        );

        let corpus = CorpusProfile::from_plans(candidates.iter().map(|(_, plan)| *plan));
        let primary = corpus.primary_modality();
        if let Some(primary) = primary {
            info!("Reference grid modality: {}", primary);
        }

        let layout = OutputLayout::new(&dataset_dir, config.keep_test_labels);
        layout.create()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()?;
        info!("Using {} workers", pool.current_num_threads());

        let imputation = self.imputation_profile(&pool, &records, &candidates)?;

        // Split
        let keys: Vec<String> = candidates.iter().map(|(r, _)| r.key()).collect();
        let mut split = split_cases(&keys, config.train_ratio, config.split_seed);
        info!(
            "Split: {} train, {} test (seed {})",
            split.train.len(),
            split.test.len(),
            config.split_seed
        );

        // Process
        let context = CaseContext {
            io: &self.io,
            layout: &layout,
            imputation,
            primary,
        };
        let outcomes = process_all(&pool, &context, &candidates, &split);

        // Merge
        let mut written = Vec::new();
        for ((record, plan), outcome) in candidates.iter().zip(outcomes) {
            match outcome {
                Ok(case) => {
                    if plan.imputed_count() > 0 {
                        report.imputed.push(case.key.clone());
                    }
                    report.record_included(record.class, plan);
                    written.push(case);
                }
                Err(reason) => report.exclude(record.key(), reason),
            }
        }
        split.retain(|key| written.iter().any(|w| w.key == key));
        report.train = split.train.clone();
        report.test = split.test.clone();
        report.normalize();

        let channels = output_channels(&config.policy, &written);
        report.channel_names = channels
            .as_ref()
            .map(|channels| channels.iter().map(|m| m.simple_name().to_string()).collect());

        let keep: BTreeSet<PathBuf> = written
            .iter()
            .flat_map(|w| std::iter::once(w.image.clone()).chain(w.label.clone()))
            .collect();
        let stale = layout.remove_stale(&keep)?;
        if stale > 0 {
            warn!("Removed {} files left by a previous run", stale);
        }

        let ordered = order_by_split(&written, &split);
        OutputManifest::new(
            &config.dataset_name,
            config.dataset_id,
            format!("BPH/PCA prostate MRI, policy {}", config.policy),
            channels.as_deref(),
            &ordered,
        )
        .write(&dataset_dir.join(MANIFEST_FILE))?;
        report.write(&dataset_dir.join(REPORT_FILE))?;

        if let Err(e) = std::fs::remove_dir(layout.staging_root()) {
            debug!("Staging directory not removed: {}", e);
        }

        info!(
            "Wrote {} cases ({} train, {} test), excluded {}, degraded {}",
            report.included_count(),
            report.train.len(),
            report.test.len(),
            report.excluded_count(),
            report.degraded.len()
        );

        Ok(report)
    }

    /// Builds the imputation profile once, before any case is processed
    fn imputation_profile(
        &self,
        pool: &ThreadPool,
        records: &[CaseRecord],
        candidates: &[(&CaseRecord, &ChannelPlan)],
    ) -> Result<Option<ImputationProfile>> {
        let Some((source, estimable)) = self.config.policy.imputation_pair() else {
            return Ok(None);
        };
        if candidates.iter().all(|(_, plan)| plan.imputed_count() == 0) {
            debug!("No case needs imputation");
            return Ok(None);
        }

        let stats = match &self.config.reference_stats {
            Some(path) => {
                info!("Loading reference statistics from {}", path.display());
                ReferenceStats::load(path)?
            }
            None => {
                info!("Computing reference statistics for {} and {}", source, estimable);
                pool.install(|| {
                    compute_reference_stats(
                        records,
                        &[source, estimable],
                        &self.io,
                        self.config.stats_sample_limit,
                    )
                })
            }
        };
        stats.save(&self.config.dataset_dir().join(REFERENCE_STATS_FILE))?;

        Ok(Some(ImputationProfile::from_reference(&stats, source, estimable)))
    }
}

/// Processes every candidate on the worker pool; outcomes are in input order
fn process_all(
    pool: &ThreadPool,
    context: &CaseContext<'_>,
    candidates: &[(&CaseRecord, &ChannelPlan)],
    split: &Split,
) -> Vec<CaseOutcome> {
    info!("Processing {} cases", candidates.len());
    pool.install(|| {
        candidates
            .par_iter()
            .map(|(record, plan)| {
                let partition = split
                    .partition_of(&record.key())
                    .unwrap_or(Partition::Train);
                process_case(context, record, plan, partition)
            })
            .collect()
    })
}

/// Load, impute, reconcile and write one case
fn process_case(
    context: &CaseContext<'_>,
    record: &CaseRecord,
    plan: &ChannelPlan,
    partition: Partition,
) -> CaseOutcome {
    let key = record.key();

    let label_path = record.label.as_ref().ok_or(ExclusionReason::NoLabel)?;
    let label = read_volume(context.io, &key, label_path)?;
    let label = remap_label(&label, record.class.label_value());

    let mut loaded: BTreeMap<Modality, Volume<f32>> = BTreeMap::new();
    for modality in plan.real_modalities() {
        let path = record
            .modalities
            .get(&modality)
            .ok_or(ExclusionReason::UnreadableVolume)?;
        loaded.insert(modality, read_volume(context.io, &key, path)?);
    }

    let mut channels = Vec::with_capacity(plan.len());
    for entry in &plan.channels {
        let channel = match *entry {
            ChannelSource::Real(m) => loaded.get(&m).cloned(),
            ChannelSource::NeedsImputation { target, source } => {
                let base = match loaded.get(&source) {
                    Some(volume) => volume.clone(),
                    None => {
                        let path = record
                            .modalities
                            .get(&source)
                            .ok_or(ExclusionReason::NoImputationSource)?;
                        read_volume(context.io, &key, path)?
                    }
                };
                let profile = context
                    .imputation
                    .unwrap_or_else(ImputationProfile::identity);
                debug!("{}: imputing {} from {}", key, target, source);
                Some(impute(&base, &profile))
            }
            ChannelSource::Placeholder(_) => None,
        };
        channels.push(channel);
    }

    let resolved = reconcile(record.clone(), plan.clone(), channels, label, context.primary)?;

    CaseWriter::new(context.io, context.layout)
        .write_case(&resolved, partition)
        .map_err(|e| {
            warn!("Failed to write {}: {}", key, e);
            ExclusionReason::WriteFailure
        })
}

fn read_volume(
    io: &dyn VolumeIo,
    key: &str,
    path: &std::path::Path,
) -> std::result::Result<Volume<f32>, ExclusionReason> {
    io.read(path).map_err(|e| {
        warn!("{}: cannot read {}: {}", key, path.display(), e);
        ExclusionReason::UnreadableVolume
    })
}

/// Channel list shared by every written case
///
/// Fixed-count policies always have one. Under `MinimumCount` the list is
/// `None`, with a warning, when written cases carry different channels; the
/// manifest then only lists channels per case.
fn output_channels(
    policy: &ModalityCompletenessPolicy,
    written: &[WrittenCase],
) -> Option<Vec<Modality>> {
    if let Some(fixed) = policy.fixed_channels() {
        return Some(fixed.to_vec());
    }

    let mut lists: BTreeSet<&[Modality]> =
        written.iter().map(|w| w.channels.as_slice()).collect();
    if lists.len() > 1 {
        warn!(
            "Channels differ between cases ({} variants); see case_channels in the manifest",
            lists.len()
        );
        return None;
    }
    lists.pop_first().map(<[Modality]>::to_vec)
}

/// Written cases in split order: training keys first, then test keys
fn order_by_split(written: &[WrittenCase], split: &Split) -> Vec<WrittenCase> {
    let by_key: BTreeMap<&str, &WrittenCase> =
        written.iter().map(|w| (w.key.as_str(), w)).collect();
    split
        .train
        .iter()
        .chain(split.test.iter())
        .filter_map(|k| by_key.get(k.as_str()).map(|w| (*w).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(key: &str, channels: &[Modality]) -> WrittenCase {
        WrittenCase {
            key: key.to_string(),
            partition: Partition::Train,
            image: PathBuf::from(format!("imagesTrain/{}.nii.gz", key)),
            label: Some(PathBuf::from(format!("labelsTrain/{}.nii.gz", key))),
            channels: channels.to_vec(),
        }
    }

    #[test]
    fn test_output_channels_fixed_policies() {
        assert_eq!(
            output_channels(&ModalityCompletenessPolicy::CoreSubset, &[]),
            Some(Modality::CORE.to_vec())
        );
        assert_eq!(
            output_channels(&ModalityCompletenessPolicy::default(), &[]),
            Some(Modality::ALL.to_vec())
        );
    }

    #[test]
    fn test_output_channels_minimum_count() {
        let policy = ModalityCompletenessPolicy::MinimumCount(2);
        let same = [
            written("BPH_a", &[Modality::Adc, Modality::Dwi]),
            written("BPH_b", &[Modality::Adc, Modality::Dwi]),
        ];
        assert_eq!(
            output_channels(&policy, &same),
            Some(vec![Modality::Adc, Modality::Dwi])
        );

        let mixed = [
            written("BPH_a", &Modality::ALL),
            written("BPH_b", &[Modality::T2NoFatSat, Modality::T2HighRes]),
        ];
        assert_eq!(output_channels(&policy, &mixed), None);
        assert_eq!(output_channels(&policy, &[]), None);
    }

    #[test]
    fn test_missing_source_root() {
        let config = ConversionConfig::new("/nonexistent/source", "/tmp/out");
        assert!(matches!(
            DatasetConverter::new(config).run(),
            Err(ConvertError::SourceRootMissing(_))
        ));
    }
}
