use crate::collection::CaseRecord;
use crate::error::Result;
use crate::evaluation::{ChannelPlan, ChannelSource, ExclusionReason};
use crate::types::{DiseaseClass, Modality};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// How one modality's channel was filled across the written cases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelUsage {
    pub real: usize,
    pub imputed: usize,
    pub placeholder: usize,
}

/// Run-level outcome: what was written, what was left out and why
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub dataset_dir: PathBuf,
    pub policy: String,
    /// Channel list shared by every written case; `None` when it varies
    pub channel_names: Option<Vec<String>>,
    pub discovered: usize,
    /// Source files found per modality over all discovered cases
    pub available: BTreeMap<Modality, usize>,
    /// Written cases per disease class
    pub included_by_class: BTreeMap<DiseaseClass, usize>,
    /// Channel sources per modality over the written cases
    pub channel_usage: BTreeMap<Modality, ChannelUsage>,
    pub train: Vec<String>,
    pub test: Vec<String>,
    /// Case keys grouped by exclusion reason
    pub excluded: BTreeMap<ExclusionReason, Vec<String>>,
    /// Included or not, cases where a file conflict was detected
    pub degraded: Vec<String>,
    /// Written cases with at least one imputed channel
    pub imputed: Vec<String>,
}

impl RunReport {
    pub fn included_count(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.values().map(Vec::len).sum()
    }

    pub fn exclude(&mut self, key: impl Into<String>, reason: ExclusionReason) {
        self.excluded.entry(reason).or_default().push(key.into());
    }

    /// Counts the modality files of a discovered case
    pub fn record_discovered(&mut self, record: &CaseRecord) {
        for modality in record.modalities.keys() {
            *self.available.entry(*modality).or_default() += 1;
        }
    }

    /// Counts a written case and the source of each of its channels
    pub fn record_included(&mut self, class: DiseaseClass, plan: &ChannelPlan) {
        *self.included_by_class.entry(class).or_default() += 1;
        for channel in &plan.channels {
            let usage = self.channel_usage.entry(channel.modality()).or_default();
            match channel {
                ChannelSource::Real(_) => usage.real += 1,
                ChannelSource::NeedsImputation { .. } => usage.imputed += 1,
                ChannelSource::Placeholder(_) => usage.placeholder += 1,
            }
        }
    }

    /// Sorts the per-reason key lists so the report does not depend on worker order
    pub fn normalize(&mut self) {
        for keys in self.excluded.values_mut() {
            keys.sort();
        }
        self.degraded.sort();
        self.imputed.sort();
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = RunReport {
            train: vec!["BPH_a".into(), "BPH_b".into()],
            test: vec!["PCA_c".into()],
            ..Default::default()
        };
        report.exclude("PCA_z", ExclusionReason::NoLabel);
        report.exclude("PCA_y", ExclusionReason::NoLabel);
        report.exclude("BPH_x", ExclusionReason::WriteFailure);
        report.normalize();

        assert_eq!(report.included_count(), 3);
        assert_eq!(report.excluded_count(), 3);
        assert_eq!(report.excluded[&ExclusionReason::NoLabel], vec!["PCA_y", "PCA_z"]);
    }

    #[test]
    fn test_inventory_counts() {
        let mut record = CaseRecord::new("p1", DiseaseClass::Pca);
        record
            .modalities
            .insert(Modality::Adc, PathBuf::from("PCA/ADC/p1.nii"));
        record
            .modalities
            .insert(Modality::T2NoFatSat, PathBuf::from("PCA/T2 not fs/p1.nii"));

        let plan = ChannelPlan::new(vec![
            ChannelSource::Real(Modality::Adc),
            ChannelSource::Placeholder(Modality::Dwi),
            ChannelSource::Real(Modality::T2NoFatSat),
            ChannelSource::NeedsImputation {
                target: Modality::T2HighRes,
                source: Modality::T2NoFatSat,
            },
        ]);

        let mut report = RunReport::default();
        report.record_discovered(&record);
        report.record_included(DiseaseClass::Pca, &plan);
        report.record_included(DiseaseClass::Pca, &plan);

        assert_eq!(report.available[&Modality::Adc], 1);
        assert!(!report.available.contains_key(&Modality::Dwi));
        assert_eq!(report.included_by_class[&DiseaseClass::Pca], 2);
        assert_eq!(
            report.channel_usage[&Modality::T2HighRes],
            ChannelUsage {
                real: 0,
                imputed: 2,
                placeholder: 0
            }
        );
        assert_eq!(report.channel_usage[&Modality::Dwi].placeholder, 2);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["included_by_class"]["PCA"], 2);
        assert_eq!(json["channel_usage"]["T2_HighRes"]["imputed"], 2);
    }

    #[test]
    fn test_json_keys_are_reason_names() {
        let mut report = RunReport::default();
        report.exclude("BPH_a", ExclusionReason::NoImputationSource);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["excluded"]["NoImputationSource"][0], "BPH_a");
    }
}
