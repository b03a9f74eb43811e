use super::case_id::normalize_case_id;
use super::record::CaseRecord;
use crate::error::{ConvertError, Result};
use crate::types::{DiseaseClass, Modality};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Groups per-modality volume files into per-case records
///
/// Expected layout:
///
/// ```text
/// <root>/BPH/<modality dir>/<case>.nii[.gz]
/// <root>/PCA/<modality dir>/<case>.nii[.gz]
/// <root>/<label dir>/BPH/<case>.nii[.gz]
/// <root>/<label dir>/PCA/<case>.nii[.gz]
/// ```
pub struct CaseCollector {
    root: PathBuf,
    label_dir: String,
}

impl CaseCollector {
    /// Creates a collector for `root` with the given label directory name
    pub fn new(root: impl Into<PathBuf>, label_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            label_dir: label_dir.into(),
        }
    }

    /// Scans the source tree and returns records sorted by class, then case id
    ///
    /// Directory entries are visited in file-name order, so the file kept on a
    /// case-id conflict is reproducible.
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::SourceRootMissing` if the root is not a
    /// directory, or an I/O error if a directory cannot be listed.
    pub fn collect(&self) -> Result<Vec<CaseRecord>> {
        if !self.root.is_dir() {
            return Err(ConvertError::SourceRootMissing(self.root.clone()));
        }

        let mut records = Vec::new();
        for class in DiseaseClass::ALL {
            let class_records = self.collect_class(class)?;
            info!("Found {} {} cases", class_records.len(), class);
            records.extend(class_records.into_values());
        }

        Ok(records)
    }

    fn collect_class(&self, class: DiseaseClass) -> Result<BTreeMap<String, CaseRecord>> {
        let mut cases: BTreeMap<String, CaseRecord> = BTreeMap::new();

        let class_dir = self.root.join(class.dir_name());
        if class_dir.is_dir() {
            for modality_dir in sorted_entries(&class_dir)? {
                if !modality_dir.is_dir() {
                    continue;
                }
                let dir_name = file_name(&modality_dir);
                let Some(modality) = Modality::from_dir_name(&dir_name) else {
                    warn!("Skipping unknown modality directory: {}", modality_dir.display());
                    continue;
                };
                self.collect_modality(class, modality, &modality_dir, &mut cases)?;
            }
        } else {
            warn!("Class directory not found: {}", class_dir.display());
        }

        let label_dir = self.root.join(&self.label_dir).join(class.dir_name());
        if label_dir.is_dir() {
            self.collect_labels(class, &label_dir, &mut cases)?;
        } else {
            warn!("Label directory not found: {}", label_dir.display());
        }

        for record in cases.values().filter(|r| !r.has_label()) {
            warn!("Case {} has no label", record.key());
        }

        Ok(cases)
    }

    fn collect_modality(
        &self,
        class: DiseaseClass,
        modality: Modality,
        dir: &Path,
        cases: &mut BTreeMap<String, CaseRecord>,
    ) -> Result<()> {
        for path in volume_files(dir)? {
            let Some(case_id) = normalize_case_id(&file_name(&path)) else {
                continue;
            };

            let record = cases
                .entry(case_id.clone())
                .or_insert_with(|| CaseRecord::new(case_id, class));

            if let Some(kept) = record.modalities.get(&modality) {
                warn!(
                    "Duplicate case id {} for {}: keeping {}, ignoring {}",
                    record.key(),
                    modality,
                    kept.display(),
                    path.display()
                );
                if !record.duplicate_modalities.contains(&modality) {
                    record.duplicate_modalities.push(modality);
                }
            } else {
                debug!("{} {} -> {}", record.key(), modality, path.display());
                record.modalities.insert(modality, path);
            }
        }
        Ok(())
    }

    fn collect_labels(
        &self,
        class: DiseaseClass,
        dir: &Path,
        cases: &mut BTreeMap<String, CaseRecord>,
    ) -> Result<()> {
        for path in volume_files(dir)? {
            let Some(case_id) = normalize_case_id(&file_name(&path)) else {
                continue;
            };

            let record = cases.entry(case_id.clone()).or_insert_with(|| {
                warn!(
                    "Label {} matches no image files",
                    path.display()
                );
                CaseRecord::new(case_id, class)
            });

            if let Some(kept) = &record.label {
                warn!(
                    "Ambiguous label for {}: {} and {}",
                    record.key(),
                    kept.display(),
                    path.display()
                );
                record.label_ambiguous = true;
            } else {
                record.label = Some(path);
            }
        }
        Ok(())
    }
}

fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

fn volume_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && crate::volume::is_volume_file_name(&file_name(p)))
        .collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn touch(root: &Path, parts: &[&str]) {
        let mut path = root.to_path_buf();
        for part in parts {
            path.push(part);
        }
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let collector = CaseCollector::new(temp_dir.path().join("nope"), "ROI(BPH+PCA)");
        assert!(matches!(
            collector.collect(),
            Err(ConvertError::SourceRootMissing(_))
        ));
    }

    #[test]
    fn test_groups_files_across_modalities() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, &["BPH", "ADC", "Patient 1.nii"]);
        touch(root, &["BPH", "DWI", "patient_1_dwi.nii.gz"]);
        touch(root, &["BPH", "T2 fs", "PATIENT-1.nii"]);
        touch(root, &["BPH", "notes", "patient_1.nii"]);
        touch(root, &["BPH", "ADC", "readme.txt"]);
        touch(root, &["ROI(BPH+PCA)", "BPH", "patient 1.nii"]);

        let records = CaseCollector::new(root, "ROI(BPH+PCA)").collect().unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.case_id, "patient_1");
        assert_eq!(record.class, DiseaseClass::Bph);
        assert_eq!(record.present_count(), 3);
        assert!(record.has(Modality::T2FatSat));
        assert!(record.has_label());
        assert!(!record.is_degraded());
    }

    #[test]
    fn test_same_id_in_two_classes_stays_separate() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, &["BPH", "ADC", "p1.nii"]);
        touch(root, &["PCA", "ADC", "p1.nii"]);

        let records = CaseCollector::new(root, "ROI(BPH+PCA)").collect().unwrap();

        let keys: Vec<_> = records.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["BPH_p1", "PCA_p1"]);
    }

    #[test]
    fn test_duplicate_keeps_first_and_degrades() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, &["PCA", "ADC", "p1.nii"]);
        touch(root, &["PCA", "ADC", "P1_adc.nii.gz"]);
        touch(root, &["ROI(BPH+PCA)", "PCA", "p1.nii"]);

        let records = CaseCollector::new(root, "ROI(BPH+PCA)").collect().unwrap();

        let record = &records[0];
        // "P1_adc.nii.gz" sorts before "p1.nii"
        assert_eq!(
            record.modalities[&Modality::Adc].file_name().unwrap(),
            "P1_adc.nii.gz"
        );
        assert_eq!(record.duplicate_modalities, vec![Modality::Adc]);
        assert!(!record.label_ambiguous);
        assert!(record.is_degraded());
    }

    #[test]
    fn test_ambiguous_label() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, &["BPH", "ADC", "p1.nii"]);
        touch(root, &["ROI(BPH+PCA)", "BPH", "p1.nii"]);
        touch(root, &["ROI(BPH+PCA)", "BPH", "p1_roi.nii"]);

        let records = CaseCollector::new(root, "ROI(BPH+PCA)").collect().unwrap();

        assert!(records[0].label_ambiguous);
    }

    #[test]
    fn test_label_less_and_label_only_cases_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, &["BPH", "ADC", "imaged.nii"]);
        touch(root, &["ROI(BPH+PCA)", "BPH", "orphan.nii"]);

        let records = CaseCollector::new(root, "ROI(BPH+PCA)").collect().unwrap();

        assert_eq!(records.len(), 2);
        let imaged = records.iter().find(|r| r.case_id == "imaged").unwrap();
        assert!(!imaged.has_label());
        let orphan = records.iter().find(|r| r.case_id == "orphan").unwrap();
        assert!(orphan.has_label());
        assert_eq!(orphan.present_count(), 0);
    }
}
