use crate::types::{DiseaseClass, Modality};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One discovered case: its modality files and label file
///
/// Created once during collection and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    /// Normalized case identifier, unique within its class
    pub case_id: String,

    /// Disease class the case was found under
    pub class: DiseaseClass,

    /// Volume file per present modality (first-seen file on conflicts)
    pub modalities: BTreeMap<Modality, PathBuf>,

    /// Label file, if one was found
    pub label: Option<PathBuf>,

    /// Modalities for which more than one file normalized to this case id
    pub duplicate_modalities: Vec<Modality>,

    /// Whether more than one label file normalized to this case id
    pub label_ambiguous: bool,
}

impl CaseRecord {
    /// Creates an empty record
    pub fn new(case_id: impl Into<String>, class: DiseaseClass) -> Self {
        Self {
            case_id: case_id.into(),
            class,
            modalities: BTreeMap::new(),
            label: None,
            duplicate_modalities: Vec::new(),
            label_ambiguous: false,
        }
    }

    /// Builder: add a modality file
    pub fn with_modality(mut self, modality: Modality, path: impl Into<PathBuf>) -> Self {
        self.modalities.insert(modality, path.into());
        self
    }

    /// Builder: set the label file
    pub fn with_label(mut self, path: impl Into<PathBuf>) -> Self {
        self.label = Some(path.into());
        self
    }

    /// Key used for output file names, unique across classes (e.g. `BPH_patient_001`)
    pub fn key(&self) -> String {
        format!("{}_{}", self.class.dir_name(), self.case_id)
    }

    /// Checks if a modality is present
    pub fn has(&self, modality: Modality) -> bool {
        self.modalities.contains_key(&modality)
    }

    /// Number of present vocabulary modalities
    pub fn present_count(&self) -> usize {
        self.modalities.len()
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    /// Whether any file conflict was detected for this case
    pub fn is_degraded(&self) -> bool {
        !self.duplicate_modalities.is_empty() || self.label_ambiguous
    }
}
