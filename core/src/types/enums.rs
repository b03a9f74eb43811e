use serde::{Deserialize, Serialize};
use std::fmt;

/// MRI acquisition channel
///
/// Variant order is the canonical channel order of the output volumes:
/// ADC (0), DWI (1), T2 fat-saturated (2), T2 without fat saturation (3),
/// high-resolution T2 (4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modality {
    #[serde(rename = "ADC")]
    Adc,
    #[serde(rename = "DWI")]
    Dwi,
    #[serde(rename = "T2_FatSat")]
    T2FatSat,
    #[serde(rename = "T2_NoFatSat")]
    T2NoFatSat,
    #[serde(rename = "T2_HighRes")]
    T2HighRes,
}

impl Modality {
    /// Full vocabulary in canonical channel order
    pub const ALL: [Modality; 5] = [
        Modality::Adc,
        Modality::Dwi,
        Modality::T2FatSat,
        Modality::T2NoFatSat,
        Modality::T2HighRes,
    ];

    /// Reduced vocabulary required by the core-subset policy
    pub const CORE: [Modality; 4] = [
        Modality::Adc,
        Modality::Dwi,
        Modality::T2FatSat,
        Modality::T2NoFatSat,
    ];

    /// Returns the channel name written to the manifest
    pub fn simple_name(&self) -> &'static str {
        match self {
            Modality::Adc => "ADC",
            Modality::Dwi => "DWI",
            Modality::T2FatSat => "T2_FatSat",
            Modality::T2NoFatSat => "T2_NoFatSat",
            Modality::T2HighRes => "T2_HighRes",
        }
    }

    /// Returns the canonical channel index
    pub fn channel_index(&self) -> usize {
        match self {
            Modality::Adc => 0,
            Modality::Dwi => 1,
            Modality::T2FatSat => 2,
            Modality::T2NoFatSat => 3,
            Modality::T2HighRes => 4,
        }
    }

    /// Parses a modality from a source directory name
    ///
    /// The name is lowercased and every run of non-alphanumeric characters is
    /// collapsed to `_` before matching, so `"T2 not fs"`, `"t2-not-fs"` and
    /// `"T2_NoFatSat"` all resolve. Returns `None` for unknown directories.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        let mut key = String::with_capacity(name.len());
        for c in name.trim().chars() {
            if c.is_alphanumeric() {
                key.extend(c.to_lowercase());
            } else if !key.ends_with('_') {
                key.push('_');
            }
        }
        let key = key.trim_matches('_');

        match key {
            "adc" => Some(Modality::Adc),
            "dwi" => Some(Modality::Dwi),
            "t2_fs" | "t2fs" | "t2_fatsat" | "t2_fat_sat" => Some(Modality::T2FatSat),
            "t2_not_fs" | "t2_notfs" | "t2_nofs" | "t2_nofatsat" | "t2_no_fatsat"
            | "t2_no_fat_sat" => Some(Modality::T2NoFatSat),
            "gaoqing_t2" | "t2_highres" | "t2_high_res" | "hr_t2" | "t2_hr" => {
                Some(Modality::T2HighRes)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Disease class of a case
///
/// The class decides both the source directory a case is found in and the
/// value its foreground voxels carry in the output label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiseaseClass {
    /// Benign prostatic hyperplasia
    #[serde(rename = "BPH")]
    Bph,
    /// Prostate cancer
    #[serde(rename = "PCA")]
    Pca,
}

impl DiseaseClass {
    pub const ALL: [DiseaseClass; 2] = [DiseaseClass::Bph, DiseaseClass::Pca];

    /// Name of the class directory, also used as the case key prefix
    pub fn dir_name(&self) -> &'static str {
        match self {
            DiseaseClass::Bph => "BPH",
            DiseaseClass::Pca => "PCA",
        }
    }

    /// Label value for this class (0 is background)
    pub fn label_value(&self) -> u8 {
        match self {
            DiseaseClass::Bph => 1,
            DiseaseClass::Pca => 2,
        }
    }
}

impl fmt::Display for DiseaseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
