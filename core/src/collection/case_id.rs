use crate::volume::strip_volume_extension;
use regex::Regex;
use std::sync::OnceLock;

/// Trailing tokens that name a modality or a label set rather than a patient
const KNOWN_SUFFIXES: &[&str] = &[
    "adc", "dwi", "t2", "fs", "not", "nofs", "fatsat", "nofatsat", "highres", "hr", "gaoqing",
    "roi", "label", "labels", "seg", "mask",
];

/// Derives a case identifier from a volume file name
///
/// Files of the same patient found in different modality and label
/// directories normalize to the same identifier:
///
/// 1. Strip `.nii.gz` / `.nii` (case-insensitive); other files yield `None`
/// 2. Lowercase
/// 3. Collapse runs of whitespace, `_`, `-` and `.` into a single `_`
/// 4. Trim separators from both ends
/// 5. Drop trailing known suffix tokens (`_adc`, `_t2_not_fs`, `_roi`, ...)
///    while more than one token remains
///
/// | file name                | case id       |
/// |--------------------------|---------------|
/// | `Patient 001.nii`        | `patient_001` |
/// | `patient-001_ADC.nii.gz` | `patient_001` |
/// | `p.17_T2_not_fs.nii`     | `p_17`        |
/// | `case7_roi.nii.gz`       | `case7`       |
pub fn normalize_case_id(file_name: &str) -> Option<String> {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[\s_.\-]+").expect("Failed to compile regex"));

    let stem = strip_volume_extension(file_name)?;
    let lower = stem.to_lowercase();
    let collapsed = re.replace_all(&lower, "_");

    let mut tokens: Vec<&str> = collapsed
        .trim_matches('_')
        .split('_')
        .filter(|t| !t.is_empty())
        .collect();

    while tokens.len() > 1 {
        match tokens.last() {
            Some(last) if KNOWN_SUFFIXES.contains(last) => {
                tokens.pop();
            }
            _ => break,
        }
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join("_"))
    }
}
