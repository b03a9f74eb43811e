use super::layout::FILE_ENDING;
use super::split::Partition;
use super::writer::WrittenCase;
use crate::error::Result;
use crate::types::{DiseaseClass, Modality};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Label value of voxels outside any lesion
pub const BACKGROUND_LABEL: u8 = 0;

/// Label name to value mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    pub background: u8,
    #[serde(rename = "BPH")]
    pub bph: u8,
    #[serde(rename = "PCA")]
    pub pca: u8,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            background: BACKGROUND_LABEL,
            bph: DiseaseClass::Bph.label_value(),
            pca: DiseaseClass::Pca.label_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEntry {
    pub image: String,
    pub label: String,
}

/// Dataset description written as `dataset.json`
///
/// Shaped like an nnU-Net v2 `dataset.json`, plus the train/test key lists
/// and the channel modalities of every case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputManifest {
    pub name: String,
    pub dataset_id: u16,
    pub description: String,
    /// Channel index (as a string) to modality name; absent when cases
    /// carry different channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_names: Option<BTreeMap<String, String>>,
    pub labels: LabelMap,
    #[serde(rename = "numTraining")]
    pub num_training: usize,
    #[serde(rename = "numTest")]
    pub num_test: usize,
    pub file_ending: String,
    pub training: Vec<TrainingEntry>,
    pub test: Vec<String>,
    pub train_cases: Vec<String>,
    pub test_cases: Vec<String>,
    /// Case key to the modality of each of its image channels
    pub case_channels: BTreeMap<String, Vec<String>>,
}

impl OutputManifest {
    /// Builds the manifest from the cases that were written
    ///
    /// `written` must be in output order; training and test entries keep it.
    /// `channels` is the channel list shared by every case, `None` if there
    /// is none.
    pub fn new(
        name: impl Into<String>,
        dataset_id: u16,
        description: impl Into<String>,
        channels: Option<&[Modality]>,
        written: &[WrittenCase],
    ) -> Self {
        let channel_names = channels.map(|channels| {
            channels
                .iter()
                .enumerate()
                .map(|(i, m)| (i.to_string(), m.simple_name().to_string()))
                .collect()
        });
        let case_channels = written
            .iter()
            .map(|case| (case.key.clone(), channel_list(&case.channels)))
            .collect();

        let mut training = Vec::new();
        let mut test = Vec::new();
        let mut train_cases = Vec::new();
        let mut test_cases = Vec::new();

        for case in written {
            let image = rel_string(&case.image);
            match (case.partition, &case.label) {
                (Partition::Train, Some(label)) => {
                    training.push(TrainingEntry {
                        image,
                        label: rel_string(label),
                    });
                    train_cases.push(case.key.clone());
                }
                (Partition::Train, None) => {
                    train_cases.push(case.key.clone());
                }
                (Partition::Test, _) => {
                    test.push(image);
                    test_cases.push(case.key.clone());
                }
            }
        }

        Self {
            name: name.into(),
            dataset_id,
            description: description.into(),
            channel_names,
            labels: LabelMap::default(),
            num_training: train_cases.len(),
            num_test: test_cases.len(),
            file_ending: FILE_ENDING.to_string(),
            training,
            test,
            train_cases,
            test_cases,
            case_channels,
        }
    }

    /// Writes the manifest; consumes it so it is written exactly once
    pub fn write(self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self)?;
        Ok(())
    }
}

fn channel_list(channels: &[Modality]) -> Vec<String> {
    channels.iter().map(|m| m.simple_name().to_string()).collect()
}

fn rel_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("./{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn written() -> Vec<WrittenCase> {
        vec![
            WrittenCase {
                key: "BPH_a".to_string(),
                partition: Partition::Train,
                image: PathBuf::from("imagesTrain/BPH_a.nii.gz"),
                label: Some(PathBuf::from("labelsTrain/BPH_a.nii.gz")),
                channels: Modality::CORE.to_vec(),
            },
            WrittenCase {
                key: "PCA_b".to_string(),
                partition: Partition::Test,
                image: PathBuf::from("imagesTest/PCA_b.nii.gz"),
                label: None,
                channels: Modality::CORE.to_vec(),
            },
        ]
    }

    #[test]
    fn test_manifest_content() {
        let manifest = OutputManifest::new("BPH_PCA", 3, "test", Some(&Modality::ALL), &written());

        let channel_names = manifest.channel_names.as_ref().unwrap();
        assert_eq!(channel_names.len(), 5);
        assert_eq!(channel_names["4"], "T2_HighRes");
        assert_eq!(manifest.num_training, 1);
        assert_eq!(manifest.num_test, 1);
        assert_eq!(manifest.training[0].image, "./imagesTrain/BPH_a.nii.gz");
        assert_eq!(manifest.test, vec!["./imagesTest/PCA_b.nii.gz"]);
        assert_eq!(manifest.test_cases, vec!["PCA_b"]);
    }

    #[test]
    fn test_manifest_json_shape() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("dataset.json");
        OutputManifest::new("BPH_PCA", 3, "test", Some(&Modality::CORE), &written())
            .write(&path)
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["labels"]["background"], 0);
        assert_eq!(json["labels"]["BPH"], 1);
        assert_eq!(json["labels"]["PCA"], 2);
        assert_eq!(json["numTraining"], 1);
        assert_eq!(json["file_ending"], ".nii.gz");
        assert_eq!(json["channel_names"]["0"], "ADC");
        assert!(json["channel_names"].get("4").is_none());
        assert_eq!(json["case_channels"]["PCA_b"][3], "T2_NoFatSat");
    }

    #[test]
    fn test_mixed_channels_omit_shared_names() {
        let mut cases = written();
        cases[1].channels = vec![Modality::T2NoFatSat, Modality::T2HighRes];

        let manifest = OutputManifest::new("BPH_PCA", 3, "test", None, &cases);
        assert!(manifest.channel_names.is_none());
        assert_eq!(manifest.case_channels["BPH_a"].len(), 4);
        assert_eq!(
            manifest.case_channels["PCA_b"],
            vec!["T2_NoFatSat", "T2_HighRes"]
        );

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json.get("channel_names").is_none());
    }
}
