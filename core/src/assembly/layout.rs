use super::split::Partition;
use log::warn;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of every written volume
pub const FILE_ENDING: &str = ".nii.gz";

pub const IMAGES_TRAIN_DIR: &str = "imagesTrain";
pub const LABELS_TRAIN_DIR: &str = "labelsTrain";
pub const IMAGES_TEST_DIR: &str = "imagesTest";
pub const LABELS_TEST_DIR: &str = "labelsTest";

const STAGING_DIR: &str = ".staging";

/// Directory layout of one output dataset
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub root: PathBuf,
    pub keep_test_labels: bool,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, keep_test_labels: bool) -> Self {
        Self {
            root: root.into(),
            keep_test_labels,
        }
    }

    /// Creates the image/label directories
    pub fn create(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.root.join(IMAGES_TRAIN_DIR))?;
        fs::create_dir_all(self.root.join(LABELS_TRAIN_DIR))?;
        fs::create_dir_all(self.root.join(IMAGES_TEST_DIR))?;
        if self.keep_test_labels {
            fs::create_dir_all(self.root.join(LABELS_TEST_DIR))?;
        }
        Ok(())
    }

    /// Removes volumes left in the data directories by an earlier run
    ///
    /// `keep` holds the paths, relative to the root, written by this run.
    /// Only files ending in [`FILE_ENDING`] are touched. Returns the number
    /// of files removed.
    pub fn remove_stale(&self, keep: &BTreeSet<PathBuf>) -> std::io::Result<usize> {
        let mut removed = 0;
        for dir in [
            IMAGES_TRAIN_DIR,
            LABELS_TRAIN_DIR,
            IMAGES_TEST_DIR,
            LABELS_TEST_DIR,
        ] {
            let abs = self.root.join(dir);
            if !abs.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&abs)? {
                let path = entry?.path();
                let Some(name) = path.file_name() else {
                    continue;
                };
                if !path.is_file() || !name.to_string_lossy().ends_with(FILE_ENDING) {
                    continue;
                }
                if keep.contains(&Path::new(dir).join(name)) {
                    continue;
                }
                warn!("Removing {} left by a previous run", path.display());
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn file_name(key: &str) -> String {
        format!("{}{}", key, FILE_ENDING)
    }

    /// Image path relative to the dataset root
    pub fn image_rel(&self, key: &str, partition: Partition) -> PathBuf {
        let dir = match partition {
            Partition::Train => IMAGES_TRAIN_DIR,
            Partition::Test => IMAGES_TEST_DIR,
        };
        Path::new(dir).join(Self::file_name(key))
    }

    /// Label path relative to the dataset root, if labels are written for `partition`
    pub fn label_rel(&self, key: &str, partition: Partition) -> Option<PathBuf> {
        match partition {
            Partition::Train => Some(Path::new(LABELS_TRAIN_DIR).join(Self::file_name(key))),
            Partition::Test if self.keep_test_labels => {
                Some(Path::new(LABELS_TEST_DIR).join(Self::file_name(key)))
            }
            Partition::Test => None,
        }
    }

    pub fn staging_root(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Per-case scratch directory; its content is moved into place as a unit
    pub fn staging_dir(&self, key: &str) -> PathBuf {
        self.staging_root().join(key)
    }
}
