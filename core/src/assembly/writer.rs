use super::layout::OutputLayout;
use super::split::Partition;
use crate::error::{ConvertError, Result};
use crate::reconcile::ResolvedCase;
use crate::types::Modality;
use crate::volume::{Volume, VolumeIo};
use log::{debug, warn};
use ndarray::{Array4, ArrayView3, Axis};
use std::fs;
use std::path::{Path, PathBuf};

const STAGED_IMAGE: &str = "image.nii.gz";
const STAGED_LABEL: &str = "label.nii.gz";

/// Output files of one written case, relative to the dataset root
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenCase {
    pub key: String,
    pub partition: Partition,
    pub image: PathBuf,
    pub label: Option<PathBuf>,
    /// Modality of each image channel, in stacking order
    pub channels: Vec<Modality>,
}

/// Stacks channel volumes along a new last axis, in the given order
pub fn stack_channels(channels: &[Volume<f32>]) -> Result<Array4<f32>> {
    if channels.is_empty() {
        return Err(ConvertError::InvalidVolume("no channels to stack".to_string()));
    }
    let views: Vec<ArrayView3<f32>> = channels.iter().map(|c| c.data.view()).collect();
    Ok(ndarray::stack(Axis(3), &views)?)
}

/// Writes the image and label of a case as one unit
pub struct CaseWriter<'a> {
    io: &'a dyn VolumeIo,
    layout: &'a OutputLayout,
}

impl<'a> CaseWriter<'a> {
    pub fn new(io: &'a dyn VolumeIo, layout: &'a OutputLayout) -> Self {
        Self { io, layout }
    }

    /// Writes one case into its partition
    ///
    /// Both files are first written to the case's staging directory and then
    /// renamed into place. If anything fails, files already moved are removed
    /// again, so either the image and its label both exist in the dataset or
    /// neither does. The staging directory is removed in every case.
    ///
    /// # Errors
    ///
    /// Returns the underlying codec or I/O error.
    pub fn write_case(&self, case: &ResolvedCase, partition: Partition) -> Result<WrittenCase> {
        let key = case.key();
        let staging = self.layout.staging_dir(&key);

        let result = self.stage_and_commit(case, &key, partition, &staging);

        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                warn!("Failed to remove staging directory {}: {}", staging.display(), e);
            }
        }

        result
    }

    fn stage_and_commit(
        &self,
        case: &ResolvedCase,
        key: &str,
        partition: Partition,
        staging: &Path,
    ) -> Result<WrittenCase> {
        fs::create_dir_all(staging)?;

        let stacked = stack_channels(&case.channels)?;
        let staged_image = staging.join(STAGED_IMAGE);
        self.io.write_image(&staged_image, &stacked, &case.grid)?;

        let label_rel = self.layout.label_rel(key, partition);
        let staged_label = staging.join(STAGED_LABEL);
        if label_rel.is_some() {
            self.io.write_label(&staged_label, &case.label)?;
        }

        let image_rel = self.layout.image_rel(key, partition);
        let final_image = self.layout.root.join(&image_rel);
        fs::rename(&staged_image, &final_image)?;

        if let Some(label_rel) = &label_rel {
            let final_label = self.layout.root.join(label_rel);
            if let Err(e) = fs::rename(&staged_label, &final_label) {
                if let Err(cleanup) = fs::remove_file(&final_image) {
                    warn!("Failed to roll back {}: {}", final_image.display(), cleanup);
                }
                return Err(e.into());
            }
        }

        debug!("Wrote {} ({} channels, {})", key, case.channels.len(), case.grid);

        Ok(WrittenCase {
            key: key.to_string(),
            partition,
            image: image_rel,
            label: label_rel,
            channels: case.plan.modalities(),
        })
    }
}
