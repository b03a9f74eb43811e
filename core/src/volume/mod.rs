//! Volume access
//!
//! A [`Volume`] is a 3-D scalar array together with the [`Grid`] it lives on.
//! Reading and writing goes through the [`VolumeIo`] trait so the pipeline
//! does not depend on a particular file format; [`NiftiIo`] is the NIfTI
//! implementation used in production.

mod nifti_io;

pub use nifti_io::NiftiIo;

use crate::error::{ConvertError, Result};
use crate::types::Grid;
use ndarray::{Array3, Array4};
use std::path::Path;

/// 3-D scalar volume on a voxel grid
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T = f32> {
    pub data: Array3<T>,
    pub grid: Grid,
}

/// Label volume with discrete `u8` values
pub type LabelVolume = Volume<u8>;

impl<T> Volume<T> {
    /// Creates a volume, checking that the array matches the grid shape
    ///
    /// # Errors
    ///
    /// Returns `ConvertError::InvalidVolume` if the array shape differs from
    /// `grid.shape`.
    pub fn new(data: Array3<T>, grid: Grid) -> Result<Self> {
        let (x, y, z) = data.dim();
        if [x, y, z] != grid.shape {
            return Err(ConvertError::InvalidVolume(format!(
                "array shape {:?} does not match grid shape {:?}",
                [x, y, z],
                grid.shape
            )));
        }
        Ok(Self { data, grid })
    }

    /// Voxel shape
    pub fn shape(&self) -> [usize; 3] {
        self.grid.shape
    }
}

impl Volume<f32> {
    /// Zero-filled volume on `grid`
    pub fn zeros(grid: Grid) -> Self {
        let [x, y, z] = grid.shape;
        Self {
            data: Array3::zeros((x, y, z)),
            grid,
        }
    }
}

/// Maps every voxel above 0 to `value` and everything else to background
///
/// Source label files store arbitrary foreground values; the output label
/// carries the class value of the case.
pub fn remap_label(label: &Volume<f32>, value: u8) -> LabelVolume {
    Volume {
        data: label.data.mapv(|v| if v > 0.0 { value } else { 0 }),
        grid: label.grid,
    }
}

/// Reads and writes volumes
///
/// Implementations must be shareable between worker threads.
pub trait VolumeIo: Sync {
    /// Reads a 3-D scalar volume with its geometry
    fn read(&self, path: &Path) -> Result<Volume<f32>>;

    /// Writes a multi-channel image; channels are on the last axis
    fn write_image(&self, path: &Path, channels: &Array4<f32>, grid: &Grid) -> Result<()>;

    /// Writes a label volume
    fn write_label(&self, path: &Path, label: &LabelVolume) -> Result<()>;
}

/// Checks whether a file name has a supported volume extension
pub fn is_volume_file_name(name: &str) -> bool {
    strip_volume_extension(name).is_some()
}

/// Strips `.nii.gz` or `.nii` (case-insensitive), returning the stem
pub fn strip_volume_extension(name: &str) -> Option<&str> {
    let lower = name.to_ascii_lowercase();
    [".nii.gz", ".nii"]
        .iter()
        .find(|ext| lower.ends_with(*ext) && lower.len() > ext.len())
        .map(|ext| &name[..name.len() - ext.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_shape_check() {
        let grid = Grid::unit([2, 3, 4]);
        assert!(Volume::new(Array3::<f32>::zeros((2, 3, 4)), grid).is_ok());
        assert!(Volume::new(Array3::<f32>::zeros((2, 3, 5)), grid).is_err());
    }

    #[test]
    fn test_zeros() {
        let volume = Volume::zeros(Grid::unit([2, 2, 2]));
        assert_eq!(volume.shape(), [2, 2, 2]);
        assert!(volume.data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_remap_label() {
        let grid = Grid::unit([3, 1, 1]);
        let data = Array3::from_shape_vec((3, 1, 1), vec![0.0, 1.0, 255.0]).unwrap();
        let label = remap_label(&Volume::new(data, grid).unwrap(), 2);
        assert_eq!(label.data.iter().copied().collect::<Vec<u8>>(), vec![0, 2, 2]);
        assert_eq!(label.grid, grid);
    }

    #[test]
    fn test_strip_volume_extension() {
        assert_eq!(strip_volume_extension("case.nii"), Some("case"));
        assert_eq!(strip_volume_extension("case.NII.GZ"), Some("case"));
        assert_eq!(strip_volume_extension("case.nii.gz"), Some("case"));
        assert_eq!(strip_volume_extension(".nii"), None);
        assert_eq!(strip_volume_extension("case.txt"), None);
        assert!(!is_volume_file_name("case.gz"));
    }
}
