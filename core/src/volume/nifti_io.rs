use super::{LabelVolume, Volume, VolumeIo};
use crate::error::{ConvertError, Result};
use crate::types::Grid;
use log::debug;
use ndarray::{Array3, Array4, ArrayD, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

// NIfTI xyzt_units code for millimetres
const NIFTI_UNITS_MM: u8 = 2;

/// NIfTI-1 volume accessor (`.nii` and `.nii.gz`)
///
/// Geometry is taken from the sform when present, then the qform, then
/// `pixdim` with identity orientation. Output files always carry an sform.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiIo;

impl NiftiIo {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeIo for NiftiIo {
    fn read(&self, path: &Path) -> Result<Volume<f32>> {
        let obj = ReaderOptions::new().read_file(path)?;
        let header = obj.header().clone();
        let array = obj.into_volume().into_ndarray::<f32>()?;
        let data = squeeze_to_3d(array)?;

        let (x, y, z) = data.dim();
        let grid = grid_from_header(&header, [x, y, z]);
        debug!("Read {} ({})", path.display(), grid);

        Volume::new(data, grid)
    }

    fn write_image(&self, path: &Path, channels: &Array4<f32>, grid: &Grid) -> Result<()> {
        let header = header_for_grid(grid);
        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(channels)?;
        Ok(())
    }

    fn write_label(&self, path: &Path, label: &LabelVolume) -> Result<()> {
        let header = header_for_grid(&label.grid);
        WriterOptions::new(path)
            .reference_header(&header)
            .write_nifti(&label.data)?;
        Ok(())
    }
}

/// Drops trailing singleton axes until the array is 3-D
fn squeeze_to_3d(mut array: ArrayD<f32>) -> Result<Array3<f32>> {
    while array.ndim() > 3 && array.shape()[array.ndim() - 1] == 1 {
        let last = array.ndim() - 1;
        array = array.index_axis_move(Axis(last), 0);
    }

    if array.ndim() != 3 {
        return Err(ConvertError::InvalidVolume(format!(
            "expected a 3-D volume, got shape {:?}",
            array.shape()
        )));
    }

    Ok(array.into_dimensionality::<Ix3>()?)
}

/// Derives the voxel grid from a NIfTI header
fn grid_from_header(header: &NiftiHeader, shape: [usize; 3]) -> Grid {
    let pixdim = [
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    ];

    if header.sform_code > 0 {
        let rows = [header.srow_x, header.srow_y, header.srow_z];
        let mut spacing = [0.0; 3];
        let mut direction = [[0.0; 3]; 3];

        // Column norms of the sform are the voxel sizes
        for j in 0..3 {
            let norm = rows
                .iter()
                .map(|row| (row[j] as f64).powi(2))
                .sum::<f64>()
                .sqrt();
            spacing[j] = norm;
            for i in 0..3 {
                direction[i][j] = if norm > 0.0 {
                    rows[i][j] as f64 / norm
                } else {
                    0.0
                };
            }
        }

        Grid {
            shape,
            spacing,
            origin: [rows[0][3] as f64, rows[1][3] as f64, rows[2][3] as f64],
            direction,
        }
    } else if header.qform_code > 0 {
        let b = header.quatern_b as f64;
        let c = header.quatern_c as f64;
        let d = header.quatern_d as f64;
        let a = (1.0 - b * b - c * c - d * d).max(0.0).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };

        let mut direction = [
            [
                a * a + b * b - c * c - d * d,
                2.0 * (b * c - a * d),
                2.0 * (b * d + a * c),
            ],
            [
                2.0 * (b * c + a * d),
                a * a + c * c - b * b - d * d,
                2.0 * (c * d - a * b),
            ],
            [
                2.0 * (b * d - a * c),
                2.0 * (c * d + a * b),
                a * a + d * d - c * c - b * b,
            ],
        ];
        for row in direction.iter_mut() {
            row[2] *= qfac;
        }

        Grid {
            shape,
            spacing: pixdim,
            origin: [
                header.quatern_x as f64,
                header.quatern_y as f64,
                header.quatern_z as f64,
            ],
            direction,
        }
    } else {
        Grid::new(shape, pixdim, [0.0; 3])
    }
}

/// Builds an output header whose sform encodes `grid`
fn header_for_grid(grid: &Grid) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    header.pixdim[0] = 1.0;
    for (i, spacing) in grid.spacing.iter().enumerate() {
        header.pixdim[i + 1] = *spacing as f32;
    }
    header.pixdim[4] = 1.0;

    let rows = grid.affine_rows();
    header.srow_x = rows[0].map(|v| v as f32);
    header.srow_y = rows[1].map(|v| v as f32);
    header.srow_z = rows[2].map(|v| v as f32);
    header.sform_code = 1;
    header.qform_code = 0;
    header.xyzt_units = NIFTI_UNITS_MM;
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    header
}
