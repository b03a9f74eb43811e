use crate::types::Grid;
use crate::volume::{LabelVolume, Volume};
use log::debug;
use nalgebra::{Matrix3, Vector3};
use ndarray::Array3;

/// Resamples an image channel onto `target` with trilinear interpolation
///
/// Target voxel centres within half a voxel outside the source extent take the
/// border value; anything further out is 0. Returns `None` when either grid
/// cannot be resampled. A source already on `target` is returned unchanged.
pub fn resample_image(volume: &Volume<f32>, target: &Grid) -> Option<Volume<f32>> {
    if volume.grid.matches(target) {
        return Some(volume.clone());
    }
    let (m, c) = index_map(&volume.grid, target)?;
    debug!("Resampling image {} -> {}", volume.grid, target);

    let source = &volume.data;
    let dims = volume.grid.shape;
    let data = Array3::from_shape_fn(shape_tuple(target), |(i, j, k)| {
        let u = m * Vector3::new(i as f64, j as f64, k as f64) + c;
        trilinear(source, dims, [u.x, u.y, u.z])
    });

    Some(Volume {
        data,
        grid: *target,
    })
}

/// Resamples a label onto `target` with nearest-neighbour lookup
///
/// Every output voxel is a copy of one source voxel or background (0), so no
/// value outside the source's value set can appear.
pub fn resample_label(label: &LabelVolume, target: &Grid) -> Option<LabelVolume> {
    if label.grid.matches(target) {
        return Some(label.clone());
    }
    let (m, c) = index_map(&label.grid, target)?;
    debug!("Resampling label {} -> {}", label.grid, target);

    let source = &label.data;
    let dims = label.grid.shape;
    let data = Array3::from_shape_fn(shape_tuple(target), |(i, j, k)| {
        let u = m * Vector3::new(i as f64, j as f64, k as f64) + c;
        match (
            nearest(u.x, dims[0]),
            nearest(u.y, dims[1]),
            nearest(u.z, dims[2]),
        ) {
            (Some(x), Some(y), Some(z)) => source[[x, y, z]],
            _ => 0,
        }
    });

    Some(Volume {
        data,
        grid: *target,
    })
}

fn index_map(source: &Grid, target: &Grid) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    if !source.is_resamplable() || !target.is_resamplable() || source.is_empty() {
        return None;
    }
    target.index_map_to(source)
}

fn shape_tuple(grid: &Grid) -> (usize, usize, usize) {
    (grid.shape[0], grid.shape[1], grid.shape[2])
}

fn nearest(u: f64, n: usize) -> Option<usize> {
    let r = (u + 0.5).floor();
    if r >= 0.0 && r < n as f64 {
        Some(r as usize)
    } else {
        None
    }
}

fn trilinear(source: &Array3<f32>, dims: [usize; 3], u: [f64; 3]) -> f32 {
    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    let mut frac = [0.0f64; 3];

    for axis in 0..3 {
        let n = dims[axis] as f64;
        if u[axis] < -0.5 || u[axis] > n - 0.5 {
            return 0.0;
        }
        let clamped = u[axis].clamp(0.0, n - 1.0);
        let base = clamped.floor();
        lo[axis] = base as usize;
        hi[axis] = (lo[axis] + 1).min(dims[axis] - 1);
        frac[axis] = clamped - base;
    }

    let mut value = 0.0f64;
    for corner in 0..8 {
        let mut weight = 1.0;
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            if corner & (1 << axis) != 0 {
                weight *= frac[axis];
                idx[axis] = hi[axis];
            } else {
                weight *= 1.0 - frac[axis];
                idx[axis] = lo[axis];
            }
        }
        if weight > 0.0 {
            value += weight * source[idx] as f64;
        }
    }
    value as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn ramp(grid: Grid) -> Volume<f32> {
        let [x, y, z] = grid.shape;
        let data = Array3::from_shape_fn((x, y, z), |(i, _, _)| i as f32);
        Volume::new(data, grid).unwrap()
    }

    #[test]
    fn test_identity_resample_returns_original() {
        let grid = Grid::new([5, 4, 3], [0.8, 0.8, 3.0], [1.0, 2.0, 3.0]);
        let image = ramp(grid);
        let label = Volume::new(Array3::from_elem((5, 4, 3), 2u8), grid).unwrap();

        assert_eq!(resample_image(&image, &grid).unwrap(), image);
        assert_eq!(resample_label(&label, &grid).unwrap(), label);
    }

    #[test]
    fn test_label_values_preserved_non_integer_ratio() {
        let source_grid = Grid::new([7, 5, 3], [1.0, 1.0, 1.0], [0.0; 3]);
        let data = Array3::from_shape_fn((7, 5, 3), |(i, j, _)| if (i + j) % 3 == 0 { 2u8 } else { 0 });
        let label = Volume::new(data, source_grid).unwrap();

        // 7 voxels of 1.0 mm onto 10 voxels of 0.7 mm, shifted by a third of a voxel
        let target = Grid::new([10, 7, 4], [0.7, 0.7, 0.7], [0.33, -0.2, 0.1]);
        let out = resample_label(&label, &target).unwrap();

        let values: BTreeSet<u8> = out.data.iter().copied().collect();
        assert!(values.is_subset(&BTreeSet::from([0u8, 2u8])));
        assert!(values.contains(&2));
        assert_eq!(out.grid, target);
    }

    #[test]
    fn test_trilinear_interpolates_between_voxels() {
        let source_grid = Grid::new([4, 2, 2], [2.0, 2.0, 2.0], [0.0; 3]);
        let image = ramp(source_grid);

        // Target voxel 1 sits at world x = 1.0, halfway between source voxels 0 and 1
        let target = Grid::new([7, 4, 4], [1.0, 1.0, 1.0], [0.0; 3]);
        let out = resample_image(&image, &target).unwrap();

        assert!((out.data[[1, 0, 0]] - 0.5).abs() < 1e-6);
        assert!((out.data[[2, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((out.data[[6, 0, 0]] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_outside_extent_is_zero() {
        let source_grid = Grid::new([2, 2, 2], [1.0, 1.0, 1.0], [0.0; 3]);
        let image = Volume::new(Array3::from_elem((2, 2, 2), 5.0f32), source_grid).unwrap();
        let label = Volume::new(Array3::from_elem((2, 2, 2), 1u8), source_grid).unwrap();

        let target = Grid::new([4, 2, 2], [1.0, 1.0, 1.0], [0.0; 3]);
        let image_out = resample_image(&image, &target).unwrap();
        let label_out = resample_label(&label, &target).unwrap();

        assert_eq!(image_out.data[[1, 0, 0]], 5.0);
        assert_eq!(image_out.data[[3, 0, 0]], 0.0);
        assert_eq!(label_out.data[[1, 1, 1]], 1);
        assert_eq!(label_out.data[[3, 1, 1]], 0);
    }

    #[test]
    fn test_unresamplable_grid() {
        let bad = Grid::new([2, 2, 2], [0.0, 1.0, 1.0], [0.0; 3]);
        let image = Volume::zeros(bad);
        assert!(resample_image(&image, &Grid::unit([3, 3, 3])).is_none());

        let good = Volume::zeros(Grid::unit([2, 2, 2]));
        let bad_target = Grid::new([3, 3, 3], [1.0, f64::NAN, 1.0], [0.0; 3]);
        assert!(resample_image(&good, &bad_target).is_none());
    }
}
