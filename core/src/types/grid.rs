use nalgebra::{Matrix3, Vector3};
use std::fmt;

const GRID_TOLERANCE: f64 = 1e-5;

/// Voxel grid of a 3-D volume
///
/// Maps a voxel index `v` to world coordinates (mm) as
/// `origin + direction * diag(spacing) * v`. `direction` is row-major and its
/// columns are the unit vectors of the three voxel axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub shape: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub direction: [[f64; 3]; 3],
}

impl Grid {
    /// Creates a grid with identity direction
    pub fn new(shape: [usize; 3], spacing: [f64; 3], origin: [f64; 3]) -> Self {
        Self {
            shape,
            spacing,
            origin,
            direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Unit spacing, zero origin, identity direction
    pub fn unit(shape: [usize; 3]) -> Self {
        Self::new(shape, [1.0, 1.0, 1.0], [0.0, 0.0, 0.0])
    }

    /// Number of voxels
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks whether this grid carries enough metadata to resample from or onto
    ///
    /// Requires finite, strictly positive spacing and a finite, non-singular
    /// direction matrix.
    pub fn is_resamplable(&self) -> bool {
        let spacing_ok = self.spacing.iter().all(|s| s.is_finite() && *s > 0.0);
        let origin_ok = self.origin.iter().all(|o| o.is_finite());
        let det = self.direction_matrix().determinant();
        spacing_ok && origin_ok && det.is_finite() && det.abs() > 1e-6
    }

    /// Checks whether two grids describe the same voxel positions
    pub fn matches(&self, other: &Grid) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= GRID_TOLERANCE;
        self.shape == other.shape
            && self
                .spacing
                .iter()
                .zip(other.spacing.iter())
                .all(|(a, b)| close(*a, *b))
            && self
                .origin
                .iter()
                .zip(other.origin.iter())
                .all(|(a, b)| close(*a, *b))
            && self
                .direction
                .iter()
                .flatten()
                .zip(other.direction.iter().flatten())
                .all(|(a, b)| close(*a, *b))
    }

    pub fn direction_matrix(&self) -> Matrix3<f64> {
        let d = &self.direction;
        Matrix3::new(
            d[0][0], d[0][1], d[0][2], d[1][0], d[1][1], d[1][2], d[2][0], d[2][1], d[2][2],
        )
    }

    /// Linear part of the index-to-world transform
    pub fn index_to_world(&self) -> Matrix3<f64> {
        self.direction_matrix() * Matrix3::from_diagonal(&Vector3::from(self.spacing))
    }

    pub fn origin_vector(&self) -> Vector3<f64> {
        Vector3::from(self.origin)
    }

    /// Affine mapping voxel indices of `self` to continuous voxel indices of `source`
    ///
    /// Returns `(m, c)` with `u = m * v + c`, or `None` when `source` is not
    /// invertible.
    pub fn index_map_to(&self, source: &Grid) -> Option<(Matrix3<f64>, Vector3<f64>)> {
        let source_inv = source.index_to_world().try_inverse()?;
        let m = source_inv * self.index_to_world();
        let c = source_inv * (self.origin_vector() - source.origin_vector());
        Some((m, c))
    }

    /// Rows of the 3x4 world affine, as stored in a NIfTI sform
    pub fn affine_rows(&self) -> [[f64; 4]; 3] {
        let linear = self.index_to_world();
        let mut rows = [[0.0; 4]; 3];
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().take(3).enumerate() {
                *value = linear[(i, j)];
            }
            row[3] = self.origin[i];
        }
        rows
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} @ {:.3}x{:.3}x{:.3} mm",
            self.shape[0],
            self.shape[1],
            self.shape[2],
            self.spacing[0],
            self.spacing[1],
            self.spacing[2]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_grid_is_resamplable() {
        assert!(Grid::unit([4, 4, 4]).is_resamplable());
    }

    #[test]
    fn test_missing_spacing_is_not_resamplable() {
        let grid = Grid::new([4, 4, 4], [1.0, 0.0, 1.0], [0.0; 3]);
        assert!(!grid.is_resamplable());

        let grid = Grid::new([4, 4, 4], [1.0, f64::NAN, 1.0], [0.0; 3]);
        assert!(!grid.is_resamplable());
    }

    #[test]
    fn test_singular_direction_is_not_resamplable() {
        let mut grid = Grid::unit([4, 4, 4]);
        grid.direction = [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(!grid.is_resamplable());
    }

    #[test]
    fn test_matches_tolerates_rounding() {
        let a = Grid::new([4, 5, 6], [0.5, 0.5, 3.0], [10.0, -4.0, 2.0]);
        let mut b = a;
        b.spacing[0] += 1e-7;
        assert!(a.matches(&b));

        b.shape = [4, 5, 7];
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_index_map_identity() {
        let grid = Grid::new([4, 4, 4], [0.7, 0.7, 3.0], [1.0, 2.0, 3.0]);
        let (m, c) = grid.index_map_to(&grid).unwrap();
        assert!((m - Matrix3::identity()).abs().max() < 1e-12);
        assert!(c.abs().max() < 1e-12);
    }

    #[test]
    fn test_index_map_half_spacing() {
        // Target has twice the resolution of the source, same origin
        let source = Grid::new([4, 4, 4], [2.0, 2.0, 2.0], [0.0; 3]);
        let target = Grid::new([8, 8, 8], [1.0, 1.0, 1.0], [0.0; 3]);
        let (m, c) = target.index_map_to(&source).unwrap();
        let u = m * Vector3::new(4.0, 2.0, 0.0) + c;
        assert!((u - Vector3::new(2.0, 1.0, 0.0)).abs().max() < 1e-12);
    }

    #[test]
    fn test_affine_rows() {
        let grid = Grid::new([2, 2, 2], [0.5, 1.0, 2.0], [10.0, 20.0, 30.0]);
        let rows = grid.affine_rows();
        assert_eq!(rows[0], [0.5, 0.0, 0.0, 10.0]);
        assert_eq!(rows[1], [0.0, 1.0, 0.0, 20.0]);
        assert_eq!(rows[2], [0.0, 0.0, 2.0, 30.0]);
    }
}
