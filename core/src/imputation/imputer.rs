use super::stats::{IntensityStats, ReferenceStats};
use crate::types::Modality;
use crate::volume::Volume;
use log::warn;

// Below this a standard deviation is treated as zero
const MIN_STD: f64 = 1e-8;

/// Intensity moments the imputer maps from and to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImputationProfile {
    pub source: IntensityStats,
    pub target: IntensityStats,
}

impl ImputationProfile {
    /// Profile mapping every intensity to itself
    pub fn identity() -> Self {
        let unit = IntensityStats::new(0.0, 1.0);
        Self {
            source: unit,
            target: unit,
        }
    }

    /// Looks up the profile for synthesizing `target` from `source`
    ///
    /// Falls back to [`ImputationProfile::identity`] when either modality is
    /// missing from the table.
    pub fn from_reference(stats: &ReferenceStats, source: Modality, target: Modality) -> Self {
        match (stats.get(source), stats.get(target)) {
            (Some(s), Some(t)) => Self {
                source: *s,
                target: *t,
            },
            _ => {
                warn!(
                    "No reference statistics for {} / {}; imputing {} as a copy of {}",
                    source, target, target, source
                );
                Self::identity()
            }
        }
    }
}

/// Synthesizes a substitute volume for an absent modality from a correlated one
///
/// This is a linear moment-matching heuristic, not a learned model. The absent
/// modality is assumed to be a monotonic intensity transform of `source`, and
/// each voxel is mapped as
///
/// ```text
/// synthetic = (source - source_mean) * (target_std / source_std) + target_mean
/// ```
///
/// then clipped at zero. The result has the geometry of `source` and a
/// plausible intensity scale; it carries no diagnostic value.
///
/// A constant source volume, or a reference source std of zero, yields an
/// all-zero volume on the same grid. The function is pure, so identical
/// inputs give bit-identical output.
pub fn impute(source: &Volume<f32>, profile: &ImputationProfile) -> Volume<f32> {
    if profile.source.std <= MIN_STD || is_constant(source) {
        return Volume::zeros(source.grid);
    }

    let scale = profile.target.std / profile.source.std;
    let source_mean = profile.source.mean;
    let target_mean = profile.target.mean;

    let data = source
        .data
        .mapv(|v| (((v as f64 - source_mean) * scale + target_mean).max(0.0)) as f32);

    Volume {
        data,
        grid: source.grid,
    }
}

fn is_constant(volume: &Volume<f32>) -> bool {
    let mut values = volume.data.iter();
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Grid;
    use ndarray::Array3;

    fn make_volume() -> Volume<f32> {
        let grid = Grid::new([4, 3, 2], [0.6, 0.6, 3.0], [1.0, -2.0, 5.0]);
        let data = Array3::from_shape_fn((4, 3, 2), |(i, j, k)| (i * 10 + j * 3 + k) as f32);
        Volume::new(data, grid).unwrap()
    }

    fn profile() -> ImputationProfile {
        ImputationProfile {
            source: IntensityStats::new(10.0, 5.0),
            target: IntensityStats::new(100.0, 20.0),
        }
    }

    #[test]
    fn test_moment_mapping() {
        let source = make_volume();
        let out = impute(&source, &profile());

        // (x - 10) * 4 + 100, clipped at 0
        assert_eq!(out.data[[0, 0, 0]], 60.0);
        assert_eq!(out.data[[1, 0, 0]], 100.0);
        assert_eq!(out.data[[3, 2, 1]], ((37.0 - 10.0) * 4.0 + 100.0) as f32);
    }

    #[test]
    fn test_keeps_geometry() {
        let source = make_volume();
        let out = impute(&source, &profile());
        assert_eq!(out.grid, source.grid);
        assert_eq!(out.data.dim(), source.data.dim());
    }

    #[test]
    fn test_clips_negative() {
        let source = make_volume();
        let profile = ImputationProfile {
            source: IntensityStats::new(30.0, 1.0),
            target: IntensityStats::new(0.0, 1.0),
        };
        let out = impute(&source, &profile);
        assert!(out.data.iter().all(|v| *v >= 0.0));
        assert_eq!(out.data[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_deterministic() {
        let source = make_volume();
        let a = impute(&source, &profile());
        let b = impute(&source, &profile());
        let bits_a: Vec<u32> = a.data.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.data.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_constant_source_gives_zeros() {
        let grid = Grid::unit([2, 2, 2]);
        let source = Volume::new(Array3::from_elem((2, 2, 2), 7.0f32), grid).unwrap();
        let out = impute(&source, &profile());
        assert!(out.data.iter().all(|v| *v == 0.0));
        assert_eq!(out.grid, grid);
    }

    #[test]
    fn test_zero_reference_std_gives_zeros() {
        let source = make_volume();
        let profile = ImputationProfile {
            source: IntensityStats::new(10.0, 0.0),
            target: IntensityStats::new(100.0, 20.0),
        };
        assert!(impute(&source, &profile).data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_missing_reference_falls_back_to_identity() {
        let stats = ReferenceStats::new().with(Modality::T2NoFatSat, IntensityStats::new(1.0, 1.0));
        let profile =
            ImputationProfile::from_reference(&stats, Modality::T2NoFatSat, Modality::T2HighRes);
        assert_eq!(profile, ImputationProfile::identity());

        let source = make_volume();
        assert_eq!(impute(&source, &profile).data, source.data);
    }
}
