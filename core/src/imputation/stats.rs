use crate::collection::CaseRecord;
use crate::error::Result;
use crate::types::Modality;
use crate::volume::VolumeIo;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Mean and standard deviation of the voxel intensities of one modality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityStats {
    pub mean: f64,
    pub std: f64,
    /// Number of voxels the statistics were computed over
    pub voxels: u64,
}

impl IntensityStats {
    pub fn new(mean: f64, std: f64) -> Self {
        Self {
            mean,
            std,
            voxels: 0,
        }
    }
}

/// Streaming count / sum / sum-of-squares accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsAccumulator {
    count: u64,
    sum: f64,
    sum_sq: f64,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.push(value);
        }
    }

    pub fn merge(&mut self, other: &StatsAccumulator) {
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }

    /// Population statistics, or `None` if nothing was pushed
    pub fn finish(&self) -> Option<IntensityStats> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        Some(IntensityStats {
            mean,
            std: variance.sqrt(),
            voxels: self.count,
        })
    }
}

/// Corpus-wide intensity statistics per modality
///
/// Built once before any case is processed and only read afterwards; every
/// worker shares the same value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub modalities: BTreeMap<Modality, IntensityStats>,
}

impl ReferenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set statistics of one modality
    pub fn with(mut self, modality: Modality, stats: IntensityStats) -> Self {
        self.modalities.insert(modality, stats);
        self
    }

    pub fn get(&self, modality: Modality) -> Option<&IntensityStats> {
        self.modalities.get(&modality)
    }

    /// Loads a table previously written by [`ReferenceStats::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Computes reference statistics of `modalities` over every present file in `records`
///
/// Volumes are read in parallel and accumulated in record order, so the
/// result does not depend on scheduling. Unreadable files are skipped with a
/// warning. A modality with no readable file is left out of the table.
///
/// # Arguments
///
/// * `records` - Cases whose files are sampled
/// * `modalities` - Modalities to compute statistics for
/// * `io` - Volume reader
/// * `limit` - Maximum number of files read per modality
pub fn compute_reference_stats(
    records: &[CaseRecord],
    modalities: &[Modality],
    io: &dyn VolumeIo,
    limit: Option<usize>,
) -> ReferenceStats {
    let mut stats = ReferenceStats::new();

    for &modality in modalities {
        let paths: Vec<&Path> = records
            .iter()
            .filter_map(|r| r.modalities.get(&modality))
            .map(|p| p.as_path())
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let partials: Vec<Option<StatsAccumulator>> = paths
            .par_iter()
            .map(|path| match io.read(path) {
                Ok(volume) => {
                    let mut acc = StatsAccumulator::new();
                    acc.extend(volume.data.iter().map(|v| *v as f64));
                    Some(acc)
                }
                Err(e) => {
                    warn!("Skipping {} for reference statistics: {}", path.display(), e);
                    None
                }
            })
            .collect();

        let mut total = StatsAccumulator::new();
        for partial in partials.iter().flatten() {
            total.merge(partial);
        }

        match total.finish() {
            Some(s) => {
                info!(
                    "Reference statistics for {}: mean {:.3}, std {:.3} ({} files)",
                    modality,
                    s.mean,
                    s.std,
                    partials.iter().flatten().count()
                );
                stats.modalities.insert(modality, s);
            }
            None => warn!("No readable {} volumes for reference statistics", modality),
        }
    }

    debug!("Reference statistics: {:?}", stats);
    stats
}
