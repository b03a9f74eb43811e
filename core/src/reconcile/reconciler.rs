use super::resample::{resample_image, resample_label};
use crate::collection::CaseRecord;
use crate::evaluation::{ChannelPlan, ChannelSource, ExclusionReason};
use crate::types::{Grid, Modality};
use crate::volume::{LabelVolume, Volume};
use log::{debug, warn};

/// An included case with every channel and its label on one common grid
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCase {
    pub record: CaseRecord,
    pub plan: ChannelPlan,
    /// One volume per plan entry, in plan order
    pub channels: Vec<Volume<f32>>,
    pub label: LabelVolume,
    pub grid: Grid,
}

impl ResolvedCase {
    pub fn key(&self) -> String {
        self.record.key()
    }
}

/// Picks the grid every channel of a case is resampled onto
///
/// The grid of `primary` when the case has it as a real channel, otherwise
/// the first real channel, otherwise any loaded channel, otherwise the label.
pub fn reference_grid(
    plan: &ChannelPlan,
    channels: &[Option<Volume<f32>>],
    label: &LabelVolume,
    primary: Option<Modality>,
) -> Grid {
    let loaded = || plan.channels.iter().zip(channels.iter());

    primary
        .and_then(|p| {
            loaded().find_map(|(source, volume)| match (source, volume) {
                (ChannelSource::Real(m), Some(v)) if *m == p => Some(v.grid),
                _ => None,
            })
        })
        .or_else(|| {
            loaded().find_map(|(source, volume)| match volume {
                Some(v) if source.is_real() => Some(v.grid),
                _ => None,
            })
        })
        .or_else(|| channels.iter().flatten().map(|v| v.grid).next())
        .unwrap_or(label.grid)
}

/// Brings all channels and the label of a case onto one voxel grid
///
/// `channels` holds one entry per plan entry: the loaded (or imputed) volume,
/// or `None` for a placeholder, which becomes a zero channel on the common
/// grid. Image channels are resampled trilinearly, the label by nearest
/// neighbour. A case already on the reference grid passes through unchanged.
///
/// # Errors
///
/// `ExclusionReason::UnresamplableGeometry` when a grid that needs resampling
/// lacks usable spacing or orientation.
pub fn reconcile(
    record: CaseRecord,
    plan: ChannelPlan,
    channels: Vec<Option<Volume<f32>>>,
    label: LabelVolume,
    primary: Option<Modality>,
) -> std::result::Result<ResolvedCase, ExclusionReason> {
    let grid = reference_grid(&plan, &channels, &label, primary);
    debug!("{}: reference grid {}", record.key(), grid);

    let mut resolved = Vec::with_capacity(channels.len());
    for (source, volume) in plan.channels.iter().zip(channels) {
        let channel = match volume {
            Some(volume) => resample_image(&volume, &grid).ok_or_else(|| {
                warn!(
                    "{}: cannot resample {} from {} onto {}",
                    record.key(),
                    source,
                    volume.grid,
                    grid
                );
                ExclusionReason::UnresamplableGeometry
            })?,
            None => Volume::zeros(grid),
        };
        resolved.push(channel);
    }

    let label = resample_label(&label, &grid).ok_or_else(|| {
        warn!(
            "{}: cannot resample label from {} onto {}",
            record.key(),
            label.grid,
            grid
        );
        ExclusionReason::UnresamplableGeometry
    })?;

    Ok(ResolvedCase {
        record,
        plan,
        channels: resolved,
        label,
        grid,
    })
}
