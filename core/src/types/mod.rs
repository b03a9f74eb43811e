//! Core type definitions for dataset assembly
//!
//! This module provides the fundamental types used throughout the mmstack library:
//! - [`Modality`]: MRI acquisition channels in canonical order
//! - [`DiseaseClass`]: Disease classes and their label values
//! - [`ModalityCompletenessPolicy`]: Rules deciding which cases are usable
//! - [`Grid`]: Voxel grid geometry (shape, spacing, origin, direction)
//! - [`ConversionConfig`]: Configuration for a conversion run

mod config;
mod enums;
mod grid;
mod policy;

pub use config::{ConversionConfig, DEFAULT_LABEL_DIR, DEFAULT_SPLIT_SEED};
pub use enums::{DiseaseClass, Modality};
pub use grid::Grid;
pub use policy::ModalityCompletenessPolicy;
