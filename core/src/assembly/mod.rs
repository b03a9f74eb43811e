//! Dataset assembly
//!
//! Splits cases into train and test, writes each case's stacked image and
//! label atomically, and emits the dataset manifest and run report.

mod layout;
mod manifest;
mod report;
mod split;
mod writer;

pub use layout::{
    OutputLayout, FILE_ENDING, IMAGES_TEST_DIR, IMAGES_TRAIN_DIR, LABELS_TEST_DIR,
    LABELS_TRAIN_DIR,
};
pub use manifest::{LabelMap, OutputManifest, TrainingEntry, BACKGROUND_LABEL};
pub use report::{ChannelUsage, RunReport};
pub use split::{split_cases, Partition, Split};
pub use writer::{stack_channels, CaseWriter, WrittenCase};
