use std::path::Path;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};

use rsdn_core::{Result, RsdnError};

use crate::network::Rsdn;

/// Recorder used for RSDN weight files (`.mpk`).
pub type CheckpointRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Save the weights of `model` to `path`.
///
/// The recorder appends its own `.mpk` extension.
pub fn save_checkpoint<B: Backend>(model: Rsdn<B>, path: &Path) -> Result<()> {
    let recorder = CheckpointRecorder::new();
    model
        .save_file(path.to_path_buf(), &recorder)
        .map_err(|e| RsdnError::checkpoint(format!("failed to save {}: {:?}", path.display(), e)))?;

    tracing::info!("Saved RSDN checkpoint to {}", path.display());
    Ok(())
}

/// Load weights from `path` into a model built from the matching configuration.
///
/// Compatibility of the stored tensors with the model is left to the recorder.
pub fn load_checkpoint<B: Backend>(
    model: Rsdn<B>,
    path: &Path,
    device: &B::Device,
) -> Result<Rsdn<B>> {
    let recorder = CheckpointRecorder::new();
    let model = model
        .load_file(path.to_path_buf(), &recorder, device)
        .map_err(|e| RsdnError::checkpoint(format!("failed to load {}: {:?}", path.display(), e)))?;

    tracing::info!("Loaded RSDN checkpoint from {}", path.display());
    Ok(model)
}
