//! Clip-level restoration
//!
//! Drives the per-step network over a clip of low-resolution frames: every
//! frame is decomposed into structure and detail, paired with the previous
//! frame's components and the carried hidden state, and restored in order.

use burn::prelude::*;

use rsdn_core::shape::frame_extent;
use rsdn_core::{Result, RsdnError, StructureDetail, StructureDetailDecomposer};

use super::architecture::{FrameInputs, Rsdn, RsdnOutput};
use super::state::RecurrentState;

/// High-resolution images restored for one frame of a clip.
#[derive(Debug, Clone)]
pub struct RestoredFrame<B: Backend> {
    pub hr_frame: Tensor<B, 4>,
    pub structure_image: Tensor<B, 4>,
    pub detail_image: Tensor<B, 4>,
}

impl<B: Backend> From<RsdnOutput<B>> for RestoredFrame<B> {
    fn from(output: RsdnOutput<B>) -> Self {
        Self {
            hr_frame: output.hr_frame,
            structure_image: output.structure_image,
            detail_image: output.detail_image,
        }
    }
}

/// Runs an [`Rsdn`] over whole clips.
pub struct SequenceRestorer<B: Backend> {
    model: Rsdn<B>,
    decomposer: StructureDetailDecomposer<B>,
}

impl<B: Backend> SequenceRestorer<B> {
    pub fn new(model: Rsdn<B>, decomposer: StructureDetailDecomposer<B>) -> Self {
        Self { model, decomposer }
    }

    pub fn model(&self) -> &Rsdn<B> {
        &self.model
    }

    /// Restore a single frame given the previous frame's components.
    ///
    /// The first frame of a clip passes `None` and is paired with itself.
    pub fn step(
        &self,
        frame: Tensor<B, 4>,
        previous: Option<&StructureDetail<B>>,
        state: RecurrentState<B>,
    ) -> Result<(StructureDetail<B>, RsdnOutput<B>)> {
        let current = self.decomposer.decompose(frame.clone())?;
        let previous = previous.unwrap_or(&current);

        let inputs = FrameInputs::new(
            frame,
            current.structure.clone(),
            current.detail.clone(),
            previous.structure.clone(),
            previous.detail.clone(),
        );
        let output = self.model.forward(inputs, state)?;

        Ok((current, output))
    }

    /// Restore every frame of a clip, in order.
    ///
    /// All frames must share the shape of the first one. Nothing is returned
    /// unless every frame succeeds.
    pub fn restore(&self, frames: &[Tensor<B, 4>]) -> Result<Vec<RestoredFrame<B>>> {
        let first = frames
            .first()
            .ok_or_else(|| RsdnError::empty_input("clip contains no frames"))?;
        let extent = frame_extent("frame 0", first.dims())?;
        for (i, frame) in frames.iter().enumerate().skip(1) {
            frame_extent(&format!("frame {i}"), frame.dims())?;
            extent.ensure_matches(&format!("frame {i}"), frame.dims())?;
        }

        tracing::info!(
            "Restoring {} frames of {}x{} (batch {}) at x{}",
            frames.len(),
            extent.height,
            extent.width,
            extent.batch,
            self.model.upscale_factor()
        );

        let mut restored: Vec<RestoredFrame<B>> = Vec::with_capacity(frames.len());
        let mut state = RecurrentState::Initial;
        let mut previous: Option<StructureDetail<B>> = None;

        for (i, frame) in frames.iter().enumerate() {
            let (current, output) = self.step(frame.clone(), previous.as_ref(), state)?;
            tracing::debug!("Frame {}: output {:?}", i, output.hr_frame.dims());

            state = output.carry();
            previous = Some(current);
            restored.push(output.into());
        }

        tracing::info!("Restored {} frames", restored.len());
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::architecture::RsdnConfig;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;
    use rsdn_core::DecomposerConfig;

    type TestBackend = NdArray<f32>;

    fn restorer() -> SequenceRestorer<TestBackend> {
        let device = Default::default();
        let model = RsdnConfig::new()
            .with_mid_channels(8)
            .with_blocknums(1)
            .init::<TestBackend>(&device)
            .unwrap();
        SequenceRestorer::new(model, DecomposerConfig::new().init())
    }

    #[test]
    fn test_restore_clip() {
        let device = Default::default();
        let frames: Vec<Tensor<TestBackend, 4>> = (0..3)
            .map(|_| Tensor::random([1, 3, 6, 6], Distribution::Uniform(0.0, 1.0), &device))
            .collect();

        let restored = restorer().restore(&frames).unwrap();
        assert_eq!(restored.len(), 3);
        for frame in &restored {
            assert_eq!(frame.hr_frame.dims(), [1, 3, 24, 24]);
            assert_eq!(frame.structure_image.dims(), [1, 3, 24, 24]);
            assert_eq!(frame.detail_image.dims(), [1, 3, 24, 24]);
        }
    }

    #[test]
    fn test_rejects_empty_clip() {
        assert!(matches!(
            restorer().restore(&[]),
            Err(RsdnError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_rejects_resized_frame() {
        let device = Default::default();
        let frames = vec![
            Tensor::<TestBackend, 4>::zeros([1, 3, 6, 6], &device),
            Tensor::<TestBackend, 4>::zeros([1, 3, 6, 8], &device),
        ];
        assert!(matches!(
            restorer().restore(&frames),
            Err(RsdnError::DimensionMismatch(_))
        ));
    }
}
