//! Structure-detail decomposition of low-resolution frames.
//!
//! The recurrent network consumes every frame twice: once as a low-pass
//! structure component and once as the high-frequency detail left over. The
//! split is additive, `frame = structure + detail`, so no information is lost
//! before the network sees it.

use burn::prelude::*;

use crate::filter::GaussianBlur;
use crate::shape::frame_extent;

/// Configuration for [`StructureDetailDecomposer`].
#[derive(Config, Debug, PartialEq)]
pub struct DecomposerConfig {
    /// Standard deviation of the low-pass filter, in low-resolution pixels
    #[config(default = "1.5")]
    pub sigma: f64,
    /// Upper bound on the sampled Gaussian kernel width
    #[config(default = "15")]
    pub max_kernel_width: usize,
}

impl DecomposerConfig {
    pub fn init<B: Backend>(&self) -> StructureDetailDecomposer<B> {
        StructureDetailDecomposer {
            blur: GaussianBlur::new(self.sigma).with_max_kernel_width(self.max_kernel_width),
        }
    }
}

/// A frame split into its structure and detail components.
#[derive(Debug, Clone)]
pub struct StructureDetail<B: Backend> {
    /// Low-pass component [batch, 3, H, W]
    pub structure: Tensor<B, 4>,
    /// Residual `frame - structure` [batch, 3, H, W]
    pub detail: Tensor<B, 4>,
}

/// Splits RGB frames into structure and detail components.
pub struct StructureDetailDecomposer<B: Backend> {
    blur: GaussianBlur<B>,
}

impl<B: Backend> StructureDetailDecomposer<B> {
    /// Decompose a `[batch, 3, H, W]` frame.
    pub fn decompose(&self, frame: Tensor<B, 4>) -> crate::Result<StructureDetail<B>> {
        frame_extent("frame", frame.dims())?;

        let structure = self.blur.apply(frame.clone());
        let detail = frame - structure.clone();

        Ok(StructureDetail { structure, detail })
    }

    /// Low-pass filter used for the structure component.
    pub fn blur(&self) -> &GaussianBlur<B> {
        &self.blur
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RsdnError;
    use burn::tensor::{Distribution, ElementConversion};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_decomposition_is_additive() {
        let device = Default::default();
        let frame = Tensor::<TestBackend, 4>::random(
            [2, 3, 12, 10],
            Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let decomposer = DecomposerConfig::new().init::<TestBackend>();
        let parts = decomposer.decompose(frame.clone()).unwrap();

        assert_eq!(parts.structure.dims(), [2, 3, 12, 10]);
        assert_eq!(parts.detail.dims(), [2, 3, 12, 10]);

        let rebuilt = parts.structure + parts.detail;
        let err = (rebuilt - frame).abs().max().into_scalar().elem::<f32>();
        assert!(err < 1e-6, "reconstruction error {err}");
    }

    #[test]
    fn test_detail_of_flat_interior_is_zero() {
        let device = Default::default();
        let frame = Tensor::<TestBackend, 4>::ones([1, 3, 16, 16], &device).mul_scalar(0.5);
        let decomposer = DecomposerConfig::new().with_sigma(1.0).init::<TestBackend>();
        let parts = decomposer.decompose(frame).unwrap();

        let interior = parts
            .detail
            .slice([0..1, 0..3, 5..11, 5..11])
            .abs()
            .max()
            .into_scalar()
            .elem::<f32>();
        assert!(interior < 1e-5);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = DecomposerConfig::new().with_sigma(0.75).with_max_kernel_width(7);
        let json = config.to_string();
        let loaded = DecomposerConfig::load_binary(json.as_bytes()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_non_rgb_frame() {
        let device = Default::default();
        let frame = Tensor::<TestBackend, 4>::zeros([1, 1, 8, 8], &device);
        let decomposer = DecomposerConfig::new().init::<TestBackend>();
        assert!(matches!(
            decomposer.decompose(frame),
            Err(RsdnError::ShapeMismatch { .. })
        ));
    }
}
