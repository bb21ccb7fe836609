//! Structure-Detail coupling block
//!
//! One refinement step of the recurrent cascade. The structure and detail
//! branches each run their own two-layer residual transform; the two residuals
//! are summed and the same sum is added back into both branches, so every step
//! exchanges information between them while their weights stay separate.
//!
//!```text
//!  S ──► Conv3x3 ──► ReLU ──► Conv3x3 ──► fS ─┐
//!  │                                          ▼
//!  │                                     SUM = fS + fD
//!  │                                          │
//!  D ──► Conv3x3 ──► ReLU ──► Conv3x3 ──► fD ─┘
//!  │                                          │
//!  S' = S + SUM,  D' = D + SUM ◄──────────────┘
//!```

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, PaddingConfig2d, Relu};
use burn::prelude::*;

use rsdn_core::shape::ensure_shape;

/// Configuration for a coupling block
#[derive(Config, Debug)]
pub struct SdBlockConfig {
    /// Channel count of both branches
    pub channels: usize,
    #[config(
        default = "Initializer::KaimingUniform { gain: 0.5773502691896258, fan_out_only: false }"
    )]
    pub initializer: Initializer,
}

impl SdBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SdBlock<B> {
        SdBlock {
            structure_net: self.branch(device),
            detail_net: self.branch(device),
        }
    }

    fn branch<B: Backend>(&self, device: &B::Device) -> ResidualBranch<B> {
        let conv = || {
            Conv2dConfig::new([self.channels, self.channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(self.initializer.clone())
                .init(device)
        };

        ResidualBranch {
            conv1: conv(),
            activation: Relu::new(),
            conv2: conv(),
        }
    }
}

/// Conv → ReLU → Conv residual transform of one branch
#[derive(Module, Debug)]
pub struct ResidualBranch<B: Backend> {
    conv1: Conv2d<B>,
    activation: Relu,
    conv2: Conv2d<B>,
}

impl<B: Backend> ResidualBranch<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.activation.forward(x);
        self.conv2.forward(x)
    }
}

/// Structure-Detail coupling block
#[derive(Module, Debug)]
pub struct SdBlock<B: Backend> {
    structure_net: ResidualBranch<B>,
    detail_net: ResidualBranch<B>,
}

impl<B: Backend> SdBlock<B> {
    /// Refine a (structure, detail) pair.
    ///
    /// # Arguments
    /// * `structure` - Structure branch [B, C, H, W]
    /// * `detail` - Detail branch, same shape as `structure`
    ///
    /// # Returns
    /// * `(structure + SUM, detail + SUM)` with `SUM = fS + fD`
    pub fn forward(
        &self,
        structure: Tensor<B, 4>,
        detail: Tensor<B, 4>,
    ) -> rsdn_core::Result<(Tensor<B, 4>, Tensor<B, 4>)> {
        ensure_shape("detail branch", structure.dims(), detail.dims())?;

        let coupled = self.structure_net.forward(structure.clone())
            + self.detail_net.forward(detail.clone());

        Ok((structure + coupled.clone(), detail + coupled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Distribution, ElementConversion};
    use burn_ndarray::NdArray;
    use rsdn_core::RsdnError;

    type TestBackend = NdArray<f32>;

    fn max_abs_diff(a: Tensor<TestBackend, 4>, b: Tensor<TestBackend, 4>) -> f32 {
        (a - b).abs().max().into_scalar().elem::<f32>()
    }

    fn normal(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(shape, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_sd_block_shapes() {
        let device = Default::default();
        let block = SdBlockConfig::new(16).init::<TestBackend>(&device);
        let s = normal([2, 16, 6, 5]);
        let d = normal([2, 16, 6, 5]);

        let (s_out, d_out) = block.forward(s, d).unwrap();
        assert_eq!(s_out.dims(), [2, 16, 6, 5]);
        assert_eq!(d_out.dims(), [2, 16, 6, 5]);
    }

    #[test]
    fn test_both_branches_receive_same_residual() {
        let device = Default::default();
        let block = SdBlockConfig::new(8).init::<TestBackend>(&device);
        let s = normal([1, 8, 4, 4]);
        let d = normal([1, 8, 4, 4]);

        let (s_out, d_out) = block.forward(s.clone(), d.clone()).unwrap();
        // S' - S == D' - D == SUM
        let diff = max_abs_diff(s_out - s, d_out - d);
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_coupling_symmetry() {
        let device = Default::default();
        let block = SdBlockConfig::new(8).init::<TestBackend>(&device);
        let swapped = SdBlock {
            structure_net: block.detail_net.clone(),
            detail_net: block.structure_net.clone(),
        };
        let s = normal([2, 8, 5, 5]);
        let d = normal([2, 8, 5, 5]);

        let (s_out, d_out) = block.forward(s.clone(), d.clone()).unwrap();
        let (d_swapped, s_swapped) = swapped.forward(d, s).unwrap();

        assert!(max_abs_diff(s_out, s_swapped) < 1e-5);
        assert!(max_abs_diff(d_out, d_swapped) < 1e-5);
    }

    #[test]
    fn test_zero_weights_are_identity() {
        let device = Default::default();
        let block = SdBlockConfig::new(4)
            .with_initializer(Initializer::Zeros)
            .init::<TestBackend>(&device);
        let s = normal([1, 4, 3, 3]);
        let d = normal([1, 4, 3, 3]);

        let (s_out, d_out) = block.forward(s.clone(), d.clone()).unwrap();
        assert_eq!(max_abs_diff(s_out, s), 0.0);
        assert_eq!(max_abs_diff(d_out, d), 0.0);
    }

    #[test]
    fn test_rejects_mismatched_branches() {
        let device = Default::default();
        let block = SdBlockConfig::new(4).init::<TestBackend>(&device);
        let s = Tensor::<TestBackend, 4>::zeros([1, 4, 3, 3], &device);
        let d = Tensor::<TestBackend, 4>::zeros([1, 4, 3, 4], &device);

        assert!(matches!(
            block.forward(s, d),
            Err(RsdnError::ShapeMismatch { .. })
        ));
    }
}
