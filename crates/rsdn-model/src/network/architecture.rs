//! RSDN Network Architecture - Recurrent Structure-Detail Network
//!
//! One time step of recurrent video super-resolution. The step fuses the
//! current frame's structure/detail inputs with the hidden state carried from
//! the previous frame, refines both branches through a cascade of coupling
//! blocks and projects them to a high-resolution frame plus the next state.
//!
//! # Architecture Overview
//!
//! ```text
//! [pre_S, S, S_hat, SD]        [pre_D, D, D_hat, SD]
//!          │                            │
//!          ▼                            ▼
//!   Conv3x3 + ReLU               Conv3x3 + ReLU
//!          │                            │
//!          └──────► SDBlock × N ◄───────┘
//!                  (coupled S/D)
//!          ┌────────────┼─────────────┐
//!          ▼            ▼             ▼
//!     Conv (S_hat)  Conv+ReLU (SD) Conv (D_hat)
//!          │                          │
//!          ├──► Conv(cat[S_hat, D_hat]) ──► Up ──► HR frame
//!          ├──► Up ──► S image        │
//!          │                          └──► Up ──► D image
//!          ▼
//!   next state: (S_hat, D_hat, SD)
//! ```
//!
//! "Up" is a transposed convolution whose kernel and stride both equal the
//! upscale factor, mapping `hidden_channels` to an RGB image.

use burn::module::Ignored;
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::{Initializer, PaddingConfig2d, Relu};
use burn::prelude::*;

use rsdn_core::shape::{frame_extent, Extent, FRAME_CHANNELS};
use rsdn_core::RsdnError;

use super::state::{HiddenState, RecurrentState};
use crate::hsa::{Hsa, HsaConfig};
use crate::sd_block::{SdBlock, SdBlockConfig};

/// Configuration for the RSDN network
#[derive(Config, Debug)]
pub struct RsdnConfig {
    /// Channels of every input frame
    #[config(default = "3")]
    pub in_channels: usize,
    /// Channels of every output image
    #[config(default = "3")]
    pub out_channels: usize,
    /// Channels of the structure/detail branches inside the cascade
    #[config(default = "128")]
    pub mid_channels: usize,
    /// Channels of the carried hidden state; must be `3 * upscale_factor²`
    #[config(default = "48")]
    pub hidden_channels: usize,
    /// Number of coupling blocks in the cascade
    #[config(default = "5")]
    pub blocknums: usize,
    /// Spatial upscale of the output images
    #[config(default = "4")]
    pub upscale_factor: usize,
    /// Side length of the adaptive local kernels
    #[config(default = "3")]
    pub hsa_kernel_size: usize,
    /// Gate the carried fused state with the adaptive local kernels
    #[config(default = "false")]
    pub gate_fused_state: bool,
    /// Initializer for every convolution
    #[config(
        default = "Initializer::KaimingUniform { gain: 0.5773502691896258, fan_out_only: false }"
    )]
    pub initializer: Initializer,
}

impl RsdnConfig {
    /// Reject configurations that would only fail deep inside a forward pass.
    pub fn validate(&self) -> rsdn_core::Result<()> {
        if self.in_channels != FRAME_CHANNELS || self.out_channels != FRAME_CHANNELS {
            return Err(RsdnError::invalid_configuration(format!(
                "in_channels and out_channels must be {FRAME_CHANNELS}, got {} and {}",
                self.in_channels, self.out_channels
            )));
        }
        if self.mid_channels == 0 {
            return Err(RsdnError::invalid_configuration("mid_channels must be positive"));
        }
        if self.blocknums == 0 {
            return Err(RsdnError::invalid_configuration("blocknums must be positive"));
        }
        if self.upscale_factor == 0 {
            return Err(RsdnError::invalid_configuration("upscale_factor must be positive"));
        }
        let expected = self.out_channels * self.upscale_factor * self.upscale_factor;
        if self.hidden_channels != expected {
            return Err(RsdnError::invalid_configuration(format!(
                "hidden_channels must be {} * upscale_factor^2 = {expected} at x{}, got {}",
                self.out_channels, self.upscale_factor, self.hidden_channels
            )));
        }
        self.hsa_config().validate()
    }

    /// Configuration of the adaptive local-kernel module.
    pub fn hsa_config(&self) -> HsaConfig {
        HsaConfig::new()
            .with_kernel_size(self.hsa_kernel_size)
            .with_initializer(self.initializer.clone())
    }

    /// Shape of one carried hidden tensor for a given extent.
    pub fn hidden_shape(&self, extent: Extent) -> [usize; 4] {
        extent.with_channels(self.hidden_channels)
    }

    /// Build the network on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> rsdn_core::Result<Rsdn<B>> {
        self.validate()?;

        let conv3x3 = |channels: [usize; 2]| {
            Conv2dConfig::new(channels, [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_initializer(self.initializer.clone())
                .init(device)
        };
        let upsample = || {
            let k = self.upscale_factor;
            ConvTranspose2dConfig::new([self.hidden_channels, self.out_channels], [k, k])
                .with_stride([k, k])
                .with_bias(false)
                .with_initializer(self.initializer.clone())
                .init(device)
        };

        // [pre frame, frame, branch state, fused state]
        let fusion_in = 2 * (self.in_channels + self.hidden_channels);
        let block_config = SdBlockConfig::new(self.mid_channels)
            .with_initializer(self.initializer.clone());
        let blocks = (0..self.blocknums)
            .map(|_| block_config.init(device))
            .collect();

        let network = Rsdn {
            hsa: self.hsa_config().init(device)?,
            fuse_structure: conv3x3([fusion_in, self.mid_channels]),
            fuse_detail: conv3x3([fusion_in, self.mid_channels]),
            blocks,
            fused_projection: conv3x3([self.mid_channels, self.hidden_channels]),
            structure_projection: conv3x3([self.mid_channels, self.hidden_channels]),
            detail_projection: conv3x3([self.mid_channels, self.hidden_channels]),
            hr_projection: conv3x3([2 * self.hidden_channels, self.hidden_channels]),
            upsample_hr: upsample(),
            upsample_structure: upsample(),
            upsample_detail: upsample(),
            activation: Relu::new(),
            hidden_channels: self.hidden_channels,
            mid_channels: self.mid_channels,
            upscale_factor: self.upscale_factor,
            gate_fused_state: Ignored(self.gate_fused_state),
        };

        tracing::debug!(
            "Initialized RSDN: {} blocks, mid {}, hidden {}, x{} ({} parameters)",
            self.blocknums,
            self.mid_channels,
            self.hidden_channels,
            self.upscale_factor,
            network.num_params()
        );

        Ok(network)
    }
}

/// Frame-level inputs of one time step, each [batch, 3, H, W].
#[derive(Debug, Clone)]
pub struct FrameInputs<B: Backend> {
    /// Current low-resolution frame (`It`)
    pub frame: Tensor<B, 4>,
    /// Structure component of the current frame
    pub structure: Tensor<B, 4>,
    /// Detail component of the current frame
    pub detail: Tensor<B, 4>,
    /// Structure component of the previous frame
    pub prev_structure: Tensor<B, 4>,
    /// Detail component of the previous frame
    pub prev_detail: Tensor<B, 4>,
}

impl<B: Backend> FrameInputs<B> {
    pub fn new(
        frame: Tensor<B, 4>,
        structure: Tensor<B, 4>,
        detail: Tensor<B, 4>,
        prev_structure: Tensor<B, 4>,
        prev_detail: Tensor<B, 4>,
    ) -> Self {
        Self {
            frame,
            structure,
            detail,
            prev_structure,
            prev_detail,
        }
    }

    /// Check all five tensors and return their common extent.
    pub fn extent(&self) -> rsdn_core::Result<Extent> {
        let extent = frame_extent("frame", self.frame.dims())?;
        for (name, tensor) in [
            ("structure", &self.structure),
            ("detail", &self.detail),
            ("prev_structure", &self.prev_structure),
            ("prev_detail", &self.prev_detail),
        ] {
            frame_extent(name, tensor.dims())?;
            extent.ensure_matches(name, tensor.dims())?;
        }
        Ok(extent)
    }
}

/// Output of one RSDN step
#[derive(Debug, Clone)]
pub struct RsdnOutput<B: Backend> {
    /// Reconstructed high-resolution frame [batch, 3, uH, uW]
    pub hr_frame: Tensor<B, 4>,
    /// High-resolution structure image [batch, 3, uH, uW]
    pub structure_image: Tensor<B, 4>,
    /// High-resolution detail image [batch, 3, uH, uW]
    pub detail_image: Tensor<B, 4>,
    /// State to hand to the next step [batch, hidden, H, W] each
    pub next_state: HiddenState<B>,
}

impl<B: Backend> RsdnOutput<B> {
    /// State for the next step.
    pub fn carry(&self) -> RecurrentState<B> {
        RecurrentState::Carried(self.next_state.clone())
    }

    /// `(hr, fused, structure, detail, structure_image, detail_image)`
    #[allow(clippy::type_complexity)]
    pub fn into_tuple(
        self,
    ) -> (
        Tensor<B, 4>,
        Tensor<B, 4>,
        Tensor<B, 4>,
        Tensor<B, 4>,
        Tensor<B, 4>,
        Tensor<B, 4>,
    ) {
        (
            self.hr_frame,
            self.next_state.fused,
            self.next_state.structure,
            self.next_state.detail,
            self.structure_image,
            self.detail_image,
        )
    }
}

/// Recurrent Structure-Detail Network
///
/// Stateless step function: everything that persists between frames is
/// returned in [`RsdnOutput::next_state`] and passed back by the caller.
#[derive(Module, Debug)]
pub struct Rsdn<B: Backend> {
    /// Adaptive local-kernel gate for the carried fused state
    hsa: Hsa<B>,
    /// Fusion of structure inputs with the carried state
    fuse_structure: Conv2d<B>,
    /// Fusion of detail inputs with the carried state
    fuse_detail: Conv2d<B>,
    /// Coupling cascade
    blocks: Vec<SdBlock<B>>,
    fused_projection: Conv2d<B>,
    structure_projection: Conv2d<B>,
    detail_projection: Conv2d<B>,
    hr_projection: Conv2d<B>,
    upsample_hr: ConvTranspose2d<B>,
    upsample_structure: ConvTranspose2d<B>,
    upsample_detail: ConvTranspose2d<B>,
    activation: Relu,
    hidden_channels: usize,
    mid_channels: usize,
    upscale_factor: usize,
    gate_fused_state: Ignored<bool>,
}

impl<B: Backend> Rsdn<B> {
    /// Run one time step.
    ///
    /// # Arguments
    /// * `inputs` - Current and previous frame components [batch, 3, H, W]
    /// * `state` - State returned by the previous step, or `Initial`
    ///
    /// # Returns
    /// * HR/structure/detail images and the next state, or an error before
    ///   any computation when shapes disagree
    pub fn forward(
        &self,
        inputs: FrameInputs<B>,
        state: RecurrentState<B>,
    ) -> rsdn_core::Result<RsdnOutput<B>> {
        let extent = inputs.extent()?;
        let device = inputs.frame.device();
        let prior = state.resolve(self.hidden_shape(extent), &device)?;

        let fused_prior = if *self.gate_fused_state {
            self.hsa.forward(inputs.frame, prior.fused)?
        } else {
            prior.fused
        };

        // Fusion: the fused state enters both branches, branch states only their own
        let structure = Tensor::cat(
            vec![
                inputs.prev_structure,
                inputs.structure,
                prior.structure,
                fused_prior.clone(),
            ],
            1,
        );
        let structure = self.activation.forward(self.fuse_structure.forward(structure));

        let detail = Tensor::cat(
            vec![inputs.prev_detail, inputs.detail, prior.detail, fused_prior],
            1,
        );
        let detail = self.activation.forward(self.fuse_detail.forward(detail));

        let (structure, detail) = self.refine(structure, detail)?;

        // Projection
        let fused = self
            .activation
            .forward(self.fused_projection.forward(structure.clone() + detail.clone()));
        let structure_hat = self.structure_projection.forward(structure);
        let detail_hat = self.detail_projection.forward(detail);
        let hr_hidden = self.hr_projection.forward(Tensor::cat(
            vec![structure_hat.clone(), detail_hat.clone()],
            1,
        ));

        Ok(RsdnOutput {
            hr_frame: self.upsample_hr.forward(hr_hidden),
            structure_image: self.upsample_structure.forward(structure_hat.clone()),
            detail_image: self.upsample_detail.forward(detail_hat.clone()),
            next_state: HiddenState {
                structure: structure_hat,
                detail: detail_hat,
                fused,
            },
        })
    }

    /// Thread a (structure, detail) pair through the coupling cascade.
    pub fn refine(
        &self,
        structure: Tensor<B, 4>,
        detail: Tensor<B, 4>,
    ) -> rsdn_core::Result<(Tensor<B, 4>, Tensor<B, 4>)> {
        self.blocks
            .iter()
            .try_fold((structure, detail), |(s, d), block| block.forward(s, d))
    }

    /// Adaptive local-kernel module, available on its own.
    pub fn hsa(&self) -> &Hsa<B> {
        &self.hsa
    }

    /// Shape of one carried hidden tensor for a given extent.
    pub fn hidden_shape(&self, extent: Extent) -> [usize; 4] {
        extent.with_channels(self.hidden_channels)
    }

    pub fn hidden_channels(&self) -> usize {
        self.hidden_channels
    }

    pub fn mid_channels(&self) -> usize {
        self.mid_channels
    }

    pub fn upscale_factor(&self) -> usize {
        self.upscale_factor
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the carried fused state is gated before fusion.
    pub fn gates_fused_state(&self) -> bool {
        *self.gate_fused_state
    }
}

/// Preset configurations
pub mod presets {
    use super::*;

    /// Paper configuration: x4, 128 mid channels, 5 blocks.
    pub fn standard() -> RsdnConfig {
        RsdnConfig::new()
    }

    /// Lighter cascade for fast inference at x4.
    pub fn light() -> RsdnConfig {
        RsdnConfig::new().with_mid_channels(64).with_blocknums(3)
    }

    /// x2 upscaling with a matching 12-channel hidden state.
    pub fn x2() -> RsdnConfig {
        RsdnConfig::new()
            .with_upscale_factor(2)
            .with_hidden_channels(12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Distribution, ElementConversion};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn small_config() -> RsdnConfig {
        RsdnConfig::new().with_mid_channels(8).with_blocknums(2)
    }

    fn random_inputs(batch: usize, h: usize, w: usize) -> FrameInputs<TestBackend> {
        let device = Default::default();
        let t = || {
            Tensor::<TestBackend, 4>::random(
                [batch, 3, h, w],
                Distribution::Uniform(0.0, 1.0),
                &device,
            )
        };
        FrameInputs::new(t(), t(), t(), t(), t())
    }

    #[test]
    fn test_rsdn_creation() {
        let device = Default::default();
        let network = RsdnConfig::new().init::<TestBackend>(&device).unwrap();

        assert_eq!(network.num_blocks(), 5);
        assert_eq!(network.hidden_channels(), 48);
        assert_eq!(network.mid_channels(), 128);
        assert_eq!(network.upscale_factor(), 4);
        assert_eq!(network.hsa().kernel_size(), 3);
        assert!(!network.gates_fused_state());
    }

    #[test]
    fn test_rsdn_forward_shapes() {
        let device = Default::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let output = network.forward(random_inputs(2, 6, 5), RecurrentState::Initial).unwrap();

        assert_eq!(output.hr_frame.dims(), [2, 3, 24, 20]);
        assert_eq!(output.structure_image.dims(), [2, 3, 24, 20]);
        assert_eq!(output.detail_image.dims(), [2, 3, 24, 20]);
        assert_eq!(output.next_state.structure.dims(), [2, 48, 6, 5]);
        assert_eq!(output.next_state.detail.dims(), [2, 48, 6, 5]);
        assert_eq!(output.next_state.fused.dims(), [2, 48, 6, 5]);
    }

    #[test]
    fn test_fused_state_is_rectified() {
        let device = Default::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let output = network.forward(random_inputs(1, 4, 4), RecurrentState::Initial).unwrap();
        let min = output.next_state.fused.min().into_scalar().elem::<f32>();
        assert!(min >= 0.0);
    }

    #[test]
    fn test_x2_preset() {
        let device = Default::default();
        let network = presets::x2()
            .with_mid_channels(8)
            .with_blocknums(1)
            .init::<TestBackend>(&device)
            .unwrap();

        let output = network.forward(random_inputs(1, 5, 7), RecurrentState::Initial).unwrap();
        assert_eq!(output.hr_frame.dims(), [1, 3, 10, 14]);
        assert_eq!(output.next_state.fused.dims(), [1, 12, 5, 7]);
    }

    #[test]
    fn test_gated_fused_state() {
        let device = Default::default();
        let network = small_config()
            .with_gate_fused_state(true)
            .init::<TestBackend>(&device)
            .unwrap();
        assert!(network.gates_fused_state());

        let first = network.forward(random_inputs(1, 4, 4), RecurrentState::Initial).unwrap();
        let second = network.forward(random_inputs(1, 4, 4), first.carry()).unwrap();
        assert_eq!(second.hr_frame.dims(), [1, 3, 16, 16]);
    }

    #[test]
    fn test_rejects_inconsistent_hidden_channels() {
        let device = Default::default();
        let result = RsdnConfig::new()
            .with_hidden_channels(32)
            .init::<TestBackend>(&device);
        match result {
            Err(RsdnError::InvalidConfiguration(msg)) => assert!(msg.contains("48")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_invalid_configs() {
        assert!(RsdnConfig::new().with_in_channels(1).validate().is_err());
        assert!(RsdnConfig::new().with_out_channels(4).validate().is_err());
        assert!(RsdnConfig::new().with_mid_channels(0).validate().is_err());
        assert!(RsdnConfig::new().with_blocknums(0).validate().is_err());
        assert!(RsdnConfig::new().with_upscale_factor(0).validate().is_err());
        assert!(RsdnConfig::new().with_hsa_kernel_size(2).validate().is_err());
        assert!(presets::standard().validate().is_ok());
        assert!(presets::light().validate().is_ok());
        assert!(presets::x2().validate().is_ok());
    }

    #[test]
    fn test_rejects_mismatched_frames() {
        let device = Default::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let mut inputs = random_inputs(1, 4, 4);
        inputs.prev_detail = Tensor::zeros([1, 3, 4, 5], &device);
        assert!(matches!(
            network.forward(inputs, RecurrentState::Initial),
            Err(RsdnError::DimensionMismatch(_))
        ));

        let mut inputs = random_inputs(1, 4, 4);
        inputs.structure = Tensor::zeros([1, 1, 4, 4], &device);
        assert!(matches!(
            network.forward(inputs, RecurrentState::Initial),
            Err(RsdnError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_state_of_wrong_extent() {
        let device = Default::default();
        let network = small_config().init::<TestBackend>(&device).unwrap();

        let stale = HiddenState::zeros([1, 48, 8, 8], &device);
        let result = network.forward(random_inputs(1, 4, 4), stale.into());
        assert!(matches!(result, Err(RsdnError::ShapeMismatch { .. })));
    }
}
