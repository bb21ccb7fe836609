//! Adaptive local-kernel gating (HSA)
//!
//! Predicts one K×K kernel per pixel from the current low-resolution frame and
//! runs it as a locally-varying convolution over a hidden map. The sigmoid of
//! that response gates the hidden map elementwise.
//!
//! # Architecture
//!```text
//! frame [B, 3, H, W]
//!   │
//!   ▼
//! Conv3x3 ──► ReLU ──► kernel field [B, K², H, W]
//!                          │
//! hidden [B, C, H, W] ──► local conv (per sample, zero padded)
//!   │                      │
//!   │                      ▼
//!   │                   sigmoid ──► gate [B, C, H, W]
//!   │                      │
//!   └────────────► ⊙ ◄─────┘
//!                  │
//!                  ▼
//!           gated hidden [B, C, H, W]
//!```
//!
//! # Border policy
//!
//! The hidden map is zero padded by `K/2` on every side before the local
//! convolution, so taps that fall outside the frame contribute nothing and the
//! kernel is not renormalised at the border. Output pixel `(h, w)` reads input
//! `(h + kh - K/2, w + kw - K/2)` weighted by tap `kh * K + kw` of its own
//! kernel.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, PaddingConfig2d, Relu};
use burn::prelude::*;
use burn::tensor::activation;

use rsdn_core::shape::{ensure_shape, frame_extent, Extent, FRAME_CHANNELS};
use rsdn_core::RsdnError;

/// Configuration for the adaptive local-kernel module
#[derive(Config, Debug)]
pub struct HsaConfig {
    /// Side length K of the per-pixel kernel (odd)
    #[config(default = "3")]
    pub kernel_size: usize,
    /// Initializer for the kernel-prediction convolution
    #[config(
        default = "Initializer::KaimingUniform { gain: 0.5773502691896258, fan_out_only: false }"
    )]
    pub initializer: Initializer,
}

impl HsaConfig {
    /// Check the kernel size without building the module.
    pub fn validate(&self) -> rsdn_core::Result<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(RsdnError::invalid_configuration(format!(
                "local kernel size must be odd and positive, got {}",
                self.kernel_size
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> rsdn_core::Result<Hsa<B>> {
        self.validate()?;
        let taps = self.kernel_size * self.kernel_size;

        let kernel_conv = Conv2dConfig::new([FRAME_CHANNELS, taps], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_initializer(self.initializer.clone())
            .init(device);

        Ok(Hsa {
            kernel_conv,
            activation: Relu::new(),
            kernel_size: self.kernel_size,
        })
    }
}

/// Adaptive local-kernel gate
#[derive(Module, Debug)]
pub struct Hsa<B: Backend> {
    kernel_conv: Conv2d<B>,
    activation: Relu,
    kernel_size: usize,
}

impl<B: Backend> Hsa<B> {
    /// Kernel side length K.
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Predict the per-pixel kernel field [B, K², H, W] from a frame.
    pub fn kernel_field(&self, frame: Tensor<B, 4>) -> rsdn_core::Result<Tensor<B, 4>> {
        frame_extent("frame", frame.dims())?;
        let logits = self.kernel_conv.forward(frame);
        Ok(self.activation.forward(logits))
    }

    /// Sigmoid gate [B, C, H, W] for `hidden`, every element in [0, 1].
    pub fn gate(
        &self,
        frame: Tensor<B, 4>,
        hidden: Tensor<B, 4>,
    ) -> rsdn_core::Result<Tensor<B, 4>> {
        let extent = frame_extent("frame", frame.dims())?;
        extent.ensure_matches("hidden", hidden.dims())?;

        let kernels = self.kernel_field(frame)?;
        let [batch, channels, height, width] = hidden.dims();
        let taps = self.kernel_size * self.kernel_size;

        // Every sample carries its own kernel field, so the convolution runs
        // per sample and is concatenated back in batch order.
        let responses: Vec<Tensor<B, 4>> = (0..batch)
            .map(|idx| {
                let sample = hidden
                    .clone()
                    .slice([idx..idx + 1, 0..channels, 0..height, 0..width]);
                let kernel = kernels
                    .clone()
                    .slice([idx..idx + 1, 0..taps, 0..height, 0..width]);
                local_conv2d(sample, kernel, self.kernel_size)
            })
            .collect::<rsdn_core::Result<_>>()?;

        let similarity = Tensor::cat(responses, 0);
        Ok(activation::sigmoid(similarity))
    }

    /// Gate `hidden` with kernels predicted from `frame`.
    ///
    /// # Arguments
    /// * `frame` - Current low-resolution frame [B, 3, H, W]
    /// * `hidden` - Hidden map to gate [B, C, H, W]
    ///
    /// # Returns
    /// * `hidden ⊙ gate` with the shape of `hidden`
    pub fn forward(
        &self,
        frame: Tensor<B, 4>,
        hidden: Tensor<B, 4>,
    ) -> rsdn_core::Result<Tensor<B, 4>> {
        let gate = self.gate(frame, hidden.clone())?;
        Ok(hidden * gate)
    }
}

/// Locally-varying convolution with zero padding.
///
/// `kernels` holds one row-major K×K kernel per output pixel, shared by every
/// channel of `input`.
///
/// # Arguments
/// * `input` - Map to convolve [B, C, H, W]
/// * `kernels` - Kernel field [B, K², H, W]
/// * `kernel_size` - Odd side length K
///
/// # Returns
/// * Response [B, C, H, W]
///
/// # Errors
/// * `InvalidConfiguration` for an even or zero `kernel_size`
/// * `ShapeMismatch` unless `kernels` is exactly [B, K², H, W] for the
///   batch and spatial size of `input`
pub fn local_conv2d<B: Backend>(
    input: Tensor<B, 4>,
    kernels: Tensor<B, 4>,
    kernel_size: usize,
) -> rsdn_core::Result<Tensor<B, 4>> {
    HsaConfig::new().with_kernel_size(kernel_size).validate()?;
    let extent = Extent::of(input.dims());
    let taps = kernel_size * kernel_size;
    ensure_shape("kernel field", extent.with_channels(taps), kernels.dims())?;

    let [batch, channels, height, width] = input.dims();
    let device = input.device();
    let pad = kernel_size / 2;

    let padded = Tensor::zeros(
        [batch, channels, height + 2 * pad, width + 2 * pad],
        &device,
    )
    .slice_assign(
        [0..batch, 0..channels, pad..pad + height, pad..pad + width],
        input,
    );

    let mut response = Tensor::zeros([batch, channels, height, width], &device);
    for kh in 0..kernel_size {
        for kw in 0..kernel_size {
            let tap = kh * kernel_size + kw;
            // [B, 1, H, W] broadcasts over channels
            let weight = kernels
                .clone()
                .slice([0..batch, tap..tap + 1, 0..height, 0..width]);
            let window = padded
                .clone()
                .slice([0..batch, 0..channels, kh..kh + height, kw..kw + width]);
            response = response + window * weight;
        }
    }

    Ok(response)
}
