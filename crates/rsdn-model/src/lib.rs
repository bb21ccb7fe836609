//! RSDN: Recurrent Structure-Detail Network for video super-resolution
//!
//! Each low-resolution frame is split into a structure and a detail component.
//! Both are fused with hidden state carried over from the previous frame,
//! refined together through a cascade of coupling blocks and projected to an
//! upscaled frame plus the state for the next frame.
//!
//! # Module Structure
//!
//! ```text
//! rsdn-model/
//! ├── hsa/        - Adaptive local-kernel gate
//! ├── sd_block/   - Structure-detail coupling block
//! ├── network/    - Recurrent step, carried state and clip driver
//! └── io/         - Checkpoint loading and saving
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use burn::tensor::Tensor;
//! use burn_ndarray::NdArray;
//! use rsdn_model::{FrameInputs, RecurrentState, RsdnConfig};
//!
//! type B = NdArray;
//! let device = Default::default();
//!
//! let network = RsdnConfig::new().init::<B>(&device).unwrap();
//! let frame = || Tensor::<B, 4>::zeros([1, 3, 32, 32], &device);
//! let inputs = FrameInputs::new(frame(), frame(), frame(), frame(), frame());
//!
//! let output = network.forward(inputs, RecurrentState::Initial).unwrap();
//! assert_eq!(output.hr_frame.dims(), [1, 3, 128, 128]);
//!
//! // The next frame continues from the returned state
//! let state = output.carry();
//! ```

pub mod hsa;
pub mod sd_block;
pub mod network;
pub mod io;

pub use hsa::{local_conv2d, Hsa, HsaConfig};
pub use sd_block::{SdBlock, SdBlockConfig};
pub use network::{
    presets, FrameInputs, HiddenState, RecurrentState, RestoredFrame, Rsdn, RsdnConfig,
    RsdnOutput, SequenceRestorer,
};
