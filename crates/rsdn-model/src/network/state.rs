//! Recurrent state threaded between time steps.
//!
//! The network itself holds no history. Each step returns the hidden tensors
//! the next step needs and the caller hands them back. The carried tensors
//! travel together as one value, so a step can never see one of them without
//! the other two.

use burn::prelude::*;

use rsdn_core::shape::{ensure_shape, Extent};
use rsdn_core::{Result, RsdnError};

/// Hidden tensors produced by one step and consumed by the next.
///
/// All three are [batch, hidden_channels, H, W].
#[derive(Debug, Clone)]
pub struct HiddenState<B: Backend> {
    /// Projected structure branch (`S_hat`)
    pub structure: Tensor<B, 4>,
    /// Projected detail branch (`D_hat`)
    pub detail: Tensor<B, 4>,
    /// Fused structure + detail projection (`SD`)
    pub fused: Tensor<B, 4>,
}

impl<B: Backend> HiddenState<B> {
    /// All-zero state used before the first frame of a sequence.
    pub fn zeros(shape: [usize; 4], device: &B::Device) -> Self {
        let zeros = Tensor::zeros(shape, device);
        Self {
            structure: zeros.clone(),
            detail: zeros.clone(),
            fused: zeros,
        }
    }

    /// Fails unless every tensor has exactly `shape`.
    pub fn validate(&self, shape: [usize; 4]) -> Result<()> {
        ensure_shape("carried structure state", shape, self.structure.dims())?;
        ensure_shape("carried detail state", shape, self.detail.dims())?;
        ensure_shape("carried fused state", shape, self.fused.dims())?;
        Ok(())
    }

    /// Batch and spatial extent of the state.
    pub fn extent(&self) -> Extent {
        Extent::of(self.structure.dims())
    }
}

/// Recurrent state entering a step.
#[derive(Debug, Clone)]
pub enum RecurrentState<B: Backend> {
    /// First frame of a sequence; equivalent to an all-zero carried state.
    Initial,
    /// Hidden tensors returned by the previous step.
    Carried(HiddenState<B>),
}

impl<B: Backend> Default for RecurrentState<B> {
    fn default() -> Self {
        Self::Initial
    }
}

impl<B: Backend> From<HiddenState<B>> for RecurrentState<B> {
    fn from(state: HiddenState<B>) -> Self {
        Self::Carried(state)
    }
}

impl<B: Backend> RecurrentState<B> {
    /// Build a state from independently optional tensors.
    ///
    /// Either all three are present or none is; anything in between is
    /// rejected instead of filling the gaps with zeros.
    pub fn from_parts(
        structure: Option<Tensor<B, 4>>,
        detail: Option<Tensor<B, 4>>,
        fused: Option<Tensor<B, 4>>,
    ) -> Result<Self> {
        match (structure, detail, fused) {
            (None, None, None) => Ok(Self::Initial),
            (Some(structure), Some(detail), Some(fused)) => Ok(Self::Carried(HiddenState {
                structure,
                detail,
                fused,
            })),
            (structure, detail, fused) => {
                let names = [
                    ("structure", structure.is_some()),
                    ("detail", detail.is_some()),
                    ("fused", fused.is_some()),
                ];
                let supplied: Vec<&str> = names
                    .iter()
                    .filter(|(_, present)| *present)
                    .map(|(name, _)| *name)
                    .collect();
                let missing: Vec<&str> = names
                    .iter()
                    .filter(|(_, present)| !*present)
                    .map(|(name, _)| *name)
                    .collect();
                Err(RsdnError::partial_state(format!(
                    "supplied {} but not {}; pass all three hidden tensors or none",
                    supplied.join(", "),
                    missing.join(", ")
                )))
            }
        }
    }

    /// True before the first step of a sequence.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Initial)
    }

    /// Concrete hidden tensors of `shape`, zeros for the initial state.
    pub fn resolve(self, shape: [usize; 4], device: &B::Device) -> Result<HiddenState<B>> {
        match self {
            Self::Initial => Ok(HiddenState::zeros(shape, device)),
            Self::Carried(state) => {
                state.validate(shape)?;
                Ok(state)
            }
        }
    }
}
