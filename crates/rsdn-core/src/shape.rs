//! Shape checks for `[batch, channels, height, width]` tensors.
//!
//! The network only ever sees 4D tensors, so the checks work on the raw
//! `dims()` arrays and leave tensor access to the caller.

use crate::error::{Result, RsdnError};

/// Number of channels of an RGB frame.
pub const FRAME_CHANNELS: usize = 3;

/// Batch and spatial extent shared by all tensors of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
}

impl Extent {
    /// Extent of a `[batch, channels, height, width]` shape.
    pub fn of(dims: [usize; 4]) -> Self {
        Self {
            batch: dims[0],
            height: dims[2],
            width: dims[3],
        }
    }

    /// Full shape with the given channel count.
    pub fn with_channels(&self, channels: usize) -> [usize; 4] {
        [self.batch, channels, self.height, self.width]
    }

    /// Fails unless `dims` has this extent, whatever its channel count.
    pub fn ensure_matches(&self, tensor: &str, dims: [usize; 4]) -> Result<()> {
        let other = Self::of(dims);
        if other != *self {
            return Err(RsdnError::dimension_mismatch(format!(
                "{tensor} has batch {} and spatial size {}x{}, expected batch {} and {}x{}",
                other.batch, other.height, other.width, self.batch, self.height, self.width
            )));
        }
        Ok(())
    }
}

/// Fails unless `actual` equals `expected` exactly.
pub fn ensure_shape(tensor: &str, expected: [usize; 4], actual: [usize; 4]) -> Result<()> {
    if expected != actual {
        return Err(RsdnError::shape_mismatch(tensor, expected, actual));
    }
    Ok(())
}

/// Fails unless `dims` has exactly `channels` channels and a non-empty extent.
pub fn ensure_channels(tensor: &str, dims: [usize; 4], channels: usize) -> Result<()> {
    if dims[1] != channels {
        let mut expected = dims;
        expected[1] = channels;
        return Err(RsdnError::shape_mismatch(tensor, expected, dims));
    }
    if dims[0] == 0 || dims[2] == 0 || dims[3] == 0 {
        return Err(RsdnError::empty_input(format!("{tensor} has shape {dims:?}")));
    }
    Ok(())
}

/// Validates a 3-channel frame and returns its extent.
pub fn frame_extent(tensor: &str, dims: [usize; 4]) -> Result<Extent> {
    ensure_channels(tensor, dims, FRAME_CHANNELS)?;
    Ok(Extent::of(dims))
}
