pub mod error;
pub mod shape;
pub mod filter;
pub mod decompose;

pub use error::{Result, RsdnError};
pub use shape::{Extent, FRAME_CHANNELS};
pub use filter::GaussianBlur;
pub use decompose::{DecomposerConfig, StructureDetail, StructureDetailDecomposer};
