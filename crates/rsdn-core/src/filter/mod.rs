pub mod gaussian;

pub use gaussian::GaussianBlur;
