pub mod checkpoint;

pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointRecorder};
