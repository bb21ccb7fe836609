//! Recurrent network
//!
//! ```text
//! network/
//! ├── architecture/  - RSDN step function, configuration and presets
//! ├── state/         - Hidden state carried between steps
//! └── sequence/      - Clip-level driver of the recurrence
//! ```

pub mod architecture;
pub mod state;
pub mod sequence;

pub use architecture::{presets, FrameInputs, Rsdn, RsdnConfig, RsdnOutput};
pub use sequence::{RestoredFrame, SequenceRestorer};
pub use state::{HiddenState, RecurrentState};
