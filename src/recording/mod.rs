//! Microphone capture feature for parley.
//!
//! Provides audio capture with a two-state toggle (idle/recording) and
//! packaging of captured samples into an in-memory WAV upload payload.

pub mod audio;
pub mod wav;

pub use audio::{AudioRecorder, RecorderState};
pub use wav::encode_wav;
