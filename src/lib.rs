//! Pooled sound playback engine
//!
//! Emitters are recycled through a bounded pool, frequently triggered sounds
//! are capped by evicting the oldest instance, and finished one-shots return
//! to the pool on their own once their voice stops.

pub mod audio_system;
pub mod config;
pub mod error;
pub mod messaging;
pub mod utils;

pub use audio_system::{
    EmitterHandle, PlayOutcome, PlaybackRequest, SimulatedBackend, SoundDefinition, SoundEngine,
    SoundLibrary, VoiceBackend,
};
pub use config::AudioConfig;
pub use error::{AppResult, ConfigError, TransitionError, VoiceError};
