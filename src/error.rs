use thiserror::Error;

use crate::audio_system::emitter::EmitterState;
use crate::audio_system::voice::VoiceHandle;

/// Library errors using thiserror for structured error handling.
///
/// Playback itself never fails loudly: these errors are recovered inside the
/// engine and surface to callers as a `PlayOutcome`. Configuration errors are
/// the only ones a host is expected to handle.

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    #[error("Invalid voice handle: {0}")]
    InvalidHandle(VoiceHandle),

    #[error("Failed to decode audio for sound {sound}")]
    DecodeFailed {
        sound: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Audio backend failure")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Emitter state machine violations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Emitter must be idle to bind a sound (currently {0:?})")]
    NotIdle(EmitterState),

    #[error("Emitter must be bound before it can play (currently {0:?})")]
    NotBound(EmitterState),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
