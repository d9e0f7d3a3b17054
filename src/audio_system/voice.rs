/// Voice backend interface
///
/// The audio engine that actually produces sound is an external collaborator.
/// The pool only needs a handful of synchronous calls on opaque voice handles.
use std::fmt;

use crate::error::VoiceError;

use super::sound::SoundDefinition;

/// World-space position used for 3D placement
pub type Position = [f32; 3];

/// Neutral position an emitter returns to when released
pub const ORIGIN: Position = [0.0, 0.0, 0.0];

/// Opaque handle to one voice owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(pub u64);

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Playback state as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Voice is producing audio
    Playing,

    /// Voice is held at a sustain point
    Sustaining,

    /// Voice has finished or was never started
    Stopped,

    /// Handle no longer refers to a live voice
    Invalid,
}

impl PlaybackState {
    /// Whether a completion watcher should keep waiting
    pub fn is_alive(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Sustaining)
    }
}

/// How a voice should be stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Cut the voice off now
    Immediate,

    /// Let authored release/fade play out
    AllowFadeOut,
}

/// Audio engine voice API consumed by the emitters.
///
/// `stop` and `release` must tolerate handles that are already invalid;
/// emitters call them unconditionally when they are reclaimed.
pub trait VoiceBackend {
    /// Create a voice for the given sound without starting it
    fn create_voice(&mut self, sound: &SoundDefinition) -> Result<VoiceHandle, VoiceError>;

    /// Start a created voice
    fn start(&mut self, voice: VoiceHandle) -> Result<(), VoiceError>;

    /// Stop a voice
    fn stop(&mut self, voice: VoiceHandle, mode: StopMode);

    /// Free the resources held by a voice
    fn release(&mut self, voice: VoiceHandle);

    /// Set a named parameter on a voice
    fn set_parameter(&mut self, voice: VoiceHandle, name: &str, value: f32) -> Result<(), VoiceError>;

    /// Query the current playback state
    fn playback_state(&self, voice: VoiceHandle) -> PlaybackState;

    /// Attach a voice to a world position for spatialization
    fn attach_to_position(&mut self, voice: VoiceHandle, position: Position) -> Result<(), VoiceError>;

    /// Advance backend bookkeeping, called once per engine tick
    fn update(&mut self) {}
}
