/// Fluent sound request builder
///
/// ```rust,ignore
/// engine
///     .create_sound()
///     .with_sound(footsteps.clone())
///     .with_position(player_position)
///     .with_random_pitch(true, 0.05)
///     .play();
/// ```
///
/// `play` consumes the builder: one builder per play call.
use std::fmt;
use std::sync::Arc;

use super::emitter::EmitterHandle;
use super::manager::SoundEngine;
use super::sound::{SoundDefinition, SoundParameter};
use super::voice::{Position, VoiceBackend};

/// Everything needed to start one sound
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackRequest {
    pub definition: Option<Arc<SoundDefinition>>,
    pub position: Option<Position>,
    /// Half-width of the uniform pitch offset, when enabled
    pub random_pitch: Option<f32>,
    pub parameters: Vec<SoundParameter>,
}

impl PlaybackRequest {
    pub fn new(definition: Arc<SoundDefinition>) -> Self {
        Self {
            definition: Some(definition),
            ..Self::default()
        }
    }
}

/// Result of a play attempt.
///
/// Only `Played` means a voice was started (or bound, for `prepare`); every
/// other variant means the sound silently did not play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played(EmitterHandle),
    DeniedByAdmission,
    DeniedPoolExhausted,
    MisconfiguredNoSound,
    VoiceUnavailable,
    /// Handle is stale or does not refer to an emitter in the expected state
    NotPrepared,
    EngineShutDown,
}

impl PlayOutcome {
    pub fn is_played(&self) -> bool {
        matches!(self, PlayOutcome::Played(_))
    }

    pub fn handle(&self) -> Option<EmitterHandle> {
        match self {
            PlayOutcome::Played(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl fmt::Display for PlayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayOutcome::Played(handle) => write!(f, "played on {}", handle),
            PlayOutcome::DeniedByAdmission => write!(f, "denied by frequent-sound cap"),
            PlayOutcome::DeniedPoolExhausted => write!(f, "denied: emitter pool exhausted"),
            PlayOutcome::MisconfiguredNoSound => write!(f, "no sound configured"),
            PlayOutcome::VoiceUnavailable => write!(f, "voice could not be created or started"),
            PlayOutcome::NotPrepared => write!(f, "emitter is not in a playable state"),
            PlayOutcome::EngineShutDown => write!(f, "engine is shut down"),
        }
    }
}

/// Collects a `PlaybackRequest` and submits it to the engine
pub struct SoundBuilder<'a, B: VoiceBackend> {
    engine: &'a mut SoundEngine<B>,
    request: PlaybackRequest,
}

impl<'a, B: VoiceBackend> SoundBuilder<'a, B> {
    pub(crate) fn new(engine: &'a mut SoundEngine<B>) -> Self {
        Self {
            engine,
            request: PlaybackRequest::default(),
        }
    }

    pub fn with_sound(mut self, definition: Arc<SoundDefinition>) -> Self {
        self.request.definition = Some(definition);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.request.position = Some(position);
        self
    }

    /// Randomize pitch by up to `range` in either direction
    pub fn with_random_pitch(mut self, enabled: bool, range: f32) -> Self {
        self.request.random_pitch = if enabled { Some(range) } else { None };
        self
    }

    /// Add a named parameter; may be called repeatedly
    pub fn with_parameter(mut self, name: impl Into<String>, value: f32) -> Self {
        self.request.parameters.push(SoundParameter::new(name, value));
        self
    }

    /// Inspect the request built so far
    pub fn request(&self) -> &PlaybackRequest {
        &self.request
    }

    /// Admit, bind and start the sound
    pub fn play(self) -> PlayOutcome {
        self.engine.play_request(self.request)
    }

    /// Admit and bind the sound; it only starts if marked play-on-ready
    pub fn prepare(self) -> PlayOutcome {
        self.engine.prepare_request(self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        let handle = EmitterHandle {
            index: 2,
            session: 5,
        };
        assert!(PlayOutcome::Played(handle).is_played());
        assert_eq!(PlayOutcome::Played(handle).handle(), Some(handle));
        assert!(!PlayOutcome::DeniedByAdmission.is_played());
        assert_eq!(PlayOutcome::DeniedPoolExhausted.handle(), None);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            PlayOutcome::MisconfiguredNoSound.to_string(),
            "no sound configured"
        );
        let handle = EmitterHandle {
            index: 1,
            session: 3,
        };
        assert_eq!(PlayOutcome::Played(handle).to_string(), "played on emitter#1.3");
    }

    #[test]
    fn test_request_new() {
        let def = SoundDefinition::new("coin").shared();
        let request = PlaybackRequest::new(def.clone());
        assert_eq!(request.definition, Some(def));
        assert!(request.position.is_none());
        assert!(request.random_pitch.is_none());
        assert!(request.parameters.is_empty());
    }
}
