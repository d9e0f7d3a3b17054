/// Sound emitter
///
/// A reusable playback unit wrapping one backend voice. Emitters are owned by
/// the pool and move through `Idle -> Bound -> Playing -> Idle` once per
/// play session.
use std::fmt;
use std::sync::Arc;

use crate::error::{TransitionError, VoiceError};

use super::sound::{SoundDefinition, SoundParameter};
use super::voice::{Position, StopMode, VoiceBackend, VoiceHandle, ORIGIN};
use super::watcher::WatchToken;

/// Emitter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmitterState {
    /// No sound bound
    #[default]
    Idle,

    /// Sound bound and voice created, not started
    Bound,

    /// Voice started
    Playing,
}

impl EmitterState {
    pub fn description(&self) -> &'static str {
        match self {
            EmitterState::Idle => "Idle",
            EmitterState::Bound => "Bound",
            EmitterState::Playing => "Playing",
        }
    }
}

/// Reference to one play session of one pooled emitter.
///
/// The session number changes every time the slot is acquired, so a handle
/// kept after its emitter was reclaimed can never touch the next session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterHandle {
    pub(crate) index: usize,
    pub(crate) session: u64,
}

impl EmitterHandle {
    /// Slot index inside the pool
    pub fn index(&self) -> usize {
        self.index
    }

    /// Session number this handle was issued for
    pub fn session(&self) -> u64 {
        self.session
    }
}

impl fmt::Display for EmitterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emitter#{}.{}", self.index, self.session)
    }
}

#[derive(Debug)]
pub struct Emitter {
    index: usize,
    session: u64,
    state: EmitterState,
    definition: Option<Arc<SoundDefinition>>,
    voice: Option<VoiceHandle>,
    position: Option<Position>,
    parameters: Vec<SoundParameter>,
    watch: Option<WatchToken>,
}

impl Emitter {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            session: 0,
            state: EmitterState::Idle,
            definition: None,
            voice: None,
            position: None,
            parameters: Vec::new(),
            watch: None,
        }
    }

    pub fn handle(&self) -> EmitterHandle {
        EmitterHandle {
            index: self.index,
            session: self.session,
        }
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn definition(&self) -> Option<&Arc<SoundDefinition>> {
        self.definition.as_ref()
    }

    pub fn voice(&self) -> Option<VoiceHandle> {
        self.voice
    }

    /// World position, origin when none was given
    pub fn position(&self) -> Position {
        self.position.unwrap_or(ORIGIN)
    }

    /// Position explicitly requested for this session, if any
    pub fn placement(&self) -> Option<Position> {
        self.position
    }

    /// Parameters applied during the current session, in order
    pub fn parameters(&self) -> &[SoundParameter] {
        &self.parameters
    }

    /// Last value applied for a parameter name
    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }

    pub fn is_playing(&self) -> bool {
        self.state == EmitterState::Playing
    }

    pub(crate) fn session(&self) -> u64 {
        self.session
    }

    pub(crate) fn begin_session(&mut self) -> EmitterHandle {
        self.session += 1;
        self.handle()
    }

    /// Bind a sound and create its voice
    pub fn initialize<B: VoiceBackend + ?Sized>(
        &mut self,
        definition: Arc<SoundDefinition>,
        backend: &mut B,
    ) -> Result<(), InitializeError> {
        if self.state != EmitterState::Idle {
            return Err(TransitionError::NotIdle(self.state).into());
        }

        let voice = backend.create_voice(&definition)?;
        tracing::debug!("{} bound {} to {}", self.handle(), definition.sound, voice);

        self.voice = Some(voice);
        self.definition = Some(definition);
        self.state = EmitterState::Bound;
        Ok(())
    }

    /// Record a placement; attached to the voice when playback starts
    pub fn set_position(&mut self, position: Position) {
        self.position = Some(position);
    }

    /// Forward a named parameter to the voice
    pub fn apply_parameter<B: VoiceBackend + ?Sized>(
        &mut self,
        name: &str,
        value: f32,
        backend: &mut B,
    ) {
        let Some(voice) = self.voice else {
            return;
        };

        match backend.set_parameter(voice, name, value) {
            Ok(()) => self.parameters.push(SoundParameter::new(name, value)),
            Err(e) => tracing::warn!("{}: failed to set parameter {}: {}", self.handle(), name, e),
        }
    }

    /// Start the bound voice, optionally attaching it to a world position
    pub fn play<B: VoiceBackend + ?Sized>(
        &mut self,
        position: Option<Position>,
        backend: &mut B,
    ) -> Result<(), PlayError> {
        if self.state != EmitterState::Bound {
            return Err(TransitionError::NotBound(self.state).into());
        }
        let Some(voice) = self.voice else {
            return Err(TransitionError::NotBound(self.state).into());
        };

        if let Some(position) = position {
            self.position = Some(position);
            if let Err(e) = backend.attach_to_position(voice, position) {
                tracing::warn!("{}: failed to attach position: {}", self.handle(), e);
            }
        }

        backend.start(voice)?;
        self.state = EmitterState::Playing;
        Ok(())
    }

    /// Stop immediately and release the voice.
    ///
    /// Returns false when the emitter had nothing to stop.
    pub fn stop<B: VoiceBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        if self.state == EmitterState::Idle {
            return false;
        }

        self.watch = None;
        if let Some(voice) = self.voice.take() {
            backend.stop(voice, StopMode::Immediate);
            backend.release(voice);
        }
        self.state = EmitterState::Idle;
        true
    }

    /// Natural end of playback: release the voice without stopping it
    pub fn finish<B: VoiceBackend + ?Sized>(&mut self, backend: &mut B) {
        self.watch = None;
        if let Some(voice) = self.voice.take() {
            backend.release(voice);
        }
        self.state = EmitterState::Idle;
    }

    pub(crate) fn set_watch(&mut self, token: WatchToken) {
        self.watch = Some(token);
    }

    pub(crate) fn take_watch(&mut self) -> Option<WatchToken> {
        self.watch.take()
    }

    pub(crate) fn is_watched_by(&self, token: WatchToken) -> bool {
        self.watch == Some(token)
    }

    /// Return to neutral defaults, keeping the session counter
    pub(crate) fn reset(&mut self) {
        self.state = EmitterState::Idle;
        self.definition = None;
        self.voice = None;
        self.position = None;
        self.parameters.clear();
        self.watch = None;
    }
}

/// Failure to bind a sound
#[derive(Debug, thiserror::Error)]
pub enum InitializeError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// Failure to start playback
#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}
