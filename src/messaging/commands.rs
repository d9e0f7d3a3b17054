/// Command types for the sound engine
///
/// Commands represent requests to perform actions (imperative). They are
/// queued by `SoundRemote` from any thread and applied by the engine at the
/// start of its next tick.
use crate::audio_system::{EmitterHandle, PlaybackRequest};

/// Sound engine commands
#[derive(Debug, Clone)]
pub enum SoundCommand {
    /// Admit, bind and start a sound
    Play(PlaybackRequest),

    /// Stop one emitter and return it to the pool
    Stop(EmitterHandle),

    /// Stop every active emitter
    StopAll,

    /// Update a parameter on a playing emitter
    SetParameter {
        handle: EmitterHandle,
        name: String,
        value: f32,
    },

    /// Tear the engine down
    Shutdown,
}

impl SoundCommand {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            SoundCommand::Play(request) => match &request.definition {
                Some(definition) => format!("Play {}", definition.sound),
                None => "Play (no sound)".to_string(),
            },
            SoundCommand::Stop(handle) => format!("Stop {}", handle),
            SoundCommand::StopAll => "Stop all sounds".to_string(),
            SoundCommand::SetParameter {
                handle,
                name,
                value,
            } => format!("Set {}={} on {}", name, value, handle),
            SoundCommand::Shutdown => "Shut down sound engine".to_string(),
        }
    }
}
