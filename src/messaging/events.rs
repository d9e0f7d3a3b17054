/// Event types for the sound engine
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers.
use crate::audio_system::{EmitterHandle, PlayOutcome, SoundId};

/// Sound engine events
#[derive(Debug, Clone)]
pub enum SoundEvent {
    /// A voice started on an emitter
    Played {
        handle: EmitterHandle,
        sound: SoundId,
    },

    /// A request did not produce a voice
    Denied {
        sound: Option<SoundId>,
        outcome: PlayOutcome,
    },

    /// The oldest frequent sound was stopped to admit a new one
    Evicted {
        handle: EmitterHandle,
        sound: SoundId,
    },

    /// A non-looping voice ended on its own
    Completed {
        handle: EmitterHandle,
        sound: SoundId,
    },

    /// An emitter was stopped explicitly
    Stopped { handle: EmitterHandle },

    /// A voice outlived the maximum watch duration and was stopped
    Expired {
        handle: EmitterHandle,
        sound: SoundId,
    },

    /// The engine was torn down
    Shutdown,
}

impl SoundEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SoundEvent::Played { handle, sound } => format!("Playing {} on {}", sound, handle),
            SoundEvent::Denied { sound, outcome } => match sound {
                Some(sound) => format!("{} {}", sound, outcome),
                None => format!("Request {}", outcome),
            },
            SoundEvent::Evicted { handle, sound } => format!("Evicted {} from {}", sound, handle),
            SoundEvent::Completed { handle, sound } => {
                format!("Finished {} on {}", sound, handle)
            }
            SoundEvent::Stopped { handle } => format!("Stopped {}", handle),
            SoundEvent::Expired { handle, sound } => {
                format!("Watch expired for {} on {}", sound, handle)
            }
            SoundEvent::Shutdown => "Sound engine shut down".to_string(),
        }
    }
}
