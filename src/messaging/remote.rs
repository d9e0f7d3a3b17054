/// Cross-thread access to the sound engine
///
/// The engine is single-threaded. Other threads hold a `SoundRemote` and send
/// commands; the engine drains its `CommandQueue` at the start of each tick.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use super::commands::SoundCommand;
use crate::audio_system::{EmitterHandle, PlaybackRequest};

/// Receiving side, owned by the engine
pub struct CommandQueue {
    command_tx: Sender<SoundCommand>,
    command_rx: Receiver<SoundCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            command_tx: tx,
            command_rx: rx,
        }
    }

    /// Get a cloneable sender for other threads
    pub fn remote(&self) -> SoundRemote {
        SoundRemote {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Take every command queued so far, oldest first
    pub fn drain(&self) -> Vec<SoundCommand> {
        let mut commands = Vec::new();
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => commands.push(command),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        commands
    }

    pub fn pending(&self) -> usize {
        self.command_rx.len()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, `Send` handle for queueing commands
#[derive(Clone)]
pub struct SoundRemote {
    command_tx: Sender<SoundCommand>,
}

impl SoundRemote {
    /// Queue a command; false once the engine is gone
    pub fn send(&self, command: SoundCommand) -> bool {
        self.command_tx.send(command).is_ok()
    }

    pub fn play(&self, request: PlaybackRequest) -> bool {
        self.send(SoundCommand::Play(request))
    }

    pub fn stop(&self, handle: EmitterHandle) -> bool {
        self.send(SoundCommand::Stop(handle))
    }

    pub fn stop_all(&self) -> bool {
        self.send(SoundCommand::StopAll)
    }

    pub fn set_parameter(&self, handle: EmitterHandle, name: impl Into<String>, value: f32) -> bool {
        self.send(SoundCommand::SetParameter {
            handle,
            name: name.into(),
            value,
        })
    }

    pub fn shutdown(&self) -> bool {
        self.send(SoundCommand::Shutdown)
    }
}
