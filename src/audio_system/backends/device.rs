/// Device voice backend
///
/// Plays voices on the default output device through rodio spatial sinks.
/// Assets are preloaded into memory once; every voice decodes its own copy.
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, SpatialSink};

use crate::audio_system::sound::{SoundDefinition, SoundId, PITCH_PARAMETER};
use crate::audio_system::voice::{Position, PlaybackState, StopMode, VoiceBackend, VoiceHandle, ORIGIN};
use crate::error::VoiceError;

/// Parameter mapped onto sink volume
pub const VOLUME_PARAMETER: &str = "Volume";

/// Distance between the listener's ears
const EAR_SPACING: f32 = 0.2;

pub struct RodioBackend {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    assets: HashMap<SoundId, Arc<Vec<u8>>>,
    voices: HashMap<VoiceHandle, SpatialSink>,
    next_voice: u64,
    listener: Position,
}

impl RodioBackend {
    /// Open the default output device and preload every asset
    pub fn new(assets: &BTreeMap<String, PathBuf>) -> Result<Self, VoiceError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| VoiceError::Backend(Box::new(e)))?;

        let mut loaded = HashMap::with_capacity(assets.len());
        for (sound, path) in assets {
            let data = std::fs::read(path).map_err(|e| VoiceError::DecodeFailed {
                sound: sound.clone(),
                source: Box::new(e),
            })?;
            tracing::info!(
                "✓ Preloaded audio file: {} ({} bytes)",
                path.display(),
                data.len()
            );
            loaded.insert(SoundId::new(sound.as_str()), Arc::new(data));
        }

        Ok(Self {
            _stream: stream,
            stream_handle,
            assets: loaded,
            voices: HashMap::new(),
            next_voice: 0,
            listener: ORIGIN,
        })
    }

    /// Move the listener; spatial sinks are re-panned immediately
    pub fn set_listener_position(&mut self, position: Position) {
        self.listener = position;
        let (left, right) = ears(position);
        for sink in self.voices.values() {
            sink.set_left_ear_position(left);
            sink.set_right_ear_position(right);
        }
    }

    fn sink(&self, voice: VoiceHandle) -> Result<&SpatialSink, VoiceError> {
        self.voices.get(&voice).ok_or(VoiceError::InvalidHandle(voice))
    }
}

fn ears(listener: Position) -> (Position, Position) {
    let [x, y, z] = listener;
    ([x - EAR_SPACING / 2.0, y, z], [x + EAR_SPACING / 2.0, y, z])
}

impl VoiceBackend for RodioBackend {
    fn create_voice(&mut self, sound: &SoundDefinition) -> Result<VoiceHandle, VoiceError> {
        let data = self
            .assets
            .get(&sound.sound)
            .ok_or_else(|| VoiceError::UnknownSound(sound.sound.to_string()))?;

        let (left, right) = ears(self.listener);
        let sink = SpatialSink::try_new(&self.stream_handle, self.listener, left, right)
            .map_err(|e| VoiceError::Backend(Box::new(e)))?;
        sink.pause();

        // Decoder needs owned 'static data
        let cursor = Cursor::new((**data).clone());
        let decode_failed = |e: rodio::decoder::DecoderError| VoiceError::DecodeFailed {
            sound: sound.sound.to_string(),
            source: Box::new(e),
        };
        if sound.looping {
            sink.append(Decoder::new_looped(cursor).map_err(decode_failed)?);
        } else {
            sink.append(Decoder::new(cursor).map_err(decode_failed)?);
        }

        self.next_voice += 1;
        let voice = VoiceHandle(self.next_voice);
        self.voices.insert(voice, sink);
        tracing::debug!("Created {} for {}", voice, sound.sound);
        Ok(voice)
    }

    fn start(&mut self, voice: VoiceHandle) -> Result<(), VoiceError> {
        self.sink(voice)?.play();
        Ok(())
    }

    fn stop(&mut self, voice: VoiceHandle, mode: StopMode) {
        if let Some(sink) = self.voices.get(&voice) {
            match mode {
                StopMode::Immediate => sink.stop(),
                // Spatial sinks have no authored release; let the clip end
                StopMode::AllowFadeOut => {}
            }
        }
    }

    fn release(&mut self, voice: VoiceHandle) {
        if let Some(sink) = self.voices.remove(&voice) {
            sink.stop();
        }
    }

    fn set_parameter(&mut self, voice: VoiceHandle, name: &str, value: f32) -> Result<(), VoiceError> {
        let sink = self.sink(voice)?;
        match name {
            PITCH_PARAMETER => sink.set_speed(value.max(0.01)),
            VOLUME_PARAMETER => sink.set_volume(value.clamp(0.0, 1.0)),
            other => tracing::debug!("{}: parameter {} has no device mapping", voice, other),
        }
        Ok(())
    }

    fn playback_state(&self, voice: VoiceHandle) -> PlaybackState {
        match self.voices.get(&voice) {
            None => PlaybackState::Invalid,
            Some(sink) if sink.empty() => PlaybackState::Stopped,
            Some(_) => PlaybackState::Playing,
        }
    }

    fn attach_to_position(&mut self, voice: VoiceHandle, position: Position) -> Result<(), VoiceError> {
        self.sink(voice)?.set_emitter_position(position);
        Ok(())
    }
}
