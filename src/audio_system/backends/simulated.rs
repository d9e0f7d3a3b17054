/// Headless voice backend
///
/// Voices "play" for a fixed number of updates and then report `Stopped`.
/// Every call is recorded so tests and the demo can inspect what the engine
/// asked for. Faults can be injected per voice or per sound.
///
/// Released voices leave the live set; only the most recent
/// `RETIRED_HISTORY` of them are kept for inspection.
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::audio_system::sound::{SoundDefinition, SoundId, SoundParameter};
use crate::audio_system::voice::{Position, PlaybackState, StopMode, VoiceBackend, VoiceHandle};
use crate::error::VoiceError;

/// Updates a one-shot voice lasts unless configured otherwise
pub const DEFAULT_VOICE_LENGTH: u32 = 30;

/// Released voices kept around for inspection
pub const RETIRED_HISTORY: usize = 256;

#[derive(Debug, Clone)]
struct SimulatedVoice {
    sound: SoundId,
    looping: bool,
    started: bool,
    stop_count: u32,
    release_count: u32,
    remaining: u32,
    forced: Option<PlaybackState>,
    invalid: bool,
    position: Option<Position>,
    parameters: Vec<SoundParameter>,
}

#[derive(Debug)]
pub struct SimulatedBackend {
    voices: BTreeMap<VoiceHandle, SimulatedVoice>,
    retired: VecDeque<(VoiceHandle, SimulatedVoice)>,
    next_voice: u64,
    default_length: u32,
    lengths: HashMap<SoundId, u32>,
    failing: HashSet<SoundId>,
    updates: u64,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            voices: BTreeMap::new(),
            retired: VecDeque::with_capacity(RETIRED_HISTORY),
            next_voice: 0,
            default_length: DEFAULT_VOICE_LENGTH,
            lengths: HashMap::new(),
            failing: HashSet::new(),
            updates: 0,
        }
    }

    /// Length in updates for sounds without an explicit length
    pub fn with_default_length(mut self, updates: u32) -> Self {
        self.default_length = updates;
        self
    }

    /// Set the length in updates of one sound
    pub fn set_length(&mut self, sound: impl Into<SoundId>, updates: u32) {
        self.lengths.insert(sound.into(), updates);
    }

    /// Make voice creation fail for a sound
    pub fn fail_sound(&mut self, sound: impl Into<SoundId>) {
        self.failing.insert(sound.into());
    }

    /// Override the state reported for a voice
    pub fn force_state(&mut self, voice: VoiceHandle, state: PlaybackState) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.forced = Some(state);
        }
    }

    /// Simulate engine-side teardown of a voice
    pub fn invalidate(&mut self, voice: VoiceHandle) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.invalid = true;
        }
    }

    pub fn voices_created(&self) -> usize {
        self.next_voice as usize
    }

    /// Voices started and not yet released
    pub fn live_voices(&self) -> usize {
        self.voices.values().filter(|v| v.started).count()
    }

    /// Voice records held in memory, live and retired
    pub fn retained_voices(&self) -> usize {
        self.voices.len() + self.retired.len()
    }

    /// Known voices for a sound, in creation order
    pub fn voices_for(&self, sound: &str) -> Vec<VoiceHandle> {
        let mut handles: Vec<VoiceHandle> = self
            .voices
            .iter()
            .map(|(&handle, v)| (handle, v))
            .chain(self.retired.iter().map(|(handle, v)| (*handle, v)))
            .filter(|(_, v)| v.sound.as_str() == sound)
            .map(|(handle, _)| handle)
            .collect();
        handles.sort();
        handles
    }

    pub fn sound_of(&self, voice: VoiceHandle) -> Option<&SoundId> {
        self.record(voice).map(|v| &v.sound)
    }

    pub fn is_started(&self, voice: VoiceHandle) -> bool {
        self.record(voice).map_or(false, |v| v.started)
    }

    pub fn stop_count(&self, voice: VoiceHandle) -> u32 {
        self.record(voice).map_or(0, |v| v.stop_count)
    }

    pub fn release_count(&self, voice: VoiceHandle) -> u32 {
        self.record(voice).map_or(0, |v| v.release_count)
    }

    pub fn position(&self, voice: VoiceHandle) -> Option<Position> {
        self.record(voice).and_then(|v| v.position)
    }

    pub fn parameters(&self, voice: VoiceHandle) -> Vec<SoundParameter> {
        self.record(voice)
            .map(|v| v.parameters.clone())
            .unwrap_or_default()
    }

    pub fn parameter(&self, voice: VoiceHandle, name: &str) -> Option<f32> {
        self.record(voice).and_then(|v| {
            v.parameters
                .iter()
                .rev()
                .find(|p| p.name == name)
                .map(|p| p.value)
        })
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn record(&self, voice: VoiceHandle) -> Option<&SimulatedVoice> {
        self.voices.get(&voice).or_else(|| {
            self.retired
                .iter()
                .find(|(handle, _)| *handle == voice)
                .map(|(_, v)| v)
        })
    }

    fn record_mut(&mut self, voice: VoiceHandle) -> Option<&mut SimulatedVoice> {
        match self.voices.get_mut(&voice) {
            Some(v) => Some(v),
            None => self
                .retired
                .iter_mut()
                .find(|(handle, _)| *handle == voice)
                .map(|(_, v)| v),
        }
    }

    fn live_voice_mut(&mut self, voice: VoiceHandle) -> Result<&mut SimulatedVoice, VoiceError> {
        match self.voices.get_mut(&voice) {
            Some(v) if !v.invalid => Ok(v),
            _ => Err(VoiceError::InvalidHandle(voice)),
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceBackend for SimulatedBackend {
    fn create_voice(&mut self, sound: &SoundDefinition) -> Result<VoiceHandle, VoiceError> {
        if self.failing.contains(&sound.sound) {
            return Err(VoiceError::UnknownSound(sound.sound.to_string()));
        }

        self.next_voice += 1;
        let handle = VoiceHandle(self.next_voice);
        let length = self
            .lengths
            .get(&sound.sound)
            .copied()
            .unwrap_or(self.default_length);

        self.voices.insert(
            handle,
            SimulatedVoice {
                sound: sound.sound.clone(),
                looping: sound.looping,
                started: false,
                stop_count: 0,
                release_count: 0,
                remaining: length,
                forced: None,
                invalid: false,
                position: None,
                parameters: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn start(&mut self, voice: VoiceHandle) -> Result<(), VoiceError> {
        let v = self.live_voice_mut(voice)?;
        v.started = true;
        Ok(())
    }

    fn stop(&mut self, voice: VoiceHandle, _mode: StopMode) {
        if let Some(v) = self.record_mut(voice) {
            v.stop_count += 1;
        }
    }

    fn release(&mut self, voice: VoiceHandle) {
        match self.voices.remove(&voice) {
            Some(mut v) => {
                v.release_count += 1;
                if self.retired.len() == RETIRED_HISTORY {
                    self.retired.pop_front();
                }
                self.retired.push_back((voice, v));
            }
            None => {
                if let Some(v) = self.record_mut(voice) {
                    v.release_count += 1;
                }
            }
        }
    }

    fn set_parameter(&mut self, voice: VoiceHandle, name: &str, value: f32) -> Result<(), VoiceError> {
        let v = self.live_voice_mut(voice)?;
        v.parameters.push(SoundParameter::new(name, value));
        Ok(())
    }

    fn playback_state(&self, voice: VoiceHandle) -> PlaybackState {
        let Some(v) = self.voices.get(&voice) else {
            return PlaybackState::Invalid;
        };
        if v.invalid {
            return PlaybackState::Invalid;
        }
        if let Some(forced) = v.forced {
            return forced;
        }
        if !v.started || v.stop_count > 0 {
            return PlaybackState::Stopped;
        }
        if v.looping || v.remaining > 0 {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    fn attach_to_position(&mut self, voice: VoiceHandle, position: Position) -> Result<(), VoiceError> {
        let v = self.live_voice_mut(voice)?;
        v.position = Some(position);
        Ok(())
    }

    fn update(&mut self) {
        self.updates += 1;
        for v in self.voices.values_mut() {
            if v.started && !v.looping && v.stop_count == 0 {
                v.remaining = v.remaining.saturating_sub(1);
            }
        }
    }
}
