/// Sound engine
///
/// Caller-facing façade tying the pool, admission policy and completion
/// watchers together. The host application constructs one engine at startup,
/// passes it by reference to whoever plays sounds, and calls `tick` once per
/// frame. Nothing in here blocks, and nothing a caller does can make it panic:
/// a sound that cannot play is reported through `PlayOutcome` and dropped.
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::AudioConfig;
use crate::messaging::{CommandQueue, EventBus, SoundCommand, SoundEvent, SoundRemote};

use super::admission::{Admission, FrequentSoundTracker};
use super::builder::{PlayOutcome, PlaybackRequest, SoundBuilder};
use super::emitter::{Emitter, EmitterHandle, EmitterState};
use super::pool::EmitterPool;
use super::sound::{SoundDefinition, SoundId, PITCH_PARAMETER};
use super::voice::{Position, VoiceBackend, VoiceHandle};
use super::watcher::{WatchList, WatchVerdict};

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub played: u64,
    pub denied_admission: u64,
    pub denied_pool: u64,
    pub misconfigured: u64,
    pub voice_failures: u64,
    pub evictions: u64,
    pub completed: u64,
    pub stopped: u64,
    pub expired: u64,
}

/// Why an emitter is being taken off a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Requested,
    Returned,
    Evicted,
    Expired,
    Failed,
}

pub struct SoundEngine<B: VoiceBackend> {
    backend: B,
    pool: EmitterPool,
    frequent: FrequentSoundTracker,
    watchers: WatchList,
    commands: CommandQueue,
    events: Option<EventBus>,
    rng: StdRng,
    max_watch_ticks: Option<u64>,
    tick: u64,
    stats: EngineStats,
    shut_down: bool,
}

impl<B: VoiceBackend> SoundEngine<B> {
    pub fn new(config: &AudioConfig, backend: B) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::info!(
            "Sound engine ready: pool max {}, frequent cap {}, watch limit {:?}",
            config.pool.max_size,
            config.max_frequent_instances,
            config.max_watch_ticks
        );

        Self {
            backend,
            pool: EmitterPool::new(config.pool.clone()),
            frequent: FrequentSoundTracker::new(config.max_frequent_instances),
            watchers: WatchList::new(),
            commands: CommandQueue::new(),
            events: None,
            rng,
            max_watch_ticks: config.max_watch_ticks,
            tick: 0,
            stats: EngineStats::default(),
            shut_down: false,
        }
    }

    /// Broadcast engine events on a bus
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Start configuring a sound
    pub fn create_sound(&mut self) -> SoundBuilder<'_, B> {
        SoundBuilder::new(self)
    }

    /// Sender for queueing commands from other threads
    pub fn remote(&self) -> SoundRemote {
        self.commands.remote()
    }

    /// Admit, bind and start a sound
    pub fn play_request(&mut self, request: PlaybackRequest) -> PlayOutcome {
        self.submit(request, true)
    }

    /// Admit and bind a sound, starting it only if it is play-on-ready
    pub fn prepare_request(&mut self, request: PlaybackRequest) -> PlayOutcome {
        self.submit(request, false)
    }

    fn submit(&mut self, request: PlaybackRequest, start: bool) -> PlayOutcome {
        let sound = request.definition.as_ref().map(|d| d.sound.clone());
        let outcome = self.acquire_and_bind(request, start);
        self.record(sound, outcome)
    }

    /// Count an outcome and announce it on the bus
    fn record(&mut self, sound: Option<SoundId>, outcome: PlayOutcome) -> PlayOutcome {
        match outcome {
            PlayOutcome::Played(handle) => {
                self.stats.played += 1;
                if let Some(sound) = sound {
                    self.publish(SoundEvent::Played { handle, sound });
                }
                return outcome;
            }
            PlayOutcome::DeniedByAdmission => self.stats.denied_admission += 1,
            PlayOutcome::DeniedPoolExhausted => self.stats.denied_pool += 1,
            PlayOutcome::MisconfiguredNoSound => self.stats.misconfigured += 1,
            PlayOutcome::VoiceUnavailable => self.stats.voice_failures += 1,
            PlayOutcome::NotPrepared | PlayOutcome::EngineShutDown => {}
        }

        tracing::debug!("Sound {:?} not played: {}", sound, outcome);
        self.publish(SoundEvent::Denied { sound, outcome });
        outcome
    }

    fn acquire_and_bind(&mut self, request: PlaybackRequest, start: bool) -> PlayOutcome {
        if self.shut_down {
            return PlayOutcome::EngineShutDown;
        }
        let Some(definition) = request.definition.clone() else {
            return PlayOutcome::MisconfiguredNoSound;
        };
        if !self.can_play(&definition) {
            return PlayOutcome::DeniedByAdmission;
        }
        let Some(handle) = self.pool.acquire() else {
            return PlayOutcome::DeniedPoolExhausted;
        };

        if let Err(outcome) = self.bind_emitter(handle, definition, &request) {
            self.pool.release(handle);
            return outcome;
        }
        self.finish_binding(handle, request.position, start)
    }

    /// Bind a sound to an emitter reserved with `get`.
    ///
    /// The emitter must be idle. Admission applies as for `play`; the voice
    /// starts only if the sound is play-on-ready, otherwise call `start`.
    /// If the sound is refused or its voice cannot be created, the emitter
    /// stays reserved.
    pub fn bind(&mut self, handle: EmitterHandle, request: PlaybackRequest) -> PlayOutcome {
        let sound = request.definition.as_ref().map(|d| d.sound.clone());
        let outcome = self.bind_reserved(handle, request);
        self.record(sound, outcome)
    }

    fn bind_reserved(&mut self, handle: EmitterHandle, request: PlaybackRequest) -> PlayOutcome {
        if self.shut_down {
            return PlayOutcome::EngineShutDown;
        }
        if self.pool.get(handle).map(Emitter::state) != Some(EmitterState::Idle) {
            return PlayOutcome::NotPrepared;
        }
        let Some(definition) = request.definition.clone() else {
            return PlayOutcome::MisconfiguredNoSound;
        };
        if !self.can_play(&definition) {
            return PlayOutcome::DeniedByAdmission;
        }

        if let Err(outcome) = self.bind_emitter(handle, definition, &request) {
            return outcome;
        }
        self.finish_binding(handle, request.position, false)
    }

    /// Create the voice and apply placement and parameters
    fn bind_emitter(
        &mut self,
        handle: EmitterHandle,
        definition: Arc<SoundDefinition>,
        request: &PlaybackRequest,
    ) -> Result<(), PlayOutcome> {
        let Some(emitter) = self.pool.get_mut(handle) else {
            return Err(PlayOutcome::NotPrepared);
        };
        if let Err(e) = emitter.initialize(Arc::clone(&definition), &mut self.backend) {
            tracing::warn!("{}: cannot bind {}: {}", handle, definition.sound, e);
            return Err(PlayOutcome::VoiceUnavailable);
        }

        if let Some(position) = request.position {
            emitter.set_position(position);
        }
        if let Some(range) = request.random_pitch {
            let pitch = 1.0 + sample_offset(&mut self.rng, range);
            emitter.apply_parameter(PITCH_PARAMETER, pitch, &mut self.backend);
        }
        for parameter in &request.parameters {
            emitter.apply_parameter(&parameter.name, parameter.value, &mut self.backend);
        }

        if definition.frequent {
            self.frequent.track(handle);
        }
        Ok(())
    }

    fn finish_binding(
        &mut self,
        handle: EmitterHandle,
        position: Option<Position>,
        start: bool,
    ) -> PlayOutcome {
        let play_on_ready = self
            .pool
            .get(handle)
            .and_then(|e| e.definition())
            .map_or(false, |d| d.play_on_ready);

        if start || play_on_ready {
            if let Err(outcome) = self.start_emitter(handle, position) {
                return outcome;
            }
        }
        PlayOutcome::Played(handle)
    }

    /// Start a prepared emitter
    pub fn start(&mut self, handle: EmitterHandle) -> PlayOutcome {
        let placement = match self.pool.get(handle) {
            Some(emitter) => match emitter.state() {
                EmitterState::Bound => emitter.placement(),
                EmitterState::Playing => return PlayOutcome::Played(handle),
                EmitterState::Idle => return PlayOutcome::NotPrepared,
            },
            None => return PlayOutcome::NotPrepared,
        };

        match self.start_emitter(handle, placement) {
            Ok(()) => PlayOutcome::Played(handle),
            Err(outcome) => outcome,
        }
    }

    fn start_emitter(
        &mut self,
        handle: EmitterHandle,
        position: Option<Position>,
    ) -> Result<(), PlayOutcome> {
        let Some(emitter) = self.pool.get_mut(handle) else {
            return Err(PlayOutcome::VoiceUnavailable);
        };

        if let Err(e) = emitter.play(position, &mut self.backend) {
            tracing::warn!("{}: failed to start: {}", handle, e);
            self.halt(handle, StopReason::Failed);
            return Err(PlayOutcome::VoiceUnavailable);
        }

        let looping = emitter.definition().map_or(false, |d| d.looping);
        if !looping {
            let token = self.watchers.start(handle, self.tick);
            emitter.set_watch(token);
        }
        Ok(())
    }

    /// Frequent-sound admission check.
    ///
    /// May synchronously stop the oldest frequent sound to make room.
    pub fn can_play(&mut self, definition: &SoundDefinition) -> bool {
        match self.frequent.admit(definition.frequent) {
            Admission::Admit => true,
            Admission::Deny => false,
            Admission::Evict(oldest) => {
                let sound = self
                    .pool
                    .get(oldest)
                    .and_then(|e| e.definition())
                    .map(|d| d.sound.clone());
                if !self.halt(oldest, StopReason::Evicted) {
                    tracing::debug!("{} was already released, refusing {}", oldest, definition.sound);
                    return false;
                }
                self.stats.evictions += 1;
                if let Some(sound) = sound {
                    self.publish(SoundEvent::Evicted {
                        handle: oldest,
                        sound,
                    });
                }
                true
            }
        }
    }

    /// Reserve an idle emitter straight from the pool.
    ///
    /// Bind a sound to it with `bind`, or hand it back with `return_to_pool`.
    pub fn get(&mut self) -> Option<EmitterHandle> {
        if self.shut_down {
            return None;
        }
        self.pool.acquire()
    }

    /// Hand an emitter back to the pool, halting its voice if it has one
    pub fn return_to_pool(&mut self, handle: EmitterHandle) -> bool {
        self.halt(handle, StopReason::Returned)
    }

    /// Stop an emitter and return it to the pool.
    ///
    /// Safe to call repeatedly and with stale handles.
    pub fn stop(&mut self, handle: EmitterHandle) -> bool {
        let stopped = self.halt(handle, StopReason::Requested);
        if stopped {
            self.stats.stopped += 1;
            self.publish(SoundEvent::Stopped { handle });
        }
        stopped
    }

    /// Stop every active emitter, e.g. on a level change
    pub fn stop_all(&mut self) -> usize {
        let handles = self.pool.active_handles();
        let mut count = 0;
        for handle in handles {
            if self.stop(handle) {
                count += 1;
            }
        }
        self.frequent.clear();
        if count > 0 {
            tracing::info!("Stopped all sounds ({} emitters)", count);
        }
        count
    }

    /// Update a parameter on a bound or playing emitter
    pub fn set_parameter(&mut self, handle: EmitterHandle, name: &str, value: f32) -> bool {
        match self.pool.get_mut(handle) {
            Some(emitter) if emitter.voice().is_some() => {
                emitter.apply_parameter(name, value, &mut self.backend);
                true
            }
            _ => false,
        }
    }

    fn halt(&mut self, handle: EmitterHandle, reason: StopReason) -> bool {
        let Some(emitter) = self.pool.get_mut(handle) else {
            return false;
        };
        if let Some(token) = emitter.take_watch() {
            self.watchers.cancel(token);
        }
        emitter.stop(&mut self.backend);
        tracing::debug!("{} stopped ({:?})", handle, reason);

        self.frequent.forget(handle);
        self.pool.release(handle)
    }

    /// Advance one scheduling tick: apply queued commands, update the
    /// backend, then poll completion watchers.
    pub fn tick(&mut self) {
        if self.shut_down {
            return;
        }
        self.tick += 1;

        for command in self.commands.drain() {
            self.apply(command);
            if self.shut_down {
                return;
            }
        }

        self.backend.update();
        self.poll_watchers();
    }

    fn apply(&mut self, command: SoundCommand) {
        tracing::debug!("Applying command: {}", command.description());
        match command {
            SoundCommand::Play(request) => {
                self.play_request(request);
            }
            SoundCommand::Stop(handle) => {
                self.stop(handle);
            }
            SoundCommand::StopAll => {
                self.stop_all();
            }
            SoundCommand::SetParameter {
                handle,
                name,
                value,
            } => {
                self.set_parameter(handle, &name, value);
            }
            SoundCommand::Shutdown => self.shutdown(),
        }
    }

    fn poll_watchers(&mut self) {
        let tick = self.tick;
        let max_watch_ticks = self.max_watch_ticks;
        let pool = &self.pool;
        let backend = &self.backend;

        let done = self.watchers.poll(|watcher| {
            let Some(emitter) = pool.get(watcher.target) else {
                return WatchVerdict::Stale;
            };
            if !emitter.is_watched_by(watcher.token) {
                return WatchVerdict::Stale;
            }
            let Some(voice) = emitter.voice() else {
                return WatchVerdict::Finished;
            };

            if backend.playback_state(voice).is_alive() {
                match max_watch_ticks {
                    Some(limit) if watcher.age(tick) >= limit => WatchVerdict::Expired,
                    _ => WatchVerdict::Continue,
                }
            } else {
                WatchVerdict::Finished
            }
        });

        for (watcher, verdict) in done {
            let handle = watcher.target;
            match verdict {
                WatchVerdict::Finished => self.complete(handle),
                WatchVerdict::Expired => {
                    let sound = self.sound_of(handle);
                    tracing::warn!(
                        "{} still playing after {} ticks, stopping",
                        handle,
                        watcher.age(tick)
                    );
                    if self.halt(handle, StopReason::Expired) {
                        self.stats.expired += 1;
                        if let Some(sound) = sound {
                            self.publish(SoundEvent::Expired { handle, sound });
                        }
                    }
                }
                WatchVerdict::Stale => tracing::debug!("Dropped stale watcher for {}", handle),
                WatchVerdict::Continue => {}
            }
        }
    }

    /// Natural end of a non-looping voice
    fn complete(&mut self, handle: EmitterHandle) {
        let sound = self.sound_of(handle);
        let Some(emitter) = self.pool.get_mut(handle) else {
            return;
        };
        emitter.finish(&mut self.backend);
        self.frequent.forget(handle);
        if self.pool.release(handle) {
            self.stats.completed += 1;
            if let Some(sound) = sound {
                self.publish(SoundEvent::Completed { handle, sound });
            }
        }
    }

    /// Cancel watchers, halt every voice and destroy the pool
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }

        let cancelled = self.watchers.clear();
        let handles = self.pool.active_handles();
        for &handle in &handles {
            if let Some(emitter) = self.pool.get_mut(handle) {
                emitter.take_watch();
                emitter.stop(&mut self.backend);
            }
        }
        self.frequent.clear();
        self.pool.close();
        self.shut_down = true;

        tracing::info!(
            "Sound engine shut down ({} active emitters, {} watchers cancelled)",
            handles.len(),
            cancelled
        );
        self.publish(SoundEvent::Shutdown);
    }

    fn sound_of(&self, handle: EmitterHandle) -> Option<SoundId> {
        self.pool
            .get(handle)
            .and_then(|e| e.definition())
            .map(|d| d.sound.clone())
    }

    fn publish(&self, event: SoundEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    /// Inspect an active emitter
    pub fn emitter(&self, handle: EmitterHandle) -> Option<&Emitter> {
        self.pool.get(handle)
    }

    /// Voice currently bound to an emitter
    pub fn voice_of(&self, handle: EmitterHandle) -> Option<VoiceHandle> {
        self.pool.get(handle).and_then(Emitter::voice)
    }

    pub fn is_active(&self, handle: EmitterHandle) -> bool {
        self.pool.is_active(handle)
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn constructed(&self) -> usize {
        self.pool.constructed()
    }

    pub fn frequent_count(&self) -> usize {
        self.frequent.len()
    }

    /// Frequent emitters in eviction order
    pub fn frequent_handles(&self) -> Vec<EmitterHandle> {
        self.frequent.iter().copied().collect()
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    pub fn pool(&self) -> &EmitterPool {
        &self.pool
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: VoiceBackend> Drop for SoundEngine<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Uniform offset in `[-range, range]`
fn sample_offset(rng: &mut StdRng, range: f32) -> f32 {
    let range = if range.is_finite() { range.abs() } else { 0.0 };
    if range == 0.0 {
        return 0.0;
    }
    rng.gen_range(-range..=range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backends::SimulatedBackend;
    use crate::audio_system::voice::PlaybackState;
    use crate::audio_system::PoolConfig;

    fn config(max_size: usize, max_frequent: usize) -> AudioConfig {
        AudioConfig {
            pool: PoolConfig {
                max_size,
                default_capacity: max_size,
                ..PoolConfig::default()
            },
            max_frequent_instances: max_frequent,
            rng_seed: Some(42),
            ..AudioConfig::default()
        }
    }

    fn engine(max_size: usize, max_frequent: usize) -> SoundEngine<SimulatedBackend> {
        SoundEngine::new(
            &config(max_size, max_frequent),
            SimulatedBackend::new().with_default_length(3),
        )
    }

    fn footstep() -> Arc<SoundDefinition> {
        SoundDefinition::new("footstep").frequent(true).shared()
    }

    fn coin() -> Arc<SoundDefinition> {
        SoundDefinition::new("coin").shared()
    }

    #[test]
    fn test_play_without_sound_is_misconfigured() {
        let mut engine = engine(4, 4);
        let outcome = engine.create_sound().with_position([1.0, 0.0, 0.0]).play();
        assert_eq!(outcome, PlayOutcome::MisconfiguredNoSound);
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.stats().misconfigured, 1);
    }

    #[test]
    fn test_builder_single_shot() {
        let mut engine = engine(4, 4);
        let outcome = engine
            .create_sound()
            .with_sound(coin())
            .with_position([1.0, 2.0, 3.0])
            .with_random_pitch(true, 0.05)
            .play();

        let handle = outcome.handle().unwrap();
        let emitter = engine.emitter(handle).unwrap();
        assert_eq!(emitter.state(), EmitterState::Playing);
        assert_eq!(emitter.position(), [1.0, 2.0, 3.0]);

        let pitch = emitter.parameter(PITCH_PARAMETER).unwrap();
        assert!((0.95..=1.05).contains(&pitch), "pitch {}", pitch);

        let voice = emitter.voice().unwrap();
        assert_eq!(engine.backend().position(voice), Some([1.0, 2.0, 3.0]));
        assert_eq!(engine.backend().parameter(voice, PITCH_PARAMETER), Some(pitch));
        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn test_random_pitch_disabled() {
        let mut engine = engine(4, 4);
        let handle = engine
            .create_sound()
            .with_sound(coin())
            .with_random_pitch(false, 0.5)
            .with_parameter("Surface", 2.0)
            .play()
            .handle()
            .unwrap();

        let emitter = engine.emitter(handle).unwrap();
        assert_eq!(emitter.parameter(PITCH_PARAMETER), None);
        assert_eq!(emitter.parameter("Surface"), Some(2.0));
    }

    #[test]
    fn test_non_looping_sound_returns_to_pool() {
        let mut engine = engine(4, 4);
        let handle = engine.create_sound().with_sound(coin()).play().handle().unwrap();
        let voice = engine.voice_of(handle).unwrap();
        assert_eq!(engine.watcher_count(), 1);

        for _ in 0..3 {
            engine.tick();
        }
        assert!(!engine.is_active(handle));
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.watcher_count(), 0);
        assert_eq!(engine.backend().release_count(voice), 1);
        assert_eq!(engine.stats().completed, 1);
    }

    #[test]
    fn test_sustaining_voice_keeps_emitter() {
        let mut engine = engine(4, 4);
        let handle = engine.create_sound().with_sound(coin()).play().handle().unwrap();
        let voice = engine.voice_of(handle).unwrap();
        engine.backend_mut().force_state(voice, PlaybackState::Sustaining);

        for _ in 0..10 {
            engine.tick();
        }
        assert!(engine.is_active(handle));
    }

    #[test]
    fn test_invalid_voice_treated_as_completed() {
        let mut engine = engine(4, 4);
        let handle = engine.create_sound().with_sound(coin()).play().handle().unwrap();
        let voice = engine.voice_of(handle).unwrap();
        engine.backend_mut().invalidate(voice);

        engine.tick();
        assert!(!engine.is_active(handle));
        assert_eq!(engine.stats().completed, 1);
    }

    #[test]
    fn test_looping_sound_plays_until_stopped() {
        let mut engine = engine(4, 4);
        let music = SoundDefinition::new("music").looping(true).shared();
        let handle = engine.create_sound().with_sound(music).play().handle().unwrap();
        assert_eq!(engine.watcher_count(), 0);

        for _ in 0..50 {
            engine.tick();
        }
        assert!(engine.is_active(handle));

        assert!(engine.stop(handle));
        assert!(!engine.stop(handle));
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.stats().stopped, 1);
    }

    #[test]
    fn test_frequent_cap_evicts_oldest() {
        let mut engine = engine(10, 3);
        let handles: Vec<_> = (0..4)
            .map(|_| engine.create_sound().with_sound(footstep()).play().handle().unwrap())
            .collect();

        assert_eq!(engine.stats().evictions, 1);
        assert_eq!(engine.frequent_count(), 3);
        assert!(!engine.is_active(handles[0]));
        assert_eq!(engine.frequent_handles(), handles[1..].to_vec());
    }

    #[test]
    fn test_zero_frequent_cap_denies() {
        let mut engine = engine(10, 0);
        let outcome = engine.create_sound().with_sound(footstep()).play();
        assert_eq!(outcome, PlayOutcome::DeniedByAdmission);
        assert_eq!(engine.stats().denied_admission, 1);

        // Non-frequent sounds are unaffected
        assert!(engine.create_sound().with_sound(coin()).play().is_played());
    }

    #[test]
    fn test_completed_frequent_sound_leaves_tracker() {
        let mut engine = engine(10, 2);
        engine.create_sound().with_sound(footstep()).play();
        assert_eq!(engine.frequent_count(), 1);

        for _ in 0..3 {
            engine.tick();
        }
        assert_eq!(engine.frequent_count(), 0);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut engine = engine(2, 10);
        assert!(engine.create_sound().with_sound(coin()).play().is_played());
        assert!(engine.create_sound().with_sound(coin()).play().is_played());
        assert_eq!(
            engine.create_sound().with_sound(coin()).play(),
            PlayOutcome::DeniedPoolExhausted
        );
        assert_eq!(engine.stats().denied_pool, 1);
        assert_eq!(engine.constructed(), 2);
    }

    #[test]
    fn test_voice_failure_returns_emitter() {
        let mut engine = engine(2, 10);
        engine.backend_mut().fail_sound("coin");
        assert_eq!(
            engine.create_sound().with_sound(coin()).play(),
            PlayOutcome::VoiceUnavailable
        );
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.pool().idle_count(), 1);
    }

    #[test]
    fn test_stale_watcher_does_not_touch_new_session() {
        let mut engine = engine(1, 4);
        let first = engine.create_sound().with_sound(coin()).play().handle().unwrap();
        let first_voice = engine.voice_of(first).unwrap();
        assert!(engine.stop(first));

        let second = engine.create_sound().with_sound(coin()).play().handle().unwrap();
        assert_eq!(second.index(), first.index());
        let second_voice = engine.voice_of(second).unwrap();

        engine.tick();
        assert!(engine.is_active(second));
        assert_eq!(engine.backend().release_count(first_voice), 1);
        assert_eq!(engine.backend().release_count(second_voice), 0);
        assert_eq!(engine.watcher_count(), 1);
    }

    #[test]
    fn test_prepare_and_start() {
        let mut engine = engine(4, 4);
        let handle = engine.create_sound().with_sound(coin()).prepare().handle().unwrap();
        assert_eq!(engine.emitter(handle).unwrap().state(), EmitterState::Bound);
        assert_eq!(engine.watcher_count(), 0);

        assert!(engine.start(handle).is_played());
        assert_eq!(engine.emitter(handle).unwrap().state(), EmitterState::Playing);
        assert_eq!(engine.watcher_count(), 1);
    }

    #[test]
    fn test_prepare_play_on_ready_starts() {
        let mut engine = engine(4, 4);
        let ready = SoundDefinition::new("music")
            .looping(true)
            .play_on_ready(true)
            .shared();
        let handle = engine.create_sound().with_sound(ready).prepare().handle().unwrap();
        assert!(engine.emitter(handle).unwrap().is_playing());
    }

    #[test]
    fn test_watch_expiry() {
        let mut cfg = config(4, 4);
        cfg.max_watch_ticks = Some(5);
        let mut engine = SoundEngine::new(&cfg, SimulatedBackend::new().with_default_length(1000));
        let handle = engine.create_sound().with_sound(coin()).play().handle().unwrap();

        for _ in 0..4 {
            engine.tick();
        }
        assert!(engine.is_active(handle));
        engine.tick();
        assert!(!engine.is_active(handle));
        assert_eq!(engine.stats().expired, 1);
    }

    #[test]
    fn test_stop_all() {
        let mut engine = engine(8, 8);
        engine.create_sound().with_sound(coin()).play();
        engine.create_sound().with_sound(footstep()).play();
        engine
            .create_sound()
            .with_sound(SoundDefinition::new("music").looping(true).shared())
            .play();

        assert_eq!(engine.stop_all(), 3);
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.frequent_count(), 0);
        assert_eq!(engine.watcher_count(), 0);
        assert_eq!(engine.backend().live_voices(), 0);
    }

    #[test]
    fn test_shutdown() {
        let mut engine = engine(8, 8);
        let handle = engine.create_sound().with_sound(coin()).play().handle().unwrap();
        let voice = engine.voice_of(handle).unwrap();

        engine.shutdown();
        assert!(engine.is_shut_down());
        assert_eq!(engine.watcher_count(), 0);
        assert_eq!(engine.constructed(), 0);
        assert_eq!(engine.backend().release_count(voice), 1);
        assert_eq!(
            engine.create_sound().with_sound(coin()).play(),
            PlayOutcome::EngineShutDown
        );

        // Idempotent, and ticking after shutdown is inert
        engine.shutdown();
        engine.tick();
        assert_eq!(engine.tick_count(), 0);
    }

    #[test]
    fn test_get_and_return_to_pool() {
        let mut engine = engine(1, 4);
        let handle = engine.get().unwrap();
        assert!(engine.get().is_none());
        assert!(engine.return_to_pool(handle));
        assert!(!engine.return_to_pool(handle));
        assert!(engine.get().is_some());
    }

    #[test]
    fn test_remote_commands_apply_on_tick() {
        let mut engine = engine(4, 4);
        let remote = engine.remote();
        remote.play(PlaybackRequest::new(coin()));
        assert_eq!(engine.active_count(), 0);

        engine.tick();
        assert_eq!(engine.active_count(), 1);

        remote.stop_all();
        engine.tick();
        assert_eq!(engine.active_count(), 0);

        remote.shutdown();
        engine.tick();
        assert!(engine.is_shut_down());
    }

    #[test]
    fn test_events_published() {
        let bus = EventBus::new();
        let (rx, _id) = bus.subscribe();
        let mut engine = engine(4, 1).with_event_bus(bus);

        engine.create_sound().with_sound(footstep()).play();
        engine.create_sound().with_sound(footstep()).play();
        engine.create_sound().play();

        let events: Vec<SoundEvent> = rx.try_iter().collect();
        assert!(matches!(events[0], SoundEvent::Played { .. }));
        assert!(matches!(events[1], SoundEvent::Evicted { .. }));
        assert!(matches!(events[2], SoundEvent::Played { .. }));
        assert!(matches!(
            events[3],
            SoundEvent::Denied {
                outcome: PlayOutcome::MisconfiguredNoSound,
                ..
            }
        ));
    }

    #[test]
    fn test_sample_offset_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let offset = sample_offset(&mut rng, 0.05);
            assert!((-0.05..=0.05).contains(&offset));
        }
        assert_eq!(sample_offset(&mut rng, 0.0), 0.0);
        assert_eq!(sample_offset(&mut rng, f32::NAN), 0.0);
        assert!(sample_offset(&mut rng, -0.1).abs() <= 0.1);
    }

    #[test]
    fn test_return_to_pool_halts_voice() {
        let mut engine = engine(4, 4);
        let music = SoundDefinition::new("music").looping(true).shared();
        let handle = engine.create_sound().with_sound(music).play().handle().unwrap();
        let voice = engine.voice_of(handle).unwrap();

        assert!(engine.return_to_pool(handle));
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.backend().live_voices(), 0);
        assert_eq!(engine.backend().stop_count(voice), 1);
        assert_eq!(engine.backend().release_count(voice), 1);

        engine.shutdown();
        assert_eq!(engine.backend().live_voices(), 0);
    }

    #[test]
    fn test_return_prepared_emitter_releases_voice() {
        let mut engine = engine(4, 4);
        let handle = engine.create_sound().with_sound(coin()).prepare().handle().unwrap();
        let voice = engine.voice_of(handle).unwrap();

        assert!(engine.return_to_pool(handle));
        assert_eq!(engine.backend().release_count(voice), 1);
        assert_eq!(engine.pool().idle_count(), 1);
    }

    #[test]
    fn test_start_keeps_unplaced_sound_unattached() {
        let mut engine = engine(4, 4);
        let handle = engine.create_sound().with_sound(coin()).prepare().handle().unwrap();
        assert!(engine.start(handle).is_played());

        let voice = engine.voice_of(handle).unwrap();
        assert_eq!(engine.backend().position(voice), None);
    }

    #[test]
    fn test_start_keeps_requested_position() {
        let mut engine = engine(4, 4);
        let handle = engine
            .create_sound()
            .with_sound(coin())
            .with_position([2.0, 0.0, -1.0])
            .prepare()
            .handle()
            .unwrap();
        assert!(engine.start(handle).is_played());

        let voice = engine.voice_of(handle).unwrap();
        assert_eq!(engine.backend().position(voice), Some([2.0, 0.0, -1.0]));
    }

    #[test]
    fn test_start_rejects_unprepared_handles() {
        let mut engine = engine(4, 4);
        let reserved = engine.get().unwrap();
        assert_eq!(engine.start(reserved), PlayOutcome::NotPrepared);

        let handle = engine.create_sound().with_sound(coin()).prepare().handle().unwrap();
        engine.stop(handle);
        assert_eq!(engine.start(handle), PlayOutcome::NotPrepared);
    }

    #[test]
    fn test_bind_reserved_emitter() {
        let mut engine = engine(2, 4);
        let handle = engine.get().unwrap();

        let outcome = engine.bind(handle, PlaybackRequest::new(coin()));
        assert_eq!(outcome, PlayOutcome::Played(handle));
        assert_eq!(engine.emitter(handle).unwrap().state(), EmitterState::Bound);

        // Already bound
        assert_eq!(
            engine.bind(handle, PlaybackRequest::new(coin())),
            PlayOutcome::NotPrepared
        );

        assert!(engine.start(handle).is_played());
        for _ in 0..3 {
            engine.tick();
        }
        assert!(!engine.is_active(handle));
        assert_eq!(engine.stats().completed, 1);
    }

    #[test]
    fn test_failed_bind_keeps_reservation() {
        let mut engine = engine(2, 4);
        engine.backend_mut().fail_sound("coin");
        let handle = engine.get().unwrap();

        assert_eq!(
            engine.bind(handle, PlaybackRequest::new(coin())),
            PlayOutcome::VoiceUnavailable
        );
        assert!(engine.is_active(handle));
        assert_eq!(engine.emitter(handle).unwrap().state(), EmitterState::Idle);
        assert_eq!(
            engine.bind(handle, PlaybackRequest::default()),
            PlayOutcome::MisconfiguredNoSound
        );
    }

    #[test]
    fn test_non_frequent_sounds_bypass_cap() {
        let mut engine = engine(50, 1);
        for _ in 0..20 {
            assert!(engine.create_sound().with_sound(coin()).play().is_played());
        }

        assert_eq!(engine.stats().evictions, 0);
        assert_eq!(engine.frequent_count(), 0);
        assert_eq!(engine.active_count(), 20);
    }

    #[test]
    fn test_evictions_follow_admission_order() {
        let bus = EventBus::new();
        let (rx, _id) = bus.subscribe();
        let mut engine = engine(10, 2).with_event_bus(bus);

        let handles: Vec<_> = (0..6)
            .map(|_| engine.create_sound().with_sound(footstep()).play().handle().unwrap())
            .collect();

        let evicted: Vec<EmitterHandle> = rx
            .try_iter()
            .filter_map(|event| match event {
                SoundEvent::Evicted { handle, .. } => Some(handle),
                _ => None,
            })
            .collect();
        assert_eq!(evicted, handles[..4].to_vec());
        assert_eq!(engine.frequent_handles(), handles[4..].to_vec());
    }
}
