/// Audio system module
///
/// Pooled sound playback for applications that trigger many short sounds:
/// - Reusable emitters handed out from a bounded pool
/// - A concurrency cap for sounds flagged as frequent, evicting the oldest
/// - A fluent builder for one-shot playback requests
/// - Per-tick completion watchers that return finished emitters to the pool
///
/// ## Architecture
///
/// ```text
/// SoundEngine
///   ├── EmitterPool            (idle stack + active list, bounded)
///   │     └── Emitter ──> VoiceBackend (rodio or simulated)
///   ├── FrequentSoundTracker   (FIFO of frequent emitters)
///   ├── WatchList              (polled every tick)
///   └── CommandQueue           (commands from other threads)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// use soundpool::audio_system::{SimulatedBackend, SoundDefinition, SoundEngine};
/// use soundpool::config::AudioConfig;
///
/// let mut engine = SoundEngine::new(&AudioConfig::default(), SimulatedBackend::new());
/// let footstep = SoundDefinition::new("footstep").frequent(true).shared();
///
/// engine
///     .create_sound()
///     .with_sound(footstep)
///     .with_position([1.0, 0.0, 2.0])
///     .with_random_pitch(true, 0.05)
///     .play();
///
/// // Once per frame
/// engine.tick();
/// ```
pub mod admission;
pub mod backends;
pub mod builder;
pub mod emitter;
pub mod manager;
pub mod pool;
pub mod sound;
pub mod voice;
pub mod watcher;

// Re-export commonly used types
pub use admission::{Admission, FrequentSoundTracker};
#[cfg(feature = "playback")]
pub use backends::RodioBackend;
pub use backends::{SimulatedBackend, RETIRED_HISTORY};
pub use builder::{PlayOutcome, PlaybackRequest, SoundBuilder};
pub use emitter::{Emitter, EmitterHandle, EmitterState};
pub use manager::{EngineStats, SoundEngine};
pub use pool::{EmitterPool, PoolConfig, PoolSnapshot};
pub use sound::{SoundDefinition, SoundId, SoundLibrary, SoundParameter, PITCH_PARAMETER};
pub use voice::{PlaybackState, Position, StopMode, VoiceBackend, VoiceHandle, ORIGIN};
pub use watcher::{WatchList, WatchToken, WatchVerdict, Watcher};
