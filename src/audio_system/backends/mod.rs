/// Voice backend implementations
///
/// `SimulatedBackend` is always available and drives tests and headless runs.
/// `RodioBackend` plays on the output device and needs the `playback` feature.

#[cfg(feature = "playback")]
pub mod device;
pub mod simulated;

#[cfg(feature = "playback")]
pub use device::RodioBackend;
pub use simulated::{SimulatedBackend, DEFAULT_VOICE_LENGTH, RETIRED_HISTORY};
