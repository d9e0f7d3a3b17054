/// Messaging module for Event/Command architecture
///
/// - **Commands**: requests queued from any thread through `SoundRemote`,
///   applied by the engine on its own thread at the next tick
/// - **Events**: notifications of what the engine did, broadcast on the
///   `EventBus`
///
/// ## Architecture
///
/// ```text
/// ┌──────────┐  SoundCommand  ┌─────────────┐  SoundEvent  ┌───────────┐
/// │  Remote  │ ─────────────> │ SoundEngine │ ───────────> │ Event Bus │
/// │ (thread) │                │   (tick)    │              │           │
/// └──────────┘                └─────────────┘              └───────────┘
/// ```

pub mod bus;
pub mod commands;
pub mod events;
pub mod remote;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use commands::SoundCommand;
pub use events::SoundEvent;
pub use remote::{CommandQueue, SoundRemote};
