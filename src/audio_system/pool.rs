/// Emitter pool
///
/// Owns every emitter. Emitters are constructed lazily on demand, reused
/// before new ones are built, and only destroyed when the pool is closed.
use serde::{Deserialize, Serialize};

use super::emitter::{Emitter, EmitterHandle};

/// Pool sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Warn when an emitter is released twice
    #[serde(default = "default_collection_check")]
    pub collection_check: bool,

    /// Slots reserved up front
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,

    /// Hard cap on constructed emitters
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Emitters built eagerly at startup
    #[serde(default)]
    pub prewarm: usize,
}

fn default_collection_check() -> bool {
    true
}

fn default_capacity() -> usize {
    10
}

fn default_max_size() -> usize {
    100
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            collection_check: default_collection_check(),
            default_capacity: default_capacity(),
            max_size: default_max_size(),
            prewarm: 0,
        }
    }
}

/// Comparable view of the pool bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub constructed: usize,
    pub active: Vec<EmitterHandle>,
    pub idle: Vec<usize>,
}

pub struct EmitterPool {
    config: PoolConfig,
    emitters: Vec<Emitter>,
    idle: Vec<usize>,
    active: Vec<usize>,
    closed: bool,
}

impl EmitterPool {
    pub fn new(config: PoolConfig) -> Self {
        let reserve = config.default_capacity.min(config.max_size);
        let mut pool = Self {
            emitters: Vec::with_capacity(reserve),
            idle: Vec::with_capacity(reserve),
            active: Vec::with_capacity(reserve),
            closed: false,
            config,
        };

        let prewarm = pool.config.prewarm;
        if prewarm > 0 {
            pool.prewarm(prewarm);
        }
        pool
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Construct idle emitters until `count` exist (bounded by max size)
    pub fn prewarm(&mut self, count: usize) -> usize {
        if self.closed {
            return 0;
        }

        let target = count.min(self.config.max_size);
        let mut built = 0;
        while self.emitters.len() < target {
            let index = self.emitters.len();
            self.emitters.push(Emitter::new(index));
            self.idle.push(index);
            built += 1;
        }
        if built > 0 {
            tracing::debug!("Prewarmed {} emitters ({} total)", built, self.emitters.len());
        }
        built
    }

    /// Take an idle emitter, constructing one if below capacity
    pub fn acquire(&mut self) -> Option<EmitterHandle> {
        if self.closed {
            return None;
        }

        let index = match self.idle.pop() {
            Some(index) => index,
            None if self.emitters.len() < self.config.max_size => {
                let index = self.emitters.len();
                self.emitters.push(Emitter::new(index));
                tracing::debug!("Constructed emitter {} of {}", index + 1, self.config.max_size);
                index
            }
            None => {
                tracing::debug!("Emitter pool exhausted ({} active)", self.active.len());
                return None;
            }
        };

        self.active.push(index);
        Some(self.emitters[index].begin_session())
    }

    /// Return an emitter to the idle set.
    ///
    /// Releasing a stale handle, an emitter that is already idle, or one
    /// that still owns a voice changes nothing and returns false.
    pub fn release(&mut self, handle: EmitterHandle) -> bool {
        let Some(position) = self.active.iter().position(|&i| i == handle.index) else {
            if self.config.collection_check && self.is_current(handle) {
                tracing::warn!("{} released while already in the pool", handle);
            }
            return false;
        };

        if self.emitters[handle.index].session() != handle.session {
            tracing::debug!("Ignoring release of stale {}", handle);
            return false;
        }
        if let Some(voice) = self.emitters[handle.index].voice() {
            tracing::warn!("{} still holds {}, refusing release", handle, voice);
            return false;
        }

        self.active.remove(position);
        self.emitters[handle.index].reset();
        self.idle.push(handle.index);
        true
    }

    /// Whether the handle refers to the slot's current session
    fn is_current(&self, handle: EmitterHandle) -> bool {
        self.emitters
            .get(handle.index)
            .map_or(false, |e| e.session() == handle.session)
    }

    /// Whether the handle refers to a checked-out emitter
    pub fn is_active(&self, handle: EmitterHandle) -> bool {
        self.is_current(handle) && self.active.contains(&handle.index)
    }

    pub fn get(&self, handle: EmitterHandle) -> Option<&Emitter> {
        if self.is_active(handle) {
            self.emitters.get(handle.index)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: EmitterHandle) -> Option<&mut Emitter> {
        if self.is_active(handle) {
            self.emitters.get_mut(handle.index)
        } else {
            None
        }
    }

    /// Handles of all checked-out emitters, oldest first
    pub fn active_handles(&self) -> Vec<EmitterHandle> {
        self.active
            .iter()
            .map(|&index| self.emitters[index].handle())
            .collect()
    }

    pub fn constructed(&self) -> usize {
        self.emitters.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            constructed: self.emitters.len(),
            active: self.active_handles(),
            idle: self.idle.clone(),
        }
    }

    /// Destroy every emitter and refuse further acquires.
    ///
    /// Voices must already be halted by the caller.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        tracing::debug!("Destroying {} emitters", self.emitters.len());
        self.active.clear();
        self.idle.clear();
        self.emitters.clear();
        self.closed = true;
    }
}
