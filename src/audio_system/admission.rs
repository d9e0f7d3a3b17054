/// Frequent-sound admission control
///
/// Sounds flagged as frequent (footsteps, impacts) share a concurrent
/// instance cap. When the cap is reached the oldest tracked emitter is
/// evicted to make room for the new request.
use std::collections::VecDeque;

use super::emitter::EmitterHandle;

/// Decision for one play request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Play without side effects
    Admit,

    /// Stop this emitter first, then play
    Evict(EmitterHandle),

    /// Drop the request
    Deny,
}

/// FIFO of emitters currently playing frequent sounds.
///
/// Holds handles only; the pool owns the emitters.
#[derive(Debug)]
pub struct FrequentSoundTracker {
    queue: VecDeque<EmitterHandle>,
    max_instances: usize,
}

impl FrequentSoundTracker {
    pub fn new(max_instances: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_instances),
            max_instances,
        }
    }

    /// Decide whether a sound may start
    pub fn admit(&mut self, frequent: bool) -> Admission {
        if !frequent || self.queue.len() < self.max_instances {
            return Admission::Admit;
        }

        match self.queue.pop_front() {
            Some(oldest) => Admission::Evict(oldest),
            None => Admission::Deny,
        }
    }

    /// Start tracking a freshly admitted emitter
    pub fn track(&mut self, handle: EmitterHandle) {
        self.queue.push_back(handle);
    }

    /// Stop tracking an emitter that went back to the pool
    pub fn forget(&mut self, handle: EmitterHandle) -> bool {
        match self.queue.iter().position(|&h| h == handle) {
            Some(position) => {
                self.queue.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: EmitterHandle) -> bool {
        self.queue.contains(&handle)
    }

    /// Tracked handles, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &EmitterHandle> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(index: usize) -> EmitterHandle {
        EmitterHandle { index, session: 1 }
    }

    #[test]
    fn test_non_frequent_always_admitted() {
        let mut tracker = FrequentSoundTracker::new(0);
        for _ in 0..100 {
            assert_eq!(tracker.admit(false), Admission::Admit);
        }
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_below_cap_admits() {
        let mut tracker = FrequentSoundTracker::new(2);
        assert_eq!(tracker.admit(true), Admission::Admit);
        tracker.track(handle(0));
        assert_eq!(tracker.admit(true), Admission::Admit);
        tracker.track(handle(1));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_at_cap_evicts_oldest() {
        let mut tracker = FrequentSoundTracker::new(2);
        tracker.track(handle(0));
        tracker.track(handle(1));

        assert_eq!(tracker.admit(true), Admission::Evict(handle(0)));
        assert_eq!(tracker.len(), 1);
        tracker.track(handle(2));
        assert_eq!(tracker.admit(true), Admission::Evict(handle(1)));
    }

    #[test]
    fn test_zero_cap_denies() {
        let mut tracker = FrequentSoundTracker::new(0);
        assert_eq!(tracker.admit(true), Admission::Deny);
    }

    #[test]
    fn test_forget() {
        let mut tracker = FrequentSoundTracker::new(4);
        tracker.track(handle(0));
        tracker.track(handle(1));
        tracker.track(handle(2));

        assert!(tracker.forget(handle(1)));
        assert!(!tracker.forget(handle(1)));
        let order: Vec<usize> = tracker.iter().map(|h| h.index()).collect();
        assert_eq!(order, vec![0, 2]);
    }
}
