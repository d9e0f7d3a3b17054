/// Completion watchers
///
/// The voice API only answers synchronous state queries, so non-looping
/// emitters are polled once per tick until their voice stops. Each watcher
/// carries a token scoped to one play session; a watcher whose token no
/// longer matches its emitter is dropped without touching it.
use super::emitter::EmitterHandle;

/// Identity of one watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watcher {
    pub target: EmitterHandle,
    pub token: WatchToken,
    pub started_tick: u64,
}

impl Watcher {
    /// Ticks elapsed since the watch started
    pub fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.started_tick)
    }
}

/// Result of polling one watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchVerdict {
    /// Voice still alive, check again next tick
    Continue,

    /// Voice stopped or became invalid
    Finished,

    /// Watcher outlived its session
    Stale,

    /// Voice exceeded the maximum watch duration
    Expired,
}

#[derive(Debug, Default)]
pub struct WatchList {
    watchers: Vec<Watcher>,
    next_token: u64,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin watching an emitter
    pub fn start(&mut self, target: EmitterHandle, tick: u64) -> WatchToken {
        self.next_token += 1;
        let token = WatchToken(self.next_token);
        self.watchers.push(Watcher {
            target,
            token,
            started_tick: tick,
        });
        token
    }

    /// Drop a watcher before it fires
    pub fn cancel(&mut self, token: WatchToken) -> bool {
        let before = self.watchers.len();
        self.watchers.retain(|w| w.token != token);
        self.watchers.len() != before
    }

    /// Poll every watcher once; returns the ones that are done, in start order
    pub fn poll<F>(&mut self, mut verdict: F) -> Vec<(Watcher, WatchVerdict)>
    where
        F: FnMut(&Watcher) -> WatchVerdict,
    {
        let mut done = Vec::new();
        self.watchers.retain(|watcher| match verdict(watcher) {
            WatchVerdict::Continue => true,
            other => {
                done.push((*watcher, other));
                false
            }
        });
        done
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Watcher> {
        self.watchers.iter()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.watchers.len();
        self.watchers.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(index: usize) -> EmitterHandle {
        EmitterHandle { index, session: 1 }
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut list = WatchList::new();
        let a = list.start(target(0), 0);
        let b = list.start(target(0), 0);
        assert_ne!(a, b);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_cancel() {
        let mut list = WatchList::new();
        let a = list.start(target(0), 0);
        list.start(target(1), 0);

        assert!(list.cancel(a));
        assert!(!list.cancel(a));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_poll_removes_done_watchers() {
        let mut list = WatchList::new();
        list.start(target(0), 0);
        list.start(target(1), 0);
        list.start(target(2), 0);

        let done = list.poll(|w| match w.target.index() {
            0 => WatchVerdict::Finished,
            1 => WatchVerdict::Continue,
            _ => WatchVerdict::Stale,
        });

        assert_eq!(done.len(), 2);
        assert_eq!(done[0].1, WatchVerdict::Finished);
        assert_eq!(done[1].1, WatchVerdict::Stale);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_watcher_age() {
        let mut list = WatchList::new();
        list.start(target(0), 10);
        let watcher = list.iter().next().copied().unwrap();
        assert_eq!(watcher.age(15), 5);
        assert_eq!(watcher.age(3), 0);
    }
}
