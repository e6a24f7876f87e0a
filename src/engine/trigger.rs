// Velopool Engine: Ready Trigger
// Disconnected → Connected, once per process. The first transition is the
// only one that fires the report pipeline; later READY events (a resumed or
// re-identified session) are ignored.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Disconnected,
    Connected,
}

#[derive(Debug, Default)]
pub struct ReadyTrigger {
    connected: AtomicBool,
}

impl ReadyTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the chat session becoming ready. Returns `true` exactly once.
    pub fn connect(&self) -> bool {
        self.connected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn state(&self) -> TriggerState {
        if self.connected.load(Ordering::Acquire) {
            TriggerState::Connected
        } else {
            TriggerState::Disconnected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fires_once() {
        let trigger = ReadyTrigger::new();
        assert_eq!(trigger.state(), TriggerState::Disconnected);
        assert!(trigger.connect());
        assert_eq!(trigger.state(), TriggerState::Connected);
        assert!(!trigger.connect());
        assert!(!trigger.connect());
    }

    #[test]
    fn fires_once_across_threads() {
        let trigger = Arc::new(ReadyTrigger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = trigger.clone();
                std::thread::spawn(move || t.connect())
            })
            .collect();
        let fired = handles.into_iter().map(|h| h.join().unwrap()).filter(|f| *f).count();
        assert_eq!(fired, 1);
    }
}
