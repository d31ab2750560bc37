//! Observer hooks into the per-statement pipeline: a synchronous,
//! in-order notification fired around each phase, with a failing
//! observer isolated so it can never abort the statement it's
//! watching.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// One phase boundary the engine notifies observers about. Every
/// variant carries the transaction id the engine allocated for the
/// statement and a Unix timestamp.
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    LexStart { txid: u64, timestamp: i64, sql: String },
    LexEnd { txid: u64, timestamp: i64, token_count: usize },
    ParseStart { txid: u64, timestamp: i64 },
    ParseEnd { txid: u64, timestamp: i64 },
    PlanStart { txid: u64, timestamp: i64 },
    PlanEnd { txid: u64, timestamp: i64 },
    ExecStart { txid: u64, timestamp: i64 },
    ExecEnd { txid: u64, timestamp: i64, success: bool },
}

/// Something that wants to watch the pipeline go by. Implementors
/// should not panic, but [`notify`] isolates them from the rest of the
/// pipeline if they do.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ObserverEvent);
}

/// Delivers `event` to every observer in order, catching any panic so
/// one broken observer can't take the statement down with it.
pub fn notify(observers: &[std::sync::Arc<dyn Observer>], event: &ObserverEvent) {
    for observer in observers {
        let result = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event)));
        if result.is_err() {
            warn!("observer panicked while handling {event:?}, ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingObserver(AtomicUsize);

    impl Observer for CountingObserver {
        fn on_event(&self, _event: &ObserverEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingObserver;

    impl Observer for PanickingObserver {
        fn on_event(&self, _event: &ObserverEvent) {
            panic!("boom");
        }
    }

    #[test]
    fn test_notify_delivers_to_all_observers() {
        let counter = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let observers: Vec<Arc<dyn Observer>> = vec![counter.clone(), counter.clone()];
        notify(&observers, &ObserverEvent::ParseStart { txid: 1, timestamp: 0 });
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notify_isolates_panicking_observer() {
        let counter = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let observers: Vec<Arc<dyn Observer>> = vec![Arc::new(PanickingObserver), counter.clone()];
        notify(&observers, &ObserverEvent::ParseStart { txid: 1, timestamp: 0 });
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
