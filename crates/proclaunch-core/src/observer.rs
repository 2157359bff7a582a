//! Error observers with explicit ownership.
//!
//! No ambient process-wide registry: whichever component wants failure
//! notifications owns an [`ObserverSet`] and passes it where needed. The
//! list is snapshotted before each notification round, so observers added
//! or removed during a callback take effect only for the next round.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::LaunchError;

/// Receives launch failures as they are surfaced.
pub trait ErrorObserver: Send + Sync {
    fn on_error(&self, error: &LaunchError);
}

/// Subscription handle returned by [`ObserverSet::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// An explicitly owned observer list.
#[derive(Default)]
pub struct ObserverSet {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ObserverId, Arc<dyn ErrorObserver>)>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn ErrorObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Remove a subscription; returns false when the id was already gone.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Deliver `error` to every observer subscribed at the start of this
    /// call. The lock is dropped before any callback runs, so observers may
    /// subscribe or unsubscribe from inside `on_error`.
    pub fn notify(&self, error: &LaunchError) {
        let snapshot: Vec<Arc<dyn ErrorObserver>> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in snapshot {
            observer.on_error(error);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    impl ErrorObserver for Recorder {
        fn on_error(&self, error: &LaunchError) {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(error.to_string());
        }
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.messages
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    fn sample_error() -> LaunchError {
        LaunchError::MissingApplicationPath
    }

    #[test]
    fn notify_reaches_every_subscriber() {
        let set = ObserverSet::new();
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        set.subscribe(first.clone());
        set.subscribe(second.clone());

        set.notify(&sample_error());
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let set = ObserverSet::new();
        let recorder = Arc::new(Recorder::default());
        let id = set.subscribe(recorder.clone());

        set.notify(&sample_error());
        assert!(set.unsubscribe(id));
        assert!(!set.unsubscribe(id));
        set.notify(&sample_error());
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn subscription_during_notify_applies_next_round() {
        struct SelfAdder {
            set: Arc<ObserverSet>,
            added: Arc<Recorder>,
        }

        impl ErrorObserver for SelfAdder {
            fn on_error(&self, _error: &LaunchError) {
                self.set.subscribe(self.added.clone());
            }
        }

        let set = Arc::new(ObserverSet::new());
        let added = Arc::new(Recorder::default());
        set.subscribe(Arc::new(SelfAdder {
            set: set.clone(),
            added: added.clone(),
        }));

        set.notify(&sample_error());
        assert_eq!(added.count(), 0, "late subscriber must wait for the next round");

        set.notify(&sample_error());
        assert_eq!(added.count(), 1);
    }
}
