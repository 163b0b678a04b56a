use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use derive_more::Display;
use parking_lot::Mutex;
use tracing::error;

pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct SubscriptionHandle(u64);

/// Callbacks in registration order. A panicking callback is logged and
/// skipped; the rest still run.
pub struct ObserverList<T> {
    name: &'static str,
    next_id: AtomicU64,
    observers: Mutex<Vec<(SubscriptionHandle, Observer<T>)>>,
}

impl<T> ObserverList<T> {
    pub fn new(name: &'static str) -> ObserverList<T> {
        ObserverList {
            name,
            next_id: AtomicU64::new(0),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, observer: Observer<T>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.lock().push((handle, observer));
        handle
    }

    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(id, _)| *id != handle);
        observers.len() != before
    }

    pub fn clear(&self) {
        self.observers.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }

    pub fn notify(&self, value: &T) {
        // released before calling out, callbacks may register further observers
        let observers = self.observers.lock().clone();
        for (handle, observer) in observers.iter() {
            Self::call(self.name, *handle, observer, value);
        }
    }

    /// Calls a single observer with the same isolation as [`ObserverList::notify`].
    pub fn call(name: &str, handle: SubscriptionHandle, observer: &Observer<T>, value: &T) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| observer(value)));
        if result.is_err() {
            error!("{}.notify(): observer {} panicked, skipping it", name, handle);
        }
    }
}
