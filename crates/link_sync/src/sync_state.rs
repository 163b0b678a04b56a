use derive_more::Display;
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::observers::{Observer, ObserverList, SubscriptionHandle};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[non_exhaustive]
pub enum SyncState {
    /// Installed, but the backing repo has not been provisioned yet.
    NotSynced,
    Synced,
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState::NotSynced
    }
}

/// Coarse readiness of an adapter. Observers get the current state as soon as
/// they register, then every transition.
pub struct SyncStateMachine {
    state: Mutex<SyncState>,
    observers: ObserverList<SyncState>,
    // held while delivering, so a replay never overtakes a newer broadcast;
    // reentrant for observers that register or transition from a callback
    delivery: ReentrantMutex<()>,
}

impl SyncStateMachine {
    pub fn new() -> SyncStateMachine {
        SyncStateMachine {
            state: Mutex::new(SyncState::NotSynced),
            observers: ObserverList::new("SyncStateMachine"),
            delivery: ReentrantMutex::new(()),
        }
    }

    pub fn current(&self) -> SyncState {
        *self.state.lock()
    }

    pub fn add_observer(&self, observer: Observer<SyncState>) -> SubscriptionHandle {
        let _delivery = self.delivery.lock();
        let (handle, state) = {
            let state = self.state.lock();
            (self.observers.add(observer.clone()), *state)
        };
        ObserverList::call("SyncStateMachine", handle, &observer, &state);
        handle
    }

    pub fn remove_observer(&self, handle: SubscriptionHandle) -> bool {
        self.observers.remove(handle)
    }

    /// Returns false if `next` already was the current state; observers are
    /// only told about actual changes.
    pub fn transition(&self, next: SyncState) -> bool {
        let _delivery = self.delivery.lock();
        {
            let mut state = self.state.lock();
            if *state == next {
                return false;
            }
            info!("SyncStateMachine.transition(): {} -> {}", *state, next);
            *state = next;
        }
        self.observers.notify(&next);
        true
    }

    pub fn mark_synced(&self) -> bool {
        self.transition(SyncState::Synced)
    }

    /// Back to [`SyncState::NotSynced`] when the adapter is disposed.
    pub fn reset(&self) -> bool {
        self.transition(SyncState::NotSynced)
    }

    pub fn clear_observers(&self) {
        self.observers.clear();
    }
}

impl Default for SyncStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<SyncState>>>, Observer<SyncState>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Arc::new(move |state: &SyncState| sink.lock().push(*state)))
    }

    #[test]
    fn starts_not_synced_and_replays_on_register() {
        let machine = SyncStateMachine::new();
        let (seen, observer) = recorder();
        machine.add_observer(observer);
        assert_eq!(machine.current(), SyncState::NotSynced);
        assert_eq!(*seen.lock(), vec![SyncState::NotSynced]);
    }

    #[test]
    fn late_observer_gets_synced_not_not_synced() {
        let machine = SyncStateMachine::new();
        assert!(machine.mark_synced());
        let (seen, observer) = recorder();
        machine.add_observer(observer);
        assert_eq!(*seen.lock(), vec![SyncState::Synced]);
    }

    #[test]
    fn transitions_are_broadcast_once() {
        let machine = SyncStateMachine::new();
        let (seen, observer) = recorder();
        machine.add_observer(observer);
        assert!(machine.mark_synced());
        assert!(!machine.mark_synced());
        assert_eq!(*seen.lock(), vec![SyncState::NotSynced, SyncState::Synced]);
    }

    #[test]
    fn replay_never_overtakes_a_concurrent_transition() {
        use std::sync::Barrier;
        use std::thread;

        for _ in 0..500 {
            let machine = Arc::new(SyncStateMachine::new());
            let barrier = Arc::new(Barrier::new(2));
            let (seen, observer) = recorder();

            let transition = {
                let machine = machine.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    machine.mark_synced();
                })
            };
            barrier.wait();
            machine.add_observer(observer);
            transition.join().unwrap();

            assert_eq!(seen.lock().last().copied(), Some(SyncState::Synced));
        }
    }

    #[test]
    fn observer_can_register_from_a_callback() {
        let machine = Arc::new(SyncStateMachine::new());
        let (seen, inner) = recorder();
        let outer = {
            let machine = machine.clone();
            Arc::new(move |state: &SyncState| {
                if *state == SyncState::Synced {
                    machine.add_observer(inner.clone());
                }
            })
        };
        machine.add_observer(outer);
        machine.mark_synced();
        assert_eq!(*seen.lock(), vec![SyncState::Synced]);
    }

    #[test]
    fn reset_goes_back_to_not_synced() {
        let machine = SyncStateMachine::new();
        machine.mark_synced();
        let (seen, observer) = recorder();
        machine.add_observer(observer);
        assert!(machine.reset());
        assert_eq!(machine.current(), SyncState::NotSynced);
        assert_eq!(*seen.lock(), vec![SyncState::Synced, SyncState::NotSynced]);
    }

    #[test]
    fn removed_observer_misses_transitions() {
        let machine = SyncStateMachine::new();
        let (seen, observer) = recorder();
        let handle = machine.add_observer(observer);
        assert!(machine.remove_observer(handle));
        machine.mark_synced();
        assert_eq!(*seen.lock(), vec![SyncState::NotSynced]);
    }
}
