//! Update bus - process-wide, payload-free change notification.
//!
//! Multiple independently-mounted views can mutate the same save slot
//! (drag-and-drop reordering, completion toggles, slot switches). Rather
//! than shipping deltas that would need ordering guarantees, the bus tells
//! every subscriber "something changed" and each one re-pulls current state
//! from the facade. Publish happens exactly once per completed mutation,
//! after the durable write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use event_emitter_rs::EventEmitter;

const UPDATE_EVENT: &str = "progress-data-updated";

/// Handle identifying one subscription; used to detach it or to arm the
/// one-shot echo suppression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionId(String);

struct BusInner {
    emitter: EventEmitter,
    suppress_flags: HashMap<String, Arc<AtomicBool>>,
}

/// Stateless publish/subscribe channel for "progress changed" fan-out.
pub struct UpdateBus {
    inner: Mutex<BusInner>,
}

impl Default for UpdateBus {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateBus {
    pub fn new() -> Self {
        UpdateBus {
            inner: Mutex::new(BusInner {
                emitter: EventEmitter::new(),
                suppress_flags: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        // A poisoned lock only means a subscriber panicked; keep notifying.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Attach a zero-argument callback invoked after every publish.
    ///
    /// Callbacks must not attach or detach subscriptions from inside the
    /// callback itself.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let flag = Arc::new(AtomicBool::new(false));
        let armed = Arc::clone(&flag);

        let mut inner = self.lock();
        let id = inner.emitter.on(UPDATE_EVENT, move |_: ()| {
            if armed.swap(false, Ordering::SeqCst) {
                return;
            }
            callback();
        });
        inner.suppress_flags.insert(id.clone(), flag);
        SubscriptionId(id)
    }

    /// Detach a subscription. Detaching twice is harmless.
    pub fn unsubscribe(&self, id: &SubscriptionId) {
        let mut inner = self.lock();
        inner.emitter.remove_listener(&id.0);
        inner.suppress_flags.remove(&id.0);
    }

    /// Skip the next publish for this subscriber only.
    ///
    /// A view applying an optimistic local change arms this before issuing
    /// the write so its own echoed broadcast cannot visibly revert it; every
    /// later publish is delivered normally.
    pub fn suppress_next(&self, id: &SubscriptionId) {
        let inner = self.lock();
        if let Some(flag) = inner.suppress_flags.get(&id.0) {
            flag.store(true, Ordering::SeqCst);
        }
    }

    /// Notify every subscriber. Carries no payload; observers re-pull.
    pub fn publish(&self) {
        let mut inner = self.lock();
        inner.emitter.emit(UPDATE_EVENT, ());
    }
}
