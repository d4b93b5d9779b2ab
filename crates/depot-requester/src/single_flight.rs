//! Process-wide registry of in-flight fetches.
//!
//! Keyed by files index path, so separately constructed requesters sharing
//! a store also share fetches. An entry lives until its fetch settles,
//! success or failure, which keeps failures from being cached.
//!
//! The registry only holds weak handles. A fetch every caller dropped
//! before it settled is gone, and the next caller starts a new one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, WeakShared};

use crate::types::{FetchOutcome, SharedFetch};

struct InFlight {
    generation: u64,
    fetch: WeakShared<BoxFuture<'static, FetchOutcome>>,
}

static IN_FLIGHT: LazyLock<Mutex<HashMap<PathBuf, InFlight>>> = LazyLock::new(Default::default);
static GENERATION: AtomicU64 = AtomicU64::new(0);

fn registry() -> MutexGuard<'static, HashMap<PathBuf, InFlight>> {
    IN_FLIGHT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Join the fetch registered for `key`, or register the one built by `start`.
///
/// With `force`, any registered fetch is superseded by a new one.
pub(crate) fn join_or_start<F>(key: &Path, force: bool, start: F) -> SharedFetch
where
    F: FnOnce() -> BoxFuture<'static, FetchOutcome>,
{
    let mut in_flight = registry();
    if !force {
        if let Some(existing) = in_flight.get(key).and_then(|entry| entry.fetch.upgrade()) {
            return existing;
        }
    }
    in_flight.retain(|_, entry| entry.fetch.upgrade().is_some());

    let generation = GENERATION.fetch_add(1, Ordering::Relaxed);
    let work = start();
    let release_key = key.to_path_buf();
    let fetch = async move {
        let outcome = work.await;
        release(&release_key, generation);
        outcome
    }
    .boxed()
    .shared();

    if let Some(weak) = fetch.downgrade() {
        in_flight.insert(
            key.to_path_buf(),
            InFlight {
                generation,
                fetch: weak,
            },
        );
    }
    fetch
}

fn release(key: &Path, generation: u64) {
    let mut in_flight = registry();
    if in_flight
        .get(key)
        .is_some_and(|entry| entry.generation == generation)
    {
        in_flight.remove(key);
    }
}

#[cfg(test)]
pub(crate) fn is_in_flight(key: &Path) -> bool {
    registry()
        .get(key)
        .is_some_and(|entry| entry.fetch.upgrade().is_some())
}
