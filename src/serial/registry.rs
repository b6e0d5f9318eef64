//! # Interrupt Slot Registry
//!
//! The platform's edge-interrupt API accepts a bare `fn()` with no user
//! context. To route an interrupt to the instance that armed it, the crate
//! keeps two parallel process-wide tables of [`MAX_INSTANCES`] entries:
//!
//! - `TRAMPOLINES`: one distinct entry point per slot, each statically bound
//!   to its own index
//! - `SLOTS`: the instance currently bound to each index, or null
//!
//! An instance claims the first free slot at `begin`, attaches that slot's
//! trampoline to its rx pin, and releases the slot at `end`. The table size is
//! a hard ceiling; it never grows.
//!
//! Claim and release happen in foreground context only. Release must come
//! after the slot's interrupt has been detached, so no trampoline can still be
//! running against the binding being dropped.

use crate::constants::MAX_INSTANCES;
use crate::error::SerialError;
use crate::hal::IsrHandler;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Receiver of edge interrupts routed through a slot
pub trait EdgeSink: Send + Sync {
    /// Called in interrupt context; must not block or allocate
    fn on_edge(&self);
}

type Binding = Arc<dyn EdgeSink>;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY: AtomicPtr<Binding> = AtomicPtr::new(ptr::null_mut());

static SLOTS: [AtomicPtr<Binding>; MAX_INSTANCES] = [EMPTY; MAX_INSTANCES];

fn trampoline<const SLOT: usize>() {
    dispatch(SLOT);
}

macro_rules! trampolines {
    ($($slot:literal)*) => {
        [$(trampoline::<$slot> as IsrHandler),*]
    };
}

#[cfg(not(feature = "esp32"))]
static TRAMPOLINES: [IsrHandler; MAX_INSTANCES] = trampolines!(0 1 2 3 4 5 6 7 8 9);

#[cfg(feature = "esp32")]
static TRAMPOLINES: [IsrHandler; MAX_INSTANCES] =
    trampolines!(0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21);

/// Bind `sink` to the first free slot and return its index
pub fn claim(sink: Arc<dyn EdgeSink>) -> Result<usize, SerialError> {
    let binding = Box::into_raw(Box::new(sink));
    for (index, slot) in SLOTS.iter().enumerate() {
        if slot
            .compare_exchange(ptr::null_mut(), binding, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            log::debug!("Claimed interrupt slot {index}");
            return Ok(index);
        }
    }

    // SAFETY: `binding` came from Box::into_raw above and was never published.
    drop(unsafe { Box::from_raw(binding) });
    Err(SerialError::NoFreeSlot {
        capacity: MAX_INSTANCES,
    })
}

/// Unbind a slot, making it available to other instances
pub fn release(index: usize) {
    let Some(slot) = SLOTS.get(index) else {
        return;
    };
    let binding = slot.swap(ptr::null_mut(), Ordering::AcqRel);
    if !binding.is_null() {
        // SAFETY: non-null slot values are only ever produced by `claim` via
        // Box::into_raw, and the swap above gives us sole ownership.
        drop(unsafe { Box::from_raw(binding) });
        log::debug!("Released interrupt slot {index}");
    }
}

/// Route an interrupt on `index` to its bound instance, if any
pub fn dispatch(index: usize) {
    let Some(slot) = SLOTS.get(index) else {
        return;
    };
    let binding = slot.load(Ordering::Acquire);
    // SAFETY: the binding stays alive until `release`, which callers invoke
    // only after detaching the interrupt that leads here.
    if let Some(sink) = unsafe { binding.as_ref() } {
        sink.on_edge();
    }
}

/// Interrupt entry point statically bound to slot `index`
pub fn handler(index: usize) -> Option<IsrHandler> {
    TRAMPOLINES.get(index).copied()
}

pub fn is_bound(index: usize) -> bool {
    SLOTS
        .get(index)
        .map(|slot| !slot.load(Ordering::Acquire).is_null())
        .unwrap_or(false)
}

/// Number of unbound slots
pub fn free_slots() -> usize {
    SLOTS
        .iter()
        .filter(|slot| slot.load(Ordering::Acquire).is_null())
        .count()
}

pub const fn capacity() -> usize {
    MAX_INSTANCES
}

#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Counter(AtomicUsize);

    impl EdgeSink for Counter {
        fn on_edge(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_trampoline_routes_to_bound_sink() {
        let _guard = lock();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let index = claim(counter.clone()).unwrap();
        assert!(is_bound(index));

        let entry = handler(index).unwrap();
        entry();
        entry();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        release(index);
        assert!(!is_bound(index));
        entry();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let _guard = lock();
        let start_free = free_slots();
        let sink: Arc<dyn EdgeSink> = Arc::new(Counter(AtomicUsize::new(0)));

        let claimed: Vec<usize> = (0..start_free)
            .map(|_| claim(sink.clone()).unwrap())
            .collect();
        assert_eq!(free_slots(), 0);
        assert!(matches!(
            claim(sink.clone()),
            Err(SerialError::NoFreeSlot { capacity: MAX_INSTANCES })
        ));

        release(claimed[0]);
        assert_eq!(claim(sink.clone()).unwrap(), claimed[0]);

        for index in claimed {
            release(index);
        }
        assert_eq!(free_slots(), start_free);
        // only our local handle is left once every binding is dropped
        assert_eq!(Arc::strong_count(&sink), 1);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        assert!(handler(MAX_INSTANCES).is_none());
        assert!(!is_bound(MAX_INSTANCES));
        dispatch(MAX_INSTANCES);
        release(MAX_INSTANCES);
    }
}
