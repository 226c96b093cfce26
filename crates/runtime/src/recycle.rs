//! Per-thread recycling slots.
//!
//! A recycled builder or updater keeps its state in a `thread_local!`
//! [`Recycler`]. Starting a build leases the slot; the lease is returned,
//! reset to `T::default()`, when it is dropped. While a lease is out, a
//! second [`lease`] on the same thread fails with
//! [`UsageError::InFlight`] instead of handing out shared state.
//!
//! Only the slot and its in-flight guard are reused. Staged values move
//! out into the target at the terminal call, and whatever a dropped lease
//! still holds is discarded, so no allocation carries over from one
//! build to the next.
//!
//! Leases are `!Send`: a slot never leaves the thread that owns it, so no
//! synchronization is involved.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::thread::LocalKey;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("recycled {slot} is still in use; finish or drop the previous build first")]
    InFlight { slot: &'static str },
}

/// Holder for one per-thread slot. Create it in a `thread_local!`:
///
/// ```
/// use stagecraft_runtime::{lease, Recycler};
///
/// #[derive(Default)]
/// struct Slot {
///     name: Option<String>,
/// }
///
/// thread_local! {
///     static SLOT: Recycler<Slot> = const { Recycler::new("Slot") };
/// }
///
/// let mut first = lease(&SLOT).unwrap();
/// first.name = Some("x".into());
/// assert!(lease(&SLOT).is_err());
/// drop(first);
/// assert!(lease(&SLOT).unwrap().name.is_none());
/// ```
pub struct Recycler<T> {
    name: &'static str,
    slot: RefCell<Option<T>>,
    in_flight: Cell<bool>,
}

impl<T> Recycler<T> {
    pub const fn new(name: &'static str) -> Self {
        Recycler {
            name,
            slot: RefCell::new(None),
            in_flight: Cell::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.get()
    }
}

impl<T: Default> Recycler<T> {
    fn acquire(&self) -> Result<T, UsageError> {
        if self.in_flight.replace(true) {
            return Err(UsageError::InFlight { slot: self.name });
        }
        Ok(self.slot.borrow_mut().take().unwrap_or_default())
    }

    fn release(&self, value: T) {
        *self.slot.borrow_mut() = Some(value);
        self.in_flight.set(false);
    }
}

/// Exclusive use of a per-thread slot.
pub struct Lease<T: Default + 'static> {
    key: &'static LocalKey<Recycler<T>>,
    value: T,
    // !Send: the slot belongs to the leasing thread
    _thread: PhantomData<*const ()>,
}

/// Lease the slot behind `key`.
pub fn lease<T: Default + 'static>(
    key: &'static LocalKey<Recycler<T>>,
) -> Result<Lease<T>, UsageError> {
    let value = key.with(Recycler::acquire)?;
    Ok(Lease {
        key,
        value,
        _thread: PhantomData,
    })
}

impl<T: Default + 'static> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Default + 'static> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Default + 'static> Drop for Lease<T> {
    fn drop(&mut self) {
        // The thread-local may already be torn down during thread exit.
        let _ = self.key.try_with(|recycler| recycler.release(T::default()));
    }
}

/// Move a value staged in a recycled slot out of it.
///
/// # Panics
///
/// Panics when the field was never staged. The generated step types only
/// reach the terminal method after every field has been set, so this
/// indicates hand-edited generated code.
#[track_caller]
pub fn take_staged<T>(field: &mut Option<T>, name: &str) -> T {
    match field.take() {
        Some(value) => value,
        None => panic!("{}: staged value missing from recycled slot", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Slot {
        name: Option<String>,
        age: Option<u32>,
    }

    thread_local! {
        static SLOT: Recycler<Slot> = const { Recycler::new("PersonRecycledBuilder") };
    }

    #[test]
    fn test_second_lease_is_a_usage_error() {
        let _first = lease(&SLOT).unwrap();
        let err = match lease(&SLOT) {
            Ok(_) => panic!("second lease must fail while the first is alive"),
            Err(e) => e,
        };
        assert_eq!(
            err,
            UsageError::InFlight {
                slot: "PersonRecycledBuilder"
            }
        );
    }

    #[test]
    fn test_released_slot_is_reset() {
        {
            let mut first = lease(&SLOT).unwrap();
            first.name = Some("Ada".into());
            first.age = Some(36);
        }
        assert!(!SLOT.with(Recycler::in_flight));
        let second = lease(&SLOT).unwrap();
        assert_eq!(*second, Slot::default());
    }

    #[test]
    fn test_dropped_lease_keeps_no_allocation() {
        thread_local! {
            static TAGS: Recycler<Vec<String>> = const { Recycler::new("Tags") };
        }
        {
            let mut first = lease(&TAGS).unwrap();
            first.reserve(64);
            first.push("stale".into());
        }
        let second = lease(&TAGS).unwrap();
        assert!(second.is_empty());
        assert_eq!(second.capacity(), 0);
    }

    #[test]
    fn test_take_staged_moves_value_out() {
        let mut lease = lease(&SLOT).unwrap();
        lease.name = Some("Ada".into());
        assert_eq!(take_staged(&mut lease.name, "name"), "Ada");
        assert!(lease.name.is_none());
    }

    #[test]
    fn test_slots_are_per_thread() {
        let _held = lease(&SLOT).unwrap();
        let other = std::thread::spawn(|| lease(&SLOT).is_ok()).join().unwrap();
        assert!(other);
    }
}
