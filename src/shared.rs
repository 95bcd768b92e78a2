//! Sharing a component between an interrupt handler and the main loop.
//!
//! The components are plain `&mut self` state machines. When an encoder or
//! button is fed from a pin interrupt and read from the main loop, both
//! sides go through a [`Shared`], which runs every access inside a critical
//! section so the interrupt can never observe a half-updated state.
//!
//! ```ignore
//! static KNOB: Shared<Option<Knob>> = Shared::new(None);
//!
//! // Setup:
//! KNOB.replace(Some(QuadratureEncoder::new(pin_a, pin_b, EmbassyClock, 0)));
//!
//! // Interrupt handler:
//! KNOB.with(|knob| knob.as_mut().map(|k| k.change_intr()));
//!
//! // Main loop:
//! let value = KNOB.with(|knob| knob.as_ref().map(|k| k.read()));
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Critical-section protected cell, usable in a `static`.
pub struct Shared<T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<T>>,
}

impl<T> Shared<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access to the value.
    ///
    /// # Panics
    /// If called again from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Swap in a new value and return the old one.
    pub fn replace(&self, value: T) -> T {
        self.inner.lock(|cell| cell.replace(value))
    }
}

impl<T: Copy> Shared<T> {
    pub fn get(&self) -> T {
        self.inner.lock(|cell| *cell.borrow())
    }
}
