#![forbid(unsafe_code)]

//! RAII listener registration.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Guard for a registered listener or handler.
///
/// Dropping the guard (or calling [`unsubscribe`](Self::unsubscribe))
/// releases the registration immediately. Releasing twice is a no-op.
/// [`detach`](Self::detach) gives up the guard while keeping the
/// registration alive for the lifetime of its source.
#[must_use = "dropping a Subscription unregisters it immediately"]
pub struct Subscription {
    active: Rc<Cell<bool>>,
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a release action. `active` is cleared before `release` runs.
    pub fn new(active: Rc<Cell<bool>>, release: impl FnOnce() + 'static) -> Self {
        Self {
            active,
            release: Some(Box::new(release)),
        }
    }

    /// A subscription that was never registered.
    pub fn inert() -> Self {
        Self {
            active: Rc::new(Cell::new(false)),
            release: None,
        }
    }

    /// Whether the registration is still live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Release the registration now.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    /// Keep the registration alive without holding a guard.
    pub fn detach(mut self) {
        self.release = None;
    }

    pub(crate) fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            self.active.set(false);
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.active.get())
            .finish()
    }
}
