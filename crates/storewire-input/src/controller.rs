#![forbid(unsafe_code)]

//! Store binding for arbitrary elements.
//!
//! [`StoreController`] is the general form of a field binding for elements
//! that are not plain form controls (a canvas, a custom widget, a third-party
//! editor). The caller supplies both directions:
//!
//! - `on_subscribe(state, element)` runs for every store notification not
//!   caused by this controller, while an element is attached;
//! - `on_dispatch(draft, element)` runs inside the recipe dispatched by
//!   [`notify_change`](StoreController::notify_change).
//!
//! The controller holds its element weakly and can be attached before or
//! after the element exists.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use storewire_runtime::{Disposable, OriginTag, Store, Subscription};
use tracing::trace;

type OnSubscribe<S, E> = Box<dyn Fn(&S, &E)>;
type OnDispatch<S, E> = Box<dyn Fn(&mut S, &E)>;

struct ControllerInner<S, E> {
    store: Store<S>,
    element: RefCell<Weak<E>>,
    on_subscribe: OnSubscribe<S, E>,
    on_dispatch: OnDispatch<S, E>,
    origin: OriginTag,
    subscription: RefCell<Option<Subscription>>,
}

/// Caller-defined synchronization between a store and one element.
pub struct StoreController<S, E> {
    inner: Rc<ControllerInner<S, E>>,
}

impl<S, E> StoreController<S, E>
where
    S: Clone + PartialEq + 'static,
    E: 'static,
{
    /// Subscribe to `store`. No element is attached yet.
    pub fn new(
        store: &Store<S>,
        on_subscribe: impl Fn(&S, &E) + 'static,
        on_dispatch: impl Fn(&mut S, &E) + 'static,
    ) -> Self {
        let inner = Rc::new(ControllerInner {
            store: store.clone(),
            element: RefCell::new(Weak::new()),
            on_subscribe: Box::new(on_subscribe),
            on_dispatch: Box::new(on_dispatch),
            origin: store.origin_tag(),
            subscription: RefCell::new(None),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = store.subscribe(move |state, origin| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if origin == Some(inner.origin) {
                trace!(origin = %inner.origin, "controller skipping self-echo");
                return;
            }
            let element = inner.element.borrow().upgrade();
            if let Some(element) = element {
                (inner.on_subscribe)(&**state, element.as_ref());
            }
        });
        *inner.subscription.borrow_mut() = Some(subscription);

        Self { inner }
    }

    /// Attach (or replace) the element this controller drives.
    pub fn attach(&self, element: &Rc<E>) {
        *self.inner.element.borrow_mut() = Rc::downgrade(element);
    }

    /// Forget the attached element.
    pub fn detach_element(&self) {
        *self.inner.element.borrow_mut() = Weak::new();
    }

    /// The attached element, if it is still alive.
    #[must_use]
    pub fn element(&self) -> Option<Rc<E>> {
        self.inner.element.borrow().upgrade()
    }

    /// Report a user change on the element: dispatches `on_dispatch` tagged
    /// with this controller's origin. Does nothing without an element or
    /// after disposal.
    pub fn notify_change(&self) {
        if !self.is_active() {
            return;
        }
        let Some(element) = self.element() else {
            return;
        };
        let on_dispatch = &self.inner.on_dispatch;
        self.inner
            .store
            .dispatch_tagged(|draft| on_dispatch(draft, element.as_ref()), self.inner.origin);
    }
}

impl<S, E> StoreController<S, E> {
    #[must_use]
    pub fn origin(&self) -> OriginTag {
        self.inner.origin
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner
            .subscription
            .borrow()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Stop listening. Calling twice is a no-op.
    pub fn dispose(&self) {
        let subscription = self.inner.subscription.borrow_mut().take();
        drop(subscription);
    }
}

impl<S, E> Disposable for StoreController<S, E> {
    fn dispose(&mut self) {
        StoreController::dispose(self);
    }

    fn is_active(&self) -> bool {
        StoreController::is_active(self)
    }
}

impl<S, E> fmt::Debug for StoreController<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreController")
            .field("origin", &self.inner.origin)
            .field("attached", &(self.inner.element.borrow().strong_count() > 0))
            .field("active", &self.is_active())
            .finish()
    }
}
