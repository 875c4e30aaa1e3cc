//! Observable values and event streams.
//!
//! An [`Observable`] holds a current value and notifies registered observers
//! synchronously, in registration order, whenever the value changes. Writes
//! are change-suppressed: setting a value equal to the current one stores
//! nothing and notifies nobody. That suppression is what terminates the echo
//! of a bidirectional bind and the mutual correction of paired fields.
//!
//! Handles are `Rc`-cloned and single-thread only; the whole graph lives on
//! the coordination context (see the `coordinator` module).

use std::cell::RefCell;
use std::rc::Rc;

pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    value: RefCell<T>,
    observers: RefCell<Vec<Rc<dyn Fn(&T)>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                observers: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Stores `value` and notifies observers, unless it equals the current
    /// value, in which case nothing happens at all.
    pub fn set(&self, value: T) {
        let unchanged = *self.inner.value.borrow() == value;
        if unchanged {
            return;
        }
        *self.inner.value.borrow_mut() = value.clone();
        // Snapshot the observer list so observers may subscribe or write
        // other observables (or this one) while being notified.
        let observers: Vec<_> = self.inner.observers.borrow().iter().cloned().collect();
        for observer in observers {
            (*observer)(&value);
        }
    }

    /// Registers an observer for subsequent changes. Observers live as long
    /// as the observable and run in registration order.
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) {
        self.inner.observers.borrow_mut().push(Rc::new(observer));
    }

    /// Derives an observable recomputed synchronously on every source change,
    /// with the same change-suppression downstream.
    pub fn map<U>(&self, transform: impl Fn(&T) -> U + 'static) -> Observable<U>
    where
        U: Clone + PartialEq + 'static,
    {
        let derived = Observable::new(transform(&self.get()));
        let target = derived.clone();
        self.subscribe(move |value| target.set(transform(value)));
        derived
    }
}

/// Derives an observable from two sources; recomputed when either changes.
pub fn combine<A, B, U>(
    first: &Observable<A>,
    second: &Observable<B>,
    merge: impl Fn(&A, &B) -> U + 'static,
) -> Observable<U>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
    U: Clone + PartialEq + 'static,
{
    let merge = Rc::new(merge);
    let derived = Observable::new((*merge)(&first.get(), &second.get()));
    {
        let target = derived.clone();
        let other = second.clone();
        let merge = Rc::clone(&merge);
        first.subscribe(move |value| target.set((*merge)(value, &other.get())));
    }
    {
        let target = derived.clone();
        let other = first.clone();
        second.subscribe(move |value| target.set((*merge)(&other.get(), value)));
    }
    derived
}

/// Keeps two observables equal in both directions. The write-back of each side
/// is suppressed as a no-op, so the bind settles instead of ping-ponging.
pub fn bind_bidirectional<T: Clone + PartialEq + 'static>(
    left: &Observable<T>,
    right: &Observable<T>,
) {
    right.set(left.get());
    {
        let right = right.clone();
        left.subscribe(move |value| right.set(value.clone()));
    }
    {
        let left = left.clone();
        right.subscribe(move |value| left.set(value.clone()));
    }
}

/// Events without state: published values reach current subscribers and are
/// never replayed to observers that attach later.
pub struct EventStream<T> {
    observers: Rc<RefCell<Vec<Rc<dyn Fn(&T)>>>>,
}

impl<T> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            observers: Rc::clone(&self.observers),
        }
    }
}

impl<T: 'static> EventStream<T> {
    pub fn new() -> Self {
        Self {
            observers: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) {
        self.observers.borrow_mut().push(Rc::new(observer));
    }

    pub fn publish(&self, event: &T) {
        let observers: Vec<_> = self.observers.borrow().iter().cloned().collect();
        for observer in observers {
            (*observer)(event);
        }
    }
}

impl<T: 'static> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}
