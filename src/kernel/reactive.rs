//! Single-threaded reactive primitives.
//!
//! `Property<T>` is a shared observable value: writes notify every linked
//! listener synchronously, before `set` returns. `Emitter<T>` is the same
//! notification machinery without a stored value.
//!
//! # Invariants
//! 1. Listeners are notified in registration order.
//! 2. Setting a value equal to the current one is a no-op (no notification).
//! 3. A listener unlinked while a notification is in flight is not called
//!    for the remainder of that notification.
//! 4. No internal borrow is held while a listener runs, so listeners may
//!    read, write, link or unlink freely (re-entrancy is allowed).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Rc<dyn Fn(&T)>;

/// Ordered listener registry shared by `Property` and `Emitter`.
struct ListenerSet<T> {
    entries: RefCell<Vec<(ListenerId, Listener<T>)>>,
    next_id: Cell<u64>,
}

impl<T> ListenerSet<T> {
    fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    fn add(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    fn contains(&self, id: ListenerId) -> bool {
        self.entries.borrow().iter().any(|(existing, _)| *existing == id)
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn get(&self, id: ListenerId) -> Option<Listener<T>> {
        self.entries
            .borrow()
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, listener)| listener.clone())
    }

    fn notify(&self, value: &T) {
        // Snapshot ids first; each listener is re-fetched so one unlinked
        // mid-notification is skipped.
        let ids: Vec<ListenerId> = self.entries.borrow().iter().map(|(id, _)| *id).collect();
        for id in ids {
            if let Some(listener) = self.get(id) {
                listener(value);
            }
        }
    }
}

struct PropertyInner<T> {
    value: RefCell<T>,
    listeners: ListenerSet<T>,
}

/// Shared observable value. Cloning yields another handle to the same value.
pub struct Property<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                value: RefCell::new(value),
                listeners: ListenerSet::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Stores `value` and notifies listeners if it differs from the current value.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value.clone();
        }
        self.inner.listeners.notify(&value);
    }

    /// Registers `listener` and calls it right away with the current value.
    pub fn link(&self, listener: impl Fn(&T) + 'static) -> ListenerId {
        let listener: Listener<T> = Rc::new(listener);
        let id = self.inner.listeners.add(listener.clone());
        let current = self.get();
        listener(&current);
        id
    }

    /// Registers `listener` without calling it.
    pub fn lazy_link(&self, listener: impl Fn(&T) + 'static) -> ListenerId {
        self.inner.listeners.add(Rc::new(listener))
    }

    /// Returns false if `id` was not linked.
    pub fn unlink(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.contains(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    pub fn ptr_eq(&self, other: &Property<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &*self.inner.value.borrow())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

/// Shared fire-and-forget notification channel.
pub struct Emitter<T> {
    listeners: Rc<ListenerSet<T>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Emitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(ListenerSet::new()),
        }
    }

    pub fn add_listener(&self, listener: impl Fn(&T) + 'static) -> ListenerId {
        self.listeners.add(Rc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.contains(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&self, value: &T) {
        self.listeners.notify(value);
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_notifies_in_registration_order() {
        let property = Property::new(1.0_f64);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = seen.clone();
        property.lazy_link(move |v| first.borrow_mut().push(("first", *v)));
        let second = seen.clone();
        property.lazy_link(move |v| second.borrow_mut().push(("second", *v)));

        property.set(3.0);
        assert_eq!(*seen.borrow(), vec![("first", 3.0), ("second", 3.0)]);
    }

    #[test]
    fn equal_value_does_not_notify() {
        let property = Property::new(true);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        property.lazy_link(move |_| c.set(c.get() + 1));

        property.set(true);
        assert_eq!(count.get(), 0);
        property.set(false);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn link_fires_immediately() {
        let property = Property::new(String::from("hello"));
        let seen = Rc::new(RefCell::new(String::new()));
        let s = seen.clone();
        property.link(move |v| *s.borrow_mut() = v.clone());
        assert_eq!(*seen.borrow(), "hello");
    }

    #[test]
    fn listener_unlinked_mid_notification_is_skipped() {
        let property = Property::new(0_i32);
        let later_calls = Rc::new(Cell::new(0));
        let later_id: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let handle = property.clone();
        let target = later_id.clone();
        property.lazy_link(move |_| {
            if let Some(id) = target.get() {
                handle.unlink(id);
            }
        });
        let calls = later_calls.clone();
        later_id.set(Some(property.lazy_link(move |_| calls.set(calls.get() + 1))));

        property.set(1);
        assert_eq!(later_calls.get(), 0);
        assert_eq!(property.listener_count(), 1);
    }

    #[test]
    fn listener_may_write_the_property_it_observes() {
        let property = Property::new(0_i32);
        let handle = property.clone();
        property.lazy_link(move |v| {
            if *v < 3 {
                handle.set(v + 1);
            }
        });
        property.set(1);
        assert_eq!(property.get(), 3);
    }

    #[test]
    fn emitter_add_and_remove() {
        let emitter: Emitter<u32> = Emitter::new();
        let total = Rc::new(Cell::new(0));
        let t = total.clone();
        let id = emitter.add_listener(move |v| t.set(t.get() + *v));

        emitter.emit(&5);
        assert!(emitter.has_listener(id));
        assert!(emitter.remove_listener(id));
        assert!(!emitter.remove_listener(id));
        emitter.emit(&5);
        assert_eq!(total.get(), 5);
    }
}
