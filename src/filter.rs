// Filtered views over the entity collections
//
// A view is a predicate (or "show all") plus the visible subset it selects.
// Observers registered on a view are told whenever that subset changes, which
// is how a display layer stays in sync without knowing about the model.

use crate::entities::{Appointment, Bill, Patient};
use std::fmt;
use std::rc::Rc;

// ============================================================================
// PREDICATE
// ============================================================================

/// A labelled, shareable filter predicate.
///
/// Cloning shares the closure. Two predicates are equal only when they share
/// the same closure, so a predicate restored from history compares equal to
/// the one that was recorded.
pub struct Predicate<T> {
    label: Rc<str>,
    test: Rc<dyn Fn(&T) -> bool>,
}

impl<T> Predicate<T> {
    pub fn new<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        let label: String = label.into();
        Predicate {
            label: Rc::from(label),
            test: Rc::new(test),
        }
    }

    /// Human readable description, e.g. "appointments of Alice"
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, item: &T) -> bool {
        (self.test)(item)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Predicate {
            label: Rc::clone(&self.label),
            test: Rc::clone(&self.test),
        }
    }
}

impl<T> PartialEq for Predicate<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.test, &other.test)
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.label).finish()
    }
}

// ============================================================================
// FILTER STATE
// ============================================================================

/// Active predicate of each collection. `None` means "show all".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub patients: Option<Predicate<Patient>>,
    pub appointments: Option<Predicate<Appointment>>,
    pub bills: Option<Predicate<Bill>>,
}

impl FilterState {
    pub fn show_all() -> Self {
        Self::default()
    }

    pub fn is_show_all(&self) -> bool {
        self.patients.is_none() && self.appointments.is_none() && self.bills.is_none()
    }
}

// ============================================================================
// FILTERED LIST
// ============================================================================

pub type SubscriptionId = u64;

type Observer<T> = Box<dyn FnMut(&[T])>;

/// Observable subset of a collection selected by an optional predicate.
///
/// The list does not borrow its source; the owner calls [`FilteredList::refresh`]
/// after mutating the source so the view stays live.
pub struct FilteredList<T> {
    predicate: Option<Predicate<T>>,
    visible: Vec<T>,
    observers: Vec<(SubscriptionId, Observer<T>)>,
    next_id: SubscriptionId,
}

impl<T: Clone + PartialEq> FilteredList<T> {
    pub fn new(source: &[T]) -> Self {
        FilteredList {
            predicate: None,
            visible: source.to_vec(),
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn predicate(&self) -> Option<&Predicate<T>> {
        self.predicate.as_ref()
    }

    /// Install a predicate (`None` = show all) and recompute against `source`
    pub fn set_predicate(&mut self, predicate: Option<Predicate<T>>, source: &[T]) {
        self.predicate = predicate;
        self.refresh(source);
    }

    /// Recompute the visible subset; observers hear about it only if it changed
    pub fn refresh(&mut self, source: &[T]) {
        let visible: Vec<T> = match &self.predicate {
            Some(predicate) => source
                .iter()
                .filter(|item| predicate.matches(item))
                .cloned()
                .collect(),
            None => source.to_vec(),
        };

        if visible != self.visible {
            self.visible = visible;
            for (_, observer) in self.observers.iter_mut() {
                observer(&self.visible);
            }
        }
    }

    pub fn items(&self) -> &[T] {
        &self.visible
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.visible.get(index)
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&[T]) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }
}

impl<T: fmt::Debug> fmt::Debug for FilteredList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredList")
            .field("predicate", &self.predicate)
            .field("visible", &self.visible)
            .field("observers", &self.observers.len())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_predicate_equality_is_identity() {
        let even = Predicate::new("even", |n: &i32| n % 2 == 0);
        let same_closure = even.clone();
        let lookalike = Predicate::new("even", |n: &i32| n % 2 == 0);

        assert_eq!(even, same_closure);
        assert_ne!(even, lookalike);
        assert_eq!(even.label(), "even");
    }

    #[test]
    fn test_filter_state_show_all() {
        let mut state = FilterState::show_all();
        assert!(state.is_show_all());

        state.bills = Some(Predicate::new("paid", |b: &Bill| b.payment_status.is_paid()));
        assert!(!state.is_show_all());
    }

    #[test]
    fn test_set_predicate_filters_source() {
        let source = vec![1, 2, 3, 4];
        let mut list = FilteredList::new(&source);
        assert_eq!(list.items(), &[1, 2, 3, 4]);

        list.set_predicate(Some(Predicate::new("even", |n: &i32| n % 2 == 0)), &source);
        assert_eq!(list.items(), &[2, 4]);
        assert_eq!(list.predicate().map(|p| p.label()), Some("even"));

        list.set_predicate(None, &source);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_observers_notified_only_on_change() {
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let mut source = vec![1, 2, 3];
        let mut list = FilteredList::new(&source);

        let sink = Rc::clone(&seen);
        let id = list.subscribe(move |items| sink.borrow_mut().push(items.len()));

        list.refresh(&source);
        assert!(seen.borrow().is_empty());

        source.push(4);
        list.refresh(&source);
        assert_eq!(*seen.borrow(), vec![4]);

        assert!(list.unsubscribe(id));
        assert!(!list.unsubscribe(id));

        source.push(5);
        list.refresh(&source);
        assert_eq!(*seen.borrow(), vec![4]);
    }
}
