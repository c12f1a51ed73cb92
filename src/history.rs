// Undo/Redo History - full-state snapshots
//
// Push discipline: the model records a snapshot after every action, so the top
// of the undo stack is always "the state as of right now". Undo therefore lands
// on the entry *below* the top (index len - 2), and the number of undoable
// steps is always one less than the number of undo entries.
//
// Filter predicates are kept in separate per-collection stacks that move in
// lock-step with the snapshot stacks.

use crate::address_book::AddressBook;
use crate::entities::{Appointment, Bill, Patient};
use crate::error::{ModelError, ModelResult};
use crate::filter::{FilterState, Predicate};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::debug;

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable copy of a whole address book at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Unique snapshot ID
    pub snapshot_id: String,

    /// When the state was captured
    pub as_of: DateTime<Utc>,

    /// Deep copy of all three collections
    pub book: AddressBook,
}

impl Snapshot {
    pub fn capture(book: &AddressBook) -> Self {
        Snapshot {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            as_of: Utc::now(),
            book: book.clone(),
        }
    }

    /// Structural comparison of the captured state, ignoring id and time
    pub fn same_state(&self, book: &AddressBook) -> bool {
        &self.book == book
    }
}

/// What the model must install after a successful undo or redo
#[derive(Debug, Clone)]
pub struct Restore {
    pub snapshot: Snapshot,
    pub filters: FilterState,
}

// ============================================================================
// FILTER STACKS
// ============================================================================

/// Undo and redo predicate stacks for one collection
#[derive(Debug)]
struct FilterStacks<T> {
    undo: VecDeque<Option<Predicate<T>>>,
    redo: Vec<Option<Predicate<T>>>,
}

impl<T> FilterStacks<T> {
    fn new() -> Self {
        FilterStacks {
            undo: VecDeque::new(),
            redo: Vec::new(),
        }
    }

    fn undo_at(&self, index: usize) -> Option<Predicate<T>> {
        self.undo.get(index).cloned().flatten()
    }
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

#[derive(Debug)]
pub struct HistoryManager {
    undo_snapshots: VecDeque<Snapshot>,
    redo_snapshots: Vec<Snapshot>,
    patient_filters: FilterStacks<Patient>,
    appointment_filters: FilterStacks<Appointment>,
    bill_filters: FilterStacks<Bill>,
    /// Maximum undo entries kept; `None` = unbounded
    capacity: Option<usize>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    /// Unbounded history
    pub fn new() -> Self {
        HistoryManager {
            undo_snapshots: VecDeque::new(),
            redo_snapshots: Vec::new(),
            patient_filters: FilterStacks::new(),
            appointment_filters: FilterStacks::new(),
            bill_filters: FilterStacks::new(),
            capacity: None,
        }
    }

    /// History that evicts its oldest entry beyond `capacity` undo entries.
    /// Values below 2 are raised to 2, the minimum that still allows one undo.
    pub fn with_capacity(capacity: usize) -> Self {
        HistoryManager {
            capacity: Some(capacity.max(2)),
            ..Self::new()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    // ========================================================================
    // RECORDING
    // ========================================================================

    /// Record the state after a forward action. Invalidates the redo branch.
    pub fn record_undo(&mut self, snapshot: Snapshot, filters: &FilterState) {
        self.truncate_redo();
        self.push_undo(snapshot, filters);

        if let Some(capacity) = self.capacity {
            while self.undo_snapshots.len() > capacity {
                self.undo_snapshots.pop_front();
                self.patient_filters.undo.pop_front();
                self.appointment_filters.undo.pop_front();
                self.bill_filters.undo.pop_front();
            }
        }

        debug!(
            undo = self.undo_snapshots.len(),
            "recorded history snapshot"
        );
    }

    /// Record a state that a later redo should bring back
    pub fn record_redo(&mut self, snapshot: Snapshot, filters: &FilterState) {
        self.redo_snapshots.push(snapshot);
        self.patient_filters.redo.push(filters.patients.clone());
        self.appointment_filters.redo.push(filters.appointments.clone());
        self.bill_filters.redo.push(filters.bills.clone());
    }

    fn push_undo(&mut self, snapshot: Snapshot, filters: &FilterState) {
        self.undo_snapshots.push_back(snapshot);
        self.patient_filters.undo.push_back(filters.patients.clone());
        self.appointment_filters.undo.push_back(filters.appointments.clone());
        self.bill_filters.undo.push_back(filters.bills.clone());
    }

    fn pop_undo(&mut self) {
        self.undo_snapshots.pop_back();
        self.patient_filters.undo.pop_back();
        self.appointment_filters.undo.pop_back();
        self.bill_filters.undo.pop_back();
    }

    fn truncate_redo(&mut self) {
        if !self.redo_snapshots.is_empty() {
            debug!(
                discarded = self.redo_snapshots.len(),
                "forward action invalidated redo branch"
            );
        }
        self.redo_snapshots.clear();
        self.patient_filters.redo.clear();
        self.appointment_filters.redo.clear();
        self.bill_filters.redo.clear();
    }

    // ========================================================================
    // UNDO / REDO
    // ========================================================================

    /// Step back one recorded action.
    ///
    /// `current` and `current_filters` are the live (pre-undo) state; they are
    /// pushed onto the redo stacks so a following redo returns to them exactly.
    ///
    /// Fails with [`ModelError::NoPriorHistory`] when fewer than two entries
    /// exist, or when the live store already equals the target state and no
    /// filter is active (the undo would be a no-op).
    pub fn undo(
        &mut self,
        current: &AddressBook,
        current_filters: &FilterState,
    ) -> ModelResult<Restore> {
        let len = self.undo_snapshots.len();
        if len < 2 {
            return Err(ModelError::NoPriorHistory);
        }

        let target = len - 2;
        let should_skip =
            self.undo_snapshots[target].same_state(current) && current_filters.is_show_all();
        if should_skip {
            return Err(ModelError::NoPriorHistory);
        }

        self.record_redo(Snapshot::capture(current), current_filters);
        self.pop_undo();

        let restore = Restore {
            snapshot: self.undo_snapshots[target].clone(),
            filters: FilterState {
                patients: self.patient_filters.undo_at(target),
                appointments: self.appointment_filters.undo_at(target),
                bills: self.bill_filters.undo_at(target),
            },
        };

        debug!(
            undo = self.undo_snapshots.len(),
            redo = self.redo_snapshots.len(),
            "undo"
        );

        Ok(restore)
    }

    /// Re-apply the most recently undone state.
    ///
    /// The restored state becomes the new top of the undo stack, so undo after
    /// redo keeps working without the caller recording again.
    pub fn redo(&mut self) -> ModelResult<Restore> {
        let snapshot = self
            .redo_snapshots
            .pop()
            .ok_or(ModelError::NoRedoAvailable)?;

        let filters = FilterState {
            patients: self.patient_filters.redo.pop().flatten(),
            appointments: self.appointment_filters.redo.pop().flatten(),
            bills: self.bill_filters.redo.pop().flatten(),
        };

        self.push_undo(snapshot.clone(), &filters);

        debug!(
            undo = self.undo_snapshots.len(),
            redo = self.redo_snapshots.len(),
            "redo"
        );

        Ok(Restore { snapshot, filters })
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    /// Whether an undo could succeed, ignoring the no-op guard
    pub fn can_undo(&self) -> bool {
        self.undo_snapshots.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_snapshots.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_snapshots.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_snapshots.len()
    }

    /// Top of the undo stack ("the state as of right now")
    pub fn latest(&self) -> Option<&Snapshot> {
        self.undo_snapshots.back()
    }

    /// Filters recorded alongside `latest`
    pub fn latest_filters(&self) -> Option<FilterState> {
        self.undo_snapshots.back()?;
        Some(FilterState {
            patients: self.patient_filters.undo.back().cloned().flatten(),
            appointments: self.appointment_filters.undo.back().cloned().flatten(),
            bills: self.bill_filters.undo.back().cloned().flatten(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::patient;

    fn book_with(names: &[&str]) -> AddressBook {
        let mut book = AddressBook::new();
        for name in names {
            book.add_patient(patient(name));
        }
        book
    }

    #[test]
    fn test_empty_history_cannot_undo_or_redo() {
        let mut history = HistoryManager::new();
        let book = AddressBook::new();

        assert_eq!(
            history.undo(&book, &FilterState::show_all()).unwrap_err(),
            ModelError::NoPriorHistory
        );
        assert_eq!(history.redo().unwrap_err(), ModelError::NoRedoAvailable);
    }

    #[test]
    fn test_single_entry_is_only_current_state() {
        let mut history = HistoryManager::new();
        let book = AddressBook::new();
        history.record_undo(Snapshot::capture(&book), &FilterState::show_all());

        assert!(!history.can_undo());
        assert_eq!(
            history.undo(&book, &FilterState::show_all()).unwrap_err(),
            ModelError::NoPriorHistory
        );
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_undo_lands_on_second_to_last_entry() {
        let mut history = HistoryManager::new();
        let filters = FilterState::show_all();

        let empty = AddressBook::new();
        let one = book_with(&["Alice"]);
        let two = book_with(&["Alice", "Bob"]);

        history.record_undo(Snapshot::capture(&empty), &filters);
        history.record_undo(Snapshot::capture(&one), &filters);
        history.record_undo(Snapshot::capture(&two), &filters);

        let restore = history.undo(&two, &filters).unwrap();
        assert_eq!(restore.snapshot.book, one);
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.redo_len(), 1);
        assert_eq!(history.latest().map(|s| &s.book), Some(&one));

        let restore = history.undo(&one, &filters).unwrap();
        assert_eq!(restore.snapshot.book, empty);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_skips_noop_when_no_filter_active() {
        let mut history = HistoryManager::new();
        let filters = FilterState::show_all();
        let book = book_with(&["Alice"]);

        history.record_undo(Snapshot::capture(&book), &filters);
        history.record_undo(Snapshot::capture(&book), &filters);

        assert_eq!(
            history.undo(&book, &filters).unwrap_err(),
            ModelError::NoPriorHistory
        );
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_undo_restores_previous_filter_when_data_unchanged() {
        let mut history = HistoryManager::new();
        let book = book_with(&["Alice"]);
        let unfiltered = FilterState::show_all();
        let filtered = FilterState {
            patients: Some(Predicate::new("named Alice", |p: &Patient| {
                p.name.as_str() == "Alice"
            })),
            ..FilterState::default()
        };

        history.record_undo(Snapshot::capture(&book), &unfiltered);
        history.record_undo(Snapshot::capture(&book), &filtered);

        let restore = history.undo(&book, &filtered).unwrap();
        assert!(restore.filters.is_show_all());

        let restore = history.redo().unwrap();
        assert_eq!(restore.filters, filtered);
    }

    #[test]
    fn test_redo_returns_pre_undo_state_and_is_undoable_again() {
        let mut history = HistoryManager::new();
        let filters = FilterState::show_all();
        let empty = AddressBook::new();
        let one = book_with(&["Alice"]);

        history.record_undo(Snapshot::capture(&empty), &filters);
        history.record_undo(Snapshot::capture(&one), &filters);

        history.undo(&one, &filters).unwrap();
        let restore = history.redo().unwrap();
        assert_eq!(restore.snapshot.book, one);
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 2);

        let restore = history.undo(&one, &filters).unwrap();
        assert_eq!(restore.snapshot.book, empty);
    }

    #[test]
    fn test_forward_record_truncates_redo() {
        let mut history = HistoryManager::new();
        let filters = FilterState::show_all();
        let empty = AddressBook::new();
        let one = book_with(&["Alice"]);
        let other = book_with(&["Bob"]);

        history.record_undo(Snapshot::capture(&empty), &filters);
        history.record_undo(Snapshot::capture(&one), &filters);
        history.undo(&one, &filters).unwrap();
        assert!(history.can_redo());

        history.record_undo(Snapshot::capture(&other), &filters);
        assert!(!history.can_redo());
        assert_eq!(history.redo().unwrap_err(), ModelError::NoRedoAvailable);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryManager::with_capacity(2);
        let filters = FilterState::show_all();
        let books = [
            AddressBook::new(),
            book_with(&["Alice"]),
            book_with(&["Alice", "Bob"]),
        ];

        for book in &books {
            history.record_undo(Snapshot::capture(book), &filters);
        }

        assert_eq!(history.undo_len(), 2);
        let restore = history.undo(&books[2], &filters).unwrap();
        assert_eq!(restore.snapshot.book, books[1]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_capacity_eviction_keeps_filters_in_step() {
        let mut history = HistoryManager::with_capacity(3);
        let names = ["Alice", "Bob", "Carol", "Dave", "Erin"];
        let books: Vec<AddressBook> = (0..names.len()).map(|k| book_with(&names[..k])).collect();
        let filters: Vec<FilterState> = (0..names.len())
            .map(|k| FilterState {
                patients: Some(Predicate::new(format!("step {}", k), |_: &Patient| true)),
                ..FilterState::show_all()
            })
            .collect();

        for (book, f) in books.iter().zip(&filters) {
            history.record_undo(Snapshot::capture(book), f);
        }
        assert_eq!(history.undo_len(), 3);

        let restore = history.undo(&books[4], &filters[4]).unwrap();
        assert_eq!(restore.snapshot.book, books[3]);
        assert_eq!(restore.filters.patients.as_ref().map(|p| p.label()), Some("step 3"));

        let restore = history.undo(&books[3], &filters[3]).unwrap();
        assert_eq!(restore.snapshot.book, books[2]);
        assert_eq!(restore.filters.patients, filters[2].patients);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_capacity_has_floor_of_two() {
        assert_eq!(HistoryManager::with_capacity(0).capacity(), Some(2));
        assert_eq!(HistoryManager::new().capacity(), None);
    }
}
