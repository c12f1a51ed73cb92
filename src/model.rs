// Model Manager - the facade the command layer talks to
//
// Applies mutations to the address book, runs the cascades that keep the
// copied references (appointment -> patient name, bill -> appointment) in
// step, keeps the three filtered views live, and drives the history.
//
// Cascade order: children first on delete (bills, then appointments, then the
// patient); propagate first, then replace, on edit.

use crate::address_book::{AddressBook, ReadOnlyAddressBook};
use crate::entities::{Appointment, Bill, Name, Patient};
use crate::error::ModelResult;
use crate::filter::{FilterState, FilteredList, Predicate, SubscriptionId};
use crate::history::{HistoryManager, Restore, Snapshot};
use crate::prefs::{GuiSettings, UserPrefs};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct ModelManager {
    address_book: AddressBook,
    user_prefs: UserPrefs,
    filtered_patients: FilteredList<Patient>,
    filtered_appointments: FilteredList<Appointment>,
    filtered_bills: FilteredList<Bill>,
    history: HistoryManager,
}

impl ModelManager {
    /// Build a model over a copy of `address_book`, with an unbounded history.
    pub fn new(address_book: &dyn ReadOnlyAddressBook, user_prefs: &UserPrefs) -> Self {
        Self::with_history(address_book, user_prefs, HistoryManager::new())
    }

    /// Build a model around an existing history. The initial state is recorded
    /// immediately so the first undoable action has something to return to.
    pub fn with_history(
        address_book: &dyn ReadOnlyAddressBook,
        user_prefs: &UserPrefs,
        history: HistoryManager,
    ) -> Self {
        let address_book = AddressBook::from_read_only(address_book);

        info!(
            patients = address_book.patients().len(),
            appointments = address_book.appointments().len(),
            bills = address_book.bills().len(),
            "initializing model"
        );

        let mut model = ModelManager {
            filtered_patients: FilteredList::new(address_book.patients()),
            filtered_appointments: FilteredList::new(address_book.appointments()),
            filtered_bills: FilteredList::new(address_book.bills()),
            address_book,
            user_prefs: user_prefs.clone(),
            history,
        };
        model.commit();
        model
    }

    // ========================================================================
    // USER PREFS
    // ========================================================================

    pub fn user_prefs(&self) -> &UserPrefs {
        &self.user_prefs
    }

    pub fn set_user_prefs(&mut self, user_prefs: &UserPrefs) {
        self.user_prefs.reset_data(user_prefs);
    }

    pub fn gui_settings(&self) -> GuiSettings {
        self.user_prefs.gui_settings()
    }

    pub fn set_gui_settings(&mut self, gui_settings: GuiSettings) {
        self.user_prefs.set_gui_settings(gui_settings);
    }

    pub fn address_book_file_path(&self) -> &Path {
        self.user_prefs.address_book_file_path()
    }

    pub fn set_address_book_file_path(&mut self, path: PathBuf) {
        self.user_prefs.set_address_book_file_path(path);
    }

    // ========================================================================
    // ADDRESS BOOK
    // ========================================================================

    /// Replace the whole store, e.g. with data read back from storage
    pub fn set_address_book(&mut self, address_book: &dyn ReadOnlyAddressBook) {
        self.address_book.reset_data(address_book);
        self.refresh_views();
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.address_book
    }

    // ========================================================================
    // PATIENTS
    // ========================================================================

    pub fn has_patient(&self, patient: &Patient) -> bool {
        self.address_book.has_patient(patient)
    }

    pub fn has_patient_named(&self, name: &Name) -> bool {
        self.address_book.has_patient_named(name)
    }

    /// Adds the patient and clears the patient filter so it is visible.
    ///
    /// # Panics
    /// If a patient with the same name exists.
    pub fn add_patient(&mut self, patient: Patient) {
        self.address_book.add_patient(patient);
        self.update_filtered_patient_list(None);
    }

    /// Deletes the patient's appointments (and their bills) first, then the
    /// patient.
    ///
    /// # Panics
    /// If `target` is absent.
    pub fn delete_patient(&mut self, target: &Patient) {
        let related: Vec<Appointment> = self
            .address_book
            .appointments()
            .iter()
            .filter(|a| a.name == target.name)
            .cloned()
            .collect();

        debug!(
            patient = %target.name,
            appointments = related.len(),
            "cascading patient delete"
        );

        for appointment in &related {
            self.delete_appointment(appointment);
        }

        self.address_book.remove_patient(target);
        self.refresh_views();
    }

    /// Rewrites every appointment booked under `target`'s name (and, through
    /// `set_appointment`, their bills) before replacing the patient.
    ///
    /// # Panics
    /// If `target` is absent.
    pub fn set_patient(&mut self, target: &Patient, edited: Patient) {
        let related: Vec<Appointment> = self
            .address_book
            .appointments()
            .iter()
            .filter(|a| a.name == target.name)
            .cloned()
            .collect();

        if target.name != edited.name {
            debug!(
                from = %target.name,
                to = %edited.name,
                appointments = related.len(),
                "propagating patient rename"
            );
        }

        for appointment in &related {
            let renamed = appointment.with_name(edited.name.clone());
            self.set_appointment(appointment, renamed);
        }

        self.address_book.set_patient(target, edited);
        self.refresh_views();
    }

    pub fn sort_patients<F>(&mut self, compare: F, ascending: bool)
    where
        F: Fn(&Patient, &Patient) -> Ordering,
    {
        self.address_book.sort_patients(compare, ascending);
        self.refresh_views();
    }

    // ========================================================================
    // APPOINTMENTS
    // ========================================================================

    pub fn has_appointment(&self, appointment: &Appointment) -> bool {
        self.address_book.has_appointment(appointment)
    }

    /// Adds the appointment and clears the appointment filter.
    pub fn add_appointment(&mut self, appointment: Appointment) {
        self.address_book.add_appointment(appointment);
        self.update_filtered_appointment_list(None);
    }

    /// Deletes every bill raised against `target`, then the appointment.
    ///
    /// # Panics
    /// If `target` is absent.
    pub fn delete_appointment(&mut self, target: &Appointment) {
        let related: Vec<Bill> = self
            .address_book
            .bills()
            .iter()
            .filter(|b| b.appointment == *target)
            .cloned()
            .collect();

        debug!(bills = related.len(), "cascading appointment delete");

        for bill in &related {
            self.delete_bill(bill);
        }

        self.address_book.remove_appointment(target);
        self.refresh_views();
    }

    /// Re-points every bill raised against `target` at `edited` (amount, date
    /// and status unchanged), then replaces the appointment.
    ///
    /// # Panics
    /// If `target` is absent.
    pub fn set_appointment(&mut self, target: &Appointment, edited: Appointment) {
        let related: Vec<Bill> = self
            .address_book
            .bills()
            .iter()
            .filter(|b| b.appointment.is_same_appointment(target))
            .cloned()
            .collect();

        for bill in &related {
            self.set_bill(bill, bill.with_appointment(edited.clone()));
        }

        self.address_book.set_appointment(target, edited);
        self.refresh_views();
    }

    pub fn sort_appointments<F>(&mut self, compare: F, ascending: bool)
    where
        F: Fn(&Appointment, &Appointment) -> Ordering,
    {
        self.address_book.sort_appointments(compare, ascending);
        self.refresh_views();
    }

    // ========================================================================
    // BILLS
    // ========================================================================

    /// Structural scan; always performed
    pub fn has_bill(&self, bill: &Bill) -> bool {
        self.address_book.has_bill(bill)
    }

    pub fn add_bill(&mut self, bill: Bill) {
        self.address_book.add_bill(bill);
        self.refresh_views();
    }

    /// # Panics
    /// If `target` is absent.
    pub fn delete_bill(&mut self, target: &Bill) {
        self.address_book.remove_bill(target);
        self.refresh_views();
    }

    /// # Panics
    /// If `target` is absent.
    pub fn set_bill(&mut self, target: &Bill, edited: Bill) {
        self.address_book.set_bill(target, edited);
        self.refresh_views();
    }

    /// # Panics
    /// If `bill` is absent.
    pub fn set_bill_as_paid(&mut self, bill: &Bill) {
        self.address_book.set_bill_as_paid(bill);
        self.refresh_views();
    }

    /// # Panics
    /// If `bill` is absent.
    pub fn set_bill_as_unpaid(&mut self, bill: &Bill) {
        self.address_book.set_bill_as_unpaid(bill);
        self.refresh_views();
    }

    pub fn sort_bills<F>(&mut self, compare: F, ascending: bool)
    where
        F: Fn(&Bill, &Bill) -> Ordering,
    {
        self.address_book.sort_bills(compare, ascending);
        self.refresh_views();
    }

    // ========================================================================
    // SELECTION (view projections, not mutations)
    // ========================================================================

    /// Narrow appointments and bills to those of `patient`
    pub fn select_patient(&mut self, patient: &Patient) {
        let for_appointments = patient.name.clone();
        let for_bills = patient.name.clone();

        self.update_filtered_appointment_list(Some(Predicate::new(
            format!("appointments of {}", patient.name),
            move |a: &Appointment| a.name == for_appointments,
        )));
        self.update_filtered_bill_list(Some(Predicate::new(
            format!("bills of {}", patient.name),
            move |b: &Bill| b.appointment.name == for_bills,
        )));
    }

    /// Narrow bills to those raised against `appointment`
    pub fn select_appointment(&mut self, appointment: &Appointment) {
        let target = appointment.clone();
        self.update_filtered_bill_list(Some(Predicate::new(
            format!("bills of {} on {}", appointment.name, appointment.slot),
            move |b: &Bill| b.appointment == target,
        )));
    }

    // ========================================================================
    // FILTERED VIEWS
    // ========================================================================

    pub fn filtered_patient_list(&self) -> &FilteredList<Patient> {
        &self.filtered_patients
    }

    pub fn filtered_appointment_list(&self) -> &FilteredList<Appointment> {
        &self.filtered_appointments
    }

    pub fn filtered_bill_list(&self) -> &FilteredList<Bill> {
        &self.filtered_bills
    }

    /// `None` shows every patient
    pub fn update_filtered_patient_list(&mut self, predicate: Option<Predicate<Patient>>) {
        self.filtered_patients
            .set_predicate(predicate, self.address_book.patients());
    }

    pub fn update_filtered_appointment_list(&mut self, predicate: Option<Predicate<Appointment>>) {
        self.filtered_appointments
            .set_predicate(predicate, self.address_book.appointments());
    }

    pub fn update_filtered_bill_list(&mut self, predicate: Option<Predicate<Bill>>) {
        self.filtered_bills
            .set_predicate(predicate, self.address_book.bills());
    }

    /// Drop all three filters
    pub fn show_all(&mut self) {
        self.update_filtered_patient_list(None);
        self.update_filtered_appointment_list(None);
        self.update_filtered_bill_list(None);
    }

    pub fn subscribe_patients<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&[Patient]) + 'static,
    {
        self.filtered_patients.subscribe(observer)
    }

    pub fn subscribe_appointments<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&[Appointment]) + 'static,
    {
        self.filtered_appointments.subscribe(observer)
    }

    pub fn subscribe_bills<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&[Bill]) + 'static,
    {
        self.filtered_bills.subscribe(observer)
    }

    /// Current predicate of each view
    pub fn filter_state(&self) -> FilterState {
        FilterState {
            patients: self.filtered_patients.predicate().cloned(),
            appointments: self.filtered_appointments.predicate().cloned(),
            bills: self.filtered_bills.predicate().cloned(),
        }
    }

    fn refresh_views(&mut self) {
        self.filtered_patients.refresh(self.address_book.patients());
        self.filtered_appointments
            .refresh(self.address_book.appointments());
        self.filtered_bills.refresh(self.address_book.bills());
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    /// Record the current store and filters as "the state as of now".
    ///
    /// Call once after every action that should be undoable.
    pub fn commit(&mut self) {
        let filters = self.filter_state();
        self.history
            .record_undo(Snapshot::capture(&self.address_book), &filters);
    }

    /// Record the current store and filters on the redo side
    pub fn commit_redo(&mut self) {
        let filters = self.filter_state();
        self.history
            .record_redo(Snapshot::capture(&self.address_book), &filters);
    }

    pub fn undo(&mut self) -> ModelResult<()> {
        let filters = self.filter_state();
        let restore = self.history.undo(&self.address_book, &filters)?;
        info!(snapshot = %restore.snapshot.snapshot_id, "undo");
        self.install(restore);
        Ok(())
    }

    pub fn redo(&mut self) -> ModelResult<()> {
        let restore = self.history.redo()?;
        info!(snapshot = %restore.snapshot.snapshot_id, "redo");
        self.install(restore);
        Ok(())
    }

    /// Whether the store or any filter differs from the last recorded state.
    /// Committing an unchanged state would shadow the previous action, since
    /// undo refuses to land on a state equal to the live one.
    pub fn has_uncommitted_changes(&self) -> bool {
        match (self.history.latest(), self.history.latest_filters()) {
            (Some(snapshot), Some(filters)) => {
                !snapshot.same_state(&self.address_book) || filters != self.filter_state()
            }
            _ => true,
        }
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    // Replace store contents and every view predicate wholesale
    fn install(&mut self, restore: Restore) {
        self.address_book.reset_data(&restore.snapshot.book);
        self.filtered_patients
            .set_predicate(restore.filters.patients, self.address_book.patients());
        self.filtered_appointments.set_predicate(
            restore.filters.appointments,
            self.address_book.appointments(),
        );
        self.filtered_bills
            .set_predicate(restore.filters.bills, self.address_book.bills());
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new(&AddressBook::new(), &UserPrefs::default())
    }
}

impl PartialEq for ModelManager {
    fn eq(&self, other: &Self) -> bool {
        self.address_book == other.address_book
            && self.user_prefs == other.user_prefs
            && self.filtered_patients.items() == other.filtered_patients.items()
    }
}

impl fmt::Debug for ModelManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelManager")
            .field("address_book", &self.address_book)
            .field("user_prefs", &self.user_prefs)
            .field("filters", &self.filter_state())
            .field("undo", &self.history.undo_len())
            .field("redo", &self.history.redo_len())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
