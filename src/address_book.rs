// Address Book - the entity store
//
// Owns the patient, appointment and bill collections of one state.
// No cascade logic lives here; `ModelManager` orchestrates cascades one level up.
//
// Removal and replacement assume the target is present. Callers check with
// the `has_*` queries first; a miss is a programmer error and panics.

use crate::entities::{Appointment, Bill, Name, Patient, PaymentStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ============================================================================
// READ-ONLY VIEW
// ============================================================================

/// Read-only view of a full address book state.
///
/// This is the blob handed to persistence and accepted back from it.
pub trait ReadOnlyAddressBook {
    fn patients(&self) -> &[Patient];
    fn appointments(&self) -> &[Appointment];
    fn bills(&self) -> &[Bill];
}

// ============================================================================
// ADDRESS BOOK
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBook {
    patients: Vec<Patient>,
    appointments: Vec<Appointment>,
    bills: Vec<Bill>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copy of any read-only address book
    pub fn from_read_only(source: &dyn ReadOnlyAddressBook) -> Self {
        AddressBook {
            patients: source.patients().to_vec(),
            appointments: source.appointments().to_vec(),
            bills: source.bills().to_vec(),
        }
    }

    /// Replace all three collections with the contents of `source`
    pub fn reset_data(&mut self, source: &dyn ReadOnlyAddressBook) {
        self.patients = source.patients().to_vec();
        self.appointments = source.appointments().to_vec();
        self.bills = source.bills().to_vec();
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.appointments.is_empty() && self.bills.is_empty()
    }

    // ========================================================================
    // PATIENTS
    // ========================================================================

    pub fn has_patient(&self, patient: &Patient) -> bool {
        self.patients.iter().any(|p| p.is_same_patient(patient))
    }

    pub fn has_patient_named(&self, name: &Name) -> bool {
        self.patients.iter().any(|p| &p.name == name)
    }

    /// # Panics
    /// If a patient with the same name already exists.
    pub fn add_patient(&mut self, patient: Patient) {
        assert!(
            !self.has_patient(&patient),
            "duplicate patient: {}",
            patient.name
        );
        self.patients.push(patient);
    }

    /// # Panics
    /// If `target` is absent, or `edited` renames onto another existing patient.
    pub fn set_patient(&mut self, target: &Patient, edited: Patient) {
        let index = position(&self.patients, target, "patient");
        assert!(
            target.is_same_patient(&edited) || !self.has_patient(&edited),
            "duplicate patient: {}",
            edited.name
        );
        self.patients[index] = edited;
    }

    /// # Panics
    /// If `target` is absent.
    pub fn remove_patient(&mut self, target: &Patient) {
        let index = position(&self.patients, target, "patient");
        self.patients.remove(index);
    }

    pub fn sort_patients<F>(&mut self, compare: F, ascending: bool)
    where
        F: Fn(&Patient, &Patient) -> Ordering,
    {
        sort_with_direction(&mut self.patients, compare, ascending);
    }

    // ========================================================================
    // APPOINTMENTS
    // ========================================================================

    pub fn has_appointment(&self, appointment: &Appointment) -> bool {
        self.appointments
            .iter()
            .any(|a| a.is_same_appointment(appointment))
    }

    pub fn add_appointment(&mut self, appointment: Appointment) {
        self.appointments.push(appointment);
    }

    /// # Panics
    /// If `target` is absent.
    pub fn set_appointment(&mut self, target: &Appointment, edited: Appointment) {
        let index = position(&self.appointments, target, "appointment");
        self.appointments[index] = edited;
    }

    /// # Panics
    /// If `target` is absent.
    pub fn remove_appointment(&mut self, target: &Appointment) {
        let index = position(&self.appointments, target, "appointment");
        self.appointments.remove(index);
    }

    pub fn sort_appointments<F>(&mut self, compare: F, ascending: bool)
    where
        F: Fn(&Appointment, &Appointment) -> Ordering,
    {
        sort_with_direction(&mut self.appointments, compare, ascending);
    }

    // ========================================================================
    // BILLS
    // ========================================================================

    /// Always scans, even though bills are assumed never to be duplicated.
    pub fn has_bill(&self, bill: &Bill) -> bool {
        self.bills.iter().any(|b| b.is_same_bill(bill))
    }

    pub fn add_bill(&mut self, bill: Bill) {
        self.bills.push(bill);
    }

    /// # Panics
    /// If `target` is absent.
    pub fn set_bill(&mut self, target: &Bill, edited: Bill) {
        let index = position(&self.bills, target, "bill");
        self.bills[index] = edited;
    }

    /// # Panics
    /// If `target` is absent.
    pub fn remove_bill(&mut self, target: &Bill) {
        let index = position(&self.bills, target, "bill");
        self.bills.remove(index);
    }

    pub fn sort_bills<F>(&mut self, compare: F, ascending: bool)
    where
        F: Fn(&Bill, &Bill) -> Ordering,
    {
        sort_with_direction(&mut self.bills, compare, ascending);
    }

    /// # Panics
    /// If `bill` is absent.
    pub fn set_bill_as_paid(&mut self, bill: &Bill) {
        self.set_payment_status(bill, PaymentStatus::Paid);
    }

    /// # Panics
    /// If `bill` is absent.
    pub fn set_bill_as_unpaid(&mut self, bill: &Bill) {
        self.set_payment_status(bill, PaymentStatus::Unpaid);
    }

    fn set_payment_status(&mut self, bill: &Bill, status: PaymentStatus) {
        let index = position(&self.bills, bill, "bill");
        self.bills[index].payment_status = status;
    }
}

impl ReadOnlyAddressBook for AddressBook {
    fn patients(&self) -> &[Patient] {
        &self.patients
    }

    fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    fn bills(&self) -> &[Bill] {
        &self.bills
    }
}

fn position<T: PartialEq>(items: &[T], target: &T, kind: &str) -> usize {
    match items.iter().position(|item| item == target) {
        Some(index) => index,
        None => panic!("{} must exist in the address book", kind),
    }
}

// Stable; descending keeps equal elements in their original order too
fn sort_with_direction<T, F>(items: &mut [T], compare: F, ascending: bool)
where
    F: Fn(&T, &T) -> Ordering,
{
    if ascending {
        items.sort_by(|a, b| compare(a, b));
    } else {
        items.sort_by(|a, b| compare(b, a));
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{appointment, bill, patient};

    #[test]
    fn test_add_and_query() {
        let mut book = AddressBook::new();
        let alice = patient("Alice");
        let appt = appointment("Alice", "2024-01-01 10:00");
        let b = bill(&appt, "50");

        book.add_patient(alice.clone());
        book.add_appointment(appt.clone());
        book.add_bill(b.clone());

        assert!(book.has_patient(&alice));
        assert!(book.has_patient_named(&alice.name));
        assert!(book.has_appointment(&appt));
        assert!(book.has_bill(&b));
        assert!(!book.has_bill(&bill(&appt, "60")));
    }

    #[test]
    #[should_panic(expected = "duplicate patient")]
    fn test_add_duplicate_patient_panics() {
        let mut book = AddressBook::new();
        book.add_patient(patient("Alice"));
        book.add_patient(patient("Alice"));
    }

    #[test]
    #[should_panic(expected = "must exist")]
    fn test_remove_missing_bill_panics() {
        let mut book = AddressBook::new();
        let appt = appointment("Alice", "2024-01-01 10:00");
        book.remove_bill(&bill(&appt, "50"));
    }

    #[test]
    fn test_set_patient_replaces_in_place() {
        let mut book = AddressBook::new();
        book.add_patient(patient("Alice"));
        book.add_patient(patient("Bob"));

        let alice = patient("Alice");
        book.set_patient(&alice, patient("Alicia"));

        let names: Vec<&str> = book.patients().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alicia", "Bob"]);
    }

    #[test]
    fn test_sort_direction() {
        let mut book = AddressBook::new();
        book.add_patient(patient("Bob"));
        book.add_patient(patient("Carol"));
        book.add_patient(patient("Alice"));

        book.sort_patients(Patient::compare_by_name, true);
        let names: Vec<&str> = book.patients().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);

        book.sort_patients(Patient::compare_by_name, false);
        let names: Vec<&str> = book.patients().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Carol", "Bob", "Alice"]);
    }

    #[test]
    fn test_set_bill_paid_and_unpaid() {
        let mut book = AddressBook::new();
        let appt = appointment("Alice", "2024-01-01 10:00");
        let b = bill(&appt, "50");
        book.add_bill(b.clone());

        book.set_bill_as_paid(&b);
        assert_eq!(book.bills()[0].payment_status, PaymentStatus::Paid);

        let paid = book.bills()[0].clone();
        book.set_bill_as_unpaid(&paid);
        assert_eq!(book.bills()[0], b);
    }

    #[test]
    fn test_reset_data_copies_everything() {
        let mut source = AddressBook::new();
        source.add_patient(patient("Alice"));
        let appt = appointment("Alice", "2024-01-01 10:00");
        source.add_appointment(appt.clone());
        source.add_bill(bill(&appt, "50"));

        let mut target = AddressBook::new();
        target.add_patient(patient("Bob"));
        target.reset_data(&source);

        assert_eq!(target, source);
        assert_eq!(AddressBook::from_read_only(&source), source);
    }
}
