//! Property-based tests for model history and cascades

use clinic_manager::{
    Address, AddressBook, Amount, Appointment, Bill, BillDate, Doctor, Email, MedicalTest,
    ModelManager, Name, Patient, PaymentStatus, Phone, Predicate, ReadOnlyAddressBook, Slot,
    UserPrefs,
};
use proptest::prelude::*;

fn patient(name: &str) -> Patient {
    Patient::new(
        Name::parse(name).unwrap(),
        Phone::parse("91234567").unwrap(),
        Email::parse("patient@example.com").unwrap(),
        Address::parse("1 Clinic Road").unwrap(),
    )
}

fn appointment(name: &str, day: usize) -> Appointment {
    Appointment::new(
        Name::parse(name).unwrap(),
        MedicalTest::parse("Blood Test").unwrap(),
        Slot::parse(&format!("2024-02-{:02} 09:00", day + 1)).unwrap(),
        Doctor::parse("Dr Tan").unwrap(),
    )
}

fn bill(appointment: &Appointment, cents: u64) -> Bill {
    Bill::new(
        appointment.clone(),
        Amount::from_cents(cents),
        BillDate::parse("2024-03-01").unwrap(),
        PaymentStatus::Unpaid,
    )
}

/// `shape[i]` is the bill count of each appointment of patient `i`
fn build_book(shape: &[Vec<usize>]) -> AddressBook {
    let mut book = AddressBook::new();
    for (i, appointments) in shape.iter().enumerate() {
        let name = format!("Patient {}", i);
        book.add_patient(patient(&name));
        for (day, bills) in appointments.iter().enumerate() {
            let appt = appointment(&name, day);
            book.add_appointment(appt.clone());
            for b in 0..*bills {
                book.add_bill(bill(&appt, 1000 + b as u64));
            }
        }
    }
    book
}

fn shape_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..3, 0..4), 1..5)
}

#[derive(Debug, Clone)]
enum Action {
    DeletePatient(usize),
    MarkFirstBillPaid,
    AddPatient,
    RenamePatient(usize),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0usize..8).prop_map(Action::DeletePatient),
        Just(Action::MarkFirstBillPaid),
        Just(Action::AddPatient),
        (0usize..8).prop_map(Action::RenamePatient),
    ]
}

/// Apply `action`; returns false when it would not change the store
fn apply(model: &mut ModelManager, action: &Action) -> bool {
    let patients = model.address_book().patients().to_vec();
    match action {
        Action::DeletePatient(i) => {
            if patients.is_empty() {
                return false;
            }
            let target = &patients[i % patients.len()];
            model.delete_patient(target);
        }
        Action::MarkFirstBillPaid => {
            let Some(first) = model.address_book().bills().first().cloned() else {
                return false;
            };
            if first.payment_status.is_paid() {
                return false;
            }
            model.set_bill_as_paid(&first);
        }
        Action::AddPatient => {
            let newcomer = patient("Newcomer");
            if model.has_patient_named(&newcomer.name) {
                return false;
            }
            model.add_patient(newcomer);
        }
        Action::RenamePatient(i) => {
            let renamed = Name::parse("Renamed Patient").unwrap();
            if patients.is_empty() || model.has_patient_named(&renamed) {
                return false;
            }
            let target = patients[i % patients.len()].clone();
            let mut edited = target.clone();
            edited.name = renamed;
            model.set_patient(&target, edited);
        }
    }
    true
}

/// Property: undo right after a committed action restores the prior store
#[test]
fn prop_undo_restores_previous_store() {
    proptest!(|(shape in shape_strategy(), action in action_strategy())| {
        let book = build_book(&shape);
        let mut model = ModelManager::new(&book, &UserPrefs::default());
        let before = model.address_book().clone();

        prop_assume!(apply(&mut model, &action));
        model.commit();

        prop_assert!(model.undo().is_ok());
        prop_assert_eq!(model.address_book(), &before);
    });
}

/// Property: after any sequence of committed actions, undo followed by redo
/// returns to the same store and the same three filters
#[test]
fn prop_undo_then_redo_round_trips() {
    proptest!(|(
        shape in shape_strategy(),
        selected in 0usize..8,
        actions in prop::collection::vec(action_strategy(), 1..5)
    )| {
        let book = build_book(&shape);
        let mut model = ModelManager::new(&book, &UserPrefs::default());

        let target = model.address_book().patients()[selected % shape.len()].clone();
        let hidden = target.name.clone();
        model.update_filtered_patient_list(Some(Predicate::new(
            "everyone but the selected patient",
            move |p: &Patient| p.name != hidden,
        )));
        model.select_patient(&target);
        model.commit();

        let mut applied = 0;
        for action in &actions {
            if apply(&mut model, action) {
                model.commit();
                applied += 1;
            }
        }
        prop_assume!(applied > 0);

        let store = model.address_book().clone();
        let filters = model.filter_state();

        prop_assert!(model.undo().is_ok());
        prop_assert!(model.redo().is_ok());

        prop_assert_eq!(model.address_book(), &store);
        prop_assert_eq!(model.filter_state(), filters);
    });
}

/// Property: deleting a patient removes exactly its appointments and bills
#[test]
fn prop_delete_patient_cascades_exactly() {
    proptest!(|(shape in shape_strategy(), victim in 0usize..8)| {
        let book = build_book(&shape);
        let mut model = ModelManager::new(&book, &UserPrefs::default());

        let index = victim % shape.len();
        let target = model.address_book().patients()[index].clone();
        let own_appointments = shape[index].len();
        let own_bills: usize = shape[index].iter().sum();

        model.delete_patient(&target);

        let after = model.address_book();
        prop_assert!(!after.has_patient_named(&target.name));
        prop_assert_eq!(after.appointments().len(), book.appointments().len() - own_appointments);
        prop_assert_eq!(after.bills().len(), book.bills().len() - own_bills);
        prop_assert!(after.appointments().iter().all(|a| a.name != target.name));
        prop_assert!(after.bills().iter().all(|b| b.appointment.name != target.name));
    });
}

/// Property: a rename leaves no appointment or bill pointing at the old name
#[test]
fn prop_rename_propagates() {
    proptest!(|(shape in shape_strategy(), index in 0usize..8)| {
        let book = build_book(&shape);
        let mut model = ModelManager::new(&book, &UserPrefs::default());

        prop_assume!(apply(&mut model, &Action::RenamePatient(index)));
        let old = Name::parse(&format!("Patient {}", index % shape.len())).unwrap();
        let new = Name::parse("Renamed Patient").unwrap();

        let after = model.address_book();
        prop_assert!(after.appointments().iter().all(|a| a.name != old));
        prop_assert!(after.bills().iter().all(|b| b.appointment.name != old));
        prop_assert_eq!(
            after.appointments().iter().filter(|a| a.name == new).count(),
            shape[index % shape.len()].len()
        );
    });
}

#[test]
fn test_alice_walkthrough() {
    let mut book = AddressBook::new();
    book.add_patient(patient("Alice"));
    let appt = appointment("Alice", 0);
    book.add_appointment(appt.clone());
    book.add_bill(bill(&appt, 5000));

    let mut model = ModelManager::new(&book, &UserPrefs::default());

    let alice = model.address_book().patients()[0].clone();
    model.delete_patient(&alice);
    model.commit();
    assert!(model.address_book().is_empty());

    model.undo().unwrap();
    assert_eq!(model.address_book(), &book);

    model.redo().unwrap();
    assert!(model.address_book().is_empty());

    model.undo().unwrap();
    assert_eq!(
        model.undo().unwrap_err().to_string(),
        "Undo cannot be done as there was no previous action"
    );
    assert!(model.redo().is_ok());
    assert!(model.address_book().is_empty());
}
