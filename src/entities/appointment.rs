// Appointment Entity - a booked medical test for a patient
//
// The patient is referenced by a copied Name (weak reference). The model is
// responsible for rewriting that copy when the patient is renamed.

use super::patient::Name;
use crate::error::{ModelError, ModelResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Accepted and rendered slot format
pub const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

// ============================================================================
// VALUE OBJECTS
// ============================================================================

/// Name of the medical test performed at the appointment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MedicalTest(String);

impl MedicalTest {
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid("medical test", "must not be blank"));
        }
        Ok(MedicalTest(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Attending doctor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Doctor(String);

impl Doctor {
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid("doctor", "must not be blank"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '.')
        {
            return Err(ModelError::invalid(
                "doctor",
                "should only contain alphanumeric characters, spaces and dots",
            ));
        }
        Ok(Doctor(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_value_impls!(MedicalTest, Doctor);

/// Date and start time of the appointment (minute precision)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slot(NaiveDateTime);

impl Slot {
    /// Parse `YYYY-MM-DD HH:MM`
    pub fn parse(raw: &str) -> ModelResult<Self> {
        NaiveDateTime::parse_from_str(raw.trim(), SLOT_FORMAT)
            .map(Slot)
            .map_err(|e| ModelError::invalid("slot", format!("expected YYYY-MM-DD HH:MM ({})", e)))
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Slot {
    fn from(value: NaiveDateTime) -> Self {
        Slot(value)
    }
}

impl FromStr for Slot {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::parse(s)
    }
}

impl TryFrom<String> for Slot {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Slot::parse(&value)
    }
}

impl From<Slot> for String {
    fn from(value: Slot) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(SLOT_FORMAT))
    }
}

// ============================================================================
// APPOINTMENT ENTITY
// ============================================================================

/// Identity is structural: two appointments with equal fields are the same
/// appointment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appointment {
    pub name: Name,
    pub medical_test: MedicalTest,
    pub slot: Slot,
    pub doctor: Doctor,
}

impl Appointment {
    pub fn new(name: Name, medical_test: MedicalTest, slot: Slot, doctor: Doctor) -> Self {
        Appointment {
            name,
            medical_test,
            slot,
            doctor,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn is_same_appointment(&self, other: &Appointment) -> bool {
        self == other
    }

    /// Same appointment, booked under another patient name
    pub fn with_name(&self, name: Name) -> Appointment {
        Appointment {
            name,
            ..self.clone()
        }
    }

    /// Comparator for `sort_appointments`
    pub fn compare_by_slot(a: &Appointment, b: &Appointment) -> Ordering {
        a.slot.cmp(&b.slot)
    }

    pub fn compare_by_name(a: &Appointment, b: &Appointment) -> Ordering {
        a.name.cmp(&b.name)
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; Test: {}; Slot: {}; Doctor: {}",
            self.name, self.medical_test, self.slot, self.doctor
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
