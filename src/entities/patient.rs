// Patient Entity - identified by name
//
// The name is the identity key: appointments refer to a patient by copying
// the name, never by holding a link. Renames are propagated by the model.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// VALUE OBJECTS
// ============================================================================

/// Patient name. Case-sensitive, compared by exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    /// Alphanumeric words separated by single spaces
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid("name", "must not be blank"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ')
        {
            return Err(ModelError::invalid(
                "name",
                "should only contain alphanumeric characters and spaces",
            ));
        }
        let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        Ok(Name(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Contact phone number (digits only, at least 3)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() < 3 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(ModelError::invalid(
                "phone",
                "should only contain digits, and be at least 3 digits long",
            ));
        }
        Ok(Phone(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Contact email (local-part@domain)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim();
        let valid = match trimmed.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !trimmed.contains(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(ModelError::invalid(
                "email",
                "should be of the format local-part@domain",
            ));
        }
        Ok(Email(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Postal address (free text, not blank)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::invalid("address", "must not be blank"));
        }
        Ok(Address(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

string_value_impls!(Name, Phone, Email, Address);

// ============================================================================
// PATIENT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub name: Name,
    pub phone: Phone,
    pub email: Email,
    pub address: Address,
}

impl Patient {
    pub fn new(name: Name, phone: Phone, email: Email, address: Address) -> Self {
        Patient {
            name,
            phone,
            email,
            address,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Two patients are the same patient when their names match exactly.
    /// Weaker than `==`, which also compares contact details.
    pub fn is_same_patient(&self, other: &Patient) -> bool {
        self.name == other.name
    }

    /// Comparator for `sort_patients`
    pub fn compare_by_name(a: &Patient, b: &Patient) -> Ordering {
        a.name.cmp(&b.name)
    }
}

impl fmt::Display for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; Phone: {}; Email: {}; Address: {}",
            self.name, self.phone, self.email, self.address
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(name: &str, phone: &str) -> Patient {
        Patient::new(
            Name::parse(name).unwrap(),
            Phone::parse(phone).unwrap(),
            Email::parse("someone@example.com").unwrap(),
            Address::parse("1 Clinic Road").unwrap(),
        )
    }

    #[test]
    fn test_name_validation() {
        assert!(Name::parse("Alice Tan").is_ok());
        assert!(Name::parse("   ").is_err());
        assert!(Name::parse("Alice*").is_err());
        assert_eq!(Name::parse("  Alice   Tan ").unwrap().as_str(), "Alice Tan");
    }

    #[test]
    fn test_name_is_case_sensitive() {
        assert_ne!(Name::parse("alice").unwrap(), Name::parse("Alice").unwrap());
    }

    #[test]
    fn test_phone_and_email_validation() {
        assert!(Phone::parse("91234567").is_ok());
        assert!(Phone::parse("12").is_err());
        assert!(Phone::parse("12a45").is_err());

        assert!(Email::parse("alice@example.com").is_ok());
        assert!(Email::parse("alice.example.com").is_err());
        assert!(Email::parse("alice@").is_err());
        assert!(Email::parse("al ice@example.com").is_err());
    }

    #[test]
    fn test_same_patient_uses_name_only() {
        let a = patient("Alice", "91234567");
        let b = patient("Alice", "98765432");

        assert!(a.is_same_patient(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_rejects_invalid_name() {
        let json = r#"{"name":"Al*ce","phone":"123","email":"a@b.c","address":"x"}"#;
        assert!(serde_json::from_str::<Patient>(json).is_err());
    }
}
