// Bill Entity - charge raised against an appointment
//
// The appointment is copied by value (weak reference). Bill identity is
// structural: bills are assumed never to be duplicated, but nothing enforces it.

use super::appointment::Appointment;
use crate::error::{ModelError, ModelResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const BILL_DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// PAYMENT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Unpaid => "unpaid",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl FromStr for PaymentStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paid" => Ok(PaymentStatus::Paid),
            "unpaid" => Ok(PaymentStatus::Unpaid),
            other => Err(ModelError::invalid(
                "payment status",
                format!("expected paid or unpaid, got {:?}", other),
            )),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALUE OBJECTS
// ============================================================================

/// Money amount, held as whole cents to keep equality exact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

/// Largest storable amount, in cents (the range of a SQLite INTEGER)
pub const MAX_AMOUNT_CENTS: u64 = i64::MAX as u64;

impl Amount {
    pub fn from_cents(cents: u64) -> Self {
        Amount(cents)
    }

    /// Parse a non-negative decimal with at most two fractional digits
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let trimmed = raw.trim().trim_start_matches('$');
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };

        if whole.is_empty()
            || !whole.chars().all(|c| c.is_ascii_digit())
            || fraction.len() > 2
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ModelError::invalid(
                "amount",
                "should be a non-negative number with at most 2 decimal places",
            ));
        }

        let whole: u64 = whole
            .parse()
            .map_err(|_| ModelError::invalid("amount", "is too large"))?;
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().unwrap_or(0) * 10,
            _ => fraction.parse::<u64>().unwrap_or(0),
        };

        whole
            .checked_mul(100)
            .and_then(|w| w.checked_add(cents))
            .filter(|total| *total <= MAX_AMOUNT_CENTS)
            .map(Amount)
            .ok_or_else(|| ModelError::invalid("amount", "is too large"))
    }

    pub fn cents(&self) -> u64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Date the bill was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillDate(NaiveDate);

impl BillDate {
    pub fn parse(raw: &str) -> ModelResult<Self> {
        NaiveDate::parse_from_str(raw.trim(), BILL_DATE_FORMAT)
            .map(BillDate)
            .map_err(|e| ModelError::invalid("bill date", format!("expected YYYY-MM-DD ({})", e)))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for BillDate {
    fn from(value: NaiveDate) -> Self {
        BillDate(value)
    }
}

impl FromStr for BillDate {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BillDate::parse(s)
    }
}

impl TryFrom<String> for BillDate {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BillDate::parse(&value)
    }
}

impl From<BillDate> for String {
    fn from(value: BillDate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for BillDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BILL_DATE_FORMAT))
    }
}

// ============================================================================
// BILL ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bill {
    pub appointment: Appointment,
    pub amount: Amount,
    pub bill_date: BillDate,
    pub payment_status: PaymentStatus,
}

impl Bill {
    pub fn new(
        appointment: Appointment,
        amount: Amount,
        bill_date: BillDate,
        payment_status: PaymentStatus,
    ) -> Self {
        Bill {
            appointment,
            amount,
            bill_date,
            payment_status,
        }
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn is_same_bill(&self, other: &Bill) -> bool {
        self == other
    }

    /// Same charge, attached to an edited appointment
    pub fn with_appointment(&self, appointment: Appointment) -> Bill {
        Bill {
            appointment,
            ..self.clone()
        }
    }

    pub fn with_status(&self, payment_status: PaymentStatus) -> Bill {
        Bill {
            payment_status,
            ..self.clone()
        }
    }

    /// Comparator for `sort_bills`
    pub fn compare_by_amount(a: &Bill, b: &Bill) -> Ordering {
        a.amount.cmp(&b.amount)
    }

    pub fn compare_by_date(a: &Bill, b: &Bill) -> Ordering {
        a.bill_date.cmp(&b.bill_date)
    }
}

impl fmt::Display for Bill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]; Amount: {}; Date: {}; Status: {}",
            self.appointment.name,
            self.appointment.medical_test,
            self.amount,
            self.bill_date,
            self.payment_status
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Doctor, MedicalTest, Name, Slot};

    fn bill(amount: &str, status: PaymentStatus) -> Bill {
        let appointment = Appointment::new(
            Name::parse("Alice").unwrap(),
            MedicalTest::parse("Dental").unwrap(),
            Slot::parse("2024-01-01 10:00").unwrap(),
            Doctor::parse("DrX").unwrap(),
        );
        Bill::new(
            appointment,
            Amount::parse(amount).unwrap(),
            BillDate::parse("2024-01-01").unwrap(),
            status,
        )
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(Amount::parse("50").unwrap().cents(), 5000);
        assert_eq!(Amount::parse("50.5").unwrap().cents(), 5050);
        assert_eq!(Amount::parse("$50.05").unwrap().cents(), 5005);
        assert_eq!(Amount::parse("0.99").unwrap().to_string(), "0.99");

        assert!(Amount::parse("-5").is_err());
        assert!(Amount::parse("5.005").is_err());
        assert!(Amount::parse(".5").is_err());
        assert!(Amount::parse("abc").is_err());
    }

    #[test]
    fn test_amount_upper_bound() {
        let max = MAX_AMOUNT_CENTS.to_string();
        let (whole, fraction) = max.split_at(max.len() - 2);
        let at_limit = Amount::parse(&format!("{}.{}", whole, fraction)).unwrap();
        assert_eq!(at_limit.cents(), MAX_AMOUNT_CENTS);

        assert!(Amount::parse("100000000000000000").is_err());
        let over = fraction.parse::<u64>().unwrap() + 1;
        assert!(Amount::parse(&format!("{}.{:02}", whole, over)).is_err());
    }

    #[test]
    fn test_payment_status_from_str() {
        assert_eq!("Paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(" unpaid ".parse::<PaymentStatus>().unwrap(), PaymentStatus::Unpaid);
        assert!("pending".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_structural_identity_includes_status() {
        let unpaid = bill("50", PaymentStatus::Unpaid);
        let paid = unpaid.with_status(PaymentStatus::Paid);

        assert!(unpaid.is_same_bill(&bill("50.00", PaymentStatus::Unpaid)));
        assert!(!unpaid.is_same_bill(&paid));
    }

    #[test]
    fn test_compare_by_amount() {
        let small = bill("10", PaymentStatus::Unpaid);
        let large = bill("100", PaymentStatus::Unpaid);

        assert_eq!(Bill::compare_by_amount(&small, &large), Ordering::Less);
        assert_eq!(Bill::compare_by_date(&small, &large), Ordering::Equal);
    }
}
