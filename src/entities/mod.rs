// Entity Models
//
// Patients own nothing. Appointments copy the patient's name and bills copy
// the whole appointment, so every reference is a value, never a pointer.
// The model keeps the copies consistent through cascades.

// FromStr, TryFrom<String>, Into<String> and Display for validated string
// newtypes. Each type needs a `parse(&str) -> ModelResult<Self>`.
macro_rules! string_value_impls {
    ($($ty:ident),*) => {
        $(
            impl ::std::str::FromStr for $ty {
                type Err = $crate::error::ModelError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    $ty::parse(s)
                }
            }

            impl TryFrom<String> for $ty {
                type Error = $crate::error::ModelError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    $ty::parse(&value)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.0
                }
            }

            impl ::std::fmt::Display for $ty {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

pub mod appointment;
pub mod bill;
pub mod patient;

pub use appointment::{Appointment, Doctor, MedicalTest, Slot};
pub use bill::{Amount, Bill, BillDate, PaymentStatus, MAX_AMOUNT_CENTS};
pub use patient::{Address, Email, Name, Patient, Phone};
