// Clinic Manager - Core Library
// In-memory model of patients, appointments and bills with cascading
// consistency, filtered views and undo/redo. Used by the terminal UI and tests.

pub mod address_book;
pub mod config;
pub mod entities;
pub mod error;
pub mod filter;
pub mod history;
pub mod model;
pub mod prefs;
pub mod storage;

// Re-export commonly used types
pub use address_book::{AddressBook, ReadOnlyAddressBook};
pub use config::AppConfig;
pub use entities::{
    Address, Amount, Appointment, Bill, BillDate, Doctor, Email, MedicalTest, Name, Patient,
    PaymentStatus, Phone, Slot,
};
pub use error::{ModelError, ModelResult};
pub use filter::{FilterState, FilteredList, Predicate, SubscriptionId};
pub use history::{HistoryManager, Restore, Snapshot};
pub use model::ModelManager;
pub use prefs::{GuiSettings, UserPrefs, WindowPosition};
pub use storage::{
    load_csv, AddressBookStorage, JsonUserPrefsStorage, SqliteStorage,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
