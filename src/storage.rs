// Persistence collaborators
//
// SQLite holds the address book (one table per collection, WAL mode) plus an
// append-only audit trail of saves. Preferences live in a JSON file. CSV import
// seeds an address book from a flat export.
//
// Undo history is never persisted.

use crate::address_book::{AddressBook, ReadOnlyAddressBook};
use crate::entities::{
    Address, Amount, Appointment, Bill, BillDate, Doctor, Email, MedicalTest, Name, Patient,
    PaymentStatus, Phone, Slot,
};
use crate::prefs::UserPrefs;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Full-state persistence of an address book. The blob is opaque to the model.
pub trait AddressBookStorage {
    /// `None` when nothing has been saved yet
    fn read_address_book(&self) -> Result<Option<AddressBook>>;

    /// Returns false when the stored state was already identical
    fn save_address_book(&self, book: &dyn ReadOnlyAddressBook) -> Result<bool>;

    /// Startup load: an empty book on first run, an error if stored data is
    /// unreadable. Never substitutes an empty book for data it failed to read.
    fn load_or_empty(&self) -> Result<AddressBook> {
        match self
            .read_address_book()
            .context("Stored address book is unreadable; refusing to start over it")?
        {
            Some(book) => Ok(book),
            None => {
                info!("no stored address book, starting with an empty one");
                Ok(AddressBook::new())
            }
        }
    }
}

/// Content digest used to skip redundant saves
pub fn compute_content_hash(book: &dyn ReadOnlyAddressBook) -> Result<String> {
    let json = serde_json::to_string(&AddressBook::from_read_only(book))?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Audit trail entry ("every save is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            data,
        }
    }
}

// ============================================================================
// SQLITE STORAGE
// ============================================================================

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open (creating if needed) a database file, including its parent directory
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStorage { conn })
    }

    /// Most recent audit events first
    pub fn recent_events(&self, limit: usize) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, data
             FROM events
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(event_id, timestamp, event_type, data)| {
                Ok(Event {
                    event_id,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .context("Invalid event timestamp")?
                        .with_timezone(&Utc),
                    event_type,
                    data: serde_json::from_str(&data).context("Invalid event payload")?,
                })
            })
            .collect()
    }

    fn stored_hash(&self) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'content_hash'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases report "memory")
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %mode, "database opened");

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS patients (
            position INTEGER PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            phone TEXT NOT NULL,
            email TEXT NOT NULL,
            address TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS appointments (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            medical_test TEXT NOT NULL,
            slot TEXT NOT NULL,
            doctor TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bills (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            medical_test TEXT NOT NULL,
            slot TEXT NOT NULL,
            doctor TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            bill_date TEXT NOT NULL,
            payment_status TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_appointments_name ON appointments(name);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    Ok(())
}

fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, data)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            serde_json::to_string(&event.data)?,
        ],
    )?;
    Ok(())
}

fn parse_appointment(
    name: &str,
    medical_test: &str,
    slot: &str,
    doctor: &str,
) -> Result<Appointment> {
    Ok(Appointment::new(
        Name::parse(name)?,
        MedicalTest::parse(medical_test)?,
        Slot::parse(slot)?,
        Doctor::parse(doctor)?,
    ))
}

impl AddressBookStorage for SqliteStorage {
    fn read_address_book(&self) -> Result<Option<AddressBook>> {
        if self.stored_hash()?.is_none() {
            return Ok(None);
        }

        let mut book = AddressBook::new();

        let mut stmt = self
            .conn
            .prepare("SELECT name, phone, email, address FROM patients ORDER BY position")?;
        let patients = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (name, phone, email, address) in patients {
            book.add_patient(Patient::new(
                Name::parse(&name)?,
                Phone::parse(&phone)?,
                Email::parse(&email)?,
                Address::parse(&address)?,
            ));
        }

        let mut stmt = self.conn.prepare(
            "SELECT name, medical_test, slot, doctor FROM appointments ORDER BY position",
        )?;
        let appointments = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (name, medical_test, slot, doctor) in appointments {
            book.add_appointment(parse_appointment(&name, &medical_test, &slot, &doctor)?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT name, medical_test, slot, doctor, amount_cents, bill_date, payment_status
             FROM bills ORDER BY position",
        )?;
        let bills = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (name, medical_test, slot, doctor, cents, bill_date, status) in bills {
            let cents = u64::try_from(cents)
                .map_err(|_| anyhow!("Negative bill amount in storage: {}", cents))?;
            book.add_bill(Bill::new(
                parse_appointment(&name, &medical_test, &slot, &doctor)?,
                Amount::from_cents(cents),
                BillDate::parse(&bill_date)?,
                status.parse::<PaymentStatus>()?,
            ));
        }

        info!(
            patients = book.patients().len(),
            appointments = book.appointments().len(),
            bills = book.bills().len(),
            "loaded address book"
        );

        Ok(Some(book))
    }

    fn save_address_book(&self, book: &dyn ReadOnlyAddressBook) -> Result<bool> {
        let hash = compute_content_hash(book)?;
        if self.stored_hash()?.as_deref() == Some(hash.as_str()) {
            debug!("address book unchanged, skipping save");
            return Ok(false);
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM patients; DELETE FROM appointments; DELETE FROM bills;")?;

        for (position, p) in book.patients().iter().enumerate() {
            tx.execute(
                "INSERT INTO patients (position, name, phone, email, address)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    position as i64,
                    p.name.as_str(),
                    p.phone.as_str(),
                    p.email.as_str(),
                    p.address.as_str(),
                ],
            )?;
        }

        for (position, a) in book.appointments().iter().enumerate() {
            tx.execute(
                "INSERT INTO appointments (position, name, medical_test, slot, doctor)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    position as i64,
                    a.name.as_str(),
                    a.medical_test.as_str(),
                    a.slot.to_string(),
                    a.doctor.as_str(),
                ],
            )?;
        }

        for (position, b) in book.bills().iter().enumerate() {
            let a = &b.appointment;
            let amount_cents = i64::try_from(b.amount.cents())
                .with_context(|| format!("Bill amount too large to store: {}", b.amount))?;
            tx.execute(
                "INSERT INTO bills (position, name, medical_test, slot, doctor,
                                    amount_cents, bill_date, payment_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    position as i64,
                    a.name.as_str(),
                    a.medical_test.as_str(),
                    a.slot.to_string(),
                    a.doctor.as_str(),
                    amount_cents,
                    b.bill_date.to_string(),
                    b.payment_status.as_str(),
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('content_hash', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![hash],
        )?;

        let event = Event::new(
            "address_book_saved",
            serde_json::json!({
                "patients": book.patients().len(),
                "appointments": book.appointments().len(),
                "bills": book.bills().len(),
                "content_hash": hash,
            }),
        );
        insert_event(&tx, &event)?;

        tx.commit()?;

        info!(
            patients = book.patients().len(),
            appointments = book.appointments().len(),
            bills = book.bills().len(),
            "saved address book"
        );

        Ok(true)
    }
}

// ============================================================================
// USER PREFS (JSON)
// ============================================================================

pub struct JsonUserPrefsStorage {
    path: PathBuf,
}

impl JsonUserPrefsStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonUserPrefsStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file does not exist yet
    pub fn read_user_prefs(&self) -> Result<Option<UserPrefs>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let prefs = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse preferences in {}", self.path.display()))?;
        Ok(Some(prefs))
    }

    pub fn save_user_prefs(&self, prefs: &UserPrefs) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One row of the flat import format. `kind` selects which columns apply:
/// `patient` (name, phone, email, address), `appointment` (name, medical_test,
/// slot, doctor) or `bill` (the appointment columns plus amount, bill_date,
/// payment_status).
#[derive(Debug, Deserialize)]
struct CsvRow {
    kind: String,
    name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    medical_test: Option<String>,
    #[serde(default)]
    slot: Option<String>,
    #[serde(default)]
    doctor: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    bill_date: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
}

fn required<'a>(value: &'a Option<String>, column: &str, line: usize) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("line {}: missing {}", line, column))
}

impl CsvRow {
    fn appointment(&self, line: usize) -> Result<Appointment> {
        parse_appointment(
            &self.name,
            required(&self.medical_test, "medical_test", line)?,
            required(&self.slot, "slot", line)?,
            required(&self.doctor, "doctor", line)?,
        )
        .with_context(|| format!("line {}: invalid appointment", line))
    }
}

pub fn load_csv(csv_path: &Path) -> Result<AddressBook> {
    let file = fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    load_csv_from_reader(file)
}

/// Rows are applied in order. Appointments naming an unknown patient and bills
/// for an unknown appointment are skipped with a warning, as are duplicate
/// patients.
pub fn load_csv_from_reader<R: Read>(reader: R) -> Result<AddressBook> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut book = AddressBook::new();
    let mut skipped = 0;

    for (index, result) in rdr.deserialize().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row: CsvRow = result.with_context(|| format!("line {}: malformed row", line))?;

        match row.kind.to_lowercase().as_str() {
            "patient" => {
                let patient = Patient::new(
                    Name::parse(&row.name)?,
                    Phone::parse(required(&row.phone, "phone", line)?)?,
                    Email::parse(required(&row.email, "email", line)?)?,
                    Address::parse(required(&row.address, "address", line)?)?,
                );
                if book.has_patient(&patient) {
                    warn!(line, name = %patient.name, "duplicate patient skipped");
                    skipped += 1;
                    continue;
                }
                book.add_patient(patient);
            }
            "appointment" => {
                let appointment = row.appointment(line)?;
                if !book.has_patient_named(&appointment.name) {
                    warn!(
                        line,
                        name = %appointment.name,
                        "appointment for unknown patient skipped"
                    );
                    skipped += 1;
                    continue;
                }
                book.add_appointment(appointment);
            }
            "bill" => {
                let appointment = row.appointment(line)?;
                if !book.has_appointment(&appointment) {
                    warn!(line, "bill for unknown appointment skipped");
                    skipped += 1;
                    continue;
                }
                let status = match row.payment_status.as_deref() {
                    Some(s) if !s.trim().is_empty() => s.parse()?,
                    _ => PaymentStatus::Unpaid,
                };
                book.add_bill(Bill::new(
                    appointment,
                    Amount::parse(required(&row.amount, "amount", line)?)?,
                    BillDate::parse(required(&row.bill_date, "bill_date", line)?)?,
                    status,
                ));
            }
            other => {
                return Err(anyhow!("line {}: unknown row kind {:?}", line, other));
            }
        }
    }

    info!(
        patients = book.patients().len(),
        appointments = book.appointments().len(),
        bills = book.bills().len(),
        skipped,
        "imported CSV"
    );

    Ok(book)
}

// ============================================================================
// TESTS
// ============================================================================
