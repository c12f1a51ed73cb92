// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clinic_manager::{
    load_csv, AddressBookStorage, AppConfig, JsonUserPrefsStorage, ModelManager,
    ReadOnlyAddressBook, SqliteStorage, UserPrefs,
};
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let import = args.len() > 1 && args[1] == "import";

    // The TUI owns the terminal, so logs are discarded while it runs
    init_logging(!import)?;

    let config = AppConfig::from_env()?;

    if import {
        let csv_path = args
            .get(2)
            .context("usage: clinic-manager import <file.csv>")?;
        run_import(&config, Path::new(csv_path))?;
    } else {
        run_ui_mode(&config)?;
    }

    Ok(())
}

fn init_logging(quiet: bool) -> Result<()> {
    let writer = if quiet {
        BoxMakeWriter::new(std::io::sink)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_manager=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    Ok(())
}

fn run_import(config: &AppConfig, csv_path: &Path) -> Result<()> {
    println!("Importing {} into {}", csv_path.display(), config.db_path().display());

    let book = load_csv(csv_path)?;
    println!(
        "✓ Loaded {} patients, {} appointments, {} bills",
        book.patients().len(),
        book.appointments().len(),
        book.bills().len()
    );

    let storage = SqliteStorage::open(config.db_path())?;
    if storage.save_address_book(&book)? {
        println!("✓ Address book saved");
    } else {
        println!("✓ Address book unchanged, nothing written");
    }

    Ok(())
}

type Loaded = (ModelManager, SqliteStorage, JsonUserPrefsStorage);

/// Load prefs and address book. Unreadable stored data aborts startup so the
/// exit-time save cannot overwrite it.
fn load_model(config: &AppConfig) -> Result<Loaded> {
    let prefs_storage = JsonUserPrefsStorage::new(config.prefs_path());
    let mut prefs = match prefs_storage.read_user_prefs()? {
        Some(prefs) => prefs,
        None => {
            info!(path = %config.prefs_path().display(), "No preferences file, using defaults");
            UserPrefs::default()
        }
    };
    prefs.set_address_book_file_path(config.db_path().to_path_buf());

    let storage = SqliteStorage::open(config.db_path())?;
    let book = storage.load_or_empty()?;

    let model = ModelManager::with_history(&book, &prefs, config.history());
    Ok((model, storage, prefs_storage))
}

fn save_model(
    model: &ModelManager,
    storage: &SqliteStorage,
    prefs_storage: &JsonUserPrefsStorage,
) -> Result<()> {
    storage.save_address_book(model.address_book())?;
    prefs_storage.save_user_prefs(model.user_prefs())?;
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let (model, storage, prefs_storage) = load_model(config)?;

    let mut app = ui::App::new(model);
    let res = ui::run_ui(&mut app);

    // Persist even if the UI loop failed part-way
    save_model(&app.model, &storage, &prefs_storage)?;
    res?;

    println!(
        "✓ Saved {} patients to {}",
        app.model.address_book().patients().len(),
        config.db_path().display()
    );
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    let (model, storage, prefs_storage) = load_model(config)?;

    eprintln!("TUI mode not available, rebuild with: cargo build --features tui");
    let book = model.address_book();
    println!(
        "{} patients, {} appointments, {} bills in {}",
        book.patients().len(),
        book.appointments().len(),
        book.bills().len(),
        config.db_path().display()
    );

    save_model(&model, &storage, &prefs_storage)
}
