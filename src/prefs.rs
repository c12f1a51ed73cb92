// User preferences carried by the model
//
// Window geometry plus the location of the address book file. Stored as JSON
// by `storage::JsonUserPrefsStorage`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ADDRESS_BOOK_PATH: &str = "data/clinic.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuiSettings {
    pub window_width: u32,
    pub window_height: u32,
    /// `None` lets the display layer pick (e.g. centre of screen)
    #[serde(default)]
    pub window_position: Option<WindowPosition>,
}

impl Default for GuiSettings {
    fn default() -> Self {
        GuiSettings {
            window_width: 740,
            window_height: 600,
            window_position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default)]
    gui_settings: GuiSettings,
    #[serde(default = "default_address_book_path")]
    address_book_file_path: PathBuf,
}

fn default_address_book_path() -> PathBuf {
    PathBuf::from(DEFAULT_ADDRESS_BOOK_PATH)
}

impl Default for UserPrefs {
    fn default() -> Self {
        UserPrefs {
            gui_settings: GuiSettings::default(),
            address_book_file_path: default_address_book_path(),
        }
    }
}

impl UserPrefs {
    pub fn new(gui_settings: GuiSettings, address_book_file_path: PathBuf) -> Self {
        UserPrefs {
            gui_settings,
            address_book_file_path,
        }
    }

    pub fn reset_data(&mut self, other: &UserPrefs) {
        self.gui_settings = other.gui_settings;
        self.address_book_file_path = other.address_book_file_path.clone();
    }

    pub fn gui_settings(&self) -> GuiSettings {
        self.gui_settings
    }

    pub fn set_gui_settings(&mut self, gui_settings: GuiSettings) {
        self.gui_settings = gui_settings;
    }

    pub fn address_book_file_path(&self) -> &Path {
        &self.address_book_file_path
    }

    pub fn set_address_book_file_path(&mut self, path: PathBuf) {
        self.address_book_file_path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let prefs: UserPrefs = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, UserPrefs::default());

        let prefs: UserPrefs =
            serde_json::from_str(r#"{"gui_settings":{"window_width":800,"window_height":640}}"#)
                .unwrap();
        assert_eq!(prefs.gui_settings().window_width, 800);
        assert_eq!(prefs.gui_settings().window_position, None);
        assert_eq!(
            prefs.address_book_file_path(),
            Path::new(DEFAULT_ADDRESS_BOOK_PATH)
        );
    }

    #[test]
    fn test_reset_data() {
        let mut prefs = UserPrefs::default();
        let other = UserPrefs::new(
            GuiSettings {
                window_width: 1024,
                window_height: 768,
                window_position: Some(WindowPosition { x: 10, y: 20 }),
            },
            PathBuf::from("elsewhere.db"),
        );

        prefs.reset_data(&other);
        assert_eq!(prefs, other);
    }
}
