use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Error;

pub const SETTINGS_FILE: &str = "settings.json";
/// Sibling of the settings file holding the user's background image.
pub const BACKGROUND_FILE: &str = "custom-background";

/// User choices that survive restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub use_custom_background: bool,
}

/// A background image ready to be injected into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Background {
    pub data_url: String,
}

impl Background {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data_url: format!(
                "data:{};base64,{}",
                sniff_image_mime(bytes),
                STANDARD.encode(bytes)
            ),
        }
    }

    pub fn css(&self) -> String {
        format!(
            "html, body {{ background: url(\"{}\") center / cover no-repeat fixed !important; }}",
            self.data_url
        )
    }
}

fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [b'B', b'M', ..] => "image/bmp",
        _ => "image/png",
    }
}

/// Flat settings file plus the background image next to it.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn background_path(&self) -> PathBuf {
        self.dir.join(BACKGROUND_FILE)
    }

    /// Missing or unreadable settings mean defaults.
    pub fn load(&self) -> AppSettings {
        let path = self.settings_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return AppSettings::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read settings");
                return AppSettings::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "failed to parse settings");
            AppSettings::default()
        })
    }

    pub fn save(&self, settings: &AppSettings) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(self.settings_path(), content)?;
        Ok(())
    }

    /// The background to apply, if enabled and present on disk.
    pub fn load_background(&self) -> Option<Background> {
        if !self.load().use_custom_background {
            return None;
        }
        match fs::read(self.background_path()) {
            Ok(bytes) if !bytes.is_empty() => Some(Background::from_bytes(&bytes)),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "custom background enabled but not readable");
                None
            }
        }
    }

    /// Copies `source` next to the settings file and enables it.
    pub fn store_background(&self, source: &Path) -> Result<(), Error> {
        let bytes = fs::read(source)?;
        if bytes.is_empty() {
            return Err(Error::Settings(format!(
                "background image {} is empty",
                source.display()
            )));
        }
        fs::create_dir_all(&self.dir)?;
        fs::write(self.background_path(), bytes)?;

        let mut settings = self.load();
        settings.use_custom_background = true;
        self.save(&settings)
    }

    pub fn clear_background(&self) -> Result<(), Error> {
        let mut settings = self.load();
        settings.use_custom_background = false;
        self.save(&settings)?;

        match fs::remove_file(self.background_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.load(), AppSettings::default());
        assert!(store.load_background().is_none());
    }

    #[test]
    fn corrupt_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert_eq!(SettingsStore::new(dir.path()).load(), AppSettings::default());
    }

    #[test]
    fn settings_persist_in_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested"));
        store
            .save(&AppSettings {
                use_custom_background: true,
            })
            .unwrap();

        let raw = fs::read_to_string(store.settings_path()).unwrap();
        assert!(raw.contains("\"useCustomBackground\": true"));
        assert!(store.load().use_custom_background);
    }

    #[test]
    fn enabled_without_image_applies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store
            .save(&AppSettings {
                use_custom_background: true,
            })
            .unwrap();
        assert!(store.load_background().is_none());
    }

    #[test]
    fn stored_background_is_served_as_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("wallpaper.png");
        fs::write(&source, PNG_HEADER).unwrap();

        let store = SettingsStore::new(dir.path().join("data"));
        store.store_background(&source).unwrap();

        let background = store.load_background().unwrap();
        assert!(background.data_url.starts_with("data:image/png;base64,"));
        assert!(background.css().contains(&background.data_url));

        store.clear_background().unwrap();
        assert!(!store.load().use_custom_background);
        assert!(!store.background_path().exists());
        assert!(store.load_background().is_none());
    }

    #[test]
    fn clearing_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store.clear_background().unwrap();
        store.clear_background().unwrap();
    }

    #[test]
    fn mime_is_sniffed_from_magic_bytes() {
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_image_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_image_mime(b"??"), "image/png");
    }
}
