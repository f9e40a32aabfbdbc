use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::uikit::{Layout, Theme};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Settings {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub theme: Theme,
}

/// User preferences persisted as `settings.json` in a data directory.
pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let file_path = data_dir.as_ref().join("settings.json");
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.lock().clone()
    }

    pub fn set_display_name(&self, name: Option<String>) {
        self.lock().display_name = name;
        self.save();
    }

    pub fn set_layout(&self, layout: Layout) {
        self.lock().layout = layout;
        self.save();
    }

    pub fn set_theme(&self, theme: Theme) {
        self.lock().theme = theme;
        self.save();
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self) {
        let settings = self.get();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&settings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write {}: {e}", self.file_path.display());
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {e}"),
        }
    }

    fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable {}: {e}", path.display());
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn new_creates_defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        let s = store.get();
        assert_eq!(s, Settings::default());
        assert_eq!(s.layout, Layout::Grid);
        assert_eq!(s.theme, Theme::Dark);
    }

    #[test]
    fn values_persist_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SettingsStore::new(dir.path());
            store.set_display_name(Some("Alice".to_string()));
            store.set_layout(Layout::Pin);
            store.set_theme(Theme::Light);
        }
        let s = SettingsStore::new(dir.path()).get();
        assert_eq!(s.display_name.as_deref(), Some("Alice"));
        assert_eq!(s.layout, Layout::Pin);
        assert_eq!(s.theme, Theme::Light);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), "not json!!!").unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn partial_json_uses_serde_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("settings.json"), r#"{"layout":"pin"}"#).unwrap();
        let s = SettingsStore::new(dir.path()).get();
        assert_eq!(s.layout, Layout::Pin);
        assert_eq!(s.display_name, None);
        assert_eq!(s.theme, Theme::Dark);
    }
}
