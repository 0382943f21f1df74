use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::models::settings::AppSettings;

const SETTINGS_FILE: &str = "settings.json";

pub fn default_settings_path() -> anyhow::Result<PathBuf> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| anyhow!("could not determine config directory"))?;
    Ok(config_dir.join("havengrab").join(SETTINGS_FILE))
}

/// Loads settings from `path` (or the default location), falling back to
/// defaults when the file is missing or unreadable.
pub fn load_settings(path: Option<&Path>) -> AppSettings {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_settings_path() {
            Ok(p) => p,
            Err(_) => return AppSettings::default(),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring malformed settings: {e}");
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}
