use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MutabakatError, Result};
use crate::filters::FilterStore;
use crate::normalizer::DuplicatePolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Filter file to use instead of the one next to the executable.
    #[serde(default)]
    pub filter_file: Option<String>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Directory for exported workbooks given by bare file name.
    #[serde(default)]
    pub export_dir: Option<String>,
}

pub const KEYS: &[&str] = &["filter_file", "duplicate_policy", "export_dir"];

impl Settings {
    /// Set one key from its command-line text. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = || (!value.trim().is_empty()).then(|| shellexpand_path(value.trim()));
        match key {
            "filter_file" => self.filter_file = optional(),
            "export_dir" => self.export_dir = optional(),
            "duplicate_policy" => {
                self.duplicate_policy = serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
                    .map_err(|_| {
                        MutabakatError::Settings(format!(
                            "geçersiz duplicate_policy '{value}' (last_wins, first_wins, reject)"
                        ))
                    })?;
            }
            other => {
                return Err(MutabakatError::Settings(format!(
                    "bilinmeyen ayar '{other}' (geçerli: {})",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// Where the filter file lives: the `--filters` override, then this
    /// setting, then next to the executable.
    pub fn filter_store(&self, cli_override: Option<&Path>) -> Result<FilterStore> {
        if let Some(path) = cli_override {
            return Ok(FilterStore::new(path));
        }
        match &self.filter_file {
            Some(path) => Ok(FilterStore::new(path)),
            None => FilterStore::beside_executable(),
        }
    }

    /// Resolve an export target; bare file names land in `export_dir`.
    pub fn export_path(&self, target: &Path) -> PathBuf {
        let bare = target.parent().map_or(true, |p| p.as_os_str().is_empty());
        match &self.export_dir {
            Some(dir) if bare => Path::new(dir).join(target),
            _ => target.to_path_buf(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mutabakat")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub(crate) fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub(crate) fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| MutabakatError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
