/// Configuration for the localization tool
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "localization-tool";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Keep a timestamped copy of the file an export overwrites
    #[serde(default = "default_true")]
    pub create_backup: bool,
    #[serde(default = "default_true")]
    pub pretty_json: bool,
    #[serde(default = "default_delimiter")]
    pub csv_delimiter: char,
}

fn default_true() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            create_backup: true,
            pretty_json: true,
            csv_delimiter: default_delimiter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PoOptions {
    /// Written to the `Language:` header on export; omitted when empty
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetOptions {
    pub sheet_name: String,
}

impl Default for SpreadsheetOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Translations".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    #[serde(default)]
    pub export: ExportOptions,
    #[serde(default)]
    pub po: PoOptions,
    #[serde(default)]
    pub spreadsheet: SpreadsheetOptions,
}

/// `<config dir>/localization-tool/config.json`, when the platform has a
/// config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl ToolConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_json(&content)
    }

    /// Save configuration to a JSON file, creating parent directories
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        fs::write(path, self.to_json()?)
            .map_err(|e| format!("Failed to write config file: {}", e))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist yet.
    pub fn load_or_default() -> Result<Self, String> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_json_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.export.csv_delimiter.is_ascii() || self.export.csv_delimiter == '"' {
            return Err(format!(
                "Invalid CSV delimiter: {:?}",
                self.export.csv_delimiter
            ));
        }
        if self.spreadsheet.sheet_name.trim().is_empty() {
            return Err("Spreadsheet sheet name must not be empty".into());
        }
        Ok(())
    }
}
