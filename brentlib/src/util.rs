use serde::{Deserialize, Serialize};

use crate::ipea::SourceSettings;
use crate::models::ModelConfig;
use crate::series::NormalizeSettings;

pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub normalize: NormalizeSettings,
    pub model: ModelConfig,
    #[serde(rename = "logPath")]
    pub log_path: Option<String>,
}

impl Settings {
    pub fn load(path: &str) -> Result<Settings, Box<dyn std::error::Error>> {
        let settings = std::fs::read_to_string(path)?;
        serde_json::from_str(&settings).map_err(|e| e.into())
    }

    pub fn log_path(&self) -> &str {
        self.log_path.as_deref().unwrap_or("logs/predictor.log")
    }
}

// Falls back to defaults when the file does not exist; a file that exists but
// does not parse is still an error
pub fn read_settings(path: &str) -> Result<Settings, Box<dyn std::error::Error>> {
    if !std::path::Path::new(path).exists() {
        return Ok(Settings::default());
    }
    Settings::load(path)
}
