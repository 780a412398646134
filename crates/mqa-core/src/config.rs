use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Top-level configuration for the chat widget.
///
/// Loaded from `~/.mqa-chat/config.toml` by default. Every section is
/// optional; missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ChatConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ChatConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Conversation widget behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Artificial delay before a canned answer is revealed, in milliseconds.
    pub answer_delay_ms: u64,
    /// Key of the persisted history slot.
    pub storage_key: String,
    /// Sender label for operator lines in the exported transcript.
    pub bot_name: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            answer_delay_ms: 1000,
            storage_key: "mqa_chat_history".to_string(),
            bot_name: "MQA Bot".to_string(),
        }
    }
}

/// Prediction endpoint used for free-form questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Full URL of the `POST /predict` endpoint.
    pub endpoint: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/predict".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Where the history slot lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per storage key.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.mqa-chat".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.widget.answer_delay_ms, 1000);
        assert_eq!(config.widget.storage_key, "mqa_chat_history");
        assert_eq!(config.widget.bot_name, "MQA Bot");
        assert_eq!(config.remote.endpoint, "http://127.0.0.1:5000/predict");
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.connect_timeout_secs, 10);
        assert_eq!(config.storage.data_dir, "~/.mqa-chat");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[widget]
answer_delay_ms = 250
storage_key = "kiosk_history"
bot_name = "Helpdesk"

[remote]
endpoint = "https://chat.example.org/predict"
timeout_secs = 5
connect_timeout_secs = 2

[storage]
data_dir = "/var/lib/mqa-chat"
"#;
        let file = create_temp_config(content);
        let config = ChatConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.widget.answer_delay_ms, 250);
        assert_eq!(config.widget.storage_key, "kiosk_history");
        assert_eq!(config.widget.bot_name, "Helpdesk");
        assert_eq!(config.remote.endpoint, "https://chat.example.org/predict");
        assert_eq!(config.remote.timeout_secs, 5);
        assert_eq!(config.remote.connect_timeout_secs, 2);
        assert_eq!(config.storage.data_dir, "/var/lib/mqa-chat");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[widget]\nanswer_delay_ms = 0\n");
        let config = ChatConfig::load(file.path()).unwrap();
        assert_eq!(config.widget.answer_delay_ms, 0);
        assert_eq!(config.widget.storage_key, "mqa_chat_history");
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ChatConfig::load(file.path()).unwrap();
        assert_eq!(config.widget.bot_name, "MQA Bot");
        assert_eq!(config.storage.data_dir, "~/.mqa-chat");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("widget = [[[");
        let result = ChatConfig::load(file.path());
        assert!(matches!(result, Err(ChatError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = ChatConfig::load(Path::new("/nonexistent/mqa/config.toml"));
        assert!(matches!(result, Err(ChatError::Io(_))));
    }
}
