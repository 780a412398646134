//! CLI argument definitions for the MQA chat host.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// MQA support chat in the terminal.
#[derive(Parser, Debug)]
#[command(name = "mqa-chatbot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Prediction endpoint URL for free-form questions.
    #[arg(short = 'e', long = "endpoint")]
    pub endpoint: Option<String>,

    /// Directory holding the persisted chat history.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MQA_CHAT_CONFIG env var > ~/.mqa-chat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MQA_CHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --endpoint flag > config file value.
    pub fn resolve_endpoint(&self, config_endpoint: &str) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| config_endpoint.to_string())
    }

    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self, config_dir: &str) -> String {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| config_dir.to_string())
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".mqa-chat").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".mqa-chat").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "mqa-chatbot",
            "--endpoint",
            "http://10.0.0.2:5000/predict",
            "--data-dir",
            "/tmp/mqa",
            "-l",
            "debug",
        ]);
        assert_eq!(args.resolve_endpoint("http://127.0.0.1:5000/predict"), "http://10.0.0.2:5000/predict");
        assert_eq!(args.resolve_data_dir("~/.mqa-chat"), "/tmp/mqa");
        assert_eq!(args.resolve_log_level("info"), "debug");
    }

    #[test]
    fn test_config_values_used_without_flags() {
        let args = CliArgs::parse_from(["mqa-chatbot"]);
        assert_eq!(args.resolve_endpoint("http://a/predict"), "http://a/predict");
        assert_eq!(args.resolve_data_dir("~/.mqa-chat"), "~/.mqa-chat");
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_config_flag_wins() {
        let args = CliArgs::parse_from(["mqa-chatbot", "-c", "/etc/mqa/chat.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/mqa/chat.toml"));
    }
}
