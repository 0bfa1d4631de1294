//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

mod types;

pub use types::{Config, LoggingConfig, OpenAIConfig, PipelineConfig, ServerConfig};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables holding the OpenAI API key, in priority order.
/// `Openaikey` is the name used by older deployments of this service.
const API_KEY_VARS: [&str; 2] = ["OPENAI_API_KEY", "Openaikey"];

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/docstoaudio/config.toml
    /// 3. Local config: ./docstoaudio.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(config, &system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(config, &local_config_path)?;
        }

        config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. Custom config file (specified path)
    /// 3. Environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::merge_from_file(Self::default(), path)?;
        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;

        tracing::debug!("Configuration loaded successfully from custom path");
        Ok(config)
    }

    /// Get the system config path: ~/.config/docstoaudio/config.toml
    fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docstoaudio").join("config.toml"))
    }

    /// Get the local config path: ./docstoaudio.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./docstoaudio.toml")
    }

    /// Load and merge configuration from a TOML file
    fn merge_from_file(base: Self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::merge_toml(base, &contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Overlay TOML `contents` onto `base` key by key. Keys the overlay does
    /// not mention keep their base values. The API key is never stored in
    /// files, so it is carried over.
    fn merge_toml(base: Self, contents: &str) -> Result<Self> {
        let overlay: toml::Table = toml::from_str(contents)?;

        let toml::Value::Table(mut merged) = toml::Value::try_from(&base)? else {
            anyhow::bail!("Configuration did not serialize to a TOML table");
        };
        merge_tables(&mut merged, overlay);

        let mut config: Self = toml::Value::Table(merged).try_into()?;
        if config.openai.api_key.is_none() {
            config.openai.api_key = base.openai.api_key;
        }
        Ok(config)
    }

    /// Apply environment variable overrides. `lookup` abstracts the process
    /// environment so tests can supply their own.
    fn apply_env_overrides<F>(mut config: Self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = API_KEY_VARS.iter().find_map(|var| lookup(var)) {
            config.openai.api_key = Some(api_key);
        }

        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            config.openai.base_url = base_url;
        }

        if let Some(bind) = lookup("DOCSTOAUDIO_BIND") {
            config.server.bind = bind;
        }

        if let Some(port) = lookup("DOCSTOAUDIO_PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("Invalid DOCSTOAUDIO_PORT: {}", port))?;
        }

        if let Some(upload_dir) = lookup("DOCSTOAUDIO_UPLOAD_DIR") {
            config.server.upload_dir = PathBuf::from(upload_dir);
        }

        if let Some(log_level) = lookup("DOCSTOAUDIO_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Some(log_file) = lookup("DOCSTOAUDIO_LOG_FILE") {
            config.logging.file = Some(PathBuf::from(log_file));
        }

        Ok(config)
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.openai
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be non-zero");
        }

        if self.openai.chat_model.trim().is_empty() || self.openai.tts_model.trim().is_empty() {
            anyhow::bail!("Both openai.chat_model and openai.tts_model must be set");
        }

        if self.openai.max_tokens == 0 {
            anyhow::bail!("openai.max_tokens must be greater than zero");
        }

        if self.pipeline.max_speech_chars == 0 {
            anyhow::bail!("pipeline.max_speech_chars must be greater than zero");
        }

        if let Some(parent) = self.server.upload_dir.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            tracing::warn!(
                "Upload directory parent does not exist, will be created: {:?}",
                parent
            );
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Render the configuration as TOML. The API key is masked unless
    /// `show_secrets` is set.
    pub fn to_display_toml(&self, show_secrets: bool) -> Result<String> {
        let mut rendered =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        let key_line = match self.openai.api_key.as_deref() {
            Some(key) if show_secrets => format!("# api_key = \"{}\"\n", key),
            Some(_) => "# api_key = \"***\"\n".to_string(),
            None => "# api_key not set (OPENAI_API_KEY)\n".to_string(),
        };
        rendered.push('\n');
        rendered.push_str(&key_line);
        Ok(rendered)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(section) if matches!(base.get(&key), Some(toml::Value::Table(_))) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, section);
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.openai.chat_model, "gpt-4");
        assert_eq!(config.openai.tts_model, "tts-1");
        assert_eq!(config.openai.max_tokens, 1000);
        assert_eq!(config.pipeline.default_language, "en");
        assert_eq!(config.pipeline.default_voice, "nova");
        assert_eq!(config.logging.level, "info");
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[rstest]
    #[case::bad_log_level(|c: &mut Config| c.logging.level = "loud".to_string())]
    #[case::zero_port(|c: &mut Config| c.server.port = 0)]
    #[case::empty_chat_model(|c: &mut Config| c.openai.chat_model = " ".to_string())]
    #[case::empty_tts_model(|c: &mut Config| c.openai.tts_model = String::new())]
    #[case::zero_max_tokens(|c: &mut Config| c.openai.max_tokens = 0)]
    #[case::zero_speech_chars(|c: &mut Config| c.pipeline.max_speech_chars = 0)]
    fn test_config_validation_rejects(#[case] mutate: fn(&mut Config)) {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
[server]
port = 8080
upload_dir = "/var/tmp/docs"

[openai]
chat_model = "gpt-4o"
max_tokens = 2000

[pipeline]
default_voice = "alloy"

[logging]
level = "debug"
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.upload_dir, PathBuf::from("/var/tmp/docs"));
        assert_eq!(config.openai.chat_model, "gpt-4o");
        assert_eq!(config.openai.tts_model, "tts-1");
        assert_eq!(config.openai.max_tokens, 2000);
        assert_eq!(config.pipeline.default_voice, "alloy");
        assert_eq!(config.pipeline.default_language, "en");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let mut config = Config::default();
        config.openai.api_key = Some("sk-secret".to_string());

        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_display_toml_masks_key() {
        let mut config = Config::default();
        config.openai.api_key = Some("sk-secret".to_string());

        let masked = config.to_display_toml(false).unwrap();
        assert!(!masked.contains("sk-secret"));
        assert!(masked.contains("***"));

        let shown = config.to_display_toml(true).unwrap();
        assert!(shown.contains("sk-secret"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.server.port = 4321;

        config.save(temp_file.path()).unwrap();

        let contents = std::fs::read_to_string(temp_file.path()).unwrap();
        let loaded_config: Config = toml::from_str(&contents).unwrap();
        assert_eq!(loaded_config.server.port, 4321);
        assert_eq!(loaded_config.logging.level, config.logging.level);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::apply_env_overrides(
            Config::default(),
            env(&[
                ("OPENAI_API_KEY", "sk-env"),
                ("OPENAI_BASE_URL", "http://localhost:1234/v1"),
                ("DOCSTOAUDIO_PORT", "9000"),
                ("DOCSTOAUDIO_UPLOAD_DIR", "/tmp/up"),
                ("DOCSTOAUDIO_LOG_LEVEL", "warn"),
            ]),
        )
        .unwrap();

        assert_eq!(config.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.openai.base_url, "http://localhost:1234/v1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_legacy_api_key_variable() {
        let config =
            Config::apply_env_overrides(Config::default(), env(&[("Openaikey", "sk-legacy")]))
                .unwrap();
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-legacy"));
    }

    #[test]
    fn test_standard_api_key_wins_over_legacy() {
        let config = Config::apply_env_overrides(
            Config::default(),
            env(&[("Openaikey", "sk-legacy"), ("OPENAI_API_KEY", "sk-new")]),
        )
        .unwrap();
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-new"));
    }

    #[test]
    fn test_invalid_port_env_is_an_error() {
        let result =
            Config::apply_env_overrides(Config::default(), env(&[("DOCSTOAUDIO_PORT", "http")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_keeps_base_api_key() {
        let mut base = Config::default();
        base.openai.api_key = Some("sk-base".to_string());

        let merged = Config::merge_toml(base, "[server]\nport = 1").unwrap();
        assert_eq!(merged.server.port, 1);
        assert_eq!(merged.openai.api_key.as_deref(), Some("sk-base"));
    }

    #[test]
    fn test_local_file_only_overrides_the_keys_it_sets() {
        let system = NamedTempFile::new().unwrap();
        std::fs::write(
            system.path(),
            "[server]\nport = 8080\n\n[openai]\nchat_model = \"gpt-4o\"\n",
        )
        .unwrap();
        let local = NamedTempFile::new().unwrap();
        std::fs::write(local.path(), "[logging]\nlevel = \"debug\"\n\n[server]\nbind = \"0.0.0.0\"\n").unwrap();

        let config = Config::merge_from_file(Config::default(), system.path()).unwrap();
        let config = Config::merge_from_file(config, local.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.openai.chat_model, "gpt-4o");
        assert_eq!(config.openai.tts_model, "tts-1");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_later_file_wins_for_shared_keys() {
        let base = Config::merge_toml(Config::default(), "[pipeline]\ndefault_voice = \"alloy\"").unwrap();
        let merged = Config::merge_toml(base, "[pipeline]\ndefault_voice = \"echo\"").unwrap();
        assert_eq!(merged.pipeline.default_voice, "echo");
        assert_eq!(merged.pipeline.default_language, "en");
    }

    #[test]
    fn test_merge_rejects_wrong_types() {
        assert!(Config::merge_toml(Config::default(), "[server]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = Config::load_from_path("/definitely/not/here/docstoaudio.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_system_config_path() {
        if let Some(path) = Config::system_config_path() {
            assert!(path.to_string_lossy().contains("docstoaudio"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }

    #[test]
    fn test_local_config_path() {
        assert_eq!(Config::local_config_path(), PathBuf::from("./docstoaudio.toml"));
    }
}
