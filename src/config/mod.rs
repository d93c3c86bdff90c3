//! Configuration management for GrassMidi
//!
//! Handles loading, parsing, validation and hot-reloading of the YAML (or
//! JSON) configuration file.

pub mod store;
pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::dispatch::{ActionKind, Binding, BindingTable, VolumeMode, UNUSED_CHANNEL};
use crate::drivers::http::parse_url;
use crate::drivers::input::parse_key_code;

pub use store::{ConfigStore, ConfigUpdateError};
pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub obs: ObsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default, alias = "Bindings")]
    pub bindings: Vec<Binding>,
}

/// MIDI input selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MidiConfig {
    /// Input port name; exact match first, then case-insensitive substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// OBS WebSocket configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObsConfig {
    #[serde(default = "default_obs_host")]
    pub host: String,
    #[serde(default = "default_obs_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub volume_mode: VolumeMode,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            host: default_obs_host(),
            port: default_obs_port(),
            password: None,
            volume_mode: VolumeMode::default(),
        }
    }
}

/// HTTP control API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

/// On-disk encoding, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Either a full config, the legacy `bindings.json` object, or a bare
/// binding list
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    // Tried first: a struct would also accept a sequence
    Bindings(Vec<Binding>),
    Legacy(LegacyConfig),
    Full(AppConfig),
}

/// PascalCase layout written by the desktop app; `Bindings` is required so
/// current configs fall through to `Full`
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacyConfig {
    bindings: Vec<Binding>,
    #[serde(default)]
    obs_url: String,
    #[serde(default)]
    obs_password: String,
    #[serde(default)]
    selected_midi_device: String,
}

impl From<LegacyConfig> for AppConfig {
    fn from(legacy: LegacyConfig) -> Self {
        let mut obs = ObsConfig::default();
        if let Ok(url) = reqwest::Url::parse(legacy.obs_url.trim()) {
            if let Some(host) = url.host_str() {
                obs.host = host.to_string();
            }
            if let Some(port) = url.port() {
                obs.port = port;
            }
        }
        obs.password = Some(legacy.obs_password).filter(|p| !p.is_empty());

        AppConfig {
            midi: MidiConfig {
                device: Some(legacy.selected_midi_device).filter(|d| !d.trim().is_empty()),
            },
            obs,
            api: ApiConfig::default(),
            bindings: legacy.bindings,
        }
    }
}

impl From<ConfigFile> for AppConfig {
    fn from(file: ConfigFile) -> Self {
        match file {
            ConfigFile::Full(config) => config,
            ConfigFile::Legacy(legacy) => legacy.into(),
            ConfigFile::Bindings(bindings) => AppConfig {
                bindings,
                ..AppConfig::default()
            },
        }
    }
}

impl AppConfig {
    /// Parse configuration text
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self> {
        let file: ConfigFile = match format {
            ConfigFormat::Json => {
                serde_json::from_str(contents).context("Failed to parse JSON config")?
            },
            ConfigFormat::Yaml if contents.trim().is_empty() => {
                ConfigFile::Full(AppConfig::default())
            },
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).context("Failed to parse YAML config")?
            },
        };
        Ok(file.into())
    }

    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&contents, ConfigFormat::for_path(path))
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the default config
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            info!(
                "No config at {}, starting with defaults (no device, no bindings)",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path).await
    }

    /// Save configuration to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let text = match ConfigFormat::for_path(path) {
            ConfigFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?
            },
            ConfigFormat::Yaml => {
                serde_yaml::to_string(self).context("Failed to serialize config to YAML")?
            },
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(device) = &self.midi.device {
            if device.trim().is_empty() {
                anyhow::bail!("midi.device cannot be empty (omit it to disable input)");
            }
        }

        if self.obs.host.trim().is_empty() {
            anyhow::bail!("obs.host cannot be empty");
        }
        if self.obs.port == 0 {
            anyhow::bail!("obs.port must be non-zero");
        }
        if self.api.port == 0 {
            anyhow::bail!("api.port must be non-zero");
        }

        for (idx, binding) in self.bindings.iter().enumerate() {
            validate_binding(binding).with_context(|| {
                format!(
                    "Invalid binding #{} ({:?} on ch:{} control:{})",
                    idx, binding.kind, binding.channel, binding.control
                )
            })?;
        }

        Ok(())
    }

    /// Immutable binding table built from this config
    pub fn binding_table(&self) -> BindingTable {
        BindingTable::new(self.bindings.clone())
    }
}

/// Validate a single binding
fn validate_binding(binding: &Binding) -> Result<()> {
    if binding.channel != UNUSED_CHANNEL && !(0..=16).contains(&binding.channel) {
        anyhow::bail!(
            "channel {} is invalid (must be 0-16, or {} for unused)",
            binding.channel,
            UNUSED_CHANNEL
        );
    }

    if !(0..=127).contains(&binding.control) {
        anyhow::bail!("control {} is invalid (must be 0-127)", binding.control);
    }

    if binding.kind.requires_target() && binding.target.trim().is_empty() {
        anyhow::bail!("{:?} requires a target", binding.kind);
    }

    match binding.kind {
        ActionKind::KeyboardKey => {
            parse_key_code(&binding.data)?;
        },
        ActionKind::HttpRequest => {
            parse_url(&binding.target)?;
        },
        _ => {},
    }

    Ok(())
}

// Default value functions
fn default_obs_host() -> String { "localhost".to_string() }
fn default_obs_port() -> u16 { 4455 }
fn default_api_port() -> u16 { 5000 }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
midi:
  device: nanoKONTROL2
obs:
  host: 127.0.0.1
  password: hunter2
  volume_mode: decibel
bindings:
  - { channel: 1, control: 7, continuous: true, action: SystemVolume }
  - { channel: 1, control: 36, continuous: false, action: ObsMute, target: Mic }
  - { channel: 1, control: 37, continuous: false, action: KeyboardKey, data: "0xB3" }
"#;

    #[test]
    fn test_parse_yaml_with_defaults() {
        let config = AppConfig::parse(SAMPLE, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.midi.device.as_deref(), Some("nanoKONTROL2"));
        assert_eq!(config.obs.port, 4455);
        assert_eq!(config.obs.volume_mode, VolumeMode::Decibel);
        assert_eq!(config.api.port, 5000);
        assert_eq!(config.bindings.len(), 3);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(
            AppConfig::parse("  \n", ConfigFormat::Yaml).unwrap(),
            AppConfig::default()
        );
    }

    #[test]
    fn test_legacy_binding_list() {
        let json = r#"[
            {"Channel": 1, "Note": 7, "IsControlChange": true, "Type": "SystemVolume", "Target": "", "Data": ""},
            {"Channel": -1, "Note": 0, "IsControlChange": false, "Type": "MediaNext"}
        ]"#;
        let config = AppConfig::parse(json, ConfigFormat::Json).unwrap();

        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[1].channel, UNUSED_CHANNEL);
        assert_eq!(config.obs, ObsConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_legacy_desktop_config_object() {
        let json = r#"{
            "ObsUrl": "ws://192.168.1.20:4460",
            "ObsPassword": "hunter2",
            "SelectedMidiDevice": "nanoKONTROL2",
            "Bindings": [
                {"Channel": 1, "Note": 7, "IsControlChange": true, "Type": "SystemVolume"},
                {"Channel": 1, "Note": 36, "IsControlChange": false, "Type": "ObsMute", "Target": "Mic"}
            ]
        }"#;
        let config = AppConfig::parse(json, ConfigFormat::Json).unwrap();

        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[1].target, "Mic");
        assert_eq!(config.midi.device.as_deref(), Some("nanoKONTROL2"));
        assert_eq!(config.obs.host, "192.168.1.20");
        assert_eq!(config.obs.port, 4460);
        assert_eq!(config.obs.password.as_deref(), Some("hunter2"));
        assert_eq!(config.api, ApiConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_legacy_desktop_config_empty_fields() {
        let json = r#"{"ObsUrl": "", "ObsPassword": "", "SelectedMidiDevice": "", "Bindings": []}"#;
        assert_eq!(AppConfig::parse(json, ConfigFormat::Json).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::for_path(Path::new("a/bindings.JSON")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::for_path(Path::new("config.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::for_path(Path::new("config")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_validate_rejects_bad_bindings() {
        let cases = [
            Binding::new(17, 1, false, ActionKind::MediaNext),
            Binding::new(-2, 1, false, ActionKind::MediaNext),
            Binding::new(1, 128, false, ActionKind::MediaNext),
            Binding::new(1, 1, false, ActionKind::ObsSwitchScene),
            Binding::new(1, 1, false, ActionKind::KeyboardKey).with_data("0"),
            Binding::new(1, 1, false, ActionKind::HttpRequest).with_target("localhost:80"),
        ];

        for binding in cases {
            let config = AppConfig {
                bindings: vec![binding.clone()],
                ..AppConfig::default()
            };
            assert!(config.validate().is_err(), "{:?} should be rejected", binding);
        }
    }

    #[test]
    fn test_validate_rejects_zero_api_port() {
        let mut config = AppConfig::default();
        config.api.port = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_preserve_format() -> Result<()> {
        let dir = TempDir::new()?;
        let original = AppConfig::parse(SAMPLE, ConfigFormat::Yaml)?;

        for name in ["config.yaml", "nested/config.json"] {
            let path = dir.path().join(name);
            original.save(&path).await?;
            assert_eq!(AppConfig::load(&path).await?, original);
        }

        let json = std::fs::read_to_string(dir.path().join("nested/config.json"))?;
        assert!(json.trim_start().starts_with('{'));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_loads_default() -> Result<()> {
        let dir = TempDir::new()?;
        let config = AppConfig::load_or_default(&dir.path().join("absent.yaml")).await?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }
}
