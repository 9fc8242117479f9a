// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Application configuration (audio server parameters, tray behavior).

use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_MODULE_PREFIX: &str = "Fleuve";

/// Audio server parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Substring identifying the hardware output sink to combine with.
    pub hardware_sink_pattern: String,
    /// `latency_msec` passed to every loopback module.
    pub loopback_latency_msec: u32,
    /// Modules whose listing mentions this are ours and get swept on cleanup.
    pub module_prefix: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            hardware_sink_pattern: "alsa_output.pci".to_string(),
            loopback_latency_msec: 1,
            module_prefix: DEFAULT_MODULE_PREFIX.to_string(),
        }
    }
}

/// Tray settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    /// Program launched by "Volume Control".
    pub mixer_command: String,
    /// Icon theme name for the tray icon.
    pub icon_name: String,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            mixer_command: "pavucontrol".to_string(),
            icon_name: "audio-card".to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub tray: TrayConfig,
}

impl AppConfig {
    /// Load config from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Replace values that cannot be used as given with their defaults.
    ///
    /// A blank `module_prefix` would match every module on the server.
    pub fn normalized(mut self) -> Self {
        if self.audio.module_prefix.trim().is_empty() {
            warn!(
                "module_prefix is blank, using \"{}\" instead",
                DEFAULT_MODULE_PREFIX
            );
            self.audio.module_prefix = DEFAULT_MODULE_PREFIX.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.audio.loopback_latency_msec, 1);
        assert_eq!(config.tray.mixer_command, "pavucontrol");
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_toml(
            r#"
            [audio]
            hardware_sink_pattern = "alsa_output.usb"
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.hardware_sink_pattern, "alsa_output.usb");
        assert_eq!(config.audio.module_prefix, "Fleuve");
        assert_eq!(config.tray, TrayConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.tray.mixer_command = "pwvucontrol".to_string();
        let parsed = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_blank_module_prefix_falls_back() {
        for blank in ["", "   ", "\t"] {
            let mut config = AppConfig::default();
            config.audio.module_prefix = blank.to_string();
            assert_eq!(config.normalized().audio.module_prefix, "Fleuve");
        }

        let mut config = AppConfig::default();
        config.audio.module_prefix = "MySinks".to_string();
        assert_eq!(config.clone().normalized(), config);
    }
}
