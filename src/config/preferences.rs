// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Persisted loopback preferences.
//!
//! Two booleans remembered across restarts so loopbacks the user left on are
//! restored at the next startup.

use crate::config::ConfigError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Keys understood by [`PreferenceStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    MicLoopbackEnabled,
    AudibleLoopbackEnabled,
}

impl PreferenceKey {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKey::MicLoopbackEnabled => "micLoopbackEnabled",
            PreferenceKey::AudibleLoopbackEnabled => "audibleLoopbackEnabled",
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk preference record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub mic_loopback_enabled: bool,
    pub audible_loopback_enabled: bool,
}

impl Preferences {
    pub fn get(&self, key: PreferenceKey) -> bool {
        match key {
            PreferenceKey::MicLoopbackEnabled => self.mic_loopback_enabled,
            PreferenceKey::AudibleLoopbackEnabled => self.audible_loopback_enabled,
        }
    }

    fn set(&mut self, key: PreferenceKey, value: bool) {
        match key {
            PreferenceKey::MicLoopbackEnabled => self.mic_loopback_enabled = value,
            PreferenceKey::AudibleLoopbackEnabled => self.audible_loopback_enabled = value,
        }
    }
}

/// Typed get/set over the preferences file.
///
/// Values are cached in memory; every `set` rewrites the file before
/// returning, so a later `get` never observes a stale value.
pub struct PreferenceStore {
    path: PathBuf,
    values: Mutex<Preferences>,
}

impl PreferenceStore {
    /// Open the store at `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Preferences>(&content) {
                Ok(prefs) => {
                    debug!("Loaded preferences from {:?}: {:?}", path, prefs);
                    prefs
                }
                Err(e) => {
                    warn!("Ignoring malformed preferences at {:?}: {}", path, e);
                    Preferences::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Preferences::default(),
            Err(e) => {
                warn!("Failed to read preferences at {:?}: {}", path, e);
                Preferences::default()
            }
        };

        Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        }
    }

    pub fn get(&self, key: PreferenceKey) -> bool {
        self.values.lock().get(key)
    }

    pub fn set(&self, key: PreferenceKey, value: bool) -> Result<(), ConfigError> {
        let mut values = self.values.lock();
        values.set(key, value);
        let content = toml::to_string_pretty(&*values)?;
        fs::write(&self.path, content)?;
        debug!("Saved preference {} = {}", key, value);
        Ok(())
    }

    pub fn snapshot(&self) -> Preferences {
        *self.values.lock()
    }
}
