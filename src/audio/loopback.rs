// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Loopback routes that copy the default input into one of our sinks.

use crate::audio::pactl::{Pactl, PulseError};
use crate::audio::types::{ModuleHandle, ModuleRegistry, SinkIdentity, Slot, COMBINED_SINK, NULL_SINK};
use crate::config::{PreferenceKey, PreferenceStore};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The two independently switchable loopbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Microphone into the null sink, for apps recording its monitor.
    Mic,
    /// Microphone into the combined sink, so it is also heard locally.
    Audible,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::Mic, Route::Audible];

    /// Menu label.
    pub fn title(self) -> &'static str {
        match self {
            Route::Mic => "Mic Loopback",
            Route::Audible => "Audible Loopback",
        }
    }

    pub fn preference_key(self) -> PreferenceKey {
        match self {
            Route::Mic => PreferenceKey::MicLoopbackEnabled,
            Route::Audible => PreferenceKey::AudibleLoopbackEnabled,
        }
    }

    pub fn slot(self) -> Slot {
        match self {
            Route::Mic => Slot::MicLoopback,
            Route::Audible => Slot::AudibleLoopback,
        }
    }

    pub fn target_sink(self) -> SinkIdentity {
        match self {
            Route::Mic => NULL_SINK,
            Route::Audible => COMBINED_SINK,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Switches one route's loopback module on and off.
///
/// The module handle lives in the shared [`ModuleRegistry`] under the
/// route's slot, and the route's preference is written in step with it.
/// Overlapping toggles are not serialized: each click acts on whatever the
/// registry holds when it starts.
pub struct LoopbackToggle {
    route: Route,
    pactl: Pactl,
    registry: Arc<ModuleRegistry>,
    preferences: Arc<PreferenceStore>,
    latency_msec: u32,
}

impl LoopbackToggle {
    pub fn new(
        route: Route,
        pactl: Pactl,
        registry: Arc<ModuleRegistry>,
        preferences: Arc<PreferenceStore>,
        latency_msec: u32,
    ) -> Self {
        Self {
            route,
            pactl,
            registry,
            preferences,
            latency_msec,
        }
    }

    /// Whether the loopback module is currently loaded.
    pub fn is_active(&self) -> bool {
        self.registry.get(self.route.slot()).is_some()
    }

    async fn load(&self) -> Result<ModuleHandle, PulseError> {
        let handle = self
            .pactl
            .load_module(
                "module-loopback",
                &[
                    format!("latency_msec={}", self.latency_msec),
                    format!("sink={}", self.route.target_sink().name),
                ],
            )
            .await?;
        self.registry.set(self.route.slot(), handle);
        Ok(handle)
    }

    /// Load the loopback if it was left enabled last session.
    ///
    /// The preference already reads `true`, so nothing is written.
    pub async fn restore(&self) -> Result<bool, PulseError> {
        if self.preferences.get(self.route.preference_key()) && !self.is_active() {
            let handle = self.load().await?;
            info!("Restored {} (module {})", self.route, handle);
        }
        Ok(self.is_active())
    }

    /// Flip the route and return the new checked state.
    ///
    /// A load whose output is not a module index is returned as an error:
    /// the module may exist without a handle to unload it by. Any other
    /// failure is logged and the state stays as the server reports it.
    pub async fn toggle(&self) -> Result<bool, PulseError> {
        let key = self.route.preference_key();

        match self.registry.take(self.route.slot()) {
            None => match self.load().await {
                Ok(handle) => {
                    info!("{} enabled (module {})", self.route, handle);
                    self.persist(key, true);
                }
                Err(e @ PulseError::UnexpectedResult { .. }) => return Err(e),
                Err(e) => error!("Failed to enable {}: {}", self.route, e),
            },
            Some(handle) => {
                if let Err(e) = self.pactl.unload_module(handle).await {
                    warn!(
                        "Failed to unload {} module {}: {}",
                        self.route, handle, e
                    );
                }
                info!("{} disabled", self.route);
                self.persist(key, false);
            }
        }

        Ok(self.is_active())
    }

    fn persist(&self, key: PreferenceKey, value: bool) {
        if let Err(e) = self.preferences.set(key, value) {
            warn!("Failed to save preference {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::command::fake::FakeRunner;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        fake: Arc<FakeRunner>,
        registry: Arc<ModuleRegistry>,
        preferences: Arc<PreferenceStore>,
        _dir: TempDir,
    }

    impl Fixture {
        fn new(preferences_toml: Option<&str>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("preferences.toml");
            if let Some(content) = preferences_toml {
                fs::write(&path, content).unwrap();
            }
            Self {
                fake: Arc::new(FakeRunner::new()),
                registry: Arc::new(ModuleRegistry::new()),
                preferences: Arc::new(PreferenceStore::open(&path)),
                _dir: dir,
            }
        }

        fn toggle(&self, route: Route) -> LoopbackToggle {
            LoopbackToggle::new(
                route,
                Pactl::new(self.fake.clone()),
                self.registry.clone(),
                self.preferences.clone(),
                1,
            )
        }
    }

    #[test]
    fn test_route_wiring() {
        assert_eq!(Route::Mic.target_sink(), NULL_SINK);
        assert_eq!(Route::Audible.target_sink(), COMBINED_SINK);
        assert_eq!(Route::Mic.preference_key(), PreferenceKey::MicLoopbackEnabled);
        assert_eq!(Route::Audible.slot(), Slot::AudibleLoopback);
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let fx = Fixture::new(None);
        fx.fake.respond("pactl load-module module-loopback", "40\n");
        let mic = fx.toggle(Route::Mic);

        assert!(mic.toggle().await.unwrap());
        assert_eq!(fx.registry.get(Slot::MicLoopback), Some(ModuleHandle(40)));
        assert!(fx.preferences.get(PreferenceKey::MicLoopbackEnabled));

        assert!(!mic.toggle().await.unwrap());
        assert_eq!(fx.registry.get(Slot::MicLoopback), None);
        assert!(!fx.preferences.get(PreferenceKey::MicLoopbackEnabled));

        assert_eq!(
            fx.fake.calls(),
            vec![
                "pactl load-module module-loopback latency_msec=1 sink=FleuveNullSink",
                "pactl unload-module 40",
            ]
        );
    }

    #[tokio::test]
    async fn test_audible_targets_combined_sink() {
        let fx = Fixture::new(None);
        fx.fake.respond("pactl load-module module-loopback", "41");

        assert!(fx.toggle(Route::Audible).toggle().await.unwrap());
        assert_eq!(
            fx.fake.calls(),
            vec!["pactl load-module module-loopback latency_msec=1 sink=FleuveCombinedSink"]
        );
        assert_eq!(fx.registry.get(Slot::MicLoopback), None);
    }

    #[tokio::test]
    async fn test_failed_load_stays_unchecked() {
        let fx = Fixture::new(None);
        fx.fake.fail("pactl load-module module-loopback", "Failure: Module initialization failed");

        assert!(!fx.toggle(Route::Mic).toggle().await.unwrap());
        assert_eq!(fx.registry.get(Slot::MicLoopback), None);
        assert!(!fx.preferences.get(PreferenceKey::MicLoopbackEnabled));
    }

    #[tokio::test]
    async fn test_non_numeric_load_output_is_an_error() {
        let fx = Fixture::new(None);
        fx.fake.respond("pactl load-module module-loopback", "error: permission denied");

        let err = fx.toggle(Route::Mic).toggle().await.unwrap_err();

        assert!(matches!(err, PulseError::UnexpectedResult { .. }));
        assert_eq!(fx.registry.get(Slot::MicLoopback), None);
        assert!(!fx.preferences.get(PreferenceKey::MicLoopbackEnabled));
    }

    #[tokio::test]
    async fn test_failed_unload_still_clears() {
        let fx = Fixture::new(None);
        fx.fake
            .respond("pactl load-module module-loopback", "42")
            .fail("pactl unload-module", "Failure: No such entity");
        let audible = fx.toggle(Route::Audible);

        assert!(audible.toggle().await.unwrap());
        assert!(!audible.toggle().await.unwrap());
        assert_eq!(fx.registry.get(Slot::AudibleLoopback), None);
        assert!(!fx.preferences.get(PreferenceKey::AudibleLoopbackEnabled));
    }

    #[tokio::test]
    async fn test_restore_loads_without_writing_preferences() {
        let stored = "# kept verbatim\nmicLoopbackEnabled = true\naudibleLoopbackEnabled = false\n";
        let fx = Fixture::new(Some(stored));
        fx.fake.respond("pactl load-module module-loopback", "50");

        assert!(fx.toggle(Route::Mic).restore().await.unwrap());
        assert!(!fx.toggle(Route::Audible).restore().await.unwrap());

        assert_eq!(fx.registry.get(Slot::MicLoopback), Some(ModuleHandle(50)));
        assert_eq!(fx.registry.get(Slot::AudibleLoopback), None);
        assert_eq!(fx.fake.calls().len(), 1);

        let path = fx._dir.path().join("preferences.toml");
        assert_eq!(fs::read_to_string(path).unwrap(), stored);
    }

    #[tokio::test]
    async fn test_restore_propagates_parse_failure() {
        let fx = Fixture::new(Some("micLoopbackEnabled = true\n"));
        fx.fake.respond("pactl load-module module-loopback", "oops");

        let err = fx.toggle(Route::Mic).restore().await.unwrap_err();
        assert!(matches!(err, PulseError::UnexpectedResult { .. }));
    }
}
