// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Best-effort teardown of every module we may have loaded.

use crate::audio::pactl::Pactl;
use crate::audio::types::{ModuleHandle, ModuleRegistry};
use tracing::{debug, info, warn};

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub unloaded: usize,
    pub failed: usize,
}

impl CleanupReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.unloaded += 1;
        } else {
            self.failed += 1;
        }
    }
}

async fn unload(pactl: &Pactl, handle: ModuleHandle, what: &str) -> bool {
    match pactl.unload_module(handle).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to unload {} (module {}): {}", what, handle, e);
            false
        }
    }
}

/// Unload every handle held in the registry, leaving it empty.
pub async fn unload_held(pactl: &Pactl, registry: &ModuleRegistry) -> CleanupReport {
    let mut report = CleanupReport::default();
    for (slot, handle) in registry.take_all() {
        debug!("Unloading {} (module {})", slot, handle);
        report.record(unload(pactl, handle, &slot.to_string()).await);
    }
    report
}

/// Unload any module whose listing mentions `prefix`.
///
/// Catches modules left behind by a previous run that exited without
/// cleaning up.
pub async fn sweep_stale_modules(pactl: &Pactl, prefix: &str) -> CleanupReport {
    let mut report = CleanupReport::default();

    // A blank prefix is contained in every listing.
    if prefix.trim().is_empty() {
        warn!("Refusing to sweep modules with a blank prefix");
        return report;
    }

    let modules = match pactl.list_modules().await {
        Ok(modules) => modules,
        Err(e) => {
            warn!("Failed to list modules for stale cleanup: {}", e);
            return report;
        }
    };

    let stale: Vec<_> = modules.into_iter().filter(|m| m.mentions(prefix)).collect();
    if stale.is_empty() {
        debug!("No stale {} modules found", prefix);
        return report;
    }

    info!("Found {} stale {} modules, unloading", stale.len(), prefix);
    for module in stale {
        report.record(unload(pactl, module.handle, &module.name).await);
    }
    report
}

/// Unload held handles, then sweep for stragglers.
pub async fn cleanup(pactl: &Pactl, registry: &ModuleRegistry, prefix: &str) -> CleanupReport {
    let held = unload_held(pactl, registry).await;
    let stale = sweep_stale_modules(pactl, prefix).await;
    let report = CleanupReport {
        unloaded: held.unloaded + stale.unloaded,
        failed: held.failed + stale.failed,
    };
    info!(
        "Cleanup finished: {} unloaded, {} failed",
        report.unloaded, report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::command::fake::FakeRunner;
    use crate::audio::types::Slot;
    use std::sync::Arc;

    const MODULES: &str = "0\tmodule-device-restore\t\t\n\
                           24\tmodule-null-sink\tsink_name=FleuveNullSink\t\n\
                           25\tmodule-combine-sink\tslaves=FleuveNullSink,alsa_output.pci-0 sink_name=FleuveCombinedSink\t\n\
                           26\tmodule-loopback\tlatency_msec=1 sink=FleuveNullSink\t\n\
                           27\tmodule-loopback\tlatency_msec=5 sink=OtherSink\t\n";

    #[tokio::test]
    async fn test_sweep_unloads_prefixed_modules() {
        let fake = Arc::new(FakeRunner::new());
        fake.respond("pactl list short modules", MODULES);
        let pactl = Pactl::new(fake.clone());

        let report = sweep_stale_modules(&pactl, "Fleuve").await;

        assert_eq!(report, CleanupReport { unloaded: 3, failed: 0 });
        assert_eq!(
            fake.calls_matching("pactl unload-module"),
            vec![
                "pactl unload-module 24",
                "pactl unload-module 25",
                "pactl unload-module 26",
            ]
        );
    }

    #[tokio::test]
    async fn test_sweep_listing_failure_is_swallowed() {
        let fake = Arc::new(FakeRunner::new());
        fake.fail("pactl list short modules", "Connection failure");
        let pactl = Pactl::new(fake.clone());

        assert_eq!(sweep_stale_modules(&pactl, "Fleuve").await, CleanupReport::default());
        assert!(fake.calls_matching("pactl unload-module").is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_continues_past_failures() {
        let fake = Arc::new(FakeRunner::new());
        fake.fail("pactl unload-module 11", "Failure: No such entity");
        let pactl = Pactl::new(fake.clone());
        let registry = ModuleRegistry::new();
        registry.set(Slot::NullSink, ModuleHandle(10));
        registry.set(Slot::CombinedSink, ModuleHandle(11));
        registry.set(Slot::AudibleLoopback, ModuleHandle(13));

        let report = cleanup(&pactl, &registry, "Fleuve").await;

        assert_eq!(report, CleanupReport { unloaded: 2, failed: 1 });
        assert_eq!(
            fake.calls(),
            vec![
                "pactl unload-module 13",
                "pactl unload-module 11",
                "pactl unload-module 10",
                "pactl list short modules",
            ]
        );
        assert!(registry.take_all().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_refuses_blank_prefix() {
        let fake = Arc::new(FakeRunner::new());
        fake.respond("pactl list short modules", MODULES);
        let pactl = Pactl::new(fake.clone());

        for blank in ["", "  "] {
            assert_eq!(sweep_stale_modules(&pactl, blank).await, CleanupReport::default());
        }
        assert!(fake.calls().is_empty());
    }
}
