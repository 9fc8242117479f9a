// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Virtual sink creation: the null sink and the combined sink.

use crate::audio::pactl::{Pactl, PulseError};
use crate::audio::types::{ModuleRegistry, SinkEntry, SinkIdentity, Slot, COMBINED_SINK, NULL_SINK};
use std::sync::Arc;
use tracing::{debug, info};

/// Pick the hardware output to pair with the null sink.
pub fn find_hardware_output<'a>(sinks: &'a [SinkEntry], pattern: &str) -> Option<&'a SinkEntry> {
    sinks.iter().find(|s| s.name.contains(pattern))
}

/// Creates the virtual sinks once at startup.
pub struct SinkProvisioner {
    pactl: Pactl,
    registry: Arc<ModuleRegistry>,
    hardware_pattern: String,
}

impl SinkProvisioner {
    pub fn new(pactl: Pactl, registry: Arc<ModuleRegistry>, hardware_pattern: &str) -> Self {
        Self {
            pactl,
            registry,
            hardware_pattern: hardware_pattern.to_string(),
        }
    }

    /// Build the sink topology.
    ///
    /// Handles are recorded as soon as each module loads, so an error or an
    /// interrupted startup leaves the registry describing exactly what exists.
    /// Returns the name of the hardware sink the combined sink mirrors to.
    pub async fn provision(&self) -> Result<String, PulseError> {
        info!("Creating null sink {}", NULL_SINK.name);
        let null_sink = self
            .pactl
            .load_module(
                "module-null-sink",
                &[format!("sink_name={}", NULL_SINK.name)],
            )
            .await?;
        self.registry.set(Slot::NullSink, null_sink);
        self.describe(&NULL_SINK).await?;

        let sinks = self.pactl.list_sinks().await?;
        let output = find_hardware_output(&sinks, &self.hardware_pattern).ok_or_else(|| {
            PulseError::NoHardwareOutput {
                pattern: self.hardware_pattern.clone(),
            }
        })?;
        debug!(
            "Hardware output sink: {} (index {}, driver {})",
            output.name, output.index, output.driver
        );
        let hardware = output.name.clone();

        info!(
            "Creating combined sink {} over {} and {}",
            COMBINED_SINK.name, NULL_SINK.name, hardware
        );
        let combined = self
            .pactl
            .load_module(
                "module-combine-sink",
                &[
                    format!("slaves={},{}", NULL_SINK.name, hardware),
                    format!("sink_name={}", COMBINED_SINK.name),
                ],
            )
            .await?;
        self.registry.set(Slot::CombinedSink, combined);
        self.describe(&COMBINED_SINK).await?;

        Ok(hardware)
    }

    async fn describe(&self, sink: &SinkIdentity) -> Result<(), PulseError> {
        self.pactl
            .set_sink_description(sink.name, sink.description)
            .await?;
        self.pactl
            .set_source_description(&sink.monitor_name(), &sink.monitor_description())
            .await
    }
}
