// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Typed wrappers around `pactl` and `pacmd`.

use crate::audio::command::{command_line, CommandError, CommandRunner};
use crate::audio::types::{ModuleEntry, ModuleHandle, SinkEntry};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

const PACTL: &str = "pactl";
const PACMD: &str = "pacmd";

#[derive(Debug, Error)]
pub enum PulseError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Unexpected result from `{command}`: {output:?}")]
    UnexpectedResult { command: String, output: String },
    #[error("No hardware output sink matching '{pattern}'")]
    NoHardwareOutput { pattern: String },
}

/// Parse a module handle from the complete output of a `load-module` call.
pub fn parse_module_handle(command: &str, output: &str) -> Result<ModuleHandle, PulseError> {
    output
        .trim()
        .parse::<u32>()
        .map(ModuleHandle)
        .map_err(|_| PulseError::UnexpectedResult {
            command: command.to_string(),
            output: output.to_string(),
        })
}

fn split_row(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Parse `pactl list short modules`.
pub fn parse_modules(output: &str) -> Vec<ModuleEntry> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let fields = split_row(line);
            let handle = fields.first()?.parse::<u32>().ok()?;
            Some(ModuleEntry {
                handle: ModuleHandle(handle),
                name: fields.get(1).unwrap_or(&"").to_string(),
                args: fields.get(2).unwrap_or(&"").to_string(),
            })
        })
        .collect()
}

/// Parse `pactl list short sinks`.
pub fn parse_sinks(output: &str) -> Vec<SinkEntry> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let fields = split_row(line);
            let index = fields.first()?.parse::<u32>().ok()?;
            let name = fields.get(1)?.to_string();
            Some(SinkEntry {
                index,
                name,
                driver: fields.get(2).unwrap_or(&"").to_string(),
            })
        })
        .collect()
}

/// PulseAudio control surface used by the rest of the crate.
#[derive(Clone)]
pub struct Pactl {
    runner: Arc<dyn CommandRunner>,
}

impl Pactl {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn pactl(&self, args: Vec<String>) -> Result<String, PulseError> {
        Ok(self.runner.run(PACTL, &args).await?)
    }

    /// Load a module and return the handle the server assigned to it.
    pub async fn load_module(
        &self,
        module: &str,
        module_args: &[String],
    ) -> Result<ModuleHandle, PulseError> {
        let mut args = vec!["load-module".to_string(), module.to_string()];
        args.extend(module_args.iter().cloned());

        let output = self.runner.run(PACTL, &args).await?;
        let handle = parse_module_handle(&command_line(PACTL, &args), &output)?;
        info!("Loaded {} as module {}", module, handle);
        Ok(handle)
    }

    pub async fn unload_module(&self, handle: ModuleHandle) -> Result<(), PulseError> {
        self.pactl(vec!["unload-module".to_string(), handle.to_string()])
            .await?;
        info!("Unloaded module {}", handle);
        Ok(())
    }

    /// Set `device.description` on a sink.
    ///
    /// `pacmd` re-joins its arguments into one command line, so the quoted
    /// value is passed through verbatim rather than escaped.
    pub async fn set_sink_description(&self, sink: &str, text: &str) -> Result<(), PulseError> {
        self.update_proplist("update-sink-proplist", sink, text).await
    }

    /// Set `device.description` on a source (e.g. a sink's monitor).
    pub async fn set_source_description(
        &self,
        source: &str,
        text: &str,
    ) -> Result<(), PulseError> {
        self.update_proplist("update-source-proplist", source, text)
            .await
    }

    async fn update_proplist(
        &self,
        command: &str,
        target: &str,
        text: &str,
    ) -> Result<(), PulseError> {
        debug!("Setting description of {} to '{}'", target, text);
        let args = vec![
            command.to_string(),
            target.to_string(),
            format!("device.description=\"{}\"", text),
        ];
        self.runner.run(PACMD, &args).await?;
        Ok(())
    }

    pub async fn list_modules(&self) -> Result<Vec<ModuleEntry>, PulseError> {
        let output = self
            .pactl(vec!["list".into(), "short".into(), "modules".into()])
            .await?;
        Ok(parse_modules(&output))
    }

    pub async fn list_sinks(&self) -> Result<Vec<SinkEntry>, PulseError> {
        let output = self
            .pactl(vec!["list".into(), "short".into(), "sinks".into()])
            .await?;
        Ok(parse_sinks(&output))
    }
}
