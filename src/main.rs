// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fleuve - virtual PulseAudio sinks and mic loopbacks from the system tray.
//!
//! Creates a null sink and a combined sink at startup, offers two loopback
//! toggles in a tray menu, and unloads everything it created on exit.

mod app;
mod audio;
mod config;
mod lifecycle;
mod menu;
mod tray;

use app::{AppError, Fleuve};
use audio::SystemRunner;
use config::{ConfigManager, PreferenceStore};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

async fn run() -> Result<(), AppError> {
    let config_manager = ConfigManager::new()?;
    let config = match config_manager.load_config() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            Default::default()
        }
    };
    if !config_manager.config_path().exists() {
        if let Err(e) = config_manager.save_config(&config) {
            warn!("Failed to write default config: {}", e);
        }
    }

    let preferences = PreferenceStore::open(&config_manager.preferences_path());
    info!("Loaded preferences: {:?}", preferences.snapshot());

    Fleuve::new(config, Arc::new(SystemRunner), preferences)
        .run()
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleuve=debug"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Starting Fleuve");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {}", e);
            eprintln!("fleuve: {}", e);
            ExitCode::FAILURE
        }
    }
}
