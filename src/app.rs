// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Application orchestration: startup, menu dispatch and shutdown.

use crate::audio::cleanup::{self, CleanupReport};
use crate::audio::command::CommandRunner;
use crate::audio::loopback::{LoopbackToggle, Route};
use crate::audio::pactl::{Pactl, PulseError};
use crate::audio::types::ModuleRegistry;
use crate::audio::virtual_sink::SinkProvisioner;
use crate::config::{AppConfig, ConfigError, PreferenceStore, TrayConfig};
use crate::lifecycle::{ShutdownGuard, ShutdownSignals};
use crate::menu::{MenuAction, MenuModel};
use crate::tray::{self, MenuSurface};
use std::future::Future;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Audio server error: {0}")]
    Pulse(#[from] PulseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("System tray error: {0}")]
    Tray(#[from] ksni::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Startup interrupted by a termination signal")]
    Interrupted,
}

/// Launch the external mixer without waiting on it.
///
/// Returns whether the process was spawned.
pub fn launch_mixer(command: &str) -> bool {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        warn!("No mixer command configured");
        return false;
    };

    match Command::new(program)
        .args(parts)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
    {
        Ok(child) => {
            info!("Launched {} (pid {:?})", program, child.id());
            true
        }
        Err(e) => {
            warn!("Failed to launch {}: {}", program, e);
            false
        }
    }
}

/// Top-level state: owns the module registry and both loopback routes.
pub struct Fleuve {
    config: AppConfig,
    pactl: Pactl,
    registry: Arc<ModuleRegistry>,
    mic: Arc<LoopbackToggle>,
    audible: Arc<LoopbackToggle>,
    guard: ShutdownGuard,
    /// Set when a signal arrives during startup.
    stopping: AtomicBool,
}

impl Fleuve {
    pub fn new(
        config: AppConfig,
        runner: Arc<dyn CommandRunner>,
        preferences: PreferenceStore,
    ) -> Self {
        let config = config.normalized();
        let pactl = Pactl::new(runner);
        let registry = Arc::new(ModuleRegistry::new());
        let preferences = Arc::new(preferences);
        let latency = config.audio.loopback_latency_msec;

        let make_toggle = |route| {
            Arc::new(LoopbackToggle::new(
                route,
                pactl.clone(),
                registry.clone(),
                preferences.clone(),
                latency,
            ))
        };
        let mic = make_toggle(Route::Mic);
        let audible = make_toggle(Route::Audible);

        Self {
            config,
            pactl,
            registry,
            mic,
            audible,
            guard: ShutdownGuard::new(),
            stopping: AtomicBool::new(false),
        }
    }

    pub fn toggle(&self, route: Route) -> &Arc<LoopbackToggle> {
        match route {
            Route::Mic => &self.mic,
            Route::Audible => &self.audible,
        }
    }

    /// Sweep leftovers, build the sinks and restore saved loopbacks.
    ///
    /// Any error here is fatal: no loopback is loaded on a half-built sink
    /// topology and the tray is never shown. Once `stopping` is set the
    /// sequence ends at the next step boundary, so a command already
    /// running finishes and its module is registered before cleanup.
    pub async fn start(&self) -> Result<MenuModel, AppError> {
        let prefix = &self.config.audio.module_prefix;
        cleanup::cleanup(&self.pactl, &self.registry, prefix).await;
        self.check_stopping()?;

        let provisioner = SinkProvisioner::new(
            self.pactl.clone(),
            self.registry.clone(),
            &self.config.audio.hardware_sink_pattern,
        );
        let hardware = provisioner.provision().await?;
        info!("Sinks ready (hardware output: {})", hardware);

        let mut model = MenuModel::default();
        for route in Route::ALL {
            self.check_stopping()?;
            let active = self.toggle(route).restore().await?;
            model.set_checked(route, active);
        }
        Ok(model)
    }

    fn check_stopping(&self) -> Result<(), AppError> {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(AppError::Interrupted);
        }
        Ok(())
    }

    /// Run the shutdown cleanup unless another trigger already has.
    pub async fn shutdown(&self) -> Option<CleanupReport> {
        self.guard
            .run(cleanup::cleanup(
                &self.pactl,
                &self.registry,
                &self.config.audio.module_prefix,
            ))
            .await
    }

    fn dispatch<T: MenuSurface>(
        &self,
        action: MenuAction,
        tray: &T,
        fatal: &UnboundedSender<PulseError>,
    ) {
        match action {
            MenuAction::Toggle(route) => {
                let toggle = self.toggle(route).clone();
                let tray = tray.clone();
                let fatal = fatal.clone();
                tokio::spawn(async move {
                    match toggle.toggle().await {
                        Ok(checked) => tray.set_checked(route, checked).await,
                        Err(e) => {
                            let _ = fatal.send(e);
                        }
                    }
                });
            }
            MenuAction::OpenMixer => {
                launch_mixer(&self.config.tray.mixer_command);
            }
            MenuAction::Exit => {}
        }
    }

    /// Run until Exit, a termination signal, or a fatal error.
    pub async fn run(self) -> Result<(), AppError> {
        let stop = ShutdownSignals::install()?.forward();
        self.run_with(stop, |tx, model, config| async move {
            Ok::<_, AppError>(tray::start_tray(tx, model, &config).await?)
        })
        .await
    }

    /// Event loop behind [`Fleuve::run`].
    ///
    /// `stop` carries the names of termination signals. `start_tray` is
    /// only called once startup has succeeded.
    pub async fn run_with<T, S, Fut>(
        self,
        mut stop: UnboundedReceiver<&'static str>,
        start_tray: S,
    ) -> Result<(), AppError>
    where
        T: MenuSurface,
        S: FnOnce(UnboundedSender<MenuAction>, MenuModel, TrayConfig) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let started = {
            let start = self.start();
            tokio::pin!(start);
            tokio::select! {
                result = &mut start => result,
                Some(name) = stop.recv() => {
                    info!("Received {} during startup, stopping after the current step", name);
                    self.stopping.store(true, Ordering::SeqCst);
                    if let Err(e) = start.await {
                        debug!("Startup ended: {}", e);
                    }
                    self.shutdown().await;
                    return Ok(());
                }
            }
        };

        let model = match started {
            Ok(model) => model,
            Err(e) => {
                error!("Startup failed: {}", e);
                self.shutdown().await;
                return Err(e);
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let tray = match start_tray(tx, model, self.config.tray.clone()).await {
            Ok(tray) => tray,
            Err(e) => {
                error!("Failed to start system tray: {}", e);
                self.shutdown().await;
                return Err(e);
            }
        };

        info!("Fleuve ready");

        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let outcome = loop {
            tokio::select! {
                action = rx.recv() => match action {
                    Some(MenuAction::Exit) => {
                        info!("Exit requested from tray");
                        break Ok(());
                    }
                    Some(action) => self.dispatch(action, &tray, &fatal_tx),
                    None => {
                        warn!("Tray service stopped");
                        break Ok(());
                    }
                },
                Some(e) = fatal_rx.recv() => {
                    error!("Loopback toggle failed: {}", e);
                    break Err(AppError::Pulse(e));
                }
                Some(name) = stop.recv() => {
                    info!("Received {}, shutting down", name);
                    break Ok(());
                }
            }
        };

        tray.shutdown();
        self.shutdown().await;
        info!("Fleuve stopped");
        outcome
    }
}
