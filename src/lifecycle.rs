// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shutdown coordination.
//!
//! Several things can end the process: the tray's Exit item, a termination
//! signal, the tray going away, or a fatal startup error. Whichever arrives
//! first runs the cleanup; the rest find the guard already taken.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tracing::debug;

const IDLE: u8 = 0;
const CLEANING_UP: u8 = 1;
const DONE: u8 = 2;

/// Progress of the one shutdown cleanup a process gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupState {
    Idle,
    CleaningUp,
    Done,
}

/// Single-assignment gate for the shutdown cleanup.
#[derive(Debug)]
pub struct ShutdownGuard {
    state: AtomicU8,
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownGuard {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    pub fn state(&self) -> CleanupState {
        match self.state.load(Ordering::Acquire) {
            IDLE => CleanupState::Idle,
            CLEANING_UP => CleanupState::CleaningUp,
            _ => CleanupState::Done,
        }
    }

    /// Move Idle -> CleaningUp. Only the first caller gets `true`.
    pub fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(IDLE, CLEANING_UP, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark the attempt finished, whatever its outcome.
    pub fn finish(&self) {
        self.state.store(DONE, Ordering::Release);
    }

    /// Run `cleanup` if no other trigger has; `None` means it was skipped.
    pub async fn run<F, T>(&self, cleanup: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if !self.try_begin() {
            debug!("Cleanup already {:?}, skipping", self.state());
            return None;
        }
        let out = cleanup.await;
        self.finish();
        Some(out)
    }
}

/// Termination signals that end the process.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
    hangup: Signal,
}

impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }

    /// Deliver signal names on a channel until the receiver is dropped.
    pub fn forward(mut self) -> mpsc::UnboundedReceiver<&'static str> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                let name = self.recv().await;
                if tx.send(name).is_err() {
                    break;
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_state_transitions() {
        let guard = ShutdownGuard::new();
        assert_eq!(guard.state(), CleanupState::Idle);
        assert!(guard.try_begin());
        assert_eq!(guard.state(), CleanupState::CleaningUp);
        assert!(!guard.try_begin());
        guard.finish();
        assert_eq!(guard.state(), CleanupState::Done);
        assert!(!guard.try_begin());
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let guard = ShutdownGuard::new();
        assert_eq!(guard.run(async { 1 }).await, Some(1));
        assert_eq!(guard.run(async { 2 }).await, None);
        assert_eq!(guard.state(), CleanupState::Done);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_triggers_run_once() {
        let guard = Arc::new(ShutdownGuard::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    guard
                        .run(async {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        })
                        .await
                })
            })
            .collect();

        let mut ran = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                ran += 1;
            }
        }

        assert_eq!(ran, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state(), CleanupState::Done);
    }
}
