// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Subprocess execution for the audio server's control tools.
//!
//! Everything that talks to PulseAudio goes through [`CommandRunner`], so the
//! rest of the crate never touches `tokio::process` directly and tests can
//! substitute a scripted runner.

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with status {status:?}: {stderr}")]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}

/// Runs a program to completion and returns its standard output.
///
/// Arguments are handed to the program as individual argv entries; nothing
/// is interpreted by a shell.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> BoxFuture<'a, Result<String, CommandError>>;
}

/// Render a program invocation for logs and error messages.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run<'a>(
        &'a self,
        program: &'a str,
        args: &'a [String],
    ) -> BoxFuture<'a, Result<String, CommandError>> {
        Box::pin(async move {
            let line = command_line(program, args);
            debug!("Running: {}", line);

            let output = Command::new(program)
                .args(args)
                .output()
                .await
                .map_err(|source| CommandError::Spawn {
                    program: program.to_string(),
                    source,
                })?;

            if !output.status.success() {
                return Err(CommandError::Failed {
                    command: line,
                    status: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            trace!("Output of `{}`: {:?}", line, stdout);
            Ok(stdout)
        })
    }
}
