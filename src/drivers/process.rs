//! Process launcher
//!
//! Children are started on the calling thread and reaped by a task on the
//! tokio runtime, which logs how they exited.

use super::{EffectorError, ProcessPort};
use std::process::Stdio;
use tokio::process::Command;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Split an argument string on whitespace, keeping double-quoted runs together
///
/// Quotes are removed; an unterminated quote runs to the end of the string.
pub fn split_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in args.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    out.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        out.push(current);
    }
    out
}

/// Starts child processes without waiting for them
pub struct CommandLauncher {
    runtime: Handle,
}

impl CommandLauncher {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl ProcessPort for CommandLauncher {
    fn run_process(&self, path: &str, args: &str) -> Result<(), EffectorError> {
        let argv = split_args(args);

        // tokio's child reaper needs the runtime context at spawn time
        let _guard = self.runtime.enter();
        let mut child = Command::new(path)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EffectorError::Launch {
                path: path.to_string(),
                source,
            })?;

        let pid = child.id().unwrap_or_default();
        info!("🚀 Started '{}' (pid {})", path, pid);

        let path = path.to_string();
        self.runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!("'{}' (pid {}) exited: {}", path, pid, status)
                },
                Ok(status) => warn!("⚠️  '{}' (pid {}) exited: {}", path, pid, status),
                Err(e) => warn!("⚠️  Failed to wait for '{}' (pid {}): {}", path, pid, e),
            }
        });
        Ok(())
    }
}
