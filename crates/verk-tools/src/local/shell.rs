// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::providers::{CancelToken, CommandOutput, CommandRequest, OutputSink, ShellProvider};

/// Shell provider that runs commands as local child processes.
pub struct LocalShell {
    /// Working directory for spawned commands.
    pub workdir: Option<PathBuf>,
    /// Default timeout applied when the request does not carry one.
    pub timeout_secs: u64,
}

impl Default for LocalShell {
    fn default() -> Self {
        Self { workdir: None, timeout_secs: 120 }
    }
}

impl LocalShell {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: Some(workdir.into()), ..Self::default() }
    }
}

#[async_trait]
impl ShellProvider for LocalShell {
    async fn execute(
        &self,
        request: CommandRequest,
        sink: &dyn OutputSink,
        cancel: &CancelToken,
    ) -> anyhow::Result<CommandOutput> {
        let mut cmd = if request.shell || request.args.is_empty() {
            let mut c = Command::new("bash");
            c.arg("-c").arg(&request.command);
            c
        } else {
            let mut c = Command::new(&request.command);
            c.args(&request.args);
            c
        };

        debug!(command = %request.command, "executing command");

        // Isolate the child from any controlling terminal and make sure a
        // timed-out or cancelled future takes the process down with it.
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        if let Some(wd) = &self.workdir {
            cmd.current_dir(wd);
        }

        let mut child = cmd.spawn().with_context(|| {
            format!("failed to spawn command: {}", request.command)
        })?;

        let stdout = child.stdout.take().context("child stdout unavailable")?;
        let stderr = child.stderr.take().context("child stderr unavailable")?;

        let read_streams = async {
            let mut out_lines = BufReader::new(stdout).lines();
            let mut err_lines = BufReader::new(stderr).lines();
            let mut stdout_buf = String::new();
            let mut stderr_buf = String::new();
            let mut out_done = false;
            let mut err_done = false;
            while !(out_done && err_done) {
                tokio::select! {
                    line = out_lines.next_line(), if !out_done => match line? {
                        Some(line) => {
                            sink.stdout_line(&line);
                            stdout_buf.push_str(&line);
                            stdout_buf.push('\n');
                        }
                        None => out_done = true,
                    },
                    line = err_lines.next_line(), if !err_done => match line? {
                        Some(line) => {
                            sink.stderr_line(&line);
                            stderr_buf.push_str(&line);
                            stderr_buf.push('\n');
                        }
                        None => err_done = true,
                    },
                }
            }
            anyhow::Ok((stdout_buf, stderr_buf))
        };

        let timeout = std::time::Duration::from_secs(
            request.timeout_secs.unwrap_or(self.timeout_secs),
        );

        let gathered = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                anyhow::bail!("command cancelled: {}", request.command);
            }
            result = tokio::time::timeout(timeout, read_streams) => match result {
                Ok(streams) => streams?,
                Err(_) => {
                    let _ = child.start_kill();
                    anyhow::bail!(
                        "command timed out after {}s: {}",
                        timeout.as_secs(),
                        request.command
                    );
                }
            },
        };

        let status = child.wait().await?;
        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: gathered.0,
            stderr: gathered.1,
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
