// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;

use crate::tool::Capability;

/// Raised by an [`InputProvider`] when the user aborts a prompt.
///
/// Task-terminating but never process-terminating: the agent loop maps it
/// to an `Interrupted` exit and the epic orchestrator unwinds cleanly.
#[derive(Debug, Error)]
#[error("cancelled by user")]
pub struct UserCancelledError;

// ─── Cancellation ─────────────────────────────────────────────────────────────

/// Cooperative cancellation flag handed to tool handlers through the
/// provider bundle.  Long-running handlers (child processes, fetches) are
/// expected to observe it and abort early.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve when the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            // Re-check after registering so a cancel between the check and
            // the await is not lost.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

// ─── Memory ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryOp {
    Append,
    Replace,
    Remove,
}

/// Named string slots persisted across tasks.
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    async fn read(&self, topic: &str) -> anyhow::Result<Option<String>>;
    async fn update(&self, op: MemoryOp, topic: &str, content: Option<&str>)
        -> anyhow::Result<()>;
    async fn topics(&self) -> anyhow::Result<Vec<String>>;
}

// ─── To-dos ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Hierarchical id (`1`, `1.2`, `10.3.1`); lists order these with
    /// numeric-aware comparison.
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TodoStatus,
}

/// Upsert input for [`TodoProvider::update`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TodoStatus>,
}

#[async_trait]
pub trait TodoProvider: Send + Sync {
    async fn get(&self, id: &str) -> anyhow::Result<Option<TodoItem>>;
    /// Items, filtered to children of `parent` and/or a status, ordered by
    /// numeric-aware id comparison.
    async fn list(
        &self,
        parent: Option<&str>,
        status: Option<TodoStatus>,
    ) -> anyhow::Result<Vec<TodoItem>>;
    async fn update(&self, input: TodoUpdate) -> anyhow::Result<TodoItem>;
}

// ─── File system ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Regex applied per line.
    pub pattern: String,
    /// Directory to search under.
    pub path: String,
    /// Context lines captured on each side of a match.
    pub context_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub path: String,
    pub line_number: usize,
    pub line: String,
    pub context_before: Vec<String>,
    pub context_after: Vec<String>,
}

#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    async fn read(&self, path: &str, include_ignored: bool) -> anyhow::Result<String>;
    async fn read_binary(&self, path: &str) -> anyhow::Result<Vec<u8>>;
    async fn write(&self, path: &str, content: &str) -> anyhow::Result<()>;
    async fn remove(&self, path: &str) -> anyhow::Result<()>;
    async fn rename(&self, from: &str, to: &str) -> anyhow::Result<()>;
    /// Ordered path list, truncated to `max_count` entries.
    async fn list(&self, path: &str, recursive: bool, max_count: usize)
        -> anyhow::Result<Vec<String>>;
    async fn search(&self, query: &SearchQuery) -> anyhow::Result<Vec<SearchMatch>>;
}

// ─── Shell ────────────────────────────────────────────────────────────────────

/// Receives incremental output lines while a command runs.
///
/// Implementations must not block; the default [`NullSink`] discards
/// everything.
pub trait OutputSink: Send + Sync {
    fn stdout_line(&self, line: &str);
    fn stderr_line(&self, line: &str);
}

pub struct NullSink;

impl OutputSink for NullSink {
    fn stdout_line(&self, _line: &str) {}
    fn stderr_line(&self, _line: &str) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Run through `bash -c` when set (args are then ignored).
    #[serde(default)]
    pub shell: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl CommandRequest {
    /// A `bash -c` command line.
    pub fn shell(command: impl Into<String>) -> Self {
        Self { command: command.into(), args: Vec::new(), shell: true, timeout_secs: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait ShellProvider: Send + Sync {
    async fn execute(
        &self,
        request: CommandRequest,
        sink: &dyn OutputSink,
        cancel: &CancelToken,
    ) -> anyhow::Result<CommandOutput>;
}

// ─── HTTP / user input ────────────────────────────────────────────────────────

#[async_trait]
pub trait HttpProvider: Send + Sync {
    /// Text of the response body (HTML is converted to readable text).
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait InputProvider: Send + Sync {
    /// Prompt the user and return their answer.  Aborting the prompt
    /// surfaces [`UserCancelledError`].
    async fn input(&self, message: &str, default: Option<&str>) -> anyhow::Result<String>;
}

// ─── Bundle ───────────────────────────────────────────────────────────────────

/// Host-supplied capability set injected into tool handlers.
///
/// Unbound capabilities make the corresponding tools report "not
/// supported" instead of executing.
#[derive(Clone)]
pub struct Providers {
    pub fs: Option<Arc<dyn FileSystemProvider>>,
    pub shell: Option<Arc<dyn ShellProvider>>,
    pub http: Option<Arc<dyn HttpProvider>>,
    pub memory: Option<Arc<dyn MemoryProvider>>,
    pub todo: Option<Arc<dyn TodoProvider>>,
    pub input: Option<Arc<dyn InputProvider>>,
    /// Sink for incremental command output.
    pub command_sink: Arc<dyn OutputSink>,
    pub cancel: CancelToken,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            fs: None,
            shell: None,
            http: None,
            memory: None,
            todo: None,
            input: None,
            command_sink: Arc::new(NullSink),
            cancel: CancelToken::new(),
        }
    }
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystemProvider>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn with_shell(mut self, shell: Arc<dyn ShellProvider>) -> Self {
        self.shell = Some(shell);
        self
    }

    pub fn with_http(mut self, http: Arc<dyn HttpProvider>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryProvider>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_todo(mut self, todo: Arc<dyn TodoProvider>) -> Self {
        self.todo = Some(todo);
        self
    }

    pub fn with_input(mut self, input: Arc<dyn InputProvider>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_command_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.command_sink = sink;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::FileSystem => self.fs.is_some(),
            Capability::Shell => self.shell.is_some(),
            Capability::Http => self.http.is_some(),
            Capability::Memory => self.memory.is_some(),
            Capability::Todo => self.todo.is_some(),
            Capability::Input => self.input.is_some(),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
