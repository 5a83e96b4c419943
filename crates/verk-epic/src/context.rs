// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use verk_tools::TodoItem;

/// File name used when the host does not choose one.
pub const DEFAULT_CONTEXT_FILE: &str = ".epic.yml";

/// Persistable orchestrator state.
///
/// Saved after every phase transition so a crashed or interrupted epic can
/// pick up where it left off.  The YAML encoding is the stable interchange
/// format; `from_yaml(to_yaml(ctx))` is the identity for any valid context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<TodoItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<BTreeMap<String, String>>,
}

impl EpicContext {
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        serde_yaml::to_string(self).context("failed to serialize epic context")
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse epic context")
    }
}

/// Where epic context lives between runs.  The engine owns the schema;
/// reading and writing the bytes is delegated here.
#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<EpicContext>>;
    async fn save(&self, context: &EpicContext) -> anyhow::Result<()>;
}

/// Context store backed by a YAML file.
pub struct FileContextStore {
    path: PathBuf,
}

impl FileContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `.epic.yml` under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { path: dir.into().join(DEFAULT_CONTEXT_FILE) }
    }
}

#[async_trait]
impl ContextStore for FileContextStore {
    async fn load(&self) -> anyhow::Result<Option<EpicContext>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(yaml) => Ok(Some(EpicContext::from_yaml(&yaml)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    async fn save(&self, context: &EpicContext) -> anyhow::Result<()> {
        let yaml = context.to_yaml()?;
        tokio::fs::write(&self.path, yaml)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
