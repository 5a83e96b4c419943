// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::Schema;

use crate::providers::Providers;

/// The host capability a tool needs to run.
///
/// The catalog refuses to invoke a tool whose capability is not bound in
/// the [`Providers`] bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    FileSystem,
    Shell,
    Http,
    Memory,
    Todo,
    Input,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FileSystem => "file-system",
            Self::Shell => "shell",
            Self::Http => "http",
            Self::Memory => "memory",
            Self::Todo => "todo",
            Self::Input => "input",
        };
        f.write_str(name)
    }
}

/// Trait every built-in and user-defined tool implements.
///
/// `execute` receives input that already passed schema validation and
/// simplification; handlers never see undeclared fields.  Failures are
/// reported as [`ToolResult::error`], not as panics or `Err`: a failing
/// tool is an observable outcome, not a crashed workflow.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Schema;
    fn capability(&self) -> Capability;
    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult;
}

/// Name, description, and input schema of a registered tool.
///
/// The agent loop uses the [`Schema`] for local validation; providers get
/// the rendered JSON form via [`ToolSpec::advertised`].
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: Schema,
}

impl ToolSpec {
    pub fn advertised(&self) -> verk_model::ToolSchema {
        verk_model::ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.to_json_schema(),
        }
    }
}
