// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use verk_model::ToolResult;

use crate::providers::Providers;
use crate::tool::{Tool, ToolSpec};

/// Name-indexed registry of tool descriptors.
pub struct ToolCatalog {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Catalog with every built-in tool registered.
    ///
    /// `interactive` additionally registers `askFollowupQuestion`; headless
    /// hosts leave it out so the model never sees the tool.
    pub fn builtin(interactive: bool) -> Self {
        let mut catalog = Self::new();
        for tool in crate::builtin::all(interactive) {
            catalog.register_arc(tool);
        }
        catalog
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Specs for all registered tools, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                schema: t.input_schema(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Rendered schemas for provider advertisement, sorted by name.
    pub fn advertised(&self) -> Vec<verk_model::ToolSchema> {
        self.specs().iter().map(ToolSpec::advertised).collect()
    }

    /// Validate and run one tool call.
    ///
    /// Every failure mode comes back as an `error-text` result rather than
    /// an `Err`: unknown tool, missing capability, invalid input, handler
    /// failure. All of them are observable outcomes the model can react
    /// to.
    pub async fn invoke(&self, providers: &Providers, name: &str, input: &Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::error(format!("unknown tool: {name}"));
        };
        if !providers.supports(tool.capability()) {
            return ToolResult::error(format!(
                "{name} is not supported: no {} provider is bound",
                tool.capability()
            ));
        }
        let validated = match tool.input_schema().validate(input) {
            Ok(v) => v,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        debug!(tool = %name, "invoking tool");
        tool.execute(providers, validated).await
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
