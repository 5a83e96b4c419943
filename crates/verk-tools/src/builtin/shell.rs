// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::{CommandRequest, Providers};
use crate::tool::{Capability, Tool};

pub struct ExecuteCommandTool;

#[derive(Deserialize)]
struct ExecuteCommandInput {
    command: String,
    // Surfaced to approval-aware hosts through the suspension; the engine
    // itself runs no approval UI.
    #[serde(rename = "requiresApproval", default)]
    #[allow(dead_code)]
    requires_approval: bool,
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &str {
        "executeCommand"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return {exitCode, stdout, stderr}. \
         Output lines stream incrementally while the command runs. \
         Prefer non-interactive commands; anything that needs a TTY will hang \
         until the timeout. Set requiresApproval for commands with side \
         effects the user should confirm."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("command", Schema::string().describe("Complete shell command line")),
            Field::optional("requiresApproval", Schema::boolean()).with_default(false.into()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::Shell
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(shell) = providers.shell.as_ref() else {
            return ToolResult::error("shell provider not bound");
        };
        let input: ExecuteCommandInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let request = CommandRequest::shell(&input.command);
        match shell
            .execute(request, providers.command_sink.as_ref(), &providers.cancel)
            .await
        {
            Ok(output) => match serde_json::to_value(&output) {
                Ok(v) => ToolResult::json(v),
                Err(e) => ToolResult::error(e.to_string()),
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::local::LocalShell;

    fn providers() -> Providers {
        Providers::new().with_shell(Arc::new(LocalShell::default()))
    }

    #[tokio::test]
    async fn returns_exit_code_and_streams() {
        let out = ExecuteCommandTool
            .execute(&providers(), json!({"command": "echo hi; exit 4"}))
            .await;
        assert!(!out.is_error(), "{}", out.render());
        let payload: serde_json::Value = serde_json::from_str(&out.render()).unwrap();
        assert_eq!(payload["exitCode"], 4);
        assert_eq!(payload["stdout"].as_str().unwrap().trim(), "hi");
    }

    #[tokio::test]
    async fn spawn_failure_is_error_text() {
        let out = ExecuteCommandTool
            .execute(&Providers::new(), json!({"command": "echo hi"}))
            .await;
        assert!(out.is_error());
        assert!(out.render().contains("not bound"));
    }
}
