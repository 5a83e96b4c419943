// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::{CommandRequest, Providers};
use crate::tool::{Capability, Tool};

pub struct GitDiffTool;

#[derive(Deserialize)]
struct GitDiffInput {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(rename = "nameStatus", default)]
    name_status: bool,
}

#[async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "gitDiff"
    }

    fn description(&self) -> &str {
        "Show the git diff between two revisions (or the working tree when \
         unset). Set nameStatus to get the name-status summary instead of \
         the full patch."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::optional("from", Schema::string().describe("Base revision")),
            Field::optional("to", Schema::string().describe("Target revision")),
            Field::optional("nameStatus", Schema::boolean()).with_default(false.into()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::Shell
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(shell) = providers.shell.as_ref() else {
            return ToolResult::error("shell provider not bound");
        };
        let input: GitDiffInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let mut command = String::from("git diff --no-color");
        if input.name_status {
            command.push_str(" --name-status");
        }
        if let Some(from) = &input.from {
            command.push(' ');
            command.push_str(from);
        }
        if let Some(to) = &input.to {
            command.push(' ');
            command.push_str(to);
        }
        match shell
            .execute(
                CommandRequest::shell(command),
                providers.command_sink.as_ref(),
                &providers.cancel,
            )
            .await
        {
            Ok(output) if output.exit_code == 0 => ToolResult::text(output.stdout),
            Ok(output) => ToolResult::error(format!(
                "git diff failed (exit {}): {}",
                output.exit_code,
                output.stderr.trim()
            )),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
