// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::{Providers, UserCancelledError};
use crate::tool::{Capability, Tool};

/// Ask the user a clarifying question mid-task.
///
/// Registered only in interactive catalogs; headless hosts never advertise
/// it, so the model cannot stall a CI run waiting for a human.
pub struct AskFollowupQuestionTool;

#[derive(Deserialize)]
struct AskFollowupQuestionInput {
    question: String,
    #[serde(rename = "defaultAnswer", default)]
    default_answer: Option<String>,
}

#[async_trait]
impl Tool for AskFollowupQuestionTool {
    fn name(&self) -> &str {
        "askFollowupQuestion"
    }

    fn description(&self) -> &str {
        "Ask the user a clarifying question and wait for their answer. Use \
         only when the task cannot proceed without a decision from the user; \
         provide defaultAnswer when a sensible default exists."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("question", Schema::string()),
            Field::optional("defaultAnswer", Schema::string()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::Input
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(user_input) = providers.input.as_ref() else {
            return ToolResult::error("input provider not bound");
        };
        let input: AskFollowupQuestionInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        debug!(question = %input.question, "asking followup question");
        match user_input
            .input(&input.question, input.default_answer.as_deref())
            .await
        {
            Ok(answer) => ToolResult::text(answer),
            Err(e) if e.downcast_ref::<UserCancelledError>().is_some() => {
                ToolResult::cancelled()
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

/// Plain prompt suspension used by orchestrating workflows (approval
/// checkpoints, feedback collection).  Unlike `askFollowupQuestion` this is
/// not meant for the model; workflows issue it directly.
pub struct InputTool;

#[derive(Deserialize)]
struct InputToolInput {
    message: String,
    #[serde(default)]
    default: Option<String>,
}

#[async_trait]
impl Tool for InputTool {
    fn name(&self) -> &str {
        "input"
    }

    fn description(&self) -> &str {
        "Prompt the user for a line of input. An empty response takes the \
         default when one is provided."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("message", Schema::string()),
            Field::optional("default", Schema::string()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::Input
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(user_input) = providers.input.as_ref() else {
            return ToolResult::error("input provider not bound");
        };
        let input: InputToolInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match user_input.input(&input.message, input.default.as_deref()).await {
            Ok(answer) => ToolResult::text(answer),
            Err(e) if e.downcast_ref::<UserCancelledError>().is_some() => {
                ToolResult::cancelled()
            }
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
    use crate::local::QueuedInput;

    #[tokio::test]
    async fn returns_user_answer() {
        let p = Providers::new().with_input(Arc::new(QueuedInput::new(["yes"])));
        let out = AskFollowupQuestionTool
            .execute(&p, json!({"question": "proceed?"}))
            .await;
        assert_eq!(out.render(), "yes");
    }

    #[tokio::test]
    async fn abort_maps_to_cancelled_result() {
        let p = Providers::new().with_input(Arc::new(QueuedInput::default()));
        let out = AskFollowupQuestionTool
            .execute(&p, json!({"question": "proceed?"}))
            .await;
        assert!(out.is_cancelled());
    }

    #[tokio::test]
    async fn input_tool_honors_default() {
        let p = Providers::new().with_input(Arc::new(QueuedInput::new([""])));
        let out = InputTool
            .execute(&p, json!({"message": "approve?", "default": "yes"}))
            .await;
        assert_eq!(out.render(), "yes");
    }
}
