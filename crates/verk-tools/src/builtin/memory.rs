// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::{MemoryOp, Providers};
use crate::tool::{Capability, Tool};

/// Topic used when the model does not name one.
const DEFAULT_TOPIC: &str = ":default:";

// ─── updateMemory ─────────────────────────────────────────────────────────────

pub struct UpdateMemoryTool;

#[derive(Deserialize)]
struct UpdateMemoryInput {
    operation: MemoryOp,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Tool for UpdateMemoryTool {
    fn name(&self) -> &str {
        "updateMemory"
    }

    fn description(&self) -> &str {
        "Persist notes across tasks. Operations: append (add to a topic), \
         replace (overwrite a topic), remove (delete a topic). content is \
         required for append/replace and must not be provided for remove. \
         topic defaults to ':default:'."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required(
                "operation",
                Schema::enumeration(["append", "replace", "remove"])
                    .describe("Memory operation to perform"),
            ),
            Field::optional("topic", Schema::string().describe("Topic slot name")),
            Field::optional("content", Schema::string()),
        ])
        .refine(
            "content is required for the append and replace operations",
            |v| {
                let op = v.get("operation").and_then(|o| o.as_str());
                !(matches!(op, Some("append") | Some("replace")) && v.get("content").is_none())
            },
        )
        .refine(
            "content must not be provided for the remove operation",
            |v| {
                let op = v.get("operation").and_then(|o| o.as_str());
                !(op == Some("remove") && v.get("content").is_some())
            },
        )
    }

    fn capability(&self) -> Capability {
        Capability::Memory
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(memory) = providers.memory.as_ref() else {
            return ToolResult::error("memory provider not bound");
        };
        let input: UpdateMemoryInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let topic = input.topic.as_deref().unwrap_or(DEFAULT_TOPIC);
        debug!(operation = ?input.operation, topic, "updateMemory tool");
        let result = memory
            .update(input.operation, topic, input.content.as_deref())
            .await;
        match result {
            Ok(()) => ToolResult::text(match input.operation {
                MemoryOp::Append => format!("Content appended to memory topic '{topic}'"),
                MemoryOp::Replace => format!("Content replaced in memory topic '{topic}'"),
                MemoryOp::Remove => format!("Memory topic '{topic}' removed"),
            }),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── readMemory ───────────────────────────────────────────────────────────────

pub struct ReadMemoryTool;

#[derive(Deserialize)]
struct ReadMemoryInput {
    #[serde(default)]
    topic: Option<String>,
}

#[async_trait]
impl Tool for ReadMemoryTool {
    fn name(&self) -> &str {
        "readMemory"
    }

    fn description(&self) -> &str {
        "Read the stored content of a memory topic (':default:' when unset)."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([Field::optional("topic", Schema::string())])
    }

    fn capability(&self) -> Capability {
        Capability::Memory
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(memory) = providers.memory.as_ref() else {
            return ToolResult::error("memory provider not bound");
        };
        let input: ReadMemoryInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let topic = input.topic.as_deref().unwrap_or(DEFAULT_TOPIC);
        match memory.read(topic).await {
            Ok(Some(content)) => ToolResult::text(content),
            Ok(None) => ToolResult::text(format!("(memory topic '{topic}' is empty)")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── listMemoryTopics ─────────────────────────────────────────────────────────

pub struct ListMemoryTopicsTool;

#[async_trait]
impl Tool for ListMemoryTopicsTool {
    fn name(&self) -> &str {
        "listMemoryTopics"
    }

    fn description(&self) -> &str {
        "List all memory topics that currently hold content."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([])
    }

    fn capability(&self) -> Capability {
        Capability::Memory
    }

    async fn execute(&self, providers: &Providers, _input: Value) -> ToolResult {
        let Some(memory) = providers.memory.as_ref() else {
            return ToolResult::error("memory provider not bound");
        };
        match memory.topics().await {
            Ok(topics) if topics.is_empty() => ToolResult::text("(no memory topics)"),
            Ok(topics) => ToolResult::text(topics.join("\n")),
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
    use crate::local::MemoryStore;

    fn providers() -> Providers {
        Providers::new().with_memory(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn append_reports_default_topic() {
        let p = providers();
        let out = UpdateMemoryTool
            .execute(&p, json!({"operation": "append", "content": "x"}))
            .await;
        assert!(!out.is_error(), "{}", out.render());
        assert_eq!(out.render(), "Content appended to memory topic ':default:'");
        let read = ReadMemoryTool.execute(&p, json!({})).await;
        assert!(read.render().contains('x'));
    }

    #[tokio::test]
    async fn remove_with_content_fails_validation() {
        let schema = UpdateMemoryTool.input_schema();
        let err = schema
            .validate(&json!({"operation": "remove", "content": "x"}))
            .unwrap_err();
        assert!(err.to_string().contains("content must not be provided"));
    }

    #[tokio::test]
    async fn append_without_content_fails_validation() {
        let schema = UpdateMemoryTool.input_schema();
        let err = schema.validate(&json!({"operation": "append"})).unwrap_err();
        assert!(err.to_string().contains("content is required"));
    }

    #[tokio::test]
    async fn replace_and_remove_round_trip() {
        let p = providers();
        UpdateMemoryTool
            .execute(&p, json!({"operation": "replace", "topic": "t", "content": "X"}))
            .await;
        let read = ReadMemoryTool.execute(&p, json!({"topic": "t"})).await;
        assert_eq!(read.render(), "X");
        UpdateMemoryTool
            .execute(&p, json!({"operation": "remove", "topic": "t"}))
            .await;
        let read = ReadMemoryTool.execute(&p, json!({"topic": "t"})).await;
        assert!(read.render().contains("is empty"));
    }

    #[tokio::test]
    async fn list_topics_reports_contents() {
        let p = providers();
        let out = ListMemoryTopicsTool.execute(&p, json!({})).await;
        assert_eq!(out.render(), "(no memory topics)");
        UpdateMemoryTool
            .execute(&p, json!({"operation": "replace", "topic": "notes", "content": "n"}))
            .await;
        let out = ListMemoryTopicsTool.execute(&p, json!({})).await;
        assert_eq!(out.render(), "notes");
    }
}
