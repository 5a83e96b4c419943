// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::{Providers, TodoStatus, TodoUpdate};
use crate::tool::{Capability, Tool};

fn status_schema() -> Schema {
    Schema::enumeration(["pending", "in_progress", "completed", "cancelled"])
}

// ─── updateTodoItem ───────────────────────────────────────────────────────────

pub struct UpdateTodoItemTool;

#[async_trait]
impl Tool for UpdateTodoItemTool {
    fn name(&self) -> &str {
        "updateTodoItem"
    }

    fn description(&self) -> &str {
        "Create or update a to-do item. Ids are hierarchical dotted strings \
         ('1', '1.2'); a new item needs a title, updates only change the \
         fields that are present."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("id", Schema::string()),
            Field::optional("title", Schema::string()),
            Field::optional("description", Schema::string()),
            Field::optional("status", status_schema()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::Todo
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(todo) = providers.todo.as_ref() else {
            return ToolResult::error("todo provider not bound");
        };
        let update: TodoUpdate = match serde_json::from_value(input) {
            Ok(u) => u,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match todo.update(update).await {
            Ok(item) => match serde_json::to_value(&item) {
                Ok(v) => ToolResult::json(v),
                Err(e) => ToolResult::error(e.to_string()),
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── getTodoItem ──────────────────────────────────────────────────────────────

pub struct GetTodoItemTool;

#[derive(Deserialize)]
struct GetTodoItemInput {
    id: String,
}

#[async_trait]
impl Tool for GetTodoItemTool {
    fn name(&self) -> &str {
        "getTodoItem"
    }

    fn description(&self) -> &str {
        "Fetch one to-do item by id."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([Field::required("id", Schema::string())])
    }

    fn capability(&self) -> Capability {
        Capability::Todo
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(todo) = providers.todo.as_ref() else {
            return ToolResult::error("todo provider not bound");
        };
        let input: GetTodoItemInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match todo.get(&input.id).await {
            Ok(Some(item)) => match serde_json::to_value(&item) {
                Ok(v) => ToolResult::json(v),
                Err(e) => ToolResult::error(e.to_string()),
            },
            Ok(None) => ToolResult::error(format!("no todo item with id '{}'", input.id)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── listTodoItems ────────────────────────────────────────────────────────────

pub struct ListTodoItemsTool;

#[derive(Deserialize)]
struct ListTodoItemsInput {
    /// Parent id; children are items whose id extends it by a dotted segment.
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<TodoStatus>,
}

#[async_trait]
impl Tool for ListTodoItemsTool {
    fn name(&self) -> &str {
        "listTodoItems"
    }

    fn description(&self) -> &str {
        "List to-do items in numeric-aware id order (1 < 1.1 < 2 < 10), \
         optionally filtered to children of an id and/or a status."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::optional("id", Schema::string().describe("Parent id filter")),
            Field::optional("status", status_schema()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::Todo
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(todo) = providers.todo.as_ref() else {
            return ToolResult::error("todo provider not bound");
        };
        let input: ListTodoItemsInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match todo.list(input.id.as_deref(), input.status).await {
            Ok(items) => match serde_json::to_value(&items) {
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
    use crate::local::TodoStore;

    fn providers() -> Providers {
        Providers::new().with_todo(Arc::new(TodoStore::new()))
    }

    #[tokio::test]
    async fn create_then_get() {
        let p = providers();
        let out = UpdateTodoItemTool
            .execute(&p, json!({"id": "1", "title": "build", "status": "in_progress"}))
            .await;
        assert!(!out.is_error(), "{}", out.render());
        let got = GetTodoItemTool.execute(&p, json!({"id": "1"})).await;
        let item: serde_json::Value = serde_json::from_str(&got.render()).unwrap();
        assert_eq!(item["title"], "build");
        assert_eq!(item["status"], "in_progress");
    }

    #[tokio::test]
    async fn get_missing_is_error() {
        let out = GetTodoItemTool.execute(&providers(), json!({"id": "9"})).await;
        assert!(out.is_error());
        assert!(out.render().contains("no todo item"));
    }

    #[tokio::test]
    async fn list_sorts_numerically() {
        let p = providers();
        for id in ["10", "2", "1.2", "1.1", "1"] {
            UpdateTodoItemTool
                .execute(&p, json!({"id": id, "title": format!("t{id}")}))
                .await;
        }
        let out = ListTodoItemsTool.execute(&p, json!({})).await;
        let items: Vec<serde_json::Value> = serde_json::from_str(&out.render()).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "1.1", "1.2", "2", "10"]);
    }

    #[tokio::test]
    async fn invalid_status_fails_validation() {
        let schema = ListTodoItemsTool.input_schema();
        let err = schema.validate(&json!({"status": "done"})).unwrap_err();
        assert!(err.to_string().contains("not one of"));
    }
}
