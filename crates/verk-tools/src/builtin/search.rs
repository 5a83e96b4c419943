// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::{Providers, SearchQuery};
use crate::tool::{Capability, Tool};

/// Context lines captured on each side of a search match.
const DEFAULT_CONTEXT_LINES: usize = 5;

/// Entries returned by `listFiles` before truncation kicks in.
const DEFAULT_MAX_COUNT: usize = 2000;

// ─── searchFiles ──────────────────────────────────────────────────────────────

pub struct SearchFilesTool;

fn default_path() -> String {
    ".".to_string()
}

fn default_context() -> usize {
    DEFAULT_CONTEXT_LINES
}

#[derive(Deserialize)]
struct SearchFilesInput {
    pattern: String,
    #[serde(default = "default_path")]
    path: String,
    #[serde(rename = "contextLines", default = "default_context")]
    context_lines: usize,
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "searchFiles"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression. Returns matches in \
         ranked order with surrounding context lines."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("pattern", Schema::string().describe("Regular expression applied per line")),
            Field::optional("path", Schema::string().describe("Directory to search under"))
                .with_default(".".into()),
            Field::optional("contextLines", Schema::integer())
                .with_default((DEFAULT_CONTEXT_LINES as i64).into()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: SearchFilesInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let query = SearchQuery {
            pattern: input.pattern,
            path: input.path,
            context_lines: input.context_lines,
        };
        match fs.search(&query).await {
            Ok(matches) => match serde_json::to_value(&matches) {
                Ok(v) => ToolResult::json(v),
                Err(e) => ToolResult::error(e.to_string()),
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── listFiles ────────────────────────────────────────────────────────────────

pub struct ListFilesTool;

fn default_max_count() -> usize {
    DEFAULT_MAX_COUNT
}

#[derive(Deserialize)]
struct ListFilesInput {
    path: String,
    #[serde(default)]
    recursive: bool,
    #[serde(rename = "maxCount", default = "default_max_count")]
    max_count: usize,
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "listFiles"
    }

    fn description(&self) -> &str {
        "List files under a directory in sorted order, truncated to maxCount \
         entries. Ignored directories (.git, node_modules, …) are skipped."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("path", Schema::string()),
            Field::optional("recursive", Schema::boolean()).with_default(false.into()),
            Field::optional("maxCount", Schema::integer())
                .with_default((DEFAULT_MAX_COUNT as i64).into()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: ListFilesInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match fs.list(&input.path, input.recursive, input.max_count).await {
            Ok(paths) => ToolResult::json(Value::Array(
                paths.into_iter().map(Value::String).collect(),
            )),
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
    use crate::local::LocalFileSystem;

    fn providers() -> (tempfile::TempDir, Providers) {
        let dir = tempfile::tempdir().unwrap();
        let providers =
            Providers::new().with_fs(Arc::new(LocalFileSystem::new(dir.path())));
        (dir, providers)
    }

    #[tokio::test]
    async fn search_finds_match_with_default_context() {
        let (dir, p) = providers();
        std::fs::write(dir.path().join("a.txt"), "1\n2\n3\n4\n5\nneedle\n7\n").unwrap();
        let out = SearchFilesTool.execute(&p, json!({"pattern": "needle"})).await;
        assert!(!out.is_error(), "{}", out.render());
        let matches: Vec<serde_json::Value> =
            serde_json::from_str(&out.render()).unwrap();
        assert_eq!(matches.len(), 1);
        // Default context is 5 lines each side.
        assert_eq!(matches[0]["context_before"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn list_returns_sorted_paths() {
        let (dir, p) = providers();
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let out = ListFilesTool.execute(&p, json!({"path": "."})).await;
        let paths: Vec<String> = serde_json::from_str(&out.render()).unwrap();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn list_schema_omits_default_max_count() {
        let schema = ListFilesTool.input_schema();
        let simplified = schema
            .validate(&json!({"path": ".", "maxCount": 2000, "bogus": true}))
            .unwrap();
        assert_eq!(simplified, json!({"path": "."}));
    }

    #[tokio::test]
    async fn list_honors_explicit_max_count() {
        let (dir, p) = providers();
        for i in 0..4 {
            std::fs::write(dir.path().join(format!("f{i}.txt")), "x").unwrap();
        }
        let out = ListFilesTool
            .execute(&p, json!({"path": ".", "maxCount": 2}))
            .await;
        let paths: Vec<String> = serde_json::from_str(&out.render()).unwrap();
        assert_eq!(paths.len(), 2);
    }
}
