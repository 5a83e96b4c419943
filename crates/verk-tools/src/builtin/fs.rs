// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::Providers;
use crate::tool::{Capability, Tool};

// ─── readFile ─────────────────────────────────────────────────────────────────

pub struct ReadFileTool;

#[derive(Deserialize)]
struct ReadFileInput {
    path: String,
    #[serde(rename = "includeIgnored", default)]
    include_ignored: bool,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "readFile"
    }

    fn description(&self) -> &str {
        "Read the text content of a file. Set includeIgnored to read files \
         inside ignored directories (.git, node_modules, …)."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("path", Schema::string().describe("Path relative to the workspace root")),
            Field::optional("includeIgnored", Schema::boolean()).with_default(false.into()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: ReadFileInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match fs.read(&input.path, input.include_ignored).await {
            Ok(content) => ToolResult::text(content),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── writeToFile ──────────────────────────────────────────────────────────────

pub struct WriteToFileTool;

#[derive(Deserialize)]
struct WriteToFileInput {
    path: String,
    content: String,
}

#[async_trait]
impl Tool for WriteToFileTool {
    fn name(&self) -> &str {
        "writeToFile"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating parent directories as needed. \
         Overwrites the file when it already exists."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("path", Schema::string()),
            Field::required("content", Schema::string()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: WriteToFileInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match fs.write(&input.path, &input.content).await {
            Ok(()) => ToolResult::text(format!(
                "Wrote {} bytes to {}",
                input.content.len(),
                input.path
            )),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── replaceInFile ────────────────────────────────────────────────────────────

pub struct ReplaceInFileTool;

#[derive(Deserialize)]
struct ReplaceInFileInput {
    path: String,
    replacements: Vec<Replacement>,
}

#[derive(Deserialize)]
struct Replacement {
    search: String,
    replace: String,
    #[serde(default)]
    global: bool,
}

#[async_trait]
impl Tool for ReplaceInFileTool {
    fn name(&self) -> &str {
        "replaceInFile"
    }

    fn description(&self) -> &str {
        "Apply exact string substitutions to a file. Each replacement \
         rewrites the first occurrence of its search string, or every \
         occurrence when global is set. Fails without writing when any \
         search string is absent."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("path", Schema::string()),
            Field::required(
                "replacements",
                Schema::array(Schema::object([
                    Field::required("search", Schema::string()),
                    Field::required("replace", Schema::string()),
                    Field::optional("global", Schema::boolean()).with_default(false.into()),
                ])),
            ),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: ReplaceInFileInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        let mut content = match fs.read(&input.path, true).await {
            Ok(c) => c,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        for (i, replacement) in input.replacements.iter().enumerate() {
            if !content.contains(&replacement.search) {
                return ToolResult::error(format!(
                    "replacement {} not applied: search string not found in {}",
                    i + 1,
                    input.path
                ));
            }
            content = if replacement.global {
                content.replace(&replacement.search, &replacement.replace)
            } else {
                content.replacen(&replacement.search, &replacement.replace, 1)
            };
        }
        match fs.write(&input.path, &content).await {
            Ok(()) => ToolResult::text(format!(
                "Applied {} replacement(s) to {}",
                input.replacements.len(),
                input.path
            )),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── readBinaryFile ───────────────────────────────────────────────────────────

pub struct ReadBinaryFileTool;

#[derive(Deserialize)]
struct ReadBinaryFileInput {
    path: String,
}

#[async_trait]
impl Tool for ReadBinaryFileTool {
    fn name(&self) -> &str {
        "readBinaryFile"
    }

    fn description(&self) -> &str {
        "Read a file and return its content base64-encoded."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([Field::required("path", Schema::string())])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: ReadBinaryFileInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match fs.read_binary(&input.path).await {
            Ok(bytes) => {
                ToolResult::text(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── removeFile ───────────────────────────────────────────────────────────────

pub struct RemoveFileTool;

#[derive(Deserialize)]
struct RemoveFileInput {
    path: String,
}

#[async_trait]
impl Tool for RemoveFileTool {
    fn name(&self) -> &str {
        "removeFile"
    }

    fn description(&self) -> &str {
        "Delete a file."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([Field::required("path", Schema::string())])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: RemoveFileInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match fs.remove(&input.path).await {
            Ok(()) => ToolResult::text(format!("Removed {}", input.path)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── renameFile ───────────────────────────────────────────────────────────────

pub struct RenameFileTool;

#[derive(Deserialize)]
struct RenameFileInput {
    from: String,
    to: String,
}

#[async_trait]
impl Tool for RenameFileTool {
    fn name(&self) -> &str {
        "renameFile"
    }

    fn description(&self) -> &str {
        "Rename or move a file."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([
            Field::required("from", Schema::string()),
            Field::required("to", Schema::string()),
        ])
    }

    fn capability(&self) -> Capability {
        Capability::FileSystem
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(fs) = providers.fs.as_ref() else {
            return ToolResult::error("file-system provider not bound");
        };
        let input: RenameFileInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match fs.rename(&input.from, &input.to).await {
            Ok(()) => ToolResult::text(format!("Renamed {} to {}", input.from, input.to)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
