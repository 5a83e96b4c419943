// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use verk_model::ToolResult;
use verk_schema::{Field, Schema};

use crate::providers::Providers;
use crate::tool::{Capability, Tool};

pub struct FetchUrlTool;

#[derive(Deserialize)]
struct FetchUrlInput {
    url: String,
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetchUrl"
    }

    fn description(&self) -> &str {
        "Fetch a URL and return the response body as readable text. HTML is \
         converted; http/https only; read-only."
    }

    fn input_schema(&self) -> Schema {
        Schema::object([Field::required("url", Schema::string())])
    }

    fn capability(&self) -> Capability {
        Capability::Http
    }

    async fn execute(&self, providers: &Providers, input: Value) -> ToolResult {
        let Some(http) = providers.http.as_ref() else {
            return ToolResult::error("http provider not bound");
        };
        let input: FetchUrlInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match http.fetch(&input.url).await {
            Ok(text) => ToolResult::text(text),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
