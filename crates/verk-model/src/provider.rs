// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Message;

/// A tool schema provided to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the input object
    pub parameters: Value,
}

/// One generation request.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    /// JSON Schema the final object must conform to, when the caller wants
    /// structured output.
    pub output_schema: Option<Value>,
}

/// A single streamed delta from the model.
#[derive(Debug, Clone)]
pub enum ModelDelta {
    /// Visible text
    Text(String),
    /// Reasoning text (recorded always, rendered only on request)
    Reasoning(String),
    /// The model wants to call a tool; `input` is the parsed argument object.
    ToolCall { id: String, name: String, input: Value },
    /// Terminal delta: usage totals plus the structured final object when an
    /// output schema was supplied and the model produced one.
    Finish { usage: Usage, final_object: Option<Value> },
}

/// Token usage from one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Reasoning tokens are counted even when reasoning is not rendered.
    pub reasoning_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.reasoning_tokens
    }

    pub fn add(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.reasoning_tokens += other.reasoning_tokens;
    }
}

pub type DeltaStream = Pin<Box<dyn Stream<Item = anyhow::Result<ModelDelta>> + Send>>;

/// The abstract language-model interface the engine consumes.
///
/// Concrete providers (Anthropic, OpenAI, Bedrock, …) live with the host;
/// the engine only sees this trait.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Send a generation request and return a streaming response.
    ///
    /// The stream yields deltas in emission order and terminates after a
    /// [`ModelDelta::Finish`].
    async fn generate(&self, req: ModelRequest) -> anyhow::Result<DeltaStream>;
}
