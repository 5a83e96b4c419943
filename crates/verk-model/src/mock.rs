// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use crate::{DeltaStream, ModelDelta, ModelProvider, ModelRequest, Usage};

/// A pre-scripted mock provider.  Each call to `generate` pops the next
/// delta script from the front of the queue.  This lets tests specify exact
/// delta sequences, including tool calls and structured final objects,
/// without network access.
pub struct ScriptedModel {
    scripts: Arc<Mutex<Vec<Vec<ModelDelta>>>>,
    /// Every `ModelRequest` seen by this provider, in call order.  Tests
    /// inspect this to assert on conversation state and advertised tools.
    pub requests: Arc<Mutex<Vec<ModelRequest>>>,
}

impl ScriptedModel {
    /// Build a provider from a list of delta scripts.  The outer `Vec` is
    /// the ordered list of calls; the inner `Vec` is the delta sequence for
    /// that call.  Scripts that do not end in a `Finish` delta get one
    /// appended with default usage.
    pub fn new(scripts: Vec<Vec<ModelDelta>>) -> Self {
        let scripts = scripts
            .into_iter()
            .map(|mut deltas| {
                if !matches!(deltas.last(), Some(ModelDelta::Finish { .. })) {
                    deltas.push(finish());
                }
                deltas
            })
            .collect();
        Self {
            scripts: Arc::new(Mutex::new(scripts)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: provider whose single turn is a plain text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![vec![ModelDelta::Text(reply.into())]])
    }

    /// Convenience: a tool-call turn followed by a text turn.
    pub fn tool_then_text(
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
        final_text: impl Into<String>,
    ) -> Self {
        Self::new(vec![
            vec![ModelDelta::ToolCall {
                id: tool_id.into(),
                name: tool_name.into(),
                input,
            }],
            vec![ModelDelta::Text(final_text.into())],
        ])
    }

    /// Convenience: a single turn that produces a structured final object.
    pub fn final_object(object: Value) -> Self {
        Self::new(vec![vec![ModelDelta::Finish {
            usage: Usage::default(),
            final_object: Some(object),
        }]])
    }

    /// Number of generate calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// A `Finish` delta with default usage, for hand-built scripts.
fn finish() -> ModelDelta {
    ModelDelta::Finish { usage: Usage { input_tokens: 10, output_tokens: 10, reasoning_tokens: 0 }, final_object: None }
}

#[async_trait]
impl ModelProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted-mock"
    }

    async fn generate(&self, req: ModelRequest) -> anyhow::Result<DeltaStream> {
        self.requests.lock().unwrap().push(req);
        let deltas = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                // Default fallback when all scripts are consumed
                vec![ModelDelta::Text("[no more scripts]".into()), finish()]
            } else {
                scripts.remove(0)
            }
        };
        let wrapped: Vec<anyhow::Result<ModelDelta>> = deltas.into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(wrapped)))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::Message;

    fn req() -> ModelRequest {
        ModelRequest { messages: vec![Message::user("hi")], ..Default::default() }
    }

    async fn collect(provider: &ScriptedModel) -> Vec<ModelDelta> {
        let mut stream = provider.generate(req()).await.unwrap();
        let mut out = Vec::new();
        while let Some(d) = stream.next().await {
            out.push(d.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn text_script_ends_with_finish() {
        let p = ScriptedModel::always_text("hello");
        let deltas = collect(&p).await;
        assert!(matches!(&deltas[0], ModelDelta::Text(t) if t == "hello"));
        assert!(matches!(deltas.last(), Some(ModelDelta::Finish { .. })));
    }

    #[tokio::test]
    async fn tool_then_text_pops_in_order() {
        let p = ScriptedModel::tool_then_text("c1", "readFile", json!({"path": "x"}), "done");
        let first = collect(&p).await;
        assert!(first
            .iter()
            .any(|d| matches!(d, ModelDelta::ToolCall { name, .. } if name == "readFile")));
        let second = collect(&p).await;
        assert!(second.iter().any(|d| matches!(d, ModelDelta::Text(t) if t == "done")));
    }

    #[tokio::test]
    async fn final_object_is_delivered_in_finish() {
        let p = ScriptedModel::final_object(json!({"type": "error", "reason": "nope"}));
        let deltas = collect(&p).await;
        match deltas.last() {
            Some(ModelDelta::Finish { final_object: Some(o), .. }) => {
                assert_eq!(o["type"], json!("error"));
            }
            other => panic!("expected finish with object, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn requests_are_recorded() {
        let p = ScriptedModel::always_text("x");
        let _ = collect(&p).await;
        assert_eq!(p.calls(), 1);
        assert_eq!(p.requests.lock().unwrap()[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_scripts_fall_back() {
        let p = ScriptedModel::new(vec![]);
        let deltas = collect(&p).await;
        assert!(matches!(&deltas[0], ModelDelta::Text(t) if t.contains("no more scripts")));
    }
}
