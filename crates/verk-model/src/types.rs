// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Tool results ─────────────────────────────────────────────────────────────

/// Error text carried by [`ToolResult::cancelled`].  Consumers compare
/// against this to recognize user aborts wherever they surface.
pub const CANCELLED_MESSAGE: &str = "cancelled by user";

/// The outcome of a tool invocation, as seen by the model.
///
/// Memoized by the workflow runtime and embedded in tool-result content
/// parts, so it must round-trip through JSON losslessly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub message: ToolPayload,
}

/// Payload of a [`ToolResult`].
///
/// Serializes as `{"type": "text" | "json" | "error-text", "value": …}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ToolPayload {
    Text(String),
    Json(Value),
    ErrorText(String),
}

impl ToolResult {
    pub fn text(value: impl Into<String>) -> Self {
        Self { success: true, message: ToolPayload::Text(value.into()) }
    }

    pub fn json(value: Value) -> Self {
        Self { success: true, message: ToolPayload::Json(value) }
    }

    pub fn error(value: impl Into<String>) -> Self {
        Self { success: false, message: ToolPayload::ErrorText(value.into()) }
    }

    /// The well-known result for a user-aborted prompt.  Consumers check
    /// [`ToolResult::is_cancelled`] to terminate cleanly instead of feeding
    /// the error back to the model.
    pub fn cancelled() -> Self {
        Self::error(CANCELLED_MESSAGE)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(&self.message, ToolPayload::ErrorText(v) if v == CANCELLED_MESSAGE)
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }

    /// Plain-text rendering for conversation history and logs.
    pub fn render(&self) -> String {
        match &self.message {
            ToolPayload::Text(t) | ToolPayload::ErrorText(t) => t.clone(),
            ToolPayload::Json(v) => v.to_string(),
        }
    }
}

// ─── Content parts ────────────────────────────────────────────────────────────

/// Where a binary part's bytes live.
///
/// Both variants are plain strings, so any message persists as JSON without
/// re-encoding.  A base64 source and a URL source never compare equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartSource {
    Base64 { data: String },
    Url { url: String },
}

impl PartSource {
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64 { data: data.into() }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }
}

/// A single content part of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        source: PartSource,
        media_type: String,
    },
    File {
        source: PartSource,
        media_type: String,
        filename: String,
    },
    /// Model-produced reasoning, kept for transcripts and usage accounting.
    Reasoning {
        text: String,
    },
    /// The assistant requests a tool invocation.
    ToolCall {
        id: String,
        name: String,
        input: Value,
    },
    /// The outcome of a prior tool call.
    ToolResult {
        id: String,
        output: ToolResult,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(source: PartSource, media_type: impl Into<String>) -> Self {
        Self::Image { source, media_type: media_type.into() }
    }

    pub fn file(
        source: PartSource,
        media_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self::File { source, media_type: media_type.into(), filename: filename.into() }
    }
}

// ─── Messages ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in the conversation history.
///
/// Histories are append-only: once a message is pushed it is never edited,
/// which is what makes replay and persistence sound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: vec![ContentPart::text(text)] }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: vec![ContentPart::text(text)] }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: vec![ContentPart::text(text)] }
    }

    pub fn user_with_parts(parts: Vec<ContentPart>) -> Self {
        Self { role: Role::User, content: parts }
    }

    pub fn assistant_with_parts(parts: Vec<ContentPart>) -> Self {
        Self { role: Role::Assistant, content: parts }
    }

    pub fn tool_result(id: impl Into<String>, output: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentPart::ToolResult { id: id.into(), output }],
        }
    }

    /// The concatenated text of all `Text` parts.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.content {
            if let ContentPart::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }

    /// Plain text when the message is a single text part, `None` otherwise.
    pub fn as_text(&self) -> Option<&str> {
        match self.content.as_slice() {
            [ContentPart::Text { text }] => Some(text),
            _ => None,
        }
    }

    /// All tool-call parts of this message.
    pub fn tool_calls(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolCall { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_user_sets_role_and_text() {
        let m = Message::user("hello");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.as_text(), Some("hello"));
    }

    #[test]
    fn as_text_is_none_for_multi_part() {
        let m = Message::user_with_parts(vec![
            ContentPart::text("a"),
            ContentPart::image(PartSource::url("https://x/y.png"), "image/png"),
        ]);
        assert!(m.as_text().is_none());
        assert_eq!(m.text(), "a");
    }

    #[test]
    fn tool_result_message_carries_output() {
        let m = Message::tool_result("call-1", ToolResult::text("ok"));
        assert_eq!(m.role, Role::Tool);
        match &m.content[0] {
            ContentPart::ToolResult { id, output } => {
                assert_eq!(id, "call-1");
                assert!(!output.is_error());
            }
            other => panic!("wrong part: {other:?}"),
        }
    }

    #[test]
    fn tool_calls_accessor_collects_calls() {
        let m = Message::assistant_with_parts(vec![
            ContentPart::text("let me check"),
            ContentPart::ToolCall { id: "1".into(), name: "readFile".into(), input: json!({"path": "a"}) },
        ]);
        let calls = m.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "readFile");
    }

    #[test]
    fn tool_payload_serialises_with_kebab_tags() {
        let ok = serde_json::to_value(ToolResult::text("hi")).unwrap();
        assert_eq!(ok, json!({"success": true, "message": {"type": "text", "value": "hi"}}));
        let err = serde_json::to_value(ToolResult::error("boom")).unwrap();
        assert_eq!(
            err,
            json!({"success": false, "message": {"type": "error-text", "value": "boom"}})
        );
    }

    #[test]
    fn message_round_trips_all_part_kinds() {
        let m = Message {
            role: Role::Assistant,
            content: vec![
                ContentPart::text("t"),
                ContentPart::Reasoning { text: "thinking".into() },
                ContentPart::image(PartSource::base64("QUJD"), "image/png"),
                ContentPart::file(PartSource::url("https://x/doc.pdf"), "application/pdf", "doc.pdf"),
                ContentPart::ToolCall { id: "c1".into(), name: "listFiles".into(), input: json!({"path": "."}) },
                ContentPart::ToolResult { id: "c1".into(), output: ToolResult::json(json!(["a", "b"])) },
            ],
        };
        let encoded = serde_json::to_string(&m).unwrap();
        let decoded: Message = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, m);
    }

    #[test]
    fn base64_and_url_sources_round_trip_distinctly() {
        let b = ContentPart::image(PartSource::base64("QUJD"), "image/png");
        let u = ContentPart::image(PartSource::url("https://x/a.png"), "image/png");
        let b2: ContentPart = serde_json::from_str(&serde_json::to_string(&b).unwrap()).unwrap();
        let u2: ContentPart = serde_json::from_str(&serde_json::to_string(&u).unwrap()).unwrap();
        assert_eq!(b2, b);
        assert_eq!(u2, u);
        assert_ne!(b2, u2);
    }

    #[test]
    fn render_prefers_raw_text() {
        assert_eq!(ToolResult::text("x").render(), "x");
        assert_eq!(ToolResult::error("e").render(), "e");
        assert_eq!(ToolResult::json(json!({"a": 1})).render(), r#"{"a":1}"#);
    }
}
