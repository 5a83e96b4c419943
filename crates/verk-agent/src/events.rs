// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::Value;
use tokio::sync::mpsc;

use verk_model::Message;

use crate::exit::ExitReason;

/// Observable emission from a running task.
///
/// Events are delivered in emission order.  For every `StartTask` there is
/// exactly one `EndTask`, and every `ToolUse` is followed by exactly one
/// `ToolReply` or `ToolError` for that tool before any other tool's events
/// appear.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    StartTask {
        task_id: String,
        system_prompt: String,
    },
    /// A model turn is starting; carries the conversation sent.
    StartRequest {
        messages: Vec<Message>,
    },
    EndRequest,
    /// Visible text streamed from the model.
    Text {
        text: String,
    },
    /// Reasoning streamed from the model (forwarded only in verbose mode).
    Reasoning {
        text: String,
    },
    ToolUse {
        tool: String,
        params: Value,
    },
    ToolReply {
        tool: String,
    },
    ToolError {
        tool: String,
        message: String,
    },
    UsageExceeded,
    EndTask {
        exit: ExitReason,
    },
}

/// Non-blocking fan-out for [`TaskEvent`]s.
///
/// Wraps an unbounded channel so emission never stalls the loop; a dropped
/// receiver silently discards events, which lets headless embedders run
/// with [`EventSink::null`].
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<TaskEvent>>,
}

impl EventSink {
    /// A sink and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    pub fn null() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: TaskEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(TaskEvent::Text { text: "a".into() });
        sink.emit(TaskEvent::Text { text: "b".into() });
        assert!(matches!(rx.try_recv().unwrap(), TaskEvent::Text { text } if text == "a"));
        assert!(matches!(rx.try_recv().unwrap(), TaskEvent::Text { text } if text == "b"));
    }

    #[test]
    fn null_sink_discards_silently() {
        EventSink::null().emit(TaskEvent::EndRequest);
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(TaskEvent::EndRequest);
    }
}
