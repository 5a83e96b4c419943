// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use verk_model::Message;

/// Why a task terminated.  Every task ends with exactly one of these.
///
/// Serializable so orchestrators can memoize whole agent invocations as
/// workflow steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExitReason {
    /// The usage budget (requests or tokens) ran out.
    UsageExceeded,
    /// Normal completion.  `message` is the final text (the canonical JSON
    /// of the final object when an output schema was in force).
    Exit {
        message: String,
        messages: Vec<Message>,
    },
    /// The user aborted a prompt, or the host injected a cancellation.
    Interrupted { message: String },
    /// Protocol failure or uncaught error.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

impl ExitReason {
    /// The final text, when the task exited normally.
    pub fn final_message(&self) -> Option<&str> {
        match self {
            Self::Exit { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Parse the structured final object out of a schema-governed exit.
    pub fn parse_object<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let message = self
            .final_message()
            .context("task did not exit normally; no final object to parse")?;
        serde_json::from_str(message)
            .with_context(|| format!("final message is not a valid object: {message}"))
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit { .. })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Plan {
        plan: String,
    }

    #[test]
    fn parse_object_reads_exit_message() {
        let exit = ExitReason::Exit {
            message: r#"{"plan": "do things"}"#.into(),
            messages: vec![],
        };
        let plan: Plan = exit.parse_object().unwrap();
        assert_eq!(plan.plan, "do things");
    }

    #[test]
    fn parse_object_fails_for_non_exit() {
        let exit = ExitReason::UsageExceeded;
        assert!(exit.parse_object::<Plan>().is_err());
    }

    #[test]
    fn serialises_with_kind_tag() {
        let v = serde_json::to_value(ExitReason::UsageExceeded).unwrap();
        assert_eq!(v["kind"], "usage-exceeded");
        let v = serde_json::to_value(ExitReason::Interrupted { message: "m".into() }).unwrap();
        assert_eq!(v["kind"], "interrupted");
    }

    #[test]
    fn round_trips_through_json() {
        let exit = ExitReason::Exit {
            message: "done".into(),
            messages: vec![Message::user("hi"), Message::assistant("done")],
        };
        let encoded = serde_json::to_string(&exit).unwrap();
        let decoded: ExitReason = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, exit);
    }
}
