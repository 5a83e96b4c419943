// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::providers::{InputProvider, UserCancelledError};

/// Scripted input provider for tests and replayed sessions.
///
/// Answers are popped front-to-back; an exhausted queue behaves like the
/// user aborting the prompt.
#[derive(Default)]
pub struct QueuedInput {
    answers: Mutex<VecDeque<String>>,
}

impl QueuedInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: Mutex::new(answers.into_iter().map(Into::into).collect()) }
    }

    pub fn push(&self, answer: impl Into<String>) {
        self.answers.lock().unwrap().push_back(answer.into());
    }
}

#[async_trait]
impl InputProvider for QueuedInput {
    async fn input(&self, _message: &str, default: Option<&str>) -> anyhow::Result<String> {
        match self.answers.lock().unwrap().pop_front() {
            Some(answer) if answer.is_empty() => {
                // Empty scripted answer means "accept the default".
                Ok(default.unwrap_or_default().to_string())
            }
            Some(answer) => Ok(answer),
            None => Err(anyhow::Error::new(UserCancelledError)),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_answers_in_order() {
        let input = QueuedInput::new(["first", "second"]);
        assert_eq!(input.input("q1", None).await.unwrap(), "first");
        assert_eq!(input.input("q2", None).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn empty_answer_takes_default() {
        let input = QueuedInput::new([""]);
        assert_eq!(input.input("q", Some("fallback")).await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn exhausted_queue_is_user_cancellation() {
        let input = QueuedInput::default();
        let err = input.input("q", None).await.unwrap_err();
        assert!(err.downcast_ref::<UserCancelledError>().is_some());
    }
}
