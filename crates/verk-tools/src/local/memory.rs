// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::providers::{MemoryOp, MemoryProvider};

/// In-memory topic store.
///
/// Appends are separated by a blank line so topics read as a running log.
#[derive(Default)]
pub struct MemoryStore {
    topics: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryProvider for MemoryStore {
    async fn read(&self, topic: &str) -> anyhow::Result<Option<String>> {
        Ok(self.topics.lock().unwrap().get(topic).cloned())
    }

    async fn update(
        &self,
        op: MemoryOp,
        topic: &str,
        content: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut topics = self.topics.lock().unwrap();
        match op {
            MemoryOp::Append => {
                let content = content.unwrap_or_default();
                match topics.get_mut(topic) {
                    Some(existing) if !existing.is_empty() => {
                        existing.push_str("\n\n");
                        existing.push_str(content);
                    }
                    _ => {
                        topics.insert(topic.to_string(), content.to_string());
                    }
                }
            }
            MemoryOp::Replace => {
                topics.insert(topic.to_string(), content.unwrap_or_default().to_string());
            }
            MemoryOp::Remove => {
                topics.remove(topic);
            }
        }
        Ok(())
    }

    async fn topics(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.topics.lock().unwrap().keys().cloned().collect())
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
