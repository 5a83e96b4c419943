// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

/// Persistence interface for memoized step results.
///
/// Keys are `name#ordinal` strings scoped to one workflow invocation.
/// The default [`MemoryStepStore`] keeps everything in memory; hosts that
/// want cross-process resume persist [`StepStore::snapshot`] and seed a new
/// store from it.
pub trait StepStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn put(&self, key: &str, value: Value);
    /// Copy of all recorded entries, for persistence.
    fn snapshot(&self) -> BTreeMap<String, Value>;
}

/// In-memory step store, the default for single-process runs.
#[derive(Default)]
pub struct MemoryStepStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from a previously persisted snapshot.
    pub fn from_snapshot(snapshot: BTreeMap<String, Value>) -> Self {
        Self { entries: Mutex::new(snapshot) }
    }
}

impl StepStore for MemoryStepStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    fn snapshot(&self) -> BTreeMap<String, Value> {
        self.entries.lock().unwrap().clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
