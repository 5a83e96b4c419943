// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};

/// Per-tool call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallStats {
    pub calls: u64,
    pub success: u64,
    pub errors: u64,
}

/// Task-local statistics, reset for every task and merged into the global
/// registry exactly once at `EndTask`.
#[derive(Debug, Default)]
pub struct TaskStats {
    per_tool: HashMap<String, ToolCallStats>,
}

impl TaskStats {
    pub fn record_call(&mut self, tool: &str) {
        self.per_tool.entry(tool.to_string()).or_default().calls += 1;
    }

    pub fn record_success(&mut self, tool: &str) {
        self.per_tool.entry(tool.to_string()).or_default().success += 1;
    }

    pub fn record_error(&mut self, tool: &str) {
        self.per_tool.entry(tool.to_string()).or_default().errors += 1;
    }

    pub fn get(&self, tool: &str) -> ToolCallStats {
        self.per_tool.get(tool).copied().unwrap_or_default()
    }

    pub fn snapshot(&self) -> HashMap<String, ToolCallStats> {
        self.per_tool.clone()
    }
}

/// Process-wide statistics, aggregated across tasks.
///
/// The shared instance is the only process-global state in the engine;
/// updates happen under one mutex per merge.  Tests inject a private
/// instance to stay independent of other tasks in the process.
#[derive(Debug, Default)]
pub struct GlobalStats {
    per_tool: Mutex<HashMap<String, ToolCallStats>>,
}

impl GlobalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide shared registry.
    pub fn shared() -> Arc<GlobalStats> {
        static SHARED: OnceLock<Arc<GlobalStats>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(GlobalStats::new())).clone()
    }

    /// Fold task-local stats in.  Called once per task at `EndTask`;
    /// reading the global registry afterwards never double-counts.
    pub fn merge(&self, task: &TaskStats) {
        let mut global = self.per_tool.lock().unwrap();
        for (tool, stats) in &task.per_tool {
            let entry = global.entry(tool.clone()).or_default();
            entry.calls += stats.calls;
            entry.success += stats.success;
            entry.errors += stats.errors;
        }
    }

    pub fn get(&self, tool: &str) -> ToolCallStats {
        self.per_tool.lock().unwrap().get(tool).copied().unwrap_or_default()
    }

    pub fn snapshot(&self) -> HashMap<String, ToolCallStats> {
        self.per_tool.lock().unwrap().clone()
    }

    /// One line per tool, sorted by name, for end-of-run logging.
    pub fn summary(&self) -> String {
        let snapshot = self.snapshot();
        let mut names: Vec<&String> = snapshot.keys().collect();
        names.sort();
        names
            .iter()
            .map(|name| {
                let s = snapshot[*name];
                format!("{name}: {} calls, {} ok, {} errors", s.calls, s.success, s.errors)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_stats_count_independently() {
        let mut stats = TaskStats::default();
        stats.record_call("readFile");
        stats.record_success("readFile");
        stats.record_call("shell");
        stats.record_error("shell");
        assert_eq!(stats.get("readFile"), ToolCallStats { calls: 1, success: 1, errors: 0 });
        assert_eq!(stats.get("shell"), ToolCallStats { calls: 1, success: 0, errors: 1 });
    }

    #[test]
    fn merge_sums_elementwise() {
        let global = GlobalStats::new();
        let mut first = TaskStats::default();
        first.record_call("t");
        first.record_success("t");
        global.merge(&first);

        let mut second = TaskStats::default();
        second.record_call("t");
        second.record_call("t");
        second.record_error("t");
        global.merge(&second);

        assert_eq!(global.get("t"), ToolCallStats { calls: 3, success: 1, errors: 1 });
    }

    #[test]
    fn reading_after_merge_does_not_double_count() {
        let global = GlobalStats::new();
        let mut task = TaskStats::default();
        task.record_call("t");
        global.merge(&task);
        let first_read = global.get("t");
        let second_read = global.get("t");
        assert_eq!(first_read, second_read);
        assert_eq!(first_read.calls, 1);
    }

    #[test]
    fn summary_is_sorted_by_tool_name() {
        let global = GlobalStats::new();
        let mut task = TaskStats::default();
        task.record_call("b");
        task.record_call("a");
        global.merge(&task);
        let summary = global.summary();
        let a = summary.find("a:").unwrap();
        let b = summary.find("b:").unwrap();
        assert!(a < b);
    }
}
