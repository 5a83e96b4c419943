// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Git plumbing for the orchestrator.  Every command goes through the
//! `executeCommand` tool suspension, so the host's shell provider does the
//! actual work and recorded runs replay without re-executing anything.

use serde_json::json;

use verk_runtime::WorkflowCtx;
use verk_tools::CommandOutput;

/// File extensions the review loop considers worth reviewing.
pub const REVIEWABLE_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".py", ".java", ".go", ".rs", ".c", ".cpp", ".h", ".css",
    ".scss", ".html", ".vue", ".svelte",
];

/// Run a shell command through the tool suspension and return its output.
/// The command not running at all (no shell provider, spawn failure) is an
/// error; a non-zero exit code is not.
pub async fn run_command(ctx: &WorkflowCtx, command: &str) -> anyhow::Result<CommandOutput> {
    let result = ctx.call_tool("executeCommand", json!({ "command": command })).await?;
    if result.is_error() {
        anyhow::bail!("command failed to run: {}", result.render());
    }
    let output: CommandOutput = serde_json::from_str(&result.render())
        .map_err(|e| anyhow::anyhow!("unexpected executeCommand payload: {e}"))?;
    Ok(output)
}

/// Single-quote `value` for safe interpolation into a shell command line.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Parse `git diff --name-status` output into `(status, path)` pairs.
pub fn parse_name_status(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let status = parts.next()?;
            // Renames (R100) carry old and new path; the new path is last.
            let path = parts.last()?;
            Some((status.to_string(), path.to_string()))
        })
        .collect()
}

/// Paths from a name-status listing whose extension is in the reviewable
/// set.
pub fn reviewable_paths(files: &[(String, String)]) -> Vec<String> {
    files
        .iter()
        .filter(|(_, path)| {
            REVIEWABLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        })
        .map(|(_, path)| path.clone())
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
