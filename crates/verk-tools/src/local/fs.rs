// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use walkdir::WalkDir;

use crate::providers::{FileSystemProvider, SearchMatch, SearchQuery};

/// Directories skipped by default when listing and searching.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target", ".svn", ".hg"];

/// File-system provider rooted at a sandbox directory.
///
/// All paths are resolved relative to the root; absolute inputs and `..`
/// traversal that would escape the root are rejected.
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let joined = self.root.join(path);
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                std::path::Component::ParentDir => {
                    if !normalized.pop() {
                        anyhow::bail!("path escapes the workspace root: {path}");
                    }
                }
                std::path::Component::CurDir => {}
                other => normalized.push(other),
            }
        }
        if !normalized.starts_with(&self.root) {
            anyhow::bail!("path escapes the workspace root: {path}");
        }
        Ok(normalized)
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}

fn is_ignored(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| IGNORED_DIRS.contains(&name))
        .unwrap_or(false)
}

/// True when any directory component of `path` is in the ignored set.
fn crosses_ignored_dir(path: &str) -> bool {
    Path::new(path)
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| IGNORED_DIRS.contains(&name))
}

#[async_trait]
impl FileSystemProvider for LocalFileSystem {
    async fn read(&self, path: &str, include_ignored: bool) -> anyhow::Result<String> {
        let resolved = self.resolve(path)?;
        if !include_ignored && crosses_ignored_dir(path) {
            anyhow::bail!(
                "{path} is inside an ignored directory; set includeIgnored to read it"
            );
        }
        tokio::fs::read_to_string(&resolved)
            .await
            .with_context(|| format!("failed to read {path}"))
    }

    async fn read_binary(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        tokio::fs::read(&resolved)
            .await
            .with_context(|| format!("failed to read {path}"))
    }

    async fn write(&self, path: &str, content: &str) -> anyhow::Result<()> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&resolved, content)
            .await
            .with_context(|| format!("failed to write {path}"))
    }

    async fn remove(&self, path: &str) -> anyhow::Result<()> {
        let resolved = self.resolve(path)?;
        tokio::fs::remove_file(&resolved)
            .await
            .with_context(|| format!("failed to remove {path}"))
    }

    async fn rename(&self, from: &str, to: &str) -> anyhow::Result<()> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if let Some(parent) = dst.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::rename(&src, &dst)
            .await
            .with_context(|| format!("failed to rename {from} to {to}"))
    }

    async fn list(
        &self,
        path: &str,
        recursive: bool,
        max_count: usize,
    ) -> anyhow::Result<Vec<String>> {
        let resolved = self.resolve(path)?;
        // walkdir is synchronous; directory trees are small enough that
        // blocking in place keeps the implementation simple.
        let root = self.root.clone();
        let paths = tokio::task::spawn_blocking(move || {
            let depth = if recursive { usize::MAX } else { 1 };
            let mut out = Vec::new();
            let walker = WalkDir::new(&resolved)
                .max_depth(depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_ignored(e));
            for entry in walker {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                if entry.depth() == 0 {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(&root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .into_owned();
                out.push(rel);
                if out.len() >= max_count {
                    break;
                }
            }
            out
        })
        .await?;
        Ok(paths)
    }

    async fn search(&self, query: &SearchQuery) -> anyhow::Result<Vec<SearchMatch>> {
        let resolved = self.resolve(&query.path)?;
        let pattern = regex::Regex::new(&query.pattern)
            .with_context(|| format!("invalid search pattern: {}", query.pattern))?;
        let context_lines = query.context_lines;
        let root = self.root.clone();

        let matches = tokio::task::spawn_blocking(move || {
            // Cap the result list so one broad pattern cannot flood the
            // conversation.
            const MAX_MATCHES: usize = 100;
            let mut out = Vec::new();
            let walker = WalkDir::new(&resolved)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_ignored(e));
            'files: for entry in walker.flatten() {
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(content) = std::fs::read_to_string(entry.path()) else {
                    continue; // binary or unreadable
                };
                let lines: Vec<&str> = content.lines().collect();
                for (i, line) in lines.iter().enumerate() {
                    if !pattern.is_match(line) {
                        continue;
                    }
                    let start = i.saturating_sub(context_lines);
                    let end = (i + context_lines + 1).min(lines.len());
                    out.push(SearchMatch {
                        path: entry
                            .path()
                            .strip_prefix(&root)
                            .unwrap_or(entry.path())
                            .to_string_lossy()
                            .into_owned(),
                        line_number: i + 1,
                        line: line.to_string(),
                        context_before: lines[start..i].iter().map(|l| l.to_string()).collect(),
                        context_after: lines[i + 1..end].iter().map(|l| l.to_string()).collect(),
                    });
                    if out.len() >= MAX_MATCHES {
                        break 'files;
                    }
                }
            }
            out
        })
        .await?;
        Ok(matches)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
