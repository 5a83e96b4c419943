// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::order::compare_ids;
use crate::providers::{TodoItem, TodoProvider, TodoStatus, TodoUpdate};

/// In-memory to-do store with hierarchical dotted ids.
#[derive(Default)]
pub struct TodoStore {
    items: Mutex<HashMap<String, TodoItem>>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoProvider for TodoStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<TodoItem>> {
        Ok(self.items.lock().unwrap().get(id).cloned())
    }

    async fn list(
        &self,
        parent: Option<&str>,
        status: Option<TodoStatus>,
    ) -> anyhow::Result<Vec<TodoItem>> {
        let items = self.items.lock().unwrap();
        let mut out: Vec<TodoItem> = items
            .values()
            .filter(|item| match parent {
                Some(parent) => item.id.starts_with(&format!("{parent}.")),
                None => true,
            })
            .filter(|item| status.map(|s| item.status == s).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(out)
    }

    async fn update(&self, input: TodoUpdate) -> anyhow::Result<TodoItem> {
        let mut items = self.items.lock().unwrap();
        let updated = match items.get(&input.id) {
            Some(existing) => TodoItem {
                id: existing.id.clone(),
                title: input.title.unwrap_or_else(|| existing.title.clone()),
                description: input.description.or_else(|| existing.description.clone()),
                status: input.status.unwrap_or(existing.status),
            },
            None => TodoItem {
                id: input.id.clone(),
                title: input
                    .title
                    .ok_or_else(|| anyhow::anyhow!("new todo item '{}' needs a title", input.id))?,
                description: input.description,
                status: input.status.unwrap_or(TodoStatus::Pending),
            },
        };
        items.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(ids: &[&str]) -> TodoStore {
        let store = TodoStore::new();
        for id in ids {
            store
                .update(TodoUpdate {
                    id: id.to_string(),
                    title: Some(format!("task {id}")),
                    description: None,
                    status: None,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn list_orders_ids_numerically() {
        let store = seeded(&["10", "2", "1.2", "1.1", "1"]).await;
        let ids: Vec<String> =
            store.list(None, None).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1", "1.1", "1.2", "2", "10"]);
    }

    #[tokio::test]
    async fn list_filters_by_parent() {
        let store = seeded(&["1", "1.1", "1.2", "2"]).await;
        let ids: Vec<String> =
            store.list(Some("1"), None).await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1.1", "1.2"]);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = seeded(&["1", "2"]).await;
        store
            .update(TodoUpdate {
                id: "1".into(),
                title: None,
                description: None,
                status: Some(TodoStatus::Completed),
            })
            .await
            .unwrap();
        let done = store.list(None, Some(TodoStatus::Completed)).await.unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "1");
    }

    #[tokio::test]
    async fn update_preserves_unset_fields() {
        let store = seeded(&["1"]).await;
        let updated = store
            .update(TodoUpdate {
                id: "1".into(),
                title: None,
                description: Some("details".into()),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.title, "task 1");
        assert_eq!(updated.description.as_deref(), Some("details"));
        assert_eq!(updated.status, TodoStatus::Pending);
    }

    #[tokio::test]
    async fn new_item_requires_title() {
        let store = TodoStore::new();
        let err = store
            .update(TodoUpdate { id: "9".into(), title: None, description: None, status: None })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("needs a title"));
    }
}
