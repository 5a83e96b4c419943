// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use verk_runtime::{start, MemoryStepStore, RunStatus, StepStore, WorkflowCtx};
use verk_tools::{Providers, ToolCatalog};

/// Reference host pump: runs a workflow to completion, serving every
/// tool-call suspension through the catalog.
///
/// Hosts that need custom scheduling (timeouts around tools, approval
/// gates, cross-process persistence between suspensions) drive
/// [`RunStatus`] themselves; this covers everyone else.
pub struct Executor {
    catalog: Arc<ToolCatalog>,
    providers: Providers,
    store: Arc<dyn StepStore>,
}

impl Executor {
    pub fn new(catalog: ToolCatalog, providers: Providers) -> Self {
        Self {
            catalog: Arc::new(catalog),
            providers,
            store: Arc::new(MemoryStepStore::new()),
        }
    }

    /// Use a pre-seeded step store (resume from a recorded run).
    pub fn with_store(mut self, store: Arc<dyn StepStore>) -> Self {
        self.store = store;
        self
    }

    pub fn store(&self) -> &Arc<dyn StepStore> {
        &self.store
    }

    /// Request cooperative cancellation of running tool handlers.
    pub fn cancel(&self) {
        self.providers.cancel.cancel();
    }

    /// Run `procedure` to completion.
    pub async fn run<O, F, Fut>(&self, procedure: F) -> anyhow::Result<O>
    where
        F: FnOnce(WorkflowCtx) -> Fut,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Send + 'static,
    {
        let mut status = start(self.store.clone(), procedure).await;
        loop {
            status = match status {
                RunStatus::Pending(pending) => {
                    debug!(tool = pending.tool(), "executor serving tool call");
                    let result = self
                        .catalog
                        .invoke(&self.providers, pending.tool(), pending.input())
                        .await;
                    pending.next(result).await
                }
                RunStatus::Completed { output } => return Ok(output),
                RunStatus::Failed { error } => return Err(error),
            };
        }
    }
}
