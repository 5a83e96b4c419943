// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use verk_model::ToolResult;

use crate::error::{DetachedError, InjectedError};
use crate::store::StepStore;

/// The value yielded to the host when a workflow suspends.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub tool: String,
    /// Validated input as the workflow supplied it.
    pub input: Value,
}

struct ToolRequestEnvelope {
    request: ToolCallRequest,
    reply: oneshot::Sender<Result<ToolResult, InjectedError>>,
}

/// Handle a workflow procedure uses to call tools and memoize steps.
///
/// Cheap to clone; clones share the request channel, step store, and
/// ordinal counters of the invocation they belong to.  Nested invocations
/// created by [`WorkflowCtx::step_scoped`] get their own counters and a key
/// prefix, so sibling sub-workflows never collide in the store.
#[derive(Clone)]
pub struct WorkflowCtx {
    shared: Arc<CtxShared>,
    /// Key prefix of this invocation: empty at the root,
    /// `"plan-agent#1/"` inside a scoped child step.
    scope: String,
    /// Per-name ordinal counters of this invocation.
    counters: Arc<Mutex<HashMap<String, u32>>>,
}

struct CtxShared {
    requests: mpsc::Sender<ToolRequestEnvelope>,
    store: Arc<dyn StepStore>,
}

impl WorkflowCtx {
    /// Issue a tool-call suspension and return the host-provided result.
    ///
    /// The returned error is either one injected by the host via
    /// [`PendingToolCall::throw`] (downcasts to [`InjectedError`]) or a
    /// [`DetachedError`] when the host dropped the run.
    pub async fn call_tool(
        &self,
        tool: impl Into<String>,
        input: Value,
    ) -> anyhow::Result<ToolResult> {
        let tool = tool.into();
        debug!(tool = %tool, "workflow suspending on tool call");
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = ToolRequestEnvelope {
            request: ToolCallRequest { tool, input },
            reply: reply_tx,
        };
        self.shared
            .requests
            .send(envelope)
            .await
            .map_err(|_| anyhow::Error::new(DetachedError))?;
        match reply_rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(injected)) => Err(anyhow::Error::new(injected)),
            Err(_) => Err(anyhow::Error::new(DetachedError)),
        }
    }

    /// Run `body` as a memoized step.
    ///
    /// The Nth call to `step("name", …)` within one invocation persists
    /// under key `name#N`.  On replay over a recorded store the stored
    /// value is returned without executing `body`; otherwise `body` runs
    /// (suspending as needed), its result is recorded, then returned.
    /// Errors propagate without being recorded.
    ///
    /// Replay depends on determinism: a resumed workflow must issue the
    /// same steps in the same order as the original execution.  Do not
    /// branch on anything that differs between runs before a `step` call.
    pub async fn step<T, F, Fut>(&self, name: &str, body: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let key = self.next_key(name);
        match self.recall(&key)? {
            Some(stored) => Ok(stored),
            None => {
                let value = body().await?;
                self.record(&key, &value)?;
                Ok(value)
            }
        }
    }

    /// Like [`WorkflowCtx::step`], but the body is a nested workflow
    /// invocation: it receives a child context whose step keys live under
    /// this step's key (`plan-agent#1/request#2`, …).
    ///
    /// Use this to compose sub-workflows.  The child's internal steps stay
    /// replayable on partial resume, and two sibling children can issue the
    /// same step names without colliding in the store.  To the parent, the
    /// child is opaque: only its final result lands under this step's key.
    pub async fn step_scoped<T, F, Fut>(&self, name: &str, body: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(WorkflowCtx) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let key = self.next_key(name);
        match self.recall(&key)? {
            Some(stored) => Ok(stored),
            None => {
                let child = WorkflowCtx {
                    shared: self.shared.clone(),
                    scope: format!("{key}/"),
                    counters: Arc::new(Mutex::new(HashMap::new())),
                };
                let value = body(child).await?;
                self.record(&key, &value)?;
                Ok(value)
            }
        }
    }

    fn recall<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.shared.store.get(key) {
            Some(stored) => {
                debug!(key = %key, "step replayed from store");
                let value = serde_json::from_value(stored).with_context(|| {
                    format!("stored value for step '{key}' does not deserialize")
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn record<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_value(value)
            .with_context(|| format!("result of step '{key}' does not serialize"))?;
        self.shared.store.put(key, json);
        Ok(())
    }

    fn next_key(&self, name: &str) -> String {
        let mut counters = self.counters.lock().unwrap();
        let ordinal = counters.entry(name.to_string()).or_insert(0);
        *ordinal += 1;
        format!("{}{name}#{ordinal}", self.scope)
    }
}

/// The host-visible state of a running workflow.
pub enum RunStatus<O> {
    Completed { output: O },
    Failed { error: anyhow::Error },
    Pending(PendingToolCall<O>),
}

impl<O> RunStatus<O> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// A suspended workflow waiting for one tool result.
///
/// Dropping this value abandons the run: the procedure's pending tool call
/// fails with [`DetachedError`] and its task unwinds.
pub struct PendingToolCall<O> {
    pub request: ToolCallRequest,
    reply: oneshot::Sender<Result<ToolResult, InjectedError>>,
    driver: Driver<O>,
}

impl<O: Send + 'static> PendingToolCall<O> {
    pub fn tool(&self) -> &str {
        &self.request.tool
    }

    pub fn input(&self) -> &Value {
        &self.request.input
    }

    /// Supply the tool result and advance to the next status.
    pub async fn next(self, result: ToolResult) -> RunStatus<O> {
        let _ = self.reply.send(Ok(result));
        self.driver.advance().await
    }

    /// Inject an error at the suspension point and advance.  The workflow
    /// observes it as a failed `call_tool` and may catch it.
    pub async fn throw(self, message: impl Into<String>) -> RunStatus<O> {
        let _ = self.reply.send(Err(InjectedError { message: message.into() }));
        self.driver.advance().await
    }
}

struct Driver<O> {
    requests: mpsc::Receiver<ToolRequestEnvelope>,
    handle: JoinHandle<anyhow::Result<O>>,
}

impl<O: Send + 'static> Driver<O> {
    async fn advance(mut self) -> RunStatus<O> {
        // When the procedure finishes, every ctx clone drops and the
        // request channel closes; recv() returning None is the completion
        // signal.
        match self.requests.recv().await {
            Some(envelope) => RunStatus::Pending(PendingToolCall {
                request: envelope.request,
                reply: envelope.reply,
                driver: self,
            }),
            None => match self.handle.await {
                Ok(Ok(output)) => RunStatus::Completed { output },
                Ok(Err(error)) => RunStatus::Failed { error },
                Err(join_error) => RunStatus::Failed {
                    error: anyhow::anyhow!("workflow task panicked: {join_error}"),
                },
            },
        }
    }
}

/// Start a workflow procedure and drive it to its first status.
///
/// The procedure receives a [`WorkflowCtx`] and runs on its own tokio task;
/// between suspensions it executes without interference from the host.
pub async fn start<O, F, Fut>(store: Arc<dyn StepStore>, procedure: F) -> RunStatus<O>
where
    F: FnOnce(WorkflowCtx) -> Fut,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    O: Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let ctx = WorkflowCtx {
        shared: Arc::new(CtxShared { requests: tx, store }),
        scope: String::new(),
        counters: Arc::new(Mutex::new(HashMap::new())),
    };
    let handle = tokio::spawn(procedure(ctx));
    Driver { requests: rx, handle }.advance().await
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStepStore;

    fn store() -> Arc<MemoryStepStore> {
        Arc::new(MemoryStepStore::new())
    }

    #[tokio::test]
    async fn completes_without_suspension() {
        let status = start(store(), |_ctx| async { Ok(41 + 1) }).await;
        match status {
            RunStatus::Completed { output } => assert_eq!(output, 42),
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn failure_surfaces_as_failed() {
        let status =
            start::<(), _, _>(store(), |_ctx| async { anyhow::bail!("broken") }).await;
        match status {
            RunStatus::Failed { error } => assert!(error.to_string().contains("broken")),
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn tool_call_suspends_and_resumes() {
        let status = start(store(), |ctx| async move {
            let result = ctx.call_tool("echo", json!({"v": 1})).await?;
            Ok(result.render())
        })
        .await;
        let pending = match status {
            RunStatus::Pending(p) => p,
            _ => panic!("expected pending"),
        };
        assert_eq!(pending.tool(), "echo");
        assert_eq!(pending.input()["v"], json!(1));
        match pending.next(ToolResult::text("pong")).await {
            RunStatus::Completed { output } => assert_eq!(output, "pong"),
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn throw_is_catchable_inside_workflow() {
        let status = start(store(), |ctx| async move {
            match ctx.call_tool("net", json!({})).await {
                Ok(_) => Ok("unexpected".to_string()),
                Err(e) => {
                    assert!(e.downcast_ref::<InjectedError>().is_some());
                    Ok(format!("caught: {e}"))
                }
            }
        })
        .await;
        let pending = match status {
            RunStatus::Pending(p) => p,
            _ => panic!("expected pending"),
        };
        match pending.throw("cancelled by host").await {
            RunStatus::Completed { output } => assert_eq!(output, "caught: cancelled by host"),
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn uncaught_throw_fails_the_run() {
        let status = start(store(), |ctx| async move {
            let r = ctx.call_tool("net", json!({})).await?;
            Ok(r.render())
        })
        .await;
        let pending = match status {
            RunStatus::Pending(p) => p,
            _ => panic!("expected pending"),
        };
        match pending.throw("boom").await {
            RunStatus::Failed { error } => assert!(error.to_string().contains("boom")),
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn step_ordinals_disambiguate_duplicate_names() {
        let st = store();
        let status = start(st.clone(), |ctx| async move {
            let a: u32 = ctx.step("fetch", || async { Ok(1) }).await?;
            let b: u32 = ctx.step("fetch", || async { Ok(2) }).await?;
            Ok(a + b)
        })
        .await;
        assert!(matches!(status, RunStatus::Completed { output: 3 }));
        let snapshot = st.snapshot();
        assert_eq!(snapshot.get("fetch#1"), Some(&json!(1)));
        assert_eq!(snapshot.get("fetch#2"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn memoized_step_skips_body() {
        let st = store();
        st.put("expensive#1", json!("stored"));
        let status = start(st, |ctx| async move {
            let value: String = ctx
                .step("expensive", || async { Ok("freshly computed".to_string()) })
                .await?;
            Ok(value)
        })
        .await;
        // The stored value wins; the body result never appears.
        match status {
            RunStatus::Completed { output } => assert_eq!(output, "stored"),
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn step_error_is_not_recorded() {
        let st = store();
        let status = start::<u32, _, _>(st.clone(), |ctx| async move {
            ctx.step("flaky", || async { anyhow::bail!("transient") }).await
        })
        .await;
        assert!(matches!(status, RunStatus::Failed { .. }));
        assert!(st.snapshot().is_empty());
    }

    #[tokio::test]
    async fn step_body_may_suspend_and_memoizes_final_result() {
        let st = store();
        let status = start(st.clone(), |ctx| async move {
            let inner = ctx.clone();
            ctx.step("wrapped", || async move {
                let r = inner.call_tool("probe", json!({})).await?;
                Ok(format!("seen:{}", r.render()))
            })
            .await
        })
        .await;
        let pending = match status {
            RunStatus::Pending(p) => p,
            _ => panic!("expected pending"),
        };
        assert_eq!(pending.tool(), "probe");
        match pending.next(ToolResult::text("x")).await {
            RunStatus::Completed { output } => assert_eq!(output, "seen:x"),
            _ => panic!("expected completion"),
        }
        // The memo key holds the step's final result, not the tool result.
        assert_eq!(st.snapshot().get("wrapped#1"), Some(&json!("seen:x")));
    }

    #[tokio::test]
    async fn replay_from_snapshot_issues_no_tool_calls() {
        // First run: two tool calls, both inside steps.
        let st = store();
        let workflow = |ctx: WorkflowCtx| async move {
            let a = ctx
                .step("first", {
                    let ctx = ctx.clone();
                    move || async move { Ok(ctx.call_tool("a", json!({})).await?.render()) }
                })
                .await?;
            let b = ctx
                .step("second", {
                    let ctx = ctx.clone();
                    move || async move { Ok(ctx.call_tool("b", json!({})).await?.render()) }
                })
                .await?;
            Ok(format!("{a}+{b}"))
        };

        let mut status = start(st.clone(), workflow).await;
        let mut served = Vec::new();
        loop {
            status = match status {
                RunStatus::Pending(p) => {
                    served.push(p.tool().to_string());
                    let reply = ToolResult::text(p.tool().to_string());
                    p.next(reply).await
                }
                done => {
                    status = done;
                    break;
                }
            };
        }
        match &status {
            RunStatus::Completed { output } => assert_eq!(output, "a+b"),
            _ => panic!("expected completion"),
        }
        assert_eq!(served, vec!["a", "b"]);

        // Replay over the recorded store: same output, zero suspensions.
        let replay_store = Arc::new(MemoryStepStore::from_snapshot(st.snapshot()));
        let status = start(replay_store, workflow).await;
        match status {
            RunStatus::Completed { output } => assert_eq!(output, "a+b"),
            RunStatus::Pending(p) => panic!("unexpected suspension on {}", p.tool()),
            RunStatus::Failed { error } => panic!("replay failed: {error}"),
        }
    }

    #[tokio::test]
    async fn sibling_scoped_steps_do_not_collide() {
        let st = store();
        let status = start(st.clone(), |ctx| async move {
            // Two nested invocations that both issue `step("inner")`.
            let first: u32 = ctx
                .step_scoped("child", |child| async move {
                    child.step("inner", || async { Ok(1) }).await
                })
                .await?;
            let second: u32 = ctx
                .step_scoped("child", |child| async move {
                    child.step("inner", || async { Ok(2) }).await
                })
                .await?;
            Ok(first * 10 + second)
        })
        .await;
        assert!(matches!(status, RunStatus::Completed { output: 12 }));
        let snapshot = st.snapshot();
        assert_eq!(snapshot.get("child#1/inner#1"), Some(&json!(1)));
        assert_eq!(snapshot.get("child#2/inner#1"), Some(&json!(2)));
        assert_eq!(snapshot.get("child#1"), Some(&json!(1)));
        assert_eq!(snapshot.get("child#2"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn partial_resume_reruns_only_the_unfinished_child() {
        // Simulate a crash after child#1 completed but before child#2: the
        // store holds child#1 (and its inner steps), nothing for child#2.
        let st = store();
        st.put("child#1", json!("done-1"));
        st.put("child#1/probe#1", json!("stale"));

        let status = start(st.clone(), |ctx| async move {
            let first: String = ctx
                .step_scoped("child", |_child| async move { Ok("re-ran".to_string()) })
                .await?;
            let second: String = ctx
                .step_scoped("child", |child| async move {
                    // A fresh child starts its own ordinals at 1 and must
                    // not see the sibling's recorded probe.
                    Ok(child.call_tool("probe", json!({})).await?.render())
                })
                .await?;
            Ok(format!("{first},{second}"))
        })
        .await;
        let pending = match status {
            RunStatus::Pending(p) => p,
            _ => panic!("expected the second child to suspend"),
        };
        assert_eq!(pending.tool(), "probe");
        match pending.next(ToolResult::text("fresh")).await {
            RunStatus::Completed { output } => assert_eq!(output, "done-1,fresh"),
            _ => panic!("expected completion"),
        }
    }

    #[tokio::test]
    async fn dropping_pending_detaches_the_run() {
        let (done_tx, done_rx) = oneshot::channel::<String>();
        let status = start(store(), |ctx| async move {
            let err = ctx.call_tool("never", json!({})).await.unwrap_err();
            let _ = done_tx.send(err.to_string());
            Ok(())
        })
        .await;
        match status {
            RunStatus::Pending(p) => drop(p),
            _ => panic!("expected pending"),
        }
        let observed = done_rx.await.unwrap();
        assert!(observed.contains("detached"));
    }
}
