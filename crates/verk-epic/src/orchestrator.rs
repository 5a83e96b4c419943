// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use verk_agent::{agent_workflow, is_cancellation, AgentConfig, AgentDeps, ExitReason};
use verk_model::{ContentPart, CANCELLED_MESSAGE};
use verk_runtime::WorkflowCtx;
use verk_tools::{ToolSpec, UserCancelledError};

use crate::context::{ContextStore, EpicContext};
use crate::git::{parse_name_status, reviewable_paths, run_command, shell_quote};
use crate::outputs::{
    plan_update_schema, planner_schema, review_schema, PlanUpdate, PlannerOutput, ReviewOutput,
};
use crate::plan::{first_open_item, progress};
use crate::prompts;

/// Review/fix rounds attempted per commit before moving on.
const MAX_REVIEW_RETRIES: u32 = 5;

/// Safety cap on plan iterations, in case the plan updater never converges.
const MAX_ITERATIONS: u32 = 50;

const BRANCH_NAME_PATTERN: &str = r"^[a-zA-Z0-9/_-]+$";

/// Collaborators for the epic orchestrator.
#[derive(Clone)]
pub struct EpicDeps {
    /// Shared by every sub-agent the epic spawns.
    pub agent: AgentDeps,
    /// Tool specs advertised to the planner, code, and review agents.
    pub tools: Vec<ToolSpec>,
    /// Request cap applied to each sub-agent individually.
    pub max_agent_requests: u32,
    /// When set, context is saved after each phase so a crashed epic can
    /// resume.
    pub context_store: Option<Arc<dyn ContextStore>>,
}

impl EpicDeps {
    pub fn new(agent: AgentDeps, tools: Vec<ToolSpec>) -> Self {
        Self { agent, tools, max_agent_requests: 24, context_store: None }
    }

    pub fn with_context_store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.context_store = Some(store);
        self
    }

    pub fn with_max_agent_requests(mut self, max: u32) -> Self {
        self.max_agent_requests = max;
        self
    }
}

/// How an epic ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EpicOutcome {
    Completed { summary: EpicSummary },
    Cancelled { message: String },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpicSummary {
    pub iterations: u32,
    pub commits: Vec<String>,
    pub branch: String,
    pub elapsed_secs: u64,
    pub hints: Vec<String>,
}

/// Drive an epic task end to end.
///
/// A workflow procedure like any other: git commands and user prompts are
/// tool-call suspensions, sub-agents run inside memoized steps, and the
/// whole thing resumes from a recorded store after a crash.
pub async fn epic_workflow(
    deps: EpicDeps,
    task: String,
    attachments: Vec<ContentPart>,
    ctx: WorkflowCtx,
) -> anyhow::Result<EpicOutcome> {
    match run_epic(&deps, &task, attachments, &ctx).await {
        Ok(outcome) => Ok(outcome),
        Err(e) if is_cancellation(&e) => {
            info!("epic cancelled by user");
            Ok(EpicOutcome::Cancelled { message: CANCELLED_MESSAGE.to_string() })
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "epic failed");
            Ok(EpicOutcome::Failed { message: format!("{e:#}") })
        }
    }
}

async fn run_epic(
    deps: &EpicDeps,
    task: &str,
    attachments: Vec<ContentPart>,
    ctx: &WorkflowCtx,
) -> anyhow::Result<EpicOutcome> {
    let started = Instant::now();

    // ── Validate ─────────────────────────────────────────────────────────
    if task.trim().is_empty() {
        error!("epic task is empty");
        return Ok(EpicOutcome::Failed { message: "task must not be empty".into() });
    }

    // ── Preflight ────────────────────────────────────────────────────────
    let git_dir = git_step(ctx, "git rev-parse --git-dir").await?;
    if git_dir.exit_code != 0 {
        error!("preflight failed: Git is not initialized in this directory");
        return Ok(EpicOutcome::Failed {
            message: "Git is not initialized in this directory".into(),
        });
    }
    let status = git_step(ctx, "git status --porcelain").await?;
    if !status.stdout.trim().is_empty() {
        error!("preflight failed: the working directory is not clean");
        return Ok(EpicOutcome::Failed {
            message: "the working directory is not clean; commit or stash your changes first"
                .into(),
        });
    }

    // ── Plan ─────────────────────────────────────────────────────────────
    let mut feedback: Option<String> = None;
    let (plan, branch_name) = loop {
        let mut parts = vec![ContentPart::text(format!("Task:\n{task}"))];
        parts.extend(attachments.iter().cloned());
        if let Some(f) = &feedback {
            parts.push(ContentPart::text(format!("User feedback:\n{f}")));
        }
        let config = AgentConfig::new(prompts::planner_system_prompt(), "")
            .with_user_parts(parts)
            .with_tools(deps.tools.clone())
            .with_output_schema(planner_schema())
            .with_max_requests(deps.max_agent_requests);
        let exit = run_sub_agent(ctx, deps, "plan-agent", config).await?;
        let message = match classify(exit) {
            AgentEnd::Message(m) => m,
            AgentEnd::Cancelled => return Err(cancel_error()),
            AgentEnd::Other(reason) => anyhow::bail!("planner agent failed: {reason}"),
        };
        let output: PlannerOutput =
            serde_json::from_str(&message).context("planner output did not parse")?;
        match output {
            PlannerOutput::Error { reason } => {
                error!(reason = %reason, "planner rejected the task");
                return Ok(EpicOutcome::Failed { message: format!("planner error: {reason}") });
            }
            PlannerOutput::Question { question } => {
                let Some(answer) = prompt_user(
                    ctx,
                    &question.question,
                    question.default_answer.as_deref(),
                )
                .await?
                else {
                    return Err(cancel_error());
                };
                let folded = format!("Q: {}\nA: {}", question.question, answer);
                feedback = Some(match feedback.take() {
                    Some(prev) => format!("{prev}\n{folded}"),
                    None => folded,
                });
            }
            PlannerOutput::PlanGenerated { plan, branch_name } => {
                let prompt = format!(
                    "Proposed plan:\n\n{plan}\n\nBranch: {branch_name}\n\n\
                     Press enter to approve, or describe what to change."
                );
                let Some(answer) = prompt_user(ctx, &prompt, Some("")).await? else {
                    return Err(cancel_error());
                };
                if answer.trim().is_empty() {
                    break (plan, branch_name);
                }
                feedback = Some(answer);
            }
        }
    };

    info!(branch = %branch_name, "plan approved");
    save_context(deps, task, &plan, &branch_name).await;

    // ── Branch ───────────────────────────────────────────────────────────
    if !is_valid_branch_name(&branch_name) {
        error!(branch = %branch_name, "invalid branch name");
        return Ok(EpicOutcome::Failed {
            message: format!("invalid branch name '{branch_name}'"),
        });
    }
    let verify =
        git_step(ctx, &format!("git rev-parse --verify {}", shell_quote(&branch_name))).await?;
    if verify.exit_code == 0 {
        return Ok(EpicOutcome::Failed {
            message: format!("branch '{branch_name}' already exists"),
        });
    }
    let checkout =
        git_step(ctx, &format!("git checkout -b {}", shell_quote(&branch_name))).await?;
    if checkout.exit_code != 0 {
        anyhow::bail!("failed to create branch: {}", checkout.stderr.trim());
    }

    // ── Iterate ──────────────────────────────────────────────────────────
    let mut current_plan = plan;
    let mut iterations = 0u32;
    let mut commits: Vec<String> = Vec::new();
    loop {
        let Some(item) = first_open_item(&current_plan) else {
            error!("plan has open work but no `- [ ]` item to pick up");
            break;
        };
        if iterations >= MAX_ITERATIONS {
            warn!(iterations, "iteration cap reached; stopping");
            break;
        }
        iterations += 1;
        info!(iteration = iterations, item = %item, "starting plan item");

        // Implement
        let code_task = format!(
            "You are implementing one step of this plan:\n\n{current_plan}\n\n\
             Current task: {item}"
        );
        let config = AgentConfig::new(prompts::code_system_prompt(), code_task)
            .with_tools(deps.tools.clone())
            .with_max_requests(deps.max_agent_requests);
        let exit = run_sub_agent(ctx, deps, "code-agent", config).await?;
        let implementation_summary = match classify(exit) {
            AgentEnd::Message(m) => m,
            AgentEnd::Cancelled => return Err(cancel_error()),
            AgentEnd::Other(reason) => {
                warn!(reason = %reason, "code agent did not finish cleanly");
                String::new()
            }
        };

        // Commit
        let commit_message = format!("feat: {item}");
        let commit = git_step(
            ctx,
            &format!("git add . && git commit -m {}", shell_quote(&commit_message)),
        )
        .await?;
        if commit.exit_code != 0 {
            anyhow::bail!("git commit failed: {}", commit.stderr.trim());
        }
        commits.push(commit_message);

        // Review
        run_review_loop(deps, ctx, &item).await?;

        // Update plan
        let update_task = json!({
            "currentPlan": current_plan,
            "implementationSummary": implementation_summary,
            "completedTask": item,
        })
        .to_string();
        let config = AgentConfig::new(prompts::plan_update_system_prompt(), update_task)
            .with_output_schema(plan_update_schema())
            .with_max_requests(deps.max_agent_requests);
        let exit = run_sub_agent(ctx, deps, "plan-update-agent", config).await?;
        let message = match classify(exit) {
            AgentEnd::Message(m) => m,
            AgentEnd::Cancelled => return Err(cancel_error()),
            AgentEnd::Other(reason) => anyhow::bail!("plan update agent failed: {reason}"),
        };
        let update: PlanUpdate =
            serde_json::from_str(&message).context("plan update output did not parse")?;
        current_plan = update.updated_plan;
        let (done, total) = progress(&current_plan);
        info!(done, total, "plan progress");
        save_context(deps, task, &current_plan, &branch_name).await;

        if update.is_complete {
            break;
        }
        if let Some(next) = update.next_task {
            debug!(next = %next, "plan updater suggested next task");
        }
    }

    // ── Done ─────────────────────────────────────────────────────────────
    let summary = EpicSummary {
        iterations,
        commits,
        branch: branch_name.clone(),
        elapsed_secs: started.elapsed().as_secs(),
        hints: vec![
            format!("Inspect the work: git log {branch_name}"),
            format!("Merge when satisfied: git merge {branch_name}"),
        ],
    };
    info!(
        iterations = summary.iterations,
        commits = summary.commits.len(),
        branch = %summary.branch,
        elapsed_secs = summary.elapsed_secs,
        "epic complete"
    );
    Ok(EpicOutcome::Completed { summary })
}

/// Up to [`MAX_REVIEW_RETRIES`] review → fix → amend rounds for the latest
/// commit.  Returns when review passes, has nothing to review, or the
/// reviewer dies (which must not block the epic).
async fn run_review_loop(
    deps: &EpicDeps,
    ctx: &WorkflowCtx,
    item: &str,
) -> anyhow::Result<()> {
    for attempt in 1..=MAX_REVIEW_RETRIES {
        let diff = git_step(ctx, "git diff --name-status HEAD~1 HEAD").await?;
        if diff.exit_code != 0 {
            anyhow::bail!("git diff failed: {}", diff.stderr.trim());
        }
        let files = parse_name_status(&diff.stdout);
        let review_files = reviewable_paths(&files);
        if review_files.is_empty() {
            debug!("no reviewable files in commit; review passes");
            return Ok(());
        }

        let patch = git_step(ctx, "git diff HEAD~1 HEAD").await?;
        let review_task = format!(
            "Review the latest commit for task: {item}\n\nChanged files:\n{}\n\nDiff:\n{}",
            review_files.join("\n"),
            patch.stdout
        );
        let config = AgentConfig::new(prompts::review_system_prompt(), review_task)
            .with_tools(deps.tools.clone())
            .with_output_schema(review_schema())
            .with_max_requests(deps.max_agent_requests);
        let exit = run_sub_agent(ctx, deps, "review-agent", config).await?;
        let review: ReviewOutput = match classify(exit) {
            AgentEnd::Message(m) => {
                serde_json::from_str(&m).context("review agent output did not parse")?
            }
            AgentEnd::Cancelled => return Err(cancel_error()),
            AgentEnd::Other(reason) => {
                warn!(reason = %reason, "review agent ended early; skipping review");
                return Ok(());
            }
        };
        if review.specific_reviews.is_empty() {
            debug!(attempt, "review passed");
            return Ok(());
        }

        info!(issues = review.specific_reviews.len(), attempt, "review found issues");
        let issues = review
            .specific_reviews
            .iter()
            .map(|r| format!("- {}: {}", r.file, r.comment))
            .collect::<Vec<_>>()
            .join("\n");
        let fix_task = format!("Fix these review issues in the latest commit:\n{issues}");
        let config = AgentConfig::new(prompts::code_system_prompt(), fix_task)
            .with_tools(deps.tools.clone())
            .with_max_requests(deps.max_agent_requests);
        let exit = run_sub_agent(ctx, deps, "fix-agent", config).await?;
        if matches!(classify(exit), AgentEnd::Cancelled) {
            return Err(cancel_error());
        }
        let amend = git_step(ctx, "git add . && git commit --amend --no-edit").await?;
        if amend.exit_code != 0 {
            anyhow::bail!("git amend failed: {}", amend.stderr.trim());
        }
        if attempt == MAX_REVIEW_RETRIES {
            warn!("review issues may remain after {MAX_REVIEW_RETRIES} attempts");
        }
    }
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

enum AgentEnd {
    Message(String),
    Cancelled,
    Other(String),
}

fn classify(exit: ExitReason) -> AgentEnd {
    match exit {
        ExitReason::Exit { message, .. } => AgentEnd::Message(message),
        ExitReason::Interrupted { .. } => AgentEnd::Cancelled,
        ExitReason::UsageExceeded => AgentEnd::Other("usage budget exceeded".into()),
        ExitReason::Error { message, .. } => AgentEnd::Other(message),
    }
}

fn cancel_error() -> anyhow::Error {
    anyhow::Error::new(UserCancelledError)
}

fn is_valid_branch_name(name: &str) -> bool {
    (3..=255).contains(&name.len())
        && regex::Regex::new(BRANCH_NAME_PATTERN).unwrap().is_match(name)
}

/// Run a git command inside a memoized step so resumed epics replay the
/// recorded output instead of re-executing side effects.
async fn git_step(
    ctx: &WorkflowCtx,
    command: &str,
) -> anyhow::Result<verk_tools::CommandOutput> {
    ctx.step("git", || run_command(ctx, command)).await
}

/// Prompt the user through the `input` tool suspension.  `None` means the
/// user cancelled.
async fn prompt_user(
    ctx: &WorkflowCtx,
    message: &str,
    default: Option<&str>,
) -> anyhow::Result<Option<String>> {
    let result = ctx
        .step("prompt", || {
            ctx.call_tool("input", json!({ "message": message, "default": default }))
        })
        .await?;
    if result.is_cancelled() {
        return Ok(None);
    }
    if result.is_error() {
        anyhow::bail!("user prompt failed: {}", result.render());
    }
    Ok(Some(result.render()))
}

/// Run a sub-agent as a scoped child invocation; the recorded exit reason
/// is the step value, so resumed epics skip the whole sub-conversation,
/// and a half-finished sub-agent resumes its own recorded turns without
/// touching a sibling's.
async fn run_sub_agent(
    ctx: &WorkflowCtx,
    deps: &EpicDeps,
    step_name: &str,
    config: AgentConfig,
) -> anyhow::Result<ExitReason> {
    ctx.step_scoped(step_name, |child| agent_workflow(config, deps.agent.clone(), child)).await
}

async fn save_context(deps: &EpicDeps, task: &str, plan: &str, branch: &str) {
    if let Some(store) = &deps.context_store {
        let context = EpicContext {
            task: Some(task.to_string()),
            plan: Some(plan.to_string()),
            branch_name: Some(branch.to_string()),
            todos: None,
            memory: None,
        };
        if let Err(e) = store.save(&context).await {
            warn!(error = %e, "failed to save epic context");
        }
    }
}
