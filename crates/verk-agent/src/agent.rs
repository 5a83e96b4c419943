// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use verk_model::{
    ContentPart, Message, ModelDelta, ModelProvider, ModelRequest, ToolResult, ToolSchema, Usage,
    CANCELLED_MESSAGE,
};
use verk_runtime::{InjectedError, WorkflowCtx};
use verk_schema::Schema;
use verk_tools::ToolSpec;

use crate::events::{EventSink, TaskEvent};
use crate::exit::ExitReason;
use crate::stats::{GlobalStats, TaskStats};
use crate::usage::UsageMeter;

/// Default model-request cap per task.
const DEFAULT_MAX_REQUESTS: u32 = 24;

/// Empty or thinking-only turns tolerated before giving up.
const MAX_EMPTY_TURN_RETRIES: u32 = 2;

/// One agent task: prompt, tools, and termination contract.
#[derive(Clone)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub user_message: Vec<ContentPart>,
    pub tools: Vec<ToolSpec>,
    /// When set, the task only exits normally through a final object that
    /// validates against this schema.
    pub output_schema: Option<Schema>,
    pub max_requests: u32,
}

impl AgentConfig {
    pub fn new(system_prompt: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_message: vec![ContentPart::text(user_text)],
            tools: Vec::new(),
            output_schema: None,
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }

    pub fn with_user_parts(mut self, parts: Vec<ContentPart>) -> Self {
        self.user_message = parts;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }
}

/// Host-supplied collaborators for the agent loop.
#[derive(Clone)]
pub struct AgentDeps {
    pub model: Arc<dyn ModelProvider>,
    pub events: EventSink,
    pub stats: Arc<GlobalStats>,
    /// Optional token ceiling on top of the request cap.
    pub max_total_tokens: Option<u64>,
    /// Forward reasoning deltas as events.  Reasoning tokens count toward
    /// usage either way.
    pub verbose_reasoning: bool,
}

impl AgentDeps {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self {
            model,
            events: EventSink::null(),
            stats: GlobalStats::shared(),
            max_total_tokens: None,
            verbose_reasoning: false,
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_stats(mut self, stats: Arc<GlobalStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_max_total_tokens(mut self, cap: u64) -> Self {
        self.max_total_tokens = Some(cap);
        self
    }

    pub fn with_verbose_reasoning(mut self) -> Self {
        self.verbose_reasoning = true;
        self
    }
}

/// One memoized model turn.  Recorded by the `request` step so resumed
/// tasks replay without re-contacting the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelTurn {
    text: String,
    reasoning: String,
    tool_calls: Vec<TurnToolCall>,
    final_object: Option<Value>,
    usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TurnToolCall {
    id: String,
    name: String,
    input: Value,
}

impl ModelTurn {
    fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Drive a model ↔ tool conversation to termination.
///
/// This is itself a workflow procedure: every model turn and every tool
/// invocation runs inside a [`WorkflowCtx::step`], and tool execution is a
/// suspension served by the host executor.
pub async fn agent_workflow(
    config: AgentConfig,
    deps: AgentDeps,
    ctx: WorkflowCtx,
) -> anyhow::Result<ExitReason> {
    let task_id = uuid::Uuid::new_v4().to_string();
    deps.events.emit(TaskEvent::StartTask {
        task_id,
        system_prompt: config.system_prompt.clone(),
    });

    let mut task_stats = TaskStats::default();
    let mut meter = UsageMeter::new(config.max_requests, deps.max_total_tokens);
    let mut conversation: Vec<Message> =
        vec![Message::user_with_parts(config.user_message.clone())];
    let advertised: Vec<ToolSchema> = config.tools.iter().map(ToolSpec::advertised).collect();
    let output_schema_json = config.output_schema.as_ref().map(Schema::to_json_schema);

    let mut tool_counter: u32 = 0;
    let mut empty_turn_retries: u32 = 0;
    let mut schema_retry_used = false;

    let exit = 'requests: loop {
        if meter.requests_exhausted() {
            warn!(requests = meter.requests(), "request budget exhausted");
            deps.events.emit(TaskEvent::UsageExceeded);
            break ExitReason::UsageExceeded;
        }

        deps.events.emit(TaskEvent::StartRequest { messages: conversation.clone() });
        meter.record_request();

        let request = ModelRequest {
            system_prompt: config.system_prompt.clone(),
            messages: conversation.clone(),
            tools: advertised.clone(),
            output_schema: output_schema_json.clone(),
        };
        let turn: ModelTurn = ctx
            .step("request", || {
                run_model_turn(deps.model.as_ref(), &deps.events, deps.verbose_reasoning, request)
            })
            .await?;

        meter.record_usage(turn.usage);
        if meter.tokens_exhausted() {
            deps.events.emit(TaskEvent::EndRequest);
            deps.events.emit(TaskEvent::UsageExceeded);
            break ExitReason::UsageExceeded;
        }

        // Record the assistant turn before acting on it; histories are
        // append-only and tool results must follow their calls.
        let mut parts = Vec::new();
        if !turn.reasoning.is_empty() {
            parts.push(ContentPart::Reasoning { text: turn.reasoning.clone() });
        }
        if !turn.text.is_empty() {
            parts.push(ContentPart::text(turn.text.clone()));
        }
        for tc in &turn.tool_calls {
            parts.push(ContentPart::ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                input: tc.input.clone(),
            });
        }
        if !parts.is_empty() {
            conversation.push(Message::assistant_with_parts(parts));
        }

        if !turn.tool_calls.is_empty() {
            // Tool calls take precedence over any final object emitted in
            // the same turn; the text stays in history un-parsed.
            for tc in &turn.tool_calls {
                deps.events.emit(TaskEvent::ToolUse {
                    tool: tc.name.clone(),
                    params: tc.input.clone(),
                });
                task_stats.record_call(&tc.name);

                let result = match config.tools.iter().find(|s| s.name == tc.name) {
                    None => ToolResult::error(format!("unknown tool: {}", tc.name)),
                    Some(spec) => match spec.schema.validate(&tc.input) {
                        Err(e) => ToolResult::error(e.to_string()),
                        Ok(validated) => {
                            tool_counter += 1;
                            let step_name = format!("tool-{}-{}", tc.name, tool_counter);
                            let step_result = ctx
                                .step(&step_name, || ctx.call_tool(&tc.name, validated))
                                .await;
                            match step_result {
                                Ok(result) => result,
                                Err(e) if is_cancellation(&e) => ToolResult::cancelled(),
                                Err(e) => match e.downcast_ref::<InjectedError>() {
                                    // A host-injected failure behaves like a
                                    // failed tool: observable, fed back to
                                    // the model.
                                    Some(injected) => {
                                        ToolResult::error(injected.message.clone())
                                    }
                                    None => return Err(e),
                                },
                            }
                        }
                    },
                };

                if result.is_cancelled() {
                    // Keep the ToolUse/ToolError pairing intact before the
                    // task interrupts.
                    deps.events.emit(TaskEvent::ToolError {
                        tool: tc.name.clone(),
                        message: result.render(),
                    });
                    task_stats.record_error(&tc.name);
                    deps.events.emit(TaskEvent::EndRequest);
                    break 'requests ExitReason::Interrupted {
                        message: CANCELLED_MESSAGE.to_string(),
                    };
                }
                if result.is_error() {
                    deps.events.emit(TaskEvent::ToolError {
                        tool: tc.name.clone(),
                        message: result.render(),
                    });
                    task_stats.record_error(&tc.name);
                } else {
                    deps.events.emit(TaskEvent::ToolReply { tool: tc.name.clone() });
                    task_stats.record_success(&tc.name);
                }
                conversation.push(Message::tool_result(tc.id.clone(), result));
            }
            deps.events.emit(TaskEvent::EndRequest);
            continue;
        }

        deps.events.emit(TaskEvent::EndRequest);

        // No tool calls: this turn decides termination.
        if let Some(schema) = &config.output_schema {
            match &turn.final_object {
                Some(object) => match schema.validate(object) {
                    Ok(valid) => {
                        break ExitReason::Exit {
                            message: serde_json::to_string(&valid)?,
                            messages: conversation.clone(),
                        }
                    }
                    Err(e) => {
                        if schema_retry_used {
                            break ExitReason::Error {
                                message: format!("final object failed validation: {e}"),
                                stack: None,
                            };
                        }
                        schema_retry_used = true;
                        debug!(error = %e, "final object invalid, re-prompting once");
                        conversation.push(Message::user(format!(
                            "Your final object failed validation: {e}. \
                             Respond again with a corrected final object."
                        )));
                        continue;
                    }
                },
                None => {
                    if schema_retry_used {
                        break ExitReason::Error {
                            message: "model did not produce a final object".into(),
                            stack: None,
                        };
                    }
                    schema_retry_used = true;
                    conversation.push(Message::user(
                        "A structured final object matching the required schema is \
                         expected. Respond with the final object.",
                    ));
                    continue;
                }
            }
        }

        if turn.has_text() {
            break ExitReason::Exit {
                message: turn.text.clone(),
                messages: conversation.clone(),
            };
        }

        // Thinking-only or empty turn: nudge the model to continue rather
        // than failing the whole task on a single blank generation.
        if empty_turn_retries < MAX_EMPTY_TURN_RETRIES {
            empty_turn_retries += 1;
            conversation.push(Message::user(
                "You produced no response or tool call. Please continue with \
                 your next action.",
            ));
            continue;
        }
        break ExitReason::Error {
            message: "model produced only empty turns".into(),
            stack: None,
        };
    };

    deps.stats.merge(&task_stats);
    deps.events.emit(TaskEvent::EndTask { exit: exit.clone() });
    Ok(exit)
}

/// Stream one model generation, forwarding deltas as events.
async fn run_model_turn(
    model: &dyn ModelProvider,
    events: &EventSink,
    verbose_reasoning: bool,
    request: ModelRequest,
) -> anyhow::Result<ModelTurn> {
    let mut stream = model.generate(request).await?;

    let mut turn = ModelTurn {
        text: String::new(),
        reasoning: String::new(),
        tool_calls: Vec::new(),
        final_object: None,
        usage: Usage::default(),
    };
    let mut reasoning_rendered = false;

    while let Some(delta) = stream.next().await {
        match delta? {
            ModelDelta::Reasoning(delta) => {
                turn.reasoning.push_str(&delta);
                if verbose_reasoning {
                    reasoning_rendered = true;
                    events.emit(TaskEvent::Reasoning { text: delta });
                }
            }
            ModelDelta::Text(delta) if delta.is_empty() => {}
            ModelDelta::Text(delta) => {
                // Separate rendered reasoning from the text that follows it.
                if reasoning_rendered && turn.text.is_empty() {
                    events.emit(TaskEvent::Text { text: "\n\n".into() });
                }
                turn.text.push_str(&delta);
                events.emit(TaskEvent::Text { text: delta });
            }
            ModelDelta::ToolCall { id, name, input } => {
                turn.tool_calls.push(TurnToolCall { id, name, input });
            }
            ModelDelta::Finish { usage, final_object } => {
                turn.usage = usage;
                turn.final_object = final_object;
                break;
            }
        }
    }
    Ok(turn)
}

/// True when `error` is a user abort or a host-injected cancellation, in
/// any of the shapes those take crossing the workflow boundary.
pub fn is_cancellation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<InjectedError>()
        .map(|e| e.message == CANCELLED_MESSAGE)
        .unwrap_or(false)
        || error
            .downcast_ref::<verk_tools::UserCancelledError>()
            .is_some()
}
