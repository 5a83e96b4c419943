// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// An error injected by the host at a suspension point via
/// [`crate::PendingToolCall::throw`].
///
/// Surfaces out of [`crate::WorkflowCtx::call_tool`] as an ordinary
/// `anyhow::Error`, so workflows catch it like any other failure.  Hosts
/// use `error.downcast_ref::<InjectedError>()` to distinguish injected
/// errors (e.g. cancellation) from workflow-internal ones.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InjectedError {
    pub message: String,
}

/// The host dropped the run while a tool call was pending.
///
/// The procedure's pending `call_tool` fails with this error and the task
/// unwinds; a suspended workflow that is dropped is simply garbage
/// collected, with no further cleanup contract.
#[derive(Debug, Error)]
#[error("workflow detached: host dropped the run while a tool call was pending")]
pub struct DetachedError;
