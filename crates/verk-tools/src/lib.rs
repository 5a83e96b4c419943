// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod builtin;
pub mod catalog;
pub mod local;
pub mod order;
pub mod providers;
pub mod tool;

pub use catalog::ToolCatalog;
pub use providers::{
    CancelToken, CommandOutput, CommandRequest, FileSystemProvider, HttpProvider, InputProvider,
    MemoryOp, MemoryProvider, NullSink, OutputSink, Providers, SearchMatch, SearchQuery,
    TodoItem, TodoProvider, TodoStatus, TodoUpdate, UserCancelledError,
};
pub use tool::{Capability, Tool, ToolSpec};

// The wire types tools produce live in verk-model so the runtime can carry
// them without depending on this crate.
pub use verk_model::{ToolPayload, ToolResult};
