// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod mock;
mod provider;
mod types;

pub use mock::ScriptedModel;
pub use provider::{DeltaStream, ModelDelta, ModelProvider, ModelRequest, ToolSchema, Usage};
pub use types::*;
