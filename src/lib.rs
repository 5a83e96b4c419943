// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! verk: a resumable workflow engine for AI coding agents.
//!
//! The engine is assembled from five subsystems:
//!
//! - [`schema`]: typed schema descriptors: one definition validates tool
//!   input locally and renders to the JSON Schema advertised to providers.
//! - [`model`]: conversation messages and the abstract [`model::ModelProvider`]
//!   interface; concrete providers live with the host.
//! - [`runtime`]: the resumable workflow runtime: procedures suspend on
//!   tool calls, memoize steps, and replay from recorded stores.
//! - [`tools`]: the tool catalog, provider capability bundle, and the
//!   built-in tool set.
//! - [`agent`] / [`epic`]: the model ↔ tool loop and the epic
//!   orchestrator built on top of it.
//!
//! [`Executor`] is the reference host pump: it drives a suspended workflow
//! by resolving each tool call through the catalog.  Embedders with their
//! own scheduling loop can drive [`runtime::RunStatus`] directly instead.

mod executor;

pub use executor::Executor;

pub use verk_agent as agent;
pub use verk_epic as epic;
pub use verk_model as model;
pub use verk_runtime as runtime;
pub use verk_schema as schema;
pub use verk_tools as tools;
