// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Schema descriptors for tool inputs and structured agent outputs.
//!
//! One descriptor serves two consumers: the validator enforces it locally
//! (producing the error line fed back to the model on bad input), and the
//! renderer turns it into the JSON Schema advertised to model providers.

mod render;
mod schema;
mod validate;

pub use schema::{Field, Refinement, Schema, SchemaKind};
pub use validate::ValidationError;
