// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::{Map, Value};

use crate::schema::{Schema, SchemaKind};

/// A single-line validation failure, suitable for feeding back to the model
/// verbatim as an `error-text` tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// JSON-path style location (`$`, `$.topic`, `$.todos[2].id`).
    pub path: String,
    pub reason: String,
}

impl std::error::Error for ValidationError {}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path == "$" {
            write!(f, "input validation failed: {}", self.reason)
        } else {
            write!(f, "input validation failed at {}: {}", self.path, self.reason)
        }
    }
}

impl ValidationError {
    fn at(path: &str, reason: impl Into<String>) -> Self {
        Self { path: path.to_string(), reason: reason.into() }
    }
}

impl Schema {
    /// Validate `input` against this schema.
    ///
    /// On success the returned value is the **simplified** form: undeclared
    /// object fields are dropped and optional fields whose value equals
    /// their declared default are omitted.  Refinements run on the
    /// simplified value; the first failing refinement's message becomes the
    /// error reason.
    pub fn validate(&self, input: &Value) -> Result<Value, ValidationError> {
        self.validate_at(input, "$")
    }

    fn validate_at(&self, input: &Value, path: &str) -> Result<Value, ValidationError> {
        let value = match &self.kind {
            SchemaKind::String => match input {
                Value::String(_) => input.clone(),
                other => return Err(type_mismatch(path, "string", other)),
            },
            SchemaKind::Number { integer } => match input {
                Value::Number(n) => {
                    if *integer && n.as_i64().is_none() && n.as_u64().is_none() {
                        return Err(ValidationError::at(path, format!("expected integer, got {n}")));
                    }
                    input.clone()
                }
                other => return Err(type_mismatch(path, "number", other)),
            },
            SchemaKind::Boolean => match input {
                Value::Bool(_) => input.clone(),
                other => return Err(type_mismatch(path, "boolean", other)),
            },
            SchemaKind::Literal(expected) => {
                if input != expected {
                    return Err(ValidationError::at(path, format!("expected {expected}, got {input}")));
                }
                input.clone()
            }
            SchemaKind::Enum(variants) => match input.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => input.clone(),
                Some(s) => {
                    return Err(ValidationError::at(
                        path,
                        format!("'{s}' is not one of [{}]", variants.join(", ")),
                    ))
                }
                None => return Err(type_mismatch(path, "string", input)),
            },
            SchemaKind::Array(items) => match input {
                Value::Array(elements) => {
                    let mut out = Vec::with_capacity(elements.len());
                    for (i, element) in elements.iter().enumerate() {
                        out.push(items.validate_at(element, &format!("{path}[{i}]"))?);
                    }
                    Value::Array(out)
                }
                other => return Err(type_mismatch(path, "array", other)),
            },
            SchemaKind::Object { fields } => match input {
                Value::Object(map) => {
                    // Undeclared keys are dropped, not rejected: models routinely
                    // hallucinate extra parameters and the simplified form is
                    // what gets memoized and replayed.
                    let mut out = Map::new();
                    for field in fields {
                        let field_path = format!("{path}.{}", field.name);
                        match map.get(&field.name) {
                            Some(Value::Null) if !field.required => {}
                            Some(raw) => {
                                let validated = field.schema.validate_at(raw, &field_path)?;
                                let matches_default =
                                    field.default.as_ref() == Some(&validated);
                                if !matches_default {
                                    out.insert(field.name.clone(), validated);
                                }
                            }
                            None if field.required => {
                                return Err(ValidationError::at(
                                    &field_path,
                                    "missing required field",
                                ))
                            }
                            None => {}
                        }
                    }
                    Value::Object(out)
                }
                other => return Err(type_mismatch(path, "object", other)),
            },
            SchemaKind::Union(variants) => {
                // Keep the error from the variant that matched deepest; a
                // mismatch three fields in is far more informative than
                // "expected object, got object" from an unrelated variant.
                let mut matched = None;
                let mut best: Option<ValidationError> = None;
                for variant in variants {
                    match variant.validate_at(input, path) {
                        Ok(v) => {
                            matched = Some(v);
                            break;
                        }
                        Err(e) => {
                            let deeper = best
                                .as_ref()
                                .map(|b| e.path.len() > b.path.len())
                                .unwrap_or(true);
                            if deeper {
                                best = Some(e);
                            }
                        }
                    }
                }
                match matched {
                    Some(v) => v,
                    None => {
                        return Err(best.unwrap_or_else(|| {
                            ValidationError::at(path, "no union variant matched")
                        }))
                    }
                }
            }
            SchemaKind::Optional(inner) => match input {
                Value::Null => Value::Null,
                other => inner.validate_at(other, path)?,
            },
        };

        // Refinements run on the simplified value so predicates see exactly
        // what the handler will receive.
        for refinement in &self.refinements {
            if !(refinement.check)(&value) {
                return Err(ValidationError::at(path, refinement.message.clone()));
            }
        }
        Ok(value)
    }
}

fn type_mismatch(path: &str, expected: &str, got: &Value) -> ValidationError {
    let got_name = match got {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::at(path, format!("expected {expected}, got {got_name}"))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
