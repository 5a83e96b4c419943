// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use serde_json::Value;

/// A validatable, renderable description of a JSON shape.
///
/// Built with the constructor methods (`Schema::string()`,
/// `Schema::object(..)`, …), optionally annotated with [`Schema::describe`]
/// and [`Schema::refine`].
#[derive(Clone)]
pub struct Schema {
    pub kind: SchemaKind,
    pub description: Option<String>,
    pub refinements: Vec<Refinement>,
}

/// The structural variants a [`Schema`] can take.
#[derive(Clone)]
pub enum SchemaKind {
    String,
    Number {
        /// Reject non-integral numbers when set.
        integer: bool,
    },
    Boolean,
    /// Exactly this JSON value.
    Literal(Value),
    /// One of a fixed set of strings.
    Enum(Vec<String>),
    Array(Box<Schema>),
    Object {
        fields: Vec<Field>,
    },
    /// First matching variant wins.
    Union(Vec<Schema>),
    /// Inner schema, additionally accepting `null`.
    Optional(Box<Schema>),
}

/// A named member of an object schema.
#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
    /// Value assumed when the field is absent.  The simplifier also strips
    /// the field when its validated value equals this default.
    pub default: Option<Value>,
}

impl Field {
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self { name: name.into(), schema, required: true, default: None }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self { name: name.into(), schema, required: false, default: None }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }
}

/// A post-structural check attached to a schema.
///
/// The message doubles as the validation error when the predicate returns
/// false, so phrase it as a statement of the violated constraint.
#[derive(Clone)]
pub struct Refinement {
    pub message: String,
    pub check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl std::fmt::Debug for Refinement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refinement").field("message", &self.message).finish()
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Schema({})", self.type_name())?;
        if !self.refinements.is_empty() {
            write!(f, " +{} refinements", self.refinements.len())?;
        }
        Ok(())
    }
}

impl Schema {
    fn new(kind: SchemaKind) -> Self {
        Self { kind, description: None, refinements: Vec::new() }
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::new(SchemaKind::Number { integer: false })
    }

    pub fn integer() -> Self {
        Self::new(SchemaKind::Number { integer: true })
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Literal(value.into()))
    }

    pub fn enumeration<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SchemaKind::Enum(variants.into_iter().map(Into::into).collect()))
    }

    pub fn array(items: Schema) -> Self {
        Self::new(SchemaKind::Array(Box::new(items)))
    }

    pub fn object<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        Self::new(SchemaKind::Object { fields: fields.into_iter().collect() })
    }

    pub fn union<I>(variants: I) -> Self
    where
        I: IntoIterator<Item = Schema>,
    {
        Self::new(SchemaKind::Union(variants.into_iter().collect()))
    }

    pub fn optional(inner: Schema) -> Self {
        Self::new(SchemaKind::Optional(Box::new(inner)))
    }

    /// Attach a human-readable description, rendered into the advertised
    /// JSON Schema.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a refinement that runs after structural validation.
    pub fn refine<F>(mut self, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.refinements.push(Refinement { message: message.into(), check: Arc::new(check) });
        self
    }

    /// Short name of the expected shape, used in validation errors.
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::String => "string",
            SchemaKind::Number { integer: true } => "integer",
            SchemaKind::Number { integer: false } => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Literal(_) => "literal",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object { .. } => "object",
            SchemaKind::Union(_) => "union",
            SchemaKind::Optional(_) => "optional",
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_produce_expected_kinds() {
        assert!(matches!(Schema::string().kind, SchemaKind::String));
        assert!(matches!(Schema::integer().kind, SchemaKind::Number { integer: true }));
        assert!(matches!(Schema::number().kind, SchemaKind::Number { integer: false }));
        assert!(matches!(Schema::boolean().kind, SchemaKind::Boolean));
        assert!(matches!(Schema::array(Schema::string()).kind, SchemaKind::Array(_)));
    }

    #[test]
    fn with_default_clears_required() {
        let f = Field::required("n", Schema::integer()).with_default(2000.into());
        assert!(!f.required);
        assert_eq!(f.default, Some(2000.into()));
    }

    #[test]
    fn describe_sets_description() {
        let s = Schema::string().describe("a name");
        assert_eq!(s.description.as_deref(), Some("a name"));
    }

    #[test]
    fn debug_mentions_refinements() {
        let s = Schema::string().refine("never empty", |v| v.as_str() != Some(""));
        assert!(format!("{s:?}").contains("1 refinements"));
    }
}
