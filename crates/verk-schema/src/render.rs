// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use serde_json::{json, Map, Value};

use crate::schema::{Schema, SchemaKind};

impl Schema {
    /// Render this descriptor as the JSON Schema advertised to model
    /// providers.
    ///
    /// Refinements are not representable in JSON Schema and are omitted;
    /// they still run locally on every input.
    pub fn to_json_schema(&self) -> Value {
        let mut out = match &self.kind {
            SchemaKind::String => json!({ "type": "string" }),
            SchemaKind::Number { integer: true } => json!({ "type": "integer" }),
            SchemaKind::Number { integer: false } => json!({ "type": "number" }),
            SchemaKind::Boolean => json!({ "type": "boolean" }),
            SchemaKind::Literal(value) => json!({ "const": value }),
            SchemaKind::Enum(variants) => json!({ "type": "string", "enum": variants }),
            SchemaKind::Array(items) => json!({
                "type": "array",
                "items": items.to_json_schema(),
            }),
            SchemaKind::Object { fields } => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    let mut prop = field.schema.to_json_schema();
                    if let (Some(obj), Some(default)) = (prop.as_object_mut(), &field.default) {
                        obj.insert("default".into(), default.clone());
                    }
                    properties.insert(field.name.clone(), prop);
                    if field.required {
                        required.push(Value::String(field.name.clone()));
                    }
                }
                json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                    "additionalProperties": false,
                })
            }
            SchemaKind::Union(variants) => json!({
                "anyOf": variants.iter().map(Schema::to_json_schema).collect::<Vec<_>>(),
            }),
            SchemaKind::Optional(inner) => json!({
                "anyOf": [inner.to_json_schema(), { "type": "null" }],
            }),
        };
        if let (Some(obj), Some(description)) = (out.as_object_mut(), &self.description) {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        out
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{Field, Schema};

    #[test]
    fn object_renders_properties_and_required() {
        let s = Schema::object([
            Field::required("path", Schema::string().describe("file path")),
            Field::optional("recursive", Schema::boolean()),
        ]);
        let rendered = s.to_json_schema();
        assert_eq!(rendered["type"], json!("object"));
        assert_eq!(rendered["properties"]["path"]["description"], json!("file path"));
        assert_eq!(rendered["required"], json!(["path"]));
        assert_eq!(rendered["additionalProperties"], json!(false));
    }

    #[test]
    fn default_is_rendered() {
        let s = Schema::object([
            Field::optional("maxCount", Schema::integer()).with_default(json!(2000)),
        ]);
        let rendered = s.to_json_schema();
        assert_eq!(rendered["properties"]["maxCount"]["default"], json!(2000));
        assert_eq!(rendered["required"], json!([]));
    }

    #[test]
    fn enum_renders_variants() {
        let s = Schema::enumeration(["append", "replace", "remove"]);
        assert_eq!(
            s.to_json_schema(),
            json!({ "type": "string", "enum": ["append", "replace", "remove"] })
        );
    }

    #[test]
    fn union_renders_any_of() {
        let s = Schema::union([Schema::string(), Schema::integer()]);
        let rendered = s.to_json_schema();
        assert_eq!(rendered["anyOf"][0], json!({ "type": "string" }));
        assert_eq!(rendered["anyOf"][1], json!({ "type": "integer" }));
    }

    #[test]
    fn optional_renders_nullable_any_of() {
        let s = Schema::optional(Schema::string());
        let rendered = s.to_json_schema();
        assert_eq!(rendered["anyOf"][1], json!({ "type": "null" }));
    }

    #[test]
    fn literal_renders_const() {
        let s = Schema::literal("plan-generated");
        assert_eq!(s.to_json_schema(), json!({ "const": "plan-generated" }));
    }
}
