// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Structured output contracts for the planner, reviewer, and plan-update
//! agents.  Each has a serde type and the matching schema handed to the
//! agent loop as `output_schema`.

use serde::{Deserialize, Serialize};

use verk_schema::{Field, Schema};

// ─── Planner ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlannerOutput {
    /// A plan and the branch to carry it out on.
    PlanGenerated {
        plan: String,
        #[serde(rename = "branchName")]
        branch_name: String,
    },
    /// The planner needs an answer before it can plan.
    Question { question: PlannerQuestion },
    /// The task cannot be planned.
    Error { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerQuestion {
    pub question: String,
    #[serde(rename = "defaultAnswer", default, skip_serializing_if = "Option::is_none")]
    pub default_answer: Option<String>,
}

pub fn planner_schema() -> Schema {
    Schema::union([
        Schema::object([
            Field::required("type", Schema::literal("plan-generated")),
            Field::required(
                "plan",
                Schema::string().describe("Markdown plan with a `- [ ]` checklist of tasks"),
            ),
            Field::required(
                "branchName",
                Schema::string().describe("Git branch name for this epic"),
            ),
        ]),
        Schema::object([
            Field::required("type", Schema::literal("question")),
            Field::required(
                "question",
                Schema::object([
                    Field::required("question", Schema::string()),
                    Field::optional("defaultAnswer", Schema::string()),
                ]),
            ),
        ]),
        Schema::object([
            Field::required("type", Schema::literal("error")),
            Field::required("reason", Schema::string()),
        ]),
    ])
}

// ─── Reviewer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewOutput {
    #[serde(rename = "specificReviews", default)]
    pub specific_reviews: Vec<ReviewItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewItem {
    pub file: String,
    pub comment: String,
}

pub fn review_schema() -> Schema {
    Schema::object([Field::required(
        "specificReviews",
        Schema::array(Schema::object([
            Field::required("file", Schema::string()),
            Field::required("comment", Schema::string()),
        ]))
        .describe("Concrete issues that must be fixed; empty when the change passes review"),
    )])
}

// ─── Plan update ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanUpdate {
    #[serde(rename = "updatedPlan")]
    pub updated_plan: String,
    #[serde(rename = "isComplete")]
    pub is_complete: bool,
    #[serde(rename = "nextTask", default, skip_serializing_if = "Option::is_none")]
    pub next_task: Option<String>,
}

pub fn plan_update_schema() -> Schema {
    Schema::object([
        Field::required(
            "updatedPlan",
            Schema::string().describe("The plan with completed items checked off"),
        ),
        Field::required("isComplete", Schema::boolean()),
        Field::optional("nextTask", Schema::string()),
    ])
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn planner_schema_accepts_all_variants() {
        let schema = planner_schema();
        for value in [
            json!({"type": "plan-generated", "plan": "- [ ] x", "branchName": "feat/x"}),
            json!({"type": "question", "question": {"question": "which db?"}}),
            json!({"type": "error", "reason": "task is impossible"}),
        ] {
            let validated = schema.validate(&value).unwrap();
            let parsed: PlannerOutput = serde_json::from_value(validated).unwrap();
            let _ = parsed;
        }
    }

    #[test]
    fn planner_schema_rejects_missing_branch() {
        let schema = planner_schema();
        let err = schema
            .validate(&json!({"type": "plan-generated", "plan": "- [ ] x"}))
            .unwrap_err();
        assert!(err.to_string().contains("branchName"));
    }

    #[test]
    fn review_output_parses_empty_list() {
        let schema = review_schema();
        let validated = schema.validate(&json!({"specificReviews": []})).unwrap();
        let parsed: ReviewOutput = serde_json::from_value(validated).unwrap();
        assert!(parsed.specific_reviews.is_empty());
    }

    #[test]
    fn plan_update_round_trips() {
        let schema = plan_update_schema();
        let validated = schema
            .validate(&json!({
                "updatedPlan": "- [x] a\n- [ ] b",
                "isComplete": false,
                "nextTask": "b",
            }))
            .unwrap();
        let parsed: PlanUpdate = serde_json::from_value(validated).unwrap();
        assert!(!parsed.is_complete);
        assert_eq!(parsed.next_task.as_deref(), Some("b"));
    }
}
