//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Natural-language front end: turns a question into a [`Plan`] through an
//! external [`PlanProducer`].
//!
//! This crate never talks to a model. It builds the request (system prompt,
//! question, schema listing), hands it to the producer and validates what
//! comes back. Transport, retries and response parsing belong to the
//! producer implementation.

use std::error::Error as StdError;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::engine::Schema;
use crate::plan::{compile_plan, function_names, Plan, PlanError};

/// Guidance sent to the producer as the system message.
pub const SYSTEM_PROMPT: &str = "You are a query planner for in-memory tables.
Return a JSON object that matches the Plan schema exactly.
Use only available columns from the given schema.
Prefer minimal plans and avoid unnecessary operations.
Avoid duplicate output names across all expressions.
When using groupby_agg, do not put the same grouping key in both by and named_by.
Use named_by only when you need to rename or derive grouping keys; otherwise keep named_by empty.
If aggregation is required, use groupby_agg with explicit aliases for metrics and unique output names.
Example for two-level grouping: for \"sum of sales by country and city\", use one groupby_agg with by=[col(country), col(city)] and aggs=[sum(col(sales)) as total_sales].
For row counts, use count() with no literal arguments (do not use lit(1) or lit(true)).
";

/// Producer settings. Passed explicitly on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub model: String,
    pub system_prompt: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        let mut system_prompt = SYSTEM_PROMPT.to_string();
        let names: Vec<&str> = function_names().collect();
        let _ = writeln!(system_prompt, "Available functions: {}.", names.join(", "));
        ProducerConfig {
            model: "local-model".to_string(),
            system_prompt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// What a producer receives: a chat-style request for one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl PlanRequest {
    pub fn new(config: &ProducerConfig, schema: &Schema, question: &str) -> Self {
        let user = format!(
            "Generate a Plan for this question.\nQuestion: {question}\nAvailable schema:\n{}",
            format_schema(schema)
        );
        PlanRequest {
            model: config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: config.system_prompt.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: user,
                },
            ],
        }
    }
}

/// Anything that can turn a [`PlanRequest`] into a [`Plan`].
pub trait PlanProducer {
    type Error: StdError + Send + Sync + 'static;

    fn produce(&self, request: &PlanRequest) -> Result<Plan, Self::Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum NlqError {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("plan producer failed: {0}")]
    Producer(#[source] Box<dyn StdError + Send + Sync>),
    #[error("producer returned an invalid plan: {0}")]
    Plan(#[from] PlanError),
}

/// One `- name: type` line per column.
pub fn format_schema(schema: &Schema) -> String {
    schema
        .iter()
        .map(|(name, dtype)| format!("- {name}: {dtype}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ask `producer` for a plan answering `question` over `schema`.
///
/// The returned plan has been validated and compiled; it has not been run.
pub fn nl_query<P: PlanProducer>(
    producer: &P,
    schema: &Schema,
    question: &str,
    config: &ProducerConfig,
) -> Result<Plan, NlqError> {
    if question.trim().is_empty() {
        return Err(NlqError::EmptyQuestion);
    }
    let request = PlanRequest::new(config, schema, question);
    tracing::debug!(model = %request.model, columns = schema.len(), "requesting plan");
    let plan = producer
        .produce(&request)
        .map_err(|e| NlqError::Producer(Box::new(e)))?;
    compile_plan(&plan)?;
    tracing::debug!(ops = plan.ops.len(), "plan accepted");
    Ok(plan)
}
