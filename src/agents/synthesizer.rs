//! Schema synthesis over a completion model.
//!
//! [`SchemaSynthesizer::synthesize`] fills a JSON request-body template from
//! an action and the plan narrative. It returns raw text; callers validate it
//! with [`parse_against_template`].

use crate::llm::{ChatMessage, LLMClient};
use crate::types::{AppError, Result};
use serde_json::Value;
use std::sync::Arc;

const SYNTHESIS_PREAMBLE: &str = "\
You are an engineer completing an API SCHEMA from information a user gives you. \
The API SCHEMA is used to carry out a task described by a string of text called the ACTION. \
As you receive more information, update the API SCHEMA to reflect it.

You receive:
REQUEST BODY. An empty JSON string, without escapes, representing the body of an API request. \
Update its properties from the ACTION and CONTEXT. It must always be valid JSON.
ACTION. What the user wants to do with this API SCHEMA.
CONTEXT. Additional information such as today's date and time, or results of earlier steps. \
If an earlier step partially completed the REQUEST BODY it is given to you as the REQUEST BODY; \
keep its values and update them from the ACTION and CONTEXT.

Update the REQUEST BODY properties that map closest to what the ACTION requires. \
Do not change the structure of the REQUEST BODY: if it is an array, keep it an array and update every item. \
Return the REQUEST BODY as a JSON string only, with no explanation.";

const REFINEMENT_INSTRUCTION: &str = "\
You receive additional information from the user to help you update the REQUEST BODY properties.";

const REASONING_PREAMBLE: &str = "\
You respond to a TASK. A TASK is a string of text you receive as an ACTION.

You receive:
ACTION. What the user wants done. Use it to respond with an accurate result.
CONTEXT. Additional information such as today's date and time, or results of earlier steps.

Always return the response. Do not include extra text. Only respond with the information the TASK asks for. \
If the TASK asks you to draft an email, write an example based on what the TASK describes.";

/// Wraps a completion model with the schema-filling and reasoning prompts.
pub struct SchemaSynthesizer {
    llm: Arc<dyn LLMClient>,
}

impl SchemaSynthesizer {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Ask the model to fill `schema` for `action`. Returns the raw completion.
    pub async fn synthesize(
        &self,
        action: &str,
        narrative: &str,
        schema: &str,
        capability: &str,
    ) -> Result<String> {
        let messages = [
            ChatMessage::user(format!(
                "SERVICE: {}\nREQUEST BODY: {}\nACTION: {}\nCONTEXT: {}",
                capability, schema, action, narrative
            )),
            ChatMessage::assistant(schema),
            ChatMessage::user(format!(
                "{}\n\nACTION: {}\nCONTEXT: {}\n\n\
                 You must return the REQUEST BODY as a JSON string only and not include any other information in your response.",
                REFINEMENT_INSTRUCTION, action, narrative
            )),
        ];

        self.llm.complete(SYNTHESIS_PREAMBLE, &messages).await
    }

    /// Answer a reasoning-only step with free text.
    pub async fn ask(&self, action: &str, narrative: &str) -> Result<String> {
        let messages = [ChatMessage::user(format!(
            "ACTION: {}\nCONTEXT: {}\n\n\
             You must return the RESPONSE only and not include any other information in your response.",
            action, narrative
        ))];

        let answer = self.llm.complete(REASONING_PREAMBLE, &messages).await?;
        Ok(answer.trim().to_string())
    }
}

/// Parse synthesized text and check it keeps the template's top-level shape.
///
/// A template that is not itself valid JSON only gets the syntax check.
pub fn parse_against_template(raw: &str, template: &str) -> Result<Value> {
    let body: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        AppError::Synthesis(format!("completion is not valid JSON: {}", e))
    })?;

    let Ok(expected) = serde_json::from_str::<Value>(template) else {
        return Ok(body);
    };

    match (&expected, &body) {
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => Ok(body),
        (Value::Array(_), _) => Err(AppError::Synthesis(
            "template is an array but the completion is not".to_string(),
        )),
        (Value::Object(_), _) => Err(AppError::Synthesis(
            "template is an object but the completion is not".to_string(),
        )),
        _ => Ok(body),
    }
}

/// Models sometimes wrap JSON in a markdown fence.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
