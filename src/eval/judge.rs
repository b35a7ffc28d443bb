//! LLM-as-Judge for pairwise answer comparison.

use crate::error::{HarnessError, Result};
use crate::llm::{ChatModel, Prompts, ResponseSchema};
use serde_json::Value;

/// Asks a chat model which of two answers is better on each rubric dimension.
pub struct PairwiseJudge<M> {
    model: M,
    schema: ResponseSchema,
}

impl<M: ChatModel> PairwiseJudge<M> {
    /// Create a new judge around the given chat model.
    pub fn new(model: M) -> Self {
        Self {
            model,
            schema: Prompts::evaluation_schema(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Judge one question and return the raw JSON verdict.
    ///
    /// The reply must be a JSON object; whether it carries every rubric key
    /// is checked later, at scoring time.
    pub async fn judge(&self, question: &str, answer1: &str, answer2: &str) -> Result<Value> {
        let prompt = Prompts::render_comparison(question, answer1, answer2);
        let response = self
            .model
            .chat_completion(Prompts::judge_system(), &prompt, &self.schema)
            .await?;
        Self::parse_evaluation(&response)
    }

    /// Parse the judge's reply into a JSON object.
    fn parse_evaluation(response: &str) -> Result<Value> {
        let json_str = Self::extract_json(response);

        let value: Value = serde_json::from_str(json_str).map_err(|e| {
            HarnessError::LlmParse(format!(
                "Failed to parse evaluation: {}. Response: {}",
                e,
                response.chars().take(200).collect::<String>()
            ))
        })?;

        if !value.is_object() {
            return Err(HarnessError::LlmParse(format!(
                "Evaluation is not a JSON object: {}",
                value
            )));
        }
        Ok(value)
    }

    /// Extract JSON from a response that may be wrapped in a markdown fence.
    fn extract_json(response: &str) -> &str {
        let response = response.trim();

        if let Some(rest) = response.strip_prefix("```json") {
            if let Some(end) = rest.rfind("```") {
                return rest[..end].trim();
            }
        }

        if response.starts_with("```") {
            if let Some(end) = response.rfind("```") {
                let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
                if end > start {
                    return response[start..end].trim();
                }
            }
        }

        if let Some(start) = response.find('{') {
            if let Some(end) = response.rfind('}') {
                if end > start {
                    return &response[start..=end];
                }
            }
        }

        response
    }
}
