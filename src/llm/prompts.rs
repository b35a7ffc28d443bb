//! Prompts and response schema for pairwise answer judging.

use super::client::ResponseSchema;
use serde_json::{Map, Value, json};

/// Collection of prompts used by the judge.
pub struct Prompts;

/// What each rubric key asks the judge to decide, used in schema descriptions.
const SCHEMA_CRITERIA: [(&str, &str, &str); 5] = [
    (
        "Factuality",
        "The answer that is better in terms of factual accuracy (Answer 1 or Answer 2).",
        "A detailed explanation of why the chosen answer is better in terms of factual accuracy, including references to specific facts or evidence if applicable.",
    ),
    (
        "Comprehensiveness",
        "The answer that is better in terms of comprehensiveness (Answer 1 or Answer 2).",
        "A detailed explanation of why the chosen answer is better in terms of comprehensiveness.",
    ),
    (
        "Diversity",
        "The answer that is better in terms of diversity (Answer 1 or Answer 2).",
        "A detailed explanation of why the chosen answer is better in terms of diversity.",
    ),
    (
        "Empowerment",
        "The answer that is better in terms of empowerment (Answer 1 or Answer 2).",
        "A detailed explanation of why the chosen answer is better in terms of empowerment.",
    ),
    (
        "Overall Winner",
        "The overall better answer based on all four criteria (Answer 1 or Answer 2).",
        "A summary of why the chosen answer is the overall winner.",
    ),
];

impl Prompts {
    /// System prompt establishing the judge role.
    pub fn judge_system() -> &'static str {
        r#"---Role---
You are an expert tasked with evaluating two answers to the same question based on four criteria: **Factuality**, **Comprehensiveness**, **Diversity**, and **Empowerment**."#
    }

    /// Template for the pairwise comparison. Placeholders: `{query}`, `{answer1}`, `{answer2}`.
    pub fn judge_comparison() -> &'static str {
        r#"You will evaluate two answers to the same question based on four criteria: **Factuality**, **Comprehensiveness**, **Diversity**, and **Empowerment**.

- **Factuality**: How accurate is the information provided in the answer, and does it align with verifiable facts and evidence?
- **Comprehensiveness**: How much detail does the answer provide to cover all aspects and details of the question?
- **Diversity**: How varied and rich is the answer in providing different perspectives and insights on the question?
- **Empowerment**: How well does the answer help the reader understand and make informed judgments about the topic?

For each criterion, choose the better answer (either Answer 1 or Answer 2) and explain why. Then, select an overall winner based on these four categories.

Here is the question:
{query}

Here are the two answers:

**Answer 1:**
{answer1}

**Answer 2:**
{answer2}

Evaluate both answers using the four criteria listed above and provide detailed explanations for each criterion.

Output your evaluation in the following JSON format:

{
    "Factuality": {
        "Winner": "[Answer 1 or Answer 2]",
        "Explanation": "[Provide explanation here]"
    },
    "Comprehensiveness": {
        "Winner": "[Answer 1 or Answer 2]",
        "Explanation": "[Provide explanation here]"
    },
    "Diversity": {
        "Winner": "[Answer 1 or Answer 2]",
        "Explanation": "[Provide explanation here]"
    },
    "Empowerment": {
        "Winner": "[Answer 1 or Answer 2]",
        "Explanation": "[Provide explanation here]"
    },
    "Overall Winner": {
        "Winner": "[Answer 1 or Answer 2]",
        "Explanation": "[Summarize why this answer is the overall winner based on the four criteria]"
    }
}"#
    }

    /// Fill the comparison template.
    ///
    /// Answers are substituted last so braces inside them are left alone.
    pub fn render_comparison(query: &str, answer1: &str, answer2: &str) -> String {
        let template = Self::judge_comparison();
        let (head, rest) = template
            .split_once("{answer1}")
            .unwrap_or((template, ""));
        let (middle, tail) = rest.split_once("{answer2}").unwrap_or((rest, ""));

        let mut prompt = String::with_capacity(template.len() + answer1.len() + answer2.len());
        prompt.push_str(&head.replace("{query}", query));
        prompt.push_str(answer1);
        prompt.push_str(middle);
        prompt.push_str(answer2);
        prompt.push_str(tail);
        prompt
    }

    /// Strict JSON schema for the five-key verdict object.
    pub fn evaluation_schema() -> ResponseSchema {
        let mut properties = Map::new();
        for (key, winner_desc, explanation_desc) in SCHEMA_CRITERIA {
            properties.insert(
                key.to_string(),
                json!({
                    "type": "object",
                    "properties": {
                        "Winner": {
                            "type": "string",
                            "description": winner_desc,
                            "enum": ["Answer 1", "Answer 2"]
                        },
                        "Explanation": {
                            "type": "string",
                            "description": explanation_desc
                        }
                    },
                    "required": ["Winner", "Explanation"],
                    "additionalProperties": false
                }),
            );
        }

        let required: Vec<Value> = SCHEMA_CRITERIA
            .iter()
            .map(|(key, _, _)| Value::from(*key))
            .collect();

        ResponseSchema {
            name: "evaluation_schema".to_string(),
            schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false
            }),
            strict: true,
        }
    }
}
