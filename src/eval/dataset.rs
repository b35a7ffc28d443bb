//! Input loading for pairwise evaluation.
//!
//! Supports:
//! - Question lists as plain text, one `- Question N: <text>` per line
//! - Answer sets as a JSON array of objects with a `result` field

use crate::error::{HarnessError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

static QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"- Question \d+: (.+)").expect("question pattern is valid")
});

/// One answer as produced by a RAG system run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The generated answer text.
    pub result: String,
}

/// A question with the two answers to compare, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub question: String,
    pub answer1: String,
    pub answer2: String,
}

impl ComparisonItem {
    /// Same question with the answers presented in the opposite order.
    pub fn swapped(&self) -> Self {
        Self {
            question: self.question.clone(),
            answer1: self.answer2.clone(),
            answer2: self.answer1.clone(),
        }
    }
}

/// Extract question texts in file order.
pub fn parse_questions(text: &str) -> Vec<String> {
    QUESTION_LINE
        .captures_iter(text)
        .map(|caps| caps[1].trim_end_matches('\r').to_string())
        .collect()
}

/// Load and parse a question file; an empty result is an error.
pub fn load_questions(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    let questions = parse_questions(&content);
    if questions.is_empty() {
        return Err(HarnessError::QuestionFile(path.to_path_buf()));
    }
    Ok(questions)
}

/// Load an answer file and keep only the answer texts, in order.
pub fn load_answers(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    let records: Vec<AnswerRecord> = serde_json::from_str(&content).map_err(|e| {
        HarnessError::Serialization(format!("answers '{}': {}", path.display(), e))
    })?;
    Ok(records.into_iter().map(|r| r.result).collect())
}

/// Zip questions with both answer lists positionally.
///
/// The shortest list bounds the result; a length mismatch is logged.
pub fn pair_items(
    questions: Vec<String>,
    answers1: Vec<String>,
    answers2: Vec<String>,
) -> Vec<ComparisonItem> {
    if questions.len() != answers1.len() || questions.len() != answers2.len() {
        warn!(
            questions = questions.len(),
            answers1 = answers1.len(),
            answers2 = answers2.len(),
            "input lengths differ; extra entries are ignored"
        );
    }

    questions
        .into_iter()
        .zip(answers1)
        .zip(answers2)
        .map(|((question, answer1), answer2)| ComparisonItem {
            question,
            answer1,
            answer2,
        })
        .collect()
}

/// Load all three inputs and pair them up.
pub fn load_comparison_items(
    query_file: &Path,
    result1_file: &Path,
    result2_file: &Path,
) -> Result<Vec<ComparisonItem>> {
    let questions = load_questions(query_file)?;
    let answers1 = load_answers(result1_file)?;
    let answers2 = load_answers(result2_file)?;
    Ok(pair_items(questions, answers1, answers2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const QUESTIONS: &str = "\
Here are the questions for the hypertension dataset.

- User 1: clinician
    - Question 1: What are first-line drugs for stage 1 hypertension?
    - Question 2: How does sodium intake affect blood pressure?
- Question 10: When is ambulatory monitoring recommended?\r
Not a question line
";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_questions_in_order() {
        let questions = parse_questions(QUESTIONS);
        assert_eq!(
            questions,
            vec![
                "What are first-line drugs for stage 1 hypertension?",
                "How does sodium intake affect blood pressure?",
                "When is ambulatory monitoring recommended?",
            ]
        );
    }

    #[test]
    fn test_load_questions_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("questions.txt");
        fs::write(&path, "no questions here\n").unwrap();

        assert!(matches!(
            load_questions(&path),
            Err(HarnessError::QuestionFile(_))
        ));
    }

    #[test]
    fn test_load_answers_keeps_result_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        fs::write(
            &path,
            r#"[{"query": "q1", "result": "first"}, {"result": "second", "context": []}]"#,
        )
        .unwrap();

        assert_eq!(load_answers(&path).unwrap(), strings(&["first", "second"]));
    }

    #[test]
    fn test_load_answers_without_result_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        fs::write(&path, r#"[{"answer": "first"}]"#).unwrap();

        assert!(matches!(
            load_answers(&path),
            Err(HarnessError::Serialization(_))
        ));
    }

    #[test]
    fn test_pair_items_truncates_to_shortest() {
        let items = pair_items(
            strings(&["q1", "q2", "q3"]),
            strings(&["a1", "a2"]),
            strings(&["b1", "b2", "b3"]),
        );

        assert_eq!(items.len(), 2);
        assert_eq!(items[1].question, "q2");
        assert_eq!(items[1].answer1, "a2");
        assert_eq!(items[1].answer2, "b2");
    }

    #[test]
    fn test_swapped_item() {
        let item = ComparisonItem {
            question: "q".to_string(),
            answer1: "a".to_string(),
            answer2: "b".to_string(),
        };
        let swapped = item.swapped();
        assert_eq!(swapped.answer1, "b");
        assert_eq!(swapped.answer2, "a");
        assert_eq!(swapped.swapped(), item);
    }
}
