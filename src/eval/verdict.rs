//! Typed judge verdicts.
//!
//! The judge's reply is kept as raw JSON in [`EvaluationRecord`] so it can be
//! written back out untouched; [`Verdict::from_value`] decides whether it is
//! usable for scoring.

use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A rubric dimension. Ordering follows the rubric and drives output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criterion {
    Factuality,
    Comprehensiveness,
    Diversity,
    Empowerment,
    #[serde(rename = "Overall Winner")]
    OverallWinner,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Factuality,
        Criterion::Comprehensiveness,
        Criterion::Diversity,
        Criterion::Empowerment,
        Criterion::OverallWinner,
    ];

    /// Key used in verdict JSON and score tables.
    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Factuality => "Factuality",
            Criterion::Comprehensiveness => "Comprehensiveness",
            Criterion::Diversity => "Diversity",
            Criterion::Empowerment => "Empowerment",
            Criterion::OverallWinner => "Overall Winner",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two presented answers won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Answer 1")]
    Answer1,
    #[serde(rename = "Answer 2")]
    Answer2,
}

impl Winner {
    /// The same answer seen from the swapped presentation order.
    pub fn flipped(self) -> Self {
        match self {
            Winner::Answer1 => Winner::Answer2,
            Winner::Answer2 => Winner::Answer1,
        }
    }
}

/// One rubric entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionVerdict {
    #[serde(rename = "Winner")]
    pub winner: Winner,
    #[serde(rename = "Explanation", default)]
    pub explanation: String,
}

/// A complete verdict: one entry per rubric dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    entries: [CriterionVerdict; 5],
}

impl Verdict {
    /// Validate a raw judge reply.
    ///
    /// Every rubric key must be present and hold a `Winner` of
    /// `"Answer 1"` or `"Answer 2"`. Extra keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| HarnessError::MalformedVerdict("verdict is not an object".to_string()))?;

        let mut entries = Vec::with_capacity(Criterion::ALL.len());
        for criterion in Criterion::ALL {
            let raw = object.get(criterion.as_str()).ok_or_else(|| {
                HarnessError::MalformedVerdict(format!("missing key '{}'", criterion))
            })?;
            let entry: CriterionVerdict = serde_json::from_value(raw.clone()).map_err(|e| {
                HarnessError::MalformedVerdict(format!("bad entry for '{}': {}", criterion, e))
            })?;
            entries.push(entry);
        }

        let entries: [CriterionVerdict; 5] = entries
            .try_into()
            .map_err(|_| HarnessError::MalformedVerdict("wrong number of entries".to_string()))?;
        Ok(Self { entries })
    }

    /// Build a verdict directly from winners in rubric order.
    pub fn from_winners(winners: [Winner; 5]) -> Self {
        Self {
            entries: winners.map(|winner| CriterionVerdict {
                winner,
                explanation: String::new(),
            }),
        }
    }

    pub fn entry(&self, criterion: Criterion) -> &CriterionVerdict {
        &self.entries[criterion as usize]
    }

    pub fn winner(&self, criterion: Criterion) -> Winner {
        self.entry(criterion).winner
    }
}

/// One judged question as written to the evaluation output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer1")]
    pub answer1: String,
    #[serde(rename = "Answer2")]
    pub answer2: String,
    #[serde(rename = "Evaluation")]
    pub evaluation: Value,
}

impl EvaluationRecord {
    pub fn verdict(&self) -> Result<Verdict> {
        Verdict::from_value(&self.evaluation)
    }
}
