//! Win-rate aggregation over retained verdicts.

use super::verdict::{Criterion, Verdict, Winner};
use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Share of verdicts won by each answer for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shares {
    #[serde(rename = "Answer1")]
    pub answer1: f64,
    #[serde(rename = "Answer2")]
    pub answer2: f64,
}

impl Shares {
    /// The same shares with the answers' roles exchanged.
    pub fn swapped(self) -> Self {
        Self {
            answer1: self.answer2,
            answer2: self.answer1,
        }
    }
}

/// Rubric dimension to win-rate shares, serialized in rubric order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable(BTreeMap<Criterion, Shares>);

impl ScoreTable {
    /// Normalized win-rates over `verdicts`.
    ///
    /// Each verdict contributes `1/N` to its winner on every dimension, so
    /// each dimension's shares sum to 1.0. An empty slice has no defined
    /// win-rate and yields [`HarnessError::InsufficientVerdicts`].
    pub fn from_verdicts(verdicts: &[Verdict]) -> Result<Self> {
        if verdicts.is_empty() {
            return Err(HarnessError::InsufficientVerdicts { discarded: 0 });
        }

        let n = verdicts.len() as f64;
        let table = Criterion::ALL
            .into_iter()
            .map(|criterion| {
                let answer1_wins = verdicts
                    .iter()
                    .filter(|v| v.winner(criterion) == Winner::Answer1)
                    .count();
                let answer1 = answer1_wins as f64 / n;
                let answer2 = (verdicts.len() - answer1_wins) as f64 / n;
                (criterion, Shares { answer1, answer2 })
            })
            .collect();

        Ok(Self(table))
    }

    /// Cancel position bias using a pass run with the answers presented swapped.
    ///
    /// In `swapped`, "Answer1" is the second answer set, so its roles are
    /// exchanged before averaging with `forward`.
    pub fn symmetric(forward: &ScoreTable, swapped: &ScoreTable) -> Self {
        let table = Criterion::ALL
            .into_iter()
            .map(|criterion| {
                let f = forward.get(criterion);
                let s = swapped.get(criterion).swapped();
                (
                    criterion,
                    Shares {
                        answer1: (f.answer1 + s.answer1) / 2.0,
                        answer2: (f.answer2 + s.answer2) / 2.0,
                    },
                )
            })
            .collect();
        Self(table)
    }

    pub fn get(&self, criterion: Criterion) -> Shares {
        self.0.get(&criterion).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, Shares)> + '_ {
        self.0.iter().map(|(c, s)| (*c, *s))
    }
}

impl fmt::Display for ScoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20} {:>8} {:>8}", "Dimension", "Answer1", "Answer2")?;
        writeln!(f, "{}", "─".repeat(38))?;
        for (criterion, shares) in self.iter() {
            writeln!(
                f,
                "{:<20} {:>7.1}% {:>7.1}%",
                criterion.as_str(),
                shares.answer1 * 100.0,
                shares.answer2 * 100.0
            )?;
        }
        Ok(())
    }
}
