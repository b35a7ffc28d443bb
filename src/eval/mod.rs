//! Pairwise LLM-as-judge evaluation.
//!
//! This module provides:
//! - Question and answer-set loading
//! - A judge that asks the LLM to pick the better answer per rubric dimension
//! - Verdict filtering and win-rate scoring, with an optional swapped pass

pub mod dataset;
pub mod harness;
pub mod judge;
pub mod scoring;
pub mod verdict;

pub use dataset::{ComparisonItem, load_answers, load_comparison_items, load_questions, pair_items};
pub use harness::{BatchEvaluator, EvalOptions, EvalReport, PassResult, score_records};
pub use judge::PairwiseJudge;
pub use scoring::{ScoreTable, Shares};
pub use verdict::{Criterion, EvaluationRecord, Verdict, Winner};
