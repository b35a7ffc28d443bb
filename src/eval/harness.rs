//! Batch evaluation runner: collect verdicts, filter, score.

use super::dataset::ComparisonItem;
use super::judge::PairwiseJudge;
use super::scoring::ScoreTable;
use super::verdict::{EvaluationRecord, Verdict};
use crate::error::{HarnessError, Result};
use crate::llm::ChatModel;
use crate::persistence::{save_json, sibling_with_suffix};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Options for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Also judge with answers swapped and average, to cancel position bias.
    pub symmetric: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { symmetric: true }
    }
}

/// Result of judging every item once in a fixed answer order.
#[derive(Debug, Clone, Serialize)]
pub struct PassResult {
    /// Every judged record, including those whose verdict was discarded.
    pub records: Vec<EvaluationRecord>,
    /// Questions whose LLM call or reply parsing failed.
    pub failed: usize,
    /// Replies that parsed but lacked a rubric key or a valid winner.
    pub discarded: usize,
    /// `None` when no verdict survived filtering.
    pub scores: Option<ScoreTable>,
}

impl PassResult {
    /// Records that contributed to the scores.
    pub fn retained(&self) -> usize {
        self.records.len() - self.discarded
    }
}

/// Outcome of a full evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub forward: PassResult,
    pub swapped: Option<PassResult>,
    /// Position-bias-corrected scores when symmetric, else the forward
    /// scores. `None` if any pass kept no verdict.
    pub scores: Option<ScoreTable>,
    pub total_time_secs: f64,
}

impl EvalReport {
    /// The final score table, or [`HarnessError::InsufficientVerdicts`]
    /// counting every unusable question of the passes that kept none.
    pub fn final_scores(&self) -> Result<&ScoreTable> {
        self.scores.as_ref().ok_or_else(|| {
            let discarded = self
                .passes()
                .filter(|pass| pass.scores.is_none())
                .map(|pass| pass.discarded + pass.failed)
                .sum();
            HarnessError::InsufficientVerdicts { discarded }
        })
    }

    fn passes(&self) -> impl Iterator<Item = &PassResult> {
        std::iter::once(&self.forward).chain(self.swapped.as_ref())
    }

    /// Write the judged records of every pass.
    ///
    /// Forward records go to `records_path`; swapped-pass records go next to
    /// it with a `_swapped` stem suffix.
    pub fn save_records(&self, records_path: &Path) -> Result<()> {
        save_json(&self.forward.records, records_path)?;
        info!(path = %records_path.display(), "evaluations saved");

        if let Some(swapped) = &self.swapped {
            let path = sibling_with_suffix(records_path, "_swapped");
            save_json(&swapped.records, &path)?;
            info!(path = %path.display(), "swapped-order evaluations saved");
        }
        Ok(())
    }

    /// Write the final score table; fails if there is none.
    pub fn save_scores(&self, scores_path: &Path) -> Result<()> {
        save_json(self.final_scores()?, scores_path)?;
        info!(path = %scores_path.display(), "scores saved");
        Ok(())
    }

    /// Write records, then scores. Records are on disk even when scoring
    /// has nothing to report.
    pub fn save(&self, records_path: &Path, scores_path: &Path) -> Result<()> {
        self.save_records(records_path)?;
        self.save_scores(scores_path)
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Results ==========");
        Self::print_pass("Forward pass", &self.forward);
        if let Some(swapped) = &self.swapped {
            Self::print_pass("Swapped pass", swapped);
            println!("Position-bias-corrected scores:");
        }
        println!("----------------------------------------");
        match &self.scores {
            Some(scores) => print!("{}", scores),
            None => println!("No verdict survived filtering; nothing to score."),
        }
        println!("----------------------------------------");
        println!("Total time: {:.1}s", self.total_time_secs);
        println!("========================================\n");
    }

    fn print_pass(label: &str, pass: &PassResult) {
        println!(
            "{}: {} scored, {} discarded, {} failed",
            label,
            pass.retained(),
            pass.discarded,
            pass.failed
        );
    }
}

/// Verdicts of records with a complete verdict, and how many were discarded.
fn retained_verdicts(records: &[EvaluationRecord]) -> (Vec<Verdict>, usize) {
    let mut verdicts = Vec::with_capacity(records.len());
    let mut discarded = 0;

    for record in records {
        match record.verdict() {
            Ok(verdict) => verdicts.push(verdict),
            Err(e) => {
                warn!(question = %record.question, error = %e, "discarding verdict");
                discarded += 1;
            }
        }
    }

    (verdicts, discarded)
}

/// Score records, skipping those without a complete verdict.
///
/// Returns the scores and the number discarded.
pub fn score_records(records: &[EvaluationRecord]) -> Result<(ScoreTable, usize)> {
    let (verdicts, discarded) = retained_verdicts(records);
    if verdicts.is_empty() {
        return Err(HarnessError::InsufficientVerdicts { discarded });
    }
    Ok((ScoreTable::from_verdicts(&verdicts)?, discarded))
}

/// Runs the judge over comparison items, one question at a time.
pub struct BatchEvaluator<M> {
    judge: PairwiseJudge<M>,
}

impl<M: ChatModel> BatchEvaluator<M> {
    pub fn new(model: M) -> Self {
        Self {
            judge: PairwiseJudge::new(model),
        }
    }

    /// Judge each item in order. Failed questions are logged and skipped.
    ///
    /// Returns the records gathered and how many questions failed.
    pub async fn collect(&self, items: &[ComparisonItem]) -> (Vec<EvaluationRecord>, usize) {
        let mut records = Vec::with_capacity(items.len());
        let mut failed = 0;

        for (i, item) in items.iter().enumerate() {
            let number = i + 1;
            match self
                .judge
                .judge(&item.question, &item.answer1, &item.answer2)
                .await
            {
                Ok(evaluation) => {
                    info!("Question {} evaluation completed", number);
                    records.push(EvaluationRecord {
                        question: item.question.clone(),
                        answer1: item.answer1.clone(),
                        answer2: item.answer2.clone(),
                        evaluation,
                    });
                }
                Err(e) => {
                    error!(error = %e, "Error in question {}", number);
                    failed += 1;
                }
            }
        }

        (records, failed)
    }

    /// Judge, filter and score every item in the given answer order.
    pub async fn run_pass(&self, items: &[ComparisonItem]) -> PassResult {
        let (records, failed) = self.collect(items).await;
        let (verdicts, discarded) = retained_verdicts(&records);
        let scores = ScoreTable::from_verdicts(&verdicts).ok();

        if scores.is_none() {
            warn!(discarded, failed, "no verdict survived filtering");
        }
        debug!(retained = verdicts.len(), discarded, failed, "pass scored");

        PassResult {
            records,
            failed,
            discarded,
            scores,
        }
    }

    /// Full run: forward pass, plus the swapped pass when symmetric.
    pub async fn run(&self, items: &[ComparisonItem], options: &EvalOptions) -> EvalReport {
        let start = Instant::now();
        info!(items = items.len(), symmetric = options.symmetric, "starting evaluation");

        let forward = self.run_pass(items).await;

        let (swapped, scores) = if options.symmetric {
            let reversed: Vec<ComparisonItem> = items.iter().map(ComparisonItem::swapped).collect();
            let swapped = self.run_pass(&reversed).await;
            let scores = match (&forward.scores, &swapped.scores) {
                (Some(fwd), Some(swp)) => Some(ScoreTable::symmetric(fwd, swp)),
                _ => None,
            };
            (Some(swapped), scores)
        } else {
            (None, forward.scores.clone())
        };

        EvalReport {
            forward,
            swapped,
            scores,
            total_time_secs: start.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::verdict::tests::verdict_json;
    use crate::eval::verdict::{Criterion, Winner};
    use crate::llm::ResponseSchema;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn answer_slot<'a>(prompt: &'a str, label: &str) -> &'a str {
        let start = prompt.find(label).unwrap() + label.len();
        let rest = &prompt[start..];
        rest.split("\n\n").next().unwrap_or("").trim()
    }

    /// Slot holding the longer answer, and the other one.
    fn longer_and_shorter(user: &str) -> (&'static str, &'static str) {
        let a1 = answer_slot(user, "**Answer 1:**");
        let a2 = answer_slot(user, "**Answer 2:**");
        if a1.len() >= a2.len() {
            ("Answer 1", "Answer 2")
        } else {
            ("Answer 2", "Answer 1")
        }
    }

    /// Prefers the longer answer, except that Diversity always goes to
    /// whatever is shown first.
    struct PreferLonger;

    #[async_trait]
    impl ChatModel for PreferLonger {
        async fn chat_completion(
            &self,
            _system: &str,
            user: &str,
            _schema: &ResponseSchema,
        ) -> Result<String> {
            let (w, _) = longer_and_shorter(user);
            Ok(verdict_json([w, w, "Answer 1", w, w]).to_string())
        }
    }

    /// Decides on answer text alone: the longer answer wins every dimension
    /// but Diversity, which goes to the shorter one.
    struct ContentOnly;

    #[async_trait]
    impl ChatModel for ContentOnly {
        async fn chat_completion(
            &self,
            _system: &str,
            user: &str,
            _schema: &ResponseSchema,
        ) -> Result<String> {
            let (long, short) = longer_and_shorter(user);
            Ok(verdict_json([long, long, short, long, long]).to_string())
        }
    }

    /// Replies from a fixed script, one entry per call.
    struct Scripted {
        replies: Vec<Result<String>>,
        next: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies,
                next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        async fn chat_completion(&self, _: &str, _: &str, _: &ResponseSchema) -> Result<String> {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            match &self.replies[i % self.replies.len()] {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(HarnessError::LlmApi(e.to_string())),
            }
        }
    }

    fn items(n: usize) -> Vec<ComparisonItem> {
        (0..n)
            .map(|i| ComparisonItem {
                question: format!("Question {}?", i),
                answer1: format!("long detailed answer number {}", i),
                answer2: format!("short {}", i),
            })
            .collect()
    }

    fn all_answer1() -> String {
        verdict_json(["Answer 1"; 5]).to_string()
    }

    fn scores(pass: &PassResult) -> &ScoreTable {
        pass.scores.as_ref().unwrap()
    }

    #[tokio::test]
    async fn test_unanimous_answer1_scores_one() {
        let evaluator = BatchEvaluator::new(Scripted::new(vec![Ok(all_answer1())]));
        let pass = evaluator.run_pass(&items(3)).await;

        assert_eq!(pass.records.len(), 3);
        for criterion in Criterion::ALL {
            let shares = scores(&pass).get(criterion);
            assert_eq!(shares.answer1, 1.0);
            assert_eq!(shares.answer2, 0.0);
        }
    }

    #[tokio::test]
    async fn test_malformed_verdict_leaves_denominator() {
        let mut missing = verdict_json(["Answer 2"; 5]);
        missing.as_object_mut().unwrap().remove("Empowerment");

        let evaluator = BatchEvaluator::new(Scripted::new(vec![
            Ok(all_answer1()),
            Ok(missing.to_string()),
            Ok(all_answer1()),
        ]));
        let pass = evaluator.run_pass(&items(3)).await;

        assert_eq!(pass.records.len(), 3);
        assert_eq!(pass.retained(), 2);
        assert_eq!(pass.discarded, 1);
        // 2 of 2, not 2 of 3
        assert_eq!(scores(&pass).get(Criterion::Factuality).answer1, 1.0);
        assert_eq!(scores(&pass).get(Criterion::Empowerment).answer1, 1.0);
    }

    #[tokio::test]
    async fn test_failed_calls_are_skipped_without_retry() {
        let model = Scripted::new(vec![
            Err(HarnessError::LlmApi("rate limited".to_string())),
            Ok("this is not json".to_string()),
            Ok(all_answer1()),
        ]);
        let evaluator = BatchEvaluator::new(model);
        let pass = evaluator.run_pass(&items(3)).await;

        assert_eq!(pass.failed, 2);
        assert_eq!(pass.records.len(), 1);
        assert_eq!(pass.records[0].question, "Question 2?");
        assert_eq!(evaluator.judge.model().next.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_nothing_retained_is_insufficient() {
        let evaluator = BatchEvaluator::new(Scripted::new(vec![
            Ok(json!({"Factuality": {"Winner": "Answer 1"}}).to_string()),
            Err(HarnessError::LlmApi("down".to_string())),
        ]));
        let report = evaluator
            .run(&items(2), &EvalOptions { symmetric: false })
            .await;

        assert!(report.forward.scores.is_none());
        assert_eq!(report.forward.records.len(), 1);
        assert!(matches!(
            report.final_scores(),
            Err(HarnessError::InsufficientVerdicts { discarded: 2 })
        ));
    }

    #[tokio::test]
    async fn test_empty_swapped_pass_keeps_forward_records() {
        let evaluator = BatchEvaluator::new(Scripted::new(vec![
            Ok(all_answer1()),
            Ok(all_answer1()),
            Ok(all_answer1()),
            Ok("{}".to_string()),
            Ok("{}".to_string()),
            Ok("{}".to_string()),
        ]));
        let report = evaluator.run(&items(3), &EvalOptions::default()).await;

        assert_eq!(evaluator.judge.model().next.load(Ordering::SeqCst), 6);
        assert_eq!(report.forward.retained(), 3);
        assert!(report.forward.scores.is_some());
        assert!(report.scores.is_none());
        assert!(matches!(
            report.final_scores(),
            Err(HarnessError::InsufficientVerdicts { discarded: 3 })
        ));

        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("batch_eval.jsonl");
        let scores_path = dir.path().join("batch_eval_scores.json");
        assert!(report.save(&records_path, &scores_path).is_err());

        let saved: Vec<EvaluationRecord> =
            serde_json::from_str(&std::fs::read_to_string(&records_path).unwrap()).unwrap();
        assert_eq!(saved.len(), 3);
        assert!(dir.path().join("batch_eval_swapped.jsonl").exists());
        assert!(!scores_path.exists());
    }

    #[tokio::test]
    async fn test_swapped_run_mirrors_original() {
        let evaluator = BatchEvaluator::new(ContentOnly);
        let original = vec![
            ComparisonItem {
                question: "Q1?".to_string(),
                answer1: "a thorough answer".to_string(),
                answer2: "brief".to_string(),
            },
            ComparisonItem {
                question: "Q2?".to_string(),
                answer1: "terse".to_string(),
                answer2: "a much longer second answer".to_string(),
            },
            ComparisonItem {
                question: "Q3?".to_string(),
                answer1: "another long first answer".to_string(),
                answer2: "tiny".to_string(),
            },
        ];
        let swapped: Vec<_> = original.iter().map(ComparisonItem::swapped).collect();

        let forward = evaluator.run_pass(&original).await;
        let reversed = evaluator.run_pass(&swapped).await;

        for criterion in Criterion::ALL {
            let fwd = scores(&forward).get(criterion);
            let rev = scores(&reversed).get(criterion);
            assert_eq!(rev.answer1, fwd.answer2, "{}", criterion);
            assert_eq!(rev.answer2, fwd.answer1, "{}", criterion);
        }
        assert!((scores(&forward).get(Criterion::Diversity).answer1 - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_symmetric_run_cancels_position_bias() {
        let evaluator = BatchEvaluator::new(PreferLonger);
        let report = evaluator.run(&items(4), &EvalOptions::default()).await;
        let scores = report.final_scores().unwrap();

        assert!(report.swapped.is_some());
        // content preference survives
        assert_eq!(scores.get(Criterion::Factuality).answer1, 1.0);
        // pure slot preference averages out
        assert_eq!(scores.get(Criterion::Diversity).answer1, 0.5);
        assert_eq!(scores.get(Criterion::Diversity).answer2, 0.5);
    }

    #[tokio::test]
    async fn test_single_pass_uses_forward_scores() {
        let evaluator = BatchEvaluator::new(PreferLonger);
        let options = EvalOptions { symmetric: false };
        let report = evaluator.run(&items(2), &options).await;

        assert!(report.swapped.is_none());
        assert_eq!(report.scores, report.forward.scores);
        assert_eq!(report.final_scores().unwrap().get(Criterion::Diversity).answer1, 1.0);
    }

    #[tokio::test]
    async fn test_report_save_writes_all_files() {
        let dir = TempDir::new().unwrap();
        let records_path = dir.path().join("out").join("batch_eval.jsonl");
        let scores_path = dir.path().join("out").join("batch_eval_scores.json");

        let evaluator = BatchEvaluator::new(PreferLonger);
        let report = evaluator.run(&items(2), &EvalOptions::default()).await;
        report.save(&records_path, &scores_path).unwrap();

        let records: Vec<EvaluationRecord> =
            serde_json::from_str(&std::fs::read_to_string(&records_path).unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].verdict().unwrap().winner(Criterion::Factuality), Winner::Answer1);

        assert!(dir.path().join("out").join("batch_eval_swapped.jsonl").exists());

        let scores: ScoreTable =
            serde_json::from_str(&std::fs::read_to_string(&scores_path).unwrap()).unwrap();
        assert_eq!(&scores, report.final_scores().unwrap());
    }

    #[test]
    fn test_score_records_counts_discarded() {
        let records = vec![
            EvaluationRecord {
                question: "kept".to_string(),
                answer1: "a".to_string(),
                answer2: "b".to_string(),
                evaluation: verdict_json(["Answer 2"; 5]),
            },
            EvaluationRecord {
                question: "dropped".to_string(),
                answer1: "a".to_string(),
                answer2: "b".to_string(),
                evaluation: json!({"Factuality": {"Winner": "Answer 3"}}),
            },
        ];

        let (scores, discarded) = score_records(&records).unwrap();
        assert_eq!(discarded, 1);
        assert_eq!(scores.get(Criterion::OverallWinner).answer2, 1.0);
        assert!(matches!(
            score_records(&records[1..]),
            Err(HarnessError::InsufficientVerdicts { discarded: 1 })
        ));
    }
}
