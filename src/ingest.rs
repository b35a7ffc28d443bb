//! Corpus ingestion driver.
//!
//! Loads a JSON corpus and pushes it into an external RAG indexer through
//! the bounded [`RetryPolicy`]. The corpus is opaque here: whatever JSON the
//! file holds is forwarded verbatim.

use crate::config::{DEFAULT_CLASS, IndexerConfig};
use crate::error::{HarnessError, Result};
use crate::retry::{RetryOutcome, RetryPolicy, Sleeper, TokioSleeper};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An index that accepts a whole corpus in one call.
#[async_trait]
pub trait Indexer: Send + Sync {
    async fn insert(&self, corpus: &Value) -> Result<()>;
}

/// Body sent to the indexing service.
#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    working_dir: &'a Path,
    embedding_concurrency_limit: usize,
    llm_concurrency_limit: usize,
    documents: &'a Value,
}

/// Indexer reached over HTTP (`POST {endpoint}/insert`).
#[derive(Clone)]
pub struct HttpIndexer {
    client: Client,
    config: IndexerConfig,
    working_dir: PathBuf,
}

impl HttpIndexer {
    /// Create an indexer handle, making sure its working directory exists.
    ///
    /// An unset working directory falls back to the default class's.
    pub fn new(config: IndexerConfig) -> Result<Self> {
        let working_dir = config.working_dir_for(DEFAULT_CLASS);
        ensure_working_dir(&working_dir)?;
        Ok(Self {
            client: Client::new(),
            config,
            working_dir,
        })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn endpoint(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        format!("{}/insert", base)
    }
}

#[async_trait]
impl Indexer for HttpIndexer {
    async fn insert(&self, corpus: &Value) -> Result<()> {
        let request = InsertRequest {
            working_dir: &self.working_dir,
            embedding_concurrency_limit: self.config.embedding_concurrency_limit,
            llm_concurrency_limit: self.config.llm_concurrency_limit,
            documents: corpus,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HarnessError::Indexer(format!(
                "insert rejected ({}): {}",
                status, body
            )));
        }

        debug!(status = %status, "indexer accepted corpus");
        Ok(())
    }
}

/// Create the working directory (and parents) if missing.
pub fn ensure_working_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| HarnessError::io(dir, e))?;
        info!(dir = %dir.display(), "created working directory");
    }
    Ok(())
}

/// Read a corpus file as raw JSON.
pub fn load_corpus(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        HarnessError::Serialization(format!("corpus '{}': {}", path.display(), e))
    })
}

/// Conventional corpus location for a dataset class,
/// e.g. `datasets/ultradoman/unique_contexts/sample_unique_contexts.json`.
pub fn class_corpus_path(dataset_root: &Path, class: &str) -> PathBuf {
    dataset_root
        .join("unique_contexts")
        .join(format!("{}_unique_contexts.json", class))
}

/// Drives a corpus into an [`Indexer`] under a retry policy.
pub struct Ingestor<I> {
    indexer: I,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl<I: Indexer> Ingestor<I> {
    /// Ingestor that sleeps in real time between attempts.
    pub fn new(indexer: I, policy: RetryPolicy) -> Self {
        Self::with_sleeper(indexer, policy, Box::new(TokioSleeper))
    }

    pub fn with_sleeper(indexer: I, policy: RetryPolicy, sleeper: Box<dyn Sleeper>) -> Self {
        Self {
            indexer,
            policy,
            sleeper,
        }
    }

    /// Insert an already-loaded corpus.
    pub async fn insert(&self, corpus: &Value) -> RetryOutcome<HarnessError> {
        let outcome = self
            .policy
            .run(self.sleeper.as_ref(), |_| self.indexer.insert(corpus))
            .await;

        if let RetryOutcome::Succeeded { attempts } = &outcome {
            info!(attempts, "corpus inserted");
        }
        outcome
    }

    /// Load a corpus file and insert it.
    ///
    /// Only a load failure is returned as `Err`; insert failures are reported
    /// through the outcome.
    pub async fn insert_file(&self, path: &Path) -> Result<RetryOutcome<HarnessError>> {
        let corpus = load_corpus(path)?;
        let count = corpus.as_array().map(Vec::len);
        info!(path = %path.display(), documents = ?count, "loaded corpus");
        Ok(self.insert(&corpus).await)
    }
}
