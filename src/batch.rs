//! Parallel classification of many query genomes.
//!
//! Queries are read and classified on a dedicated worker pool while results are handed back to
//! the caller in input order as soon as every earlier query has finished.

use crate::classify::{ClassificationResult, Classifier};
use crate::genome::Genome;
use crate::seqio::SequenceSource;
use crate::{error::Error, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

/// Shared flag telling a running batch to skip the queries it has not started yet
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Queries already being classified still finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Checks if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of worker threads, `0` uses one per logical CPU
    pub threads: usize,
}

/// What happened to a single query
#[derive(Debug)]
pub enum Outcome {
    /// Query was classified
    Classified(ClassificationResult),
    /// Query could not be read or classified, the rest of the batch is unaffected
    Failed(Error),
    /// Batch was cancelled before the query started
    Cancelled,
}

impl Outcome {
    /// Classification, if the query got one
    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Outcome::Classified(result) => Some(result),
            _ => None,
        }
    }
}

/// Outcome of a query together with its position in the batch
#[derive(Debug)]
pub struct QueryResult {
    /// Position of the query in the input
    pub index: usize,
    /// Identifier of the query genome
    pub query: String,
    /// Classification or the reason there is none
    pub outcome: Outcome,
}

fn classify_one<S: SequenceSource + ?Sized>(
    classifier: &Classifier,
    index: usize,
    source: &S,
    cancel: &CancelToken,
) -> QueryResult {
    let outcome = if cancel.is_cancelled() {
        Outcome::Cancelled
    } else {
        match Genome::from_source(source, classifier.database().spec())
            .and_then(|genome| classifier.classify(genome.signature()))
        {
            Ok(result) => Outcome::Classified(result),
            Err(e) => {
                warn!("Could not classify {}: {}", source.id(), e);
                Outcome::Failed(e)
            }
        }
    };

    QueryResult {
        index,
        query: source.id().to_string(),
        outcome,
    }
}

/// Classifies every source in parallel and passes each result to `emit` in input order
pub fn classify_streaming<S, F>(
    classifier: &Classifier,
    sources: &[S],
    config: &BatchConfig,
    cancel: &CancelToken,
    mut emit: F,
) -> Result<()>
where
    S: SequenceSource + Sync,
    F: FnMut(QueryResult),
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .or(Err(Error::ThreadError))?;
    debug!(
        "Classifying {} queries on {} threads",
        sources.len(),
        pool.current_num_threads()
    );

    let (tx, rx) = mpsc::channel();
    std::thread::scope(|scope| {
        scope.spawn(move || {
            pool.install(|| {
                sources
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (index, source)| {
                        // receiver only hangs up once the scope is unwinding
                        let _ = tx.send(classify_one(classifier, index, source, cancel));
                    })
            })
        });

        let mut pending = BTreeMap::new();
        let mut next = 0;
        for result in rx {
            pending.insert(result.index, result);
            while let Some(result) = pending.remove(&next) {
                emit(result);
                next += 1;
            }
        }
    });

    Ok(())
}

/// Classifies every source in parallel and collects the results in input order
pub fn classify_batch<S>(
    classifier: &Classifier,
    sources: &[S],
    config: &BatchConfig,
    cancel: &CancelToken,
) -> Result<Vec<QueryResult>>
where
    S: SequenceSource + Sync,
{
    let mut results = Vec::with_capacity(sources.len());
    classify_streaming(classifier, sources, config, cancel, |result| {
        results.push(result)
    })?;

    let classified = results
        .iter()
        .filter(|r| r.outcome.result().is_some())
        .count();
    info!("Classified {} of {} queries", classified, results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }
}
