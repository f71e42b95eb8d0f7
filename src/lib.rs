#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Taxonomic classification of genome assemblies from k-mer signatures.
//!
//! A genome is reduced to the sorted set of canonical k-mers that start with a fixed prefix.
//! Queries are compared to reference genomes by Jaccard distance and assigned to the most specific
//! taxon on the lineage of the closest reference whose distance threshold is not exceeded.
pub mod batch;
pub mod classify;
pub mod database;
pub mod distance;
mod error;
pub mod genome;
pub mod kmer;
pub mod seqio;
pub mod signature;
pub mod taxonomy;

pub use crate::batch::{classify_batch, classify_streaming, BatchConfig, CancelToken, Outcome};
pub use crate::classify::{ClassificationResult, Classifier, ClassifierConfig, ThresholdPolicy};
pub use crate::database::Database;
pub use crate::error::Error;
pub use crate::genome::Genome;
pub use crate::kmer::{Kmer, KmerSpec};
pub use crate::signature::Signature;
pub use crate::taxonomy::{TaxonRecord, Taxonomy};

/// K-mer length used when none is configured
pub const DEFAULT_K: usize = 11;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, crate::error::Error>;
