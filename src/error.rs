use crate::kmer::KmerSpec;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors raised while building signatures, loading the reference database or classifying
pub enum Error {
    #[error("Unsupported k-mer parameters: {0}")]
    /// K-mer length or prefix cannot be encoded
    InvalidSpec(String),
    #[error("Reference database is corrupt: {0}")]
    /// Dangling taxon reference, inconsistent signatures or malformed taxonomy
    DatabaseCorrupt(String),
    #[error("Reference database does not contain any genomes")]
    /// Classification requested against a database without references
    EmptyDatabase,
    #[error("Cannot compare a signature built with {0} to one built with {1}")]
    /// Signatures were built under different k-mer parameters
    IncompatibleSignature(KmerSpec, KmerSpec),
    #[error("Could not read sequence record")]
    /// Sequence file exists but a record could not be read
    SequenceReadError(#[from] std::io::Error),
    #[error("Could not open sequence file")]
    /// Sequence file could not be opened or its compression detected
    SequenceFileError(#[from] niffler::Error),
    #[error("Could not spawn threads")]
    /// Worker pool could not be created
    ThreadError,
}
