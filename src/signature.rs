//! Sorted k-mer sets extracted from genome sequences.

use crate::kmer::{Kmer, KmerSpec};
use crate::{error::Error, Result};

/// Buffered k-mers before the builder first deduplicates
const MIN_COMPACT_LEN: usize = 1 << 16;

/// Distinct canonical k-mers of a genome in ascending order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    spec: KmerSpec,
    kmers: Vec<Kmer>,
}

impl Signature {
    /// Signature without any k-mers
    pub fn empty(spec: KmerSpec) -> Self {
        Self {
            spec,
            kmers: Vec::new(),
        }
    }

    /// Builds the signature of a genome given as separate sequence records.
    /// K-mers never span two records.
    pub fn from_sequences<I, S>(spec: KmerSpec, seqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut builder = SignatureBuilder::new(spec);
        for seq in seqs {
            builder.add_sequence(seq.as_ref());
        }
        builder.finish()
    }

    /// Restores a signature from previously extracted k-mer values in any order
    pub fn from_kmers<I: IntoIterator<Item = Kmer>>(spec: KmerSpec, kmers: I) -> Result<Self> {
        let mut kmers = kmers.into_iter().collect::<Vec<_>>();
        if let Some(kmer) = kmers
            .iter()
            .find(|kmer| !spec.fits(**kmer) || !spec.accepts(**kmer))
        {
            return Err(Error::InvalidSpec(format!(
                "k-mer value {} is not valid for {}",
                kmer, spec
            )));
        }
        kmers.sort_unstable();
        kmers.dedup();
        Ok(Self { spec, kmers })
    }

    /// Parameters the signature was built with
    pub fn spec(&self) -> KmerSpec {
        self.spec
    }

    /// Sorted k-mer values
    pub fn kmers(&self) -> &[Kmer] {
        &self.kmers
    }

    /// Number of distinct k-mers
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    /// Checks if no k-mer was retained
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// Checks if the k-mer is part of the signature
    pub fn contains(&self, kmer: Kmer) -> bool {
        self.kmers.binary_search(&kmer).is_ok()
    }

    /// Iterates the k-mers in ascending order
    pub fn iter(&self) -> std::slice::Iter<'_, Kmer> {
        self.kmers.iter()
    }
}

impl AsRef<Signature> for Signature {
    fn as_ref(&self) -> &Signature {
        self
    }
}

/// Accumulates k-mers record by record so a genome never has to be held in memory at once
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    spec: KmerSpec,
    kmers: Vec<Kmer>,
    compact_at: usize,
    records: usize,
}

impl SignatureBuilder {
    /// Creates an empty builder
    pub fn new(spec: KmerSpec) -> Self {
        Self {
            spec,
            kmers: Vec::new(),
            compact_at: MIN_COMPACT_LEN,
            records: 0,
        }
    }

    /// Adds the k-mers of one sequence record
    pub fn add_sequence(&mut self, seq: &[u8]) {
        let spec = self.spec;
        self.kmers.extend(
            spec.canonical_kmers(seq)
                .filter(|kmer| spec.accepts(*kmer)),
        );
        self.records += 1;

        if self.kmers.len() >= self.compact_at {
            self.compact();
            self.compact_at = (self.kmers.len() * 2).max(MIN_COMPACT_LEN);
        }
    }

    /// Number of records added so far
    pub fn records(&self) -> usize {
        self.records
    }

    fn compact(&mut self) {
        self.kmers.sort_unstable();
        self.kmers.dedup();
    }

    /// Sorts and deduplicates the collected k-mers
    pub fn finish(mut self) -> Signature {
        self.compact();
        self.kmers.shrink_to_fit();
        Signature {
            spec: self.spec,
            kmers: self.kmers,
        }
    }
}
