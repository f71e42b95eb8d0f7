//! Two bit encoding of nucleotide k-mers.

use crate::{error::Error, Result};
use std::fmt;

/// Encoded k-mer, two bits per nucleotide with the first base in the most significant bits
pub type Kmer = u64;

/// Largest `k` that fits a [`Kmer`]
pub const MAX_K: usize = 32;

const NUCLEOTIDES: [u8; 4] = [b'A', b'C', b'G', b'T'];

#[inline]
fn encode_base(nuc: u8) -> Option<Kmer> {
    match nuc {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

fn encode_bases(seq: &[u8]) -> Option<Kmer> {
    seq.iter()
        .try_fold(0, |kmer, nuc| encode_base(*nuc).map(|code| (kmer << 2) | code))
}

fn decode_bases(kmer: Kmer, len: usize) -> String {
    (0..len)
        .rev()
        .map(|i| NUCLEOTIDES[((kmer >> (2 * i)) & 3) as usize] as char)
        .collect()
}

/// K-mer length and optional prefix. Signatures can only be compared when built with equal
/// specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KmerSpec {
    k: u8,
    prefix_len: u8,
    prefix: Kmer,
}

impl KmerSpec {
    /// Retains every canonical k-mer of length `k`
    pub fn new(k: usize) -> Result<Self> {
        Self::with_prefix(k, b"")
    }

    /// Retains only canonical k-mers of length `k` starting with `prefix`.
    ///
    /// The prefix is part of the `k` bases, so only `k - prefix.len()` bases vary and a genome
    /// yields at most `4^(k - prefix.len())` distinct k-mers. Each prefix base cuts the expected
    /// signature size by four. Raise `k` together with the prefix length to keep signatures of
    /// large genomes from saturating, e.g. `k = 16` with a 5 base prefix keeps 11 free bases.
    pub fn with_prefix<P: AsRef<[u8]>>(k: usize, prefix: P) -> Result<Self> {
        let prefix = prefix.as_ref();
        if k == 0 || k > MAX_K {
            return Err(Error::InvalidSpec(format!(
                "k must be between 1 and {} but got {}",
                MAX_K, k
            )));
        }
        if prefix.len() >= k {
            return Err(Error::InvalidSpec(format!(
                "prefix `{}` must be shorter than k = {}",
                String::from_utf8_lossy(prefix),
                k
            )));
        }
        let code = encode_bases(prefix).ok_or_else(|| {
            Error::InvalidSpec(format!(
                "prefix `{}` may only contain A, C, G and T",
                String::from_utf8_lossy(prefix)
            ))
        })?;

        Ok(Self {
            k: k as u8,
            prefix_len: prefix.len() as u8,
            prefix: code,
        })
    }

    /// Length of the k-mers
    pub fn k(&self) -> usize {
        self.k as usize
    }

    /// Prefix filter as uppercase nucleotides, empty when not filtering
    pub fn prefix(&self) -> String {
        decode_bases(self.prefix, self.prefix_len())
    }

    /// Number of nucleotides in the prefix filter
    pub fn prefix_len(&self) -> usize {
        self.prefix_len as usize
    }

    /// Bits used by a k-mer of this length
    pub fn mask(&self) -> Kmer {
        if self.k() == MAX_K {
            Kmer::MAX
        } else {
            (1 << (2 * self.k())) - 1
        }
    }

    /// Encodes a window of exactly `k` nucleotides, `None` if it contains anything but ACGT
    pub fn encode(&self, window: &[u8]) -> Option<Kmer> {
        if window.len() != self.k() {
            return None;
        }
        encode_bases(window)
    }

    /// Nucleotide string of an encoded k-mer
    pub fn decode(&self, kmer: Kmer) -> String {
        decode_bases(kmer, self.k())
    }

    /// Reverse complement of an encoded k-mer
    pub fn reverse_complement(&self, kmer: Kmer) -> Kmer {
        let mut fwd = kmer;
        let mut rc = 0;
        for _ in 0..self.k() {
            rc = (rc << 2) | (3 - (fwd & 3));
            fwd >>= 2;
        }
        rc
    }

    /// Smaller of the k-mer and its reverse complement
    pub fn canonical(&self, kmer: Kmer) -> Kmer {
        kmer.min(self.reverse_complement(kmer))
    }

    /// Checks that a value can be a k-mer of this length
    pub fn fits(&self, kmer: Kmer) -> bool {
        kmer & !self.mask() == 0
    }

    /// Checks the k-mer against the prefix filter
    pub fn accepts(&self, kmer: Kmer) -> bool {
        self.prefix_len == 0 || kmer >> (2 * (self.k() - self.prefix_len())) == self.prefix
    }

    /// Canonical k-mers of a single sequence record, skipping windows with ambiguous bases.
    /// The prefix filter is not applied.
    pub fn canonical_kmers<'a>(&self, seq: &'a [u8]) -> CanonicalKmers<'a> {
        CanonicalKmers {
            spec: *self,
            seq,
            pos: 0,
            fwd: 0,
            rev: 0,
            filled: 0,
        }
    }
}

impl Default for KmerSpec {
    fn default() -> Self {
        Self {
            k: crate::DEFAULT_K as u8,
            prefix_len: 0,
            prefix: 0,
        }
    }
}

impl fmt::Display for KmerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix_len == 0 {
            write!(f, "k={}", self.k)
        } else {
            write!(f, "k={} prefix={}", self.k, self.prefix())
        }
    }
}

/// Rolling iterator over the canonical k-mers of one sequence
#[derive(Debug, Clone)]
pub struct CanonicalKmers<'a> {
    spec: KmerSpec,
    seq: &'a [u8],
    pos: usize,
    fwd: Kmer,
    rev: Kmer,
    filled: usize,
}

impl<'a> Iterator for CanonicalKmers<'a> {
    type Item = Kmer;

    fn next(&mut self) -> Option<Kmer> {
        let k = self.spec.k();
        while self.pos < self.seq.len() {
            let nuc = self.seq[self.pos];
            self.pos += 1;
            match encode_base(nuc) {
                Some(code) => {
                    self.fwd = ((self.fwd << 2) | code) & self.spec.mask();
                    self.rev = (self.rev >> 2) | ((3 - code) << (2 * (k - 1)));
                    self.filled += 1;
                    if self.filled >= k {
                        return Some(self.fwd.min(self.rev));
                    }
                }
                // stale bits are shifted out before the window is full again
                None => self.filled = 0,
            }
        }
        None
    }
}
