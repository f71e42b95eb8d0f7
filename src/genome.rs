//! Named genomes with their signatures.

use crate::kmer::KmerSpec;
use crate::seqio::SequenceSource;
use crate::signature::{Signature, SignatureBuilder};
use crate::Result;
use log::debug;

/// Named genome and the signature derived from its sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genome {
    id: String,
    description: Option<String>,
    signature: Signature,
}

impl Genome {
    /// Wraps an existing signature
    pub fn new<S: Into<String>>(id: S, signature: Signature) -> Self {
        Self {
            id: id.into(),
            description: None,
            signature,
        }
    }

    /// Attaches a description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reads every record of the source and builds its signature
    pub fn from_source<S: SequenceSource + ?Sized>(source: &S, spec: KmerSpec) -> Result<Self> {
        let mut builder = SignatureBuilder::new(spec);
        source.read_sequences(&mut |seq| builder.add_sequence(seq))?;
        let records = builder.records();
        let signature = builder.finish();
        debug!(
            "Signature of {} has {} k-mers from {} records",
            source.id(),
            signature.len(),
            records
        );

        Ok(Self {
            id: source.id().to_string(),
            description: source.description().map(str::to_string),
            signature,
        })
    }

    /// Identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Free text description
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// K-mer signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl AsRef<Signature> for Genome {
    fn as_ref(&self) -> &Signature {
        &self.signature
    }
}
