//! Sources of genome sequences.

use crate::Result;
use bio::io::fasta;
use log::debug;
use std::path::{Path, PathBuf};

/// File extensions stripped from FASTA file names to obtain genome ids
const FASTA_EXTENSIONS: [&str; 6] = ["fasta", "fa", "fna", "fas", "ffn", "fsa"];

/// Supplies the nucleotide sequences of a single genome record by record
pub trait SequenceSource {
    /// Identifier of the genome
    fn id(&self) -> &str;

    /// Free text description of the genome
    fn description(&self) -> Option<&str> {
        None
    }

    /// Passes every sequence record to `visit` in input order
    fn read_sequences(&self, visit: &mut dyn FnMut(&[u8])) -> Result<()>;
}

impl<T: SequenceSource + ?Sized> SequenceSource for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn description(&self) -> Option<&str> {
        (**self).description()
    }

    fn read_sequences(&self, visit: &mut dyn FnMut(&[u8])) -> Result<()> {
        (**self).read_sequences(visit)
    }
}

/// Genome stored in a FASTA file, plain or compressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaFile {
    id: String,
    path: PathBuf,
}

impl FastaFile {
    /// Genome named after the file with compression and FASTA extensions removed
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        Self {
            id: genome_id_from_path(&path),
            path,
        }
    }

    /// Genome with an explicit identifier
    pub fn with_id<S: Into<String>, P: Into<PathBuf>>(id: S, path: P) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SequenceSource for FastaFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_sequences(&self, visit: &mut dyn FnMut(&[u8])) -> Result<()> {
        let (rdr, format) = niffler::from_path(&self.path)?;
        debug!(
            "Reading {} from {} ({:?} compression)",
            self.id,
            self.path.display(),
            format
        );
        let fasta_rdr = fasta::Reader::new(rdr);
        for record in fasta_rdr.records() {
            let record = record?;
            visit(record.seq());
        }
        Ok(())
    }
}

fn genome_id_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if FASTA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            stem.to_string()
        }
        _ => name.to_string(),
    }
}

/// Genome held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSet {
    id: String,
    description: Option<String>,
    sequences: Vec<Vec<u8>>,
}

impl SequenceSet {
    /// Creates a genome from its sequence records
    pub fn new<S, I, T>(id: S, sequences: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self {
            id: id.into(),
            description: None,
            sequences: sequences
                .into_iter()
                .map(|seq| seq.as_ref().to_vec())
                .collect(),
        }
    }

    /// Attaches a description
    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sequence records
    pub fn sequences(&self) -> &[Vec<u8>] {
        &self.sequences
    }
}

impl SequenceSource for SequenceSet {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn read_sequences(&self, visit: &mut dyn FnMut(&[u8])) -> Result<()> {
        self.sequences.iter().for_each(|seq| visit(seq.as_slice()));
        Ok(())
    }
}
