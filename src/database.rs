//! Reference genomes with their taxonomy.

use crate::genome::Genome;
use crate::kmer::KmerSpec;
use crate::taxonomy::{Ancestors, NodeIndex, TaxonId, Taxonomy};
use crate::{error::Error, Result};
use log::info;
use std::collections::HashMap;

/// Reference genomes with their taxonomy. Immutable once loaded and shared read-only between
/// workers.
#[derive(Debug)]
pub struct Database {
    spec: KmerSpec,
    genomes: Vec<Genome>,
    genome_taxa: Vec<NodeIndex>,
    by_id: HashMap<String, usize>,
    taxonomy: Taxonomy,
}

impl Database {
    /// Assembles the database from its loaded parts. `assignments` maps every genome id to the
    /// id of the most specific taxon it belongs to.
    pub fn new<I, S>(
        spec: KmerSpec,
        genomes: Vec<Genome>,
        taxonomy: Taxonomy,
        assignments: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (S, TaxonId)>,
        S: Into<String>,
    {
        let mut by_id = HashMap::with_capacity(genomes.len());
        for (i, genome) in genomes.iter().enumerate() {
            if genome.signature().spec() != spec {
                return Err(Error::DatabaseCorrupt(format!(
                    "signature of {} was built with {} but the database uses {}",
                    genome.id(),
                    genome.signature().spec(),
                    spec
                )));
            }
            if by_id.insert(genome.id().to_string(), i).is_some() {
                return Err(Error::DatabaseCorrupt(format!(
                    "genome {} is defined more than once",
                    genome.id()
                )));
            }
        }

        let mut genome_taxa = vec![None; genomes.len()];
        for (genome_id, taxon_id) in assignments {
            let genome_id = genome_id.into();
            let i = *by_id.get(&genome_id).ok_or_else(|| {
                Error::DatabaseCorrupt(format!("taxon assigned to missing genome {}", genome_id))
            })?;
            let taxon = taxonomy.index_of(taxon_id).ok_or_else(|| {
                Error::DatabaseCorrupt(format!(
                    "genome {} refers to missing taxon {}",
                    genome_id, taxon_id
                ))
            })?;
            if genome_taxa[i].replace(taxon).is_some() {
                return Err(Error::DatabaseCorrupt(format!(
                    "genome {} is assigned to more than one taxon",
                    genome_id
                )));
            }
        }

        let genome_taxa = genome_taxa
            .into_iter()
            .zip(genomes.iter())
            .map(|(taxon, genome)| {
                taxon.ok_or_else(|| {
                    Error::DatabaseCorrupt(format!("genome {} has no taxon", genome.id()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded {} reference genomes across {} taxa ({})",
            genomes.len(),
            taxonomy.len(),
            spec
        );

        Ok(Self {
            spec,
            genomes,
            genome_taxa,
            by_id,
            taxonomy,
        })
    }

    /// K-mer parameters of every reference signature
    pub fn spec(&self) -> KmerSpec {
        self.spec
    }

    /// Number of reference genomes
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Checks if there are no reference genomes
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// Reference genomes in load order
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Reference genome at a position
    ///
    /// # Panics
    ///
    /// If `i` is not below [`Database::len`]. See [`Database::get_genome`].
    pub fn genome(&self, i: usize) -> &Genome {
        &self.genomes[i]
    }

    /// Reference genome at a position, `None` if it is out of range
    pub fn get_genome(&self, i: usize) -> Option<&Genome> {
        self.genomes.get(i)
    }

    /// Position of a reference genome
    pub fn index_of(&self, genome_id: &str) -> Option<usize> {
        self.by_id.get(genome_id).copied()
    }

    /// Taxonomy tree
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Most specific taxon of a reference genome. Panics like [`Database::genome`].
    pub fn taxon_of(&self, i: usize) -> NodeIndex {
        self.genome_taxa[i]
    }

    /// Taxa of a reference genome from most to least specific. Panics like [`Database::genome`].
    pub fn ancestors_of(&self, i: usize) -> Ancestors<'_> {
        self.taxonomy.ancestors(self.genome_taxa[i])
    }

    /// Reference genomes whose ancestry passes through the taxon
    pub fn clade_genomes(&self, taxon: NodeIndex) -> impl Iterator<Item = usize> + '_ {
        self.genome_taxa
            .iter()
            .enumerate()
            .filter(move |(_, leaf)| self.taxonomy.is_ancestor_of(taxon, **leaf))
            .map(|(i, _)| i)
    }
}
