#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sigtax::seqio::SequenceSet;
use sigtax::{Database, Genome, KmerSpec, TaxonRecord, Taxonomy};

pub const NUCLEOTIDES: &[u8] = b"ACGT";

/// Reproducible uniform random nucleotides
pub fn random_sequence(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| *NUCLEOTIDES.choose(&mut rng).unwrap())
        .collect()
}

/// Single record genome of random sequence
pub fn random_genome(id: &str, seed: u64, len: usize, spec: KmerSpec) -> Genome {
    Genome::from_source(&SequenceSet::new(id, vec![random_sequence(seed, len)]), spec).unwrap()
}

/// Genomes `r1` (seed 1) and `r2` (seed 2) of 2kb in two species of one genus
pub fn two_species_database() -> Database {
    let spec = KmerSpec::new(11).unwrap();
    let genomes = vec![
        random_genome("r1", 1, 2000, spec),
        random_genome("r2", 2, 2000, spec),
    ];
    let taxonomy = Taxonomy::from_records(vec![
        TaxonRecord::new(1, "genus", "Examplia", None).with_threshold(0.5),
        TaxonRecord::new(11, "species", "Examplia prima", Some(1)).with_threshold(0.2),
        TaxonRecord::new(12, "species", "Examplia secunda", Some(1)).with_threshold(0.2),
    ])
    .unwrap();
    Database::new(spec, genomes, taxonomy, vec![("r1", 11), ("r2", 12)]).unwrap()
}
