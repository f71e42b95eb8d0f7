//! Threshold gated classification of a query signature.
//!
//! The query is compared to every reference genome. The lineage of the closest genome is then
//! walked and each taxon with a threshold is tested against the smallest distance to any genome
//! in its clade. A taxon passes when its threshold is positive and not exceeded, so a threshold
//! of zero means the taxon is never predicted from distances alone.

use crate::database::Database;
use crate::distance;
use crate::signature::Signature;
use crate::taxonomy::NodeIndex;
use crate::{error::Error, Result};
use log::debug;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

/// Precedence between the threshold of a taxon and the thresholds of its ancestors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPolicy {
    /// Walks the lineage from the top down and stops at the first taxon that fails. A taxon is
    /// only predicted when all of its ancestors with thresholds pass as well.
    Strict,
    /// Walks the lineage from the most specific taxon up and predicts the first taxon that
    /// passes, whatever its ancestors report.
    FirstMatch,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Strict
    }
}

/// Classification settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Precedence rule used when walking the lineage
    pub policy: ThresholdPolicy,
    /// Number of closest reference genomes to list in the result
    pub report_closest: usize,
}

/// Reference genome and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenomeMatch {
    /// Position of the genome in the database
    pub genome: usize,
    /// Jaccard distance to the query
    pub distance: f64,
}

/// Taxon tested during classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxonMatch {
    /// Position of the taxon in the taxonomy
    pub taxon: NodeIndex,
    /// Smallest distance between the query and a genome of the clade
    pub distance: f64,
    /// Threshold the distance was tested against
    pub threshold: f64,
}

impl TaxonMatch {
    /// Checks the distance against the threshold
    pub fn passes(&self) -> bool {
        self.threshold > 0.0 && self.distance <= self.threshold
    }
}

/// Smallest distance from the query to any genome of each clade
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonDistances(Vec<f64>);

impl TaxonDistances {
    /// Reduces per genome distances, given in database order, to per taxon minimums
    pub fn compute(db: &Database, distances: &[f64]) -> Self {
        let n = db.taxonomy().len();
        let mins = distances
            .par_iter()
            .enumerate()
            .fold(
                || vec![f64::INFINITY; n],
                |mut mins, (i, d)| {
                    for taxon in db.ancestors_of(i) {
                        // a parent is never further than any of its children
                        if mins[taxon.index()] <= *d {
                            break;
                        }
                        mins[taxon.index()] = *d;
                    }
                    mins
                },
            )
            .reduce(
                || vec![f64::INFINITY; n],
                |mut left, right| {
                    left.iter_mut()
                        .zip(right)
                        .filter(|(l, r)| *r < **l)
                        .for_each(|(l, r)| *l = r);
                    left
                },
            );
        Self(mins)
    }

    /// Distance for the taxon, `None` if no reference genome belongs to it
    pub fn get(&self, taxon: NodeIndex) -> Option<f64> {
        Some(self.0[taxon.index()]).filter(|d| d.is_finite())
    }
}

/// Prediction for a single query genome
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    closest: GenomeMatch,
    predicted: Option<TaxonMatch>,
    next: Option<TaxonMatch>,
    top_matches: Vec<GenomeMatch>,
}

impl ClassificationResult {
    /// Closest reference genome, ties resolved by the smallest genome id
    pub fn closest(&self) -> GenomeMatch {
        self.closest
    }

    /// Distance to the closest reference genome
    pub fn closest_distance(&self) -> f64 {
        self.closest.distance
    }

    /// Predicted taxon, `None` if no taxon passed its threshold
    pub fn predicted(&self) -> Option<TaxonMatch> {
        self.predicted
    }

    /// The next more specific taxon that failed its threshold
    pub fn next(&self) -> Option<TaxonMatch> {
        self.next
    }

    /// Closest reference genomes in order, as many as configured
    pub fn top_matches(&self) -> &[GenomeMatch] {
        &self.top_matches
    }

    /// Resolves genome and taxon positions to the fields reported downstream
    pub fn summary(&self, db: &Database) -> Summary {
        let closest = db.genome(self.closest.genome);
        let taxon = |m: TaxonMatch| {
            let node = db.taxonomy().node(m.taxon);
            TaxonSummary {
                name: node.name().to_string(),
                rank: node.rank().to_string(),
                distance: m.distance,
                threshold: m.threshold,
            }
        };
        Summary {
            closest_genome: closest.id().to_string(),
            closest_description: closest.description().map(str::to_string),
            closest_distance: self.closest.distance,
            predicted: self.predicted.map(taxon),
            next: self.next.map(taxon),
        }
    }
}

/// Taxon fields of a [`Summary`]
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonSummary {
    /// Scientific name
    pub name: String,
    /// Taxonomic rank
    pub rank: String,
    /// Distance tested against the threshold
    pub distance: f64,
    /// Threshold of the taxon
    pub threshold: f64,
}

/// Owned view of a [`ClassificationResult`] with names instead of positions
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Id of the closest reference genome
    pub closest_genome: String,
    /// Description of the closest reference genome
    pub closest_description: Option<String>,
    /// Distance to the closest reference genome
    pub closest_distance: f64,
    /// Predicted taxon with the threshold that allowed it
    pub predicted: Option<TaxonSummary>,
    /// Next more specific taxon that failed its threshold
    pub next: Option<TaxonSummary>,
}

/// Orders matches by distance, then by genome id
fn compare_matches(db: &Database, a: &GenomeMatch, b: &GenomeMatch) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| db.genome(a.genome).id().cmp(db.genome(b.genome).id()))
}

fn closest_match(db: &Database, distances: &[f64]) -> Option<GenomeMatch> {
    distances
        .par_iter()
        .enumerate()
        .map(|(genome, distance)| GenomeMatch {
            genome,
            distance: *distance,
        })
        .reduce_with(|a, b| match compare_matches(db, &a, &b) {
            Ordering::Greater => b,
            _ => a,
        })
}

fn closest_matches(db: &Database, distances: &[f64], n: usize) -> Vec<GenomeMatch> {
    let mut matches = distances
        .iter()
        .enumerate()
        .map(|(genome, distance)| GenomeMatch {
            genome,
            distance: *distance,
        })
        .collect::<Vec<_>>();
    let n = n.min(matches.len());
    if n == 0 {
        return Vec::new();
    }
    if n < matches.len() {
        matches.select_nth_unstable_by(n - 1, |a, b| compare_matches(db, a, b));
        matches.truncate(n);
    }
    matches.sort_unstable_by(|a, b| compare_matches(db, a, b));
    matches
}

/// Returns the predicted taxon and the next more specific one on the lineage of `leaf`
fn walk_lineage(
    db: &Database,
    taxon_distances: &TaxonDistances,
    leaf: NodeIndex,
    policy: ThresholdPolicy,
) -> (Option<TaxonMatch>, Option<TaxonMatch>) {
    let ranks = db
        .taxonomy()
        .lineage(leaf)
        .into_iter()
        .filter_map(|taxon| {
            Some(TaxonMatch {
                taxon,
                threshold: db.taxonomy().node(taxon).threshold()?,
                distance: taxon_distances.get(taxon)?,
            })
        })
        .collect::<Vec<_>>();

    let predicted = match policy {
        ThresholdPolicy::Strict => ranks
            .iter()
            .take_while(|rank| rank.passes())
            .count()
            .checked_sub(1),
        ThresholdPolicy::FirstMatch => ranks.iter().rposition(|rank| rank.passes()),
    };
    let next = predicted.map_or(0, |pos| pos + 1);

    (predicted.map(|pos| ranks[pos]), ranks.get(next).copied())
}

/// Classifies a query signature against the reference database
pub fn classify(
    db: &Database,
    query: &Signature,
    config: &ClassifierConfig,
) -> Result<ClassificationResult> {
    if query.spec() != db.spec() {
        return Err(Error::IncompatibleSignature(query.spec(), db.spec()));
    }
    let distances = distance::distances(query, db.genomes())?;
    let closest = closest_match(db, &distances).ok_or(Error::EmptyDatabase)?;
    let taxon_distances = TaxonDistances::compute(db, &distances);
    let (predicted, next) = walk_lineage(
        db,
        &taxon_distances,
        db.taxon_of(closest.genome),
        config.policy,
    );

    debug!(
        "Closest genome {} at {:.4}, predicted {:?}",
        db.genome(closest.genome).id(),
        closest.distance,
        predicted.map(|m| db.taxonomy().node(m.taxon).name())
    );

    Ok(ClassificationResult {
        closest,
        predicted,
        next,
        top_matches: closest_matches(db, &distances, config.report_closest),
    })
}

/// Shares one database between any number of classifications
#[derive(Debug, Clone)]
pub struct Classifier {
    db: Arc<Database>,
    config: ClassifierConfig,
}

impl Classifier {
    /// Creates a classifier over a loaded database
    pub fn new(db: Arc<Database>, config: ClassifierConfig) -> Self {
        Self { db, config }
    }

    /// Reference database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Settings
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies a query signature
    pub fn classify(&self, query: &Signature) -> Result<ClassificationResult> {
        classify(&self.db, query, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::tests::{example_database, genome, spec};
    use crate::genome::Genome;
    use crate::taxonomy::{TaxonRecord, Taxonomy};

    fn query(kmers: std::ops::Range<u64>) -> Signature {
        Signature::from_kmers(spec(), kmers).unwrap()
    }

    /// Single reference `r1` of kmers 0..100 in a species below a genus
    fn single_reference(genus: f64, species: f64) -> Database {
        let taxonomy = Taxonomy::from_records(vec![
            TaxonRecord::new(1, "genus", "Examplia", None).with_threshold(genus),
            TaxonRecord::new(2, "species", "Examplia testis", Some(1)).with_threshold(species),
        ])
        .unwrap();
        Database::new(spec(), vec![genome("r1", 0..100)], taxonomy, vec![("r1", 2)]).unwrap()
    }

    fn rank_of(db: &Database, m: Option<TaxonMatch>) -> Option<&str> {
        m.map(|m| db.taxonomy().node(m.taxon).rank())
    }

    #[test]
    fn identical_query_predicts_species() {
        let db = single_reference(0.10, 0.05);
        let result = classify(&db, &query(0..100), &ClassifierConfig::default()).unwrap();
        assert_eq!(result.closest_distance(), 0.0);
        assert_eq!(rank_of(&db, result.predicted()), Some("species"));
        assert_eq!(result.next(), None);
    }

    #[test]
    fn unrelated_query_predicts_nothing() {
        let db = single_reference(0.10, 0.05);
        let result = classify(&db, &query(1000..1100), &ClassifierConfig::default()).unwrap();
        assert_eq!(result.closest_distance(), 1.0);
        assert_eq!(result.predicted(), None);
        let next = result.next().unwrap();
        assert_eq!(rank_of(&db, Some(next)), Some("genus"));
        assert_eq!(next.distance, 1.0);
        assert!(next.distance > next.threshold);
    }

    #[test]
    fn distance_between_thresholds_predicts_genus() {
        let db = single_reference(0.10, 0.05);
        // 93 shared out of 100
        let result = classify(&db, &query(0..93), &ClassifierConfig::default()).unwrap();
        assert_eq!(result.closest_distance(), 0.07);
        let predicted = result.predicted().unwrap();
        assert_eq!(rank_of(&db, Some(predicted)), Some("genus"));
        assert_eq!(predicted.threshold, 0.10);
        let next = result.next().unwrap();
        assert_eq!(rank_of(&db, Some(next)), Some("species"));
        assert_eq!(next.distance, 0.07);
    }

    #[test]
    fn zero_threshold_is_never_predicted() {
        let db = single_reference(0.10, 0.0);
        for policy in &[ThresholdPolicy::Strict, ThresholdPolicy::FirstMatch] {
            let config = ClassifierConfig {
                policy: *policy,
                ..Default::default()
            };
            let result = classify(&db, &query(0..100), &config).unwrap();
            assert_eq!(result.closest_distance(), 0.0);
            assert_eq!(rank_of(&db, result.predicted()), Some("genus"));
            assert_eq!(rank_of(&db, result.next()), Some("species"));
        }
    }

    #[test]
    fn policies_differ_on_failing_ancestor() {
        let db = single_reference(0.0, 0.10);
        let strict = classify(&db, &query(0..100), &ClassifierConfig::default()).unwrap();
        assert_eq!(strict.predicted(), None);
        assert_eq!(rank_of(&db, strict.next()), Some("genus"));

        let config = ClassifierConfig {
            policy: ThresholdPolicy::FirstMatch,
            ..Default::default()
        };
        let first_match = classify(&db, &query(0..100), &config).unwrap();
        assert_eq!(rank_of(&db, first_match.predicted()), Some("species"));
        assert_eq!(first_match.next(), None);
    }

    #[test]
    fn ties_prefer_smallest_genome_id() {
        let taxonomy = Taxonomy::from_records(vec![
            TaxonRecord::new(1, "species", "S1", None).with_threshold(0.1),
            TaxonRecord::new(2, "species", "S2", None).with_threshold(0.1),
        ])
        .unwrap();
        let genomes = vec![genome("zeta", 0..50), genome("alpha", 0..50)];
        let db = Database::new(spec(), genomes, taxonomy, vec![("zeta", 1), ("alpha", 2)]).unwrap();
        let result = classify(&db, &query(0..50), &ClassifierConfig::default()).unwrap();
        assert_eq!(db.genome(result.closest().genome).id(), "alpha");
        assert_eq!(
            db.taxonomy().node(result.predicted().unwrap().taxon).name(),
            "S2"
        );
    }

    #[test]
    fn genus_level_prediction_in_larger_tree() {
        let db = example_database();
        // 70 of a1's 100 k-mers
        let result = classify(&db, &query(0..70), &ClassifierConfig::default()).unwrap();
        assert_eq!(db.genome(result.closest().genome).id(), "a1");
        let summary = result.summary(&db);
        assert_eq!(summary.closest_genome, "a1");
        assert_eq!(summary.closest_distance, 0.3);
        let predicted = summary.predicted.unwrap();
        assert_eq!(predicted.name, "Alphabacter");
        assert_eq!(predicted.threshold, 0.5);
        let next = summary.next.unwrap();
        assert_eq!(next.name, "Alphabacter primus");
        assert_eq!(next.rank, "species");
    }

    #[test]
    fn per_taxon_distances() {
        let db = example_database();
        let distances = distance::distances(&query(0..100), db.genomes()).unwrap();
        let taxa = TaxonDistances::compute(&db, &distances);
        let d = |id| taxa.get(db.taxonomy().index_of(id).unwrap());
        assert_eq!(d(1), Some(0.0));
        assert_eq!(d(10), Some(0.0));
        assert_eq!(d(100), Some(0.0));
        assert_eq!(d(101), Some(100.0 / 150.0));
        assert_eq!(d(20), Some(1.0));
    }

    #[test]
    fn taxa_without_genomes_have_no_distance() {
        let mut records = crate::taxonomy::tests::example_records();
        records.push(TaxonRecord::new(300, "genus", "Empty", Some(1)).with_threshold(0.5));
        let taxonomy = Taxonomy::from_records(records).unwrap();
        let db = Database::new(spec(), vec![genome("a1", 0..10)], taxonomy, vec![("a1", 100)])
            .unwrap();
        let taxa = TaxonDistances::compute(&db, &[0.25]);
        assert_eq!(taxa.get(db.taxonomy().index_of(300).unwrap()), None);
        assert_eq!(taxa.get(db.taxonomy().index_of(1).unwrap()), Some(0.25));
    }

    #[test]
    fn reports_closest_genomes_in_order() {
        let db = Arc::new(example_database());
        let classifier = Classifier::new(
            db.clone(),
            ClassifierConfig {
                report_closest: 3,
                ..Default::default()
            },
        );
        let result = classifier.classify(&query(0..100)).unwrap();
        let ids = result
            .top_matches()
            .iter()
            .map(|m| db.genome(m.genome).id())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(result.top_matches()[1].distance, 20.0 / 110.0);
        assert_eq!(rank_of(&db, result.predicted()), Some("species"));
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = Classifier::new(Arc::new(example_database()), ClassifierConfig::default());
        let query = query(40..120);
        assert_eq!(
            classifier.classify(&query).unwrap(),
            classifier.classify(&query).unwrap()
        );
    }

    #[test]
    fn empty_database() {
        let taxonomy = Taxonomy::from_records(crate::taxonomy::tests::example_records()).unwrap();
        let db = Database::new(spec(), Vec::<Genome>::new(), taxonomy, Vec::<(String, u64)>::new())
            .unwrap();
        assert!(matches!(
            classify(&db, &query(0..10), &ClassifierConfig::default()),
            Err(Error::EmptyDatabase)
        ));
    }

    #[test]
    fn incompatible_query() {
        let db = example_database();
        let other = Signature::empty(crate::kmer::KmerSpec::new(12).unwrap());
        assert!(matches!(
            classify(&db, &other, &ClassifierConfig::default()),
            Err(Error::IncompatibleSignature(_, _))
        ));
    }
}
