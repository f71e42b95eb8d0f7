//! Jaccard distances between signatures.
//!
//! Intersections are counted exactly with a linear merge of the sorted k-mer arrays, only the
//! final ratio is a floating point value.

use crate::kmer::Kmer;
use crate::signature::Signature;
use crate::{error::Error, Result};
use rayon::prelude::*;

/// Number of k-mers present in both sorted, deduplicated slices
pub fn intersection_size(a: &[Kmer], b: &[Kmer]) -> usize {
    let (mut i, mut j, mut shared) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }
    shared
}

fn check_compatible(a: &Signature, b: &Signature) -> Result<()> {
    if a.spec() != b.spec() {
        return Err(Error::IncompatibleSignature(a.spec(), b.spec()));
    }
    Ok(())
}

/// Returns `(intersection, union)` sizes
fn overlap(a: &Signature, b: &Signature) -> Result<(usize, usize)> {
    check_compatible(a, b)?;
    let shared = intersection_size(a.kmers(), b.kmers());
    Ok((shared, a.len() + b.len() - shared))
}

/// Jaccard index, `0.0` when both signatures are empty
pub fn jaccard(a: &Signature, b: &Signature) -> Result<f64> {
    let (shared, union) = overlap(a, b)?;
    if union == 0 {
        return Ok(0.0);
    }
    Ok(shared as f64 / union as f64)
}

/// Jaccard distance in `[0, 1]`, `1.0` when both signatures are empty
pub fn jaccard_distance(a: &Signature, b: &Signature) -> Result<f64> {
    let (shared, union) = overlap(a, b)?;
    if union == 0 {
        return Ok(1.0);
    }
    Ok((union - shared) as f64 / union as f64)
}

/// Distances from the query to every reference, in reference order
pub fn distances<R>(query: &Signature, refs: &[R]) -> Result<Vec<f64>>
where
    R: AsRef<Signature> + Sync,
{
    refs.par_iter()
        .map(|reference| jaccard_distance(query, reference.as_ref()))
        .collect()
}

/// Row-major distances of every query to every reference
pub fn distance_matrix<Q, R>(queries: &[Q], refs: &[R]) -> Result<Vec<Vec<f64>>>
where
    Q: AsRef<Signature> + Sync,
    R: AsRef<Signature> + Sync,
{
    queries
        .par_iter()
        .map(|query| distances(query.as_ref(), refs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::KmerSpec;

    fn sig(kmers: &[Kmer]) -> Signature {
        Signature::from_kmers(KmerSpec::new(11).unwrap(), kmers.iter().copied()).unwrap()
    }

    #[test]
    fn merge_counts_shared_values_once() {
        assert_eq!(intersection_size(&[1, 3, 5, 7], &[3, 4, 5, 8]), 2);
        assert_eq!(intersection_size(&[], &[3, 4]), 0);
        assert_eq!(intersection_size(&[1, 2, 3], &[1, 2, 3]), 3);
    }

    #[test]
    fn identical_and_disjoint() {
        let a = sig(&[1, 2, 3, 4]);
        let b = sig(&[5, 6]);
        assert_eq!(jaccard_distance(&a, &a).unwrap(), 0.0);
        assert_eq!(jaccard_distance(&a, &b).unwrap(), 1.0);
        assert_eq!(jaccard(&a, &a).unwrap(), 1.0);
        assert_eq!(jaccard(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn partial_overlap_is_symmetric() {
        let a = sig(&[1, 2, 3, 4]);
        let b = sig(&[3, 4, 5, 6]);
        // intersection 2, union 6
        assert_eq!(jaccard_distance(&a, &b).unwrap(), 4.0 / 6.0);
        assert_eq!(
            jaccard_distance(&a, &b).unwrap(),
            jaccard_distance(&b, &a).unwrap()
        );
        assert_eq!(jaccard(&a, &b).unwrap(), 2.0 / 6.0);
    }

    #[test]
    fn empty_signatures() {
        let empty = sig(&[]);
        let d = jaccard_distance(&empty, &empty).unwrap();
        assert_eq!(d, 1.0);
        assert!(!d.is_nan());
        assert_eq!(jaccard(&empty, &empty).unwrap(), 0.0);
        assert_eq!(jaccard_distance(&empty, &sig(&[1])).unwrap(), 1.0);
    }

    #[test]
    fn incompatible_specs_are_rejected() {
        let a = sig(&[1, 2]);
        let b = Signature::from_kmers(KmerSpec::new(12).unwrap(), vec![1, 2]).unwrap();
        assert!(matches!(
            jaccard_distance(&a, &b),
            Err(Error::IncompatibleSignature(_, _))
        ));
        assert!(distances(&a, &[b]).is_err());
    }

    #[test]
    fn distances_keep_reference_order() {
        let query = sig(&[1, 2, 3, 4]);
        let refs = vec![sig(&[1, 2, 3, 4]), sig(&[9]), sig(&[1, 2])];
        assert_eq!(distances(&query, &refs).unwrap(), vec![0.0, 1.0, 0.5]);

        let matrix = distance_matrix(&refs, &refs).unwrap();
        assert_eq!(matrix.len(), 3);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row[i], 0.0);
            for (j, d) in row.iter().enumerate() {
                assert_eq!(*d, matrix[j][i]);
                assert!((0.0..=1.0).contains(d));
            }
        }
    }
}
