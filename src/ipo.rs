//! In-Parameter-Order (IPO) construction of a 2-wise covering array.
//!
//! The array is built over value indices only, without any knowledge of infeasible pairs.
//! Factors are added one at a time:
//!
//! - start from the full product of the first two factors,
//! - *horizontal growth*: extend every existing row with the value of the new factor that
//!   covers the most still-uncovered pairs (lowest index on ties),
//! - *vertical growth*: place each pair still uncovered into a row that has a don't-care
//!   slot for the older factor, or append a new row holding just that pair.
//!
//! Don't-care slots are left unassigned in the returned rows; callers fill them.

use std::collections::BTreeSet;

use crate::factor::FactorId;
use crate::row::PartialRow;

/// A covering array over factors with the given domain sizes.
///
/// Every pair of values of two distinct factors is realized by at least one row, treating
/// unassigned slots as free. Domains must be non-empty.
pub fn covering_array(sizes: &[usize]) -> Vec<PartialRow> {
    let k = sizes.len();
    match k {
        0 => return Vec::new(),
        1 => {
            return (0..sizes[0])
                .map(|v| PartialRow::empty(1).with(FactorId::new(0), v))
                .collect();
        }
        _ => {}
    }

    let (f0, f1) = (FactorId::new(0), FactorId::new(1));
    let mut rows: Vec<PartialRow> = Vec::with_capacity(sizes[0] * sizes[1]);
    for v0 in 0..sizes[0] {
        for v1 in 0..sizes[1] {
            rows.push(PartialRow::empty(k).with(f0, v0).with(f1, v1));
        }
    }

    for i in 2..k {
        let fi = FactorId::new(i);
        // (older factor, its value, value of factor i)
        let mut uncovered: BTreeSet<(usize, usize, usize)> = BTreeSet::new();
        for j in 0..i {
            for vj in 0..sizes[j] {
                for vi in 0..sizes[i] {
                    uncovered.insert((j, vj, vi));
                }
            }
        }

        for row in rows.iter_mut() {
            let mut best = (0, 0);
            for vi in 0..sizes[i] {
                let gain = row
                    .assigned()
                    .filter(|&(j, vj)| uncovered.contains(&(j.index(), vj, vi)))
                    .count();
                if gain > best.1 {
                    best = (vi, gain);
                }
            }
            let vi = best.0;
            row.set(fi, vi);
            let done: Vec<_> = row.assigned().filter(|&(j, _)| j != fi).collect();
            for (j, vj) in done {
                uncovered.remove(&(j.index(), vj, vi));
            }
        }

        for (j, vj, vi) in uncovered {
            let fj = FactorId::new(j);
            match rows
                .iter_mut()
                .find(|r| r.get(fi) == Some(vi) && r.get(fj).is_none())
            {
                Some(row) => row.set(fj, vj),
                None => rows.push(PartialRow::empty(k).with(fj, vj).with(fi, vi)),
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every value pair is set explicitly in some row; a don't-care realizes nothing.
    fn covers_all_pairs(sizes: &[usize], rows: &[PartialRow]) -> bool {
        for i in 0..sizes.len() {
            for j in (i + 1)..sizes.len() {
                for vi in 0..sizes[i] {
                    for vj in 0..sizes[j] {
                        let realized = rows.iter().any(|r| {
                            r.get(FactorId::new(i)) == Some(vi) && r.get(FactorId::new(j)) == Some(vj)
                        });
                        if !realized {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    fn values(row: &PartialRow) -> Vec<Option<usize>> {
        (0..row.len()).map(|i| row.get(FactorId::new(i))).collect()
    }

    #[test]
    fn test_small_array_is_deterministic() {
        let rows = covering_array(&[2, 3, 2]);
        let rows: Vec<_> = rows.iter().map(values).collect();
        assert_eq!(
            rows,
            vec![
                vec![Some(0), Some(0), Some(0)],
                vec![Some(0), Some(1), Some(1)],
                vec![Some(0), Some(2), Some(0)],
                vec![Some(1), Some(0), Some(1)],
                vec![Some(1), Some(1), Some(0)],
                vec![Some(1), Some(2), Some(1)],
            ]
        );
    }

    #[test]
    fn test_covers_all_pairs() {
        for sizes in [
            vec![2, 2, 2, 2],
            vec![3, 3, 3, 3],
            vec![2, 3, 4, 2, 3],
            vec![4, 2, 2, 2, 2, 2, 2],
            vec![5, 1, 3],
        ] {
            let rows = covering_array(&sizes);
            assert!(covers_all_pairs(&sizes, &rows), "sizes {:?}", sizes);
        }
    }

    #[test]
    fn test_dont_cares_do_not_count_as_coverage() {
        let empty = vec![PartialRow::empty(3); 4];
        assert!(!covers_all_pairs(&[2, 2, 2], &empty));
    }

    #[test]
    fn test_boolean_factors_beat_exhaustive() {
        let rows = covering_array(&[2; 6]);
        assert!(covers_all_pairs(&[2; 6], &rows));
        assert!(rows.len() < 64);
    }

    #[test]
    fn test_degenerate_sizes() {
        assert!(covering_array(&[]).is_empty());
        let rows = covering_array(&[3]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get(FactorId::new(0)), Some(2));
    }
}
