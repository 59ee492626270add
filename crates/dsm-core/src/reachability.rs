use fixedbitset::FixedBitSet;
use tracing::{debug, info};

use crate::matrix::Dsm;
use crate::value::CellValue;

/// Propagation cost: the fraction of element pairs connected by a direct or
/// transitive dependency path, counting every element as reaching itself.
///
/// Computed as the boolean transitive closure: with `S = P = I`, repeat
/// `P <- P * A` (boolean matrix product) and `S <- S | P` up to `N` times,
/// stopping early once `P` is all-false (the fixpoint: no longer paths
/// exist). The result is `|S| / N^2`, the expected fraction of the system a
/// uniformly random element can affect. Rows are bitsets, so one
/// multiplication costs `O(N^2)` words rather than `O(N^3)` cells.
pub fn propagation_cost<V: CellValue>(dsm: &Dsm<V>) -> f64 {
    let n = dsm.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return 1.0;
    }
    info!(elements = n, "computing propagation cost");

    // Row-bitset copy of the dependency relation; the caller's matrix is
    // left untouched.
    let adjacency: Vec<FixedBitSet> = (0..n)
        .map(|i| {
            let mut row = FixedBitSet::with_capacity(n);
            for j in 0..n {
                if dsm.cell(i, j).is_set() {
                    row.insert(j);
                }
            }
            row
        })
        .collect();

    let mut reachable: Vec<FixedBitSet> = identity(n);
    let mut power: Vec<FixedBitSet> = identity(n);

    for round in 1..=n {
        let mut next: Vec<FixedBitSet> = vec![FixedBitSet::with_capacity(n); n];
        for i in 0..n {
            for k in power[i].ones() {
                next[i].union_with(&adjacency[k]);
            }
        }
        power = next;
        if power.iter().all(|row| row.is_clear()) {
            debug!(round, "reachability fixpoint");
            break;
        }
        for i in 0..n {
            reachable[i].union_with(&power[i]);
        }
        if round % 50 == 0 {
            debug!(round, total = n, "reachability progress");
        }
    }

    let total: usize = reachable.iter().map(|row| row.count_ones(..)).sum();
    let cost = total as f64 / (n * n) as f64;
    info!(reachable_pairs = total, cost, "computed propagation cost");
    cost
}

fn identity(n: usize) -> Vec<FixedBitSet> {
    (0..n)
        .map(|i| {
            let mut row = FixedBitSet::with_capacity(n);
            row.insert(i);
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dependency;

    fn dsm_with_edges(elements: &[&str], edges: &[(&str, &str)]) -> Dsm<Dependency> {
        let names: Vec<String> = elements.iter().map(|s| s.to_string()).collect();
        let mut dsm = Dsm::empty(names).unwrap();
        for (from, to) in edges {
            dsm.set_by_name(from, to, Dependency::YES).unwrap();
        }
        dsm
    }

    #[test]
    fn test_chain_of_four() {
        // 0->1->2->3: 6 transitive pairs plus 4 self pairs = 10/16.
        let dsm = dsm_with_edges(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        assert_eq!(propagation_cost(&dsm), 0.625);
    }

    #[test]
    fn test_no_dependencies_reaches_only_self() {
        let dsm = dsm_with_edges(&["a", "b", "c", "d"], &[]);
        assert_eq!(propagation_cost(&dsm), 0.25); // 1/N
    }

    #[test]
    fn test_fully_connected_saturates() {
        let names = ["a", "b", "c", "d", "e"];
        let mut dsm = dsm_with_edges(&names, &[]);
        for i in 0..5 {
            for j in 0..5 {
                if i != j {
                    dsm.set(i, j, Dependency::YES).unwrap();
                }
            }
        }
        assert_eq!(propagation_cost(&dsm), 1.0);
    }

    #[test]
    fn test_cycle_reaches_everything_in_it() {
        let dsm = dsm_with_edges(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert_eq!(propagation_cost(&dsm), 1.0);
    }

    #[test]
    fn test_degenerate_sizes() {
        let empty: Dsm<Dependency> = Dsm::empty(vec![]).unwrap();
        assert_eq!(propagation_cost(&empty), 0.0);
        let single: Dsm<Dependency> = Dsm::empty(vec!["only".to_string()]).unwrap();
        assert_eq!(propagation_cost(&single), 1.0);
    }

    #[test]
    fn test_weighted_matrix_uses_nonzero_cells() {
        let mut dsm: Dsm<f64> = Dsm::empty(vec!["a".to_string(), "b".to_string()]).unwrap();
        dsm.set_by_name("a", "b", 0.5).unwrap();
        // Pairs: a->a, b->b, a->b = 3/4.
        assert_eq!(propagation_cost(&dsm), 0.75);
    }
}
