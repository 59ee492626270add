use std::collections::BTreeSet;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::bus::vertical_buses;
use crate::cluster::Cluster;
use crate::cost::{ipow, CostModel, DEFAULT_LAMBDA};
use crate::error::{DsmError, Result};
use crate::matrix::Dsm;
use crate::value::CellValue;

/// Parameters of a clustering run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    /// Fan-in ratio above which an element counts as a vertical bus.
    pub vertical_bus_threshold: f64,
    /// Cluster size exponent of the cost model.
    pub lambda: u32,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            vertical_bus_threshold: 0.1,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

/// Output of a clustering run: the reordered, partitioned matrix copy plus
/// the cost figures. Consumers depend only on the ordered element list, the
/// named cluster intervals, and the bus set.
#[derive(Debug, Clone)]
pub struct ClusteredCostResult<V> {
    pub dsm: Dsm<V>,
    pub vertical_buses: BTreeSet<String>,
    pub clustered_cost: u64,
    pub relative_clustered_cost: f64,
}

/// Cluster a matrix by stochastic local search.
///
/// Works on an owned copy; the caller's matrix is never touched. Starting
/// from singleton clusters, the optimizer repeatedly draws a random element
/// and moves it into the cluster giving the largest cost decrease, keeping
/// the running total up to date incrementally. It stops after `N`
/// consecutive non-improving draws. This is a Monte-Carlo search for a
/// local optimum: different seeds can yield different, equally valid
/// clusterings of the same input.
pub fn cluster<V: CellValue, R: Rng + ?Sized>(
    dsm: &Dsm<V>,
    options: &ClusterOptions,
    rng: &mut R,
) -> Result<ClusteredCostResult<V>> {
    let model = CostModel::new(options.lambda)?;
    let mut work = dsm.clone();
    work.init_singleton_clusters();

    let buses = vertical_buses(&work, options.vertical_bus_threshold)?;
    info!(elements = work.len(), buses = buses.len(), "starting clustering");

    let mut optimizer = Optimizer {
        total: model.total_cost_raw(&work, &buses)? as i128,
        dsm: work,
        buses,
        model,
    };
    optimizer.run(rng)?;

    let clustered_cost = model.clustered_cost(&optimizer.dsm, &optimizer.buses)?;
    debug_assert_eq!(i128::from(clustered_cost), optimizer.total);
    let relative_clustered_cost =
        model.relative_clustered_cost(&optimizer.dsm, &optimizer.buses)?;
    info!(
        clusters = optimizer.dsm.partition().len(),
        clustered_cost, relative_clustered_cost, "finished clustering"
    );

    Ok(ClusteredCostResult {
        dsm: optimizer.dsm,
        vertical_buses: optimizer.buses,
        clustered_cost,
        relative_clustered_cost,
    })
}

/// [`cluster`] with a `SmallRng` seeded from `seed`, for reproducible runs.
pub fn cluster_seeded<V: CellValue>(
    dsm: &Dsm<V>,
    options: &ClusterOptions,
    seed: u64,
) -> Result<ClusteredCostResult<V>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    cluster(dsm, options, &mut rng)
}

struct Optimizer<V> {
    dsm: Dsm<V>,
    buses: BTreeSet<String>,
    model: CostModel,
    total: i128,
}

impl<V: CellValue> Optimizer<V> {
    fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let n = self.dsm.len();
        if n == 0 {
            return Ok(());
        }
        let mut no_improvement = 0usize;
        while no_improvement < n {
            let p = rng.gen_range(0..n);
            if self.is_bus(p) {
                // Buses never move. The draw still counts as non-improving,
                // otherwise a bus-heavy matrix never terminates.
                no_improvement += 1;
                continue;
            }
            match self.winning_cluster(p)? {
                Some((target, delta)) => {
                    self.move_to_cluster(p, target)?;
                    self.total += delta;
                    no_improvement = 0;
                    debug!(
                        position = p,
                        delta,
                        cost = self.total,
                        clusters = self.dsm.partition().len(),
                        "accepted move"
                    );
                }
                None => no_improvement += 1,
            }
        }
        Ok(())
    }

    fn is_bus(&self, pos: usize) -> bool {
        self.buses.contains(&self.dsm.names()[pos])
    }

    /// The candidate cluster with the most negative marginal cost, if any
    /// strictly decreases the total. Bus singletons are not candidates,
    /// tighter than admitting every cluster other than the source: buses
    /// stay alone, so no bus column ever appears inside a source or target
    /// range and [`Self::marginal_cost`] needs no bus-waiver terms to stay
    /// exactly equal to a from-scratch recomputation.
    fn winning_cluster(&self, p: usize) -> Result<Option<(usize, i128)>> {
        let src = self.cluster_of(p)?;
        let src_cluster = self.dsm.partition().get(src).ok_or_else(|| {
            DsmError::InvalidState(format!("missing source cluster for position {p}"))
        })?;
        let mut best: Option<(usize, i128)> = None;
        for (idx, candidate) in self.dsm.partition().iter().enumerate() {
            if idx == src {
                continue;
            }
            if candidate.len() == 1 && self.is_bus(candidate.start) {
                continue;
            }
            let delta = self.marginal_cost(p, src_cluster, candidate);
            if delta < 0 && best.map_or(true, |(_, d)| delta < d) {
                best = Some((idx, delta));
            }
        }
        Ok(best)
    }

    /// Closed-form change in total cost from moving the element at `p` out
    /// of cluster `src` (size m) into cluster `tgt` (size n-1, growing to
    /// n). Only cells incident to `p`, the source, and the target are
    /// inspected:
    /// (a) p's edges into/out of the target turn from cross-cluster into
    ///     within-cluster terms at the grown size,
    /// (b) p's edges within the source turn into cross-cluster terms,
    /// (c) bystander pairs inside source and target repay the size change
    ///     even though p is not an endpoint.
    fn marginal_cost(&self, p: usize, src: &Cluster, tgt: &Cluster) -> i128 {
        let lambda = self.model.lambda();
        let total_n = self.dsm.len();
        let (src_range, m) = (src.positions(), src.len());
        let (tgt_range, grown) = (tgt.positions(), tgt.len() + 1);

        let pow_system = ipow(total_n, lambda) as i128;
        let pow_src = ipow(m, lambda) as i128;
        let pow_src_shrunk = ipow(m - 1, lambda) as i128;
        let pow_tgt = ipow(grown - 1, lambda) as i128;
        let pow_tgt_grown = ipow(grown, lambda) as i128;

        let mut delta = 0i128;
        for i in tgt_range.clone() {
            let w = (self.weight(i, p) + self.weight(p, i)) as i128;
            delta += w * (pow_tgt_grown - pow_system);
        }
        for i in src_range.clone() {
            if i != p {
                let w = (self.weight(p, i) + self.weight(i, p)) as i128;
                delta += w * (pow_system - pow_src);
            }
        }
        let mut src_pairs = 0i128;
        for i in src_range.clone() {
            for j in src_range.clone() {
                if i != j && i != p && j != p {
                    src_pairs += self.weight(i, j) as i128;
                }
            }
        }
        delta += src_pairs * (pow_src_shrunk - pow_src);

        let mut tgt_pairs = 0i128;
        for i in tgt_range.clone() {
            for j in tgt_range.clone() {
                if i != j {
                    tgt_pairs += self.weight(i, j) as i128;
                }
            }
        }
        delta += tgt_pairs * (pow_tgt_grown - pow_tgt);

        delta
    }

    /// Apply one move as an indivisible operation: rebalance the interval
    /// bounds, physically relocate the element, drop the source if emptied.
    fn move_to_cluster(&mut self, p: usize, tgt: usize) -> Result<()> {
        let src = self.cluster_of(p)?;
        let dest = self.dsm.partition_mut().rebalance_for_move(src, tgt);
        self.dsm.shift(p, dest)?;
        self.dsm.partition_mut().remove_if_empty(src);
        debug_assert!(self.dsm.partition().validate(self.dsm.len()).is_ok());
        Ok(())
    }

    fn cluster_of(&self, p: usize) -> Result<usize> {
        self.dsm.partition().cluster_of(p).ok_or_else(|| {
            DsmError::InvalidState(format!("cluster partition does not cover position {p}"))
        })
    }

    fn weight(&self, i: usize, j: usize) -> u64 {
        self.dsm.cell(i, j).weight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dependency;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn dsm_with_edges(elements: &[&str], edges: &[(&str, &str)]) -> Dsm<Dependency> {
        let mut dsm = Dsm::empty(names(elements)).unwrap();
        for (from, to) in edges {
            dsm.set_by_name(from, to, Dependency::YES).unwrap();
        }
        dsm
    }

    fn optimizer_for(dsm: &Dsm<Dependency>) -> Optimizer<Dependency> {
        let mut work = dsm.clone();
        work.init_singleton_clusters();
        let model = CostModel::default();
        let total = model.total_cost_raw(&work, &BTreeSet::new()).unwrap() as i128;
        Optimizer {
            dsm: work,
            buses: BTreeSet::new(),
            model,
            total,
        }
    }

    #[test]
    fn test_disconnected_matrix_stays_singletons() {
        let dsm = dsm_with_edges(&["a", "b", "c"], &[]);
        let result = cluster_seeded(&dsm, &ClusterOptions::default(), 7).unwrap();
        assert_eq!(result.clustered_cost, 0);
        assert_eq!(result.relative_clustered_cost, 0.0);
        assert_eq!(result.dsm.partition().len(), 3);
        for c in result.dsm.partition().iter() {
            assert_eq!(c.len(), 1);
        }
    }

    #[test]
    fn test_caller_matrix_untouched() {
        let dsm = dsm_with_edges(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        let before = dsm.names().to_vec();
        let _ = cluster_seeded(&dsm, &ClusterOptions::default(), 3).unwrap();
        assert_eq!(dsm.names(), &before[..]);
        assert_eq!(dsm.partition().len(), 4);
    }

    #[test]
    fn test_chain_clustering_improves_cost() {
        let dsm = dsm_with_edges(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        let options = ClusterOptions {
            vertical_bus_threshold: 1.0,
            ..ClusterOptions::default()
        };
        let result = cluster_seeded(&dsm, &options, 11).unwrap();
        // All-singleton cost is 3 * 4^2 = 48; any accepted move beats it.
        assert!(result.clustered_cost < 48);
        result
            .dsm
            .partition()
            .validate(result.dsm.len())
            .unwrap();
        // The running total and a from-scratch recomputation agree.
        let model = CostModel::default();
        assert_eq!(
            model
                .clustered_cost(&result.dsm, &result.vertical_buses)
                .unwrap(),
            result.clustered_cost
        );
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let dsm = dsm_with_edges(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "e"), ("e", "c"), ("a", "e")],
        );
        let options = ClusterOptions {
            vertical_bus_threshold: 1.0,
            ..ClusterOptions::default()
        };
        let first = cluster_seeded(&dsm, &options, 42).unwrap();
        let second = cluster_seeded(&dsm, &options, 42).unwrap();
        assert_eq!(first.dsm.names(), second.dsm.names());
        assert_eq!(first.clustered_cost, second.clustered_cost);
        assert_eq!(first.dsm.partition(), second.dsm.partition());
    }

    #[test]
    fn test_marginal_cost_matches_full_recompute() {
        let dsm = dsm_with_edges(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "e"), ("a", "d")],
        );
        // From singletons, check every (element, target) pair once.
        for p in 0..dsm.len() {
            for tgt in 0..dsm.len() {
                let mut opt = optimizer_for(&dsm);
                let src = opt.cluster_of(p).unwrap();
                if src == tgt {
                    continue;
                }
                let before = opt
                    .model
                    .total_cost_raw(&opt.dsm, &opt.buses)
                    .unwrap() as i128;
                let src_cluster = opt.dsm.partition().get(src).unwrap().clone();
                let tgt_cluster = opt.dsm.partition().get(tgt).unwrap().clone();
                let predicted = opt.marginal_cost(p, &src_cluster, &tgt_cluster);
                opt.move_to_cluster(p, tgt).unwrap();
                let after = opt
                    .model
                    .total_cost_raw(&opt.dsm, &opt.buses)
                    .unwrap() as i128;
                assert_eq!(after - before, predicted, "move of {p} into {tgt}");
            }
        }
    }

    #[test]
    fn test_move_and_move_back_restores_cost() {
        use crate::cluster::Partition;

        let mut dsm = dsm_with_edges(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")],
        );
        // Two clusters so the source survives the outbound move.
        dsm.set_partition(
            Partition::from_clusters(vec![
                Cluster {
                    name: "front".to_string(),
                    start: 0,
                    end: 2,
                },
                Cluster {
                    name: "back".to_string(),
                    start: 2,
                    end: 4,
                },
            ])
            .unwrap(),
        )
        .unwrap();

        let model = CostModel::default();
        let total = model.total_cost_raw(&dsm, &BTreeSet::new()).unwrap() as i128;
        let mut opt = Optimizer {
            dsm,
            buses: BTreeSet::new(),
            model,
            total,
        };

        let full = |o: &Optimizer<Dependency>| {
            o.model.total_cost_raw(&o.dsm, &o.buses).unwrap() as i128
        };
        let marginal = |o: &Optimizer<Dependency>, p: usize, tgt: usize| {
            let src = o.cluster_of(p).unwrap();
            let src_cluster = o.dsm.partition().get(src).unwrap().clone();
            let tgt_cluster = o.dsm.partition().get(tgt).unwrap().clone();
            o.marginal_cost(p, &src_cluster, &tgt_cluster)
        };
        let before = full(&opt);

        // b into the back cluster, then straight back into the front.
        let b = opt.dsm.position_of("b").unwrap();
        let back_idx = opt.dsm.partition().find("back").unwrap();
        let delta = marginal(&opt, b, back_idx);
        opt.move_to_cluster(b, back_idx).unwrap();
        assert_eq!(full(&opt), before + delta);

        let b = opt.dsm.position_of("b").unwrap();
        let front_idx = opt.dsm.partition().find("front").unwrap();
        let reverse = marginal(&opt, b, front_idx);
        opt.move_to_cluster(b, front_idx).unwrap();

        // Same memberships as at the start, so exactly the starting cost.
        assert_eq!(delta + reverse, 0);
        assert_eq!(full(&opt), before);
        opt.dsm.partition().validate(opt.dsm.len()).unwrap();
    }

    #[test]
    fn test_all_bus_matrix_terminates_unclustered() {
        // Threshold 0 turns every element with any fan-in into a bus; the
        // optimizer must still terminate, leaving the singletons alone.
        let dsm = dsm_with_edges(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("a", "c"), ("b", "a"), ("c", "b")],
        );
        let options = ClusterOptions {
            vertical_bus_threshold: 0.0,
            ..ClusterOptions::default()
        };
        let result = cluster_seeded(&dsm, &options, 1).unwrap();
        assert_eq!(result.vertical_buses.len(), 3);
        assert_eq!(result.dsm.partition().len(), 3);
    }

    #[test]
    fn test_empty_matrix_short_circuits() {
        let dsm: Dsm<Dependency> = Dsm::empty(vec![]).unwrap();
        let result = cluster_seeded(&dsm, &ClusterOptions::default(), 0).unwrap();
        assert_eq!(result.clustered_cost, 0);
        assert_eq!(result.relative_clustered_cost, 0.0);
        assert!(result.dsm.partition().is_empty());
    }

    #[test]
    fn test_oversized_lambda_rejected_before_optimizing() {
        // 4 elements with lambda 65 cannot be costed in u128; the run must
        // fail cleanly instead of wrapping mid-search.
        let dsm = dsm_with_edges(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        let options = ClusterOptions {
            vertical_bus_threshold: 1.0,
            lambda: 65,
        };
        assert!(matches!(
            cluster_seeded(&dsm, &options, 0),
            Err(DsmError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_invalid_lambda_rejected() {
        let dsm = dsm_with_edges(&["a", "b"], &[("a", "b")]);
        let options = ClusterOptions {
            lambda: 0,
            ..ClusterOptions::default()
        };
        assert!(matches!(
            cluster_seeded(&dsm, &options, 0),
            Err(DsmError::InvalidArgument(_))
        ));
    }
}
