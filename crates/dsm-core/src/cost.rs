use std::collections::BTreeSet;

use crate::error::{DsmError, Result};
use crate::matrix::Dsm;
use crate::value::CellValue;

/// Default cluster size exponent.
pub const DEFAULT_LAMBDA: u32 = 2;

/// Integer power used throughout the cost accounting. Bases stay within
/// `N` and exponents within `lambda`, which `total_cost_raw` proves
/// representable before any term is built.
pub(crate) fn ipow(base: usize, exp: u32) -> u128 {
    (base as u128).pow(exp)
}

/// The dependency cost model over a clustered ordering.
///
/// For every off-diagonal cell `(i, j)`:
/// - the column element is a vertical bus: cost is the bare weight,
/// - same cluster: weight times `size(cluster)^lambda`,
/// - different clusters: weight times `N^lambda`.
///
/// Within-cluster dependencies are cheap (they scale with the local
/// neighborhood), cross-cluster dependencies cost as if the whole system
/// were one cluster, and bus columns are waived so that globally shared
/// utilities do not dominate the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    lambda: u32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl CostModel {
    pub fn new(lambda: u32) -> Result<Self> {
        if lambda == 0 {
            return Err(DsmError::InvalidArgument(
                "cluster size exponent lambda must be positive".to_string(),
            ));
        }
        Ok(Self { lambda })
    }

    pub fn lambda(&self) -> u32 {
        self.lambda
    }

    /// Total clustered cost, summed over all off-diagonal cells.
    pub fn clustered_cost<V: CellValue>(
        &self,
        dsm: &Dsm<V>,
        buses: &BTreeSet<String>,
    ) -> Result<u64> {
        let total = self.total_cost_raw(dsm, buses)?;
        u64::try_from(total).map_err(|_| {
            DsmError::InvalidArgument(format!(
                "clustered cost exceeds u64 with lambda {}",
                self.lambda
            ))
        })
    }

    /// Clustered cost normalized into `[0, 1]` for cross-system comparison.
    ///
    /// Every term of the total is divided by `N^(2*lambda)`; the sum is kept
    /// as an exact integer numerator over that single denominator and only
    /// converted to floating point at the end, so large matrices lose no
    /// precision to intermediate rounding.
    pub fn relative_clustered_cost<V: CellValue>(
        &self,
        dsm: &Dsm<V>,
        buses: &BTreeSet<String>,
    ) -> Result<f64> {
        let n = dsm.len();
        if n <= 1 {
            return Ok(0.0);
        }
        let numerator = self.total_cost_raw(dsm, buses)?;
        let denominator = (n as f64).powi(2 * self.lambda as i32);
        Ok(numerator as f64 / denominator)
    }

    /// Exact integer cost sum shared by the absolute and relative metrics.
    pub(crate) fn total_cost_raw<V: CellValue>(
        &self,
        dsm: &Dsm<V>,
        buses: &BTreeSet<String>,
    ) -> Result<u128> {
        let n = dsm.len();
        if n <= 1 {
            return Ok(0);
        }
        let (cluster_ids, sizes) = cluster_index(dsm)?;
        let is_bus: Vec<bool> = dsm.names().iter().map(|name| buses.contains(name)).collect();

        let mut weight_sum: u128 = 0;
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    weight_sum += dsm.cell(i, j).weight() as u128;
                }
            }
        }
        // Admitting lambda here bounds every later term, running total, and
        // move delta: each is a signed sum of at most four magnitudes of
        // weight_sum * N^lambda.
        let in_range = (n as u128)
            .checked_pow(self.lambda)
            .and_then(|p| p.checked_mul(weight_sum.max(1)))
            .and_then(|m| m.checked_mul(4))
            .is_some_and(|m| m <= i128::MAX as u128);
        if !in_range {
            return Err(DsmError::InvalidArgument(format!(
                "lambda {} overflows the cost model for {n} elements",
                self.lambda
            )));
        }
        let system_cost = ipow(n, self.lambda);

        let mut total: u128 = 0;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let w = dsm.cell(i, j).weight() as u128;
                if w == 0 {
                    continue;
                }
                total += if is_bus[j] {
                    w
                } else if cluster_ids[i] == cluster_ids[j] {
                    w * ipow(sizes[i], self.lambda)
                } else {
                    w * system_cost
                };
            }
        }
        Ok(total)
    }
}

/// Per-position cluster id and cluster size, resolved once per pass.
pub(crate) fn cluster_index<V: CellValue>(dsm: &Dsm<V>) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = dsm.len();
    let mut ids = vec![0usize; n];
    let mut sizes = vec![0usize; n];
    for pos in 0..n {
        let idx = dsm.partition().cluster_of(pos).ok_or_else(|| {
            DsmError::InvalidState(format!("cluster partition does not cover position {pos}"))
        })?;
        ids[pos] = idx;
        sizes[pos] = dsm
            .partition()
            .get(idx)
            .map(|c| c.len())
            .unwrap_or_default();
    }
    Ok((ids, sizes))
}
