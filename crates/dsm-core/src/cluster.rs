use serde::{Deserialize, Serialize};

use crate::error::{DsmError, Result};

/// A named, contiguous run of matrix positions, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }

    /// Positions covered by this cluster.
    pub fn positions(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// The cluster intervals of a matrix ordering.
///
/// After initialization the clusters form an exact partition of `[0, n)`:
/// sorted by start, no gaps, no overlaps. Every mutation below keeps that
/// invariant; `validate` checks it explicitly for tests and callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    clusters: Vec<Cluster>,
}

impl Partition {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a partition from explicit clusters, e.g. when reloading a
    /// previously clustered ordering. Clusters are sorted by start and must
    /// tile `[0, end-of-last)` exactly.
    pub fn from_clusters(mut clusters: Vec<Cluster>) -> Result<Self> {
        clusters.sort_by_key(|c| c.start);
        let partition = Self { clusters };
        let n = partition.clusters.last().map_or(0, |c| c.end);
        partition.validate(n)?;
        Ok(partition)
    }

    /// One singleton cluster per position, the initial optimizer state.
    pub fn singletons(n: usize) -> Self {
        let clusters = (0..n)
            .map(|i| Cluster {
                name: format!("cluster_{i}"),
                start: i,
                end: i + 1,
            })
            .collect();
        Self { clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Cluster> {
        self.clusters.get(idx)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.clusters.iter().position(|c| c.name == name)
    }

    /// Index of the cluster covering `pos`, if the partition covers it.
    pub fn cluster_of(&self, pos: usize) -> Option<usize> {
        // Clusters are sorted by start, so the candidate is the last one
        // starting at or before pos.
        let idx = self.clusters.partition_point(|c| c.start <= pos);
        if idx == 0 {
            return None;
        }
        let candidate = idx - 1;
        self.clusters[candidate].contains(pos).then_some(candidate)
    }

    /// Check the exact-partition invariant over `[0, n)`.
    pub fn validate(&self, n: usize) -> Result<()> {
        if n == 0 {
            return if self.clusters.is_empty() {
                Ok(())
            } else {
                Err(DsmError::InvalidState(
                    "empty matrix cannot carry clusters".to_string(),
                ))
            };
        }
        let mut expected_start = 0usize;
        for cluster in &self.clusters {
            if cluster.start != expected_start {
                return Err(DsmError::InvalidState(format!(
                    "cluster '{}' starts at {} but {} expected",
                    cluster.name, cluster.start, expected_start
                )));
            }
            if cluster.is_empty() {
                return Err(DsmError::InvalidState(format!(
                    "cluster '{}' is empty",
                    cluster.name
                )));
            }
            expected_start = cluster.end;
        }
        if expected_start != n {
            return Err(DsmError::InvalidState(format!(
                "clusters cover [0, {expected_start}) but the matrix has {n} positions"
            )));
        }
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.clusters.clear();
    }

    /// Rebalance interval bounds for moving one element from cluster `src`
    /// into cluster `tgt`, ahead of the physical relocation.
    ///
    /// Clusters strictly between the two shift by one position to close the
    /// gap; the target grows by one, the source shrinks by one. Returns the
    /// position the moved element must be shifted to (the new last slot of
    /// the target). The caller removes the source afterwards if it emptied.
    pub(crate) fn rebalance_for_move(&mut self, src: usize, tgt: usize) -> usize {
        let (s_start, s_end) = (self.clusters[src].start, self.clusters[src].end);
        let (t_start, t_end) = (self.clusters[tgt].start, self.clusters[tgt].end);

        if s_start < t_start {
            for c in &mut self.clusters {
                if c.start >= s_end && c.start < t_start {
                    c.start -= 1;
                    c.end -= 1;
                }
            }
            self.clusters[tgt].start -= 1;
            self.clusters[src].end -= 1;
        } else {
            for c in &mut self.clusters {
                if c.start >= t_end && c.start < s_start {
                    c.start += 1;
                    c.end += 1;
                }
            }
            self.clusters[src].start += 1;
            self.clusters[tgt].end += 1;
        }
        self.clusters[tgt].end - 1
    }

    pub(crate) fn remove_if_empty(&mut self, idx: usize) -> bool {
        if self.clusters[idx].is_empty() {
            self.clusters.remove(idx);
            true
        } else {
            false
        }
    }
}
