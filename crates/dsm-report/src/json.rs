use serde::{Deserialize, Serialize};

use dsm_core::optimize::ClusteredCostResult;
use dsm_core::value::CellValue;

/// One cluster of the final ordering, with the elements it covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub elements: Vec<String>,
}

/// Serializable view of an analysis run.
///
/// This carries exactly what downstream consumers may rely on: the ordered
/// element list, the named cluster intervals, the vertical bus set, and the
/// scalar metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub elements: Vec<String>,
    pub dependency_count: usize,
    pub clusters: Vec<ClusterSummary>,
    pub vertical_buses: Vec<String>,
    pub clustered_cost: u64,
    pub relative_clustered_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation_cost: Option<f64>,
}

impl AnalysisSummary {
    pub fn from_result<V: CellValue>(result: &ClusteredCostResult<V>) -> Self {
        let dsm = &result.dsm;
        let n = dsm.len();
        let mut dependency_count = 0usize;
        for i in 0..n {
            for j in 0..n {
                if i != j && dsm.get(i, j).is_ok_and(|v| v.is_set()) {
                    dependency_count += 1;
                }
            }
        }
        let clusters = dsm
            .partition()
            .iter()
            .map(|c| ClusterSummary {
                name: c.name.clone(),
                start: c.start,
                end: c.end,
                elements: dsm.names()[c.start..c.end].to_vec(),
            })
            .collect();
        Self {
            elements: dsm.names().to_vec(),
            dependency_count,
            clusters,
            vertical_buses: result.vertical_buses.iter().cloned().collect(),
            clustered_cost: result.clustered_cost,
            relative_clustered_cost: result.relative_clustered_cost,
            propagation_cost: None,
        }
    }

    pub fn with_propagation_cost(mut self, cost: f64) -> Self {
        self.propagation_cost = Some(cost);
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
