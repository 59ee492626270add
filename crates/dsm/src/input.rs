use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dsm_core::value::Dependency;
use dsm_core::Dsm;

/// On-disk dependency graph: an element list plus directed (from, to)
/// pairs. Produced by whatever extracted the dependencies; this tool only
/// consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub elements: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<(String, String)>,
}

/// Load a graph file and populate a boolean matrix from it.
pub fn load_graph(path: &Path) -> Result<Dsm<Dependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let graph: GraphFile = serde_json::from_str(&content)
        .with_context(|| format!("invalid graph file {}", path.display()))?;
    build_dsm(&graph).with_context(|| format!("inconsistent graph in {}", path.display()))
}

pub fn build_dsm(graph: &GraphFile) -> Result<Dsm<Dependency>> {
    let mut dsm = Dsm::empty(graph.elements.clone())?;
    for (from, to) in &graph.dependencies {
        dsm.set_by_name(from, to, Dependency::YES)
            .with_context(|| format!("dependency {from} -> {to}"))?;
    }
    Ok(dsm)
}
