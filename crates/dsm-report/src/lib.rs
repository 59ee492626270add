pub mod json;
pub mod svg;
pub mod text;

pub use json::{AnalysisSummary, ClusterSummary};
