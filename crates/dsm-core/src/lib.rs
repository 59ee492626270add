pub mod bus;
pub mod change;
pub mod cluster;
pub mod cost;
pub mod error;
pub mod matrix;
pub mod optimize;
pub mod reachability;
pub mod value;

pub use bus::vertical_buses;
pub use change::change_ratio;
pub use cluster::{Cluster, Partition};
pub use cost::{CostModel, DEFAULT_LAMBDA};
pub use error::{DsmError, Result};
pub use matrix::Dsm;
pub use optimize::{cluster_seeded, ClusterOptions, ClusteredCostResult};
pub use reachability::propagation_cost;
pub use value::{CellValue, Dependency};
