use std::collections::BTreeSet;

use crate::error::{DsmError, Result};
use crate::matrix::Dsm;
use crate::value::CellValue;

/// Detect vertical buses: elements whose incoming-dependency fan-in ratio
/// exceeds `threshold`.
///
/// A vertical bus is a globally shared utility (logging, base types) that
/// nearly everything depends on. Buses are exempt from cluster cost
/// accounting and from being moved by the optimizer, since they would
/// otherwise dominate the cost of every clustering. A threshold of 1.0
/// disables detection; anything outside `[0, 1]` is rejected.
pub fn vertical_buses<V: CellValue>(dsm: &Dsm<V>, threshold: f64) -> Result<BTreeSet<String>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(DsmError::InvalidArgument(format!(
            "vertical bus threshold {threshold} outside [0, 1]"
        )));
    }
    let n = dsm.len();
    let mut buses = BTreeSet::new();
    for col in 0..n {
        let fan_in = (0..n).filter(|&row| dsm.cell(row, col).is_set()).count();
        if fan_in as f64 / n as f64 > threshold {
            buses.insert(dsm.names()[col].clone());
        }
    }
    Ok(buses)
}
