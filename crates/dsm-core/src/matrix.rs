use std::collections::HashMap;

use crate::cluster::Partition;
use crate::error::{DsmError, Result};
use crate::value::CellValue;

/// A design structure matrix: a square relation over named elements.
///
/// Cells are stored row-major and indexed by *position*, not by name; the
/// `names` vector (position -> name) and `index` map (name -> position) are
/// mutual inverses and every reordering operation updates both. Cell
/// `(i, j)` set means the element at row `i` depends on the element at
/// column `j`.
#[derive(Debug, Clone)]
pub struct Dsm<V> {
    names: Vec<String>,
    index: HashMap<String, usize>,
    cells: Vec<V>,
    partition: Partition,
}

impl<V: CellValue> Dsm<V> {
    /// Build a matrix from an ordered element list and row-major cells.
    /// Starts with every element in its own singleton cluster.
    pub fn new(names: Vec<String>, cells: Vec<V>) -> Result<Self> {
        let n = names.len();
        if cells.len() != n * n {
            return Err(DsmError::InvalidState(format!(
                "{} cells do not form a {n}x{n} matrix",
                cells.len()
            )));
        }
        let mut index = HashMap::with_capacity(n);
        for (pos, name) in names.iter().enumerate() {
            if index.insert(name.clone(), pos).is_some() {
                return Err(DsmError::InvalidState(format!(
                    "duplicate element name '{name}'"
                )));
            }
        }
        Ok(Self {
            partition: Partition::singletons(n),
            names,
            index,
            cells,
        })
    }

    /// An all-zero matrix over the given elements.
    pub fn empty(names: Vec<String>) -> Result<Self> {
        let n = names.len();
        Self::new(names, vec![V::zero(); n * n])
    }

    /// Number of elements (the matrix is `len x len`).
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Element names in current position order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name_at(&self, pos: usize) -> Result<&str> {
        self.check_pos(pos)?;
        Ok(&self.names[pos])
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<&V> {
        self.check_pos(row)?;
        self.check_pos(col)?;
        Ok(self.cell(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: V) -> Result<()> {
        self.check_pos(row)?;
        self.check_pos(col)?;
        let n = self.len();
        self.cells[row * n + col] = value;
        Ok(())
    }

    /// Set a cell addressed by element names.
    pub fn set_by_name(&mut self, from: &str, to: &str, value: V) -> Result<()> {
        let row = self
            .position_of(from)
            .ok_or_else(|| DsmError::InvalidArgument(format!("unknown element '{from}'")))?;
        let col = self
            .position_of(to)
            .ok_or_else(|| DsmError::InvalidArgument(format!("unknown element '{to}'")))?;
        self.set(row, col, value)
    }

    /// Exchange two positions: rows, columns, and name bindings in one
    /// atomic step. Self-inverse. No-op on matrices with fewer than two
    /// elements.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let n = self.len();
        if n <= 1 {
            return Ok(());
        }
        self.check_pos(a)?;
        self.check_pos(b)?;
        if a == b {
            return Ok(());
        }
        for k in 0..n {
            self.cells.swap(a * n + k, b * n + k);
        }
        for k in 0..n {
            self.cells.swap(k * n + a, k * n + b);
        }
        self.names.swap(a, b);
        self.index.insert(self.names[a].clone(), a);
        self.index.insert(self.names[b].clone(), b);
        Ok(())
    }

    /// Relocate the element at `from` to position `to` through adjacent
    /// swaps, closing the gap. Elements other than the moved one keep their
    /// relative order.
    pub fn shift(&mut self, from: usize, to: usize) -> Result<()> {
        if self.len() <= 1 {
            return Ok(());
        }
        self.check_pos(from)?;
        self.check_pos(to)?;
        if from < to {
            for pos in from..to {
                self.swap(pos, pos + 1)?;
            }
        } else {
            for pos in (to..from).rev() {
                self.swap(pos + 1, pos)?;
            }
        }
        Ok(())
    }

    /// Current cluster partition.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub(crate) fn partition_mut(&mut self) -> &mut Partition {
        &mut self.partition
    }

    /// Replace the cluster partition. The new partition must cover exactly
    /// `[0, len)`.
    pub fn set_partition(&mut self, partition: Partition) -> Result<()> {
        partition.validate(self.len())?;
        self.partition = partition;
        Ok(())
    }

    /// Discard the cluster partition entirely.
    pub fn reset_clusters(&mut self) {
        self.partition.clear();
    }

    /// Re-initialize to one singleton cluster per element.
    pub fn init_singleton_clusters(&mut self) {
        self.partition = Partition::singletons(self.len());
    }

    /// Unchecked cell access for the analysis hot loops.
    pub(crate) fn cell(&self, row: usize, col: usize) -> &V {
        debug_assert!(row < self.len() && col < self.len());
        &self.cells[row * self.len() + col]
    }

    fn check_pos(&self, pos: usize) -> Result<()> {
        if pos < self.len() {
            Ok(())
        } else {
            Err(DsmError::OutOfRange {
                index: pos,
                len: self.len(),
            })
        }
    }
}
