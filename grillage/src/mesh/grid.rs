//! Explicit (i, j) -> node tag index of a structured grid

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::elements::NodeTag;
use crate::error::{GrillageError, GrillageResult};

/// Bijection between grid positions and node tags.
///
/// Row `i` runs along the span (transverse grid lines), column `j` across the
/// width (longitudinal grid lines). Tags are stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridIndex {
    rows: usize,
    cols: usize,
    tags: Vec<NodeTag>,
    #[serde(skip)]
    positions: BTreeMap<NodeTag, (usize, usize)>,
}

impl GridIndex {
    /// Build from row-major tags and check the bijection
    pub fn new(rows: usize, cols: usize, tags: Vec<NodeTag>) -> GrillageResult<Self> {
        let positions = tags
            .iter()
            .enumerate()
            .map(|(k, &tag)| (tag, (k / cols.max(1), k % cols.max(1))))
            .collect();
        let index = Self {
            rows,
            cols,
            tags,
            positions,
        };
        index.verify()?;
        Ok(index)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag of the node at row `i`, column `j`
    pub fn get(&self, i: usize, j: usize) -> Option<NodeTag> {
        if i < self.rows && j < self.cols {
            self.tags.get(i * self.cols + j).copied()
        } else {
            None
        }
    }

    /// Grid position of a node tag
    pub fn position_of(&self, tag: NodeTag) -> Option<(usize, usize)> {
        self.positions.get(&tag).copied()
    }

    /// All tags in row-major order
    pub fn tags(&self) -> &[NodeTag] {
        &self.tags
    }

    /// Tags of row `i`, ascending j
    pub fn row(&self, i: usize) -> Option<&[NodeTag]> {
        (i < self.rows).then(|| &self.tags[i * self.cols..(i + 1) * self.cols])
    }

    /// Tags of column `j`, ascending i
    pub fn column(&self, j: usize) -> Vec<NodeTag> {
        (0..self.rows).filter_map(|i| self.get(i, j)).collect()
    }

    /// Check that every (i, j) maps to exactly one tag and back
    pub fn verify(&self) -> GrillageResult<()> {
        if self.rows == 0 || self.cols == 0 || self.tags.len() != self.rows * self.cols {
            return Err(GrillageError::InvariantViolation(format!(
                "grid index holds {} tags for a {}x{} grid",
                self.tags.len(),
                self.rows,
                self.cols
            )));
        }
        let unique: BTreeSet<_> = self.tags.iter().collect();
        if unique.len() != self.tags.len() {
            return Err(GrillageError::InvariantViolation(
                "grid index maps two positions to the same node".to_string(),
            ));
        }
        for i in 0..self.rows {
            for j in 0..self.cols {
                let tag = self.tags[i * self.cols + j];
                if self.positions.get(&tag) != Some(&(i, j)) {
                    return Err(GrillageError::InvariantViolation(format!(
                        "node {} is not indexed back to ({}, {})",
                        tag, i, j
                    )));
                }
            }
        }
        Ok(())
    }
}
