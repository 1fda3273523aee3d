// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Two-dimensional erasure-coded block, as known by one node.
//!
//! The block is a bit matrix: bit `(row, col)` is set iff the node holds that
//! segment. Bits are only ever set, never cleared. A line (row or column)
//! can be repaired once at least `K` of its segments are known, where `K` is
//! the line's threshold. No actual decoding is performed.

use bitvec::vec::BitVec;
use rand::Rng;
use rand::seq::index;

use crate::shape::FailureModel;

/// Bit matrix of known segments, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    row_count: usize,
    col_count: usize,
    /// Segments needed to repair a row.
    row_k: usize,
    /// Segments needed to repair a column.
    col_k: usize,
    data: BitVec,
}

impl Block {
    /// Creates an empty block of the given dimensions and repair thresholds.
    pub fn new(row_count: usize, col_count: usize, row_k: usize, col_k: usize) -> Self {
        Self {
            row_count,
            col_count,
            row_k,
            col_k,
            data: BitVec::repeat(false, row_count * col_count),
        }
    }

    /// Fills the block as the proposer would, releasing only part of it.
    ///
    /// `failure_rate_pct` only matters for [`FailureModel::Random`] and
    /// [`FailureModel::Sequential`], all other models are fixed patterns
    /// derived from the repair thresholds.
    pub fn init_with_failures(
        &mut self,
        model: FailureModel,
        failure_rate_pct: u32,
        rng: &mut impl Rng,
    ) {
        let total = self.data.len();
        let kept = total * 100_usize.saturating_sub(failure_rate_pct as usize) / 100;
        match model {
            FailureModel::Random => {
                for i in index::sample(rng, total, kept) {
                    self.data.set(i, true);
                }
            }
            FailureModel::Sequential => self.data[..kept].fill(true),
            _ => {
                let (row_k, col_k, cols) = (self.row_k, self.col_k, self.col_count);
                let keep = |r: usize, c: usize| match model {
                    FailureModel::Mep => r > col_k || c > row_k,
                    FailureModel::MepPlusOne => r > col_k || c > row_k || (r == 0 && c == 0),
                    FailureModel::Dep => (r + c) % cols > col_k,
                    FailureModel::DepPlusOne => (r + c) % cols > col_k || (r == 0 && c == 0),
                    FailureModel::Mrep => r < col_k || c < row_k,
                    FailureModel::MrepMinusOne => (r < col_k || c < row_k) && (r, c) != (0, 0),
                    FailureModel::Random | FailureModel::Sequential => unreachable!(),
                };
                for r in 0..self.row_count {
                    for c in 0..self.col_count {
                        if keep(r, c) {
                            self.set(r, c);
                        }
                    }
                }
            }
        }
    }

    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    pub const fn col_count(&self) -> usize {
        self.col_count
    }

    /// Returns `true` iff the segment at `(row, col)` is known.
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[row * self.col_count + col]
    }

    /// Marks the segment at `(row, col)` as known.
    pub fn set(&mut self, row: usize, col: usize) {
        self.data.set(row * self.col_count + col, true);
    }

    /// Returns a copy of row `id`.
    pub fn row(&self, id: usize) -> BitVec {
        let start = id * self.col_count;
        self.data[start..start + self.col_count].to_bitvec()
    }

    /// Returns a copy of column `id`.
    pub fn column(&self, id: usize) -> BitVec {
        (0..self.row_count)
            .map(|r| self.data[r * self.col_count + id])
            .collect()
    }

    /// Adds all segments set in `line` to row `id`.
    pub fn merge_row(&mut self, id: usize, line: &BitVec) {
        let start = id * self.col_count;
        for c in line.iter_ones() {
            self.data.set(start + c, true);
        }
    }

    /// Adds all segments set in `line` to column `id`.
    pub fn merge_column(&mut self, id: usize, line: &BitVec) {
        for r in line.iter_ones() {
            self.data.set(r * self.col_count + id, true);
        }
    }

    /// Adds all segments known in `other` to this block.
    pub fn merge(&mut self, other: &Block) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for i in other.data.iter_ones() {
            self.data.set(i, true);
        }
    }

    /// Tries to repair row `id`.
    ///
    /// Returns the segments that were newly set and how many there were.
    /// If fewer than the row threshold are known, nothing changes and an
    /// all-zero line is returned.
    pub fn repair_row(&mut self, id: usize) -> (BitVec, usize) {
        let line = self.row(id);
        if line.count_ones() < self.row_k {
            return (BitVec::repeat(false, self.col_count), 0);
        }
        let repaired = !line;
        let count = repaired.count_ones();
        let start = id * self.col_count;
        self.data[start..start + self.col_count].fill(true);
        (repaired, count)
    }

    /// Tries to repair column `id`.
    ///
    /// Same as [`Block::repair_row`], with the column threshold.
    pub fn repair_column(&mut self, id: usize) -> (BitVec, usize) {
        let line = self.column(id);
        if line.count_ones() < self.col_k {
            return (BitVec::repeat(false, self.row_count), 0);
        }
        let repaired = !line;
        let count = repaired.count_ones();
        for r in repaired.iter_ones() {
            self.set(r, id);
        }
        (repaired, count)
    }

    /// Number of known segments.
    pub fn count_ones(&self) -> usize {
        self.data.count_ones()
    }

    /// Number of unknown segments.
    pub fn count_missing(&self) -> usize {
        self.data.count_zeros()
    }

    /// Returns `true` iff every segment is known.
    pub fn is_complete(&self) -> bool {
        self.data.all()
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.row_count {
            for c in 0..self.col_count {
                write!(f, "{}", if self.get(r, c) { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn proposer_block(model: FailureModel, rate: u32) -> Block {
        let mut block = Block::new(16, 16, 8, 8);
        let mut rng = StdRng::seed_from_u64(42);
        block.init_with_failures(model, rate, &mut rng);
        block
    }

    /// Repairs rows and columns until nothing changes anymore.
    fn repair_to_fixpoint(block: &mut Block) {
        loop {
            let mut repaired = 0;
            for id in 0..block.row_count() {
                repaired += block.repair_row(id).1;
            }
            for id in 0..block.col_count() {
                repaired += block.repair_column(id).1;
            }
            if repaired == 0 {
                return;
            }
        }
    }

    #[test]
    fn get_set() {
        let mut block = Block::new(4, 6, 2, 3);
        assert!(!block.get(3, 5));
        block.set(3, 5);
        assert!(block.get(3, 5));
        assert_eq!(block.count_ones(), 1);
        assert_eq!(block.count_missing(), 23);
        assert_eq!(block.row(3).iter_ones().collect::<Vec<_>>(), vec![5]);
        assert_eq!(block.column(5).iter_ones().collect::<Vec<_>>(), vec![3]);
        assert_eq!(block.row(3).len(), 6);
        assert_eq!(block.column(5).len(), 4);
    }

    #[test]
    fn merge_lines() {
        let mut block = Block::new(4, 4, 2, 2);
        let line: BitVec = [true, false, true, false].into_iter().collect();
        block.merge_row(1, &line);
        block.merge_column(3, &line);
        assert!(block.get(1, 0) && block.get(1, 2));
        assert!(block.get(0, 3) && block.get(2, 3));
        assert_eq!(block.count_ones(), 4);
    }

    #[test]
    fn merge_commutative_idempotent() {
        let a = proposer_block(FailureModel::Random, 60);
        let mut b = Block::new(16, 16, 8, 8);
        let mut rng = StdRng::seed_from_u64(7);
        b.init_with_failures(FailureModel::Random, 70, &mut rng);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab, ba);

        let mut aa = a.clone();
        aa.merge(&a);
        assert_eq!(aa, a);

        assert!(ab.count_ones() >= a.count_ones().max(b.count_ones()));
    }

    #[test]
    fn repair_threshold() {
        let mut block = Block::new(8, 8, 4, 4);
        for c in 0..3 {
            block.set(2, c);
        }
        let (repaired, count) = block.repair_row(2);
        assert_eq!(count, 0);
        assert!(repaired.not_any());
        assert_eq!(block.count_ones(), 3);

        block.set(2, 7);
        let (repaired, count) = block.repair_row(2);
        assert_eq!(count, 4);
        assert_eq!(repaired.iter_ones().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
        assert!(block.row(2).all());

        // full row cannot be repaired again
        assert_eq!(block.repair_row(2).1, 0);
    }

    #[test]
    fn repair_column_uses_column_threshold() {
        let mut block = Block::new(8, 4, 2, 6);
        for r in 0..5 {
            block.set(r, 1);
        }
        assert_eq!(block.repair_column(1).1, 0);
        block.set(7, 1);
        let (repaired, count) = block.repair_column(1);
        assert_eq!(count, 2);
        assert_eq!(repaired.iter_ones().collect::<Vec<_>>(), vec![5, 6]);
        assert!(block.column(1).all());
    }

    #[test]
    fn threshold_above_line_length_never_repairs() {
        let mut block = Block::new(4, 4, 5, 5);
        block.init_with_failures(FailureModel::Random, 0, &mut StdRng::seed_from_u64(0));
        let mut empty = Block::new(4, 4, 5, 5);
        empty.set(0, 0);
        assert_eq!(empty.repair_row(0).1, 0);
        assert_eq!(empty.repair_column(0).1, 0);
        assert!(block.is_complete());
    }

    #[test]
    fn random_and_sequential_sizes() {
        let block = proposer_block(FailureModel::Random, 25);
        assert_eq!(block.count_ones(), 192);
        let block = proposer_block(FailureModel::Sequential, 25);
        assert_eq!(block.count_ones(), 192);
        assert!(block.row(11).all());
        assert!(block.row(12).not_any());
        let block = proposer_block(FailureModel::Random, 100);
        assert_eq!(block.count_ones(), 0);
        let block = proposer_block(FailureModel::Random, 0);
        assert!(block.is_complete());
    }

    #[test]
    fn pattern_sizes() {
        // 9x9 corner erased
        assert_eq!(proposer_block(FailureModel::Mep, 0).count_ones(), 256 - 81);
        assert_eq!(proposer_block(FailureModel::MepPlusOne, 0).count_ones(), 256 - 80);
        // 7 surviving diagonals
        assert_eq!(proposer_block(FailureModel::Dep, 0).count_ones(), 7 * 16);
        assert_eq!(proposer_block(FailureModel::DepPlusOne, 0).count_ones(), 7 * 16 + 1);
        // 8x8 quadrant erased
        assert_eq!(proposer_block(FailureModel::Mrep, 0).count_ones(), 256 - 64);
        assert_eq!(proposer_block(FailureModel::MrepMinusOne, 0).count_ones(), 256 - 65);
    }

    #[test]
    fn pattern_recoverability() {
        let mut block = proposer_block(FailureModel::Mep, 0);
        repair_to_fixpoint(&mut block);
        assert!(!block.is_complete());

        let mut block = proposer_block(FailureModel::MepPlusOne, 0);
        repair_to_fixpoint(&mut block);
        assert!(block.is_complete());

        let mut block = proposer_block(FailureModel::Mrep, 0);
        repair_to_fixpoint(&mut block);
        assert!(block.is_complete());

        let mut block = proposer_block(FailureModel::Dep, 0);
        repair_to_fixpoint(&mut block);
        assert!(!block.is_complete());
    }
}
