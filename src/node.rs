// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulated DAS peer.
//!
//! A [`Node`] follows a set of row and column topics (its custody), holds its
//! view of the block, and keeps one [`Neighbor`] per peer per followed line.
//!
//! Each round, a node goes through the following phases, driven by the
//! simulator:
//! - send: push segments to neighbors within the uplink budget, see the
//!   [`scheduler`] module; optionally announce custody, see [`gossip`]
//! - receive: commit segments staged during the send phase of other nodes
//! - repair: restore lines with enough known segments and forward them
//! - stats: roll per-round traffic counters into history

pub mod gossip;
pub mod scheduler;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, trace, warn};
use rand::Rng;
use rand::seq::index;
use serde::Serialize;

use crate::NodeId;
use crate::block::Block;
use crate::config::{Config, NodeBehavior};
use crate::neighbor::{Dim, Neighbor};
use crate::shape::{PROPOSER_CLASS, Shape};

pub use self::scheduler::{Delivery, ShuffleSchedule};

/// Id of the block proposer.
pub const PROPOSER_ID: NodeId = 0;

/// Links of a node on one dimension, keyed by line and then by peer.
pub type Links = BTreeMap<usize, BTreeMap<NodeId, Neighbor>>;

/// Rows and columns sampled by a single validator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Custody {
    pub rows: BTreeSet<usize>,
    pub cols: BTreeSet<usize>,
}

/// Lifetime message and sample counters of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub samples_sent: u64,
    pub samples_received: u64,
    pub rows_restored: u64,
    pub cols_restored: u64,
    pub samples_repaired: u64,
}

/// Per-round traffic of a node, with one history entry per finished round.
#[derive(Clone, Debug, Default)]
pub struct TrafficStats {
    pub tx_in_slot: usize,
    pub rx_in_slot: usize,
    pub rx_dup_in_slot: usize,
    pub tx_per_slot: Vec<usize>,
    pub rx_per_slot: Vec<usize>,
    pub rx_dup_per_slot: Vec<usize>,
}

/// Custody progress of a node, see [`Node::check_status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    /// Known segments over all custody lines.
    pub arrived: usize,
    /// Segments over all custody lines.
    pub expected: usize,
    /// Hosted validators with all of their lines complete.
    pub validated: usize,
}

impl NodeStatus {
    pub const fn is_ready(&self) -> bool {
        self.arrived == self.expected
    }
}

/// A peer in the simulated network.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub proposer: bool,
    pub malicious: bool,
    pub node_class: usize,
    /// Custody of hosted validators.
    pub validators: Vec<Custody>,
    /// Validators per node.
    pub vpn: usize,
    pub row_ids: BTreeSet<usize>,
    pub col_ids: BTreeSet<usize>,
    pub block: Block,
    /// Every segment ever received, including the current round.
    pub(crate) received_block: Block,
    pub(crate) received_queue: VecDeque<(usize, usize)>,
    pub(crate) send_queue: VecDeque<(usize, usize)>,
    pub row_neighbors: Links,
    pub col_neighbors: Links,
    pub behavior: NodeBehavior,
    /// Uplink budget in segments per round.
    pub bw_uplink: usize,
    pub(crate) shuffle_state: Option<ShuffleSchedule>,
    pub counters: Counters,
    pub stats: TrafficStats,
}

impl Node {
    /// Creates the block proposer, which follows every row and column.
    ///
    /// The block itself is only created by [`Node::init_block`], after the
    /// topology is in place.
    pub fn proposer(shape: &Shape, config: &Config) -> Self {
        let mut node = Self::empty(PROPOSER_ID, true, false, PROPOSER_CLASS, shape, config);
        node.row_ids = (0..shape.row_count).collect();
        node.col_ids = (0..shape.col_count).collect();
        node.log_ids();
        node
    }

    /// Creates a regular node and samples its custody.
    pub fn new(
        id: NodeId,
        malicious: bool,
        shape: &Shape,
        config: &Config,
        rng: &mut impl Rng,
    ) -> Self {
        let class = shape.node_class_of(id);
        let mut node = Self::empty(id, false, malicious, class, shape, config);
        node.vpn = shape.class(class).map_or(1, |c| c.validators_per_node);

        if config.validator_based_custody {
            for _ in 0..node.vpn {
                let custody = Custody {
                    rows: sample_lines(rng, shape.row_count, shape.custody_rows)
                        .into_iter()
                        .collect(),
                    cols: sample_lines(rng, shape.col_count, shape.custody_cols)
                        .into_iter()
                        .collect(),
                };
                node.row_ids.extend(&custody.rows);
                node.col_ids.extend(&custody.cols);
                node.validators.push(custody);
            }
        } else {
            let rows = node.sample_custody(rng, Dim::Row, shape.row_count, shape.custody_rows);
            let cols = node.sample_custody(rng, Dim::Column, shape.col_count, shape.custody_cols);
            node.validators = (0..node.vpn)
                .map(|v| Custody {
                    rows: chunk(&rows, v, shape.custody_rows),
                    cols: chunk(&cols, v, shape.custody_cols),
                })
                .collect();
        }
        node.log_ids();
        node
    }

    fn empty(
        id: NodeId,
        proposer: bool,
        malicious: bool,
        node_class: usize,
        shape: &Shape,
        config: &Config,
    ) -> Self {
        let new_block = || {
            Block::new(
                shape.row_count,
                shape.col_count,
                shape.row_count_k,
                shape.col_count_k,
            )
        };
        Self {
            id,
            proposer,
            malicious,
            node_class,
            validators: Vec::new(),
            vpn: 0,
            row_ids: BTreeSet::new(),
            col_ids: BTreeSet::new(),
            block: new_block(),
            received_block: new_block(),
            received_queue: VecDeque::new(),
            send_queue: VecDeque::new(),
            row_neighbors: Links::new(),
            col_neighbors: Links::new(),
            behavior: config.node_behavior(shape, proposer),
            bw_uplink: config.segments_per_step(shape.bw_uplink_of(node_class)),
            shuffle_state: None,
            counters: Counters::default(),
            stats: TrafficStats::default(),
        }
    }

    /// Samples `vpn * per_validator` lines out of `count`.
    ///
    /// Falls back to following all lines if that many do not exist.
    /// Returns the sampled lines in sampling order.
    fn sample_custody(
        &mut self,
        rng: &mut impl Rng,
        dim: Dim,
        count: usize,
        per_validator: usize,
    ) -> Vec<usize> {
        let wanted = self.vpn * per_validator;
        let lines = sample_lines(rng, count, wanted);
        let ids = match dim {
            Dim::Row => &mut self.row_ids,
            Dim::Column => &mut self.col_ids,
        };
        if wanted > count {
            warn!(
                "node {}: {dim:?} custody ({wanted}) larger than number of lines ({count})",
                self.id
            );
            ids.extend(0..count);
        } else {
            ids.extend(&lines);
        }
        lines
    }

    fn log_ids(&self) {
        if self.proposer {
            debug!("node {}: block proposer", self.id);
        } else {
            debug!(
                "node {}: class {}, rows {:?}, columns {:?}",
                self.id, self.node_class, self.row_ids, self.col_ids
            );
        }
    }

    /// Creates the proposer's block, releasing it according to the shape's
    /// failure model.
    pub fn init_block(&mut self, shape: &Shape, rng: &mut impl Rng) {
        if !self.proposer {
            warn!("node {}: only the proposer creates the block", self.id);
            return;
        }
        self.block
            .init_with_failures(shape.failure_model, shape.failure_rate_pct, rng);
        let failures = self.block.count_missing();
        debug!(
            "node {}: block created with {failures} failures ({:.2}%)",
            self.id,
            failures as f64 * 100.0 / shape.segment_count() as f64
        );

        if self.behavior.queue_all_on_init {
            for row in 0..shape.row_count {
                for col in 0..shape.col_count {
                    if !self.block.get(row, col) {
                        continue;
                    }
                    if let Some(links) = self.row_neighbors.get_mut(&row) {
                        for neighbor in links.values_mut() {
                            neighbor.send_queue.push_back(col);
                        }
                    }
                    if let Some(links) = self.col_neighbors.get_mut(&col) {
                        for neighbor in links.values_mut() {
                            neighbor.send_queue.push_back(row);
                        }
                    }
                }
            }
        }
    }

    pub fn links(&self, dim: Dim) -> &Links {
        match dim {
            Dim::Row => &self.row_neighbors,
            Dim::Column => &self.col_neighbors,
        }
    }

    pub fn links_mut(&mut self, dim: Dim) -> &mut Links {
        match dim {
            Dim::Row => &mut self.row_neighbors,
            Dim::Column => &mut self.col_neighbors,
        }
    }

    /// Returns the link to `peer` on the given line, if there is one.
    pub fn neighbor(&self, dim: Dim, line: usize, peer: NodeId) -> Option<&Neighbor> {
        self.links(dim).get(&line).and_then(|l| l.get(&peer))
    }

    pub fn neighbor_mut(&mut self, dim: Dim, line: usize, peer: NodeId) -> Option<&mut Neighbor> {
        self.links_mut(dim)
            .get_mut(&line)
            .and_then(|l| l.get_mut(&peer))
    }

    /// Whether the node still has uplink budget left in this round.
    pub fn has_budget(&self) -> bool {
        self.stats.tx_in_slot < self.bw_uplink
    }

    /// Stages a segment received from `src` during the send phase.
    pub fn receive_segment(&mut self, row: usize, col: usize, src: NodeId) {
        if self.row_ids.contains(&row) {
            if let Some(neighbor) = self.neighbor_mut(Dim::Row, row, src) {
                neighbor.receiving.set(col, true);
            }
        }
        if self.col_ids.contains(&col) {
            if let Some(neighbor) = self.neighbor_mut(Dim::Column, col, src) {
                neighbor.receiving.set(row, true);
            }
        }
        if !self.received_block.get(row, col) {
            trace!("recv new: {src}->{}: {row},{col}", self.id);
            self.received_block.set(row, col);
            self.counters.samples_received += 1;
            if self.behavior.forward_on_receive && self.behavior.queues_enabled() {
                self.received_queue.push_back((row, col));
                self.counters.messages_received += 1;
            }
        } else {
            trace!("recv dup: {src}->{}: {row},{col}", self.id);
            self.stats.rx_dup_in_slot += 1;
        }
        self.stats.rx_in_slot += 1;
    }

    /// Commits everything received this round and queues it for forwarding.
    pub fn receive_rows_columns(&mut self) {
        if self.proposer {
            warn!("node {}: proposer does not receive", self.id);
            return;
        }
        self.block.merge(&self.received_block);
        for links in [&mut self.row_neighbors, &mut self.col_neighbors] {
            for neighbor in links.values_mut().flat_map(|l| l.values_mut()) {
                neighbor.commit_receiving();
            }
        }
        while let Some((row, col)) = self.received_queue.pop_front() {
            self.add_to_send_queue(row, col);
        }
    }

    /// Queues a segment for forwarding.
    ///
    /// The segment is posted on both its row and its column topic, as far
    /// as the node follows them.
    pub fn add_to_send_queue(&mut self, row: usize, col: usize) {
        if self.malicious {
            return;
        }
        if self.behavior.per_node_queue {
            self.send_queue.push_back((row, col));
            self.counters.messages_sent += 1;
        }
        if self.behavior.per_neighbor_queue {
            if self.row_ids.contains(&row) {
                if let Some(links) = self.row_neighbors.get_mut(&row) {
                    for neighbor in links.values_mut() {
                        neighbor.send_queue.push_back(col);
                        self.counters.messages_sent += 1;
                    }
                }
            }
            if self.col_ids.contains(&col) {
                if let Some(links) = self.col_neighbors.get_mut(&col) {
                    for neighbor in links.values_mut() {
                        neighbor.send_queue.push_back(row);
                        self.counters.messages_sent += 1;
                    }
                }
            }
        }
    }

    /// Repairs all custody rows that can be repaired.
    pub fn restore_rows(&mut self) {
        if self.behavior.repair_on_the_fly {
            let ids: Vec<_> = self.row_ids.iter().copied().collect();
            for id in ids {
                self.restore_row(id);
            }
        }
    }

    /// Repairs row `id` if possible and forwards the result.
    ///
    /// Only repaired segments are forwarded, unless whole lines are
    /// forwarded once received.
    pub fn restore_row(&mut self, id: usize) {
        let (repaired, count) = self.block.repair_row(id);
        self.counters.samples_repaired += count as u64;
        if repaired.any() {
            self.counters.rows_restored += 1;
            for (col, bit) in repaired.iter().by_vals().enumerate() {
                if bit || self.behavior.forward_when_line_received {
                    trace!("node {}: repaired {id},{col}", self.id);
                    self.add_to_send_queue(id, col);
                }
            }
        }
    }

    /// Repairs all custody columns that can be repaired.
    pub fn restore_columns(&mut self) {
        if self.behavior.repair_on_the_fly {
            let ids: Vec<_> = self.col_ids.iter().copied().collect();
            for id in ids {
                self.restore_column(id);
            }
        }
    }

    /// Repairs column `id` if possible and forwards the result.
    pub fn restore_column(&mut self, id: usize) {
        let (repaired, count) = self.block.repair_column(id);
        self.counters.samples_repaired += count as u64;
        if repaired.any() {
            self.counters.cols_restored += 1;
            for (row, bit) in repaired.iter().by_vals().enumerate() {
                if bit || self.behavior.forward_when_line_received {
                    trace!("node {}: repaired {row},{id}", self.id);
                    self.add_to_send_queue(row, id);
                }
            }
        }
    }

    /// Moves this round's traffic counters into history.
    pub fn update_stats(&mut self) {
        trace!(
            "node {}: tx {}, rx {}",
            self.id, self.stats.tx_in_slot, self.stats.rx_in_slot
        );
        let stats = &mut self.stats;
        stats.tx_per_slot.push(std::mem::take(&mut stats.tx_in_slot));
        stats.rx_per_slot.push(std::mem::take(&mut stats.rx_in_slot));
        stats
            .rx_dup_per_slot
            .push(std::mem::take(&mut stats.rx_dup_in_slot));
    }

    /// Counts known vs. expected segments over all custody lines.
    ///
    /// A segment in both a custody row and a custody column counts twice.
    pub fn check_status(&self) -> NodeStatus {
        let (arrived, expected) = self.line_status(&self.row_ids, &self.col_ids);
        let validated = self
            .validators
            .iter()
            .filter(|v| {
                let (a, e) = self.line_status(&v.rows, &v.cols);
                a == e
            })
            .count();
        NodeStatus {
            arrived,
            expected,
            validated,
        }
    }

    fn line_status(&self, rows: &BTreeSet<usize>, cols: &BTreeSet<usize>) -> (usize, usize) {
        let mut arrived = 0;
        let mut expected = 0;
        for &id in rows {
            arrived += self.block.row(id).count_ones();
            expected += self.block.col_count();
        }
        for &id in cols {
            arrived += self.block.column(id).count_ones();
            expected += self.block.row_count();
        }
        (arrived, expected)
    }

    /// Logs incomplete custody lines and the state of their links.
    pub fn log_diagnostics(&self) {
        for &id in &self.row_ids {
            let line = self.block.row(id);
            if line.all() {
                continue;
            }
            let links: Vec<String> = self
                .row_neighbors
                .get(&id)
                .into_iter()
                .flat_map(|l| l.values())
                .map(ToString::to_string)
                .collect();
            debug!(
                "node {}: row {id} incomplete ({}/{}), links {links:?}",
                self.id,
                line.count_ones(),
                line.len(),
            );
        }
        for &id in &self.col_ids {
            let line = self.block.column(id);
            if line.all() {
                continue;
            }
            let links: Vec<String> = self
                .col_neighbors
                .get(&id)
                .into_iter()
                .flat_map(|l| l.values())
                .map(ToString::to_string)
                .collect();
            debug!(
                "node {}: column {id} incomplete ({}/{}), links {links:?}",
                self.id,
                line.count_ones(),
                line.len(),
            );
        }
    }
}

/// Samples up to `amount` distinct lines out of `count`, in random order.
fn sample_lines(rng: &mut impl Rng, count: usize, amount: usize) -> Vec<usize> {
    index::sample(rng, count, amount.min(count)).into_vec()
}

/// Returns the `v`-th chunk of `size` lines, wrapping around.
///
/// Chunks are never shorter than `size`, unless there are fewer lines.
fn chunk(lines: &[usize], v: usize, size: usize) -> BTreeSet<usize> {
    lines
        .iter()
        .cycle()
        .skip(v * size)
        .take(size.min(lines.len()))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::shape::NodeClass;
    use crate::test_utils::{connect, small_shape};

    #[test]
    fn custody_sampling() {
        let shape = small_shape().with_bandwidth(
            100,
            vec![NodeClass::new(1, 1, 10), NodeClass::new(1, 3, 10)],
        );
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(1);

        let node = Node::new(1, false, &shape, &config, &mut rng);
        assert_eq!(node.node_class, 1);
        assert_eq!(node.vpn, 1);
        assert_eq!(node.row_ids.len(), 2);
        assert_eq!(node.col_ids.len(), 2);
        assert_eq!(node.validators.len(), 1);
        assert_eq!(node.validators[0].rows, node.row_ids);

        let node = Node::new(49, false, &shape, &config, &mut rng);
        assert_eq!(node.node_class, 2);
        assert_eq!(node.vpn, 3);
        assert_eq!(node.row_ids.len(), 6);
        assert_eq!(node.col_ids.len(), 6);
        let union: BTreeSet<_> = node.validators.iter().flat_map(|v| v.rows.clone()).collect();
        assert_eq!(union, node.row_ids);
    }

    #[test]
    fn custody_fallback_to_all_lines() {
        let shape = small_shape().with_custody(10, 1);
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(1);
        let shape = shape.with_bandwidth(100, vec![NodeClass::new(1, 2, 10)]);
        let node = Node::new(1, false, &shape, &config, &mut rng);
        assert_eq!(node.row_ids.len(), 16);
        assert_eq!(node.col_ids.len(), 2);
    }

    #[test]
    fn over_custody_validators_not_ready() {
        let shape = small_shape()
            .with_custody(10, 10)
            .with_bandwidth(100, vec![NodeClass::new(1, 3, 10)]);
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(8);
        let node = Node::new(1, false, &shape, &config, &mut rng);
        assert_eq!(node.row_ids.len(), 16);
        assert_eq!(node.validators.len(), 3);
        for v in &node.validators {
            assert_eq!(v.rows.len(), 10);
            assert_eq!(v.cols.len(), 10);
        }
        let status = node.check_status();
        assert_eq!(status.arrived, 0);
        assert_eq!(status.validated, 0);
    }

    #[test]
    fn validator_based_custody() {
        let shape = small_shape().with_bandwidth(100, vec![NodeClass::new(1, 4, 10)]);
        let config = Config {
            validator_based_custody: true,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let node = Node::new(1, false, &shape, &config, &mut rng);
        assert_eq!(node.validators.len(), 4);
        assert!(node.row_ids.len() <= 8);
        for v in &node.validators {
            assert_eq!(v.rows.len(), 2);
            assert!(v.rows.is_subset(&node.row_ids));
            assert!(v.cols.is_subset(&node.col_ids));
        }
    }

    #[test]
    fn proposer_follows_everything() {
        let shape = small_shape();
        let node = Node::proposer(&shape, &Config::default());
        assert!(node.proposer);
        assert_eq!(node.node_class, PROPOSER_CLASS);
        assert_eq!(node.row_ids.len(), shape.row_count);
        assert_eq!(node.col_ids.len(), shape.col_count);
        assert_eq!(node.bw_uplink, Config::default().segments_per_step(shape.bw_uplink_proposer));
    }

    #[test]
    fn receive_and_forward() {
        let shape = small_shape();
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut a = Node::new(1, false, &shape, &config, &mut rng);
        let mut b = Node::new(2, false, &shape, &config, &mut rng);
        let row = *a.row_ids.first().unwrap();
        connect(&mut a, &mut b, Dim::Row, row, shape.col_count);

        a.receive_segment(row, 3, 2);
        assert_eq!(a.counters.samples_received, 1);
        assert!(a.neighbor(Dim::Row, row, 2).unwrap().receiving[3]);
        // not committed yet
        assert!(!a.block.get(row, 3));

        a.receive_segment(row, 3, 2);
        assert_eq!(a.stats.rx_dup_in_slot, 1);
        assert_eq!(a.stats.rx_in_slot, 2);

        a.receive_rows_columns();
        assert!(a.block.get(row, 3));
        let link = a.neighbor(Dim::Row, row, 2).unwrap();
        assert!(link.received[3]);
        assert!(link.receiving.not_any());
        // queued towards the only row neighbor, which already has it
        assert_eq!(link.send_queue, VecDeque::from([3]));
    }

    #[test]
    fn malicious_never_queues() {
        let shape = small_shape();
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut a = Node::new(1, true, &shape, &config, &mut rng);
        let mut b = Node::new(2, false, &shape, &config, &mut rng);
        let row = *a.row_ids.first().unwrap();
        connect(&mut a, &mut b, Dim::Row, row, shape.col_count);

        a.receive_segment(row, 0, 2);
        a.receive_rows_columns();
        assert!(a.block.get(row, 0));
        assert!(a.neighbor(Dim::Row, row, 2).unwrap().send_queue.is_empty());
        assert_eq!(a.counters.messages_sent, 0);
    }

    #[test]
    fn repair_forwards_repaired_segments() {
        let shape = small_shape();
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut a = Node::new(1, false, &shape, &config, &mut rng);
        let mut b = Node::new(2, false, &shape, &config, &mut rng);
        let row = *a.row_ids.first().unwrap();
        connect(&mut a, &mut b, Dim::Row, row, shape.col_count);

        for col in 0..shape.row_count_k {
            a.block.set(row, col);
        }
        a.restore_rows();
        assert!(a.block.row(row).all());
        assert_eq!(a.counters.rows_restored, 1);
        assert_eq!(a.counters.samples_repaired, 8);
        let queued: Vec<_> = a.neighbor(Dim::Row, row, 2).unwrap().send_queue.iter().copied().collect();
        assert_eq!(queued, (8..16).collect::<Vec<_>>());

        // nothing left to repair
        a.restore_rows();
        assert_eq!(a.counters.rows_restored, 1);
    }

    #[test]
    fn status_counts_custody_lines() {
        let shape = small_shape();
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(6);
        let mut node = Node::new(1, false, &shape, &config, &mut rng);
        let status = node.check_status();
        assert_eq!(status.arrived, 0);
        assert_eq!(status.expected, 4 * 16);
        assert_eq!(status.validated, 0);
        assert!(!status.is_ready());

        let row = *node.row_ids.first().unwrap();
        let col = *node.col_ids.first().unwrap();
        node.block.set(row, col);
        // counted once in the row and once in the column
        assert_eq!(node.check_status().arrived, 2);

        for r in 0..shape.row_count {
            for c in 0..shape.col_count {
                node.block.set(r, c);
            }
        }
        let status = node.check_status();
        assert!(status.is_ready());
        assert_eq!(status.validated, 1);
    }

    #[test]
    fn stats_roll_over() {
        let shape = small_shape();
        let mut rng = StdRng::seed_from_u64(7);
        let mut node = Node::new(1, false, &shape, &Config::default(), &mut rng);
        node.stats.tx_in_slot = 5;
        node.stats.rx_in_slot = 2;
        node.update_stats();
        node.update_stats();
        assert_eq!(node.stats.tx_per_slot, vec![5, 0]);
        assert_eq!(node.stats.rx_per_slot, vec![2, 0]);
        assert_eq!(node.stats.tx_in_slot, 0);
    }
}
