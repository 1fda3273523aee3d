// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Aggregate progress and traffic over all nodes of a simulation.

use log::{debug, warn};

use crate::node::Node;
use crate::shape::Shape;

/// Custody progress of the whole network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    /// Known segment instances over all custody lines of regular nodes.
    pub arrived: usize,
    /// Segment instances over all custody lines of regular nodes.
    pub expected: usize,
    /// Regular nodes with all custody lines complete.
    pub nodes_ready: usize,
    /// Hosted validators with all of their lines complete.
    pub validators_ready: usize,
    /// Validators hosted on nodes with all custody lines complete.
    pub validators_ready_all: usize,
    pub node_count: usize,
    pub validator_count: usize,
}

impl Progress {
    /// Segment instances still missing somewhere in the network.
    pub const fn missing(&self) -> usize {
        self.expected - self.arrived
    }

    pub fn samples_ratio(&self) -> f64 {
        ratio(self.arrived, self.expected)
    }

    pub fn nodes_ratio(&self) -> f64 {
        ratio(self.nodes_ready, self.node_count)
    }

    pub fn validators_ratio(&self) -> f64 {
        ratio(self.validators_ready, self.validator_count)
    }

    pub fn validators_all_ratio(&self) -> f64 {
        ratio(self.validators_ready_all, self.validator_count)
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        part as f64 / total as f64
    }
}

/// Traffic of one node class in one round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassTraffic {
    pub tx_mean: f64,
    pub tx_max: f64,
    pub rx_mean: f64,
    pub rx_max: f64,
    pub dup_mean: f64,
    pub dup_max: f64,
}

/// Traffic of one round, per node class.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficSnapshot {
    /// Segments sent by the proposer.
    pub builder_tx: f64,
    /// Traffic of class `i + 1` at index `i`.
    pub classes: Vec<ClassTraffic>,
}

/// Sums up the custody status of all regular nodes.
pub fn check_status(nodes: &[Node]) -> Progress {
    let mut progress = Progress::default();
    for node in nodes.iter().filter(|n| !n.proposer) {
        let status = node.check_status();
        progress.arrived += status.arrived;
        progress.expected += status.expected;
        progress.validators_ready += status.validated;
        progress.node_count += 1;
        progress.validator_count += node.vpn;
        if status.is_ready() {
            progress.nodes_ready += 1;
            progress.validators_ready_all += node.vpn;
        }
    }
    progress
}

/// Logs the network's progress and returns it.
pub fn progress(nodes: &[Node]) -> Progress {
    let progress = check_status(nodes);
    debug!(
        "samples {:.3}, nodes ready {:.3}, validators ready {:.3}",
        progress.samples_ratio(),
        progress.nodes_ratio(),
        progress.validators_ratio()
    );
    progress
}

/// Computes per-class mean and max of this round's traffic.
///
/// Classes without nodes report `NaN`.
pub fn traffic_stats(nodes: &[Node], shape: &Shape) -> TrafficSnapshot {
    let builder_tx = nodes
        .iter()
        .find(|n| n.proposer)
        .map_or(0.0, |n| n.stats.tx_in_slot as f64);
    let classes = (1..=shape.node_classes.len())
        .map(|class| {
            let members: Vec<_> = nodes
                .iter()
                .filter(|n| !n.proposer && n.node_class == class)
                .collect();
            let (tx_mean, tx_max) = mean_max(members.iter().map(|n| n.stats.tx_in_slot));
            let (rx_mean, rx_max) = mean_max(members.iter().map(|n| n.stats.rx_in_slot));
            let (dup_mean, dup_max) = mean_max(members.iter().map(|n| n.stats.rx_dup_in_slot));
            ClassTraffic {
                tx_mean,
                tx_max,
                rx_mean,
                rx_max,
                dup_mean,
                dup_max,
            }
        })
        .collect();
    TrafficSnapshot {
        builder_tx,
        classes,
    }
}

fn mean_max(values: impl Iterator<Item = usize>) -> (f64, f64) {
    let (count, sum, max) = values.fold((0, 0, 0), |(count, sum, max), v| {
        (count + 1, sum + v, max.max(v))
    });
    if count == 0 {
        (f64::NAN, f64::NAN)
    } else {
        (sum as f64 / count as f64, max as f64)
    }
}

/// Counts how many regular nodes follow each row and each column.
///
/// Warns about lines nobody follows.
pub fn check_rows_columns(nodes: &[Node], shape: &Shape) -> (Vec<usize>, Vec<usize>) {
    let mut rows = vec![0; shape.row_count];
    let mut cols = vec![0; shape.col_count];
    for node in nodes.iter().filter(|n| !n.proposer) {
        for &r in &node.row_ids {
            rows[r] += 1;
        }
        for &c in &node.col_ids {
            cols[c] += 1;
        }
    }
    if rows.contains(&0) || cols.contains(&0) {
        warn!("there is a row or column nobody follows");
    }
    (rows, cols)
}
