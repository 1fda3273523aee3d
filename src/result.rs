// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Outcome of a single simulation run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::NodeId;
use crate::node::{Counters, Node};
use crate::observer::{Progress, TrafficSnapshot};
use crate::shape::Shape;

/// Per-round series of progress and traffic metrics, keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metrics {
    series: BTreeMap<String, Vec<f64>>,
}

impl Metrics {
    /// Records one round of progress.
    pub fn record_progress(&mut self, progress: &Progress) {
        self.push("samples received", progress.samples_ratio());
        self.push("nodes ready", progress.nodes_ratio());
        self.push("validators ready", progress.validators_ratio());
        self.push("validators ready (all)", progress.validators_all_ratio());
    }

    /// Records one round of traffic.
    pub fn record_traffic(&mut self, traffic: &TrafficSnapshot) {
        self.push("TX builder mean", traffic.builder_tx);
        for (i, class) in traffic.classes.iter().enumerate() {
            let n = i + 1;
            self.push(&format!("TX class{n} mean"), class.tx_mean);
            self.push(&format!("TX class{n} max"), class.tx_max);
            self.push(&format!("RX class{n} mean"), class.rx_mean);
            self.push(&format!("RX class{n} max"), class.rx_max);
            self.push(&format!("Dup class{n} mean"), class.dup_mean);
            self.push(&format!("Dup class{n} max"), class.dup_max);
        }
    }

    fn push(&mut self, name: &str, value: f64) {
        self.series.entry(name.to_owned()).or_default().push(value);
    }

    /// Returns the series with the given name.
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

/// Terminal state of a single node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub node_class: usize,
    pub malicious: bool,
    #[serde(flatten)]
    pub counters: Counters,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            node_class: node.node_class,
            malicious: node.malicious,
            counters: node.counters,
        }
    }
}

/// Everything recorded about one run.
#[derive(Clone, Debug, Serialize)]
pub struct RunResult {
    /// Display key of the shape.
    pub id: String,
    pub shape: Shape,
    /// Whether every custody line of every node became complete.
    pub block_available: bool,
    /// Rounds executed.
    pub rounds: usize,
    /// Time until enough validators were ready, in milliseconds.
    pub tta: Option<u64>,
    /// Missing segment instances, before the first and after each round.
    pub missing_vector: Vec<usize>,
    /// Only recorded with `save_progress`.
    pub metrics: Metrics,
    /// Nodes following each row, only recorded with `save_rc_dist`.
    pub row_dist: Option<Vec<usize>>,
    /// Nodes following each column, only recorded with `save_rc_dist`.
    pub col_dist: Option<Vec<usize>>,
    pub nodes: Vec<NodeSummary>,
}

impl RunResult {
    /// Total segments sent by all nodes.
    pub fn samples_sent(&self) -> u64 {
        self.nodes.iter().map(|n| n.counters.samples_sent).sum()
    }

    /// Missing segment instances at the end of the run.
    pub fn final_missing(&self) -> usize {
        self.missing_vector.last().copied().unwrap_or_default()
    }
}
