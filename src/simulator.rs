// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Round-based simulation of block dissemination.
//!
//! A [`Simulator`] owns all nodes and the random source of one run.
//! It builds the overlay once and then drives rounds of strictly ordered
//! phases until the run reaches a terminal [`Outcome`]:
//! 1. send: every honest node pushes within its budget, deliveries are
//!    staged at their targets right away; gossip on heartbeat rounds
//! 2. receive: every regular node commits what it received
//! 3. repair: every regular node restores rows, then columns
//! 4. stats: traffic snapshot, per-node history, network progress
//!
//! Staged segments only become visible to their receiver in the receive phase.

pub mod topology;

use std::collections::BTreeSet;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use thiserror::Error;

use crate::NodeId;
use crate::config::{Config, ConfigError};
use crate::node::{Node, PROPOSER_ID};
use crate::observer;
use crate::result::{Metrics, NodeSummary, RunResult};
use crate::shape::{Shape, ShapeError};

/// Errors preventing a simulation from starting.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid shape: {0}")]
    Shape(#[from] ShapeError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

/// Terminal state of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every custody line of every regular node is complete.
    Available,
    /// No progress for the configured number of rounds.
    Stalled,
    /// The round limit was hit while still making progress.
    RoundLimit,
}

/// Simulation of a single run.
pub struct Simulator {
    shape: Shape,
    config: Config,
    rng: StdRng,
    nodes: Vec<Node>,
    round: usize,
    missing_vector: Vec<usize>,
    metrics: Metrics,
    tta_round: Option<usize>,
    row_dist: Option<Vec<usize>>,
    col_dist: Option<Vec<usize>>,
}

impl Simulator {
    /// Sets up nodes, overlay and the proposer's block.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape or the config cannot be simulated.
    pub fn new(shape: Shape, config: Config) -> Result<Self, SimulationError> {
        shape.validate()?;
        config.validate()?;
        if shape.row_count_k > shape.col_count {
            warn!("row threshold exceeds row length, rows will never be repaired");
        }
        if shape.col_count_k > shape.row_count {
            warn!("column threshold exceeds column length, columns will never be repaired");
        }

        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(shape.run));
        let malicious = select_malicious(&shape, &config, &mut rng);
        let mut nodes = Vec::with_capacity(shape.node_count);
        nodes.push(Node::proposer(&shape, &config));
        for id in 1..shape.node_count as NodeId {
            let node = Node::new(id, malicious.contains(&id), &shape, &config, &mut rng);
            nodes.push(node);
        }

        topology::build(&mut nodes, &shape, &config, &mut rng);
        nodes[PROPOSER_ID as usize].init_block(&shape, &mut rng);

        let (row_dist, col_dist) = if config.save_rc_dist {
            let (rows, cols) = observer::check_rows_columns(&nodes, &shape);
            (Some(rows), Some(cols))
        } else {
            (None, None)
        };
        let progress = observer::check_status(&nodes);
        debug!("{shape}: {} malicious nodes", malicious.len());

        Ok(Self {
            shape,
            config,
            rng,
            nodes,
            round: 0,
            missing_vector: vec![progress.missing()],
            metrics: Metrics::default(),
            tta_round: None,
            row_dist,
            col_dist,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub const fn round(&self) -> usize {
        self.round
    }

    pub fn missing_vector(&self) -> &[usize] {
        &self.missing_vector
    }

    /// Runs rounds until a terminal outcome is reached.
    pub fn run(&mut self) -> RunResult {
        let mut outcome = self.outcome();
        while outcome.is_none() {
            outcome = self.step();
        }
        match outcome {
            Some(Outcome::Available) => {
                info!("{}: block available after {} rounds", self.shape, self.round);
            }
            Some(Outcome::Stalled) => {
                info!(
                    "{}: block cannot be recovered, stuck at {} missing after {} rounds",
                    self.shape,
                    self.final_missing(),
                    self.round
                );
            }
            _ => {
                warn!(
                    "{}: round limit reached with {} missing",
                    self.shape,
                    self.final_missing()
                );
            }
        }
        if outcome != Some(Outcome::Available) && self.config.diagnostics {
            for node in &self.nodes {
                node.log_diagnostics();
            }
        }
        self.result()
    }

    /// Simulates a single round.
    ///
    /// Returns the outcome if the run ended with this round.
    pub fn step(&mut self) -> Option<Outcome> {
        self.round += 1;
        self.send_phase();
        for node in self.nodes.iter_mut().filter(|n| !n.proposer) {
            node.receive_rows_columns();
        }
        for node in self.nodes.iter_mut().filter(|n| !n.proposer) {
            node.restore_rows();
            node.restore_columns();
        }

        let traffic = observer::traffic_stats(&self.nodes, &self.shape);
        for node in &mut self.nodes {
            node.update_stats();
        }
        let progress = observer::progress(&self.nodes);
        if self.config.save_progress {
            self.metrics.record_progress(&progress);
            self.metrics.record_traffic(&traffic);
        }
        let ready = progress.validators_ratio() >= self.config.success_condition;
        if ready && self.tta_round.is_none() {
            self.tta_round = Some(self.round);
        }
        self.missing_vector.push(progress.missing());
        debug!("round {}: {} missing", self.round, progress.missing());
        self.outcome()
    }

    fn send_phase(&mut self) {
        let gossip_round = self.config.gossip && self.round % self.config.heartbeat == 0;
        for i in 0..self.nodes.len() {
            if self.nodes[i].malicious {
                continue;
            }
            for delivery in self.nodes[i].send(&mut self.rng) {
                self.nodes[delivery.to as usize].receive_segment(
                    delivery.row,
                    delivery.col,
                    delivery.from,
                );
            }
            if gossip_round && !self.nodes[i].proposer {
                for target in self.nodes[i].gossip_targets(&mut self.rng) {
                    if !self.nodes[i].has_budget() {
                        break;
                    }
                    let (announcer, puller) = pair_mut(&mut self.nodes, i, target as usize);
                    announcer.serve_gossip(puller);
                }
            }
        }
    }

    fn outcome(&self) -> Option<Outcome> {
        let window = self.config.steps_for_stop_condition + 1;
        let missing = self.final_missing();
        if missing == 0 {
            Some(Outcome::Available)
        } else if self.missing_vector.len() >= window
            && self.missing_vector[self.missing_vector.len() - window..]
                .iter()
                .all(|&m| m == missing)
        {
            Some(Outcome::Stalled)
        } else if self.round >= self.config.max_rounds {
            Some(Outcome::RoundLimit)
        } else {
            None
        }
    }

    fn final_missing(&self) -> usize {
        self.missing_vector.last().copied().unwrap_or_default()
    }

    fn result(&self) -> RunResult {
        RunResult {
            id: self.shape.to_string(),
            shape: self.shape.clone(),
            block_available: self.final_missing() == 0,
            rounds: self.round,
            tta: self
                .tta_round
                .map(|round| round as u64 * self.config.step_duration_ms),
            missing_vector: self.missing_vector.clone(),
            metrics: self.metrics.clone(),
            row_dist: self.row_dist.clone(),
            col_dist: self.col_dist.clone(),
            nodes: self.nodes.iter().map(NodeSummary::from).collect(),
        }
    }
}

/// Picks the malicious nodes, never the proposer.
fn select_malicious(shape: &Shape, config: &Config, rng: &mut StdRng) -> BTreeSet<NodeId> {
    let candidates = shape.node_count.saturating_sub(1);
    let count = (shape.node_count * shape.malicious_pct as usize / 100).min(candidates);
    if config.randomize_malicious_nodes {
        index::sample(rng, candidates, count)
            .into_iter()
            .map(|i| i as NodeId + 1)
            .collect()
    } else {
        (1..=count as NodeId).collect()
    }
}

/// Borrows two distinct nodes mutably.
fn pair_mut(nodes: &mut [Node], a: usize, b: usize) -> (&mut Node, &mut Node) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = nodes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = nodes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
