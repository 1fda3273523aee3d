// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation options shared by all runs of a study.
//!
//! While a [`Shape`] varies between runs, [`Config`] stays fixed.
//! It holds round timing, stop conditions, output toggles and the
//! scheduling [`Behavior`] of nodes.
//!
//! Node behavior is resolved once per node into a [`NodeBehavior`],
//! filling in line caps that default to the shape's repair thresholds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shape::Shape;

/// Errors for configurations the simulator cannot run with.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("step duration must be positive")]
    ZeroStepDuration,
    #[error("segment size must be positive")]
    ZeroSegmentSize,
    #[error("stop condition needs a window of at least one step")]
    ZeroStopWindow,
    #[error("success condition must be within [0, 1] (got {0})")]
    BadSuccessCondition(f64),
    #[error("gossip heartbeat must be at least one round")]
    ZeroHeartbeat,
}

/// Scheduling options of a node.
///
/// Line caps left as `None` default to the shape's repair thresholds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    /// Repair lines as soon as enough segments arrived.
    pub repair_on_the_fly: bool,
    /// Stop sending on a row link after this many segments passed it.
    pub send_line_until_rows: Option<usize>,
    /// Stop sending on a column link after this many segments passed it.
    pub send_line_until_cols: Option<usize>,
    /// Queue received segments on every outgoing link of their topics.
    pub per_neighbor_queue: bool,
    /// Shuffle the order in which per-neighbor queues are served.
    pub shuffle_queues: bool,
    /// Queue received segments in a single node-level queue.
    pub per_node_queue: bool,
    /// Shuffle segments collected by the segment-shuffle scheduler.
    pub shuffle_lines: bool,
    /// Shuffle neighbors when fanning out a segment.
    pub shuffle_neighbors: bool,
    /// Pick random segments and neighbors as a baseline scheduler.
    pub dumb_random_scheduler: bool,
    /// Send every segment worth sending once, in shuffled order, then repeat.
    pub segment_shuffle_scheduler: bool,
    /// Keep segment-shuffle scheduler state across rounds.
    pub segment_shuffle_scheduler_persist: bool,
    /// Queue every held segment on all links at initialization.
    pub queue_all_on_init: bool,
    /// Forward segments as soon as they are received.
    pub forward_on_receive: bool,
    /// Forward whole lines once they become repairable.
    pub forward_when_line_received: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            repair_on_the_fly: true,
            send_line_until_rows: None,
            send_line_until_cols: None,
            per_neighbor_queue: true,
            shuffle_queues: true,
            per_node_queue: false,
            shuffle_lines: true,
            shuffle_neighbors: true,
            dumb_random_scheduler: false,
            segment_shuffle_scheduler: true,
            segment_shuffle_scheduler_persist: true,
            queue_all_on_init: false,
            forward_on_receive: true,
            forward_when_line_received: false,
        }
    }
}

impl Behavior {
    /// Resolves these options for one node of a run with the given shape.
    pub fn resolve(&self, shape: &Shape) -> NodeBehavior {
        NodeBehavior {
            repair_on_the_fly: self.repair_on_the_fly,
            send_line_until_rows: self.send_line_until_rows.unwrap_or(shape.row_count_k),
            send_line_until_cols: self.send_line_until_cols.unwrap_or(shape.col_count_k),
            per_neighbor_queue: self.per_neighbor_queue,
            shuffle_queues: self.shuffle_queues,
            per_node_queue: self.per_node_queue,
            shuffle_lines: self.shuffle_lines,
            shuffle_neighbors: self.shuffle_neighbors,
            dumb_random_scheduler: self.dumb_random_scheduler,
            segment_shuffle_scheduler: self.segment_shuffle_scheduler,
            segment_shuffle_scheduler_persist: self.segment_shuffle_scheduler_persist,
            queue_all_on_init: self.queue_all_on_init,
            forward_on_receive: self.forward_on_receive,
            forward_when_line_received: self.forward_when_line_received,
        }
    }
}

/// [`Behavior`] of a specific node, with all defaults filled in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeBehavior {
    pub repair_on_the_fly: bool,
    pub send_line_until_rows: usize,
    pub send_line_until_cols: usize,
    pub per_neighbor_queue: bool,
    pub shuffle_queues: bool,
    pub per_node_queue: bool,
    pub shuffle_lines: bool,
    pub shuffle_neighbors: bool,
    pub dumb_random_scheduler: bool,
    pub segment_shuffle_scheduler: bool,
    pub segment_shuffle_scheduler_persist: bool,
    pub queue_all_on_init: bool,
    pub forward_on_receive: bool,
    pub forward_when_line_received: bool,
}

impl NodeBehavior {
    /// Whether any queue-based forwarding policy is active.
    pub const fn queues_enabled(&self) -> bool {
        self.per_node_queue || self.per_neighbor_queue
    }
}

/// Options shared by all runs of a study.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Duration of one round in milliseconds.
    pub step_duration_ms: u64,
    /// Size of one segment in bytes.
    pub segment_size: u64,
    /// Rounds without progress after which a run is considered stuck.
    pub steps_for_stop_condition: usize,
    /// Fraction of validators that need to be ready for availability.
    pub success_condition: f64,
    /// Upper bound on the number of rounds in one run.
    pub max_rounds: usize,
    /// Record per-round progress and traffic series.
    pub save_progress: bool,
    /// Record how many nodes follow each row and column.
    pub save_rc_dist: bool,
    /// Derive node custody from the custody of hosted validators.
    pub validator_based_custody: bool,
    /// Pick malicious nodes at random instead of taking the lowest ids.
    pub randomize_malicious_nodes: bool,
    /// The proposer only pushes to channels, without joining them.
    pub proposer_publish_only: bool,
    /// Number of row channel members the proposer pushes to.
    pub proposer_publish_to_rows: Option<usize>,
    /// Number of column channel members the proposer pushes to.
    pub proposer_publish_to_cols: Option<usize>,
    /// Enable custody announcements with pull responses.
    pub gossip: bool,
    /// Rounds between two gossip announcements.
    pub heartbeat: usize,
    /// Seed for the random source of every run.
    pub seed: u64,
    /// Log per-node details when a run fails.
    pub diagnostics: bool,
    /// Behavior of regular nodes.
    pub behavior: Behavior,
    /// Behavior of the proposer, if different from regular nodes.
    pub proposer_behavior: Option<Behavior>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            step_duration_ms: 50,
            segment_size: 560,
            steps_for_stop_condition: 7,
            success_condition: 0.9,
            max_rounds: 1000,
            save_progress: true,
            save_rc_dist: true,
            validator_based_custody: false,
            randomize_malicious_nodes: true,
            proposer_publish_only: true,
            proposer_publish_to_rows: None,
            proposer_publish_to_cols: None,
            gossip: false,
            heartbeat: 20,
            seed: 0,
            diagnostics: false,
            behavior: Behavior::default(),
            proposer_behavior: None,
        }
    }
}

impl Config {
    /// Checks that the simulator can run with this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_duration_ms == 0 {
            return Err(ConfigError::ZeroStepDuration);
        }
        if self.segment_size == 0 {
            return Err(ConfigError::ZeroSegmentSize);
        }
        if self.steps_for_stop_condition == 0 {
            return Err(ConfigError::ZeroStopWindow);
        }
        if !(0.0..=1.0).contains(&self.success_condition) {
            return Err(ConfigError::BadSuccessCondition(self.success_condition));
        }
        if self.gossip && self.heartbeat == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }
        Ok(())
    }

    /// Converts an uplink bandwidth in Mbit/s into segments per round.
    pub fn segments_per_step(&self, mbps: u64) -> usize {
        (mbps * 1000 * self.step_duration_ms / (8 * self.segment_size)) as usize
    }

    /// Resolves the behavior of a node for the given shape.
    pub fn node_behavior(&self, shape: &Shape, proposer: bool) -> NodeBehavior {
        match (&self.proposer_behavior, proposer) {
            (Some(behavior), true) => behavior.resolve(shape),
            _ => self.behavior.resolve(shape),
        }
    }

    /// Number of row channel members the proposer pushes to.
    pub fn publish_to_rows(&self, shape: &Shape) -> usize {
        self.proposer_publish_to_rows.unwrap_or(shape.net_degree)
    }

    /// Number of column channel members the proposer pushes to.
    pub fn publish_to_cols(&self, shape: &Shape) -> usize {
        self.proposer_publish_to_cols.unwrap_or(shape.net_degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandwidth_conversion() {
        let config = Config::default();
        // 1 Mbit/s over 50ms in 560 byte segments
        assert_eq!(config.segments_per_step(1), 11);
        assert_eq!(config.segments_per_step(10), 111);
        assert_eq!(config.segments_per_step(200), 2232);
        assert_eq!(config.segments_per_step(0), 0);
    }

    #[test]
    fn validation() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            success_condition: 1.5,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BadSuccessCondition(1.5)));
        let config = Config {
            gossip: true,
            heartbeat: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroHeartbeat));
        let config = Config {
            steps_for_stop_condition: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroStopWindow));
    }

    #[test]
    fn behavior_resolution() {
        let shape = Shape::new(32, 16, 64, 24, 10);
        let config = Config {
            proposer_behavior: Some(Behavior {
                per_node_queue: true,
                send_line_until_rows: Some(4),
                ..Behavior::default()
            }),
            ..Config::default()
        };

        let node = config.node_behavior(&shape, false);
        assert_eq!(node.send_line_until_rows, 16);
        assert_eq!(node.send_line_until_cols, 24);
        assert!(!node.per_node_queue);

        let proposer = config.node_behavior(&shape, true);
        assert_eq!(proposer.send_line_until_rows, 4);
        assert_eq!(proposer.send_line_until_cols, 24);
        assert!(proposer.per_node_queue);
        assert!(proposer.queues_enabled());
    }

    #[test]
    fn from_toml() {
        let config: Config = toml::from_str(
            r#"
            step_duration_ms = 100
            seed = 7

            [behavior]
            dumb_random_scheduler = true
            send_line_until_cols = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.step_duration_ms, 100);
        assert_eq!(config.segment_size, 560);
        assert_eq!(config.seed, 7);
        assert!(config.behavior.dumb_random_scheduler);
        assert!(config.behavior.segment_shuffle_scheduler);
        assert_eq!(config.behavior.send_line_until_cols, Some(3));
        assert!(config.proposer_behavior.is_none());
    }
}
