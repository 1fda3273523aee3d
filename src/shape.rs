// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parameters describing a single simulation instance.
//!
//! A [`Shape`] fixes everything that varies between runs of a study:
//! block dimensions, erasure-coding thresholds, network size and degree,
//! node classes, custody sizes and the failure model used by the proposer.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NodeId;

/// Errors for shapes the simulator cannot run at all.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("block dimensions must be non-zero (got {rows}x{cols})")]
    EmptyBlock { rows: usize, cols: usize },
    #[error("simulation needs at least one node")]
    NoNodes,
    #[error("network degree must be positive and even (got {0})")]
    BadNetDegree(usize),
    #[error("{what} percentage must be at most 100 (got {value})")]
    BadPercentage { what: &'static str, value: u32 },
    #[error("at least one node class with positive weight is required")]
    NoNodeClasses,
    #[error("failure model {0} requires a square block with equal thresholds")]
    NotSquare(FailureModel),
    #[error("unknown failure model: {0}")]
    UnknownFailureModel(String),
}

/// Erasure pattern applied by the proposer when it creates the block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureModel {
    /// Uniformly random subset of segments is released.
    #[default]
    #[serde(rename = "random")]
    Random,
    /// Row-major prefix of the block is released.
    #[serde(rename = "sequential")]
    Sequential,
    /// Minimal size non-recoverable erasure pattern.
    #[serde(rename = "MEP")]
    Mep,
    /// [`FailureModel::Mep`] plus one segment, which makes it recoverable.
    #[serde(rename = "MEP+1")]
    MepPlusOne,
    /// Diagonal erasure pattern.
    #[serde(rename = "DEP")]
    Dep,
    /// [`FailureModel::Dep`] plus one segment.
    #[serde(rename = "DEP+1")]
    DepPlusOne,
    /// Minimal size recoverable erasure pattern.
    #[serde(rename = "MREP")]
    Mrep,
    /// [`FailureModel::Mrep`] minus one segment, which makes it non-recoverable.
    #[serde(rename = "MREP-1")]
    MrepMinusOne,
}

impl FailureModel {
    /// Whether this pattern is only defined for square blocks.
    pub const fn requires_square(&self) -> bool {
        matches!(self, Self::Dep | Self::DepPlusOne)
    }
}

impl Display for FailureModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
            Self::Mep => "MEP",
            Self::MepPlusOne => "MEP+1",
            Self::Dep => "DEP",
            Self::DepPlusOne => "DEP+1",
            Self::Mrep => "MREP",
            Self::MrepMinusOne => "MREP-1",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FailureModel {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(Self::Random),
            "sequential" => Ok(Self::Sequential),
            "MEP" => Ok(Self::Mep),
            "MEP+1" => Ok(Self::MepPlusOne),
            "DEP" => Ok(Self::Dep),
            "DEP+1" => Ok(Self::DepPlusOne),
            "MREP" => Ok(Self::Mrep),
            "MREP-1" => Ok(Self::MrepMinusOne),
            other => Err(ShapeError::UnknownFailureModel(other.to_owned())),
        }
    }
}

/// A class of non-proposer nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClass {
    /// Relative share of nodes belonging to this class.
    pub weight: u32,
    /// Number of validators hosted by each node of this class.
    pub validators_per_node: usize,
    /// Uplink bandwidth in Mbit/s.
    pub bw_uplink: u64,
}

impl NodeClass {
    pub const fn new(weight: u32, validators_per_node: usize, bw_uplink: u64) -> Self {
        Self {
            weight,
            validators_per_node,
            bw_uplink,
        }
    }
}

/// Node class of the block proposer.
pub const PROPOSER_CLASS: usize = 0;

/// Set of parameters for one specific simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Number of rows in the extended block.
    pub row_count: usize,
    /// Number of known segments sufficient to repair a row.
    pub row_count_k: usize,
    /// Number of columns in the extended block.
    pub col_count: usize,
    /// Number of known segments sufficient to repair a column.
    pub col_count_k: usize,
    /// Total number of nodes, including the proposer.
    pub node_count: usize,
    pub failure_model: FailureModel,
    /// Percentage of the block not released by the proposer.
    pub failure_rate_pct: u32,
    /// Percentage of nodes that never transmit.
    pub malicious_pct: u32,
    /// Rows taken into custody per validator.
    pub custody_rows: usize,
    /// Columns taken into custody per validator.
    pub custody_cols: usize,
    /// Per-topic mesh degree.
    pub net_degree: usize,
    /// Uplink bandwidth of the proposer in Mbit/s.
    pub bw_uplink_proposer: u64,
    /// Non-proposer node classes, class `i + 1` is `node_classes[i]`.
    pub node_classes: Vec<NodeClass>,
    /// Index of the run among runs with otherwise identical parameters.
    pub run: u64,
}

impl Shape {
    /// Creates a shape with the given block and network size.
    ///
    /// All other parameters start out at the defaults of a small,
    /// loss-free network with a single class of 10 Mbit/s nodes.
    pub fn new(
        row_count: usize,
        row_count_k: usize,
        col_count: usize,
        col_count_k: usize,
        node_count: usize,
    ) -> Self {
        Self {
            row_count,
            row_count_k,
            col_count,
            col_count_k,
            node_count,
            failure_model: FailureModel::Random,
            failure_rate_pct: 0,
            malicious_pct: 0,
            custody_rows: 2,
            custody_cols: 2,
            net_degree: 8,
            bw_uplink_proposer: 200,
            node_classes: vec![NodeClass::new(1, 1, 10)],
            run: 0,
        }
    }

    /// Creates a shape for a square `n x n` block with threshold `k`.
    pub fn square(n: usize, k: usize, node_count: usize) -> Self {
        Self::new(n, k, n, k, node_count)
    }

    pub fn with_failures(mut self, model: FailureModel, rate_pct: u32) -> Self {
        self.failure_model = model;
        self.failure_rate_pct = rate_pct;
        self
    }

    pub fn with_malicious(mut self, pct: u32) -> Self {
        self.malicious_pct = pct;
        self
    }

    pub fn with_custody(mut self, rows: usize, cols: usize) -> Self {
        self.custody_rows = rows;
        self.custody_cols = cols;
        self
    }

    pub fn with_net_degree(mut self, degree: usize) -> Self {
        self.net_degree = degree;
        self
    }

    /// Sets the uplink bandwidths, for the proposer and the node classes.
    pub fn with_bandwidth(mut self, proposer: u64, classes: Vec<NodeClass>) -> Self {
        self.bw_uplink_proposer = proposer;
        self.node_classes = classes;
        self
    }

    pub fn with_run(mut self, run: u64) -> Self {
        self.run = run;
        self
    }

    /// Total number of segments in the block.
    pub const fn segment_count(&self) -> usize {
        self.row_count * self.col_count
    }

    /// Checks that the simulator can run this shape.
    ///
    /// Settings that only degrade the outcome (e.g. a threshold above the
    /// line length) are accepted and reported by the simulator instead.
    pub fn validate(&self) -> Result<(), ShapeError> {
        if self.row_count == 0 || self.col_count == 0 {
            return Err(ShapeError::EmptyBlock {
                rows: self.row_count,
                cols: self.col_count,
            });
        }
        if self.node_count == 0 {
            return Err(ShapeError::NoNodes);
        }
        if self.net_degree == 0 || self.net_degree % 2 != 0 {
            return Err(ShapeError::BadNetDegree(self.net_degree));
        }
        if self.failure_rate_pct > 100 {
            return Err(ShapeError::BadPercentage {
                what: "failure rate",
                value: self.failure_rate_pct,
            });
        }
        if self.malicious_pct > 100 {
            return Err(ShapeError::BadPercentage {
                what: "malicious",
                value: self.malicious_pct,
            });
        }
        if self.node_classes.iter().map(|c| c.weight).sum::<u32>() == 0 {
            return Err(ShapeError::NoNodeClasses);
        }
        if self.failure_model.requires_square()
            && (self.row_count != self.col_count || self.row_count_k != self.col_count_k)
        {
            return Err(ShapeError::NotSquare(self.failure_model));
        }
        Ok(())
    }

    /// Returns the node class of the given non-proposer node.
    ///
    /// Classes are handed out in contiguous id ranges proportional to their
    /// weights, the last class absorbs rounding leftovers.
    pub fn node_class_of(&self, id: NodeId) -> usize {
        let total_weight: u64 = self.node_classes.iter().map(|c| c.weight as u64).sum();
        let mut cumulative = 0;
        for (i, class) in self.node_classes.iter().enumerate() {
            cumulative += self.node_count as u64 * class.weight as u64 / total_weight;
            if i + 1 == self.node_classes.len() || id <= cumulative {
                return i + 1;
            }
        }
        self.node_classes.len()
    }

    /// Returns the [`NodeClass`] for a class index (not for the proposer).
    pub fn class(&self, class: usize) -> Option<&NodeClass> {
        class
            .checked_sub(1)
            .and_then(|index| self.node_classes.get(index))
    }

    /// Uplink bandwidth in Mbit/s of a node class, including the proposer.
    pub fn bw_uplink_of(&self, class: usize) -> u64 {
        if class == PROPOSER_CLASS {
            self.bw_uplink_proposer
        } else {
            self.class(class).map_or(0, |c| c.bw_uplink)
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nbr-{}-nbrk-{}-nbc-{}-nbck-{}-nn-{}-fm-{}-fr-{}-mn-{}-cusr-{}-cusc-{}-nd-{}-bwupprod-{}",
            self.row_count,
            self.row_count_k,
            self.col_count,
            self.col_count_k,
            self.node_count,
            self.failure_model,
            self.failure_rate_pct,
            self.malicious_pct,
            self.custody_rows,
            self.custody_cols,
            self.net_degree,
            self.bw_uplink_proposer,
        )?;
        for (i, class) in self.node_classes.iter().enumerate() {
            write!(
                f,
                "-c{}-{}-{}-{}",
                i + 1,
                class.weight,
                class.validators_per_node,
                class.bw_uplink
            )?;
        }
        write!(f, "-r-{}", self.run)
    }
}
