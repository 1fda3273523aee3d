// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Parameter grid of a study.
//!
//! Every combination of the listed values becomes one [`Shape`].

use das_sim::config::Config;
use das_sim::{FailureModel, NodeClass, Shape};
use log::warn;
use serde::Deserialize;

/// Contents of a study file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StudyFile {
    /// Used to name output files.
    pub name: String,
    pub grid: Grid,
    pub config: Config,
}

/// Values to sweep over, one list per shape parameter.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Grid {
    /// Number of runs per parameter combination.
    pub runs: u64,
    /// Side lengths of square blocks.
    pub block_sizes: Vec<usize>,
    /// Repair thresholds, half of the block size if empty.
    pub thresholds: Vec<usize>,
    pub failure_models: Vec<FailureModel>,
    pub failure_rates: Vec<u32>,
    pub node_counts: Vec<usize>,
    pub malicious: Vec<u32>,
    pub custody_rows: Vec<usize>,
    pub custody_cols: Vec<usize>,
    pub net_degrees: Vec<usize>,
    pub bw_uplinks_proposer: Vec<u64>,
    pub node_classes: Vec<Vec<NodeClass>>,
}

impl Default for Grid {
    fn default() -> Self {
        let shape = Shape::square(128, 64, 128);
        Self {
            runs: 1,
            block_sizes: vec![shape.row_count],
            thresholds: Vec::new(),
            failure_models: vec![shape.failure_model],
            failure_rates: vec![shape.failure_rate_pct],
            node_counts: vec![shape.node_count],
            malicious: vec![shape.malicious_pct],
            custody_rows: vec![shape.custody_rows],
            custody_cols: vec![shape.custody_cols],
            net_degrees: vec![shape.net_degree],
            bw_uplinks_proposer: vec![shape.bw_uplink_proposer],
            node_classes: vec![shape.node_classes],
        }
    }
}

impl Grid {
    /// Expands the grid into one shape per combination and run.
    ///
    /// Odd network degrees are skipped.
    pub fn shapes(&self) -> Vec<Shape> {
        let mut shapes = Vec::new();
        for &degree in &self.net_degrees {
            if degree % 2 != 0 {
                warn!("skipping odd network degree {degree}");
                continue;
            }
            for &n in &self.block_sizes {
                let thresholds = if self.thresholds.is_empty() {
                    vec![n / 2]
                } else {
                    self.thresholds.clone()
                };
                for &k in &thresholds {
                    for &nodes in &self.node_counts {
                        self.expand(Shape::square(n, k, nodes).with_net_degree(degree), &mut shapes);
                    }
                }
            }
        }
        shapes
    }

    fn expand(&self, base: Shape, shapes: &mut Vec<Shape>) {
        for &model in &self.failure_models {
            for &rate in &self.failure_rates {
                for &malicious in &self.malicious {
                    for &rows in &self.custody_rows {
                        for &cols in &self.custody_cols {
                            for &proposer in &self.bw_uplinks_proposer {
                                for classes in &self.node_classes {
                                    for run in 0..self.runs {
                                        let shape = base
                                            .clone()
                                            .with_failures(model, rate)
                                            .with_malicious(malicious)
                                            .with_custody(rows, cols)
                                            .with_bandwidth(proposer, classes.clone())
                                            .with_run(run);
                                        shapes.push(shape);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
