// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! DAS: dissemination of erasure-coded blocks for Data Availability Sampling
//!
//! Round-based simulator of how a two-dimensional erasure-coded block spreads
//! through a peer-to-peer network of row and column topics. Nodes push
//! segments under an uplink budget, repair lines from enough segments and
//! forward what they repaired. A run ends when every node has its custody
//! complete, or when the network stops making progress.
//!
//! The main entry point is [`Simulator`], which takes a [`Shape`] and a
//! [`Config`] and produces a [`RunResult`].

#![deny(rustdoc::broken_intra_doc_links)]

pub mod block;
pub mod config;
pub mod logging;
pub mod neighbor;
pub mod node;
pub mod observer;
pub mod result;
pub mod shape;
pub mod simulator;
#[cfg(test)]
pub mod test_utils;

pub use self::block::Block;
pub use self::config::{Behavior, Config};
pub use self::node::Node;
pub use self::result::RunResult;
pub use self::shape::{FailureModel, NodeClass, Shape};
pub use self::simulator::{Outcome, SimulationError, Simulator};

/// Node ID number type.
pub type NodeId = u64;
