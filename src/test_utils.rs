// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Utility functions for tests.

use crate::neighbor::{Dim, Neighbor};
use crate::node::Node;
use crate::shape::{NodeClass, Shape};

/// A 16x16 block with `K = 8` in both dimensions, spread over 50 nodes.
///
/// Nodes keep 2 rows and 2 columns each and talk over degree-6 meshes.
pub fn small_shape() -> Shape {
    Shape::square(16, 8, 50)
        .with_net_degree(6)
        .with_custody(2, 2)
}

/// Like [`small_shape`], but every node has effectively unlimited uplink.
pub fn unlimited_shape() -> Shape {
    small_shape().with_bandwidth(100_000, vec![NodeClass::new(1, 1, 100_000)])
}

/// Creates a bidirectional link between `a` and `b` on the given line.
pub fn connect(a: &mut Node, b: &mut Node, dim: Dim, line: usize, line_len: usize) {
    a.links_mut(dim)
        .entry(line)
        .or_default()
        .insert(b.id, Neighbor::new(b.id, dim, line_len));
    b.links_mut(dim)
        .entry(line)
        .or_default()
        .insert(a.id, Neighbor::new(a.id, dim, line_len));
}
