// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! One side of a peer-to-peer link on a row or column topic.

use std::collections::VecDeque;
use std::fmt::Display;

use bitvec::vec::BitVec;

use crate::NodeId;

/// Topic dimension of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    Row,
    Column,
}

/// Local view of a link to `peer` on a single line topic.
///
/// Tracks which positions of the line were sent to or received from the
/// peer, so that nothing is sent twice or echoed back.
#[derive(Clone, Debug)]
pub struct Neighbor {
    pub peer: NodeId,
    pub dim: Dim,
    /// Positions sent to the peer.
    pub sent: BitVec,
    /// Positions received from the peer in earlier rounds.
    pub received: BitVec,
    /// Positions received from the peer in the current round.
    pub receiving: BitVec,
    /// Positions queued for sending to the peer.
    pub send_queue: VecDeque<usize>,
}

impl Neighbor {
    /// Creates a fresh link for a line of length `line_len`.
    pub fn new(peer: NodeId, dim: Dim, line_len: usize) -> Self {
        Self {
            peer,
            dim,
            sent: BitVec::repeat(false, line_len),
            received: BitVec::repeat(false, line_len),
            receiving: BitVec::repeat(false, line_len),
            send_queue: VecDeque::new(),
        }
    }

    /// Number of positions that passed this link in either direction.
    pub fn sent_or_received(&self) -> usize {
        self.sent
            .iter()
            .by_vals()
            .zip(self.received.iter().by_vals())
            .filter(|(s, r)| *s || *r)
            .count()
    }

    /// Whether position `i` has already passed this link.
    pub fn knows(&self, i: usize) -> bool {
        self.sent[i] || self.received[i]
    }

    /// Folds positions received this round into `received`.
    pub fn commit_receiving(&mut self) {
        for i in self.receiving.iter_ones() {
            self.received.set(i, true);
        }
        self.receiving.fill(false);
    }
}

impl Display for Neighbor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}, q:{}",
            self.peer,
            self.sent.count_ones(),
            self.received.count_ones(),
            self.send_queue.len()
        )
    }
}
