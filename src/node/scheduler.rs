// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transmission scheduling within the per-round uplink budget.
//!
//! [`Node::send`] runs the enabled policies in fixed order, until the budget
//! is used up or no policy has anything left to send:
//! 1. node-level send queue
//! 2. per-neighbor send queues
//! 3. segment-shuffle scheduler
//! 4. dumb random scheduler
//!
//! Every transmission goes through [`Node::transmit`], which checks the budget
//! and link eligibility first.

use log::trace;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::Node;
use crate::NodeId;
use crate::neighbor::Dim;

/// Consecutive misses after which the dumb random scheduler gives up.
const DUMB_RANDOM_TRIES: usize = 100;

/// A segment pushed from one node to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub from: NodeId,
    pub to: NodeId,
    pub row: usize,
    pub col: usize,
}

/// Resumable state of the segment-shuffle scheduler.
///
/// Holds segments worth sending as `(dimension, line, position)`, each of
/// which is attempted once, in order.
#[derive(Clone, Debug, Default)]
pub struct ShuffleSchedule {
    work: Vec<(Dim, usize, usize)>,
    cursor: usize,
}

impl ShuffleSchedule {
    fn next(&mut self) -> Option<(Dim, usize, usize)> {
        let item = self.work.get(self.cursor).copied();
        self.cursor += 1;
        item
    }
}

impl Node {
    /// Sends as much as possible in this round.
    ///
    /// Returns the deliveries, which the caller hands to their targets.
    /// Malicious nodes never send anything.
    pub fn send(&mut self, rng: &mut impl Rng) -> Vec<Delivery> {
        let mut out = Vec::new();
        if self.malicious {
            return out;
        }

        self.process_send_queue(rng, &mut out);
        if self.has_budget() {
            self.process_per_neighbor_send_queues(rng, &mut out);
        }
        if self.has_budget() && self.behavior.segment_shuffle_scheduler {
            self.run_segment_shuffle_scheduler(rng, &mut out);
        }
        if self.has_budget() && self.behavior.dumb_random_scheduler {
            self.run_dumb_random_scheduler(rng, &mut out);
        }
        out
    }

    /// Per-link cap on segments passing a link of the given dimension.
    fn line_cap(&self, dim: Dim) -> usize {
        match dim {
            Dim::Row => self.behavior.send_line_until_rows,
            Dim::Column => self.behavior.send_line_until_cols,
        }
    }

    /// Whether position `pos` is worth sending to `peer` on the given line.
    ///
    /// A link is no longer served once enough segments passed it for the
    /// peer to repair the line by itself.
    pub fn is_eligible(&self, dim: Dim, line: usize, pos: usize, peer: NodeId) -> bool {
        !self.malicious
            && self.neighbor(dim, line, peer).is_some_and(|neighbor| {
                neighbor.sent_or_received() < self.line_cap(dim) && !neighbor.knows(pos)
            })
    }

    /// Sends position `pos` of a line to `peer`, if budget and link allow.
    ///
    /// Returns `true` iff the segment was sent.
    pub(crate) fn transmit(
        &mut self,
        dim: Dim,
        line: usize,
        pos: usize,
        peer: NodeId,
        out: &mut Vec<Delivery>,
    ) -> bool {
        if !self.has_budget() || !self.is_eligible(dim, line, pos, peer) {
            return false;
        }
        let Some(neighbor) = self.neighbor_mut(dim, line, peer) else {
            return false;
        };
        neighbor.sent.set(pos, true);
        let (row, col) = match dim {
            Dim::Row => (line, pos),
            Dim::Column => (pos, line),
        };
        trace!("node {}: sending {row},{col} to {peer}", self.id);
        self.stats.tx_in_slot += 1;
        self.counters.samples_sent += 1;
        out.push(Delivery {
            from: self.id,
            to: peer,
            row,
            col,
        });
        true
    }

    /// Peers on the given line, shuffled if so configured.
    fn peers(&self, dim: Dim, line: usize, rng: &mut impl Rng) -> Vec<NodeId> {
        let mut peers: Vec<_> = self
            .links(dim)
            .get(&line)
            .map(|l| l.keys().copied().collect())
            .unwrap_or_default();
        if self.behavior.shuffle_neighbors {
            peers.shuffle(rng);
        }
        peers
    }

    /// Fans out segments from the node-level queue in FIFO order.
    ///
    /// An entry is only removed once it went out to all interested
    /// neighbors, so an entry interrupted by the budget resumes next round.
    fn process_send_queue(&mut self, rng: &mut impl Rng, out: &mut Vec<Delivery>) {
        while let Some(&(row, col)) = self.send_queue.front() {
            if self.row_ids.contains(&row) {
                for peer in self.peers(Dim::Row, row, rng) {
                    self.transmit(Dim::Row, row, col, peer, out);
                }
                if !self.has_budget() {
                    return;
                }
            }
            if self.col_ids.contains(&col) {
                for peer in self.peers(Dim::Column, col, rng) {
                    self.transmit(Dim::Column, col, row, peer, out);
                }
                if !self.has_budget() {
                    return;
                }
            }
            self.send_queue.pop_front();
        }
    }

    /// Serves per-neighbor queues round-robin, one entry per link per pass.
    ///
    /// This emulates fair queuing over flows per topic and peer.
    fn process_per_neighbor_send_queues(&mut self, rng: &mut impl Rng, out: &mut Vec<Delivery>) {
        loop {
            let mut queues = Vec::new();
            for dim in [Dim::Row, Dim::Column] {
                for (&line, links) in self.links(dim) {
                    for (&peer, neighbor) in links {
                        if !neighbor.send_queue.is_empty() {
                            queues.push((dim, line, peer));
                        }
                    }
                }
            }
            if queues.is_empty() {
                return;
            }
            if self.behavior.shuffle_queues {
                queues.shuffle(rng);
            }

            for (dim, line, peer) in queues {
                let pos = self
                    .neighbor_mut(dim, line, peer)
                    .and_then(|n| n.send_queue.pop_front());
                if let Some(pos) = pos {
                    self.transmit(dim, line, pos, peer, out);
                }
                if !self.has_budget() {
                    return;
                }
            }
        }
    }

    /// Collects owned segments that at least one link still needs.
    fn collect_segments_to_send(&self) -> Vec<(Dim, usize, usize)> {
        let mut segments = Vec::new();
        for dim in [Dim::Row, Dim::Column] {
            let cap = self.line_cap(dim);
            for (&line, links) in self.links(dim) {
                let owned = match dim {
                    Dim::Row => self.block.row(line),
                    Dim::Column => self.block.column(line),
                };
                for pos in owned.iter_ones() {
                    let needed = links
                        .values()
                        .any(|n| n.sent_or_received() < cap && !n.knows(pos));
                    if needed {
                        segments.push((dim, line, pos));
                    }
                }
            }
        }
        segments
    }

    /// Sends each segment worth sending once, in shuffled order, then repeats.
    ///
    /// Each segment goes to the first eligible neighbor only. If the budget
    /// runs out, the remaining schedule is kept for the next round when
    /// persistence is enabled, and dropped otherwise.
    fn run_segment_shuffle_scheduler(&mut self, rng: &mut impl Rng, out: &mut Vec<Delivery>) {
        loop {
            if let Some(mut schedule) = self.shuffle_state.take() {
                while let Some((dim, line, pos)) = schedule.next() {
                    for peer in self.peers(dim, line, rng) {
                        if self.transmit(dim, line, pos, peer, out) {
                            break;
                        }
                    }
                    if !self.has_budget() {
                        if self.behavior.segment_shuffle_scheduler_persist {
                            self.shuffle_state = Some(schedule);
                        }
                        return;
                    }
                }
            }

            let mut work = self.collect_segments_to_send();
            if work.is_empty() {
                return;
            }
            if self.behavior.shuffle_lines {
                work.shuffle(rng);
            }
            self.shuffle_state = Some(ShuffleSchedule { work, cursor: 0 });
        }
    }

    /// Picks random owned segments and random neighbors.
    ///
    /// Serves as a performance baseline rather than a realistic model.
    fn run_dumb_random_scheduler(&mut self, rng: &mut impl Rng, out: &mut Vec<Delivery>) {
        let rows: Vec<_> = self.row_ids.iter().copied().collect();
        let cols: Vec<_> = self.col_ids.iter().copied().collect();
        let mut misses = 0;
        while misses < DUMB_RANDOM_TRIES {
            if let Some(&row) = rows.choose(rng) {
                let col = rng.random_range(0..self.block.col_count());
                if self.try_random_neighbor(Dim::Row, row, col, rng, out) {
                    misses = 0;
                    if !self.has_budget() {
                        return;
                    }
                }
            }
            if let Some(&col) = cols.choose(rng) {
                let row = rng.random_range(0..self.block.row_count());
                if self.try_random_neighbor(Dim::Column, col, row, rng, out) {
                    misses = 0;
                    if !self.has_budget() {
                        return;
                    }
                }
            }
            misses += 1;
        }
    }

    fn try_random_neighbor(
        &mut self,
        dim: Dim,
        line: usize,
        pos: usize,
        rng: &mut impl Rng,
        out: &mut Vec<Delivery>,
    ) -> bool {
        let owned = match dim {
            Dim::Row => self.block.get(line, pos),
            Dim::Column => self.block.get(pos, line),
        };
        if !owned {
            return false;
        }
        let peers: Vec<_> = self
            .links(dim)
            .get(&line)
            .map(|l| l.keys().copied().collect())
            .unwrap_or_default();
        match peers.choose(rng) {
            Some(&peer) => self.transmit(dim, line, pos, peer, out),
            None => false,
        }
    }
}
