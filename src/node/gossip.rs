// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Custody announcements with immediate pull responses.
//!
//! On heartbeat rounds, a node announces its custody to a random subset of
//! its neighbors on one random custody row and one random custody column.
//! Each peer then pulls whatever the announcer holds within its custody
//! that the peer is still missing, in the same round.

use log::debug;
use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};

use super::Node;
use crate::NodeId;
use crate::neighbor::Dim;

impl Node {
    /// Selects the peers to announce custody to in this round.
    ///
    /// Malicious nodes do not gossip.
    pub fn gossip_targets(&self, rng: &mut impl Rng) -> Vec<NodeId> {
        let mut targets = Vec::new();
        if self.malicious {
            return targets;
        }
        for dim in [Dim::Row, Dim::Column] {
            let ids = match dim {
                Dim::Row => &self.row_ids,
                Dim::Column => &self.col_ids,
            };
            let Some(line) = ids.iter().choose(rng) else {
                continue;
            };
            let peers: Vec<NodeId> = self
                .links(dim)
                .get(line)
                .map(|l| l.keys().copied().collect())
                .unwrap_or_default();
            if peers.is_empty() {
                continue;
            }
            let amount = rng.random_range(1..=peers.len());
            targets.extend(peers.choose_multiple(rng, amount).copied());
        }
        targets
    }

    /// Announces custody to `puller`, which pulls all segments it lacks.
    ///
    /// Pull responses count against this node's uplink budget.
    /// Returns the number of segments pulled.
    pub fn serve_gossip(&mut self, puller: &mut Node) -> usize {
        if self.malicious {
            return 0;
        }
        self.counters.messages_sent += 1;
        puller.counters.messages_received += 1;

        let mut pulled = 0;
        'custody: for &row in &self.row_ids {
            for &col in &self.col_ids {
                if !self.block.get(row, col)
                    || puller.block.get(row, col)
                    || puller.received_block.get(row, col)
                {
                    continue;
                }
                if !self.has_budget() {
                    break 'custody;
                }
                // request and response
                puller.counters.messages_sent += 1;
                self.counters.samples_sent += 1;
                self.stats.tx_in_slot += 1;
                puller.received_block.set(row, col);
                puller.counters.samples_received += 1;
                puller.stats.rx_in_slot += 1;
                pulled += 1;
            }
        }
        if pulled > 0 {
            debug!(
                "node {}: {pulled} segments pulled via gossip from {}",
                puller.id, self.id
            );
        }
        pulled
    }
}
