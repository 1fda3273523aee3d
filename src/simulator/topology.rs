// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Overlay construction.
//!
//! Every row and every column is a separate topic. Nodes following a topic
//! form a channel, connected as a random regular graph (or a complete graph
//! for small channels). Each edge becomes a [`Neighbor`] on both endpoints.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, error};
use rand::Rng;
use rand::seq::{SliceRandom, index};
use thiserror::Error;

use crate::NodeId;
use crate::config::Config;
use crate::neighbor::{Dim, Neighbor};
use crate::node::{Node, PROPOSER_ID};
use crate::shape::Shape;

/// Attempts at pairing stubs before random regular graph generation gives up.
const MAX_ATTEMPTS: usize = 1000;

/// Adjacency sets of an undirected graph over nodes `0..n`.
pub type Adjacency = Vec<BTreeSet<usize>>;

/// Errors from random regular graph generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("n * d must be even (n = {n}, d = {d})")]
    OddStubs { n: usize, d: usize },
    #[error("degree {d} too large for {n} nodes")]
    DegreeTooLarge { n: usize, d: usize },
    #[error("no simple {d}-regular graph found after {attempts} attempts")]
    Exhausted { d: usize, attempts: usize },
}

/// Returns the complete graph over `n` nodes.
pub fn complete_graph(n: usize) -> Adjacency {
    (0..n).map(|i| (0..n).filter(|&j| j != i).collect()).collect()
}

/// Generates a uniformly random simple `d`-regular graph over `n` nodes.
///
/// Uses the pairing model of Steger and Wormald: stubs are paired at random,
/// and stubs that would form loops or parallel edges are re-paired until
/// none are left or the remaining stubs cannot be paired anymore.
pub fn random_regular_graph(
    d: usize,
    n: usize,
    rng: &mut impl Rng,
) -> Result<Adjacency, TopologyError> {
    if (n * d) % 2 != 0 {
        return Err(TopologyError::OddStubs { n, d });
    }
    if d >= n && n > 0 {
        return Err(TopologyError::DegreeTooLarge { n, d });
    }
    if d == 0 {
        return Ok(vec![BTreeSet::new(); n]);
    }

    for _ in 0..MAX_ATTEMPTS {
        if let Some(edges) = try_pairing(d, n, rng) {
            let mut adjacency = vec![BTreeSet::new(); n];
            for (u, v) in edges {
                adjacency[u].insert(v);
                adjacency[v].insert(u);
            }
            return Ok(adjacency);
        }
    }
    Err(TopologyError::Exhausted {
        d,
        attempts: MAX_ATTEMPTS,
    })
}

fn try_pairing(d: usize, n: usize, rng: &mut impl Rng) -> Option<BTreeSet<(usize, usize)>> {
    let mut edges = BTreeSet::new();
    let mut stubs: Vec<usize> = (0..d).flat_map(|_| 0..n).collect();
    while !stubs.is_empty() {
        let mut potential = BTreeMap::<usize, usize>::new();
        stubs.shuffle(rng);
        for pair in stubs.chunks_exact(2) {
            let (u, v) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
            if u != v && edges.insert((u, v)) {
                continue;
            }
            *potential.entry(u).or_default() += 1;
            *potential.entry(v).or_default() += 1;
        }
        if !suitable(&edges, &potential) {
            return None;
        }
        stubs = potential
            .iter()
            .flat_map(|(&node, &count)| std::iter::repeat_n(node, count))
            .collect();
    }
    Some(edges)
}

/// Whether some pair of the remaining stubs can still become a new edge.
fn suitable(edges: &BTreeSet<(usize, usize)>, potential: &BTreeMap<usize, usize>) -> bool {
    if potential.is_empty() {
        return true;
    }
    let nodes: Vec<_> = potential.keys().copied().collect();
    for (i, &u) in nodes.iter().enumerate() {
        for &v in &nodes[..i] {
            if !edges.contains(&(v.min(u), v.max(u))) {
                return true;
            }
        }
    }
    false
}

/// Whether the graph is connected (the empty graph is).
pub fn is_connected(adjacency: &Adjacency) -> bool {
    if adjacency.is_empty() {
        return true;
    }
    let mut visited = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([0]);
    visited[0] = true;
    let mut reached = 1;
    while let Some(u) = queue.pop_front() {
        for &v in &adjacency[u] {
            if !visited[v] {
                visited[v] = true;
                reached += 1;
                queue.push_back(v);
            }
        }
    }
    reached == adjacency.len()
}

/// Builds the channel graph for `n` members.
///
/// Small channels are complete graphs, larger ones `degree`-regular.
/// Falls back to the complete graph if no regular graph can be found.
pub fn channel_graph(n: usize, degree: usize, rng: &mut impl Rng) -> Adjacency {
    if n <= degree + 1 {
        return complete_graph(n);
    }
    match random_regular_graph(degree, n, rng) {
        Ok(adjacency) => adjacency,
        Err(err) => {
            error!("channel graph generation failed, using complete graph: {err}");
            complete_graph(n)
        }
    }
}

/// Connects all nodes on every row and column topic.
///
/// `nodes[i]` must have id `i`, the proposer being node 0.
pub fn build(nodes: &mut [Node], shape: &Shape, config: &Config, rng: &mut impl Rng) {
    for row in 0..shape.row_count {
        let members = channel_members(nodes, config, |n| n.row_ids.contains(&row));
        connect_channel(nodes, Dim::Row, row, shape.col_count, &members, shape, rng);
        if config.proposer_publish_only {
            let publish_to = config.publish_to_rows(shape);
            connect_publisher(nodes, Dim::Row, row, shape.col_count, &members, publish_to, rng);
        }
    }
    for col in 0..shape.col_count {
        let members = channel_members(nodes, config, |n| n.col_ids.contains(&col));
        connect_channel(nodes, Dim::Column, col, shape.row_count, &members, shape, rng);
        if config.proposer_publish_only {
            let publish_to = config.publish_to_cols(shape);
            connect_publisher(nodes, Dim::Column, col, shape.row_count, &members, publish_to, rng);
        }
    }
}

/// Ids of the nodes following a topic.
///
/// The proposer only joins when it does not just publish.
fn channel_members(
    nodes: &[Node],
    config: &Config,
    follows: impl Fn(&Node) -> bool,
) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|n| !(n.proposer && config.proposer_publish_only) && follows(n))
        .map(|n| n.id)
        .collect()
}

fn connect_channel(
    nodes: &mut [Node],
    dim: Dim,
    line: usize,
    line_len: usize,
    members: &[NodeId],
    shape: &Shape,
    rng: &mut impl Rng,
) {
    if members.is_empty() {
        error!("{dim:?} {line} has no members");
        return;
    }
    let graph = channel_graph(members.len(), shape.net_degree, rng);
    if !is_connected(&graph) {
        error!("graph of {dim:?} {line} is not connected");
    }
    for (u, adjacent) in graph.iter().enumerate() {
        let id = members[u];
        let links = nodes[id as usize].links_mut(dim).entry(line).or_default();
        for &v in adjacent {
            let peer = members[v];
            links.insert(peer, Neighbor::new(peer, dim, line_len));
        }
    }
    debug!("{dim:?} {line}: {} members", members.len());
}

/// Gives the proposer one-directional links to some channel members.
fn connect_publisher(
    nodes: &mut [Node],
    dim: Dim,
    line: usize,
    line_len: usize,
    members: &[NodeId],
    publish_to: usize,
    rng: &mut impl Rng,
) {
    let amount = publish_to.min(members.len());
    let links = nodes[PROPOSER_ID as usize]
        .links_mut(dim)
        .entry(line)
        .or_default();
    for i in index::sample(rng, members.len(), amount) {
        let peer = members[i];
        links.insert(peer, Neighbor::new(peer, dim, line_len));
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::test_utils::small_shape;

    fn nodes(shape: &Shape, config: &Config, rng: &mut StdRng) -> Vec<Node> {
        let mut nodes = vec![Node::proposer(shape, config)];
        for id in 1..shape.node_count as NodeId {
            nodes.push(Node::new(id, false, shape, config, rng));
        }
        nodes
    }

    #[test]
    fn complete() {
        let graph = complete_graph(5);
        assert!(graph.iter().all(|adj| adj.len() == 4));
        assert!(is_connected(&graph));
        assert!(complete_graph(0).is_empty());
        assert!(is_connected(&complete_graph(1)));
    }

    #[test]
    fn regular_degrees() {
        let mut rng = StdRng::seed_from_u64(1);
        for (d, n) in [(2, 10), (4, 9), (6, 50), (8, 100), (3, 20)] {
            let graph = random_regular_graph(d, n, &mut rng).unwrap();
            assert_eq!(graph.len(), n);
            for (u, adjacent) in graph.iter().enumerate() {
                assert_eq!(adjacent.len(), d);
                assert!(!adjacent.contains(&u));
                assert!(adjacent.iter().all(|v| graph[*v].contains(&u)));
            }
        }
    }

    #[test]
    fn regular_errors() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(
            random_regular_graph(3, 5, &mut rng),
            Err(TopologyError::OddStubs { n: 5, d: 3 })
        );
        assert_eq!(
            random_regular_graph(6, 6, &mut rng),
            Err(TopologyError::DegreeTooLarge { n: 6, d: 6 })
        );
        assert_eq!(random_regular_graph(0, 4, &mut rng).unwrap().len(), 4);
    }

    #[test]
    fn connectivity() {
        let mut graph = complete_graph(3);
        graph.push(BTreeSet::new());
        assert!(!is_connected(&graph));
    }

    #[test]
    fn channel_sizes() {
        let mut rng = StdRng::seed_from_u64(3);
        let small = channel_graph(7, 6, &mut rng);
        assert!(small.iter().all(|adj| adj.len() == 6));
        let large = channel_graph(30, 6, &mut rng);
        assert!(large.iter().all(|adj| adj.len() == 6));
        let tiny = channel_graph(3, 6, &mut rng);
        assert!(tiny.iter().all(|adj| adj.len() == 2));
    }

    #[test]
    fn links_follow_custody() {
        let shape = small_shape();
        let config = Config::default();
        let mut rng = StdRng::seed_from_u64(4);
        let mut nodes = nodes(&shape, &config, &mut rng);
        build(&mut nodes, &shape, &config, &mut rng);

        for node in &nodes[1..] {
            assert!(node.row_neighbors.keys().all(|r| node.row_ids.contains(r)));
            assert!(node.col_neighbors.keys().all(|c| node.col_ids.contains(c)));
            for (row, links) in &node.row_neighbors {
                for (peer, neighbor) in links {
                    assert_ne!(*peer, PROPOSER_ID);
                    assert_eq!(neighbor.sent.len(), shape.col_count);
                    // links are symmetric
                    assert!(nodes[*peer as usize].neighbor(Dim::Row, *row, node.id).is_some());
                }
            }
        }

        let proposer = &nodes[0];
        for row in 0..shape.row_count {
            let followers = nodes[1..].iter().filter(|n| n.row_ids.contains(&row)).count();
            let links = proposer.row_neighbors.get(&row).map_or(0, |l| l.len());
            assert_eq!(links, followers.min(shape.net_degree));
        }
    }

    #[test]
    fn proposer_joins_channels() {
        let shape = small_shape();
        let config = Config {
            proposer_publish_only: false,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut nodes = nodes(&shape, &config, &mut rng);
        build(&mut nodes, &shape, &config, &mut rng);
        let proposer = &nodes[0];
        for (row, links) in &proposer.row_neighbors {
            for peer in links.keys() {
                assert!(nodes[*peer as usize].neighbor(Dim::Row, *row, PROPOSER_ID).is_some());
            }
        }
        assert_eq!(proposer.row_neighbors.len(), shape.row_count);
    }
}
