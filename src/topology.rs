//! Network topology construction and path lookup.
//!
//! Builds the node/link graph the channel simulation runs over and answers
//! neighbor and shortest-path queries. Three generation policies are
//! supported (grid / random / cluster); all of them are deterministic under
//! a fixed RNG seed so tests can pin down exact layouts.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Identifier of a node in the network.
pub type NodeId = u32;

/// Side length of the square world nodes are placed in.
const WORLD_SIZE: f64 = 100.0;

/// Spacing between adjacent grid nodes.
const GRID_SPACING: f64 = 10.0;

/// Probability that any unordered node pair is linked in the random policy.
const LINK_PROBABILITY: f64 = 0.5;

/// Roughly one cluster head per this many nodes in the cluster policy.
const NODES_PER_CLUSTER: usize = 4;

/// Simple 2D point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Node with a position for renderers; links live in the adjacency map.
#[derive(Debug, Clone)]
pub struct Node {
    pub node_id: NodeId,
    pub position: Point,
}

/// Topology generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    Grid,
    Random,
    Cluster,
}

/// Read-only graph queries the simulation core depends on.
///
/// A `None` path result means "no route" and is not an error of this
/// component; callers retry with a fresh pair on a later tick.
pub trait TopologyProvider {
    /// All node ids, in ascending order.
    fn node_ids(&self) -> Vec<NodeId>;
    /// Direct neighbors of `node`, in ascending order.
    fn neighbors(&self, node: NodeId) -> Vec<NodeId>;
    /// Shortest path from `source` to `target` in hops, endpoints included.
    fn shortest_path(&self, source: NodeId, target: NodeId) -> Option<Vec<NodeId>>;
}

/// Node/link graph with positions.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<Node>,
    adjacency: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl Topology {
    /// Generate a topology of `node_count` nodes under the given policy.
    pub fn generate(kind: TopologyKind, node_count: usize, rng: &mut StdRng) -> Self {
        match kind {
            TopologyKind::Grid => Self::generate_grid(node_count),
            TopologyKind::Random => Self::generate_random(node_count, rng),
            TopologyKind::Cluster => Self::generate_cluster(node_count, rng),
        }
    }

    /// Square lattice with links between horizontal and vertical neighbors.
    fn generate_grid(node_count: usize) -> Self {
        let side = (node_count as f64).sqrt().ceil() as usize;
        let nodes = (0..node_count)
            .map(|i| Node {
                node_id: i as NodeId,
                position: Point {
                    x: (i % side) as f64 * GRID_SPACING,
                    y: (i / side) as f64 * GRID_SPACING,
                },
            })
            .collect();
        let mut topology = Self::from_nodes(nodes);
        for i in 0..node_count {
            if (i + 1) % side != 0 && i + 1 < node_count {
                topology.add_link(i as NodeId, (i + 1) as NodeId);
            }
            if i + side < node_count {
                topology.add_link(i as NodeId, (i + side) as NodeId);
            }
        }
        topology
    }

    /// Uniform random positions; each pair linked with fixed probability.
    fn generate_random(node_count: usize, rng: &mut StdRng) -> Self {
        let nodes = Self::random_nodes(node_count, rng);
        let mut topology = Self::from_nodes(nodes);
        for i in 0..node_count {
            for j in (i + 1)..node_count {
                if rng.gen_bool(LINK_PROBABILITY) {
                    topology.add_link(i as NodeId, j as NodeId);
                }
            }
        }
        topology
    }

    /// Cluster layout: a subset of nodes act as cluster heads, every other
    /// node links to its nearest head, and heads are fully interconnected.
    fn generate_cluster(node_count: usize, rng: &mut StdRng) -> Self {
        let nodes = Self::random_nodes(node_count, rng);
        let head_count = (node_count / NODES_PER_CLUSTER).max(1).min(node_count);
        let heads: BTreeSet<NodeId> = index::sample(rng, node_count, head_count)
            .iter()
            .map(|i| i as NodeId)
            .collect();

        let mut topology = Self::from_nodes(nodes);
        for node in topology.nodes.clone() {
            if heads.contains(&node.node_id) {
                continue;
            }
            let nearest = heads
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    let da = distance2(&node.position, &topology.nodes[a as usize].position);
                    let db = distance2(&node.position, &topology.nodes[b as usize].position);
                    da.total_cmp(&db)
                })
                .expect("at least one cluster head exists");
            topology.add_link(node.node_id, nearest);
        }
        let head_list: Vec<NodeId> = heads.into_iter().collect();
        for (i, &a) in head_list.iter().enumerate() {
            for &b in &head_list[i + 1..] {
                topology.add_link(a, b);
            }
        }
        topology
    }

    /// Fully connected graph; positions on a line. Intended for tests.
    pub fn fully_connected(node_count: usize) -> Self {
        let nodes = (0..node_count)
            .map(|i| Node {
                node_id: i as NodeId,
                position: Point {
                    x: i as f64 * GRID_SPACING,
                    y: 0.0,
                },
            })
            .collect();
        let mut topology = Self::from_nodes(nodes);
        for i in 0..node_count {
            for j in (i + 1)..node_count {
                topology.add_link(i as NodeId, j as NodeId);
            }
        }
        topology
    }

    fn random_nodes(node_count: usize, rng: &mut StdRng) -> Vec<Node> {
        (0..node_count)
            .map(|i| Node {
                node_id: i as NodeId,
                position: Point {
                    x: rng.gen_range(0.0..WORLD_SIZE),
                    y: rng.gen_range(0.0..WORLD_SIZE),
                },
            })
            .collect()
    }

    fn from_nodes(nodes: Vec<Node>) -> Self {
        let adjacency = nodes.iter().map(|n| (n.node_id, BTreeSet::new())).collect();
        Self { nodes, adjacency }
    }

    /// Add an undirected link between two existing nodes.
    pub fn add_link(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        if let Some(set) = self.adjacency.get_mut(&a) {
            set.insert(b);
        }
        if let Some(set) = self.adjacency.get_mut(&b) {
            set.insert(a);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl TopologyProvider for Topology {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.node_id).collect()
    }

    fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.adjacency
            .get(&node)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Breadth-first search over unweighted links.
    fn shortest_path(&self, source: NodeId, target: NodeId) -> Option<Vec<NodeId>> {
        if !self.adjacency.contains_key(&source) || !self.adjacency.contains_key(&target) {
            return None;
        }
        if source == target {
            return Some(vec![source]);
        }

        let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::from([source]);
        while let Some(current) = queue.pop_front() {
            for &next in &self.adjacency[&current] {
                if next == source || prev.contains_key(&next) {
                    continue;
                }
                prev.insert(next, current);
                if next == target {
                    let mut path = vec![target];
                    let mut at = target;
                    while at != source {
                        at = prev[&at];
                        path.push(at);
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }
}

fn distance2(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}
