//! `MenuGraph`: arena owning every node, leg, stage and chain of one menu.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use menu_types::{MenuError, Result};

use crate::acceptance::{AcceptanceNode, CombinationAcceptanceNode};
use crate::chain::Chain;
use crate::filter::FilterNode;
use crate::node::{Node, NodeIdentity, ProcessingNode};
use crate::stage::{CompositeStage, LegId, LegUnit, StageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    ViewBuilder,
    Sequence,
    Acceptance,
    Combination,
    Filter,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeRole::ViewBuilder => "view_builder",
            NodeRole::Sequence => "sequence",
            NodeRole::Acceptance => "acceptance",
            NodeRole::Combination => "combination",
            NodeRole::Filter => "filter",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub enum GraphNode {
    ViewBuilder(ProcessingNode),
    /// Reconstruction sequences and the trailing nodes merged after them.
    Sequence(ProcessingNode),
    Acceptance(AcceptanceNode),
    Combination(CombinationAcceptanceNode),
    Filter(FilterNode),
}

impl GraphNode {
    pub fn role(&self) -> NodeRole {
        match self {
            GraphNode::ViewBuilder(_) => NodeRole::ViewBuilder,
            GraphNode::Sequence(_) => NodeRole::Sequence,
            GraphNode::Acceptance(_) => NodeRole::Acceptance,
            GraphNode::Combination(_) => NodeRole::Combination,
            GraphNode::Filter(_) => NodeRole::Filter,
        }
    }

    pub fn as_processing(&self) -> Option<&ProcessingNode> {
        match self {
            GraphNode::ViewBuilder(n) | GraphNode::Sequence(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_acceptance(&self) -> Option<&AcceptanceNode> {
        match self {
            GraphNode::Acceptance(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_combination(&self) -> Option<&CombinationAcceptanceNode> {
        match self {
            GraphNode::Combination(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_filter(&self) -> Option<&FilterNode> {
        match self {
            GraphNode::Filter(n) => Some(n),
            _ => None,
        }
    }

    /// Base node of any variant, for property reads.
    pub fn processing(&self) -> &ProcessingNode {
        match self {
            GraphNode::ViewBuilder(n) | GraphNode::Sequence(n) => n,
            GraphNode::Acceptance(n) => n.base(),
            GraphNode::Combination(n) => n.base(),
            GraphNode::Filter(n) => n.base(),
        }
    }

    fn as_dyn(&self) -> &dyn Node {
        match self {
            GraphNode::ViewBuilder(n) | GraphNode::Sequence(n) => n,
            GraphNode::Acceptance(n) => n,
            GraphNode::Combination(n) => n,
            GraphNode::Filter(n) => n,
        }
    }
}

impl Node for GraphNode {
    fn identity(&self) -> &NodeIdentity {
        self.as_dyn().identity()
    }

    fn input_list(&self) -> Vec<String> {
        self.as_dyn().input_list()
    }

    fn output_list(&self) -> Vec<String> {
        self.as_dyn().output_list()
    }
}

// ---------------------------------------------------------------------------
// MenuGraph
// ---------------------------------------------------------------------------

/// Every node of one menu, addressed by [`NodeId`].
///
/// Mutation is crate-private: once the builder returns the graph it is
/// read-only and can be handed to a concurrent scheduler.
#[derive(Debug, Default)]
pub struct MenuGraph {
    nodes: Vec<GraphNode>,
    legs: Vec<LegUnit>,
    stages: Vec<CompositeStage>,
    chains: Vec<Chain>,
    externals: BTreeSet<String>,
}

impl MenuGraph {
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find(&self, unit_name: &str) -> Option<NodeId> {
        self.nodes().find(|(_, n)| n.name() == unit_name).map(|(id, _)| id)
    }

    pub fn filters(&self) -> impl Iterator<Item = (NodeId, &FilterNode)> {
        self.nodes().filter_map(|(id, n)| n.as_filter().map(|f| (id, f)))
    }

    pub fn leg(&self, id: LegId) -> &LegUnit {
        &self.legs[id.0]
    }

    pub fn legs(&self) -> &[LegUnit] {
        &self.legs
    }

    pub fn stage(&self, id: StageId) -> &CompositeStage {
        &self.stages[id.0]
    }

    pub fn stages(&self) -> &[CompositeStage] {
        &self.stages
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name() == name)
    }

    /// Names consumed from outside the graph.
    pub fn externals(&self) -> &BTreeSet<String> {
        &self.externals
    }

    /// Output name -> producing node. The first producer wins when a name
    /// is (incorrectly) produced twice.
    pub fn producers(&self) -> HashMap<String, NodeId> {
        let mut producers = HashMap::new();
        for (id, node) in self.nodes() {
            for output in node.output_list() {
                if !output.is_empty() {
                    producers.entry(output).or_insert(id);
                }
            }
        }
        producers
    }

    /// Producer edges `(from, to)`, deduplicated and sorted.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let producers = self.producers();
        let mut edges = BTreeSet::new();
        for (id, node) in self.nodes() {
            for input in node.input_list() {
                if let Some(&from) = producers.get(&input) {
                    edges.insert((from, id));
                }
            }
        }
        edges.into_iter().collect()
    }

    /// Kahn ordering over producer edges. Ties resolve in creation order.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut downstream: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (from, to) in self.edges() {
            in_degree[to.0] += 1;
            downstream.entry(from).or_default().push(to);
        }

        let mut ready: VecDeque<NodeId> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .map(NodeId)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for &next in downstream.get(&id).into_iter().flatten() {
                in_degree[next.0] -= 1;
                if in_degree[next.0] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let nodes = (0..self.nodes.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.nodes[i].name().to_string())
                .collect();
            return Err(MenuError::CyclicGraph { nodes });
        }
        Ok(order)
    }

    // --- crate-private construction ---

    pub(crate) fn push_node(&mut self, node: GraphNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn processing_mut(&mut self, id: NodeId) -> Result<&mut ProcessingNode> {
        match self.node_mut(id) {
            GraphNode::ViewBuilder(n) | GraphNode::Sequence(n) => Ok(n),
            other => Err(MenuError::Other(format!(
                "node '{}' is a {}, not a processing node",
                other.name(),
                other.role()
            ))),
        }
    }

    pub(crate) fn acceptance_mut(&mut self, id: NodeId) -> Result<&mut AcceptanceNode> {
        match self.node_mut(id) {
            GraphNode::Acceptance(n) => Ok(n),
            other => Err(MenuError::Other(format!(
                "node '{}' is a {}, not an acceptance node",
                other.name(),
                other.role()
            ))),
        }
    }

    pub(crate) fn combination_mut(&mut self, id: NodeId) -> Result<&mut CombinationAcceptanceNode> {
        match self.node_mut(id) {
            GraphNode::Combination(n) => Ok(n),
            other => Err(MenuError::Other(format!(
                "node '{}' is a {}, not a combination node",
                other.name(),
                other.role()
            ))),
        }
    }

    pub(crate) fn filter_mut(&mut self, id: NodeId) -> Result<&mut FilterNode> {
        match self.node_mut(id) {
            GraphNode::Filter(n) => Ok(n),
            other => Err(MenuError::Other(format!(
                "node '{}' is a {}, not a filter",
                other.name(),
                other.role()
            ))),
        }
    }

    pub(crate) fn push_leg(&mut self, leg: LegUnit) -> LegId {
        self.legs.push(leg);
        LegId(self.legs.len() - 1)
    }

    pub(crate) fn push_stage(&mut self, stage: CompositeStage) -> StageId {
        self.stages.push(stage);
        StageId(self.stages.len() - 1)
    }

    pub(crate) fn push_chain(&mut self, chain: Chain) {
        self.chains.push(chain);
    }

    pub(crate) fn add_external(&mut self, name: &str) {
        self.externals.insert(name.to_string());
    }
}
