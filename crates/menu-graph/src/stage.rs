//! Legs and composite stages.
//!
//! Both are views over nodes owned by the [`MenuGraph`](crate::graph::MenuGraph)
//! arena: a leg or stage that is shared between chains is the same id, not a
//! copy.

use serde::Serialize;

use crate::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LegId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StageId(pub(crate) usize);

impl LegId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl StageId {
    pub fn index(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// LegUnit
// ---------------------------------------------------------------------------

/// View builder plus reconstruction sequence for one seed in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegUnit {
    name: String,
    step: String,
    seed: String,
    view_builder: NodeId,
    sequence: NodeId,
    trailing: Vec<NodeId>,
    terminal_output: String,
}

impl LegUnit {
    pub(crate) fn new(
        step: &str,
        seed: &str,
        view_builder: NodeId,
        sequence: NodeId,
        sequence_output: String,
    ) -> Self {
        Self {
            name: format!("{step}_{seed}"),
            step: step.to_string(),
            seed: seed.to_string(),
            view_builder,
            sequence,
            trailing: Vec::new(),
            terminal_output: sequence_output,
        }
    }

    /// Merge another processing node onto the end of the leg; it becomes
    /// the leg terminal.
    pub(crate) fn append_trailing(&mut self, node: NodeId, output: String) {
        self.trailing.push(node);
        self.terminal_output = output;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn view_builder(&self) -> NodeId {
        self.view_builder
    }

    pub fn sequence(&self) -> NodeId {
        self.sequence
    }

    pub fn trailing(&self) -> &[NodeId] {
        &self.trailing
    }

    /// The node whose output the acceptance node consumes.
    pub fn terminal(&self) -> NodeId {
        self.trailing.last().copied().unwrap_or(self.sequence)
    }

    pub fn terminal_output(&self) -> &str {
        &self.terminal_output
    }

    /// View builder, sequence, then trailing nodes.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = vec![self.view_builder, self.sequence];
        nodes.extend(&self.trailing);
        nodes
    }
}

// ---------------------------------------------------------------------------
// CompositeStage
// ---------------------------------------------------------------------------

/// One or two legs judged by one acceptance node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeStage {
    name: String,
    step: String,
    legs: Vec<LegId>,
    acceptance: NodeId,
    outputs: Vec<String>,
}

impl CompositeStage {
    pub(crate) fn new(
        step: &str,
        acceptance_name: &str,
        legs: Vec<LegId>,
        acceptance: NodeId,
        outputs: Vec<String>,
    ) -> Self {
        Self {
            name: format!("{step}_{acceptance_name}"),
            step: step.to_string(),
            legs,
            acceptance,
            outputs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    pub fn legs(&self) -> &[LegId] {
        &self.legs
    }

    pub fn acceptance(&self) -> NodeId {
        self.acceptance
    }

    /// Final output names, positional with [`legs`](Self::legs).
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn is_combination(&self) -> bool {
        self.legs.len() == 2
    }
}
