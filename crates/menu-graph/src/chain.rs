//! Chain-level glue: steps, stage-to-filter bindings, and group seeds.

use crate::graph::NodeId;
use crate::stage::StageId;

/// A stage bound to the filter that gates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageBinding {
    pub stage: StageId,
    pub filter: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub name: String,
    pub bindings: Vec<StageBinding>,
}

impl ChainStep {
    pub fn stages(&self) -> impl Iterator<Item = StageId> + '_ {
        self.bindings.iter().map(|b| b.stage)
    }

    pub fn filters(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bindings.iter().map(|b| b.filter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    name: String,
    seed: String,
    steps: Vec<ChainStep>,
}

impl Chain {
    pub(crate) fn new(name: &str, seed: &str, steps: Vec<ChainStep>) -> Self {
        Self {
            name: name.to_string(),
            seed: seed.to_string(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn group_seed(&self) -> Vec<String> {
        group_seeds(&self.seed)
    }
}

/// `"L1_MU6_EM10"` -> `["MU", "EM"]`: drop the leading global token and strip
/// the non-alphabetic suffix of every remaining token.
pub fn group_seeds(seed: &str) -> Vec<String> {
    seed.split('_')
        .skip(1)
        .map(|token| token.trim_end_matches(|c: char| !c.is_ascii_alphabetic()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
