//! Pass/fail gates between steps, and their per-event evaluation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use menu_types::{PropertyValue, Unit};

use crate::node::{Node, NodeIdentity, ProcessingNode, PropertyWrite};

/// Property names a filter unit is wired through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterLayout {
    pub kind: String,
    pub input: String,
    pub output: String,
    pub chains: String,
}

impl Default for FilterLayout {
    fn default() -> Self {
        Self {
            kind: "SequenceFilter".into(),
            input: "Input".into(),
            output: "Output".into(),
            chains: "Chains".into(),
        }
    }
}

/// Names with at least one surviving object in one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionRecord {
    passed: BTreeSet<String>,
}

impl DecisionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.passed.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.passed.contains(name)
    }
}

impl<S: Into<String>> FromIterator<S> for DecisionRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            passed: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Per-output verdicts of one filter for one event, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    verdicts: Vec<(String, bool)>,
}

impl FilterOutcome {
    /// The filter passes the event when any of its inputs passed.
    pub fn passed(&self) -> bool {
        self.verdicts.iter().any(|(_, ok)| *ok)
    }

    pub fn verdicts(&self) -> &[(String, bool)] {
        &self.verdicts
    }

    pub fn accepted(&self) -> Vec<&str> {
        self.verdicts
            .iter()
            .filter(|(_, ok)| *ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FilterNode
// ---------------------------------------------------------------------------

/// A gate with one output per upstream decision it reads.
///
/// The node has no single output property, so it never synthesizes a default
/// output. Outputs are positional: output `i` is open exactly when input `i`
/// passed, and is named `"{filter}_from_{input}"`.
#[derive(Debug)]
pub struct FilterNode {
    base: ProcessingNode,
    layout: FilterLayout,
    wiring: Vec<(String, String)>,
    seeds: Vec<String>,
    chains: Vec<String>,
}

impl FilterNode {
    pub fn new(unit: Box<dyn Unit>, layout: FilterLayout) -> Self {
        let base = ProcessingNode::new(unit, layout.input.clone(), None);
        Self {
            base,
            layout,
            wiring: Vec::new(),
            seeds: Vec::new(),
            chains: Vec::new(),
        }
    }

    pub fn base(&self) -> &ProcessingNode {
        &self.base
    }

    /// Gate `input`; returns the output name that opens when it passes.
    pub fn add_input(&mut self, input: &str) -> (String, Vec<PropertyWrite>) {
        if let Some(output) = self.output_for(input) {
            return (output.to_string(), Vec::new());
        }
        let output = format!("{}_from_{}", self.name(), input);
        let writes = vec![
            self.base.set_input(input),
            self.base.set_property(&self.layout.output, &output),
        ];
        self.wiring.push((input.to_string(), output.clone()));
        (output, writes)
    }

    pub fn output_for(&self, input: &str) -> Option<&str> {
        self.wiring
            .iter()
            .find(|(i, _)| i == input)
            .map(|(_, o)| o.as_str())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.wiring.iter().map(|(i, _)| i.as_str())
    }

    /// Returns `false` when the seed was already listed.
    pub fn add_seed(&mut self, seed: &str) -> bool {
        if self.seeds.iter().any(|s| s == seed) {
            return false;
        }
        self.seeds.push(seed.to_string());
        true
    }

    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    pub fn add_chain(&mut self, chain: &str) -> PropertyWrite {
        if self.chains.iter().any(|c| c == chain) {
            return PropertyWrite::Skipped;
        }
        self.chains.push(chain.to_string());
        self.base.add_property(&self.layout.chains, chain)
    }

    /// Replace the serviced chain list.
    pub fn set_chains<S: AsRef<str>>(&mut self, chains: &[S]) -> PropertyWrite {
        self.chains.clear();
        for chain in chains {
            let chain = chain.as_ref();
            if !self.chains.iter().any(|c| c == chain) {
                self.chains.push(chain.to_string());
            }
        }
        self.base
            .set_value(&self.layout.chains, PropertyValue::List(self.chains.clone()))
    }

    pub fn chains(&self) -> &[String] {
        &self.chains
    }

    pub fn evaluate(&self, record: &DecisionRecord) -> FilterOutcome {
        FilterOutcome {
            verdicts: self
                .wiring
                .iter()
                .map(|(input, output)| (output.clone(), record.contains(input)))
                .collect(),
        }
    }
}

impl Node for FilterNode {
    fn identity(&self) -> &NodeIdentity {
        self.base.identity()
    }

    fn input_list(&self) -> Vec<String> {
        self.base.input_list()
    }

    fn output_list(&self) -> Vec<String> {
        self.base.get_property(&self.layout.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::ConfigurableUnit;
    use menu_types::PropertyKind;

    fn filter(name: &str) -> FilterNode {
        let unit = ConfigurableUnit::with_properties(
            name,
            "SequenceFilter",
            &[
                ("Input", PropertyKind::List),
                ("Output", PropertyKind::List),
                ("Chains", PropertyKind::List),
            ],
        );
        FilterNode::new(Box::new(unit), FilterLayout::default())
    }

    #[test]
    fn outputs_are_positional_per_input() {
        let mut f = filter("Filter_Step1");
        let (a, _) = f.add_input("L1_MU6");
        let (b, _) = f.add_input("L1_EM10");
        assert_eq!(a, "Filter_Step1_from_L1_MU6");
        assert_eq!(b, "Filter_Step1_from_L1_EM10");
        assert_eq!(f.input_list(), vec!["L1_MU6".to_string(), "L1_EM10".to_string()]);
        assert_eq!(f.output_list(), vec![a, b]);
    }

    #[test]
    fn repeated_input_is_noop() {
        let mut f = filter("F");
        let (first, writes) = f.add_input("L1_MU6");
        assert_eq!(writes.len(), 2);
        let (again, writes) = f.add_input("L1_MU6");
        assert_eq!(first, again);
        assert!(writes.is_empty());
        assert_eq!(f.input_list().len(), 1);
    }

    #[test]
    fn filter_has_no_default_output() {
        let f = filter("F");
        assert!(f.base().default_output().is_none());
        assert!(f.output_list().is_empty());
        assert_eq!(f.identity().output_property(), None);
    }

    #[test]
    fn seeds_and_chains_deduplicate() {
        let mut f = filter("F");
        assert!(f.add_seed("L1_MU6"));
        assert!(!f.add_seed("L1_MU6"));
        assert_eq!(f.add_chain("HLT_a"), PropertyWrite::Applied);
        assert_eq!(f.add_chain("HLT_a"), PropertyWrite::Skipped);
        assert_eq!(f.add_chain("HLT_b"), PropertyWrite::Applied);
        assert_eq!(f.chains(), ["HLT_a", "HLT_b"]);
        assert_eq!(
            f.base().get_property("Chains"),
            vec!["HLT_a".to_string(), "HLT_b".to_string()]
        );
    }

    #[test]
    fn set_chains_replaces() {
        let mut f = filter("F");
        let _ = f.add_chain("old");
        assert_eq!(f.set_chains(&["x", "y", "x"]), PropertyWrite::Applied);
        assert_eq!(f.chains(), ["x", "y"]);
        assert_eq!(f.base().get_property("Chains"), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn evaluate_is_an_or_gate() {
        let mut f = filter("F");
        let (mu, _) = f.add_input("L1_MU6");
        let (em, _) = f.add_input("L1_EM10");

        let outcome = f.evaluate(&DecisionRecord::from_iter(["L1_EM10"]));
        assert!(outcome.passed());
        assert_eq!(outcome.verdicts(), [(mu.clone(), false), (em.clone(), true)]);
        assert_eq!(outcome.accepted(), vec![em.as_str()]);

        let outcome = f.evaluate(&DecisionRecord::new());
        assert!(!outcome.passed());
        assert!(outcome.accepted().is_empty());
    }

    #[test]
    fn missing_output_property_is_reported() {
        let unit = ConfigurableUnit::with_properties("F", "Bare", &[("Input", PropertyKind::List)]);
        let mut f = FilterNode::new(Box::new(unit), FilterLayout::default());
        let (_, writes) = f.add_input("L1_MU6");
        assert_eq!(writes[0], PropertyWrite::Applied);
        assert!(writes[1].is_missing());
    }
}
