//! Menu validation: lint rules and diagnostics.
//!
//! Rules run over a finished [`MenuGraph`]. Call [`validate`] for advisory
//! diagnostics or [`validate_or_raise`] to fail when any `Error`-severity
//! issue is found.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::{MenuGraph, NodeRole};
use crate::node::Node;

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub node_id: Option<String>,
    pub edge: Option<(String, String)>,
    pub fix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

// ---------------------------------------------------------------------------
// LintRule trait
// ---------------------------------------------------------------------------

pub trait LintRule: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic>;
}

fn is_acceptance(role: NodeRole) -> bool {
    matches!(role, NodeRole::Acceptance | NodeRole::Combination)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

struct UniqueProducerRule;
impl LintRule for UniqueProducerRule {
    fn name(&self) -> &str { "unique_producer" }
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic> {
        let mut first: HashMap<String, String> = HashMap::new();
        let mut diags = Vec::new();
        for (_, node) in graph.nodes() {
            for output in node.output_list().into_iter().filter(|o| !o.is_empty()) {
                match first.get(&output) {
                    Some(owner) if owner != node.name() => diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "Output '{}' is produced by both '{}' and '{}'",
                            output,
                            owner,
                            node.name()
                        ),
                        node_id: Some(node.name().to_string()),
                        edge: None,
                        fix: None,
                    }),
                    Some(_) => {}
                    None => {
                        first.insert(output, node.name().to_string());
                    }
                }
            }
        }
        diags
    }
}

struct InputResolvesRule;
impl LintRule for InputResolvesRule {
    fn name(&self) -> &str { "input_resolves" }
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic> {
        let producers = graph.producers();
        let mut diags = Vec::new();
        for (_, node) in graph.nodes() {
            for input in node.input_list().into_iter().filter(|i| !i.is_empty()) {
                if !producers.contains_key(&input) && !graph.externals().contains(&input) {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "Node '{}' consumes '{}' which nothing produces",
                            node.name(),
                            input
                        ),
                        node_id: Some(node.name().to_string()),
                        edge: None,
                        fix: Some("Check the producing unit declares its output property".into()),
                    });
                }
            }
        }
        diags
    }
}

/// View builders read only filter outputs, and acceptance outputs are read
/// only by filters.
struct FilterIndirectionRule;
impl LintRule for FilterIndirectionRule {
    fn name(&self) -> &str { "filter_indirection" }
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic> {
        let producers = graph.producers();
        let mut diags = Vec::new();
        for (_, node) in graph.nodes() {
            for input in node.input_list() {
                let Some(&from) = producers.get(&input) else {
                    continue;
                };
                let producer = graph.node(from);
                let bad = match node.role() {
                    NodeRole::ViewBuilder => producer.role() != NodeRole::Filter,
                    NodeRole::Filter => false,
                    _ => is_acceptance(producer.role()),
                };
                if bad {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Error,
                        message: format!(
                            "{} '{}' reads '{}' directly from {} '{}' without a filter in between",
                            node.role(),
                            node.name(),
                            input,
                            producer.role(),
                            producer.name()
                        ),
                        node_id: Some(node.name().to_string()),
                        edge: Some((producer.name().to_string(), node.name().to_string())),
                        fix: None,
                    });
                }
            }
        }
        diags
    }
}

struct CombinationLegsBoundRule;
impl LintRule for CombinationLegsBoundRule {
    fn name(&self) -> &str { "combination_legs_bound" }
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic> {
        graph
            .nodes()
            .filter_map(|(_, n)| n.as_combination())
            .filter(|c| c.input_list().iter().any(String::is_empty))
            .map(|c| Diagnostic {
                rule: self.name().into(),
                severity: Severity::Warning,
                message: format!("Combination node '{}' has an unbound leg", c.name()),
                node_id: Some(c.name().to_string()),
                edge: None,
                fix: None,
            })
            .collect()
    }
}

struct DecisionToolsRule;
impl LintRule for DecisionToolsRule {
    fn name(&self) -> &str { "decision_tools" }
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for (_, node) in graph.nodes() {
            let empty = match (node.as_acceptance(), node.as_combination()) {
                (Some(a), _) => a.decision_tools().is_empty(),
                (_, Some(c)) => c.decision_tools().is_empty(),
                _ => false,
            };
            if empty {
                diags.push(Diagnostic {
                    rule: self.name().into(),
                    severity: Severity::Warning,
                    message: format!("Acceptance node '{}' has no decision tools", node.name()),
                    node_id: Some(node.name().to_string()),
                    edge: None,
                    fix: Some("Attach a decision tool for every chain using the stage".into()),
                });
            }
        }
        diags
    }
}

struct DanglingOutputRule;
impl LintRule for DanglingOutputRule {
    fn name(&self) -> &str { "dangling_output" }
    fn apply(&self, graph: &MenuGraph) -> Vec<Diagnostic> {
        let consumed: HashSet<String> = graph
            .nodes()
            .flat_map(|(_, n)| n.input_list())
            .collect();
        let mut diags = Vec::new();
        for (_, node) in graph.nodes() {
            if is_acceptance(node.role()) {
                continue;
            }
            for output in node.output_list() {
                if !output.is_empty() && !consumed.contains(&output) {
                    diags.push(Diagnostic {
                        rule: self.name().into(),
                        severity: Severity::Info,
                        message: format!("Output '{}' of '{}' is never consumed", output, node.name()),
                        node_id: Some(node.name().to_string()),
                        edge: None,
                        fix: None,
                    });
                }
            }
        }
        diags
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run all built-in lint rules and return collected diagnostics.
pub fn validate(graph: &MenuGraph) -> Vec<Diagnostic> {
    let rules: Vec<Box<dyn LintRule>> = vec![
        Box::new(UniqueProducerRule),
        Box::new(InputResolvesRule),
        Box::new(FilterIndirectionRule),
        Box::new(CombinationLegsBoundRule),
        Box::new(DecisionToolsRule),
        Box::new(DanglingOutputRule),
    ];

    let mut diagnostics = Vec::new();
    for rule in &rules {
        diagnostics.extend(rule.apply(graph));
    }
    diagnostics
}

/// Run all lint rules; return `Err` if any `Error`-severity diagnostic found.
pub fn validate_or_raise(graph: &MenuGraph) -> menu_types::Result<Vec<Diagnostic>> {
    let diagnostics = validate(graph);
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    if !errors.is_empty() {
        let messages: Vec<_> = errors.iter().map(|d| d.message.clone()).collect();
        return Err(menu_types::MenuError::ValidationError(messages.join("; ")));
    }
    Ok(diagnostics)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterLayout, FilterNode};
    use crate::graph::GraphNode;
    use crate::node::ProcessingNode;
    use crate::units::ConfigurableUnit;
    use menu_types::PropertyKind;

    fn processing(name: &str, inputs: &[&str]) -> ProcessingNode {
        let unit = ConfigurableUnit::with_properties(
            name,
            "Reco",
            &[("Input", PropertyKind::List), ("Output", PropertyKind::Scalar)],
        );
        let mut node = ProcessingNode::new(Box::new(unit), "Input", Some("Output".into()));
        let _ = node.add_default_output();
        for input in inputs {
            let _ = node.add_input(input);
        }
        node
    }

    fn filter(name: &str, inputs: &[&str]) -> FilterNode {
        let unit = ConfigurableUnit::with_properties(
            name,
            "SequenceFilter",
            &[("Input", PropertyKind::List), ("Output", PropertyKind::List)],
        );
        let mut node = FilterNode::new(Box::new(unit), FilterLayout::default());
        for input in inputs {
            let _ = node.add_input(input);
        }
        node
    }

    fn errors(diags: &[Diagnostic], rule: &str) -> usize {
        diags
            .iter()
            .filter(|d| d.rule == rule && d.severity == Severity::Error)
            .count()
    }

    #[test]
    fn gated_leg_passes() {
        let mut graph = MenuGraph::default();
        graph.add_external("L1_MU6");
        graph.push_node(GraphNode::Filter(filter("F", &["L1_MU6"])));
        graph.push_node(GraphNode::ViewBuilder(processing("VB", &["F_from_L1_MU6"])));
        graph.push_node(GraphNode::Sequence(processing("Seq", &["VB_Output_out"])));

        let diags = validate(&graph);
        let errs: Vec<_> = diags.iter().filter(|d| d.severity == Severity::Error).collect();
        assert!(errs.is_empty(), "Expected no errors, got: {errs:?}");
        // the sequence output is consumed by nobody
        assert!(diags
            .iter()
            .any(|d| d.rule == "dangling_output" && d.node_id.as_deref() == Some("Seq")));
    }

    #[test]
    fn unresolved_input_is_error() {
        let mut graph = MenuGraph::default();
        graph.push_node(GraphNode::Sequence(processing("Seq", &["nowhere"])));
        let diags = validate(&graph);
        assert_eq!(errors(&diags, "input_resolves"), 1);
        assert!(matches!(
            validate_or_raise(&graph),
            Err(menu_types::MenuError::ValidationError(ref m)) if m.contains("nowhere")
        ));
    }

    #[test]
    fn view_builder_reading_sequence_breaks_indirection() {
        let mut graph = MenuGraph::default();
        graph.push_node(GraphNode::Sequence(processing("Seq", &[])));
        graph.push_node(GraphNode::ViewBuilder(processing("VB", &["Seq_Output_out"])));
        let diags = validate(&graph);
        assert_eq!(errors(&diags, "filter_indirection"), 1);
        let diag = diags.iter().find(|d| d.rule == "filter_indirection").unwrap();
        assert_eq!(diag.edge, Some(("Seq".to_string(), "VB".to_string())));
    }

    #[test]
    fn duplicate_producer_is_error() {
        let mut graph = MenuGraph::default();
        let mut a = processing("A", &[]);
        let _ = a.set_output("shared");
        let mut b = processing("B", &[]);
        let _ = b.set_output("shared");
        graph.push_node(GraphNode::Sequence(a));
        graph.push_node(GraphNode::Sequence(b));
        assert_eq!(errors(&validate(&graph), "unique_producer"), 1);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
    }
}
