//! Graphviz dump of the data-flow graph, for debugging menus.

use crate::graph::{MenuGraph, NodeRole};
use crate::node::Node;

fn shape(role: NodeRole) -> &'static str {
    match role {
        NodeRole::ViewBuilder => "invhouse",
        NodeRole::Sequence => "box",
        NodeRole::Acceptance => "hexagon",
        NodeRole::Combination => "doubleoctagon",
        NodeRole::Filter => "diamond",
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Render `graph` as a `digraph`. Edges are labelled with the name that
/// flows along them; external seeds are drawn as plain text.
pub fn to_dot(graph: &MenuGraph) -> String {
    let mut dot = String::from("digraph menu {\n  rankdir=LR\n");

    for external in graph.externals() {
        dot.push_str(&format!("  {} [shape=\"plaintext\"]\n", quote(external)));
    }
    for (_, node) in graph.nodes() {
        dot.push_str(&format!(
            "  {} [shape=\"{}\", role=\"{}\"]\n",
            quote(node.name()),
            shape(node.role()),
            node.role()
        ));
    }

    let producers = graph.producers();
    for (_, node) in graph.nodes() {
        for input in node.input_list().into_iter().filter(|i| !i.is_empty()) {
            let from = match producers.get(&input) {
                Some(&id) => graph.node(id).name().to_string(),
                None if graph.externals().contains(&input) => input.clone(),
                None => continue,
            };
            dot.push_str(&format!(
                "  {} -> {} [label={}]\n",
                quote(&from),
                quote(node.name()),
                quote(&input)
            ));
        }
    }

    dot.push_str("}\n");
    dot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterLayout, FilterNode};
    use crate::graph::GraphNode;
    use crate::node::ProcessingNode;
    use crate::units::ConfigurableUnit;
    use menu_types::PropertyKind;

    #[test]
    fn dumps_nodes_edges_and_externals() {
        let mut graph = MenuGraph::default();
        graph.add_external("L1_MU6");

        let unit = ConfigurableUnit::with_properties(
            "F",
            "SequenceFilter",
            &[("Input", PropertyKind::List), ("Output", PropertyKind::List)],
        );
        let mut filter = FilterNode::new(Box::new(unit), FilterLayout::default());
        let (gate, _) = filter.add_input("L1_MU6");
        graph.push_node(GraphNode::Filter(filter));

        let unit = ConfigurableUnit::with_properties(
            "VB",
            "InputMaker",
            &[("Input", PropertyKind::List), ("Output", PropertyKind::Scalar)],
        );
        let mut vb = ProcessingNode::new(Box::new(unit), "Input", Some("Output".into()));
        let _ = vb.add_input(&gate);
        graph.push_node(GraphNode::ViewBuilder(vb));

        let dot = to_dot(&graph);
        assert!(dot.starts_with("digraph menu {"));
        assert!(dot.contains("\"L1_MU6\" [shape=\"plaintext\"]"));
        assert!(dot.contains("\"F\" [shape=\"diamond\", role=\"filter\"]"));
        assert!(dot.contains("\"L1_MU6\" -> \"F\" [label=\"L1_MU6\"]"));
        assert!(dot.contains("\"F\" -> \"VB\" [label=\"F_from_L1_MU6\"]"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }
}
