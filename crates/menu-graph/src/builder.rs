//! Memoizing menu builder.
//!
//! Chains are folded step by step into one [`MenuGraph`]. Anything two chains
//! have in common is built once and shared:
//!
//! - legs by `(step, seed)`,
//! - stages by `(step, seeds, acceptance unit)`,
//! - filters by `(step, gated inputs)`.
//!
//! Every output name is claimed in a build-scoped [`NameRegistry`] the moment
//! it is finalized, so a collision fails the build at its source.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use menu_types::{Leg, MenuError, Result, ToolFactory, Unit, UnitFactory};

use crate::acceptance::{AcceptanceNode, CombinationAcceptanceNode, Registration};
use crate::chain::{Chain, ChainStep, StageBinding};
use crate::classify::LegRules;
use crate::filter::FilterNode;
use crate::graph::{GraphNode, MenuGraph, NodeId};
use crate::node::{Node, ProcessingNode, PropertyWrite};
use crate::registry::NameRegistry;
use crate::spec::{AcceptanceSpec, BuildConfig, ChainSpec, LegSpec, UnitSpec};
use crate::stage::{CompositeStage, LegId, LegUnit, StageId};
use crate::validation::{validate_or_raise, Diagnostic};

/// Counts and findings of one build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub chains: usize,
    pub nodes: usize,
    pub externals: usize,
    pub legs_built: usize,
    pub legs_reused: usize,
    pub stages_built: usize,
    pub stages_reused: usize,
    pub filters_built: usize,
    pub filters_reused: usize,
    /// Rejected property writes, as `"unit.property"`.
    pub missing_properties: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

type StageKey = (String, Vec<String>, String);

pub struct MenuBuilder<'f> {
    config: BuildConfig,
    rules: LegRules,
    units: &'f dyn UnitFactory,
    tools: &'f dyn ToolFactory,
    graph: MenuGraph,
    registry: NameRegistry,
    legs: HashMap<(String, String), LegId>,
    stages: HashMap<StageKey, StageId>,
    filters: HashMap<(String, Vec<String>), NodeId>,
    acceptances: HashMap<String, NodeId>,
    report: BuildReport,
}

impl<'f> MenuBuilder<'f> {
    pub fn new(config: BuildConfig, units: &'f dyn UnitFactory, tools: &'f dyn ToolFactory) -> Self {
        let rules = LegRules::from_config(&config.leg_rules);
        Self {
            config,
            rules,
            units,
            tools,
            graph: MenuGraph::default(),
            registry: NameRegistry::new(),
            legs: HashMap::new(),
            stages: HashMap::new(),
            filters: HashMap::new(),
            acceptances: HashMap::new(),
            report: BuildReport::default(),
        }
    }

    /// Replace the leg classifiers derived from the configuration.
    pub fn with_rules(mut self, rules: LegRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    /// Fold one chain into the graph.
    pub fn add_chain(&mut self, spec: &ChainSpec) -> Result<()> {
        if spec.steps.is_empty() {
            return Err(invalid(&spec.name, "chain has no steps"));
        }
        if self.graph.chain(&spec.name).is_some() {
            return Err(invalid(&spec.name, "chain is defined twice"));
        }

        // (seed, output) per leg of the previous step
        let mut previous: Option<Vec<(String, String)>> = None;
        let mut steps = Vec::with_capacity(spec.steps.len());
        for step in &spec.steps {
            let seeds: Vec<String> = step.legs.iter().map(|l| l.seed.clone()).collect();
            check_legs(&spec.name, &step.name, &seeds)?;

            let inputs = match previous.take() {
                None => {
                    for seed in &seeds {
                        self.registry.declare_external(seed);
                        self.graph.add_external(seed);
                    }
                    seeds.clone()
                }
                Some(outputs) => continue_legs(&spec.name, &step.name, &seeds, &outputs)?,
            };

            let (filter, gates) = self.filter_for(&spec.name, &step.name, &inputs, &seeds)?;
            let legs = step
                .legs
                .iter()
                .zip(&gates)
                .map(|(leg, gate)| self.leg_for(&step.name, leg, gate))
                .collect::<Result<Vec<_>>>()?;

            let tool = step.acceptance.tool.as_deref().unwrap_or(&spec.name);
            let stage = self.stage_for(&spec.name, &step.name, &legs, &gates, &step.acceptance, tool)?;

            previous = Some(
                seeds
                    .iter()
                    .cloned()
                    .zip(self.graph.stage(stage).outputs().iter().cloned())
                    .collect(),
            );
            steps.push(ChainStep {
                name: step.name.clone(),
                bindings: vec![StageBinding { stage, filter }],
            });
        }

        debug!(chain = %spec.name, steps = steps.len(), "chain assembled");
        self.graph.push_chain(Chain::new(&spec.name, &spec.seed, steps));
        Ok(())
    }

    /// Order-check, validate, and freeze the graph.
    pub fn finish(mut self) -> Result<(MenuGraph, BuildReport)> {
        self.graph.topological_order()?;
        let diagnostics = validate_or_raise(&self.graph)?;

        self.report.chains = self.graph.chains().len();
        self.report.nodes = self.graph.node_count();
        self.report.externals = self.graph.externals().len();
        self.report.diagnostics = diagnostics;
        info!(
            chains = self.report.chains,
            nodes = self.report.nodes,
            missing_properties = self.report.missing_properties.len(),
            "menu built"
        );
        Ok((self.graph, self.report))
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    /// Filter gating `inputs` for `step`; returns it with the gate name for
    /// each input, positionally.
    fn filter_for(
        &mut self,
        chain: &str,
        step: &str,
        inputs: &[String],
        seeds: &[String],
    ) -> Result<(NodeId, Vec<String>)> {
        let mut key_inputs = inputs.to_vec();
        key_inputs.sort();
        key_inputs.dedup();
        let key = (step.to_string(), key_inputs);

        let id = match self.filters.get(&key) {
            Some(&id) => {
                self.report.filters_reused += 1;
                debug!(filter = %self.graph.node(id).name(), chain, "filter reused");
                id
            }
            None => {
                let id = self.build_filter(step, inputs, seeds)?;
                self.filters.insert(key, id);
                self.report.filters_built += 1;
                id
            }
        };

        let filter = self.graph.filter_mut(id)?;
        let write = filter.add_chain(chain);
        for seed in seeds {
            filter.add_seed(seed);
        }
        let gates = inputs
            .iter()
            .map(|input| filter.output_for(input).unwrap_or_default().to_string())
            .collect();
        self.record(write)?;
        Ok((id, gates))
    }

    fn build_filter(&mut self, step: &str, inputs: &[String], seeds: &[String]) -> Result<NodeId> {
        let base = format!("{}_{}_{}", self.config.filter_prefix, step, seeds.join("_"));
        let mut name = base.clone();
        let mut n = 2;
        while self.registry.unit_taken(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }

        let layout = self.config.filter.clone();
        let unit = self.create_unit(&layout.kind, &name)?;
        let mut filter = FilterNode::new(unit, layout);
        let mut writes = Vec::new();
        for input in inputs {
            let (output, w) = filter.add_input(input);
            writes.extend(w);
            self.registry.claim_output(&output, &name)?;
        }
        self.record_all(writes)?;

        debug!(filter = %name, ?inputs, "filter built");
        Ok(self.graph.push_node(GraphNode::Filter(filter)))
    }

    // -----------------------------------------------------------------------
    // Legs
    // -----------------------------------------------------------------------

    fn leg_for(&mut self, step: &str, spec: &LegSpec, gate: &str) -> Result<LegId> {
        let key = (step.to_string(), spec.seed.clone());
        if let Some(&id) = self.legs.get(&key) {
            self.report.legs_reused += 1;
            let mismatched = self.leg_mismatches(id, spec);
            if !mismatched.is_empty() {
                warn!(leg = %self.graph.leg(id).name(), ?mismatched,
                    "leg reused with different units; keeping the existing ones");
            }
            let vb = self.graph.leg(id).view_builder();
            let write = self.graph.processing_mut(vb)?.add_input(gate);
            self.record(write)?;
            debug!(leg = %self.graph.leg(id).name(), "leg reused");
            return Ok(id);
        }

        let (mut view_builder, vb_output) = self.processing_node(&spec.view_builder)?;
        let write = view_builder.add_input(gate);
        self.record(write)?;
        let vb = self.graph.push_node(GraphNode::ViewBuilder(view_builder));

        let (mut sequence, seq_output) = self.processing_node(&spec.sequence)?;
        let write = sequence.add_input(&vb_output);
        self.record(write)?;
        let seq = self.graph.push_node(GraphNode::Sequence(sequence));

        let mut leg = LegUnit::new(step, &spec.seed, vb, seq, seq_output);
        for trailing in &spec.sequence.trailing {
            let (mut node, output) = self.processing_node(trailing)?;
            let write = node.add_input(leg.terminal_output());
            self.record(write)?;
            let id = self.graph.push_node(GraphNode::Sequence(node));
            leg.append_trailing(id, output);
        }

        debug!(leg = %leg.name(), terminal = %leg.terminal_output(), "leg built");
        let id = self.graph.push_leg(leg);
        self.legs.insert(key, id);
        self.report.legs_built += 1;
        Ok(id)
    }

    /// Parts of `spec` whose unit names differ from the built leg `id`.
    fn leg_mismatches(&self, id: LegId, spec: &LegSpec) -> Vec<&'static str> {
        let graph = &self.graph;
        let leg = graph.leg(id);
        let name_of = move |node: NodeId| graph.node(node).name();
        let mut mismatched = Vec::new();
        if name_of(leg.view_builder()) != spec.view_builder.name {
            mismatched.push("view_builder");
        }
        if name_of(leg.sequence()) != spec.sequence.name {
            mismatched.push("sequence");
        }
        let trailing = leg.trailing().iter().map(|&n| name_of(n));
        if !trailing.eq(spec.sequence.trailing.iter().map(|t| t.name.as_str())) {
            mismatched.push("trailing");
        }
        mismatched
    }

    /// Instantiate a processing node and claim its default output.
    fn processing_node(&mut self, spec: &UnitSpec) -> Result<(ProcessingNode, String)> {
        let unit = self.create_unit(&spec.kind, &spec.name)?;
        let mut node = ProcessingNode::new(unit, spec.input.clone(), Some(spec.output.clone()));
        let write = node.add_default_output();
        self.record(write)?;
        let output = node.default_output().unwrap_or_default().to_string();
        self.registry.claim_output(&output, &spec.name)?;
        Ok((node, output))
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    fn stage_for(
        &mut self,
        chain: &str,
        step: &str,
        legs: &[LegId],
        gates: &[String],
        acceptance: &AcceptanceSpec,
        tool: &str,
    ) -> Result<StageId> {
        let seeds: Vec<String> = legs
            .iter()
            .map(|&l| self.graph.leg(l).seed().to_string())
            .collect();
        let key = (step.to_string(), seeds, acceptance.name.clone());

        let id = match self.stages.get(&key) {
            Some(&id) => {
                self.report.stages_reused += 1;
                debug!(stage = %self.graph.stage(id).name(), chain, "stage reused");
                id
            }
            None => {
                let id = match legs {
                    [leg] => self.single_stage(step, *leg, acceptance)?,
                    [first, second] => {
                        self.combination_stage(chain, step, [*first, *second], gates, acceptance)?
                    }
                    _ => return Err(invalid(chain, "stages take one or two legs")),
                };
                self.stages.insert(key, id);
                self.report.stages_built += 1;
                id
            }
        };

        self.attach_tool(self.graph.stage(id).acceptance(), tool, &acceptance.tool_kind)?;
        Ok(id)
    }

    fn single_stage(&mut self, step: &str, leg: LegId, spec: &AcceptanceSpec) -> Result<StageId> {
        let seed = self.graph.leg(leg).seed().to_string();
        let terminal = self.graph.leg(leg).terminal_output().to_string();

        let acc = match self.acceptances.get(&spec.name) {
            Some(&id) => {
                let node = self.graph.acceptance_mut(id).map_err(|_| {
                    invalid(&spec.name, "acceptance unit is used both as a single-leg and a combination node")
                })?;
                let single_valued = node
                    .base()
                    .raw_property(&spec.output)
                    .is_some_and(|v| !v.is_list());
                if single_valued {
                    return Err(invalid(
                        &spec.name,
                        "acceptance unit is shared by stages with different seeds but its output property holds a single name",
                    ));
                }
                id
            }
            None => {
                let unit = self.create_unit(&spec.kind, &spec.name)?;
                let (node, write) = AcceptanceNode::new(unit, &spec.input, &spec.output, &spec.tools);
                self.record(write)?;
                let id = self.graph.push_node(GraphNode::Acceptance(node));
                self.acceptances.insert(spec.name.clone(), id);
                id
            }
        };

        let node = self.graph.acceptance_mut(acc)?;
        let mut writes = Vec::new();
        if let Registration::Added(write) = node.add_upstream_source(&terminal) {
            writes.push(write);
        }
        let output = format!("{}_{}", seed, node.default_output());
        writes.push(node.set_output(&output));
        self.record_all(writes)?;
        self.registry.claim_output(&output, &spec.name)?;

        debug!(acceptance = %spec.name, %output, "single-leg stage built");
        Ok(self.graph.push_stage(CompositeStage::new(
            step,
            &spec.name,
            vec![leg],
            acc,
            vec![output],
        )))
    }

    fn combination_stage(
        &mut self,
        chain: &str,
        step: &str,
        legs: [LegId; 2],
        gates: &[String],
        spec: &AcceptanceSpec,
    ) -> Result<StageId> {
        if self.acceptances.contains_key(&spec.name) {
            return Err(invalid(
                chain,
                &format!("combination unit '{}' is already bound to other legs", spec.name),
            ));
        }

        let unit = self.create_unit(&spec.kind, &spec.name)?;
        let layout = spec.combination.clone().unwrap_or_default();
        let (node, writes) = CombinationAcceptanceNode::new(unit, &spec.input, &spec.tools, layout);
        self.record_all(writes)?;
        let acc = self.graph.push_node(GraphNode::Combination(node));
        self.acceptances.insert(spec.name.clone(), acc);

        let mut outputs = Vec::with_capacity(2);
        for (position, &leg_id) in legs.iter().enumerate() {
            let leg = self.graph.leg(leg_id);
            let seed = leg.seed().to_string();
            let terminal = leg.terminal_output().to_string();
            let view_builder = self.graph.node(leg.view_builder()).name().to_string();
            let gate = gates.get(position).map(String::as_str).unwrap_or_default();
            let hints = [gate, view_builder.as_str()];

            let node = self.graph.combination_mut(acc)?;
            let assignment = node.add_upstream_source_hinted(&terminal, &hints, &self.rules)?;
            if assignment.leg.index() != position {
                debug!(acceptance = %spec.name, %terminal, position, slot = assignment.leg.index(),
                    "leg routed to the other input slot");
            }

            let slot = Leg::BOTH[position];
            let output = format!("{}_{}", seed, node.default_output_slot(slot));
            let mut writes = assignment.writes;
            writes.push(node.set_output_slot(slot, &output));
            self.record_all(writes)?;
            self.registry.claim_output(&output, &spec.name)?;
            outputs.push(output);
        }

        debug!(acceptance = %spec.name, ?outputs, "combination stage built");
        Ok(self.graph.push_stage(CompositeStage::new(
            step,
            &spec.name,
            legs.to_vec(),
            acc,
            outputs,
        )))
    }

    fn attach_tool(&mut self, acceptance: NodeId, tool: &str, kind: &str) -> Result<()> {
        let tools = self.tools;
        let writes = match self.graph.node_mut(acceptance) {
            GraphNode::Acceptance(node) => vec![node.add_decision_tool(tool, kind, tools)?],
            GraphNode::Combination(node) => node.add_decision_tool(tool, kind, tools)?,
            other => {
                return Err(MenuError::Other(format!(
                    "node '{}' cannot host decision tools",
                    other.name()
                )))
            }
        };
        self.record_all(writes)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn create_unit(&mut self, kind: &str, name: &str) -> Result<Box<dyn Unit>> {
        self.registry.claim_unit(name)?;
        self.units.create_unit(kind, name)
    }

    /// Rejected writes are fatal in strict mode; otherwise logged and counted.
    fn record(&mut self, write: PropertyWrite) -> Result<()> {
        let Some(err) = write.into_error() else {
            return Ok(());
        };
        if self.config.strict_properties {
            return Err(err);
        }
        if let MenuError::MissingProperty { ref unit, ref property } = err {
            warn!(%unit, %property, "property write rejected by unit; continuing");
            self.report
                .missing_properties
                .push(format!("{unit}.{property}"));
        }
        Ok(())
    }

    fn record_all(&mut self, writes: impl IntoIterator<Item = PropertyWrite>) -> Result<()> {
        for write in writes {
            self.record(write)?;
        }
        Ok(())
    }
}

fn invalid(chain: &str, message: &str) -> MenuError {
    MenuError::InvalidSpec {
        chain: chain.to_string(),
        message: message.to_string(),
    }
}

fn check_legs(chain: &str, step: &str, seeds: &[String]) -> Result<()> {
    match seeds {
        [] => Err(invalid(chain, &format!("step '{step}' has no legs"))),
        [_] => Ok(()),
        [a, b] if a == b => Err(invalid(
            chain,
            &format!("step '{step}' combines seed '{a}' with itself"),
        )),
        [_, _] => Ok(()),
        _ => Err(invalid(
            chain,
            &format!("step '{step}' has {} legs; at most two are supported", seeds.len()),
        )),
    }
}

/// Gate inputs for `seeds`, taken from the previous step's output on the
/// same seed. Legs may be listed in any order but must continue the same
/// seeds.
fn continue_legs(
    chain: &str,
    step: &str,
    seeds: &[String],
    previous: &[(String, String)],
) -> Result<Vec<String>> {
    if seeds.len() != previous.len() {
        return Err(invalid(
            chain,
            &format!(
                "step '{step}' has {} legs but the previous step produced {} outputs",
                seeds.len(),
                previous.len()
            ),
        ));
    }
    seeds
        .iter()
        .map(|seed| {
            previous
                .iter()
                .find(|(prev, _)| prev == seed)
                .map(|(_, output)| output.clone())
                .ok_or_else(|| {
                    invalid(
                        chain,
                        &format!("step '{step}' leg '{seed}' does not continue a leg of the previous step"),
                    )
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{SchemaToolFactory, SchemaUnitFactory, UnitSchema};
    use menu_types::PropertyKind;

    fn factory() -> SchemaUnitFactory {
        let mut f = SchemaUnitFactory::new();
        let io = UnitSchema::new([("Input", PropertyKind::List), ("Output", PropertyKind::Scalar)]);
        f.register("InputMaker", io.clone());
        f.register("RecoSeq", io);
        f.register(
            "HypoAlg",
            UnitSchema::new([
                ("PreviousDecisions", PropertyKind::List),
                ("Output", PropertyKind::Scalar),
                ("DecisionTools", PropertyKind::List),
            ]),
        );
        f.register(
            "SequenceFilter",
            UnitSchema::new([
                ("Input", PropertyKind::List),
                ("Output", PropertyKind::List),
                ("Chains", PropertyKind::List),
            ]),
        );
        f
    }

    fn muon_chain(name: &str, hypo: &str) -> ChainSpec {
        ChainSpec {
            name: name.into(),
            seed: "L1_MU6".into(),
            steps: vec![crate::spec::StepSpec {
                name: "Step1".into(),
                legs: vec![LegSpec {
                    seed: "L1_MU6".into(),
                    view_builder: UnitSpec::new("InputMaker", "MuInputMaker_Step1"),
                    sequence: UnitSpec::new("RecoSeq", "MuFastSeq"),
                }],
                acceptance: AcceptanceSpec::new("HypoAlg", hypo, "MuHypoTool"),
            }],
        }
    }

    #[test]
    fn single_leg_chain_wiring() {
        let units = factory();
        let tools = SchemaToolFactory::any();
        let mut builder = MenuBuilder::new(BuildConfig::default(), &units, &tools);
        builder.add_chain(&muon_chain("HLT_mu6", "MuFastHypo")).unwrap();
        let (graph, report) = builder.finish().unwrap();

        let stage = &graph.stages()[0];
        assert_eq!(stage.outputs(), ["L1_MU6_MuFastHypo_Output_out"]);
        let hypo = graph.node(stage.acceptance()).as_acceptance().unwrap();
        assert_eq!(hypo.previous_decisions(), ["MuFastSeq_Output_out"]);
        assert_eq!(hypo.tool_ids(), vec!["HLT_mu6"]);

        let vb = graph.find("MuInputMaker_Step1").unwrap();
        assert_eq!(
            graph.node(vb).input_list(),
            vec!["Filter_Step1_L1_MU6_from_L1_MU6".to_string()]
        );
        assert_eq!(report.legs_built, 1);
        assert_eq!(report.filters_built, 1);
        assert!(report.missing_properties.is_empty());
    }

    #[test]
    fn second_chain_shares_everything_and_adds_tool() {
        let units = factory();
        let tools = SchemaToolFactory::any();
        let mut builder = MenuBuilder::new(BuildConfig::default(), &units, &tools);
        builder.add_chain(&muon_chain("HLT_mu6", "MuFastHypo")).unwrap();
        builder.add_chain(&muon_chain("HLT_mu6_idperf", "MuFastHypo")).unwrap();
        let (graph, report) = builder.finish().unwrap();

        assert_eq!(report.legs_reused, 1);
        assert_eq!(report.stages_reused, 1);
        assert_eq!(report.filters_reused, 1);
        let hypo = graph.find("MuFastHypo").unwrap();
        assert_eq!(
            graph.node(hypo).as_acceptance().unwrap().tool_ids(),
            vec!["HLT_mu6", "HLT_mu6_idperf"]
        );
        let (_, filter) = graph.filters().next().unwrap();
        assert_eq!(filter.chains(), ["HLT_mu6", "HLT_mu6_idperf"]);
    }

    #[test]
    fn duplicate_chain_name_rejected() {
        let units = factory();
        let tools = SchemaToolFactory::any();
        let mut builder = MenuBuilder::new(BuildConfig::default(), &units, &tools);
        builder.add_chain(&muon_chain("HLT_mu6", "MuFastHypo")).unwrap();
        assert!(matches!(
            builder.add_chain(&muon_chain("HLT_mu6", "MuFastHypo")),
            Err(MenuError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn empty_chain_rejected() {
        let units = factory();
        let tools = SchemaToolFactory::any();
        let mut builder = MenuBuilder::new(BuildConfig::default(), &units, &tools);
        let mut chain = muon_chain("HLT_x", "H");
        chain.steps.clear();
        assert!(matches!(
            builder.add_chain(&chain),
            Err(MenuError::InvalidSpec { ref chain, .. }) if chain == "HLT_x"
        ));
    }

    #[test]
    fn leg_count_checks() {
        let seeds = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(check_legs("c", "s", &seeds(&["A"])).is_ok());
        assert!(check_legs("c", "s", &seeds(&["A", "B"])).is_ok());
        assert!(check_legs("c", "s", &seeds(&[])).is_err());
        assert!(check_legs("c", "s", &seeds(&["A", "A"])).is_err());
        assert!(check_legs("c", "s", &seeds(&["A", "B", "C"])).is_err());
    }

    #[test]
    fn later_steps_follow_legs_by_seed() {
        let previous = vec![
            ("L1_A6".to_string(), "out_a".to_string()),
            ("L1_B10".to_string(), "out_b".to_string()),
        ];
        let seeds = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(
            continue_legs("c", "Step2", &seeds(&["L1_B10", "L1_A6"]), &previous).unwrap(),
            ["out_b", "out_a"]
        );
        assert!(matches!(
            continue_legs("c", "Step2", &seeds(&["L1_A6", "L1_C3"]), &previous),
            Err(MenuError::InvalidSpec { ref message, .. }) if message.contains("L1_C3")
        ));
        assert!(continue_legs("c", "Step2", &seeds(&["L1_A6"]), &previous).is_err());
    }

    #[test]
    fn reused_leg_reports_differing_units() {
        let units = factory();
        let tools = SchemaToolFactory::any();
        let mut builder = MenuBuilder::new(BuildConfig::default(), &units, &tools);
        let chain = muon_chain("HLT_mu6", "MuFastHypo");
        builder.add_chain(&chain).unwrap();
        let id = builder.legs[&("Step1".to_string(), "L1_MU6".to_string())];

        let same = &chain.steps[0].legs[0];
        assert!(builder.leg_mismatches(id, same).is_empty());

        let mut other = same.clone();
        other.sequence.name = "MuFastSeqAlt".into();
        assert_eq!(builder.leg_mismatches(id, &other), ["sequence"]);

        other.view_builder.name = "OtherInputMaker".into();
        other.sequence.trailing.push(UnitSpec::new("RecoSeq", "MuExtra"));
        assert_eq!(
            builder.leg_mismatches(id, &other),
            ["view_builder", "sequence", "trailing"]
        );
    }

    #[test]
    fn unknown_kind_propagates() {
        let units = SchemaUnitFactory::new();
        let tools = SchemaToolFactory::any();
        let mut builder = MenuBuilder::new(BuildConfig::default(), &units, &tools);
        assert!(matches!(
            builder.add_chain(&muon_chain("HLT_mu6", "MuFastHypo")),
            Err(MenuError::UnknownKind { .. })
        ));
    }
}
