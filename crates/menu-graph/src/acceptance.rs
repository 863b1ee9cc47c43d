//! Acceptance nodes: single-leg hypothesis nodes and two-leg combination nodes.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use menu_types::{Leg, MenuError, PropertyValue, QuantityKind, Result, ToolFactory, ToolHandle, Unit};

use crate::classify::LegRules;
use crate::node::{Node, NodeIdentity, ProcessingNode, PropertyWrite};

/// Result of registering an upstream stage on an acceptance node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Added(PropertyWrite),
    AlreadyRegistered,
}

// ---------------------------------------------------------------------------
// AcceptanceNode
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AcceptanceNode {
    base: ProcessingNode,
    tools_property: String,
    tools: Vec<ToolHandle>,
    previous: Vec<String>,
}

impl AcceptanceNode {
    /// Wrap `unit`; the upstream sources are written to `input_property` and
    /// the default output `"{unit}_{output_property}_out"` is synthesized.
    pub fn new(
        unit: Box<dyn Unit>,
        input_property: &str,
        output_property: &str,
        tools_property: &str,
    ) -> (Self, PropertyWrite) {
        let mut base = ProcessingNode::new(unit, input_property, Some(output_property.to_string()));
        let write = base.add_default_output();
        let node = Self {
            base,
            tools_property: tools_property.to_string(),
            tools: Vec::new(),
            previous: Vec::new(),
        };
        (node, write)
    }

    /// No single output property; used by combination nodes, which own two slots.
    fn without_output(unit: Box<dyn Unit>, input_property: &str, tools_property: &str) -> Self {
        Self {
            base: ProcessingNode::new(unit, input_property, None),
            tools_property: tools_property.to_string(),
            tools: Vec::new(),
            previous: Vec::new(),
        }
    }

    pub fn base(&self) -> &ProcessingNode {
        &self.base
    }

    pub fn default_output(&self) -> &str {
        self.base.default_output().unwrap_or_default()
    }

    /// Scalar outputs are replaced. A list-valued output drops the
    /// synthesized default and gains `name` once, so one node can publish a
    /// renamed output per upstream seed.
    pub fn set_output(&mut self, name: &str) -> PropertyWrite {
        let Some(property) = self.base.identity().output_property().map(str::to_string) else {
            return PropertyWrite::Skipped;
        };
        match self.base.raw_property(&property) {
            Some(PropertyValue::List(mut items)) => {
                items.retain(|item| Some(item.as_str()) != self.base.default_output());
                if !items.iter().any(|item| item == name) {
                    items.push(name.to_string());
                }
                self.base.set_value(&property, PropertyValue::List(items))
            }
            _ => self.base.set_output(name),
        }
    }

    /// Instantiate a decision tool of `kind` named `id` and attach it. An id
    /// that is already attached is left alone.
    pub fn add_decision_tool(
        &mut self,
        id: &str,
        kind: &str,
        factory: &dyn ToolFactory,
    ) -> Result<PropertyWrite> {
        if self.tools.iter().any(|t| t.name == id) {
            return Ok(PropertyWrite::Skipped);
        }
        let handle = factory.create_decision_tool(kind, id)?;
        self.tools.push(handle);
        let property = self.tools_property.clone();
        Ok(self.base.set_property(&property, id))
    }

    pub fn decision_tools(&self) -> &[ToolHandle] {
        &self.tools
    }

    pub fn tool_ids(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn add_upstream_source(&mut self, name: &str) -> Registration {
        if self.already_registered(name) {
            return Registration::AlreadyRegistered;
        }
        self.previous.push(name.to_string());
        Registration::Added(self.base.add_input(name))
    }

    pub fn already_registered(&self, name: &str) -> bool {
        self.previous.iter().any(|p| p == name)
    }

    pub fn previous_decisions(&self) -> &[String] {
        &self.previous
    }
}

impl Node for AcceptanceNode {
    fn identity(&self) -> &NodeIdentity {
        self.base.identity()
    }

    fn input_list(&self) -> Vec<String> {
        self.base.input_list()
    }

    fn output_list(&self) -> Vec<String> {
        self.base.output_list()
    }
}

// ---------------------------------------------------------------------------
// CombinationAcceptanceNode
// ---------------------------------------------------------------------------

/// Property names of the two slots of a combination unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinationLayout {
    pub inputs: [String; 2],
    pub outputs: [String; 2],
    /// Properties holding each slot's quantity tag (`"pt"`, `"et"`).
    pub slot_properties: [String; 2],
    pub thresholds: [String; 2],
}

impl Default for CombinationLayout {
    fn default() -> Self {
        Self {
            inputs: ["Input1".into(), "Input2".into()],
            outputs: ["Output1".into(), "Output2".into()],
            slot_properties: ["Property1".into(), "Property2".into()],
            thresholds: ["threshold1".into(), "threshold2".into()],
        }
    }
}

/// Which leg an upstream source landed on, and the rule that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegAssignment {
    pub leg: Leg,
    /// `None` when the source was already registered.
    pub rule: Option<String>,
    pub writes: Vec<PropertyWrite>,
}

#[derive(Debug)]
pub struct CombinationAcceptanceNode {
    inner: AcceptanceNode,
    layout: CombinationLayout,
    default_outputs: [String; 2],
    thresholds: Option<(i64, i64)>,
}

impl CombinationAcceptanceNode {
    /// Default slot outputs are `"{unit}_{output_slot_property}"`.
    pub fn new(
        unit: Box<dyn Unit>,
        previous_property: &str,
        tools_property: &str,
        layout: CombinationLayout,
    ) -> (Self, Vec<PropertyWrite>) {
        let mut inner = AcceptanceNode::without_output(unit, previous_property, tools_property);
        let unit_name = inner.name().to_string();
        let default_outputs = layout
            .outputs
            .clone()
            .map(|property| format!("{unit_name}_{property}"));
        let writes = Leg::BOTH
            .iter()
            .map(|leg| {
                inner
                    .base
                    .set_property(&layout.outputs[leg.index()], &default_outputs[leg.index()])
            })
            .collect();
        let node = Self {
            inner,
            layout,
            default_outputs,
            thresholds: None,
        };
        (node, writes)
    }

    pub fn layout(&self) -> &CombinationLayout {
        &self.layout
    }

    pub fn default_output_slot(&self, leg: Leg) -> &str {
        &self.default_outputs[leg.index()]
    }

    pub fn set_output_slot(&mut self, leg: Leg, name: &str) -> PropertyWrite {
        self.inner
            .base
            .set_property(&self.layout.outputs[leg.index()], name)
    }

    pub fn output_slot(&self, leg: Leg) -> Option<String> {
        self.slot_value(&self.layout.outputs[leg.index()])
    }

    /// The upstream source currently bound to `leg`.
    pub fn slot_source(&self, leg: Leg) -> Option<String> {
        self.slot_value(&self.layout.inputs[leg.index()])
    }

    /// Quantity the unit expects on `leg`, read from its slot property.
    pub fn slot_kind(&self, leg: Leg) -> Option<QuantityKind> {
        self.slot_value(&self.layout.slot_properties[leg.index()])
            .and_then(|tag| QuantityKind::from_semantic(&tag))
    }

    pub fn leg_of(&self, source: &str) -> Option<Leg> {
        Leg::BOTH
            .into_iter()
            .find(|&leg| self.slot_source(leg).as_deref() == Some(source))
    }

    /// Classify `name` and bind it to the matching leg.
    ///
    /// The rule list yields the quantity the source carries; the leg is the
    /// slot whose tag expects that quantity. When both slots expect it, the
    /// first free slot is used. Any other outcome is `UnresolvedLeg`.
    pub fn add_upstream_source(&mut self, name: &str, rules: &LegRules) -> Result<LegAssignment> {
        self.add_upstream_source_hinted(name, &[], rules)
    }

    /// Like [`add_upstream_source`](Self::add_upstream_source), but when no
    /// rule recognises `name` the `hints` (names further up the same leg) are
    /// classified in order instead.
    pub fn add_upstream_source_hinted(
        &mut self,
        name: &str,
        hints: &[&str],
        rules: &LegRules,
    ) -> Result<LegAssignment> {
        if let Some(leg) = self.leg_of(name) {
            return Ok(LegAssignment {
                leg,
                rule: None,
                writes: Vec::new(),
            });
        }

        let unresolved = || MenuError::UnresolvedLeg {
            node: self.name().to_string(),
            source_name: name.to_string(),
        };
        let (kind, rule) = std::iter::once(name)
            .chain(hints.iter().copied())
            .find_map(|candidate| rules.classify(candidate))
            .ok_or_else(unresolved)?;
        let rule = rule.to_string();
        let leg = Leg::BOTH
            .into_iter()
            .filter(|&leg| self.slot_kind(leg) == Some(kind))
            .find(|&leg| self.slot_source(leg).is_none())
            .ok_or_else(unresolved)?;

        tracing::debug!(node = %self.name(), source = name, %kind, ?leg, rule = %rule, "leg classified");

        let mut writes = vec![self
            .inner
            .base
            .set_property(&self.layout.inputs[leg.index()], name)];
        if let Registration::Added(write) = self.inner.add_upstream_source(name) {
            writes.push(write);
        }
        Ok(LegAssignment {
            leg,
            rule: Some(rule),
            writes,
        })
    }

    /// Attach the node's single decision tool and bind its two thresholds.
    pub fn add_decision_tool(
        &mut self,
        id: &str,
        kind: &str,
        factory: &dyn ToolFactory,
    ) -> Result<Vec<PropertyWrite>> {
        if let Some(existing) = self.inner.tools.first() {
            if existing.name == id {
                return Ok(Vec::new());
            }
            return Err(MenuError::InvalidSpec {
                chain: id.to_string(),
                message: format!(
                    "combination node '{}' already hosts decision tool '{}'",
                    self.name(),
                    existing.name
                ),
            });
        }

        let (first, second) = parse_thresholds(id)?;
        let mut writes = vec![self.inner.add_decision_tool(id, kind, factory)?];
        writes.push(
            self.inner
                .base
                .set_value(&self.layout.thresholds[0], PropertyValue::Int(first)),
        );
        writes.push(
            self.inner
                .base
                .set_value(&self.layout.thresholds[1], PropertyValue::Int(second)),
        );
        self.thresholds = Some((first, second));
        Ok(writes)
    }

    pub fn thresholds(&self) -> Option<(i64, i64)> {
        self.thresholds
    }

    pub fn decision_tools(&self) -> &[ToolHandle] {
        self.inner.decision_tools()
    }

    pub fn previous_decisions(&self) -> &[String] {
        self.inner.previous_decisions()
    }

    pub fn already_registered(&self, name: &str) -> bool {
        self.inner.already_registered(name)
    }

    pub fn base(&self) -> &ProcessingNode {
        self.inner.base()
    }

    fn slot_value(&self, property: &str) -> Option<String> {
        self.inner
            .base
            .get_property(property)
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
    }
}

impl Node for CombinationAcceptanceNode {
    fn identity(&self) -> &NodeIdentity {
        self.inner.identity()
    }

    /// Always `[leg1, leg2]`; an unbound slot reads as an empty string.
    fn input_list(&self) -> Vec<String> {
        Leg::BOTH
            .into_iter()
            .map(|leg| self.slot_source(leg).unwrap_or_default())
            .collect()
    }

    fn output_list(&self) -> Vec<String> {
        Leg::BOTH
            .into_iter()
            .map(|leg| self.output_slot(leg).unwrap_or_default())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Threshold extraction
// ---------------------------------------------------------------------------

fn digit_runs() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit-run pattern compiles"))
}

/// Extract the two thresholds embedded in a combination tool id
/// (`"dimu_pt6_pt10"` -> `(6, 10)`).
pub fn parse_thresholds(tool: &str) -> Result<(i64, i64)> {
    let runs: Vec<&str> = digit_runs().find_iter(tool).map(|m| m.as_str()).collect();
    let parse = |run: &str| {
        run.parse::<i64>().map_err(|_| MenuError::ThresholdRange {
            tool: tool.to_string(),
            value: run.to_string(),
        })
    };
    match runs.as_slice() {
        [first, second] => Ok((parse(*first)?, parse(*second)?)),
        _ => Err(MenuError::ThresholdParse {
            tool: tool.to_string(),
            found: runs.len(),
        }),
    }
}
