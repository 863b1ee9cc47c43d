//! Menu file format: build configuration, unit schemas, and parsed chains.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use menu_types::{PropertyKind, Result, ToolFactory, UnitFactory};

use crate::acceptance::CombinationLayout;
use crate::builder::{BuildReport, MenuBuilder};
use crate::classify::LegRuleConfig;
use crate::filter::FilterLayout;
use crate::graph::MenuGraph;
use crate::units::{SchemaToolFactory, SchemaUnitFactory, UnitSchema};

fn default_input() -> String {
    "Input".into()
}

fn default_output() -> String {
    "Output".into()
}

fn default_previous() -> String {
    "PreviousDecisions".into()
}

fn default_tools() -> String {
    "DecisionTools".into()
}

fn default_filter_prefix() -> String {
    "Filter".into()
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Treat a property write the unit rejects as fatal.
    pub strict_properties: bool,
    /// Leg classifiers in evaluation order; empty selects the built-ins.
    pub leg_rules: Vec<LegRuleConfig>,
    pub filter_prefix: String,
    pub filter: FilterLayout,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            strict_properties: false,
            leg_rules: Vec::new(),
            filter_prefix: default_filter_prefix(),
            filter: FilterLayout::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Chain specs
// ---------------------------------------------------------------------------

/// A unit to instantiate, with the properties it is wired through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub kind: String,
    pub name: String,
    #[serde(default = "default_input")]
    pub input: String,
    #[serde(default = "default_output")]
    pub output: String,
    /// Processing nodes merged after this one (sequences only).
    #[serde(default)]
    pub trailing: Vec<UnitSpec>,
}

impl UnitSpec {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            input: default_input(),
            output: default_output(),
            trailing: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceSpec {
    pub kind: String,
    pub name: String,
    #[serde(default = "default_previous")]
    pub input: String,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_tools")]
    pub tools: String,
    pub tool_kind: String,
    /// Decision tool id; the chain name when absent.
    #[serde(default)]
    pub tool: Option<String>,
    /// Slot layout; required when the step has two legs.
    #[serde(default)]
    pub combination: Option<CombinationLayout>,
}

impl AcceptanceSpec {
    pub fn new(kind: &str, name: &str, tool_kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            input: default_previous(),
            output: default_output(),
            tools: default_tools(),
            tool_kind: tool_kind.to_string(),
            tool: None,
            combination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSpec {
    pub seed: String,
    pub view_builder: UnitSpec,
    pub sequence: UnitSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub legs: Vec<LegSpec>,
    pub acceptance: AcceptanceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSpec {
    pub name: String,
    pub seed: String,
    pub steps: Vec<StepSpec>,
}

// ---------------------------------------------------------------------------
// MenuSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuSpec {
    #[serde(default)]
    pub config: BuildConfig,
    #[serde(default)]
    pub units: BTreeMap<String, UnitSchema>,
    pub chains: Vec<ChainSpec>,
}

impl MenuSpec {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Factory over the declared schemas. The filter kind gets a default
    /// schema matching `config.filter` unless the file declares one.
    pub fn unit_factory(&self) -> SchemaUnitFactory {
        let mut factory = SchemaUnitFactory::from_schemas(
            self.units.iter().map(|(k, s)| (k.clone(), s.clone())),
        );
        let layout = &self.config.filter;
        if !factory.has(&layout.kind) {
            factory.register(
                layout.kind.clone(),
                UnitSchema::new([
                    (layout.input.as_str(), PropertyKind::List),
                    (layout.output.as_str(), PropertyKind::List),
                    (layout.chains.as_str(), PropertyKind::List),
                ]),
            );
        }
        factory
    }

    /// Build with the in-memory factories.
    pub fn build(&self) -> Result<(MenuGraph, BuildReport)> {
        let units = self.unit_factory();
        self.build_with(&units, &SchemaToolFactory::any())
    }

    pub fn build_with(
        &self,
        units: &dyn UnitFactory,
        tools: &dyn ToolFactory,
    ) -> Result<(MenuGraph, BuildReport)> {
        let mut builder = MenuBuilder::new(self.config.clone(), units, tools);
        for chain in &self.chains {
            builder.add_chain(chain)?;
        }
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MENU: &str = r#"{
        "units": {
            "InputMaker": { "properties": { "Input": "list", "Output": "scalar" } }
        },
        "chains": [
            { "name": "HLT_mu6", "seed": "L1_MU6",
              "steps": [ { "name": "Step1",
                           "legs": [ { "seed": "L1_MU6",
                                       "view_builder": { "kind": "InputMaker", "name": "MuInputMaker_Step1" },
                                       "sequence": { "kind": "RecoSeq", "name": "MuFastSeq" } } ],
                           "acceptance": { "kind": "HypoAlg", "name": "MuFastHypo", "tool_kind": "MuFastHypoTool" } } ] }
        ]
    }"#;

    #[test]
    fn decodes_with_defaults() {
        let spec = MenuSpec::from_json(MENU).unwrap();
        assert_eq!(spec.config, BuildConfig::default());
        assert_eq!(spec.config.filter_prefix, "Filter");

        let step = &spec.chains[0].steps[0];
        assert_eq!(step.legs[0].view_builder.input, "Input");
        assert_eq!(step.legs[0].sequence.output, "Output");
        assert!(step.legs[0].sequence.trailing.is_empty());
        assert_eq!(step.acceptance.input, "PreviousDecisions");
        assert_eq!(step.acceptance.tools, "DecisionTools");
        assert!(step.acceptance.tool.is_none());
        assert!(step.acceptance.combination.is_none());
    }

    #[test]
    fn combination_layout_defaults_fill_missing_fields() {
        let acc: AcceptanceSpec = serde_json::from_str(
            r#"{ "kind": "ComboHypo", "name": "c", "tool_kind": "ComboTool",
                 "combination": { "slot_properties": ["LegA", "LegB"] } }"#,
        )
        .unwrap();
        let layout = acc.combination.unwrap();
        assert_eq!(layout.slot_properties, ["LegA".to_string(), "LegB".to_string()]);
        assert_eq!(layout.inputs, CombinationLayout::default().inputs);
    }

    #[test]
    fn config_section_decodes() {
        let config: BuildConfig = serde_json::from_str(
            r#"{ "strict_properties": true, "filter_prefix": "Gate",
                 "leg_rules": [ { "name": "seq", "markers": [ { "marker": "ASeq", "kind": "momentum" } ] } ] }"#,
        )
        .unwrap();
        assert!(config.strict_properties);
        assert_eq!(config.filter_prefix, "Gate");
        assert_eq!(config.leg_rules.len(), 1);
        assert_eq!(config.filter.kind, "SequenceFilter");
    }

    #[test]
    fn unit_factory_adds_filter_schema() {
        let spec = MenuSpec::from_json(MENU).unwrap();
        let factory = spec.unit_factory();
        assert!(factory.has("InputMaker"));
        assert!(factory.has("SequenceFilter"));
        assert!(!factory.has("RecoSeq"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MENU.as_bytes()).unwrap();
        let spec = MenuSpec::load(file.path()).unwrap();
        assert_eq!(spec.chains[0].name, "HLT_mu6");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = MenuSpec::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, menu_types::MenuError::Io(_)));
    }

    #[test]
    fn malformed_json_is_json_error() {
        assert!(matches!(
            MenuSpec::from_json("{ \"chains\": 3 }"),
            Err(menu_types::MenuError::Json(_))
        ));
    }
}
