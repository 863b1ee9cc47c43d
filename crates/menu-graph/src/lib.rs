//! Decision-graph construction for multi-stage event selection menus.
//!
//! This crate turns parsed chain specs into a data-flow graph an external
//! scheduler can execute: processing legs, acceptance and combination nodes,
//! the filters gating every step, and the name wiring between them. Node
//! sharing across chains, collision-free output naming, leg classification,
//! validation lint rules, and a DOT dump live here.

pub mod acceptance;
pub mod builder;
pub mod chain;
pub mod classify;
pub mod dot;
pub mod filter;
pub mod graph;
pub mod node;
pub mod registry;
pub mod spec;
pub mod stage;
pub mod units;
pub mod validation;

pub use acceptance::{
    parse_thresholds, AcceptanceNode, CombinationAcceptanceNode, CombinationLayout, LegAssignment,
    Registration,
};
pub use builder::{BuildReport, MenuBuilder};
pub use chain::{group_seeds, Chain, ChainStep, StageBinding};
pub use classify::{LegRule, LegRuleConfig, LegRules, MarkerConfig, MarkerRule};
pub use dot::to_dot;
pub use filter::{DecisionRecord, FilterLayout, FilterNode, FilterOutcome};
pub use graph::{GraphNode, MenuGraph, NodeId, NodeRole};
pub use node::{Node, NodeIdentity, ProcessingNode, PropertyWrite};
pub use registry::NameRegistry;
pub use spec::{AcceptanceSpec, BuildConfig, ChainSpec, LegSpec, MenuSpec, StepSpec, UnitSpec};
pub use stage::{CompositeStage, LegId, LegUnit, StageId};
pub use units::{ConfigurableUnit, SchemaToolFactory, SchemaUnitFactory, UnitSchema};
pub use validation::{validate, validate_or_raise, Diagnostic, LintRule, Severity};
