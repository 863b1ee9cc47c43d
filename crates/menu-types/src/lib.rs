//! Shared types, errors, and collaborator ports for the menu graph builder.
//!
//! This crate provides the foundational types used across the other menu crates:
//! - `MenuError`: unified build-time error taxonomy
//! - `PropertyValue` / `PropertyKind`: values carried by named unit properties
//! - `Unit`: the property capability every wrapped processing unit exposes
//! - `UnitFactory` / `ToolFactory`: ports for instantiating units and decision tools
//! - `QuantityKind` / `Leg`: vocabulary for two-leg combination routing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error type for graph construction.
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    // === Wiring Errors ===
    #[error("Combination node '{node}' cannot assign upstream source '{source_name}' to a leg")]
    UnresolvedLeg { node: String, source_name: String },

    #[error("Decision tool '{tool}' must embed exactly two thresholds, found {found}")]
    ThresholdParse { tool: String, found: usize },

    #[error("Decision tool '{tool}' threshold '{value}' is out of range")]
    ThresholdRange { tool: String, value: String },

    #[error("Output name '{name}' is produced by both '{first}' and '{second}'")]
    DuplicateOutputName {
        name: String,
        first: String,
        second: String,
    },

    #[error("Unit name '{name}' is used by more than one node")]
    DuplicateUnitName { name: String },

    #[error("Unit '{unit}' does not declare property '{property}'")]
    MissingProperty { unit: String, property: String },

    #[error("Graph contains a cycle through: {}", nodes.join(", "))]
    CyclicGraph { nodes: Vec<String> },

    // === Spec Errors ===
    #[error("Invalid chain '{chain}': {message}")]
    InvalidSpec { chain: String, message: String },

    #[error("No unit or tool registered for kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("Menu validation failed: {0}")]
    ValidationError(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl MenuError {
    /// Returns `false` for the one recoverable condition: a property write the
    /// wrapped unit rejected. Everything else aborts the build.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MenuError::MissingProperty { .. })
    }
}

/// A convenience alias for `Result<T, MenuError>`.
pub type Result<T> = std::result::Result<T, MenuError>;

// ---------------------------------------------------------------------------
// PropertyValue: the value stored under a unit property
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Scalar(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Normalize to an ordered sequence. Empty scalars normalize to an empty
    /// sequence so unset single-valued properties read like unset lists.
    pub fn as_sequence(&self) -> Vec<String> {
        match self {
            PropertyValue::Scalar(s) if s.is_empty() => Vec::new(),
            PropertyValue::Scalar(s) => vec![s.clone()],
            PropertyValue::List(items) => items.clone(),
            PropertyValue::Int(i) => vec![i.to_string()],
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, PropertyValue::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Scalar(s) => write!(f, "{s}"),
            PropertyValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Declared shape of a unit property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Scalar,
    List,
    Int,
}

impl PropertyKind {
    /// The value a freshly created unit holds for a property of this kind.
    pub fn empty_value(self) -> PropertyValue {
        match self {
            PropertyKind::Scalar => PropertyValue::Scalar(String::new()),
            PropertyKind::List => PropertyValue::List(Vec::new()),
            PropertyKind::Int => PropertyValue::Int(0),
        }
    }

    /// Whether `value` can be stored under a property of this kind.
    pub fn accepts(self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (PropertyKind::Scalar, PropertyValue::Scalar(_))
                | (PropertyKind::List, PropertyValue::List(_))
                | (PropertyKind::Int, PropertyValue::Int(_))
        )
    }
}

// ---------------------------------------------------------------------------
// Unit: named-property capability of a wrapped processing unit
// ---------------------------------------------------------------------------

/// A configurable processing unit owned by a graph node.
///
/// Property access is by name. A rejected write returns `false` instead of
/// panicking or erroring so the caller decides whether that is fatal.
pub trait Unit: fmt::Debug + Send + Sync {
    /// Instance name, unique within one menu.
    fn name(&self) -> &str;

    /// The kind this unit was instantiated from.
    fn kind(&self) -> &str;

    fn get_property(&self, property: &str) -> Option<PropertyValue>;

    fn set_property(&mut self, property: &str, value: PropertyValue) -> bool;

    fn declares(&self, property: &str) -> bool {
        self.get_property(property).is_some()
    }
}

/// Creates processing units by kind.
pub trait UnitFactory {
    fn create_unit(&self, kind: &str, name: &str) -> Result<Box<dyn Unit>>;
}

/// Handle to an instantiated decision tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolHandle {
    pub name: String,
    pub kind: String,
}

/// Creates decision tools by kind.
pub trait ToolFactory {
    fn create_decision_tool(&self, kind: &str, name: &str) -> Result<ToolHandle>;
}

// ---------------------------------------------------------------------------
// Combination vocabulary
// ---------------------------------------------------------------------------

/// Physical quantity a combination leg carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    Momentum,
    Energy,
}

impl QuantityKind {
    /// Interpret the semantic tag a combination unit stores for one of its
    /// input slots (`"pt"`, `"et"`, ...).
    pub fn from_semantic(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "pt" | "p" | "momentum" => Some(QuantityKind::Momentum),
            "et" | "e" | "energy" => Some(QuantityKind::Energy),
            _ => None,
        }
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityKind::Momentum => f.write_str("momentum"),
            QuantityKind::Energy => f.write_str("energy"),
        }
    }
}

/// One of the two legs of a combination node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Leg {
    First,
    Second,
}

impl Leg {
    pub const BOTH: [Leg; 2] = [Leg::First, Leg::Second];

    pub fn index(self) -> usize {
        match self {
            Leg::First => 0,
            Leg::Second => 1,
        }
    }
}
