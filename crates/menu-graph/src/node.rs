//! Base node types: identity, the `Node` trait, and `ProcessingNode`.
//!
//! A `ProcessingNode` never stores wiring in its own fields. Every input or
//! output name is written into a named property of the wrapped [`Unit`], so
//! the graph always agrees with what the unit is actually configured with.

use menu_types::{MenuError, PropertyValue, Unit};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// `(unit_name, input_property, output_property)`, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    unit_name: String,
    input_property: String,
    output_property: Option<String>,
}

impl NodeIdentity {
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn input_property(&self) -> &str {
        &self.input_property
    }

    pub fn output_property(&self) -> Option<&str> {
        self.output_property.as_deref()
    }
}

/// Anything the scheduler can place in the data-flow graph.
pub trait Node {
    fn identity(&self) -> &NodeIdentity;

    fn name(&self) -> &str {
        self.identity().unit_name()
    }

    /// Names this node consumes, in property order.
    fn input_list(&self) -> Vec<String>;

    /// Names this node produces, in property order.
    fn output_list(&self) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// PropertyWrite
// ---------------------------------------------------------------------------

/// Outcome of writing a value into a unit property.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyWrite {
    Applied,
    /// Nothing to do: the value was already present in a list property, or
    /// the node has no output property.
    Skipped,
    /// The unit rejected the write (undeclared property or incompatible value).
    Missing { unit: String, property: String },
}

impl PropertyWrite {
    pub fn is_missing(&self) -> bool {
        matches!(self, PropertyWrite::Missing { .. })
    }

    pub fn into_error(self) -> Option<MenuError> {
        match self {
            PropertyWrite::Missing { unit, property } => {
                Some(MenuError::MissingProperty { unit, property })
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessingNode
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ProcessingNode {
    identity: NodeIdentity,
    unit: Box<dyn Unit>,
    default_output: Option<String>,
}

impl ProcessingNode {
    pub fn new(
        unit: Box<dyn Unit>,
        input_property: impl Into<String>,
        output_property: Option<String>,
    ) -> Self {
        let identity = NodeIdentity {
            unit_name: unit.name().to_string(),
            input_property: input_property.into(),
            output_property,
        };
        Self {
            identity,
            unit,
            default_output: None,
        }
    }

    pub fn unit(&self) -> &dyn Unit {
        self.unit.as_ref()
    }

    /// Normalized read of any property. Unknown properties read as empty.
    pub fn get_property(&self, property: &str) -> Vec<String> {
        self.unit
            .get_property(property)
            .map(|v| v.as_sequence())
            .unwrap_or_default()
    }

    pub fn raw_property(&self, property: &str) -> Option<PropertyValue> {
        self.unit.get_property(property)
    }

    /// Write `value` into `property`: list properties append, scalar
    /// properties are replaced, int properties parse the value.
    pub fn set_property(&mut self, property: &str, value: &str) -> PropertyWrite {
        self.write(property, value, false)
    }

    /// Like [`set_property`](Self::set_property) but a list property that
    /// already holds `value` is left untouched.
    pub fn add_property(&mut self, property: &str, value: &str) -> PropertyWrite {
        self.write(property, value, true)
    }

    /// Store an already-typed value as-is.
    pub fn set_value(&mut self, property: &str, value: PropertyValue) -> PropertyWrite {
        if self.unit.set_property(property, value) {
            PropertyWrite::Applied
        } else {
            self.missing(property)
        }
    }

    pub fn set_input(&mut self, value: &str) -> PropertyWrite {
        let property = self.identity.input_property.clone();
        self.set_property(&property, value)
    }

    pub fn add_input(&mut self, value: &str) -> PropertyWrite {
        let property = self.identity.input_property.clone();
        self.add_property(&property, value)
    }

    /// No-op when the node has no output property.
    pub fn set_output(&mut self, value: &str) -> PropertyWrite {
        match self.identity.output_property.clone() {
            Some(property) => self.set_property(&property, value),
            None => PropertyWrite::Skipped,
        }
    }

    /// Synthesize `"{unit}_{output_property}_out"` and write it. Concrete node
    /// types call this once at construction.
    pub fn add_default_output(&mut self) -> PropertyWrite {
        let Some(property) = self.identity.output_property.clone() else {
            return PropertyWrite::Skipped;
        };
        let name = format!("{}_{}_out", self.identity.unit_name, property);
        self.default_output = Some(name.clone());
        self.set_property(&property, &name)
    }

    pub fn default_output(&self) -> Option<&str> {
        self.default_output.as_deref()
    }

    fn write(&mut self, property: &str, value: &str, dedup: bool) -> PropertyWrite {
        let next = match self.unit.get_property(property) {
            None => return self.missing(property),
            Some(PropertyValue::List(mut items)) => {
                if dedup && items.iter().any(|item| item == value) {
                    return PropertyWrite::Skipped;
                }
                items.push(value.to_string());
                PropertyValue::List(items)
            }
            Some(PropertyValue::Scalar(_)) => PropertyValue::Scalar(value.to_string()),
            Some(PropertyValue::Int(_)) => match value.parse::<i64>() {
                Ok(i) => PropertyValue::Int(i),
                Err(_) => return self.missing(property),
            },
        };
        self.set_value(property, next)
    }

    fn missing(&self, property: &str) -> PropertyWrite {
        PropertyWrite::Missing {
            unit: self.identity.unit_name.clone(),
            property: property.to_string(),
        }
    }
}

impl Node for ProcessingNode {
    fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    fn input_list(&self) -> Vec<String> {
        self.get_property(&self.identity.input_property)
    }

    fn output_list(&self) -> Vec<String> {
        match self.identity.output_property {
            Some(ref property) => self.get_property(property),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::ConfigurableUnit;
    use menu_types::PropertyKind;

    fn unit(props: &[(&str, PropertyKind)]) -> Box<dyn Unit> {
        Box::new(ConfigurableUnit::with_properties("Reco", "RecoSeq", props))
    }

    #[test]
    fn identity_derived_from_unit() {
        let node = ProcessingNode::new(
            unit(&[("Input", PropertyKind::List)]),
            "Input",
            Some("Output".into()),
        );
        assert_eq!(node.name(), "Reco");
        assert_eq!(node.identity().input_property(), "Input");
        assert_eq!(node.identity().output_property(), Some("Output"));
    }

    #[test]
    fn list_input_appends() {
        let mut node = ProcessingNode::new(unit(&[("Input", PropertyKind::List)]), "Input", None);
        assert_eq!(node.set_input("a"), PropertyWrite::Applied);
        assert_eq!(node.set_input("b"), PropertyWrite::Applied);
        assert_eq!(node.input_list(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn add_input_skips_existing_value() {
        let mut node = ProcessingNode::new(unit(&[("Input", PropertyKind::List)]), "Input", None);
        assert_eq!(node.add_input("a"), PropertyWrite::Applied);
        assert_eq!(node.add_input("a"), PropertyWrite::Skipped);
        assert_eq!(node.input_list(), vec!["a".to_string()]);
    }

    #[test]
    fn scalar_input_replaces_and_normalizes() {
        let mut node =
            ProcessingNode::new(unit(&[("Input", PropertyKind::Scalar)]), "Input", None);
        assert!(node.input_list().is_empty());
        assert_eq!(node.set_input("a"), PropertyWrite::Applied);
        assert_eq!(node.set_input("b"), PropertyWrite::Applied);
        assert_eq!(node.input_list(), vec!["b".to_string()]);
    }

    #[test]
    fn undeclared_property_reports_missing() {
        let mut node = ProcessingNode::new(unit(&[]), "Input", None);
        let write = node.set_input("a");
        assert!(write.is_missing());
        assert!(matches!(
            write.into_error(),
            Some(MenuError::MissingProperty { ref unit, ref property }) if unit == "Reco" && property == "Input"
        ));
        assert!(node.input_list().is_empty());
    }

    #[test]
    fn default_output_synthesized() {
        let mut node = ProcessingNode::new(
            unit(&[("Input", PropertyKind::List), ("Output", PropertyKind::Scalar)]),
            "Input",
            Some("Output".into()),
        );
        assert_eq!(node.add_default_output(), PropertyWrite::Applied);
        assert_eq!(node.default_output(), Some("Reco_Output_out"));
        assert_eq!(node.output_list(), vec!["Reco_Output_out".to_string()]);
    }

    #[test]
    fn rewritten_output_keeps_default_name_available() {
        let mut node = ProcessingNode::new(
            unit(&[("Output", PropertyKind::Scalar)]),
            "Input",
            Some("Output".into()),
        );
        let _ = node.add_default_output();
        assert_eq!(node.set_output("L1_MU6_Reco_Output_out"), PropertyWrite::Applied);
        assert_eq!(node.default_output(), Some("Reco_Output_out"));
        assert_eq!(node.output_list(), vec!["L1_MU6_Reco_Output_out".to_string()]);
    }

    #[test]
    fn no_output_property_is_noop() {
        let mut node = ProcessingNode::new(unit(&[("Input", PropertyKind::List)]), "Input", None);
        assert_eq!(node.set_output("x"), PropertyWrite::Skipped);
        assert_eq!(node.add_default_output(), PropertyWrite::Skipped);
        assert!(node.output_list().is_empty());
        assert!(node.default_output().is_none());
    }

    #[test]
    fn int_property_parses_or_rejects() {
        let mut node =
            ProcessingNode::new(unit(&[("threshold1", PropertyKind::Int)]), "Input", None);
        assert_eq!(node.set_property("threshold1", "6"), PropertyWrite::Applied);
        assert_eq!(node.raw_property("threshold1"), Some(PropertyValue::Int(6)));
        assert!(node.set_property("threshold1", "six").is_missing());
    }
}
