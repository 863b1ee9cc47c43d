//! In-memory units and factories driven by declared property schemas.
//!
//! Real deployments plug their own [`UnitFactory`] / [`ToolFactory`] into the
//! builder. These implementations back the CLI and the tests: a unit kind is
//! described by the properties it declares, and writes to anything else are
//! rejected exactly like a real unit would reject them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use menu_types::{
    MenuError, PropertyKind, PropertyValue, Result, ToolFactory, ToolHandle, Unit, UnitFactory,
};

/// Declared properties of one unit kind, plus preset values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitSchema {
    pub properties: BTreeMap<String, PropertyKind>,
    #[serde(default)]
    pub values: BTreeMap<String, PropertyValue>,
}

impl UnitSchema {
    pub fn new<'a>(properties: impl IntoIterator<Item = (&'a str, PropertyKind)>) -> Self {
        Self {
            properties: properties
                .into_iter()
                .map(|(name, kind)| (name.to_string(), kind))
                .collect(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, property: &str, value: PropertyValue) -> Self {
        self.values.insert(property.to_string(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// ConfigurableUnit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConfigurableUnit {
    name: String,
    kind: String,
    kinds: BTreeMap<String, PropertyKind>,
    values: BTreeMap<String, PropertyValue>,
}

impl ConfigurableUnit {
    pub fn from_schema(kind: &str, name: &str, schema: &UnitSchema) -> Self {
        let mut values: BTreeMap<String, PropertyValue> = schema
            .properties
            .iter()
            .map(|(prop, k)| (prop.clone(), k.empty_value()))
            .collect();
        for (prop, value) in &schema.values {
            if schema
                .properties
                .get(prop)
                .is_some_and(|k| k.accepts(value))
            {
                values.insert(prop.clone(), value.clone());
            } else {
                tracing::warn!(kind, property = %prop, "preset value ignored: property not declared with a matching kind");
            }
        }
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            kinds: schema.properties.clone(),
            values,
        }
    }

    pub fn with_properties(name: &str, kind: &str, properties: &[(&str, PropertyKind)]) -> Self {
        Self::from_schema(kind, name, &UnitSchema::new(properties.iter().copied()))
    }
}

impl Unit for ConfigurableUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn get_property(&self, property: &str) -> Option<PropertyValue> {
        self.values.get(property).cloned()
    }

    fn set_property(&mut self, property: &str, value: PropertyValue) -> bool {
        match self.kinds.get(property) {
            Some(kind) if kind.accepts(&value) => {
                self.values.insert(property.to_string(), value);
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SchemaUnitFactory {
    schemas: HashMap<String, UnitSchema>,
}

impl SchemaUnitFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_schemas(schemas: impl IntoIterator<Item = (String, UnitSchema)>) -> Self {
        Self {
            schemas: schemas.into_iter().collect(),
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, schema: UnitSchema) {
        self.schemas.insert(kind.into(), schema);
    }

    pub fn has(&self, kind: &str) -> bool {
        self.schemas.contains_key(kind)
    }
}

impl UnitFactory for SchemaUnitFactory {
    fn create_unit(&self, kind: &str, name: &str) -> Result<Box<dyn Unit>> {
        let schema = self.schemas.get(kind).ok_or_else(|| MenuError::UnknownKind {
            kind: kind.to_string(),
        })?;
        Ok(Box::new(ConfigurableUnit::from_schema(kind, name, schema)))
    }
}

/// Tool factory that accepts any kind, or only the listed kinds.
#[derive(Debug, Clone, Default)]
pub struct SchemaToolFactory {
    kinds: Option<BTreeSet<String>>,
}

impl SchemaToolFactory {
    pub fn any() -> Self {
        Self { kinds: None }
    }

    pub fn with_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: Some(kinds.into_iter().map(Into::into).collect()),
        }
    }
}

impl ToolFactory for SchemaToolFactory {
    fn create_decision_tool(&self, kind: &str, name: &str) -> Result<ToolHandle> {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(kind) {
                return Err(MenuError::UnknownKind {
                    kind: kind.to_string(),
                });
            }
        }
        Ok(ToolHandle {
            name: name.to_string(),
            kind: kind.to_string(),
        })
    }
}
