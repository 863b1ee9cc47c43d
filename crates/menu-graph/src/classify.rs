//! Leg classification rules for two-leg combination nodes.
//!
//! An upstream source name is classified into the physical quantity it
//! carries by an ordered list of rules; the first rule that recognises the
//! name wins. `None` from [`LegRules::classify`] means no rule matched.

use serde::{Deserialize, Serialize};

use menu_types::QuantityKind;

// ---------------------------------------------------------------------------
// LegRule trait
// ---------------------------------------------------------------------------

pub trait LegRule: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn classify(&self, source: &str) -> Option<QuantityKind>;
}

/// Substring matcher: the first marker contained in the source decides.
#[derive(Debug, Clone)]
pub struct MarkerRule {
    name: String,
    markers: Vec<(String, QuantityKind)>,
}

impl MarkerRule {
    pub fn new<I, S>(name: impl Into<String>, markers: I) -> Self
    where
        I: IntoIterator<Item = (S, QuantityKind)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            markers: markers.into_iter().map(|(m, k)| (m.into(), k)).collect(),
        }
    }

    /// Markers embedded by filters in the names they emit (`..._from_L1MU6`,
    /// `..._from_L1_MU6`).
    pub fn domain_markers() -> Self {
        Self::new(
            "domain_marker",
            [
                ("from_L1MU", QuantityKind::Momentum),
                ("from_L1_MU", QuantityKind::Momentum),
                ("from_L1EM", QuantityKind::Energy),
                ("from_L1_EM", QuantityKind::Energy),
            ],
        )
    }

    /// Producer unit names embedded in default output names.
    pub fn producer_names() -> Self {
        Self::new(
            "producer_name",
            [
                ("MuInputMaker", QuantityKind::Momentum),
                ("ElInputMaker", QuantityKind::Energy),
            ],
        )
    }
}

impl LegRule for MarkerRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, source: &str) -> Option<QuantityKind> {
        self.markers
            .iter()
            .find(|(marker, _)| source.contains(marker.as_str()))
            .map(|(_, kind)| *kind)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    pub marker: String,
    pub kind: QuantityKind,
}

/// One marker rule as written in the menu file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRuleConfig {
    pub name: String,
    pub markers: Vec<MarkerConfig>,
}

// ---------------------------------------------------------------------------
// LegRules
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LegRules {
    rules: Vec<Box<dyn LegRule>>,
}

impl LegRules {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Domain markers first, producer names second.
    pub fn defaults() -> Self {
        let mut rules = Self::empty();
        rules.push(MarkerRule::domain_markers());
        rules.push(MarkerRule::producer_names());
        rules
    }

    /// Configured rules in file order; built-in defaults when none are given.
    pub fn from_config(configs: &[LegRuleConfig]) -> Self {
        if configs.is_empty() {
            return Self::defaults();
        }
        let mut rules = Self::empty();
        for config in configs {
            rules.push(MarkerRule::new(
                config.name.clone(),
                config.markers.iter().map(|m| (m.marker.clone(), m.kind)),
            ));
        }
        rules
    }

    pub fn push(&mut self, rule: impl LegRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// First matching rule's verdict, with the rule name for diagnostics.
    pub fn classify(&self, source: &str) -> Option<(QuantityKind, &str)> {
        self.rules
            .iter()
            .find_map(|rule| rule.classify(source).map(|kind| (kind, rule.name())))
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for LegRules {
    fn default() -> Self {
        Self::defaults()
    }
}
