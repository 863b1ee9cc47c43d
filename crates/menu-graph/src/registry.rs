//! Build-scoped name registry: every output name has exactly one producer and
//! every unit name belongs to exactly one node.

use std::collections::{BTreeSet, HashMap, HashSet};

use menu_types::{MenuError, Result};

#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    producers: HashMap<String, String>,
    units: HashSet<String>,
    externals: BTreeSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `producer` as the producer of `name`. Claiming the same name
    /// again for the same producer is a no-op.
    pub fn claim_output(&mut self, name: &str, producer: &str) -> Result<()> {
        if let Some(first) = self.producers.get(name) {
            if first == producer {
                return Ok(());
            }
            return Err(MenuError::DuplicateOutputName {
                name: name.to_string(),
                first: first.clone(),
                second: producer.to_string(),
            });
        }
        if self.externals.contains(name) {
            return Err(MenuError::DuplicateOutputName {
                name: name.to_string(),
                first: "<external>".to_string(),
                second: producer.to_string(),
            });
        }
        self.producers.insert(name.to_string(), producer.to_string());
        Ok(())
    }

    pub fn claim_unit(&mut self, name: &str) -> Result<()> {
        if !self.units.insert(name.to_string()) {
            return Err(MenuError::DuplicateUnitName {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn unit_taken(&self, name: &str) -> bool {
        self.units.contains(name)
    }

    /// Names supplied from outside the graph (leg seeds of first steps).
    pub fn declare_external(&mut self, name: &str) {
        self.externals.insert(name.to_string());
    }

    pub fn is_external(&self, name: &str) -> bool {
        self.externals.contains(name)
    }

    pub fn producer_of(&self, name: &str) -> Option<&str> {
        self.producers.get(name).map(String::as_str)
    }

    pub fn resolves(&self, name: &str) -> bool {
        self.producers.contains_key(name) || self.externals.contains(name)
    }

    pub fn externals(&self) -> &BTreeSet<String> {
        &self.externals
    }

    pub fn output_count(&self) -> usize {
        self.producers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_producer_is_rejected() {
        let mut reg = NameRegistry::new();
        reg.claim_output("x_out", "A").unwrap();
        let err = reg.claim_output("x_out", "B").unwrap_err();
        assert!(matches!(
            err,
            MenuError::DuplicateOutputName { ref name, ref first, ref second }
                if name == "x_out" && first == "A" && second == "B"
        ));
        assert_eq!(reg.producer_of("x_out"), Some("A"));
    }

    #[test]
    fn reclaim_by_same_producer_is_idempotent() {
        let mut reg = NameRegistry::new();
        reg.claim_output("x_out", "A").unwrap();
        reg.claim_output("x_out", "A").unwrap();
        assert_eq!(reg.output_count(), 1);
    }

    #[test]
    fn output_cannot_shadow_external() {
        let mut reg = NameRegistry::new();
        reg.declare_external("L1_MU6");
        assert!(reg.claim_output("L1_MU6", "A").is_err());
        assert!(reg.resolves("L1_MU6"));
        assert!(!reg.resolves("nothing"));
    }

    #[test]
    fn unit_names_are_unique() {
        let mut reg = NameRegistry::new();
        reg.claim_unit("MuHypo").unwrap();
        assert!(reg.unit_taken("MuHypo"));
        assert!(matches!(
            reg.claim_unit("MuHypo"),
            Err(MenuError::DuplicateUnitName { ref name }) if name == "MuHypo"
        ));
    }
}
