//! Michaelis-Menten parameters for reactions whose uptake saturates.

use crate::core::types::{ReactionId, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kinetic parameters of one reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticsEntry {
    /// Extracellular metabolite whose concentration limits the rate
    pub limiting_species: SpeciesId,
    /// Half-saturation constant
    pub km: f64,
    /// Maximum rate per unit biomass
    pub vmax: f64,
}

impl KineticsEntry {
    pub fn new(limiting_species: impl Into<SpeciesId>, km: f64, vmax: f64) -> Self {
        Self {
            limiting_species: limiting_species.into(),
            km,
            vmax,
        }
    }

    /// Saturating rate `vmax * S / (km + S)` at substrate concentration `s`
    ///
    /// Returns 0 when `km + S` is not positive.
    pub fn rate(&self, s: f64) -> f64 {
        let denominator = self.km + s;
        if denominator <= 0.0 {
            return 0.0;
        }
        self.vmax * (s / denominator)
    }
}

/// Reaction id -> kinetic parameters
///
/// Each simulation owns its table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KineticsTable {
    entries: HashMap<ReactionId, KineticsEntry>,
}

impl KineticsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rid: impl Into<ReactionId>, entry: KineticsEntry) {
        self.entries.insert(rid.into(), entry);
    }

    /// Add an entry (builder style)
    pub fn with(mut self, rid: impl Into<ReactionId>, limiting_species: &str, km: f64, vmax: f64) -> Self {
        self.add(rid, KineticsEntry::new(limiting_species, km, vmax));
        self
    }

    pub fn remove(&mut self, rid: &str) -> Option<KineticsEntry> {
        self.entries.remove(rid)
    }

    pub fn exists(&self, rid: &str) -> bool {
        self.entries.contains_key(rid)
    }

    pub fn get(&self, rid: &str) -> Option<&KineticsEntry> {
        self.entries.get(rid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReactionId, &KineticsEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ReactionId, KineticsEntry)> for KineticsTable {
    fn from_iter<I: IntoIterator<Item = (ReactionId, KineticsEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let table = KineticsTable::new().with("GLCt", "glc_e", 5.0, 10.0);
        assert!(table.exists("GLCt"));
        assert!(!table.exists("ACt"));
        let entry = table.get("GLCt").unwrap();
        assert_eq!(entry.limiting_species, "glc_e");
        assert_eq!(entry.km, 5.0);
        assert_eq!(entry.vmax, 10.0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut table = KineticsTable::new().with("GLCt", "glc_e", 5.0, 10.0);
        assert!(table.remove("GLCt").is_some());
        assert!(table.is_empty());
        assert!(table.remove("GLCt").is_none());
    }

    #[test]
    fn test_rate_saturates() {
        let entry = KineticsEntry::new("glc_e", 5.0, 10.0);
        assert_eq!(entry.rate(0.0), 0.0);
        assert!((entry.rate(5.0) - 5.0).abs() < 1e-12);
        assert!(entry.rate(1e9) < 10.0);
        assert!(entry.rate(1e9) > 9.99);
    }

    #[test]
    fn test_rate_guards_zero_denominator() {
        let entry = KineticsEntry::new("glc_e", 0.0, 10.0);
        assert_eq!(entry.rate(0.0), 0.0);
    }

    #[test]
    fn test_tables_are_independent() {
        let mut first = KineticsTable::new();
        let second = KineticsTable::new();
        first.add("GLCt", KineticsEntry::new("glc_e", 1.0, 1.0));
        assert!(second.is_empty());
    }

    #[test]
    fn test_collect_from_iterator() {
        let table: KineticsTable = vec![("R1".to_string(), KineticsEntry::new("s", 1.0, 2.0))]
            .into_iter()
            .collect();
        assert!(table.exists("R1"));
    }
}
