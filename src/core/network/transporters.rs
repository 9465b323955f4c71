use crate::core::network::model::MetabolicNetwork;
use crate::core::types::{ReactionId, SpeciesId};
use std::collections::BTreeMap;

/// Reactions coupled to an extracellular species, split by direction
///
/// Built once when a simulation is constructed and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransporterMap {
    importers: BTreeMap<ReactionId, Vec<SpeciesId>>,
    exporters: BTreeMap<ReactionId, Vec<SpeciesId>>,
}

impl TransporterMap {
    /// Classify the non-exchange reactions of `network`
    ///
    /// A reagent in the extracellular compartment with coefficient exactly -1
    /// makes the reaction an importer of that species, exactly +1 an exporter.
    /// Other coefficients are left unclassified.
    pub fn classify(network: &MetabolicNetwork) -> Self {
        let mut map = Self::default();
        for reaction in network.reactions().filter(|r| !r.is_exchange()) {
            for reagent in reaction.reagents() {
                if !network.is_extracellular(&reagent.species) {
                    continue;
                }
                if reagent.coefficient == -1.0 {
                    map.importers
                        .entry(reaction.id().to_string())
                        .or_default()
                        .push(reagent.species.clone());
                } else if reagent.coefficient == 1.0 {
                    map.exporters
                        .entry(reaction.id().to_string())
                        .or_default()
                        .push(reagent.species.clone());
                }
            }
        }
        map
    }

    /// Register `rid` as importer of `species`, replacing any classification
    pub fn add_importer(&mut self, rid: impl Into<ReactionId>, species: Vec<SpeciesId>) {
        self.importers.insert(rid.into(), species);
    }

    /// Register `rid` as exporter of `species`, replacing any classification
    pub fn add_exporter(&mut self, rid: impl Into<ReactionId>, species: Vec<SpeciesId>) {
        self.exporters.insert(rid.into(), species);
    }

    pub fn importers(&self) -> &BTreeMap<ReactionId, Vec<SpeciesId>> {
        &self.importers
    }

    pub fn exporters(&self) -> &BTreeMap<ReactionId, Vec<SpeciesId>> {
        &self.exporters
    }

    /// Importers and exporters combined; exporters win on overlap
    pub fn transporters(&self) -> BTreeMap<ReactionId, Vec<SpeciesId>> {
        let mut all = self.importers.clone();
        all.extend(self.exporters.iter().map(|(k, v)| (k.clone(), v.clone())));
        all
    }

    /// Species moved by `rid`; exporters are consulted first
    pub fn species_of(&self, rid: &str) -> Option<&[SpeciesId]> {
        self.exporters
            .get(rid)
            .or_else(|| self.importers.get(rid))
            .map(Vec::as_slice)
    }

    pub fn is_importer(&self, rid: &str) -> bool {
        self.importers.contains_key(rid)
    }

    pub fn is_exporter(&self, rid: &str) -> bool {
        self.exporters.contains_key(rid)
    }

    /// Importer reactions whose species list contains `species`
    pub fn importers_of<'a>(&'a self, species: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.importers
            .iter()
            .filter(move |(_, sids)| sids.iter().any(|s| s == species))
            .map(|(rid, _)| rid.as_str())
    }
}
