use crate::core::errors::SimulationError;
use crate::core::network::reaction::Reaction;
use crate::core::network::species::Species;
use crate::core::types::{OrganismId, ReactionId, SpeciesId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default id of the shared extracellular compartment
pub const EXTRACELLULAR: &str = "e";

/// Stoichiometric model of one organism or of a merged community
///
/// This is a plain value type: it holds species, reactions and ownership
/// bookkeeping but knows nothing about time. Simulations keep their own copy
/// and rewrite its bounds every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetabolicNetwork {
    id: String,
    extracellular: String,
    species: IndexMap<SpeciesId, Species>,
    reactions: IndexMap<ReactionId, Reaction>,
    /// Reaction id -> organism that owns it
    owners: HashMap<ReactionId, OrganismId>,
    /// Organism -> its biomass (growth) reaction
    biomass_reactions: IndexMap<OrganismId, ReactionId>,
    objective: Option<ReactionId>,
}

impl MetabolicNetwork {
    /// Create an empty network using `"e"` as extracellular compartment
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extracellular: EXTRACELLULAR.to_string(),
            species: IndexMap::new(),
            reactions: IndexMap::new(),
            owners: HashMap::new(),
            biomass_reactions: IndexMap::new(),
            objective: None,
        }
    }

    /// Use a different compartment id as the shared extracellular space
    pub fn with_extracellular_compartment(mut self, compartment: impl Into<String>) -> Self {
        self.extracellular = compartment.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn extracellular_compartment(&self) -> &str {
        &self.extracellular
    }

    pub fn add_species(&mut self, species: Species) -> Result<(), SimulationError> {
        if self.species.contains_key(species.id()) {
            return Err(SimulationError::DuplicateSpecies(species.id().to_string()));
        }
        self.species.insert(species.id().to_string(), species);
        Ok(())
    }

    /// Add a reaction, validating its reagents against the known species
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), SimulationError> {
        if self.reactions.contains_key(reaction.id()) {
            return Err(SimulationError::DuplicateReaction(reaction.id().to_string()));
        }
        if reaction.is_exchange() && reaction.reagents().len() != 1 {
            return Err(SimulationError::InvalidExchange {
                reaction: reaction.id().to_string(),
                species_count: reaction.reagents().len(),
            });
        }
        if let Some(missing) = reaction.species_ids().find(|sid| !self.species.contains_key(*sid)) {
            return Err(SimulationError::UnknownSpecies(missing.to_string()));
        }
        self.reactions.insert(reaction.id().to_string(), reaction);
        Ok(())
    }

    /// Add a reaction and record which organism owns it
    pub fn add_organism_reaction(
        &mut self,
        organism: impl Into<OrganismId>,
        reaction: Reaction,
    ) -> Result<(), SimulationError> {
        let rid = reaction.id().to_string();
        self.add_reaction(reaction)?;
        self.owners.insert(rid, organism.into());
        Ok(())
    }

    /// Record that an existing reaction belongs to `organism`
    pub fn assign_reaction(
        &mut self,
        rid: &str,
        organism: impl Into<OrganismId>,
    ) -> Result<(), SimulationError> {
        if !self.reactions.contains_key(rid) {
            return Err(SimulationError::UnknownReaction(rid.to_string()));
        }
        self.owners.insert(rid.to_string(), organism.into());
        Ok(())
    }

    /// Declare `rid` as the biomass reaction of `organism`
    ///
    /// The reaction is also assigned to the organism.
    pub fn set_biomass_reaction(
        &mut self,
        organism: impl Into<OrganismId>,
        rid: &str,
    ) -> Result<(), SimulationError> {
        let organism = organism.into();
        self.assign_reaction(rid, organism.clone())?;
        self.biomass_reactions.insert(organism, rid.to_string());
        Ok(())
    }

    pub fn set_objective(&mut self, rid: &str) -> Result<(), SimulationError> {
        if !self.reactions.contains_key(rid) {
            return Err(SimulationError::UnknownReaction(rid.to_string()));
        }
        self.objective = Some(rid.to_string());
        Ok(())
    }

    /// Reaction the oracle maximizes
    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    pub fn reaction_ids(&self) -> impl Iterator<Item = &str> {
        self.reactions.keys().map(String::as_str)
    }

    pub fn exchange_reaction_ids(&self) -> impl Iterator<Item = &str> {
        self.reactions
            .values()
            .filter(|r| r.is_exchange())
            .map(Reaction::id)
    }

    pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.values()
    }

    pub fn reaction(&self, rid: &str) -> Option<&Reaction> {
        self.reactions.get(rid)
    }

    pub fn reaction_mut(&mut self, rid: &str) -> Option<&mut Reaction> {
        self.reactions.get_mut(rid)
    }

    pub fn has_reaction(&self, rid: &str) -> bool {
        self.reactions.contains_key(rid)
    }

    /// Overwrite both bounds of a reaction
    pub fn set_bounds(&mut self, rid: &str, lower: f64, upper: f64) -> Result<(), SimulationError> {
        let reaction = self
            .reactions
            .get_mut(rid)
            .ok_or_else(|| SimulationError::UnknownReaction(rid.to_string()))?;
        reaction.set_lower_bound(lower);
        reaction.set_upper_bound(upper);
        Ok(())
    }

    pub fn species(&self, sid: &str) -> Option<&Species> {
        self.species.get(sid)
    }

    pub fn species_ids(&self) -> impl Iterator<Item = &str> {
        self.species.keys().map(String::as_str)
    }

    pub fn is_extracellular(&self, sid: &str) -> bool {
        self.species
            .get(sid)
            .map_or(false, |s| s.compartment() == self.extracellular)
    }

    /// Species in the shared extracellular compartment
    pub fn extracellular_species(&self) -> impl Iterator<Item = &Species> {
        self.species
            .values()
            .filter(move |s| s.compartment() == self.extracellular)
    }

    /// Organism that owns `rid`, if any
    pub fn identify_organism(&self, rid: &str) -> Option<&OrganismId> {
        self.owners.get(rid)
    }

    /// Organism id -> biomass reaction id, in registration order
    pub fn biomass_reaction_ids(&self) -> &IndexMap<OrganismId, ReactionId> {
        &self.biomass_reactions
    }

    pub fn organisms(&self) -> impl Iterator<Item = &OrganismId> {
        self.biomass_reactions.keys()
    }
}
