//! Community biomass wiring for joint simulations.
//!
//! A joint run maximizes the growth of the whole community rather than of a
//! single organism. Every organism's biomass reaction is made to produce a
//! synthetic extracellular species, and a sink exchange draining that species
//! becomes the objective.

use crate::core::errors::SimulationError;
use crate::core::network::model::MetabolicNetwork;
use crate::core::network::reaction::Reaction;
use crate::core::network::species::Species;
use crate::core::network::transporters::TransporterMap;
use crate::core::types::{ReactionId, SpeciesId};

/// Id of the synthetic community biomass species
pub const COMMUNITY_BIOMASS_SPECIES: &str = "X_c";

/// Id of the community biomass sink reaction
pub const COMMUNITY_BIOMASS_EXCHANGE: &str = "X_comm";

/// Ids created by [`attach_community_biomass`]
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityBiomass {
    pub species: SpeciesId,
    pub exchange: ReactionId,
}

/// Wire the community biomass into `network` and make its sink the objective
pub fn attach_community_biomass(
    network: &mut MetabolicNetwork,
) -> Result<CommunityBiomass, SimulationError> {
    if network.biomass_reaction_ids().is_empty() {
        return Err(SimulationError::invalid(format!(
            "network '{}' declares no biomass reactions",
            network.id()
        )));
    }

    let compartment = network.extracellular_compartment().to_string();
    network.add_species(Species::new(COMMUNITY_BIOMASS_SPECIES, compartment))?;

    let biomass_ids: Vec<ReactionId> = network.biomass_reaction_ids().values().cloned().collect();
    for rid in &biomass_ids {
        network
            .reaction_mut(rid)
            .ok_or_else(|| SimulationError::UnknownReaction(rid.clone()))?
            .create_reagent(COMMUNITY_BIOMASS_SPECIES, 1.0);
    }

    network.add_reaction(Reaction::exchange(
        COMMUNITY_BIOMASS_EXCHANGE,
        COMMUNITY_BIOMASS_SPECIES,
        0.0,
        f64::INFINITY,
    ))?;
    network.set_objective(COMMUNITY_BIOMASS_EXCHANGE)?;

    Ok(CommunityBiomass {
        species: COMMUNITY_BIOMASS_SPECIES.to_string(),
        exchange: COMMUNITY_BIOMASS_EXCHANGE.to_string(),
    })
}

/// Register every biomass reaction as an exporter of the community species
pub fn register_biomass_exporters(
    network: &MetabolicNetwork,
    community: &CommunityBiomass,
    transporters: &mut TransporterMap,
) {
    for rid in network.biomass_reaction_ids().values() {
        transporters.add_exporter(rid.clone(), vec![community.species.clone()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_organisms() -> MetabolicNetwork {
        let mut net = MetabolicNetwork::new("community");
        net.add_species(Species::new("A_e", "e")).unwrap();
        net.add_reaction(Reaction::exchange("EX_A", "A_e", -10.0, 1000.0)).unwrap();
        for org in ["a", "b"] {
            let bio = format!("BIO_{org}");
            net.add_reaction(Reaction::new(bio.clone(), 1000.0).with_reagent("A_e", -1.0))
                .unwrap();
            net.set_biomass_reaction(org, &bio).unwrap();
        }
        net
    }

    #[test]
    fn test_attach_wires_every_biomass_reaction() {
        let mut net = two_organisms();
        let community = attach_community_biomass(&mut net).unwrap();

        assert_eq!(net.objective(), Some(COMMUNITY_BIOMASS_EXCHANGE));
        assert!(net.is_extracellular(&community.species));
        for rid in ["BIO_a", "BIO_b"] {
            assert_eq!(net.reaction(rid).unwrap().coefficient_of("X_c"), Some(1.0));
        }
        let sink = net.reaction(&community.exchange).unwrap();
        assert!(sink.is_exchange());
        assert_eq!(sink.lower_bound(), 0.0);
        assert!(sink.upper_bound().is_infinite());

        let mut transporters = TransporterMap::classify(&net);
        register_biomass_exporters(&net, &community, &mut transporters);
        assert!(transporters.is_exporter("BIO_a"));
        assert!(transporters.is_exporter("BIO_b"));
    }

    #[test]
    fn test_attach_requires_biomass_reactions() {
        let mut net = MetabolicNetwork::new("empty");
        assert!(attach_community_biomass(&mut net).is_err());
    }
}
