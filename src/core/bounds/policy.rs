use crate::core::errors::SimulationError;
use crate::core::kinetics::KineticsTable;
use crate::core::network::MetabolicNetwork;
use crate::core::state::StateLedger;
use crate::core::types::ReactionId;
use indexmap::IndexMap;

/// Per-reaction (lower, upper) bounds captured when a simulation is built
///
/// These are the per-unit-biomass rate laws; every tick multiplies them by
/// the owning organism's latest biomass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialBoundSnapshot {
    bounds: IndexMap<ReactionId, (f64, f64)>,
}

impl InitialBoundSnapshot {
    pub fn capture(network: &MetabolicNetwork) -> Self {
        Self {
            bounds: network
                .reactions()
                .map(|r| (r.id().to_string(), r.bounds()))
                .collect(),
        }
    }

    pub fn get(&self, rid: &str) -> Option<(f64, f64)> {
        self.bounds.get(rid).copied()
    }

    /// Replace the per-unit-biomass bounds of a captured reaction
    pub fn set(&mut self, rid: &str, lower: f64, upper: f64) -> Result<(), SimulationError> {
        let bounds = self
            .bounds
            .get_mut(rid)
            .ok_or_else(|| SimulationError::UnknownReaction(rid.to_string()))?;
        *bounds = (lower, upper);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

/// Rescales static reaction bounds into bounds for the current tick
///
/// `lower = initial_lower * X` and `upper = initial_upper * X`, or a
/// Michaelis-Menten rate `vmax * S / (km + S) * X` for reactions with a
/// kinetics entry, where `X` is the owning organism's latest biomass.
#[derive(Debug, Clone)]
pub struct BoundUpdatePolicy {
    initial: InitialBoundSnapshot,
    kinetics: KineticsTable,
}

impl BoundUpdatePolicy {
    pub fn new(network: &MetabolicNetwork, kinetics: KineticsTable) -> Self {
        Self {
            initial: InitialBoundSnapshot::capture(network),
            kinetics,
        }
    }

    pub fn initial_bounds(&self) -> &InitialBoundSnapshot {
        &self.initial
    }

    /// Rate laws used from the next tick on; deviations edit these rather
    /// than the network, whose owned reactions are rewritten every tick
    pub fn initial_bounds_mut(&mut self) -> &mut InitialBoundSnapshot {
        &mut self.initial
    }

    pub fn kinetics(&self) -> &KineticsTable {
        &self.kinetics
    }

    pub fn kinetics_mut(&mut self) -> &mut KineticsTable {
        &mut self.kinetics
    }

    /// Bounds of `rid` for an organism with biomass `biomass`
    ///
    /// Returns `Ok(None)` for reactions that were not part of the network
    /// when the snapshot was taken.
    pub fn bounds_for(
        &self,
        rid: &str,
        biomass: f64,
        ledger: &StateLedger,
    ) -> Result<Option<(f64, f64)>, SimulationError> {
        let Some((lower, upper)) = self.initial.get(rid) else {
            return Ok(None);
        };

        let upper = match self.kinetics.get(rid) {
            Some(entry) => {
                let s = ledger
                    .latest_concentration(&entry.limiting_species)
                    .ok_or_else(|| SimulationError::NoLimitingSubstrateFound {
                        reaction: rid.to_string(),
                        species: entry.limiting_species.clone(),
                    })?;
                entry.rate(s) * biomass
            }
            None => upper * biomass,
        };

        Ok(Some((lower * biomass, upper)))
    }

    /// Rewrite the bounds of every non-exchange reaction owned by an organism
    ///
    /// `biomass_of` maps a reaction id to the latest biomass of its owner;
    /// reactions it returns `None` for keep their current bounds.
    pub fn apply<F>(
        &self,
        network: &mut MetabolicNetwork,
        ledger: &StateLedger,
        biomass_of: F,
    ) -> Result<(), SimulationError>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let mut updates = Vec::new();
        for reaction in network.reactions().filter(|r| !r.is_exchange()) {
            let Some(biomass) = biomass_of(reaction.id()) else {
                continue;
            };
            if let Some(bounds) = self.bounds_for(reaction.id(), biomass, ledger)? {
                updates.push((reaction.id().to_string(), bounds));
            }
        }

        for (rid, (lower, upper)) in updates {
            network.set_bounds(&rid, lower, upper)?;
        }
        Ok(())
    }

    /// Check that every kinetics entry limits on a tracked metabolite
    pub fn validate_kinetics(&self, ledger: &StateLedger) -> Result<(), SimulationError> {
        for (rid, entry) in self.kinetics.iter() {
            if !ledger.is_tracked(&entry.limiting_species) {
                return Err(SimulationError::NoLimitingSubstrateFound {
                    reaction: rid.clone(),
                    species: entry.limiting_species.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::{Reaction, Species};

    fn network() -> MetabolicNetwork {
        let mut net = MetabolicNetwork::new("n");
        net.add_species(Species::new("A_e", "e")).unwrap();
        net.add_species(Species::new("A_c", "c")).unwrap();
        net.add_reaction(Reaction::exchange("EX_A", "A_e", -10.0, 1000.0)).unwrap();
        net.add_organism_reaction(
            "org",
            Reaction::new("R_upt", 10.0)
                .with_bounds(-1.0, 10.0)
                .with_reagent("A_e", -1.0)
                .with_reagent("A_c", 1.0),
        )
        .unwrap();
        net.add_organism_reaction("org", Reaction::new("R_bio", 4.0).with_reagent("A_c", -1.0))
            .unwrap();
        net
    }

    fn ledger(a: f64) -> StateLedger {
        let mut ledger = StateLedger::new();
        ledger.track_species("A_e", a);
        ledger
    }

    #[test]
    fn test_linear_scaling() {
        let mut net = network();
        let policy = BoundUpdatePolicy::new(&net, KineticsTable::new());
        policy.apply(&mut net, &ledger(5.0), |_| Some(2.0)).unwrap();

        assert_eq!(net.reaction("R_upt").unwrap().bounds(), (-2.0, 20.0));
        assert_eq!(net.reaction("R_bio").unwrap().bounds(), (0.0, 8.0));
        // Exchanges are left to exchange coupling
        assert_eq!(net.reaction("EX_A").unwrap().bounds(), (-10.0, 1000.0));
    }

    #[test]
    fn test_scaling_uses_snapshot_not_current_bounds() {
        let mut net = network();
        let policy = BoundUpdatePolicy::new(&net, KineticsTable::new());
        policy.apply(&mut net, &ledger(5.0), |_| Some(2.0)).unwrap();
        policy.apply(&mut net, &ledger(5.0), |_| Some(3.0)).unwrap();
        assert_eq!(net.reaction("R_upt").unwrap().bounds(), (-3.0, 30.0));
    }

    #[test]
    fn test_michaelis_menten_upper_bound() {
        let mut net = network();
        let kinetics = KineticsTable::new().with("R_upt", "A_e", 5.0, 10.0);
        let policy = BoundUpdatePolicy::new(&net, kinetics);
        policy.apply(&mut net, &ledger(5.0), |_| Some(2.0)).unwrap();

        let (lower, upper) = net.reaction("R_upt").unwrap().bounds();
        assert_eq!(lower, -2.0);
        // 10 * 5 / (5 + 5) * 2
        assert!((upper - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_limiting_substrate_is_fatal() {
        let mut net = network();
        let kinetics = KineticsTable::new().with("R_upt", "B_e", 5.0, 10.0);
        let policy = BoundUpdatePolicy::new(&net, kinetics);
        let result = policy.apply(&mut net, &ledger(5.0), |_| Some(1.0));
        assert!(matches!(
            result,
            Err(SimulationError::NoLimitingSubstrateFound { ref reaction, ref species })
                if reaction == "R_upt" && species == "B_e"
        ));
        assert!(policy.validate_kinetics(&ledger(5.0)).is_err());
    }

    #[test]
    fn test_unowned_reactions_keep_bounds() {
        let mut net = network();
        let policy = BoundUpdatePolicy::new(&net, KineticsTable::new());
        policy
            .apply(&mut net, &ledger(5.0), |rid| (rid == "R_bio").then_some(2.0))
            .unwrap();
        assert_eq!(net.reaction("R_upt").unwrap().bounds(), (-1.0, 10.0));
        assert_eq!(net.reaction("R_bio").unwrap().bounds(), (0.0, 8.0));
    }

    #[test]
    fn test_edited_snapshot_applies_next_derivation() {
        let mut net = network();
        let mut policy = BoundUpdatePolicy::new(&net, KineticsTable::new());
        policy.initial_bounds_mut().set("R_bio", 0.0, 1.0).unwrap();
        policy.apply(&mut net, &ledger(5.0), |_| Some(2.0)).unwrap();
        assert_eq!(net.reaction("R_bio").unwrap().bounds(), (0.0, 2.0));
        assert!(policy.initial_bounds_mut().set("missing", 0.0, 1.0).is_err());
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let mut net = network();
        let kinetics = KineticsTable::new().with("R_upt", "A_e", 1.0, 3.0);
        let policy = BoundUpdatePolicy::new(&net, kinetics);
        let state = ledger(4.0);

        policy.apply(&mut net, &state, |_| Some(1.5)).unwrap();
        let first: Vec<_> = net.reactions().map(|r| r.bounds()).collect();
        policy.apply(&mut net, &state, |_| Some(1.5)).unwrap();
        let second: Vec<_> = net.reactions().map(|r| r.bounds()).collect();
        assert_eq!(first, second);
    }
}
