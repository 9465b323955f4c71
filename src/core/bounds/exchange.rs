use crate::core::errors::SimulationError;
use crate::core::network::MetabolicNetwork;
use crate::core::state::StateLedger;
use crate::core::types::ReactionId;

/// Ties exchange uptake bounds to the metabolite currently available
///
/// Within one tick an organism may import at most the whole pool of a
/// metabolite, expressed as a rate: `lower = min(0, -C * (1 / dt))`. Upper
/// bounds are not touched.
#[derive(Debug, Clone, Default)]
pub struct ExchangeCoupling {
    excluded: Vec<ReactionId>,
}

impl ExchangeCoupling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `rid` uncoupled (its bounds stay as configured)
    pub fn exclude(mut self, rid: impl Into<ReactionId>) -> Self {
        self.excluded.push(rid.into());
        self
    }

    pub fn is_excluded(&self, rid: &str) -> bool {
        self.excluded.iter().any(|r| r == rid)
    }

    /// Uptake bound for a pool of `concentration` over a step of `dt`
    pub fn uptake_bound(concentration: f64, dt: f64) -> f64 {
        f64::min(0.0, -concentration * (1.0 / dt))
    }

    pub fn apply(
        &self,
        network: &mut MetabolicNetwork,
        ledger: &StateLedger,
        dt: f64,
    ) -> Result<(), SimulationError> {
        let mut updates = Vec::new();
        for reaction in network.reactions().filter(|r| r.is_exchange()) {
            if self.is_excluded(reaction.id()) {
                continue;
            }
            let sid = reaction.exchanged_species().ok_or_else(|| SimulationError::InvalidExchange {
                reaction: reaction.id().to_string(),
                species_count: reaction.reagents().len(),
            })?;
            let concentration = ledger
                .latest_concentration(sid)
                .ok_or_else(|| SimulationError::UnknownSpecies(sid.to_string()))?;
            updates.push((reaction.id().to_string(), Self::uptake_bound(concentration, dt)));
        }

        for (rid, lower) in updates {
            if let Some(reaction) = network.reaction_mut(&rid) {
                reaction.set_lower_bound(lower);
            }
        }
        Ok(())
    }
}
