use crate::core::errors::SimulationError;
use crate::core::state::delta::TickDelta;
use crate::core::types::{FluxMap, OrganismId, SpeciesId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Realized fluxes of one committed tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxRecord {
    /// Step size the tick was committed with
    pub dt: f64,
    /// Network key -> flux map. Joint runs use the combined network id as the
    /// only key, parallel runs key by organism id.
    pub fluxes: BTreeMap<String, FluxMap>,
}

impl FluxRecord {
    /// Flux of `rid` in whichever network carries it
    pub fn flux(&self, rid: &str) -> Option<f64> {
        self.fluxes.values().find_map(|map| map.get(rid).copied())
    }

    /// Flux of `rid` in the network stored under `key`
    pub fn network_flux(&self, key: &str, rid: &str) -> Option<f64> {
        self.fluxes.get(key).and_then(|map| map.get(rid).copied())
    }
}

/// Authoritative time series of a simulation
///
/// Every series grows by exactly one entry per committed tick; nothing is
/// ever appended tentatively. Index `i` of `times`, of each metabolite series
/// and of each biomass series describe the same instant. `fluxes[i]` holds
/// the fluxes that carried the state from time point `i` to `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateLedger {
    times: Vec<f64>,
    metabolites: BTreeMap<SpeciesId, Vec<f64>>,
    biomasses: BTreeMap<OrganismId, Vec<f64>>,
    fluxes: Vec<FluxRecord>,
}

impl StateLedger {
    /// Create a ledger at time 0 with no tracked series
    pub fn new() -> Self {
        Self {
            times: vec![0.0],
            ..Self::default()
        }
    }

    /// Start tracking a metabolite, or overwrite its initial value
    ///
    /// Only valid before the first commit.
    pub(crate) fn track_species(&mut self, sid: impl Into<SpeciesId>, initial: f64) {
        debug_assert!(self.fluxes.is_empty());
        self.metabolites.insert(sid.into(), vec![initial]);
    }

    /// Start tracking an organism's biomass
    ///
    /// Only valid before the first commit.
    pub(crate) fn track_organism(&mut self, organism: OrganismId, initial: f64) {
        debug_assert!(self.fluxes.is_empty());
        self.biomasses.insert(organism, vec![initial]);
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Elapsed simulated time at the last committed tick
    pub fn elapsed(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Number of committed ticks
    pub fn ticks(&self) -> usize {
        self.fluxes.len()
    }

    pub fn metabolites(&self) -> &BTreeMap<SpeciesId, Vec<f64>> {
        &self.metabolites
    }

    pub fn biomasses(&self) -> &BTreeMap<OrganismId, Vec<f64>> {
        &self.biomasses
    }

    pub fn fluxes(&self) -> &[FluxRecord] {
        &self.fluxes
    }

    pub fn is_tracked(&self, sid: &str) -> bool {
        self.metabolites.contains_key(sid)
    }

    pub fn concentration(&self, sid: &str) -> Option<&[f64]> {
        self.metabolites.get(sid).map(Vec::as_slice)
    }

    pub fn latest_concentration(&self, sid: &str) -> Option<f64> {
        self.metabolites.get(sid).and_then(|s| s.last().copied())
    }

    pub fn biomass(&self, organism: &OrganismId) -> Option<&[f64]> {
        self.biomasses.get(organism).map(Vec::as_slice)
    }

    pub fn latest_biomass(&self, organism: &OrganismId) -> Option<f64> {
        self.biomasses.get(organism).and_then(|s| s.last().copied())
    }

    /// Latest committed value of every tracked metabolite
    pub fn latest_concentrations(&self) -> BTreeMap<SpeciesId, f64> {
        self.metabolites
            .iter()
            .filter_map(|(sid, series)| series.last().map(|v| (sid.clone(), *v)))
            .collect()
    }

    /// Latest committed biomass of every organism
    pub fn latest_biomasses(&self) -> BTreeMap<OrganismId, f64> {
        self.biomasses
            .iter()
            .filter_map(|(org, series)| series.last().map(|v| (org.clone(), *v)))
            .collect()
    }

    /// Add `amount` to the latest committed concentration of `sid`
    ///
    /// Used by deviation hooks to model a pulse addition (or removal) of a
    /// metabolite between ticks. The result may not go below zero.
    pub fn pulse(&mut self, sid: &str, amount: f64) -> Result<(), SimulationError> {
        let latest = self
            .metabolites
            .get_mut(sid)
            .and_then(|series| series.last_mut())
            .ok_or_else(|| SimulationError::UnknownSpecies(sid.to_string()))?;
        let updated = *latest + amount;
        if !updated.is_finite() || updated < 0.0 {
            return Err(SimulationError::invalid(format!(
                "pulse of {amount} would leave '{sid}' at {updated}"
            )));
        }
        *latest = updated;
        Ok(())
    }

    /// Append one tick to every series at once
    ///
    /// Metabolites or organisms the delta does not mention are carried
    /// forward unchanged, so all series keep the same length.
    pub(crate) fn commit(&mut self, delta: TickDelta) {
        let (dt, concentrations, biomasses, record) = delta.into_parts();

        for (sid, series) in self.metabolites.iter_mut() {
            let next = match concentrations.get(sid) {
                Some(value) => *value,
                None => series.last().copied().unwrap_or(0.0),
            };
            series.push(next);
        }
        for (org, series) in self.biomasses.iter_mut() {
            let next = match biomasses.get(org) {
                Some(value) => *value,
                None => series.last().copied().unwrap_or(0.0),
            };
            series.push(next);
        }

        let elapsed = self.elapsed();
        self.times.push(elapsed + dt);
        self.fluxes.push(record);
    }

    /// Serialize the whole ledger as pretty JSON
    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::delta::{ExchangeFlux, GrowthFlux};

    fn ledger() -> StateLedger {
        let mut ledger = StateLedger::new();
        ledger.track_species("A_e", 10.0);
        ledger.track_species("B_e", 1.0);
        ledger.track_organism(OrganismId::new("org"), 0.5);
        ledger
    }

    #[test]
    fn test_new_ledger_starts_at_zero() {
        let ledger = ledger();
        assert_eq!(ledger.times(), &[0.0]);
        assert_eq!(ledger.ticks(), 0);
        assert_eq!(ledger.latest_concentration("A_e"), Some(10.0));
        assert_eq!(ledger.latest_biomass(&OrganismId::new("org")), Some(0.5));
        assert_eq!(ledger.latest_concentration("missing"), None);
    }

    #[test]
    fn test_commit_appends_to_every_series() {
        let mut ledger = ledger();
        let delta = TickDelta::stage(
            &ledger,
            0.5,
            &[ExchangeFlux::new("A_e", -2.0)],
            &[GrowthFlux::new(OrganismId::new("org"), 1.0)],
            FluxRecord::default(),
        );
        ledger.commit(delta);

        assert_eq!(ledger.times(), &[0.0, 0.5]);
        assert_eq!(ledger.concentration("A_e"), Some(&[10.0, 9.0][..]));
        // Untouched species carried forward
        assert_eq!(ledger.concentration("B_e"), Some(&[1.0, 1.0][..]));
        assert_eq!(ledger.biomass(&OrganismId::new("org")), Some(&[0.5, 1.0][..]));
        assert_eq!(ledger.ticks(), 1);
        assert_eq!(ledger.fluxes()[0].dt, 0.5);
    }

    #[test]
    fn test_pulse() {
        let mut ledger = ledger();
        ledger.pulse("A_e", 5.0).unwrap();
        assert_eq!(ledger.latest_concentration("A_e"), Some(15.0));
        assert!(ledger.pulse("A_e", -100.0).is_err());
        assert!(matches!(ledger.pulse("C_e", 1.0), Err(SimulationError::UnknownSpecies(_))));
    }

    #[test]
    fn test_flux_record_lookup() {
        let mut record = FluxRecord::default();
        record.fluxes.insert("a".to_string(), FluxMap::from([("R1".to_string(), 1.5)]));
        record.fluxes.insert("b".to_string(), FluxMap::from([("R2".to_string(), -2.0)]));
        assert_eq!(record.flux("R2"), Some(-2.0));
        assert_eq!(record.network_flux("a", "R1"), Some(1.5));
        assert_eq!(record.network_flux("b", "R1"), None);
    }

    #[test]
    fn test_json_round_trip_keeps_series() {
        let ledger = ledger();
        let json = ledger.to_json().unwrap();
        let back: StateLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }
}
