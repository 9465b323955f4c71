use crate::core::state::ledger::{FluxRecord, StateLedger};
use crate::core::types::{OrganismId, SpeciesId};
use std::collections::BTreeMap;

/// Exchange flux of one shared metabolite proposed for the current tick
///
/// Positive flux is secretion into the pool, negative flux is uptake.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeFlux {
    pub species: SpeciesId,
    pub flux: f64,
}

impl ExchangeFlux {
    pub fn new(species: impl Into<SpeciesId>, flux: f64) -> Self {
        Self {
            species: species.into(),
            flux,
        }
    }
}

/// Biomass reaction flux of one organism proposed for the current tick
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthFlux {
    pub organism: OrganismId,
    pub flux: f64,
}

impl GrowthFlux {
    pub fn new(organism: OrganismId, flux: f64) -> Self {
        Self { organism, flux }
    }
}

/// Tentative state of one tick, staged against the last committed state
///
/// A delta never touches the ledger. Rejecting a tick means dropping the
/// delta; accepting it means handing it to [`StateLedger::commit`], which
/// appends every series at once.
#[derive(Debug, Clone)]
pub struct TickDelta {
    dt: f64,
    concentrations: BTreeMap<SpeciesId, f64>,
    biomasses: BTreeMap<OrganismId, f64>,
    record: FluxRecord,
}

impl TickDelta {
    /// Stage `state + flux * dt` for every exchange and growth flux
    ///
    /// Secretion contributions are applied before uptake contributions on
    /// the same buffer. Species or organisms the ledger does not track are
    /// ignored.
    pub fn stage(
        ledger: &StateLedger,
        dt: f64,
        exchanges: &[ExchangeFlux],
        growth: &[GrowthFlux],
        mut record: FluxRecord,
    ) -> Self {
        let mut concentrations = ledger.latest_concentrations();
        let exports = exchanges.iter().filter(|e| e.flux > 0.0);
        let imports = exchanges.iter().filter(|e| e.flux <= 0.0);
        for exchange in exports.chain(imports) {
            if let Some(value) = concentrations.get_mut(&exchange.species) {
                *value += exchange.flux * dt;
            }
        }

        let mut biomasses = ledger.latest_biomasses();
        for g in growth {
            if let Some(value) = biomasses.get_mut(&g.organism) {
                *value += g.flux * dt;
            }
        }

        record.dt = dt;
        Self {
            dt,
            concentrations,
            biomasses,
            record,
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn concentration(&self, sid: &str) -> Option<f64> {
        self.concentrations.get(sid).copied()
    }

    pub fn biomass(&self, organism: &OrganismId) -> Option<f64> {
        self.biomasses.get(organism).copied()
    }

    /// The most negative staged concentration below `-tolerance`, if any
    ///
    /// Ties keep the first species in id order.
    pub fn most_negative(&self, tolerance: f64) -> Option<(&str, f64)> {
        let mut worst: Option<(&str, f64)> = None;
        for (sid, value) in &self.concentrations {
            if *value < -tolerance && worst.map_or(true, |(_, w)| *value < w) {
                worst = Some((sid.as_str(), *value));
            }
        }
        worst
    }

    /// Snap staged values within `tolerance` below zero to exactly zero
    pub fn clamp_within(&mut self, tolerance: f64) {
        for value in self.concentrations.values_mut() {
            if *value < 0.0 && *value >= -tolerance {
                *value = 0.0;
            }
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (f64, BTreeMap<SpeciesId, f64>, BTreeMap<OrganismId, f64>, FluxRecord) {
        (self.dt, self.concentrations, self.biomasses, self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> StateLedger {
        let mut ledger = StateLedger::new();
        ledger.track_species("A_e", 1.0);
        ledger.track_species("B_e", 1.0);
        ledger.track_organism(OrganismId::new("org"), 2.0);
        ledger
    }

    #[test]
    fn test_stage_does_not_touch_ledger() {
        let ledger = ledger();
        let delta = TickDelta::stage(
            &ledger,
            1.0,
            &[ExchangeFlux::new("A_e", -3.0)],
            &[GrowthFlux::new(OrganismId::new("org"), 0.5)],
            FluxRecord::default(),
        );
        assert_eq!(delta.concentration("A_e"), Some(-2.0));
        assert_eq!(delta.biomass(&OrganismId::new("org")), Some(2.5));
        assert_eq!(ledger.latest_concentration("A_e"), Some(1.0));
        assert_eq!(ledger.ticks(), 0);
    }

    #[test]
    fn test_exports_and_imports_net_out() {
        let ledger = ledger();
        let delta = TickDelta::stage(
            &ledger,
            0.5,
            &[ExchangeFlux::new("A_e", -4.0), ExchangeFlux::new("A_e", 2.0)],
            &[],
            FluxRecord::default(),
        );
        assert_eq!(delta.concentration("A_e"), Some(0.0));
    }

    #[test]
    fn test_most_negative_picks_lowest() {
        let ledger = ledger();
        let delta = TickDelta::stage(
            &ledger,
            1.0,
            &[ExchangeFlux::new("A_e", -2.0), ExchangeFlux::new("B_e", -5.0)],
            &[],
            FluxRecord::default(),
        );
        assert_eq!(delta.most_negative(1e-9), Some(("B_e", -4.0)));
    }

    #[test]
    fn test_tolerance_and_clamp() {
        let ledger = ledger();
        let mut delta = TickDelta::stage(
            &ledger,
            1.0,
            &[ExchangeFlux::new("A_e", -1.0 - 1e-12)],
            &[],
            FluxRecord::default(),
        );
        assert!(delta.most_negative(1e-9).is_none());
        delta.clamp_within(1e-9);
        assert_eq!(delta.concentration("A_e"), Some(0.0));
    }

    #[test]
    fn test_untracked_species_ignored() {
        let ledger = ledger();
        let delta = TickDelta::stage(
            &ledger,
            1.0,
            &[ExchangeFlux::new("Z_e", -1.0)],
            &[],
            FluxRecord::default(),
        );
        assert_eq!(delta.concentration("Z_e"), None);
        assert_eq!(delta.dt(), 1.0);
    }
}
