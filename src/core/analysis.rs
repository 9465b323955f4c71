//! Post-run views over a committed [`StateLedger`].
//!
//! All series returned here have one entry per committed tick, aligned with
//! `ledger.fluxes()`. Entry `t` pairs the fluxes of tick `t` with the state
//! at time point `t` they were computed from.

use crate::core::errors::SimulationError;
use crate::core::state::{FluxRecord, StateLedger};
use crate::core::types::OrganismId;
use std::collections::BTreeMap;

/// Flux of `rid` for every committed tick, zero where it was not reported
pub fn flux_series(ledger: &StateLedger, rid: &str) -> Vec<f64> {
    ledger
        .fluxes()
        .iter()
        .map(|record| record.flux(rid).unwrap_or(0.0))
        .collect()
}

/// Flux of `rid` in the network stored under `key` for every committed tick
pub fn network_flux_series(ledger: &StateLedger, key: &str, rid: &str) -> Vec<f64> {
    ledger
        .fluxes()
        .iter()
        .map(|record| record.network_flux(key, rid).unwrap_or(0.0))
        .collect()
}

/// Divide a flux series by the biomass of `organism` at each tick
///
/// Ticks where the biomass is zero yield zero.
pub fn per_biomass(
    ledger: &StateLedger,
    fluxes: &[f64],
    organism: &OrganismId,
) -> Result<Vec<f64>, SimulationError> {
    let biomass = ledger
        .biomass(organism)
        .ok_or_else(|| SimulationError::UnknownOrganism(organism.clone()))?;
    Ok(fluxes
        .iter()
        .zip(biomass)
        .map(|(flux, x)| if *x == 0.0 { 0.0 } else { flux / x })
        .collect())
}

/// Specific growth rate of the whole community at each tick
///
/// `growth` extracts the summed biomass-reaction flux from one record; it is
/// divided by the total biomass at the start of that tick.
pub fn community_growth_rate<F>(ledger: &StateLedger, growth: F) -> Vec<f64>
where
    F: Fn(&FluxRecord) -> f64,
{
    ledger
        .fluxes()
        .iter()
        .enumerate()
        .map(|(t, record)| {
            let total = total_biomass_at(ledger, t);
            if total == 0.0 {
                0.0
            } else {
                growth(record) / total
            }
        })
        .collect()
}

/// Share of each organism in the total biomass at every time point
pub fn relative_abundance(ledger: &StateLedger) -> BTreeMap<OrganismId, Vec<f64>> {
    let points = ledger.times().len();
    let totals: Vec<f64> = (0..points).map(|t| total_biomass_at(ledger, t)).collect();
    ledger
        .biomasses()
        .iter()
        .map(|(org, series)| {
            let shares = series
                .iter()
                .zip(&totals)
                .map(|(x, total)| if *total == 0.0 { 0.0 } else { x / total })
                .collect();
            (org.clone(), shares)
        })
        .collect()
}

fn total_biomass_at(ledger: &StateLedger, t: usize) -> f64 {
    ledger
        .biomasses()
        .values()
        .filter_map(|series| series.get(t))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::{GrowthFlux, TickDelta};
    use crate::core::types::FluxMap;

    fn ledger() -> StateLedger {
        let mut ledger = StateLedger::new();
        ledger.track_organism(OrganismId::new("a"), 1.0);
        ledger.track_organism(OrganismId::new("b"), 3.0);
        for flux in [2.0, 4.0] {
            let record = FluxRecord {
                dt: 0.0,
                fluxes: BTreeMap::from([(
                    "n".to_string(),
                    FluxMap::from([("BIO_a".to_string(), flux), ("BIO_b".to_string(), 0.0)]),
                )]),
            };
            let delta = TickDelta::stage(
                &ledger,
                1.0,
                &[],
                &[GrowthFlux::new(OrganismId::new("a"), flux)],
                record,
            );
            ledger.commit(delta);
        }
        ledger
    }

    #[test]
    fn test_flux_series() {
        let ledger = ledger();
        assert_eq!(flux_series(&ledger, "BIO_a"), vec![2.0, 4.0]);
        assert_eq!(flux_series(&ledger, "missing"), vec![0.0, 0.0]);
        assert_eq!(network_flux_series(&ledger, "n", "BIO_a"), vec![2.0, 4.0]);
        assert_eq!(network_flux_series(&ledger, "other", "BIO_a"), vec![0.0, 0.0]);
    }

    #[test]
    fn test_per_biomass() {
        let ledger = ledger();
        let fluxes = flux_series(&ledger, "BIO_a");
        // Biomass of a: 1.0, 3.0 at the start of each tick
        let specific = per_biomass(&ledger, &fluxes, &OrganismId::new("a")).unwrap();
        assert_eq!(specific.len(), 2);
        assert!((specific[0] - 2.0).abs() < 1e-12);
        assert!((specific[1] - 4.0 / 3.0).abs() < 1e-12);
        assert!(per_biomass(&ledger, &fluxes, &OrganismId::new("zz")).is_err());
    }

    #[test]
    fn test_community_growth_rate() {
        let ledger = ledger();
        let rate = community_growth_rate(&ledger, |r| {
            r.flux("BIO_a").unwrap_or(0.0) + r.flux("BIO_b").unwrap_or(0.0)
        });
        // Totals 4.0 then 6.0
        assert_eq!(rate, vec![0.5, 4.0 / 6.0]);
    }

    #[test]
    fn test_relative_abundance_sums_to_one() {
        let ledger = ledger();
        let shares = relative_abundance(&ledger);
        for t in 0..ledger.times().len() {
            let sum: f64 = shares.values().map(|s| s[t]).sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
        assert_eq!(shares[&OrganismId::new("a")][0], 0.25);
    }
}
