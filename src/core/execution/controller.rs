//! Tick resolution shared by the joint and parallel simulations.
//!
//! Both variants end a tick the same way: stage the proposed fluxes against
//! the committed state, reject the tick if a shared metabolite would go
//! negative, shrink the step analytically once, and hand back either a delta
//! to commit or the reason the run has to stop.

use crate::core::errors::SimulationError;
use crate::core::execution::config::SimulationConfig;
use crate::core::network::{MetabolicNetwork, TransporterMap};
use crate::core::oracle::FluxSolution;
use crate::core::state::{ExchangeFlux, FluxRecord, GrowthFlux, StateLedger, TickDelta};
use crate::core::types::SpeciesId;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a run stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The configured number of time points was reached
    MaxTicks,
    /// The objective dropped to epsilon or below
    ObjectiveBelowEpsilon { objective: f64 },
    /// The oracle returned a NaN objective
    ObjectiveNotANumber,
    /// The oracle reported failure for the named network
    OracleFailure { network: String, message: String },
    /// The step size fell to epsilon or below
    StepBelowEpsilon { dt: f64 },
    /// A metabolite would still go negative after step correction
    UnresolvedExhaustion { species: SpeciesId },
    /// Every organism of a parallel run returned an objective at or below epsilon
    AllOrganismsStalled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::MaxTicks => write!(f, "maximum number of ticks reached"),
            TerminationReason::ObjectiveBelowEpsilon { objective } => {
                write!(f, "objective {} at or below epsilon", objective)
            }
            TerminationReason::ObjectiveNotANumber => write!(f, "objective is NaN"),
            TerminationReason::OracleFailure { network, message } => {
                write!(f, "oracle failed for '{}': {}", network, message)
            }
            TerminationReason::StepBelowEpsilon { dt } => {
                write!(f, "step size {} at or below epsilon", dt)
            }
            TerminationReason::UnresolvedExhaustion { species } => {
                write!(f, "'{}' exhausted and step correction did not resolve it", species)
            }
            TerminationReason::AllOrganismsStalled => write!(f, "all organisms stopped growing"),
        }
    }
}

/// Position of a simulation in its tick loop
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StepState {
    /// Built and waiting for `simulate`
    #[default]
    Idle,
    Running,
    /// The current tick was rejected and is retried with `dt_hat`
    StepRejected { species: SpeciesId, dt_hat: f64 },
    /// The run stopped before the tick cap
    Terminated(TerminationReason),
    /// The run used every tick it was allowed
    Done,
}

/// Summary returned by `simulate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// Ticks committed during this call
    pub ticks: usize,
    /// Elapsed simulated time at the last committed tick
    pub elapsed: f64,
    /// Ticks that needed a step correction
    pub corrected_ticks: usize,
    pub reason: TerminationReason,
}

impl SimulationOutcome {
    /// True when the run stopped only because it reached the tick cap
    pub fn reached_max_ticks(&self) -> bool {
        self.reason == TerminationReason::MaxTicks
    }
}

/// One network's optimal solution for the current tick
pub(crate) struct Proposal<'a> {
    /// Key the fluxes are recorded under
    pub key: String,
    pub network: &'a MetabolicNetwork,
    pub transporters: &'a TransporterMap,
    pub solution: FluxSolution,
}

pub(crate) enum TickResolution {
    Commit { delta: TickDelta, corrected: bool },
    Terminate(TerminationReason),
}

/// Exact step after which `available` is used up at `consumption_rate`
///
/// Returns `None` when nothing is being consumed.
pub fn corrected_step_size(available: f64, consumption_rate: f64) -> Option<f64> {
    if !consumption_rate.is_finite() || consumption_rate <= 0.0 {
        return None;
    }
    Some(available / consumption_rate)
}

/// Total rate at which `species` is drawn from the pool
///
/// Sums, over all proposals, the fluxes of each network's importers of
/// `species`. A network whose importers carry no flux contributes its net
/// exchange uptake instead.
pub(crate) fn consumption_rate(proposals: &[Proposal<'_>], species: &str) -> f64 {
    proposals.iter().map(|p| proposal_uptake(p, species)).sum()
}

fn proposal_uptake(proposal: &Proposal<'_>, species: &str) -> f64 {
    let importers: f64 = proposal
        .transporters
        .importers_of(species)
        .map(|rid| proposal.solution.flux(rid))
        .sum();
    if importers > 0.0 {
        return importers;
    }

    proposal
        .network
        .reactions()
        .filter(|r| r.exchanged_species() == Some(species))
        .map(|r| -proposal.solution.flux(r.id()))
        .sum()
}

fn exchange_fluxes(proposals: &[Proposal<'_>]) -> Vec<ExchangeFlux> {
    let mut fluxes = Vec::new();
    for p in proposals {
        for reaction in p.network.reactions().filter(|r| r.is_exchange()) {
            if let Some(sid) = reaction.exchanged_species() {
                fluxes.push(ExchangeFlux::new(sid, p.solution.flux(reaction.id())));
            }
        }
    }
    fluxes
}

fn growth_fluxes(proposals: &[Proposal<'_>]) -> Vec<GrowthFlux> {
    proposals
        .iter()
        .flat_map(|p| {
            p.network
                .biomass_reaction_ids()
                .iter()
                .map(move |(org, rid)| GrowthFlux::new(org.clone(), p.solution.flux(rid)))
        })
        .collect()
}

fn flux_record(proposals: &[Proposal<'_>]) -> FluxRecord {
    FluxRecord {
        dt: 0.0,
        fluxes: proposals
            .iter()
            .map(|p| (p.key.clone(), p.solution.fluxes.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Stage, check and if needed correct one tick
///
/// `state` is moved to `StepRejected` while a correction is attempted.
pub(crate) fn resolve_tick(
    ledger: &StateLedger,
    proposals: &[Proposal<'_>],
    dt: f64,
    config: &SimulationConfig,
    state: &mut StepState,
) -> TickResolution {
    let exchanges = exchange_fluxes(proposals);
    let growth = growth_fluxes(proposals);
    let record = flux_record(proposals);

    let mut delta = TickDelta::stage(ledger, dt, &exchanges, &growth, record.clone());
    let violation = delta
        .most_negative(config.tolerance)
        .map(|(sid, value)| (sid.to_string(), value));
    let Some((species, value)) = violation else {
        delta.clamp_within(config.tolerance);
        return TickResolution::Commit {
            delta,
            corrected: false,
        };
    };

    let available = ledger.latest_concentration(&species).unwrap_or(0.0);
    let rate = consumption_rate(proposals, &species);
    let Some(dt_hat) = corrected_step_size(available, rate) else {
        warn!(
            "'{}' would reach {} but no consumption rate was found to correct the step",
            species, value
        );
        return TickResolution::Terminate(TerminationReason::UnresolvedExhaustion { species });
    };

    warn!(
        "Step rejected at t={}: '{}' would reach {} with dt={}, retrying with dt={}",
        ledger.elapsed(),
        species,
        value,
        dt,
        dt_hat
    );
    *state = StepState::StepRejected {
        species: species.clone(),
        dt_hat,
    };

    if dt_hat <= config.epsilon {
        return TickResolution::Terminate(TerminationReason::StepBelowEpsilon { dt: dt_hat });
    }

    let mut delta = TickDelta::stage(ledger, dt_hat, &exchanges, &growth, record);
    if let Some((still_negative, _)) = delta.most_negative(config.tolerance) {
        return TickResolution::Terminate(TerminationReason::UnresolvedExhaustion {
            species: still_negative.to_string(),
        });
    }
    delta.clamp_within(config.tolerance);
    debug!("Corrected step for '{}' accepted", species);
    *state = StepState::Running;
    TickResolution::Commit {
        delta,
        corrected: true,
    }
}

/// Track every exchanged and extracellular species of `network` in `ledger`
///
/// Caller values win. Otherwise an exchanged species starts at the uptake
/// capacity of its exchange (`-lower_bound`), never below what another
/// network already seeded; extracellular species without an exchange start
/// at zero.
pub(crate) fn seed_pool(
    ledger: &mut StateLedger,
    network: &MetabolicNetwork,
    given: &BTreeMap<SpeciesId, f64>,
) -> Result<(), SimulationError> {
    for reaction in network.reactions().filter(|r| r.is_exchange()) {
        let Some(sid) = reaction.exchanged_species() else {
            continue;
        };
        let value = match given.get(sid) {
            Some(value) => *value,
            None => {
                let seeded = ledger.latest_concentration(sid).unwrap_or(0.0);
                f64::max(-reaction.lower_bound(), seeded)
            }
        };
        if !value.is_finite() {
            return Err(SimulationError::invalid(format!(
                "initial concentration of '{}' is not finite; supply it explicitly",
                sid
            )));
        }
        ledger.track_species(sid, value);
    }

    for species in network.extracellular_species() {
        if !ledger.is_tracked(species.id()) {
            let value = given.get(species.id()).copied().unwrap_or(0.0);
            ledger.track_species(species.id(), value);
        }
    }
    Ok(())
}

/// Reject caller concentrations for untracked ids or with invalid values
pub(crate) fn check_given_concentrations(
    ledger: &StateLedger,
    given: &BTreeMap<SpeciesId, f64>,
) -> Result<(), SimulationError> {
    for (sid, value) in given {
        if !ledger.is_tracked(sid) {
            return Err(SimulationError::UnknownSpecies(sid.clone()));
        }
        if !value.is_finite() || *value < 0.0 {
            return Err(SimulationError::invalid(format!(
                "initial concentration of '{}' must be finite and non-negative, got {}",
                sid, value
            )));
        }
    }
    Ok(())
}

/// Reject initial biomasses that are negative or not finite
pub(crate) fn check_biomasses(biomasses: &[f64]) -> Result<(), SimulationError> {
    if let Some(bad) = biomasses.iter().find(|x| !x.is_finite() || **x < 0.0) {
        return Err(SimulationError::invalid(format!(
            "initial biomass must be finite and non-negative, got {}",
            bad
        )));
    }
    Ok(())
}
