//! Dynamic FBA over separate per-organism networks.
//!
//! Each organism keeps its own network and is solved independently against
//! the same pre-tick snapshot of the shared pool. Proposals are only merged
//! once every organism has been solved, so the solves may run concurrently.

use crate::core::analysis;
use crate::core::bounds::{BoundUpdatePolicy, ExchangeCoupling};
use crate::core::errors::{OracleError, SimulationError};
use crate::core::execution::config::{ConcurrencyMode, SimulationConfig};
use crate::core::execution::controller::{
    check_biomasses, check_given_concentrations, resolve_tick, seed_pool, Proposal,
    SimulationOutcome, StepState, TerminationReason, TickResolution,
};
use crate::core::execution::hooks::{BoundOverride, SimulationHooks};
use crate::core::kinetics::KineticsTable;
use crate::core::network::{MetabolicNetwork, TransporterMap};
use crate::core::oracle::{FluxOracle, FluxSolution};
use crate::core::state::StateLedger;
use crate::core::types::{OrganismId, SpeciesId};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One organism of a parallel run
#[derive(Debug, Clone)]
pub struct OrganismModel {
    id: OrganismId,
    network: MetabolicNetwork,
    transporters: TransporterMap,
    policy: BoundUpdatePolicy,
}

impl OrganismModel {
    pub fn id(&self) -> &OrganismId {
        &self.id
    }

    pub fn network(&self) -> &MetabolicNetwork {
        &self.network
    }

    /// Bounds of non-exchange reactions are rederived every tick; change
    /// them through [`policy_mut`](Self::policy_mut) instead.
    pub fn network_mut(&mut self) -> &mut MetabolicNetwork {
        &mut self.network
    }

    pub fn transporters(&self) -> &TransporterMap {
        &self.transporters
    }

    pub fn policy(&self) -> &BoundUpdatePolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut BoundUpdatePolicy {
        &mut self.policy
    }

    /// The organism's growth reaction, which is also its objective
    pub fn biomass_reaction(&self) -> Option<&str> {
        self.network
            .biomass_reaction_ids()
            .get(&self.id)
            .map(String::as_str)
    }
}

/// Builder for [`DynamicParallelFba`]
#[derive(Default)]
pub struct DynamicParallelFbaBuilder {
    organisms: Vec<(MetabolicNetwork, f64)>,
    kinetics: HashMap<OrganismId, KineticsTable>,
    concentrations: BTreeMap<SpeciesId, f64>,
}

impl DynamicParallelFbaBuilder {
    /// Add an organism to the run
    ///
    /// # Arguments
    /// * `network` - The organism's own network; its id becomes the organism
    ///   id and its objective becomes the biomass reaction
    /// * `initial_biomass` - Biomass at t=0
    ///
    /// # Returns
    /// The builder with the organism appended
    pub fn organism(mut self, network: MetabolicNetwork, initial_biomass: f64) -> Self {
        self.organisms.push((network, initial_biomass));
        self
    }

    /// Use Michaelis-Menten upper bounds for some reactions of one organism
    ///
    /// # Arguments
    /// * `organism` - Id of an organism added with [`organism`](Self::organism)
    /// * `kinetics` - Entries keyed by that organism's reaction ids
    ///
    /// # Returns
    /// The builder with the organism's kinetics replaced
    pub fn kinetics(mut self, organism: impl Into<OrganismId>, kinetics: KineticsTable) -> Self {
        self.kinetics.insert(organism.into(), kinetics);
        self
    }

    pub fn concentration(mut self, sid: impl Into<SpeciesId>, value: f64) -> Self {
        self.concentrations.insert(sid.into(), value);
        self
    }

    pub fn concentrations<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<SpeciesId>,
    {
        self.concentrations
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Validate the organisms and seed the shared pool
    ///
    /// # Returns
    /// The simulation in the `Idle` state, or a configuration error for an
    /// empty or duplicated organism list, a network without objective,
    /// kinetics for an unknown organism or a missing limiting substrate
    pub fn build(self) -> Result<DynamicParallelFba, SimulationError> {
        let DynamicParallelFbaBuilder {
            organisms,
            mut kinetics,
            concentrations,
        } = self;

        if organisms.is_empty() {
            return Err(SimulationError::invalid("a parallel run needs at least one organism"));
        }
        let biomasses: Vec<f64> = organisms.iter().map(|(_, x)| *x).collect();
        check_biomasses(&biomasses)?;

        let mut seen = HashSet::new();
        let mut networks = Vec::with_capacity(organisms.len());
        for (mut network, biomass) in organisms {
            let id = OrganismId::new(network.id());
            if !seen.insert(id.clone()) {
                return Err(SimulationError::invalid(format!(
                    "organism '{}' added more than once",
                    id
                )));
            }
            let objective = network
                .objective()
                .map(str::to_string)
                .ok_or_else(|| SimulationError::MissingObjective(network.id().to_string()))?;
            network.set_biomass_reaction(id.clone(), &objective)?;
            networks.push((id, network, biomass));
        }

        if let Some(unknown) = kinetics.keys().find(|org| !seen.contains(*org)) {
            return Err(SimulationError::UnknownOrganism(unknown.clone()));
        }

        let mut ledger = StateLedger::new();
        for (_, network, _) in &networks {
            seed_pool(&mut ledger, network, &concentrations)?;
        }
        check_given_concentrations(&ledger, &concentrations)?;

        let mut models = Vec::with_capacity(networks.len());
        for (id, network, biomass) in networks {
            ledger.track_organism(id.clone(), biomass);
            let policy = BoundUpdatePolicy::new(&network, kinetics.remove(&id).unwrap_or_default());
            policy.validate_kinetics(&ledger)?;
            models.push(OrganismModel {
                transporters: TransporterMap::classify(&network),
                id,
                network,
                policy,
            });
        }

        debug!(
            "Built parallel simulation with {} organisms and {} tracked metabolites",
            models.len(),
            ledger.metabolites().len()
        );

        Ok(DynamicParallelFba {
            organisms: models,
            coupling: ExchangeCoupling::new(),
            ledger,
            state: StepState::Idle,
        })
    }
}

/// Dynamic FBA of organisms that only interact through the shared pool
pub struct DynamicParallelFba {
    organisms: Vec<OrganismModel>,
    coupling: ExchangeCoupling,
    ledger: StateLedger,
    state: StepState,
}

impl DynamicParallelFba {
    pub fn builder() -> DynamicParallelFbaBuilder {
        DynamicParallelFbaBuilder::default()
    }

    /// Organisms with their initial biomasses, default concentrations and no
    /// kinetics
    pub fn new<I>(organisms: I) -> Result<Self, SimulationError>
    where
        I: IntoIterator<Item = (MetabolicNetwork, f64)>,
    {
        organisms
            .into_iter()
            .fold(Self::builder(), |b, (network, biomass)| b.organism(network, biomass))
            .build()
    }

    pub fn organisms(&self) -> &[OrganismModel] {
        &self.organisms
    }

    pub fn organism(&self, id: &OrganismId) -> Option<&OrganismModel> {
        self.organisms.iter().find(|o| &o.id == id)
    }

    pub fn organism_mut(&mut self, id: &OrganismId) -> Option<&mut OrganismModel> {
        self.organisms.iter_mut().find(|o| &o.id == id)
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }

    /// Mutable access for deviations that pulse metabolites
    pub fn ledger_mut(&mut self) -> &mut StateLedger {
        &mut self.ledger
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    pub fn simulate<O>(
        &mut self,
        oracle: &O,
        config: &SimulationConfig,
    ) -> Result<SimulationOutcome, SimulationError>
    where
        O: FluxOracle + ?Sized,
    {
        self.simulate_with_hooks(oracle, config, SimulationHooks::default())
    }

    /// Run ticks until the tick cap or a termination condition
    ///
    /// With [`ConcurrencyMode::Rayon`] the per-organism solves of a tick run
    /// on a Rayon pool, sized by `thread_pool_size` when given.
    ///
    /// # Arguments
    /// * `oracle` - Solves each organism network once per tick
    /// * `config` - Step size, tick cap, thresholds and concurrency mode
    /// * `hooks` - Optional bound override and deviation
    ///
    /// # Returns
    /// How the run stopped, or an error for invalid configuration
    pub fn simulate_with_hooks<O>(
        &mut self,
        oracle: &O,
        config: &SimulationConfig,
        mut hooks: SimulationHooks<'_, Self>,
    ) -> Result<SimulationOutcome, SimulationError>
    where
        O: FluxOracle + ?Sized,
    {
        config.validate()?;
        let pool = match (config.concurrency_mode, config.thread_pool_size) {
            (ConcurrencyMode::Rayon, Some(n)) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| SimulationError::ThreadPool(e.to_string()))?,
            ),
            _ => None,
        };

        let dt_save = config.dt;
        let start_ticks = self.ledger.ticks();
        let mut corrected_ticks = 0;
        let mut run_condition: i64 = 0;
        self.state = StepState::Running;
        debug!(
            "Running {} organisms with dt={} max_ticks={} mode={:?} bound_override={} deviation={}",
            self.organisms.len(),
            dt_save,
            config.max_ticks,
            config.concurrency_mode,
            hooks.has_bound_override(),
            hooks.has_deviation()
        );

        let reason = 'run: loop {
            if self.ledger.times().len() >= config.max_ticks {
                break TerminationReason::MaxTicks;
            }
            if dt_save < config.epsilon {
                break TerminationReason::StepBelowEpsilon { dt: dt_save };
            }

            if let Some(deviate) = hooks.deviate.as_mut() {
                let times = self.ledger.times().to_vec();
                run_condition += deviate(self, &times, run_condition);
            }

            let dt = dt_save;
            self.derive_bounds(&mut hooks.bound_override, dt)?;

            let results: Vec<Result<FluxSolution, OracleError>> = match config.concurrency_mode {
                ConcurrencyMode::Sequential => self
                    .organisms
                    .iter()
                    .map(|o| oracle.solve(&o.network))
                    .collect(),
                ConcurrencyMode::Rayon => {
                    let solve = || {
                        self.organisms
                            .par_iter()
                            .map(|o| oracle.solve(&o.network))
                            .collect::<Vec<_>>()
                    };
                    match &pool {
                        Some(pool) => pool.install(solve),
                        None => solve(),
                    }
                }
            };

            let mut solutions = Vec::with_capacity(results.len());
            let mut stalled = 0;
            for (organism, result) in self.organisms.iter().zip(results) {
                let solution = match result {
                    Ok(solution) => solution,
                    Err(e) => {
                        break 'run TerminationReason::OracleFailure {
                            network: organism.id.to_string(),
                            message: e.to_string(),
                        }
                    }
                };
                if solution.objective.is_nan() {
                    break 'run TerminationReason::ObjectiveNotANumber;
                }
                if solution.objective <= config.epsilon {
                    debug!("Organism '{}' stalled at t={}", organism.id, self.ledger.elapsed());
                    stalled += 1;
                }
                solutions.push(solution);
            }
            if stalled == self.organisms.len() {
                break TerminationReason::AllOrganismsStalled;
            }
            debug!(
                "t={} dt={} objectives={:?}",
                self.ledger.elapsed(),
                dt,
                solutions.iter().map(|s| s.objective).collect::<Vec<_>>()
            );

            let proposals: Vec<Proposal<'_>> = self
                .organisms
                .iter()
                .zip(solutions)
                .map(|(organism, solution)| Proposal {
                    key: organism.id.to_string(),
                    network: &organism.network,
                    transporters: &organism.transporters,
                    solution,
                })
                .collect();
            let resolution = resolve_tick(&self.ledger, &proposals, dt, config, &mut self.state);
            match resolution {
                TickResolution::Commit { delta, corrected } => {
                    if corrected {
                        corrected_ticks += 1;
                    }
                    self.ledger.commit(delta);
                }
                TickResolution::Terminate(reason) => break reason,
            }
        };

        self.state = match reason {
            TerminationReason::MaxTicks => StepState::Done,
            ref other => StepState::Terminated(other.clone()),
        };
        if reason == TerminationReason::AllOrganismsStalled {
            warn!("Every organism stopped growing at t={}", self.ledger.elapsed());
        }
        info!(
            "Parallel simulation stopped at t={} after {} ticks: {}",
            self.ledger.elapsed(),
            self.ledger.ticks() - start_ticks,
            reason
        );

        Ok(SimulationOutcome {
            ticks: self.ledger.ticks() - start_ticks,
            elapsed: self.ledger.elapsed(),
            corrected_ticks,
            reason,
        })
    }

    fn derive_bounds(
        &mut self,
        bound_override: &mut Option<BoundOverride<'_>>,
        dt: f64,
    ) -> Result<(), SimulationError> {
        for organism in self.organisms.iter_mut() {
            match bound_override.as_mut() {
                Some(f) => f(&mut organism.network, &self.ledger)?,
                None => {
                    let biomass = self
                        .ledger
                        .latest_biomass(&organism.id)
                        .ok_or_else(|| SimulationError::UnknownOrganism(organism.id.clone()))?;
                    organism
                        .policy
                        .apply(&mut organism.network, &self.ledger, |_| Some(biomass))?;
                }
            }
            self.coupling.apply(&mut organism.network, &self.ledger, dt)?;
        }
        Ok(())
    }

    fn model(&self, id: &OrganismId) -> Result<&OrganismModel, SimulationError> {
        self.organism(id)
            .ok_or_else(|| SimulationError::UnknownOrganism(id.clone()))
    }

    /// Flux of `rid` in `organism`'s network at every committed tick
    pub fn flux_values(&self, organism: &OrganismId, rid: &str) -> Result<Vec<f64>, SimulationError> {
        let model = self.model(organism)?;
        if !model.network.has_reaction(rid) {
            return Err(SimulationError::UnknownReaction(rid.to_string()));
        }
        Ok(analysis::network_flux_series(&self.ledger, organism.as_str(), rid))
    }

    /// Flux of `rid` per unit biomass of `organism`
    pub fn specific_flux_values(
        &self,
        organism: &OrganismId,
        rid: &str,
    ) -> Result<Vec<f64>, SimulationError> {
        let model = self.model(organism)?;
        let reaction = model
            .network
            .reaction(rid)
            .ok_or_else(|| SimulationError::UnknownReaction(rid.to_string()))?;
        if reaction.is_exchange() {
            return Err(SimulationError::NotSpecificFlux(rid.to_string()));
        }
        let fluxes = analysis::network_flux_series(&self.ledger, organism.as_str(), rid);
        analysis::per_biomass(&self.ledger, &fluxes, organism)
    }

    /// Summed biomass flux over total biomass at every committed tick
    pub fn community_growth_rate(&self) -> Vec<f64> {
        let biomass: Vec<(&str, &str)> = self
            .organisms
            .iter()
            .filter_map(|o| o.biomass_reaction().map(|rid| (o.id.as_str(), rid)))
            .collect();
        analysis::community_growth_rate(&self.ledger, |record| {
            biomass
                .iter()
                .map(|(key, rid)| record.network_flux(key, rid).unwrap_or(0.0))
                .sum()
        })
    }

    pub fn relative_abundance(&self) -> BTreeMap<OrganismId, Vec<f64>> {
        analysis::relative_abundance(&self.ledger)
    }
}
