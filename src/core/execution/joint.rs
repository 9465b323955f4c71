//! Dynamic FBA over one combined network.
//!
//! Every organism lives in the same [`MetabolicNetwork`] and one oracle call
//! per tick solves the whole community. By default the community's total
//! growth is the objective: each biomass reaction feeds a shared `X_c`
//! species drained by the `X_comm` sink.

use crate::core::analysis;
use crate::core::bounds::{BoundUpdatePolicy, ExchangeCoupling};
use crate::core::errors::SimulationError;
use crate::core::execution::config::SimulationConfig;
use crate::core::execution::controller::{
    check_biomasses, check_given_concentrations, resolve_tick, seed_pool, Proposal,
    SimulationOutcome, StepState, TerminationReason, TickResolution,
};
use crate::core::execution::hooks::{BoundOverride, SimulationHooks};
use crate::core::kinetics::KineticsTable;
use crate::core::network::community::register_biomass_exporters;
use crate::core::network::{attach_community_biomass, CommunityBiomass, MetabolicNetwork, TransporterMap};
use crate::core::oracle::FluxOracle;
use crate::core::state::StateLedger;
use crate::core::types::{OrganismId, ReactionId, SpeciesId};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

/// Builder for [`DynamicJointFba`]
pub struct DynamicJointFbaBuilder {
    network: MetabolicNetwork,
    biomasses: Vec<f64>,
    concentrations: BTreeMap<SpeciesId, f64>,
    kinetics: KineticsTable,
    community_biomass: bool,
}

impl DynamicJointFbaBuilder {
    /// Set the initial biomass of each organism
    ///
    /// # Arguments
    /// * `biomasses` - One value per organism, in the network's registration order
    ///
    /// # Returns
    /// The builder with the biomasses replaced
    pub fn biomasses(mut self, biomasses: impl IntoIterator<Item = f64>) -> Self {
        self.biomasses = biomasses.into_iter().collect();
        self
    }

    /// Set the initial concentration of one extracellular species
    ///
    /// # Arguments
    /// * `sid` - A species tracked in the shared pool
    /// * `value` - Its concentration at t=0, overriding the exchange default
    ///
    /// # Returns
    /// The builder with the concentration recorded
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

    /// Use Michaelis-Menten upper bounds for the reactions in `kinetics`
    ///
    /// # Arguments
    /// * `kinetics` - Entries keyed by organism-owned reaction id
    ///
    /// # Returns
    /// The builder with the kinetics table replaced
    pub fn kinetics(mut self, kinetics: KineticsTable) -> Self {
        self.kinetics = kinetics;
        self
    }

    /// Wire the `X_c` community biomass (default) or maximize the network's
    /// own objective
    pub fn community_biomass(mut self, enabled: bool) -> Self {
        self.community_biomass = enabled;
        self
    }

    /// Validate the inputs and assemble the simulation
    ///
    /// A network without declared organisms is treated as a single organism
    /// named after the network whose objective is its biomass reaction.
    ///
    /// # Returns
    /// The simulation in the `Idle` state, or a configuration error such as
    /// a biomass count mismatch, an unknown species or a missing limiting
    /// substrate
    pub fn build(self) -> Result<DynamicJointFba, SimulationError> {
        let DynamicJointFbaBuilder {
            mut network,
            biomasses,
            concentrations,
            kinetics,
            community_biomass,
        } = self;

        if network.biomass_reaction_ids().is_empty() {
            // A plain single-organism model: its objective is its growth and
            // every internal reaction belongs to it
            let objective = network
                .objective()
                .map(str::to_string)
                .ok_or_else(|| SimulationError::MissingObjective(network.id().to_string()))?;
            let organism = OrganismId::new(network.id());
            let owned: Vec<ReactionId> = network
                .reactions()
                .filter(|r| !r.is_exchange())
                .map(|r| r.id().to_string())
                .collect();
            for rid in &owned {
                network.assign_reaction(rid, organism.clone())?;
            }
            network.set_biomass_reaction(organism, &objective)?;
        }

        let expected = network.biomass_reaction_ids().len();
        if biomasses.len() != expected {
            return Err(SimulationError::BiomassCountMismatch {
                expected,
                found: biomasses.len(),
            });
        }
        check_biomasses(&biomasses)?;

        let community = if community_biomass {
            Some(attach_community_biomass(&mut network)?)
        } else {
            if network.objective().is_none() {
                let only = match network.biomass_reaction_ids().len() {
                    1 => network.biomass_reaction_ids().get_index(0).map(|(_, rid)| rid.clone()),
                    _ => None,
                };
                let rid = only
                    .ok_or_else(|| SimulationError::MissingObjective(network.id().to_string()))?;
                network.set_objective(&rid)?;
            }
            None
        };

        let mut ledger = StateLedger::new();
        seed_pool(&mut ledger, &network, &concentrations)?;
        check_given_concentrations(&ledger, &concentrations)?;

        let organisms: Vec<OrganismId> = network.organisms().cloned().collect();
        for (organism, biomass) in organisms.into_iter().zip(&biomasses) {
            ledger.track_organism(organism, *biomass);
        }

        let mut transporters = TransporterMap::classify(&network);
        let mut coupling = ExchangeCoupling::new();
        if let Some(community) = &community {
            ledger.track_species(community.species.clone(), biomasses.iter().sum());
            register_biomass_exporters(&network, community, &mut transporters);
            coupling = coupling.exclude(community.exchange.clone());
        }

        let policy = BoundUpdatePolicy::new(&network, kinetics);
        policy.validate_kinetics(&ledger)?;

        debug!(
            "Built joint simulation '{}' with {} organisms and {} tracked metabolites",
            network.id(),
            network.biomass_reaction_ids().len(),
            ledger.metabolites().len()
        );

        Ok(DynamicJointFba {
            network,
            transporters,
            policy,
            coupling,
            community,
            ledger,
            state: StepState::Idle,
        })
    }
}

/// Dynamic FBA of a community merged into one network
pub struct DynamicJointFba {
    network: MetabolicNetwork,
    transporters: TransporterMap,
    policy: BoundUpdatePolicy,
    coupling: ExchangeCoupling,
    community: Option<CommunityBiomass>,
    ledger: StateLedger,
    state: StepState,
}

impl DynamicJointFba {
    /// Start building a joint simulation
    ///
    /// # Arguments
    /// * `network` - The combined community network, or one organism's network
    ///
    /// # Returns
    /// A builder with community biomass enabled and no kinetics
    pub fn builder(network: MetabolicNetwork) -> DynamicJointFbaBuilder {
        DynamicJointFbaBuilder {
            network,
            biomasses: Vec::new(),
            concentrations: BTreeMap::new(),
            kinetics: KineticsTable::new(),
            community_biomass: true,
        }
    }

    /// Community run with default concentrations and no kinetics
    pub fn new(
        network: MetabolicNetwork,
        biomasses: impl IntoIterator<Item = f64>,
    ) -> Result<Self, SimulationError> {
        Self::builder(network).biomasses(biomasses).build()
    }

    /// Single-organism run maximizing the organism's own biomass reaction
    ///
    /// # Arguments
    /// * `network` - An organism network with its objective set
    /// * `biomass` - Initial biomass
    ///
    /// # Returns
    /// A simulation whose only organism is named after the network
    pub fn single(network: MetabolicNetwork, biomass: f64) -> Result<Self, SimulationError> {
        Self::builder(network)
            .biomasses([biomass])
            .community_biomass(false)
            .build()
    }

    pub fn network(&self) -> &MetabolicNetwork {
        &self.network
    }

    /// Mutable access for deviations that edit the network between ticks
    ///
    /// Bounds of organism-owned reactions are rederived every tick; change
    /// them through [`policy_mut`](Self::policy_mut) instead.
    pub fn network_mut(&mut self) -> &mut MetabolicNetwork {
        &mut self.network
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }

    /// Mutable access for deviations that pulse metabolites
    pub fn ledger_mut(&mut self) -> &mut StateLedger {
        &mut self.ledger
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

    pub fn community(&self) -> Option<&CommunityBiomass> {
        self.community.as_ref()
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
    /// # Arguments
    /// * `oracle` - Solves the network once per tick
    /// * `config` - Step size, tick cap and numerical thresholds
    /// * `hooks` - Optional bound override and deviation
    ///
    /// # Returns
    /// How the run stopped. Configuration problems are returned as errors;
    /// every other way a run can stop is reported in
    /// [`SimulationOutcome::reason`].
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
        let dt_save = config.dt;
        let start_ticks = self.ledger.ticks();
        let mut corrected_ticks = 0;
        let mut run_condition: i64 = 0;
        self.state = StepState::Running;
        debug!(
            "Running '{}' with dt={} max_ticks={} bound_override={} deviation={}",
            self.network.id(),
            dt_save,
            config.max_ticks,
            hooks.has_bound_override(),
            hooks.has_deviation()
        );

        let reason = loop {
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
            self.derive_bounds(&mut hooks.bound_override)?;
            self.coupling.apply(&mut self.network, &self.ledger, dt)?;

            let solution = match oracle.solve(&self.network) {
                Ok(solution) => solution,
                Err(e) => {
                    break TerminationReason::OracleFailure {
                        network: self.network.id().to_string(),
                        message: e.to_string(),
                    }
                }
            };
            if solution.objective.is_nan() {
                break TerminationReason::ObjectiveNotANumber;
            }
            if solution.objective <= config.epsilon {
                break TerminationReason::ObjectiveBelowEpsilon {
                    objective: solution.objective,
                };
            }
            debug!(
                "t={} dt={} objective={}",
                self.ledger.elapsed(),
                dt,
                solution.objective
            );

            let proposal = Proposal {
                key: self.network.id().to_string(),
                network: &self.network,
                transporters: &self.transporters,
                solution,
            };
            let resolution = resolve_tick(
                &self.ledger,
                std::slice::from_ref(&proposal),
                dt,
                config,
                &mut self.state,
            );
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
        info!(
            "Joint simulation '{}' stopped at t={} after {} ticks: {}",
            self.network.id(),
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
    ) -> Result<(), SimulationError> {
        if let Some(f) = bound_override.as_mut() {
            return f(&mut self.network, &self.ledger);
        }

        let biomass: HashMap<ReactionId, f64> = self
            .network
            .reactions()
            .filter_map(|r| {
                let owner = self.network.identify_organism(r.id())?;
                Some((r.id().to_string(), self.ledger.latest_biomass(owner)?))
            })
            .collect();
        self.policy
            .apply(&mut self.network, &self.ledger, |rid| biomass.get(rid).copied())
    }

    /// Flux of `rid` at every committed tick
    pub fn flux_values(&self, rid: &str) -> Result<Vec<f64>, SimulationError> {
        if !self.network.has_reaction(rid) {
            return Err(SimulationError::UnknownReaction(rid.to_string()));
        }
        Ok(analysis::flux_series(&self.ledger, rid))
    }

    /// Flux of `rid` per unit biomass of its owning organism
    pub fn specific_flux_values(&self, rid: &str) -> Result<Vec<f64>, SimulationError> {
        let reaction = self
            .network
            .reaction(rid)
            .ok_or_else(|| SimulationError::UnknownReaction(rid.to_string()))?;
        if reaction.is_exchange() {
            return Err(SimulationError::NotSpecificFlux(rid.to_string()));
        }
        let owner = self.network.identify_organism(rid).ok_or_else(|| {
            SimulationError::invalid(format!("reaction '{}' has no owning organism", rid))
        })?;
        let fluxes = analysis::flux_series(&self.ledger, rid);
        analysis::per_biomass(&self.ledger, &fluxes, owner)
    }

    /// Summed biomass flux over total biomass at every committed tick
    pub fn community_growth_rate(&self) -> Vec<f64> {
        let biomass_ids: Vec<&ReactionId> = self.network.biomass_reaction_ids().values().collect();
        analysis::community_growth_rate(&self.ledger, |record| {
            biomass_ids
                .iter()
                .map(|rid| record.flux(rid).unwrap_or(0.0))
                .sum()
        })
    }

    pub fn relative_abundance(&self) -> BTreeMap<OrganismId, Vec<f64>> {
        analysis::relative_abundance(&self.ledger)
    }
}
