use crate::core::errors::SimulationError;
use crate::core::network::MetabolicNetwork;
use crate::core::state::StateLedger;

/// Replaces bound derivation for one network on every tick
///
/// Receives the network about to be solved and the committed state. Exchange
/// coupling still runs afterwards.
pub type BoundOverride<'a> =
    Box<dyn FnMut(&mut MetabolicNetwork, &StateLedger) -> Result<(), SimulationError> + 'a>;

/// Called once at the start of every tick with the simulation, the committed
/// time points and a run counter. The returned value is added to the counter.
pub type Deviation<'a, S> = Box<dyn FnMut(&mut S, &[f64], i64) -> i64 + 'a>;

/// Optional per-run callbacks
pub struct SimulationHooks<'a, S> {
    pub(crate) bound_override: Option<BoundOverride<'a>>,
    pub(crate) deviate: Option<Deviation<'a, S>>,
}

impl<'a, S> SimulationHooks<'a, S> {
    pub fn new() -> Self {
        Self {
            bound_override: None,
            deviate: None,
        }
    }

    /// Use `f` instead of biomass scaling to set the bounds of each network
    pub fn with_bound_override<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut MetabolicNetwork, &StateLedger) -> Result<(), SimulationError> + 'a,
    {
        self.bound_override = Some(Box::new(f));
        self
    }

    /// Run `f` before bounds are derived on each tick
    pub fn with_deviation<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut S, &[f64], i64) -> i64 + 'a,
    {
        self.deviate = Some(Box::new(f));
        self
    }

    pub fn has_bound_override(&self) -> bool {
        self.bound_override.is_some()
    }

    pub fn has_deviation(&self) -> bool {
        self.deviate.is_some()
    }
}

impl<'a, S> Default for SimulationHooks<'a, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_report_what_is_set() {
        let hooks: SimulationHooks<'_, ()> = SimulationHooks::default();
        assert!(!hooks.has_bound_override());
        assert!(!hooks.has_deviation());

        let hooks = SimulationHooks::new()
            .with_deviation(|_: &mut (), _: &[f64], _: i64| 0)
            .with_bound_override(|_: &mut MetabolicNetwork, _: &StateLedger| Ok(()));
        assert!(hooks.has_bound_override());
        assert!(hooks.has_deviation());
    }
}
