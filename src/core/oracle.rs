//! The flux-optimization seam.
//!
//! Simulations never solve linear programs themselves. They hand a network
//! with fully populated bounds to a [`FluxOracle`] and consume the flux
//! vector it returns.

use crate::core::errors::OracleError;
use crate::core::network::MetabolicNetwork;
use crate::core::types::{FluxMap, ReactionId};

/// One optimal solution: objective value plus realized fluxes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxSolution {
    pub objective: f64,
    pub fluxes: FluxMap,
}

impl FluxSolution {
    pub fn new(objective: f64, fluxes: FluxMap) -> Self {
        Self { objective, fluxes }
    }

    /// Build a solution from (reaction, flux) pairs
    pub fn from_pairs<I, K>(objective: f64, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<ReactionId>,
    {
        Self {
            objective,
            fluxes: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Flux of `rid`; reactions missing from the solution carry no flux
    pub fn flux(&self, rid: &str) -> f64 {
        self.fluxes.get(rid).copied().unwrap_or(0.0)
    }
}

/// External flux-optimization solver
///
/// Must be `Sync`: parallel runs may solve several organisms at once against
/// the same oracle.
pub trait FluxOracle: Send + Sync {
    fn solve(&self, network: &MetabolicNetwork) -> Result<FluxSolution, OracleError>;
}

impl<F> FluxOracle for F
where
    F: Fn(&MetabolicNetwork) -> Result<FluxSolution, OracleError> + Send + Sync,
{
    fn solve(&self, network: &MetabolicNetwork) -> Result<FluxSolution, OracleError> {
        self(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_an_oracle() {
        let oracle = |net: &MetabolicNetwork| -> Result<FluxSolution, OracleError> {
            Ok(FluxSolution::from_pairs(1.0, [(net.id().to_string(), 2.0)]))
        };
        let net = MetabolicNetwork::new("R1");
        let solution = oracle.solve(&net).unwrap();
        assert_eq!(solution.objective, 1.0);
        assert_eq!(solution.flux("R1"), 2.0);
        assert_eq!(solution.flux("missing"), 0.0);
    }

    #[test]
    fn test_oracle_error_passthrough() {
        let oracle = |_: &MetabolicNetwork| -> Result<FluxSolution, OracleError> {
            Err(OracleError::Infeasible("no feasible point".to_string()))
        };
        let net = MetabolicNetwork::new("n");
        assert_eq!(
            oracle.solve(&net),
            Err(OracleError::Infeasible("no feasible point".to_string()))
        );
    }
}
