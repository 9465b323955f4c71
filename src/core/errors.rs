//! Error types for dynamic FBA simulations.
//!
//! Only configuration problems surface as errors. Numerical infeasibility and
//! resource exhaustion end a run normally and are reported through
//! [`TerminationReason`](crate::core::execution::TerminationReason).

use crate::core::types::{OrganismId, ReactionId, SpeciesId};
use thiserror::Error;

/// Configuration errors raised while building or running a simulation
#[derive(Error, Debug)]
pub enum SimulationError {
    /// A kinetics entry names a limiting metabolite that is not tracked in the pool
    #[error("limiting substrate '{species}' of reaction '{reaction}' is not an external species")]
    NoLimitingSubstrateFound {
        reaction: ReactionId,
        species: SpeciesId,
    },

    #[error("species '{0}' not found")]
    UnknownSpecies(SpeciesId),

    #[error("reaction '{0}' not found")]
    UnknownReaction(ReactionId),

    #[error("organism '{0}' not found")]
    UnknownOrganism(OrganismId),

    #[error("reaction '{0}' already exists")]
    DuplicateReaction(ReactionId),

    #[error("species '{0}' already exists")]
    DuplicateSpecies(SpeciesId),

    /// Exchange reactions must touch exactly one species
    #[error("exchange reaction '{reaction}' touches {species_count} species, expected exactly one")]
    InvalidExchange {
        reaction: ReactionId,
        species_count: usize,
    },

    #[error("network '{0}' has no objective reaction")]
    MissingObjective(String),

    #[error("expected {expected} initial biomasses, got {found}")]
    BiomassCountMismatch { expected: usize, found: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Exchange reactions are not scaled by biomass and have no specific flux
    #[error("reaction '{0}' is an exchange reaction and has no specific flux")]
    NotSpecificFlux(ReactionId),

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimulationError {
    /// Creates an invalid parameter error.
    pub fn invalid(message: impl Into<String>) -> Self {
        SimulationError::InvalidParameter(message.into())
    }
}

/// Failure reported by a flux-optimization oracle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// The optimization problem has no feasible solution under the given bounds
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The solver failed for any other reason
    #[error("solver failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_offending_ids() {
        let err = SimulationError::NoLimitingSubstrateFound {
            reaction: "R_GLCpts".to_string(),
            species: "M_glc__D_e".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("R_GLCpts"));
        assert!(message.contains("M_glc__D_e"));

        let err = SimulationError::InvalidExchange {
            reaction: "EX_bad".to_string(),
            species_count: 2,
        };
        assert!(err.to_string().contains("2 species"));
    }

    #[test]
    fn test_invalid_helper() {
        let err = SimulationError::invalid("dt must be positive");
        assert!(matches!(err, SimulationError::InvalidParameter(ref m) if m == "dt must be positive"));
    }
}
