pub mod core;

// Re-export commonly used types
pub use crate::core::errors::{OracleError, SimulationError};
pub use crate::core::execution::{
    ConcurrencyMode, DynamicJointFba, DynamicParallelFba, SimulationConfig, SimulationHooks,
    SimulationOutcome, StepState, TerminationReason,
};
pub use crate::core::kinetics::{KineticsEntry, KineticsTable};
pub use crate::core::network::{MetabolicNetwork, Reaction, Species, TransporterMap};
pub use crate::core::oracle::{FluxOracle, FluxSolution};
pub use crate::core::state::StateLedger;
pub use crate::core::types::OrganismId;
