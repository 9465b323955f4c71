pub mod config;
pub mod controller;
pub mod hooks;
pub mod joint;
pub mod parallel;

// Re-export commonly used types
pub use config::{ConcurrencyMode, SimulationConfig};
pub use controller::{corrected_step_size, SimulationOutcome, StepState, TerminationReason};
pub use hooks::{BoundOverride, Deviation, SimulationHooks};
pub use joint::{DynamicJointFba, DynamicJointFbaBuilder};
pub use parallel::{DynamicParallelFba, DynamicParallelFbaBuilder, OrganismModel};
