pub mod analysis;
pub mod bounds;
pub mod errors;
pub mod execution;
pub mod kinetics;
pub mod network;
pub mod oracle;
pub mod state;
pub mod types;
