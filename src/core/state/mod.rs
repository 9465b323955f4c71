pub mod delta;
pub mod ledger;

// Re-export commonly used types
pub use delta::{ExchangeFlux, GrowthFlux, TickDelta};
pub use ledger::{FluxRecord, StateLedger};
