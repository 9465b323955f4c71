pub mod exchange;
pub mod policy;

// Re-export commonly used types
pub use exchange::ExchangeCoupling;
pub use policy::{BoundUpdatePolicy, InitialBoundSnapshot};
