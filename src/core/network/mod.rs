pub mod community;
pub mod model;
pub mod reaction;
pub mod species;
pub mod transporters;

// Re-export commonly used types
pub use community::{attach_community_biomass, CommunityBiomass};
pub use model::{MetabolicNetwork, EXTRACELLULAR};
pub use reaction::{Reaction, Reagent};
pub use species::Species;
pub use transporters::TransporterMap;
