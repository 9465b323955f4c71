use serde::{Deserialize, Serialize};

/// Identifier of a reaction in a metabolic network
pub type ReactionId = String;

/// Identifier of a species (metabolite) in a metabolic network
pub type SpeciesId = String;

/// Reaction id -> realized flux, as returned by an optimization oracle
pub type FluxMap = std::collections::BTreeMap<ReactionId, f64>;

/// Identifier of an organism taking part in a simulation
///
/// In a combined network this is the model id the organism's reactions were
/// merged under; in a parallel run it is the id of the organism's own network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganismId(String);

impl OrganismId {
    /// Create a new organism ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganismId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrganismId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OrganismId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
