use crate::core::types::SpeciesId;
use serde::{Deserialize, Serialize};

/// A metabolite living in one compartment of a metabolic network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    id: SpeciesId,
    compartment: String,
}

impl Species {
    pub fn new(id: impl Into<SpeciesId>, compartment: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            compartment: compartment.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn compartment(&self) -> &str {
        &self.compartment
    }
}
