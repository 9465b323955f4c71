use crate::core::types::{ReactionId, SpeciesId};
use serde::{Deserialize, Serialize};

/// A (species, stoichiometric coefficient) pair of a reaction
///
/// Negative coefficients are consumed, positive coefficients are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reagent {
    pub species: SpeciesId,
    pub coefficient: f64,
}

impl Reagent {
    pub fn new(species: impl Into<SpeciesId>, coefficient: f64) -> Self {
        Self {
            species: species.into(),
            coefficient,
        }
    }
}

/// A reaction with flux bounds and stoichiometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    id: ReactionId,
    lower_bound: f64,
    upper_bound: f64,
    reversible: bool,
    reagents: Vec<Reagent>,
    is_exchange: bool,
}

impl Reaction {
    /// Create an irreversible reaction with bounds `[0, upper_bound]`
    pub fn new(id: impl Into<ReactionId>, upper_bound: f64) -> Self {
        Self {
            id: id.into(),
            lower_bound: 0.0,
            upper_bound,
            reversible: false,
            reagents: Vec::new(),
            is_exchange: false,
        }
    }

    /// Create an exchange reaction moving `species` across the system boundary
    ///
    /// The species enters with coefficient -1, so a negative flux is uptake
    /// from the pool and a positive flux is secretion into it.
    pub fn exchange(
        id: impl Into<ReactionId>,
        species: impl Into<SpeciesId>,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Self {
        Self {
            id: id.into(),
            lower_bound,
            upper_bound,
            reversible: lower_bound < 0.0,
            reagents: vec![Reagent::new(species, -1.0)],
            is_exchange: true,
        }
    }

    /// Set both flux bounds (builder style)
    pub fn with_bounds(mut self, lower_bound: f64, upper_bound: f64) -> Self {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        self.reversible = lower_bound < 0.0;
        self
    }

    /// Add a reagent (builder style)
    pub fn with_reagent(mut self, species: impl Into<SpeciesId>, coefficient: f64) -> Self {
        self.reagents.push(Reagent::new(species, coefficient));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn set_lower_bound(&mut self, value: f64) {
        self.lower_bound = value;
    }

    pub fn set_upper_bound(&mut self, value: f64) {
        self.upper_bound = value;
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lower_bound, self.upper_bound)
    }

    pub fn is_reversible(&self) -> bool {
        self.reversible
    }

    pub fn is_exchange(&self) -> bool {
        self.is_exchange
    }

    pub fn reagents(&self) -> &[Reagent] {
        &self.reagents
    }

    /// Add a reagent to an existing reaction
    pub fn create_reagent(&mut self, species: impl Into<SpeciesId>, coefficient: f64) {
        self.reagents.push(Reagent::new(species, coefficient));
    }

    /// Species touched by this reaction, in reagent order
    pub fn species_ids(&self) -> impl Iterator<Item = &str> {
        self.reagents.iter().map(|r| r.species.as_str())
    }

    /// The single species of an exchange reaction
    pub fn exchanged_species(&self) -> Option<&str> {
        if self.is_exchange {
            self.reagents.first().map(|r| r.species.as_str())
        } else {
            None
        }
    }

    /// Stoichiometric coefficient of `species`, if it takes part in the reaction
    pub fn coefficient_of(&self, species: &str) -> Option<f64> {
        self.reagents
            .iter()
            .find(|r| r.species == species)
            .map(|r| r.coefficient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_constructor() {
        let ex = Reaction::exchange("EX_glc", "glc_e", -10.0, 1000.0);
        assert!(ex.is_exchange());
        assert!(ex.is_reversible());
        assert_eq!(ex.exchanged_species(), Some("glc_e"));
        assert_eq!(ex.coefficient_of("glc_e"), Some(-1.0));
        assert_eq!(ex.bounds(), (-10.0, 1000.0));
    }

    #[test]
    fn test_builder_reagents_and_bounds() {
        let r = Reaction::new("GLCt", 10.0)
            .with_reagent("glc_e", -1.0)
            .with_reagent("glc_c", 1.0);
        assert!(!r.is_exchange());
        assert!(!r.is_reversible());
        assert_eq!(r.exchanged_species(), None);
        assert_eq!(r.species_ids().collect::<Vec<_>>(), vec!["glc_e", "glc_c"]);

        let r = r.with_bounds(-5.0, 5.0);
        assert!(r.is_reversible());
        assert_eq!(r.bounds(), (-5.0, 5.0));
    }
}
