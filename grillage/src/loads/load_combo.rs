//! Load combinations

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Factored sum of load cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCombination {
    /// Name of the load combination
    pub name: String,
    /// Factors for each load case (case_name -> factor)
    pub factors: BTreeMap<String, f64>,
}

impl LoadCombination {
    /// Create a new load combination
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            factors: BTreeMap::new(),
        }
    }

    /// Create a load combination with a single load case at factor 1.0
    pub fn single(name: &str, case: &str) -> Self {
        Self::new(name).with_case(case, 1.0)
    }

    /// Add a load case with a factor
    pub fn with_case(mut self, case: &str, factor: f64) -> Self {
        self.factors.insert(case.to_string(), factor);
        self
    }

    /// Get the factor for a load case
    pub fn factor(&self, case: &str) -> f64 {
        self.factors.get(case).copied().unwrap_or(0.0)
    }

    /// Check if this combination includes a specific load case
    pub fn includes(&self, case: &str) -> bool {
        self.factor(case).abs() > 1e-10
    }

    /// Cases with a non-zero factor
    pub fn cases(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.factors
            .iter()
            .filter(|(_, f)| f.abs() > 1e-10)
            .map(|(case, &f)| (case.as_str(), f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factors() {
        let combo = LoadCombination::new("ULS")
            .with_case("dead", 1.2)
            .with_case("live", 1.5)
            .with_case("wind", 0.0);
        assert_eq!(combo.factor("dead"), 1.2);
        assert_eq!(combo.factor("snow"), 0.0);
        assert!(combo.includes("live"));
        assert!(!combo.includes("wind"));
        assert_eq!(combo.cases().count(), 2);
    }

    #[test]
    fn test_single() {
        let combo = LoadCombination::single("SLS", "dead");
        assert_eq!(combo.factor("dead"), 1.0);
    }
}
