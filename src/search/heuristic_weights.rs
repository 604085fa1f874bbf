//! Named heuristic weight sets.
//!
//! A weight set maps evaluation feature names to numeric weights. Scoring a
//! position is the weighted sum of the feature values its model reports;
//! features without a weight contribute nothing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};
use crate::position::position_model::FeatureVector;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeuristicWeights {
    weights: BTreeMap<String, f64>,
}

impl HeuristicWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a, I>(pairs: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut weights = Self::new();
        for (name, weight) in pairs {
            weights.set(name, weight)?;
        }
        Ok(weights)
    }

    /// Builder-style `set` for literal weight tables.
    pub fn with(mut self, name: &str, weight: f64) -> ConfigResult<Self> {
        self.set(name, weight)?;
        Ok(self)
    }

    pub fn set(&mut self, name: &str, weight: f64) -> ConfigResult<()> {
        let name = name.trim();
        if name.is_empty() || !weight.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: format!("weight '{name}'"),
                value: weight.to_string(),
            });
        }
        self.weights.insert(name.to_owned(), weight);
        Ok(())
    }

    #[inline]
    pub fn get(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    /// Weighted sum of `features`.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        features
            .iter()
            .map(|(name, value)| self.get(name) * value)
            .sum()
    }
}

impl fmt::Display for HeuristicWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, weight)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{name}={weight}")?;
        }
        Ok(())
    }
}

/// Parses `name=value;name=value`. Commas are accepted as separators too.
impl FromStr for HeuristicWeights {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut weights = Self::new();
        for item in s.split([';', ',']).map(str::trim).filter(|item| !item.is_empty()) {
            let invalid = || ConfigError::InvalidValue {
                name: "weights".to_owned(),
                value: item.to_owned(),
            };
            let (name, raw) = item.split_once('=').ok_or_else(invalid)?;
            let weight = raw.trim().parse::<f64>().map_err(|_| invalid())?;
            weights.set(name, weight)?;
        }
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::HeuristicWeights;
    use crate::errors::ConfigError;

    #[test]
    fn score_is_weighted_sum_of_known_features() {
        let weights = HeuristicWeights::from_pairs([("mobility", 2.0), ("threats", -0.5)])
            .expect("weights are finite");
        let features = vec![("mobility", 3.0), ("threats", 4.0), ("unweighted", 100.0)];
        assert!((weights.score(&features) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn text_form_round_trips() {
        let weights: HeuristicWeights = "b=1.5; a=-2 ,c=0".parse().expect("text should parse");
        assert_eq!(weights.get("a"), -2.0);
        assert_eq!(weights.get("missing"), 0.0);
        assert_eq!(weights.to_string(), "a=-2;b=1.5;c=0");
        assert_eq!(weights.to_string().parse::<HeuristicWeights>(), Ok(weights));
    }

    #[test]
    fn non_finite_or_malformed_weights_are_rejected() {
        assert!(matches!(
            HeuristicWeights::new().with("x", f64::NAN),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!("x=inf".parse::<HeuristicWeights>().is_err());
        assert!("x".parse::<HeuristicWeights>().is_err());
        assert!("=3".parse::<HeuristicWeights>().is_err());
    }

    #[test]
    fn serde_form_is_a_plain_map() {
        let weights = HeuristicWeights::from_pairs([("queen_surrounded", -12.0)]).expect("finite");
        let json = serde_json::to_string(&weights).expect("serialize");
        assert_eq!(json, r#"{"queen_surrounded":-12.0}"#);
        let back: HeuristicWeights = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, weights);
    }
}
