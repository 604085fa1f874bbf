//! Validated configuration bundle for the search engine.
//!
//! Every setter validates its input before storing it, so an invalid value
//! is rejected at assignment and never reaches a search. Numeric option text
//! is parsed as a signed integer so negative input reports a range error
//! rather than a parse error.

use crate::cache::transposition_table::TranspositionTable;
use crate::errors::{ConfigError, ConfigResult};
use crate::search::enumeration_order::EnumerationOrder;
use crate::search::heuristic_weights::HeuristicWeights;

pub const DEFAULT_CACHE_BUDGET_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SearchConfig<M> {
    start_weights: Option<HeuristicWeights>,
    end_weights: Option<HeuristicWeights>,
    max_branching_factor: Option<usize>,
    cache_budget_bytes: Option<u64>,
    max_depth: Option<u32>,
    root_order: EnumerationOrder,
    seed_table: Option<TranspositionTable<M>>,
}

impl<M> Default for SearchConfig<M> {
    fn default() -> Self {
        Self {
            start_weights: None,
            end_weights: None,
            max_branching_factor: None,
            cache_budget_bytes: None,
            max_depth: None,
            root_order: EnumerationOrder::Default,
            seed_table: None,
        }
    }
}

impl<M: Clone> SearchConfig<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_weights(&self) -> Option<&HeuristicWeights> {
        self.start_weights.as_ref()
    }

    pub fn end_weights(&self) -> Option<&HeuristicWeights> {
        self.end_weights.as_ref()
    }

    pub fn max_branching_factor(&self) -> Option<usize> {
        self.max_branching_factor
    }

    pub fn cache_budget_bytes(&self) -> Option<u64> {
        self.cache_budget_bytes
    }

    /// Budget used when none is configured.
    pub fn effective_cache_budget_bytes(&self) -> u64 {
        self.cache_budget_bytes.unwrap_or(DEFAULT_CACHE_BUDGET_BYTES)
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    pub fn root_order(&self) -> EnumerationOrder {
        self.root_order
    }

    pub fn seed_table(&self) -> Option<&TranspositionTable<M>> {
        self.seed_table.as_ref()
    }

    pub fn take_seed_table(&mut self) -> Option<TranspositionTable<M>> {
        self.seed_table.take()
    }

    pub fn set_start_weights(&mut self, weights: Option<HeuristicWeights>) {
        self.start_weights = weights;
    }

    pub fn set_end_weights(&mut self, weights: Option<HeuristicWeights>) {
        self.end_weights = weights;
    }

    pub fn set_max_branching_factor(&mut self, value: Option<usize>) -> ConfigResult<()> {
        if value == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "max_branching_factor",
                value: 0,
            });
        }
        self.max_branching_factor = value;
        Ok(())
    }

    pub fn set_cache_budget_bytes(&mut self, value: Option<u64>) -> ConfigResult<()> {
        if value == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "cache_budget_bytes",
                value: 0,
            });
        }
        self.cache_budget_bytes = value;
        Ok(())
    }

    pub fn set_max_depth(&mut self, value: Option<u32>) -> ConfigResult<()> {
        if value == Some(0) {
            return Err(ConfigError::OutOfRange {
                field: "max_depth",
                value: 0,
            });
        }
        self.max_depth = value;
        Ok(())
    }

    pub fn set_root_order(&mut self, order: EnumerationOrder) {
        self.root_order = order;
    }

    pub fn set_seed_table(&mut self, table: Option<TranspositionTable<M>>) {
        self.seed_table = table;
    }

    pub fn with_start_weights(mut self, weights: HeuristicWeights) -> Self {
        self.start_weights = Some(weights);
        self
    }

    pub fn with_end_weights(mut self, weights: HeuristicWeights) -> Self {
        self.end_weights = Some(weights);
        self
    }

    pub fn with_max_branching_factor(mut self, value: usize) -> ConfigResult<Self> {
        self.set_max_branching_factor(Some(value))?;
        Ok(self)
    }

    pub fn with_cache_budget_bytes(mut self, value: u64) -> ConfigResult<Self> {
        self.set_cache_budget_bytes(Some(value))?;
        Ok(self)
    }

    pub fn with_max_depth(mut self, value: u32) -> ConfigResult<Self> {
        self.set_max_depth(Some(value))?;
        Ok(self)
    }

    pub fn with_root_order(mut self, order: EnumerationOrder) -> Self {
        self.root_order = order;
        self
    }

    pub fn with_seed_table(mut self, table: TranspositionTable<M>) -> Self {
        self.seed_table = Some(table);
        self
    }

    /// Apply a named text option. Names are case-insensitive; `none` or an
    /// empty value resets an optional field.
    pub fn set_option(&mut self, name: &str, value: &str) -> ConfigResult<()> {
        let key = name.trim().to_ascii_lowercase();
        match key.as_str() {
            "maxbranchingfactor" => {
                let parsed = parse_positive(name, value, "max_branching_factor")?;
                self.set_max_branching_factor(parsed.map(|v| v as usize))
            }
            "transpositiontablesizemb" | "hash" => {
                let parsed = parse_positive(name, value, "cache_budget_bytes")?;
                self.set_cache_budget_bytes(parsed.map(|mb| mb.saturating_mul(1024 * 1024)))
            }
            "transpositiontablesizebytes" => {
                let parsed = parse_positive(name, value, "cache_budget_bytes")?;
                self.set_cache_budget_bytes(parsed)
            }
            "maxdepth" => {
                let parsed = parse_positive(name, value, "max_depth")?;
                let depth = parsed
                    .map(|d| u32::try_from(d).map_err(|_| invalid(name, value)))
                    .transpose()?;
                self.set_max_depth(depth)
            }
            "rootorder" => {
                let order = value.parse::<EnumerationOrder>().map_err(|_| invalid(name, value))?;
                self.set_root_order(order);
                Ok(())
            }
            "startmetricweights" => {
                self.set_start_weights(parse_weights(value)?);
                Ok(())
            }
            "endmetricweights" => {
                self.set_end_weights(parse_weights(value)?);
                Ok(())
            }
            _ => Err(ConfigError::UnknownOption(name.to_owned())),
        }
    }
}

fn is_unset(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("none")
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_positive(name: &str, value: &str, field: &'static str) -> ConfigResult<Option<u64>> {
    if is_unset(value) {
        return Ok(None);
    }
    let parsed = value
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid(name, value))?;
    if parsed <= 0 {
        return Err(ConfigError::OutOfRange {
            field,
            value: parsed,
        });
    }
    Ok(Some(parsed as u64))
}

fn parse_weights(value: &str) -> ConfigResult<Option<HeuristicWeights>> {
    if is_unset(value) {
        return Ok(None);
    }
    value.parse::<HeuristicWeights>().map(Some)
}
