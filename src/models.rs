use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aligned table of closing prices, one column per asset, indexed by a
/// strictly increasing shared time index. Missing observations are stored as
/// NaN; pairwise computations drop them via [`PriceTable::align_pair`].
#[derive(Debug, Clone)]
pub struct PriceTable {
    index: Vec<DateTime<Utc>>,
    assets: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

/// Two price series restricted to the periods where both assets have a
/// valid positive price.
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub index: Vec<DateTime<Utc>>,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl PriceTable {
    /// Build a table from a shared index and per-asset columns. Column order
    /// is preserved; it fixes the pair scan order downstream.
    pub fn new(
        index: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, EngineError> {
        for w in index.windows(2) {
            if w[1] <= w[0] {
                return Err(EngineError::MalformedTable(format!(
                    "time index not strictly increasing at {}",
                    w[1]
                )));
            }
        }

        let mut assets = Vec::with_capacity(columns.len());
        let mut map = HashMap::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != index.len() {
                return Err(EngineError::MalformedTable(format!(
                    "column {} has {} rows, index has {}",
                    name,
                    values.len(),
                    index.len()
                )));
            }
            if map.contains_key(&name) {
                return Err(EngineError::MalformedTable(format!(
                    "duplicate asset column {}",
                    name
                )));
            }
            assets.push(name.clone());
            map.insert(name, values);
        }

        Ok(Self {
            index,
            assets,
            columns: map,
        })
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn column(&self, asset: &str) -> Option<&[f64]> {
        self.columns.get(asset).map(|v| v.as_slice())
    }

    /// Restrict two assets to the intersection of their valid periods.
    /// A period survives only if both prices are finite and positive.
    /// Returns None if either asset is unknown or no periods remain.
    pub fn align_pair(&self, a: &str, b: &str) -> Option<AlignedPair> {
        let col_a = self.columns.get(a)?;
        let col_b = self.columns.get(b)?;

        let mut index = Vec::new();
        let mut first = Vec::new();
        let mut second = Vec::new();
        for (i, (&pa, &pb)) in col_a.iter().zip(col_b.iter()).enumerate() {
            if pa.is_finite() && pa > 0.0 && pb.is_finite() && pb > 0.0 {
                index.push(self.index[i]);
                first.push(pa);
                second.push(pb);
            }
        }

        if index.is_empty() {
            return None;
        }
        Some(AlignedPair {
            index,
            first,
            second,
        })
    }
}

/// A cointegrated pair hypothesis: log(first) − hedge_ratio·log(second) is
/// expected to mean-revert. Asset order matters; the hedge ratio was fitted
/// with `first` as the dependent variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub first: String,
    pub second: String,
    pub hedge_ratio: f64,
}

impl Pair {
    pub fn name(&self) -> String {
        format!("{}_{}", self.first, self.second)
    }
}

/// One point of the strategy parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Rolling lookback length in periods.
    pub window: usize,
    /// Z-score magnitude that opens a position.
    pub entry_z: f64,
    /// Z-score level that closes a position at target.
    pub exit_z: f64,
    /// Z-score magnitude that closes a position at a loss.
    pub stop_z: f64,
}

impl ParameterSet {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window == 0 {
            return Err(EngineError::InvalidParameter(
                "window must be positive".to_string(),
            ));
        }
        if !self.entry_z.is_finite() || self.entry_z <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "entry_z must be a positive number (value: {})",
                self.entry_z
            )));
        }
        if !self.exit_z.is_finite() {
            return Err(EngineError::InvalidParameter(
                "exit_z must be a finite number".to_string(),
            ));
        }
        if !self.stop_z.is_finite() || self.stop_z <= 0.0 {
            return Err(EngineError::InvalidParameter(format!(
                "stop_z must be a positive number (value: {})",
                self.stop_z
            )));
        }
        Ok(())
    }
}

/// Realized per-period strategy returns for one pair, same length and time
/// index as the pair's price alignment.
#[derive(Debug, Clone)]
pub struct ReturnSeries {
    pub name: String,
    pub index: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

/// Best grid point found for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub pair: String,
    #[serde(flatten)]
    pub params: ParameterSet,
    pub cum_return: f64,
    pub sharpe: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_non_increasing_index() {
        let index = vec![ts(2), ts(1)];
        let result = PriceTable::new(index, vec![("A".to_string(), vec![1.0, 2.0])]);
        assert!(matches!(result, Err(EngineError::MalformedTable(_))));
    }

    #[test]
    fn rejects_length_mismatch() {
        let index = vec![ts(1), ts(2)];
        let result = PriceTable::new(index, vec![("A".to_string(), vec![1.0])]);
        assert!(result.is_err());
    }

    #[test]
    fn align_pair_drops_missing_periods() {
        let index = vec![ts(1), ts(2), ts(3), ts(4)];
        let table = PriceTable::new(
            index,
            vec![
                ("A".to_string(), vec![10.0, f64::NAN, 12.0, 13.0]),
                ("B".to_string(), vec![20.0, 21.0, 22.0, f64::NAN]),
            ],
        )
        .unwrap();

        let aligned = table.align_pair("A", "B").unwrap();
        assert_eq!(aligned.first, vec![10.0, 12.0]);
        assert_eq!(aligned.second, vec![20.0, 22.0]);
        assert_eq!(aligned.index, vec![ts(1), ts(3)]);
    }

    #[test]
    fn align_pair_empty_intersection_is_none() {
        let index = vec![ts(1), ts(2)];
        let table = PriceTable::new(
            index,
            vec![
                ("A".to_string(), vec![10.0, f64::NAN]),
                ("B".to_string(), vec![f64::NAN, 21.0]),
            ],
        )
        .unwrap();
        assert!(table.align_pair("A", "B").is_none());
    }

    #[test]
    fn parameter_validation() {
        let good = ParameterSet {
            window: 20,
            entry_z: 2.0,
            exit_z: 0.0,
            stop_z: 3.0,
        };
        assert!(good.validate().is_ok());

        let zero_window = ParameterSet { window: 0, ..good };
        assert!(zero_window.validate().is_err());

        let negative_entry = ParameterSet {
            entry_z: -1.0,
            ..good
        };
        assert!(negative_entry.validate().is_err());
    }
}
