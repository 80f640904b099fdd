//! Merged result table and record serialization.
//!
//! The table is a date-indexed outer join across observation kinds:
//! columns are named `Rt_MAP__<kind>`, `Rt_ci<pct>__<kind>`, `<kind>`
//! (smoothed input), `lag_days__<kind>`, plus the composite columns. Rows
//! serialize to flat JSON records for the persistence collaborator.

use crate::series::TimeseriesKind;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Column name for a kind's MAP estimate.
pub fn map_column(kind: TimeseriesKind) -> String {
    format!("Rt_MAP__{}", kind.label())
}

/// Column name for one credible bound. `pct` is the cumulative-mass target
/// as a percentage, e.g. 5 and 95 for the 95% level.
pub fn ci_column(kind: TimeseriesKind, pct: i64) -> String {
    format!("Rt_ci{}__{}", pct, kind.label())
}

/// Column name for a kind's smoothed input values.
pub fn smoothed_column(kind: TimeseriesKind) -> String {
    kind.label().to_string()
}

/// Column name for a kind's detected lag.
pub fn lag_column(kind: TimeseriesKind) -> String {
    format!("lag_days__{}", kind.label())
}

/// Composite MAP column.
pub const COMPOSITE_MAP_COLUMN: &str = "Rt_MAP_composite";

/// Composite band column for one cumulative-mass target percentage.
pub fn composite_ci_column(pct: i64) -> String {
    format!("Rt_ci{}_composite", pct)
}

/// Percentage labels (low, high) for a confidence level in (0, 1).
pub fn level_percents(level: f64) -> (i64, i64) {
    let low = (100.0 * (1.0 - level)).round() as i64;
    let high = (100.0 * level).round() as i64;
    (low, high)
}

/// Date-indexed outer-join table of inference results for one geography.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    pub fips: String,
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl ResultTable {
    pub fn new(fips: impl Into<String>) -> Self {
        ResultTable {
            fips: fips.into(),
            dates: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// Insert or replace a column given (date, value) pairs, expanding the
    /// date index (outer join) as needed.
    pub fn set_column(&mut self, name: impl Into<String>, points: &[(NaiveDate, f64)]) {
        self.ensure_dates(points.iter().map(|(date, _)| *date));
        let mut values = vec![None; self.dates.len()];
        for (date, value) in points {
            // ensure_dates guarantees presence
            if let Ok(idx) = self.dates.binary_search(date) {
                values[idx] = Some(*value);
            }
        }
        self.columns.insert(name.into(), values);
    }

    /// Insert or replace a column that holds the same value on every row.
    pub fn set_constant_column(&mut self, name: impl Into<String>, value: f64) {
        let values = vec![Some(value); self.dates.len()];
        self.columns.insert(name.into(), values);
    }

    /// Insert or replace a column of per-row values aligned to the current
    /// date index.
    pub fn set_raw_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.dates.len());
        self.columns.insert(name.into(), values);
    }

    /// Grow the date index to cover `new_dates`, remapping existing columns.
    fn ensure_dates(&mut self, new_dates: impl IntoIterator<Item = NaiveDate>) {
        let mut union: std::collections::BTreeSet<NaiveDate> =
            self.dates.iter().cloned().collect();
        union.extend(new_dates);
        if union.len() == self.dates.len() {
            return;
        }
        let union: Vec<NaiveDate> = union.into_iter().collect();

        for values in self.columns.values_mut() {
            let by_date: BTreeMap<NaiveDate, Option<f64>> = self
                .dates
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect();
            *values = union
                .iter()
                .map(|date| by_date.get(date).cloned().flatten())
                .collect();
        }
        self.dates = union;
    }

    /// Flat JSON records, one per date row. `ref_date` anchors the integer
    /// day index.
    pub fn to_records(&self, ref_date: NaiveDate) -> Vec<Value> {
        self.dates
            .iter()
            .enumerate()
            .map(|(row, date)| {
                let mut record = Map::new();
                record.insert("fips".to_string(), json!(self.fips));
                record.insert("date".to_string(), json!(date.to_string()));
                record.insert(
                    "day".to_string(),
                    json!((*date - ref_date).num_days()),
                );
                for (name, values) in &self.columns {
                    record.insert(name.clone(), json!(values[row]));
                }
                Value::Object(record)
            })
            .collect()
    }
}

/// Linear interpolation of interior gaps plus forward fill at the tail.
///
/// Leading missing values stay missing; the head is never extrapolated.
pub fn interpolate_forward(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let Some(first_idx) = out.iter().position(|v| v.is_some()) else {
        return out;
    };

    let mut prev_idx = first_idx;
    let mut idx = first_idx + 1;
    while idx < out.len() {
        if let Some(next) = out[idx] {
            let gap = idx - prev_idx;
            if gap > 1 {
                let prev = out[prev_idx].unwrap_or(next);
                let step = (next - prev) / gap as f64;
                for k in 1..gap {
                    out[prev_idx + k] = Some(prev + step * k as f64);
                }
            }
            prev_idx = idx;
        }
        idx += 1;
    }

    // Tail: carry the last observed value forward.
    if let Some(last_value) = out[prev_idx] {
        for slot in out.iter_mut().skip(prev_idx + 1) {
            *slot = Some(last_value);
        }
    }
    out
}
