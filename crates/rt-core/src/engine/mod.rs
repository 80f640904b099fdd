//! Inference orchestrator.
//!
//! Drives the per-kind pipeline (outlier replacement → Gaussian smoothing →
//! posterior filter → credible intervals), merges the per-kind tables into
//! one date-indexed result, lag-aligns trailing indicators against the case
//! curve, and derives the composite R_t. One engine value serves one
//! geography run; batch execution isolates failures per geography.

use crate::config::{ConfigError, RtConfig};
use crate::inference::credible::{credible_bounds, CredibleError};
use crate::inference::grid::RGrid;
use crate::inference::posterior::{compute_posteriors, PosteriorError};
use crate::output::{
    ci_column, composite_ci_column, interpolate_forward, lag_column, level_percents, map_column,
    smoothed_column, ResultTable, COMPOSITE_MAP_COLUMN,
};
use crate::series::{GeographyInput, ObservationSeries, SeriesError, TimeseriesKind};
use crate::signal::align::{align_series, shift_values};
use crate::signal::outliers::replace_outliers;
use crate::signal::smoothing::smooth_series;
use chrono::NaiveDate;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use tracing::{error, info, warn};

/// Hospitalization feeds show systematic artifacts in their first points;
/// they are dropped before conditioning.
const HOSPITALIZATION_HEAD_DROP: usize = 2;

/// Minimum points a hospitalization series needs to be considered.
const MIN_HOSPITALIZATION_POINTS: usize = 4;

/// Errors from a single geography run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Posterior(#[from] PosteriorError),

    #[error(transparent)]
    Credible(#[from] CredibleError),
}

/// Per-kind inference output, before merging.
#[derive(Debug, Clone)]
pub struct KindResult {
    pub kind: TimeseriesKind,
    pub dates: Vec<NaiveDate>,
    pub map: Vec<f64>,
    pub bands: Vec<Band>,
    /// Smoothed input values over `dates`.
    pub smoothed: Vec<f64>,
    pub log_likelihood: f64,
}

/// Credible bounds for one confidence level.
#[derive(Debug, Clone)]
pub struct Band {
    pub level: f64,
    pub bounds: Vec<(f64, f64)>,
}

/// Outcome of one geography in a batch run.
#[derive(Debug)]
pub struct GeographyOutcome {
    pub fips: String,
    /// `None` when the run failed or produced no usable data.
    pub table: Option<ResultTable>,
}

/// R_t inference engine for one configuration.
pub struct RtEngine {
    config: RtConfig,
    grid: RGrid,
}

impl RtEngine {
    pub fn new(config: RtConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = RGrid::from_config(&config.r_grid)?;
        Ok(RtEngine { config, grid })
    }

    pub fn config(&self) -> &RtConfig {
        &self.config
    }

    pub fn grid(&self) -> &RGrid {
        &self.grid
    }

    /// Run the full pipeline for one geography.
    ///
    /// Returns `Ok(None)` when no observation kind yields usable data.
    pub fn run(&self, input: &GeographyInput) -> Result<Option<ResultTable>, EngineError> {
        input.validate()?;
        let serial_period = input.disease.serial_period();
        info!(fips = %input.fips, serial_period, "running R_t inference");

        let mut table: Option<ResultTable> = None;
        for kind in [
            TimeseriesKind::NewCases,
            TimeseriesKind::NewDeaths,
            TimeseriesKind::NewHospitalizations,
        ] {
            let Some(series) = self.eligible_series(kind, input) else {
                info!(fips = %input.fips, %kind, "observation kind skipped");
                continue;
            };

            let Some(result) = self.infer_kind(kind, &series, serial_period)? else {
                info!(fips = %input.fips, %kind, "no usable data after smoothing");
                continue;
            };

            let table = table.get_or_insert_with(|| ResultTable::new(input.fips.clone()));
            merge_kind(table, &result, &self.config.confidence_levels);

            if kind.lags_cases() && table.has_column(&map_column(TimeseriesKind::NewCases)) {
                self.align_kind(table, kind);
            }
        }

        let Some(mut table) = table else {
            warn!(fips = %input.fips, "inference not possible: no usable observation kinds");
            return Ok(None);
        };
        self.compose(&mut table);
        Ok(Some(table))
    }

    /// Run many geographies, isolating failures.
    ///
    /// An error or panic in one geography is logged and recorded as an
    /// absent result; the batch always continues.
    pub fn run_batch(&self, inputs: &[GeographyInput]) -> Vec<GeographyOutcome> {
        inputs
            .iter()
            .map(|input| {
                let fips = input.fips.clone();
                let table = match catch_unwind(AssertUnwindSafe(|| self.run(input))) {
                    Ok(Ok(table)) => table,
                    Ok(Err(err)) => {
                        error!(fips = %fips, error = %err, "geography run failed");
                        None
                    }
                    Err(_) => {
                        error!(fips = %fips, "geography run panicked");
                        None
                    }
                };
                GeographyOutcome { fips, table }
            })
            .collect()
    }

    /// The conditioned input series for a kind, or `None` when the kind
    /// fails its activity threshold.
    fn eligible_series(
        &self,
        kind: TimeseriesKind,
        input: &GeographyInput,
    ) -> Option<ObservationSeries> {
        match kind {
            TimeseriesKind::NewCases => {
                (input.new_cases.total() > self.config.min_cases).then(|| input.new_cases.clone())
            }
            TimeseriesKind::NewDeaths => {
                (input.new_deaths.total() > self.config.min_deaths)
                    .then(|| input.new_deaths.clone())
            }
            TimeseriesKind::NewHospitalizations => {
                let admissions = input.admission_series()?;
                (admissions.len() >= MIN_HOSPITALIZATION_POINTS)
                    .then(|| admissions.skip_head(HOSPITALIZATION_HEAD_DROP))
            }
        }
    }

    /// Outliers → smoothing → posteriors → intervals for one series.
    fn infer_kind(
        &self,
        kind: TimeseriesKind,
        series: &ObservationSeries,
        serial_period: f64,
    ) -> Result<Option<KindResult>, EngineError> {
        let (filtered, replacements) = replace_outliers(&series.values, &self.config.outliers);
        if !replacements.is_empty() {
            info!(%kind, count = replacements.len(), "replaced outliers");
        }
        let filtered = ObservationSeries {
            dates: series.dates.clone(),
            values: filtered,
        };

        let smoothed = smooth_series(&filtered, &self.config.smoothing);
        let Some(posteriors) = compute_posteriors(
            &smoothed,
            &self.grid,
            serial_period,
            self.config.process_sigma,
        )?
        else {
            return Ok(None);
        };

        let map = posteriors.map_estimates(&self.grid);
        let mut bands = Vec::with_capacity(self.config.confidence_levels.len());
        for &level in &self.config.confidence_levels {
            bands.push(Band {
                level,
                bounds: credible_bounds(&posteriors.distributions, &self.grid, level)?,
            });
        }

        Ok(Some(KindResult {
            kind,
            dates: posteriors.dates.clone(),
            map,
            bands,
            smoothed: smoothed.values[1..].to_vec(),
            log_likelihood: posteriors.log_likelihood,
        }))
    }

    /// Detect the lag of a trailing kind against cases over the trailing
    /// window, then shift that kind's columns and close the gaps.
    fn align_kind(&self, table: &mut ResultTable, kind: TimeseriesKind) {
        let window = self.config.alignment.window_days.min(table.len());
        let start = table.len() - window;

        let cases = match table.column(&map_column(TimeseriesKind::NewCases)) {
            Some(column) => column[start..].to_vec(),
            None => return,
        };
        let trailing = match table.column(&map_column(kind)) {
            Some(column) => column[start..].to_vec(),
            None => return,
        };

        let shift = align_series(&cases, &trailing, &self.config.alignment);
        info!(%kind, shift, "aligning trailing indicator to cases");
        table.set_constant_column(lag_column(kind), shift as f64);

        let kind_columns: Vec<String> = table
            .column_names()
            .filter(|name| name.contains(kind.label()))
            .cloned()
            .collect();
        for name in kind_columns {
            if let Some(column) = table.column(&name) {
                let shifted = shift_values(column, shift);
                table.set_raw_column(name, interpolate_forward(&shifted));
            }
        }
    }

    /// Composite MAP and band columns.
    ///
    /// The composite is the per-date mean of the available case and death
    /// MAP estimates; hospitalizations never contribute. The band is copied
    /// from the case series (deaths when cases are absent) at the widest
    /// configured level.
    fn compose(&self, table: &mut ResultTable) {
        let cases = table
            .column(&map_column(TimeseriesKind::NewCases))
            .map(|c| c.to_vec());
        let deaths = table
            .column(&map_column(TimeseriesKind::NewDeaths))
            .map(|c| c.to_vec());

        let band_source = match (&cases, &deaths) {
            (Some(_), _) => TimeseriesKind::NewCases,
            (None, Some(_)) => TimeseriesKind::NewDeaths,
            (None, None) => return,
        };

        let composite: Vec<Option<f64>> = (0..table.len())
            .map(|row| {
                let values: Vec<f64> = [&cases, &deaths]
                    .iter()
                    .filter_map(|column| column.as_ref().and_then(|c| c[row]))
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            })
            .collect();
        table.set_raw_column(COMPOSITE_MAP_COLUMN, composite);

        let widest = self
            .config
            .confidence_levels
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        let (low_pct, high_pct) = level_percents(widest);
        for pct in [low_pct, high_pct] {
            if let Some(band) = table.column(&ci_column(band_source, pct)) {
                let band = band.to_vec();
                table.set_raw_column(composite_ci_column(pct), band);
            }
        }
    }
}

/// Merge one kind's result into the table (outer join on date).
fn merge_kind(table: &mut ResultTable, result: &KindResult, levels: &[f64]) {
    let with_dates = |values: &[f64]| -> Vec<(NaiveDate, f64)> {
        result.dates.iter().cloned().zip(values.iter().cloned()).collect()
    };

    table.set_column(map_column(result.kind), &with_dates(&result.map));
    table.set_column(smoothed_column(result.kind), &with_dates(&result.smoothed));
    for band in &result.bands {
        if !levels.contains(&band.level) {
            continue;
        }
        let (low_pct, high_pct) = level_percents(band.level);
        let lows: Vec<f64> = band.bounds.iter().map(|(low, _)| *low).collect();
        let highs: Vec<f64> = band.bounds.iter().map(|(_, high)| *high).collect();
        table.set_column(ci_column(result.kind, low_pct), &with_dates(&lows));
        table.set_column(ci_column(result.kind, high_pct), &with_dates(&highs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{DiseaseParams, HospitalizationKind, HospitalizationSeries};

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, 1).unwrap() + chrono::Days::new(offset)
    }

    fn series_from(values: Vec<f64>) -> ObservationSeries {
        let dates = (0..values.len() as u64).map(day).collect();
        ObservationSeries {
            dates,
            values,
        }
    }

    fn steady_input(fips: &str) -> GeographyInput {
        GeographyInput {
            fips: fips.to_string(),
            new_cases: series_from(vec![100.0; 40]),
            new_deaths: series_from(vec![20.0; 40]),
            hospitalizations: None,
            disease: DiseaseParams::default(),
        }
    }

    #[test]
    fn steady_geography_produces_composite_near_one() {
        let engine = RtEngine::new(RtConfig::default()).unwrap();
        let table = engine.run(&steady_input("06")).unwrap().unwrap();

        assert!(table.has_column("Rt_MAP__new_cases"));
        assert!(table.has_column("Rt_MAP__new_deaths"));
        assert!(table.has_column("Rt_ci5__new_cases"));
        assert!(table.has_column("Rt_ci95__new_cases"));
        assert!(table.has_column("Rt_MAP_composite"));
        assert!(table.has_column("Rt_ci95_composite"));
        assert!(table.has_column("lag_days__new_deaths"));

        let composite = table.column("Rt_MAP_composite").unwrap();
        let tail: Vec<f64> = composite.iter().rev().take(10).filter_map(|v| *v).collect();
        assert!(!tail.is_empty());
        for value in tail {
            assert!((value - 1.0).abs() < 0.1, "composite {value} far from 1.0");
        }
    }

    #[test]
    fn cases_only_composite_copies_cases() {
        let mut input = steady_input("06");
        input.new_deaths = series_from(vec![0.0; 40]);
        let engine = RtEngine::new(RtConfig::default()).unwrap();
        let table = engine.run(&input).unwrap().unwrap();

        assert!(!table.has_column("Rt_MAP__new_deaths"));
        let composite = table.column("Rt_MAP_composite").unwrap().to_vec();
        let cases = table.column("Rt_MAP__new_cases").unwrap().to_vec();
        assert_eq!(composite, cases);
    }

    #[test]
    fn empty_geography_yields_no_table() {
        let input = GeographyInput {
            fips: "00".to_string(),
            new_cases: series_from(vec![0.0; 10]),
            new_deaths: series_from(vec![0.0; 10]),
            hospitalizations: None,
            disease: DiseaseParams::default(),
        };
        let engine = RtEngine::new(RtConfig::default()).unwrap();
        assert!(engine.run(&input).unwrap().is_none());
    }

    #[test]
    fn hospitalization_occupancy_contributes_a_column() {
        let mut input = steady_input("06");
        // Steady census at 300 implies a steady admission flow well above
        // the activity threshold.
        input.hospitalizations = Some(HospitalizationSeries {
            kind: HospitalizationKind::CurrentOccupancy,
            series: series_from(vec![300.0; 40]),
        });
        let engine = RtEngine::new(RtConfig::default()).unwrap();
        let table = engine.run(&input).unwrap().unwrap();
        assert!(table.has_column("Rt_MAP__new_hospitalizations"));
        assert!(table.has_column("lag_days__new_hospitalizations"));
    }

    #[test]
    fn batch_isolates_invalid_geography() {
        let bad = GeographyInput {
            fips: "97".to_string(),
            // Length mismatch triggers a SeriesError inside run().
            new_cases: ObservationSeries {
                dates: vec![day(0)],
                values: vec![1.0, 2.0],
            },
            new_deaths: ObservationSeries::default(),
            hospitalizations: None,
            disease: DiseaseParams::default(),
        };
        let good = steady_input("06");

        let engine = RtEngine::new(RtConfig::default()).unwrap();
        let outcomes = engine.run_batch(&[bad, good]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].table.is_none());
        assert!(outcomes[1].table.is_some());
    }

    #[test]
    fn lag_column_holds_one_shift_value() {
        let engine = RtEngine::new(RtConfig::default()).unwrap();
        let table = engine.run(&steady_input("06")).unwrap().unwrap();
        let lag = table.column("lag_days__new_deaths").unwrap();
        // One shift per kind; a positive shift leaves the leading rows
        // empty, so compare the defined entries only.
        let defined: Vec<f64> = lag.iter().filter_map(|v| *v).collect();
        assert!(!defined.is_empty());
        let shift = defined[0];
        assert!(defined.iter().all(|v| *v == shift));
        assert!((-21.0..=4.0).contains(&shift));
    }
}
