//! Observation series model.
//!
//! Daily count series per observation kind, the immutable per-geography
//! input bundle, and the disease parameters used to derive the serial
//! period and to reconstruct hospital admissions from occupancy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by series construction and validation.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("dates/values length mismatch: {dates} dates, {values} values")]
    LengthMismatch { dates: usize, values: usize },

    #[error("dates not strictly increasing at index {index}")]
    UnorderedDates { index: usize },

    #[error("negative observation {value} at index {index}")]
    NegativeValue { index: usize, value: f64 },
}

/// Observation kinds the engine can infer R_t from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeseriesKind {
    NewCases,
    NewDeaths,
    NewHospitalizations,
}

impl TimeseriesKind {
    /// Label used to build output column names.
    pub fn label(&self) -> &'static str {
        match self {
            TimeseriesKind::NewCases => "new_cases",
            TimeseriesKind::NewDeaths => "new_deaths",
            TimeseriesKind::NewHospitalizations => "new_hospitalizations",
        }
    }

    /// Kinds that trail the case curve and get lag-aligned against it.
    pub fn lags_cases(&self) -> bool {
        matches!(
            self,
            TimeseriesKind::NewDeaths | TimeseriesKind::NewHospitalizations
        )
    }
}

impl std::fmt::Display for TimeseriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How a hospitalization series is reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HospitalizationKind {
    /// Daily new-admission increments.
    Cumulative,
    /// Census of currently occupied beds; admissions must be reconstructed.
    CurrentOccupancy,
}

/// One (date, value) observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// An ordered daily count series.
///
/// One value per calendar day present in the input; uniform spacing is not
/// required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SeriesPoint>", into = "Vec<SeriesPoint>")]
pub struct ObservationSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl From<Vec<SeriesPoint>> for ObservationSeries {
    fn from(points: Vec<SeriesPoint>) -> Self {
        let mut series = ObservationSeries {
            dates: Vec::with_capacity(points.len()),
            values: Vec::with_capacity(points.len()),
        };
        for point in points {
            series.dates.push(point.date);
            series.values.push(point.value);
        }
        series
    }
}

impl From<ObservationSeries> for Vec<SeriesPoint> {
    fn from(series: ObservationSeries) -> Self {
        series
            .dates
            .into_iter()
            .zip(series.values)
            .map(|(date, value)| SeriesPoint { date, value })
            .collect()
    }
}

impl ObservationSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, SeriesError> {
        let series = ObservationSeries { dates, values };
        series.validate()?;
        Ok(series)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all observations.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Structural checks: aligned lengths, ordered dates, non-negative counts.
    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.dates.len() != self.values.len() {
            return Err(SeriesError::LengthMismatch {
                dates: self.dates.len(),
                values: self.values.len(),
            });
        }
        for (index, pair) in self.dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SeriesError::UnorderedDates { index: index + 1 });
            }
        }
        for (index, &value) in self.values.iter().enumerate() {
            if value < 0.0 {
                return Err(SeriesError::NegativeValue { index, value });
            }
        }
        Ok(())
    }

    /// Copy of the series with the first `n` points removed.
    pub fn skip_head(&self, n: usize) -> ObservationSeries {
        let n = n.min(self.len());
        ObservationSeries {
            dates: self.dates[n..].to_vec(),
            values: self.values[n..].to_vec(),
        }
    }
}

/// Series after outlier replacement, Gaussian smoothing, and truncation.
///
/// Dates are a contiguous suffix of the source series' dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl SmoothedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A hospitalization series tagged with its reporting convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HospitalizationSeries {
    pub kind: HospitalizationKind,
    #[serde(rename = "points")]
    pub series: ObservationSeries,
}

/// Disease natural-history parameters.
///
/// Durations are in days. The serial period feeds the observation model;
/// length-of-stay and the ICU split drive the occupancy-to-admissions
/// reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseParams {
    #[serde(default = "default_incubation_days")]
    pub incubation_days: f64,
    #[serde(default = "default_infectious_days")]
    pub infectious_days: f64,
    #[serde(default = "default_los_general")]
    pub los_general: f64,
    #[serde(default = "default_los_icu")]
    pub los_icu: f64,
    /// Fraction of hospital admissions that go to the ICU.
    #[serde(default = "default_icu_fraction")]
    pub icu_fraction: f64,
}

fn default_incubation_days() -> f64 {
    4.6
}

fn default_infectious_days() -> f64 {
    6.0
}

fn default_los_general() -> f64 {
    7.0
}

fn default_los_icu() -> f64 {
    10.0
}

fn default_icu_fraction() -> f64 {
    0.3
}

impl Default for DiseaseParams {
    fn default() -> Self {
        Self {
            incubation_days: default_incubation_days(),
            infectious_days: default_infectious_days(),
            los_general: default_los_general(),
            los_icu: default_los_icu(),
            icu_fraction: default_icu_fraction(),
        }
    }
}

impl DiseaseParams {
    /// Mean generation interval: incubation plus half the infectious window.
    pub fn serial_period(&self) -> f64 {
        self.incubation_days + 0.5 * self.infectious_days
    }

    /// Daily fraction of the occupied census expected to discharge.
    pub fn occupancy_outflow_rate(&self) -> f64 {
        (1.0 - self.icu_fraction) / self.los_general + self.icu_fraction / self.los_icu
    }
}

/// Immutable per-geography input bundle.
///
/// Constructed once and passed through the pipeline; stages return new
/// series rather than mutating the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeographyInput {
    pub fips: String,
    #[serde(default)]
    pub new_cases: ObservationSeries,
    #[serde(default)]
    pub new_deaths: ObservationSeries,
    #[serde(default)]
    pub hospitalizations: Option<HospitalizationSeries>,
    #[serde(default)]
    pub disease: DiseaseParams,
}

impl GeographyInput {
    /// Structural validation of every series in the bundle.
    pub fn validate(&self) -> Result<(), SeriesError> {
        self.new_cases.validate()?;
        self.new_deaths.validate()?;
        if let Some(hosp) = &self.hospitalizations {
            hosp.series.validate()?;
        }
        Ok(())
    }

    /// Hospitalization series normalized to new-admission flow.
    ///
    /// Cumulative feeds pass through (the loader reports daily increments);
    /// a current-occupancy census is converted by adding the estimated
    /// discharge outflow to the day-over-day census change, dropping the
    /// first day.
    pub fn admission_series(&self) -> Option<ObservationSeries> {
        let hosp = self.hospitalizations.as_ref()?;
        match hosp.kind {
            HospitalizationKind::Cumulative => Some(hosp.series.clone()),
            HospitalizationKind::CurrentOccupancy => {
                Some(admissions_from_occupancy(&hosp.series, &self.disease))
            }
        }
    }
}

/// Reconstruct implied new admissions from a bed-occupancy census.
///
/// admissions[t] = occ[t] − occ[t−1] + occ[t−1] · outflow_rate. Negative
/// reconstructions are clamped to zero (census corrections can otherwise
/// produce impossible negative flow).
pub fn admissions_from_occupancy(
    occupancy: &ObservationSeries,
    disease: &DiseaseParams,
) -> ObservationSeries {
    if occupancy.len() < 2 {
        return ObservationSeries::default();
    }
    let rate = disease.occupancy_outflow_rate();
    let mut dates = Vec::with_capacity(occupancy.len() - 1);
    let mut values = Vec::with_capacity(occupancy.len() - 1);
    for t in 1..occupancy.len() {
        let outflow = occupancy.values[t - 1] * rate;
        let admissions = occupancy.values[t] - occupancy.values[t - 1] + outflow;
        dates.push(occupancy.dates[t]);
        values.push(admissions.max(0.0));
    }
    ObservationSeries { dates, values }
}
