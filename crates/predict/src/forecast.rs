use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::sarima::{self, FitError, SarimaParams};
use crate::table::{Table, TableError};

pub const DATE_COLUMNS: &[&str] = &["date", "ds"];
pub const METRIC_COLUMNS: &[&str] = &["metric", "y", "revenue", "count"];

pub const DEFAULT_HORIZON: usize = 8;
pub const MAX_HORIZON: usize = 1000;
/// Upper bound on the resampled grid, guarding against absurd date spans.
pub const MAX_PERIODS: usize = 100_000;
/// Two-sided 80% normal quantile.
const Z_80: f64 = 1.281_551_565_544_600_4;
const MAPE_WINDOW: usize = 10;
const MAPE_EPSILON: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("input must contain 'date' and 'metric' (or 'revenue'/'count') columns")]
    MissingColumns,
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Unsupported frequency '{0}': expected D, W or M")]
    InvalidFrequency(String),
    #[error("horizon must be between 1 and 1000, got {0}")]
    InvalidHorizon(usize),
    #[error("No rows with a date")]
    NoData,
    #[error("Date range spans more than 100000 periods")]
    TooManyPeriods,
    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),
}

impl ForecastError {
    /// True when the caller's input is at fault.
    pub fn is_validation(&self) -> bool {
        !matches!(self, ForecastError::Fit(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Frequency {
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "W")]
    Weekly,
    #[serde(rename = "M")]
    Monthly,
}

impl FromStr for Frequency {
    type Err = ForecastError;

    /// Pandas-style aliases: anything starting with `M`, `W` or `D`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if upper.starts_with('M') {
            Ok(Frequency::Monthly)
        } else if upper.starts_with('W') {
            Ok(Frequency::Weekly)
        } else if upper.starts_with('D') {
            Ok(Frequency::Daily)
        } else {
            Err(ForecastError::InvalidFrequency(s.to_string()))
        }
    }
}

impl Frequency {
    pub fn seasonal_period(self) -> usize {
        match self {
            Frequency::Monthly => 12,
            Frequency::Weekly => 52,
            Frequency::Daily => 7,
        }
    }

    /// The label of the period containing `date`: the day itself, the
    /// Sunday ending its week, or the last day of its month.
    pub fn period_label(self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                let to_sunday = 6 - date.weekday().num_days_from_monday();
                date.checked_add_days(Days::new(to_sunday.into())).unwrap_or(date)
            }
            Frequency::Monthly => month_end(date).unwrap_or(date),
        }
    }

    /// The label of the period after the one labelled `label`.
    pub fn next_label(self, label: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily => label.succ_opt(),
            Frequency::Weekly => label.checked_add_days(Days::new(7)),
            Frequency::Monthly => label.succ_opt().and_then(month_end),
        }
    }
}

fn month_end(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastRequest {
    pub horizon: usize,
    pub freq: Frequency,
}

impl Default for ForecastRequest {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            freq: Frequency::Weekly,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastMetrics {
    pub mape: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model: &'static str,
    pub order: [usize; 3],
    pub seasonal_order: [usize; 4],
    pub seasonal_applied: bool,
    pub params: SarimaParams,
    pub sigma2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub predictions: Vec<Prediction>,
    pub metrics: ForecastMetrics,
    pub model_info: ModelInfo,
}

/// Resample, fit and forecast the metric column of an uploaded table.
pub fn forecast_table(table: &Table, request: &ForecastRequest) -> Result<Forecast, ForecastError> {
    if request.horizon == 0 || request.horizon > MAX_HORIZON {
        return Err(ForecastError::InvalidHorizon(request.horizon));
    }
    let date_col = table.find_column(DATE_COLUMNS).ok_or(ForecastError::MissingColumns)?;
    let metric_col = table.find_column(METRIC_COLUMNS).ok_or(ForecastError::MissingColumns)?;

    let mut observations = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let Some(when) = table.datetime(row, date_col)? else {
            continue;
        };
        observations.push((when.date(), table.number(row, metric_col)?));
    }

    let grid = resample(&observations, request.freq)?;
    let series = fill_gaps(&grid);
    if series.is_empty() {
        return Err(ForecastError::NoData);
    }
    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();

    let period = request.freq.seasonal_period();
    let fit = sarima::fit(&values, period)?;
    let points = fit.forecast(request.horizon);

    let mut predictions = Vec::with_capacity(points.len());
    let mut label = series[series.len() - 1].0;
    for point in points {
        let Some(next) = request.freq.next_label(label) else {
            break;
        };
        label = next;
        let half_width = Z_80 * point.std_err;
        predictions.push(Prediction {
            ds: label,
            yhat: point.mean,
            yhat_lower: point.mean - half_width,
            yhat_upper: point.mean + half_width,
        });
    }

    tracing::info!(
        points = values.len(),
        horizon = request.horizon,
        freq = ?request.freq,
        seasonal = fit.seasonal_applied(),
        "forecast complete"
    );

    Ok(Forecast {
        predictions,
        metrics: ForecastMetrics {
            mape: dispersion_mape(&values),
        },
        model_info: ModelInfo {
            model: "sarimax",
            order: [1, 1, 1],
            seasonal_order: [1, 1, 1, period],
            seasonal_applied: fit.seasonal_applied(),
            params: fit.params,
            sigma2: fit.sigma2,
        },
    })
}

/// Average observations per period over a contiguous grid of labels.
/// Periods without a value are `None`.
pub fn resample(
    observations: &[(NaiveDate, Option<f64>)],
    freq: Frequency,
) -> Result<Vec<(NaiveDate, Option<f64>)>, ForecastError> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (date, value) in observations {
        let bucket = buckets.entry(freq.period_label(*date)).or_insert((0.0, 0));
        if let Some(v) = value {
            bucket.0 += v;
            bucket.1 += 1;
        }
    }

    let (Some(first), Some(last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(Vec::new());
    };

    let mut grid = Vec::new();
    let mut label = *first;
    loop {
        if grid.len() >= MAX_PERIODS {
            return Err(ForecastError::TooManyPeriods);
        }
        let mean = buckets
            .get(&label)
            .filter(|(_, count)| *count > 0)
            .map(|(sum, count)| sum / *count as f64);
        grid.push((label, mean));
        match freq.next_label(label) {
            Some(next) if next <= *last => label = next,
            _ => break,
        }
    }
    Ok(grid)
}

/// Linear interpolation between known values. Leading gaps are dropped,
/// trailing gaps repeat the last known value.
pub fn fill_gaps(grid: &[(NaiveDate, Option<f64>)]) -> Vec<(NaiveDate, f64)> {
    let Some(start) = grid.iter().position(|(_, v)| v.is_some()) else {
        return Vec::new();
    };
    let grid = &grid[start..];

    let mut out = Vec::with_capacity(grid.len());
    let mut last_known: Option<(usize, f64)> = None;
    for (i, (label, value)) in grid.iter().enumerate() {
        let Some(v) = value else {
            continue;
        };
        if let Some((j, prev)) = last_known {
            let span = (i - j) as f64;
            for (k, (gap_label, _)) in grid.iter().enumerate().take(i).skip(j + 1) {
                let frac = (k - j) as f64 / span;
                out.push((*gap_label, prev + (v - prev) * frac));
            }
        }
        out.push((*label, *v));
        last_known = Some((i, *v));
    }
    if let Some((j, prev)) = last_known {
        out.extend(grid[j + 1..].iter().map(|(label, _)| (*label, prev)));
    }
    out
}

/// Mean relative deviation from the mean over the trailing window, in
/// percent, rounded to two places. A dispersion figure, not a holdout error.
pub fn dispersion_mape(values: &[f64]) -> f64 {
    let tail = &values[values.len().saturating_sub(MAPE_WINDOW)..];
    if tail.is_empty() {
        return 0.0;
    }
    let mean = tail.iter().sum::<f64>() / tail.len() as f64;
    let mape = tail
        .iter()
        .map(|v| ((v - mean) / (v + MAPE_EPSILON)).abs())
        .sum::<f64>()
        / tail.len() as f64
        * 100.0;
    (mape * 100.0).round() / 100.0
}
