//! Seasonal ARIMA (1,1,1)×(1,1,1)ₛ fitted by conditional sum of squares.
//!
//! The differenced series `w = (1−B)(1−Bˢ)y` follows
//! `(1−φB)(1−ΦBˢ)w = (1+θB)(1+ΘBˢ)e`. Pre-sample values of `w` and `e` are
//! taken as zero. No stationarity or invertibility constraint is imposed on
//! the coefficients.

use serde::Serialize;
use thiserror::Error;

use crate::optimize::{nelder_mead, NelderMeadOptions};

/// Shortest series the model is fitted on.
pub const MIN_OBSERVATIONS: usize = 5;
/// Differenced points needed before the seasonal terms are estimated.
const MIN_SEASONAL_POINTS: usize = 4;
const START_VALUE: f64 = 0.1;

#[derive(Error, Debug, PartialEq)]
pub enum FitError {
    #[error("Need at least 5 observations to fit, got {0}")]
    TooShort(usize),
    #[error("Series contains non-finite values")]
    NonFinite,
    #[error("Model fit diverged")]
    Diverged,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SarimaParams {
    pub ar: f64,
    pub ma: f64,
    pub seasonal_ar: f64,
    pub seasonal_ma: f64,
}

impl SarimaParams {
    fn from_slice(x: &[f64]) -> Self {
        Self {
            ar: x[0],
            ma: x[1],
            seasonal_ar: x.get(2).copied().unwrap_or(0.0),
            seasonal_ma: x.get(3).copied().unwrap_or(0.0),
        }
    }

    /// `(lag, coefficient)` pairs of `w_t = Σ c·w_{t−lag} + …`.
    fn ar_lags(&self, period: Option<usize>) -> Vec<(usize, f64)> {
        let mut lags = vec![(1, self.ar)];
        if let Some(s) = period {
            lags.push((s, self.seasonal_ar));
            lags.push((s + 1, -self.ar * self.seasonal_ar));
        }
        lags
    }

    /// `(lag, coefficient)` pairs of `… + e_t + Σ c·e_{t−lag}`.
    fn ma_lags(&self, period: Option<usize>) -> Vec<(usize, f64)> {
        let mut lags = vec![(1, self.ma)];
        if let Some(s) = period {
            lags.push((s, self.seasonal_ma));
            lags.push((s + 1, self.ma * self.seasonal_ma));
        }
        lags
    }
}

/// A fitted model, holding what it needs to forecast.
#[derive(Debug, Clone)]
pub struct SarimaFit {
    pub params: SarimaParams,
    pub sigma2: f64,
    /// Seasonal period actually used; `None` when the series was too short.
    period: Option<usize>,
    history: Vec<f64>,
    diffed: Vec<f64>,
    residuals: Vec<f64>,
}

/// One step of a forecast: point estimate and its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub mean: f64,
    pub std_err: f64,
}

impl SarimaFit {
    pub fn seasonal_applied(&self) -> bool {
        self.period.is_some()
    }

    /// Forecast `steps` periods past the end of the fitted series.
    pub fn forecast(&self, steps: usize) -> Vec<ForecastPoint> {
        let ar = self.params.ar_lags(self.period);
        let ma = self.params.ma_lags(self.period);

        let mut w = self.diffed.clone();
        let mut e = self.residuals.clone();
        let mut y = self.history.clone();
        for _ in 0..steps {
            let t = w.len();
            let next_w = lagged_sum(&w, t, &ar) + lagged_sum(&e, t, &ma);
            w.push(next_w);
            e.push(0.0);

            let t = y.len();
            let mut next_y = next_w + y[t - 1];
            if let Some(s) = self.period {
                next_y += y[t - s] - y[t - s - 1];
            }
            y.push(next_y);
        }

        let psi = self.psi_weights(steps);
        let mut cumulative = 0.0;
        y[self.history.len()..]
            .iter()
            .zip(&psi)
            .map(|(&mean, weight)| {
                cumulative += weight * weight;
                ForecastPoint {
                    mean,
                    std_err: (self.sigma2 * cumulative).sqrt(),
                }
            })
            .collect()
    }

    /// MA(∞) weights of the integrated model, `ψ₀ = 1`.
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        let mut ar_poly = lag_polynomial(&self.params.ar_lags(self.period), -1.0);
        ar_poly = poly_mul(&ar_poly, &[1.0, -1.0]);
        if let Some(s) = self.period {
            let mut seasonal_diff = vec![0.0; s + 1];
            seasonal_diff[0] = 1.0;
            seasonal_diff[s] = -1.0;
            ar_poly = poly_mul(&ar_poly, &seasonal_diff);
        }
        let ma_poly = lag_polynomial(&self.params.ma_lags(self.period), 1.0);

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            let mut value = ma_poly.get(j).copied().unwrap_or(0.0);
            for i in 1..=j.min(ar_poly.len() - 1) {
                value -= ar_poly[i] * psi[j - i];
            }
            psi.push(value);
        }
        psi
    }
}

/// Fit the model on `series` with seasonal period `period`.
///
/// Falls back to the non-seasonal (1,1,1) model when the series is too short
/// to difference seasonally and still leave enough points.
pub fn fit(series: &[f64], period: usize) -> Result<SarimaFit, FitError> {
    if series.len() < MIN_OBSERVATIONS {
        return Err(FitError::TooShort(series.len()));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let once = difference(series, 1);
    let seasonal = period > 0 && once.len() >= period + MIN_SEASONAL_POINTS;
    let (period, diffed) = if seasonal {
        (Some(period), difference(&once, period))
    } else {
        tracing::debug!(n = series.len(), period, "series too short for seasonal terms");
        (None, once)
    };

    let dims = if period.is_some() { 4 } else { 2 };
    let objective = |x: &[f64]| {
        let params = SarimaParams::from_slice(x);
        residuals(&diffed, &params, period).iter().map(|e| e * e).sum::<f64>()
    };
    let best = nelder_mead(objective, &vec![START_VALUE; dims], NelderMeadOptions::default());
    if !best.value.is_finite() {
        return Err(FitError::Diverged);
    }

    let params = SarimaParams::from_slice(&best.x);
    let residuals = residuals(&diffed, &params, period);
    let sigma2 = best.value / diffed.len() as f64;
    tracing::debug!(
        iterations = best.iterations,
        sse = best.value,
        seasonal = period.is_some(),
        "sarima fitted"
    );

    Ok(SarimaFit {
        params,
        sigma2,
        period,
        history: series.to_vec(),
        diffed,
        residuals,
    })
}

fn difference(series: &[f64], lag: usize) -> Vec<f64> {
    series.iter().skip(lag).zip(series).map(|(a, b)| a - b).collect()
}

/// One-step residuals with zero pre-sample.
fn residuals(w: &[f64], params: &SarimaParams, period: Option<usize>) -> Vec<f64> {
    let ar = params.ar_lags(period);
    let ma = params.ma_lags(period);
    let mut e = Vec::with_capacity(w.len());
    for t in 0..w.len() {
        let predicted = lagged_sum(w, t, &ar) + lagged_sum(&e, t, &ma);
        e.push(w[t] - predicted);
    }
    e
}

/// `Σ c·x[t−lag]` over the lags that fall inside `x`.
fn lagged_sum(x: &[f64], t: usize, lags: &[(usize, f64)]) -> f64 {
    lags.iter()
        .filter(|(lag, _)| *lag <= t)
        .map(|(lag, c)| c * x[t - lag])
        .sum()
}

/// `1 + sign·Σ c·B^lag` as a coefficient vector.
fn lag_polynomial(lags: &[(usize, f64)], sign: f64) -> Vec<f64> {
    let degree = lags.iter().map(|(lag, _)| *lag).max().unwrap_or(0);
    let mut poly = vec![0.0; degree + 1];
    poly[0] = 1.0;
    for (lag, c) in lags {
        poly[*lag] += sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}
