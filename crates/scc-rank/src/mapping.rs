use std::cmp::Ordering;

use scc_core::{CouplingType, ErrorInfo, SccError};
use serde::{Deserialize, Serialize};

use crate::probit::normal_quantile;

/// Empirical value -> normal-score table for one coupling type of one fold.
///
/// `values` and `scores` are both strictly increasing, so the table can be
/// searched from either side. Tied fitting values collapse into one entry
/// carrying the average of their ranks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankMapping {
    coupling_type: CouplingType,
    observations: usize,
    values: Vec<f64>,
    quantiles: Vec<f64>,
    scores: Vec<f64>,
}

impl RankMapping {
    /// Fits the table from raw training values of a single type.
    pub fn fit(coupling_type: CouplingType, raw: &[f64]) -> Result<Self, SccError> {
        if raw.is_empty() {
            return Err(SccError::Schema(
                ErrorInfo::new("rank-fit-empty", "cannot fit a rank mapping without values")
                    .with_context("coupling_type", coupling_type),
            ));
        }
        if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
            return Err(SccError::Schema(
                ErrorInfo::new("rank-fit-non-finite", "training target is not finite")
                    .with_context("coupling_type", coupling_type)
                    .with_context("value", bad),
            ));
        }
        let mut sorted = raw.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let denom = (n + 1) as f64;

        let mut values = Vec::new();
        let mut quantiles = Vec::new();
        let mut scores = Vec::new();
        let mut start = 0;
        while start < n {
            let mut end = start;
            while end + 1 < n && sorted[end + 1] == sorted[start] {
                end += 1;
            }
            // 1-based ranks start+1..=end+1 averaged
            let rank = (start + end + 2) as f64 / 2.0;
            let quantile = rank / denom;
            values.push(sorted[start]);
            quantiles.push(quantile);
            scores.push(normal_quantile(quantile));
            start = end + 1;
        }
        Self::from_parts(coupling_type, n, values, quantiles, scores)
    }

    /// Rebuilds a table from persisted columns, validating monotonicity.
    pub fn from_parts(
        coupling_type: CouplingType,
        observations: usize,
        values: Vec<f64>,
        quantiles: Vec<f64>,
        scores: Vec<f64>,
    ) -> Result<Self, SccError> {
        if values.is_empty() || values.len() != quantiles.len() || values.len() != scores.len() {
            return Err(SccError::Schema(
                ErrorInfo::new("rank-table-columns", "rank table columns are empty or ragged")
                    .with_context("coupling_type", coupling_type)
                    .with_context("values", values.len())
                    .with_context("quantiles", quantiles.len())
                    .with_context("scores", scores.len()),
            ));
        }
        for column in [&values, &quantiles, &scores] {
            if column.iter().any(|v| !v.is_finite()) {
                return Err(SccError::Schema(
                    ErrorInfo::new("rank-table-non-finite", "rank table holds non-finite entries")
                        .with_context("coupling_type", coupling_type),
                ));
            }
        }
        let increasing = |column: &[f64]| column.windows(2).all(|pair| pair[0] < pair[1]);
        if !increasing(&values) || !increasing(&scores) {
            return Err(SccError::Schema(
                ErrorInfo::new("rank-table-order", "rank table is not strictly increasing")
                    .with_context("coupling_type", coupling_type),
            ));
        }
        Ok(Self {
            coupling_type,
            observations,
            values,
            quantiles,
            scores,
        })
    }

    /// Coupling type covered by the table.
    pub fn coupling_type(&self) -> CouplingType {
        self.coupling_type
    }

    /// Number of training values the table was fitted on.
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Number of distinct fitted values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; a fitted table holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct fitted values, ascending.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Empirical quantile of each fitted value.
    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    /// Normal score of each fitted value.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Raw value -> normal score. Out-of-range values clamp to the end scores.
    pub fn forward(&self, value: f64) -> Result<f64, SccError> {
        self.check_finite(value, "rank-forward-non-finite")?;
        Ok(interpolate(&self.values, &self.scores, value))
    }

    /// Normal score -> raw value. Out-of-range scores clamp to the end values.
    pub fn inverse(&self, score: f64) -> Result<f64, SccError> {
        self.check_finite(score, "rank-inverse-non-finite")?;
        Ok(interpolate(&self.scores, &self.values, score))
    }

    fn check_finite(&self, value: f64, code: &str) -> Result<(), SccError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(SccError::Schema(
                ErrorInfo::new(code, "rank transform input is not finite")
                    .with_context("coupling_type", self.coupling_type)
                    .with_context("value", value),
            ))
        }
    }
}

/// Piecewise-linear lookup of `x` on the strictly increasing `xs` axis.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    match xs.binary_search_by(|probe| probe.partial_cmp(&x).unwrap_or(Ordering::Less)) {
        Ok(idx) => ys[idx],
        Err(idx) => {
            let (x0, x1) = (xs[idx - 1], xs[idx]);
            let (y0, y1) = (ys[idx - 1], ys[idx]);
            let t = (x - x0) / (x1 - x0);
            y0 + t * (y1 - y0)
        }
    }
}
