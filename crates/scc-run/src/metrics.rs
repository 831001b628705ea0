//! Validation log-MAE, averaged over coupling types.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use scc_core::{CouplingType, SccError};
use serde::{Deserialize, Serialize};

use crate::reconstruct::PredictionRow;

/// Floor applied to the MAE before taking its logarithm.
pub const MAE_FLOOR: f64 = 1e-9;

/// Error summary of one coupling type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeScore {
    /// Coupling type.
    pub coupling_type: CouplingType,
    /// Number of scored pairs.
    pub count: usize,
    /// Mean absolute error in physical units.
    pub mae: f64,
    /// `ln(max(mae, MAE_FLOOR))`.
    pub log_mae: f64,
}

/// Per-type scores and their mean log-MAE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmaeReport {
    /// Types present in the scored rows, canonical order.
    pub per_type: Vec<TypeScore>,
    /// Mean of the per-type log-MAE values.
    pub mean_log_mae: f64,
}

impl LmaeReport {
    /// Scores predictions against the targets stored alongside them.
    pub fn from_predictions(rows: &[PredictionRow]) -> Result<Self, SccError> {
        if rows.is_empty() {
            return Err(SccError::config("metric-empty", "no predictions to score"));
        }
        let mut sums: BTreeMap<CouplingType, (f64, usize)> = BTreeMap::new();
        for row in rows {
            let entry = sums.entry(row.coupling_type).or_insert((0.0, 0));
            entry.0 += (row.scalar_coupling_constant - row.target).abs();
            entry.1 += 1;
        }
        let per_type: Vec<TypeScore> = sums
            .into_iter()
            .map(|(coupling_type, (sum, count))| {
                let mae = sum / count as f64;
                TypeScore {
                    coupling_type,
                    count,
                    mae,
                    log_mae: mae.max(MAE_FLOOR).ln(),
                }
            })
            .collect();
        let mean_log_mae =
            per_type.iter().map(|score| score.log_mae).sum::<f64>() / per_type.len() as f64;
        Ok(Self {
            per_type,
            mean_log_mae,
        })
    }

    /// One-line table, e.g. `1JHC -1.204 | 2JHH -2.310 | mean -1.757`.
    pub fn summary_line(&self) -> String {
        let mut line = String::new();
        for score in &self.per_type {
            let _ = write!(line, "{} {:.3} | ", score.coupling_type, score.log_mae);
        }
        let _ = write!(line, "mean {:.3}", self.mean_log_mae);
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scc_core::PairId;

    fn row(id: u64, ty: CouplingType, predicted: f64, target: f64) -> PredictionRow {
        PredictionRow {
            id: PairId::from_raw(id),
            molecule_name: "m".into(),
            coupling_type: ty,
            scalar_coupling_constant: predicted,
            target,
            contributions: None,
        }
    }

    #[test]
    fn averages_log_mae_over_types() {
        let rows = vec![
            row(0, CouplingType::J1HC, 1.0, 2.0),
            row(1, CouplingType::J1HC, 3.0, 2.0),
            row(2, CouplingType::J3HH, 5.0, 5.0),
        ];
        let report = LmaeReport::from_predictions(&rows).unwrap();
        assert_eq!(report.per_type.len(), 2);
        assert_eq!(report.per_type[0].mae, 1.0);
        assert_eq!(report.per_type[0].log_mae, 0.0);
        assert_eq!(report.per_type[1].log_mae, MAE_FLOOR.ln());
        assert!((report.mean_log_mae - MAE_FLOOR.ln() / 2.0).abs() < 1e-12);
        assert_eq!(
            report.summary_line(),
            format!("1JHC 0.000 | 3JHH {:.3} | mean {:.3}", MAE_FLOOR.ln(), MAE_FLOOR.ln() / 2.0)
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(LmaeReport::from_predictions(&[]).is_err());
    }
}
