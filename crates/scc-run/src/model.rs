use scc_core::{SccError, COUPLING_FIELDS, COUPLING_MAX, FIELD_GAUSSRANK, FIELD_ID, FIELD_TARGET};
use scc_pack::Batch;

use crate::config::TargetScaling;

/// Seam to the network that consumes batches and predicts coupling slots.
///
/// `predict` returns `batch.len() * COUPLING_MAX * num_output()` values laid
/// out `[molecule][slot][output]`; values for padded slots are ignored.
pub trait CouplingModel {
    /// Short name recorded in manifests.
    fn name(&self) -> &str;

    /// Outputs per coupling slot, 1 or 5.
    fn num_output(&self) -> usize;

    /// One optimisation step on a training batch.
    fn fit_batch(&mut self, _epoch: u32, _batch: &Batch<'_>) -> Result<(), SccError> {
        Ok(())
    }

    /// Predicts every coupling slot of `batch`.
    fn predict(&self, batch: &Batch<'_>) -> Result<Vec<f64>, SccError>;
}

/// Echoes the packed targets back as predictions: the stored GaussRank score
/// (or raw target) as output 0 and the four contributions as outputs 1..4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityModel {
    num_output: usize,
    scaling: TargetScaling,
}

impl IdentityModel {
    /// Creates the model.
    pub fn new(num_output: usize, scaling: TargetScaling) -> Self {
        Self {
            num_output,
            scaling,
        }
    }
}

impl CouplingModel for IdentityModel {
    fn name(&self) -> &str {
        "identity"
    }

    fn num_output(&self) -> usize {
        self.num_output
    }

    fn predict(&self, batch: &Batch<'_>) -> Result<Vec<f64>, SccError> {
        let width = COUPLING_MAX * self.num_output;
        let mut out = vec![0.0; batch.len() * width];
        for (k, view) in batch.molecules().enumerate() {
            let slots = view
                .coupling
                .chunks_exact(COUPLING_FIELDS)
                .take(view.num_coupling);
            for (slot, fields) in slots.enumerate() {
                let base = k * width + slot * self.num_output;
                out[base] = match self.scaling {
                    TargetScaling::Gaussrank => fields[FIELD_GAUSSRANK],
                    TargetScaling::Raw => fields[FIELD_TARGET],
                };
                if self.num_output == 5 {
                    out[base + 1..base + 5].copy_from_slice(&fields[FIELD_GAUSSRANK + 1..FIELD_ID]);
                }
            }
        }
        Ok(out)
    }
}
