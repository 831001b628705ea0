//! Turning per-slot model outputs back into one prediction per pair id.

use std::collections::BTreeMap;

use log::info;
use scc_core::{
    Contributions, CouplingType, ErrorInfo, PairId, SccError, COUPLING_MAX,
};
use scc_pack::{Batch, BatchAssembler, PackedFrame};
use scc_rank::GaussRankMap;
use serde::{Deserialize, Serialize};

use crate::config::TargetScaling;
use crate::model::CouplingModel;

/// Physical-unit prediction for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    /// Pair identifier.
    pub id: PairId,
    /// Molecule of the pair.
    pub molecule_name: String,
    /// Coupling type of the pair.
    pub coupling_type: CouplingType,
    /// Predicted constant in physical units.
    pub scalar_coupling_constant: f64,
    /// Target stored in the packed slot (0.0 for unlabelled pairs).
    pub target: f64,
    /// Predicted contributions when the model has five outputs.
    pub contributions: Option<Contributions>,
}

fn check_num_output(num_output: usize) -> Result<(), SccError> {
    if num_output == 1 || num_output == 5 {
        Ok(())
    } else {
        Err(SccError::Config(
            ErrorInfo::new("num-output", "models must emit 1 or 5 outputs per slot")
                .with_context("num_output", num_output),
        ))
    }
}

/// Gathers per-batch model outputs into one frame-ordered buffer.
#[derive(Debug)]
pub struct PredictionCollector<'a> {
    frame: &'a PackedFrame,
    num_output: usize,
    values: Vec<f64>,
    filled: Vec<bool>,
}

impl<'a> PredictionCollector<'a> {
    /// Creates an empty collector for `frame`.
    pub fn new(frame: &'a PackedFrame, num_output: usize) -> Result<Self, SccError> {
        check_num_output(num_output)?;
        Ok(Self {
            frame,
            num_output,
            values: vec![0.0; frame.len() * COUPLING_MAX * num_output],
            filled: vec![false; frame.len()],
        })
    }

    /// Stores the outputs of one batch. Occupied slots must be finite;
    /// padded slots are not inspected.
    pub fn record(&mut self, batch: &Batch<'_>, outputs: &[f64]) -> Result<(), SccError> {
        let width = COUPLING_MAX * self.num_output;
        if outputs.len() != batch.len() * width {
            return Err(SccError::shape(
                "model-output-width",
                "model output length does not match the batch",
                batch.len() * width,
                outputs.len(),
            )
            .with_context("batch", batch.index()));
        }
        for (chunk, &row) in outputs.chunks_exact(width).zip(batch.rows()) {
            if std::mem::replace(&mut self.filled[row], true) {
                return Err(SccError::Schema(
                    ErrorInfo::new("model-output-duplicate-row", "molecule predicted twice")
                        .with_context("molecule", &self.frame.molecules()[row]),
                ));
            }
            let occupied = self.frame.num_coupling(row) * self.num_output;
            if let Some(pos) = chunk[..occupied].iter().position(|value| !value.is_finite()) {
                return Err(SccError::Schema(
                    ErrorInfo::new("model-output-non-finite", "model output is not finite")
                        .with_context("molecule", &self.frame.molecules()[row])
                        .with_context("slot", pos / self.num_output)
                        .with_context("value", chunk[pos]),
                ));
            }
            self.values[row * width..(row + 1) * width].copy_from_slice(chunk);
        }
        Ok(())
    }

    /// Returns the frame-ordered outputs once every row is filled.
    pub fn finish(self) -> Result<Vec<f64>, SccError> {
        if let Some(row) = self.filled.iter().position(|filled| !filled) {
            return Err(SccError::ShapeMismatch(
                ErrorInfo::new("model-output-missing-row", "molecule was never predicted")
                    .with_context("molecule", &self.frame.molecules()[row]),
            ));
        }
        Ok(self.values)
    }
}

/// Runs `model` over every batch of `frame` and collects its outputs.
pub fn collect_predictions(
    model: &dyn CouplingModel,
    frame: &PackedFrame,
    batch_size: usize,
) -> Result<Vec<f64>, SccError> {
    let assembler = BatchAssembler::new(frame, batch_size)?;
    let mut collector = PredictionCollector::new(frame, model.num_output())?;
    for batch in assembler.batches() {
        let outputs = model.predict(&batch)?;
        collector.record(&batch, &outputs)?;
    }
    collector.finish()
}

/// Maps frame-ordered outputs back to one row per pair id, sorted by id.
///
/// Only the first `num_coupling` slots of each molecule are read. With
/// GaussRank scaling, output 0 goes through the fold's inverse transform for
/// the slot's type.
pub fn reconstruct(
    frame: &PackedFrame,
    outputs: &[f64],
    num_output: usize,
    map: &GaussRankMap,
    scaling: TargetScaling,
) -> Result<Vec<PredictionRow>, SccError> {
    check_num_output(num_output)?;
    let width = COUPLING_MAX * num_output;
    if outputs.len() != frame.len() * width {
        return Err(SccError::shape(
            "reconstruct-output-width",
            "output buffer does not cover the frame",
            frame.len() * width,
            outputs.len(),
        ));
    }
    let mut rows: BTreeMap<PairId, PredictionRow> = BTreeMap::new();
    for row in 0..frame.len() {
        let molecule = &frame.molecules()[row];
        for (slot_index, slot) in frame.unpack(row)?.into_iter().enumerate() {
            let base = row * width + slot_index * num_output;
            let record = slot.record;
            if outputs[base..base + num_output].iter().any(|value| !value.is_finite()) {
                return Err(SccError::Schema(
                    ErrorInfo::new("reconstruct-non-finite", "model output is not finite")
                        .with_context("id", record.id)
                        .with_context("molecule", molecule),
                ));
            }
            let predicted = match scaling {
                TargetScaling::Gaussrank => map
                    .inverse(outputs[base], record.coupling_type)
                    .map_err(|err| err.with_context("id", record.id))?,
                TargetScaling::Raw => outputs[base],
            };
            let contributions = (num_output == 5).then(|| {
                Contributions::from_array([
                    outputs[base + 1],
                    outputs[base + 2],
                    outputs[base + 3],
                    outputs[base + 4],
                ])
            });
            let prediction = PredictionRow {
                id: record.id,
                molecule_name: molecule.clone(),
                coupling_type: record.coupling_type,
                scalar_coupling_constant: predicted,
                target: record.scalar_coupling_constant,
                contributions,
            };
            if rows.insert(record.id, prediction).is_some() {
                return Err(SccError::Schema(
                    ErrorInfo::new("reconstruct-duplicate-id", "pair id appears in two slots")
                        .with_context("id", record.id)
                        .with_context("molecule", molecule),
                ));
            }
        }
    }
    info!("reconstructed {} pair predictions from {} molecules", rows.len(), frame.len());
    Ok(rows.into_values().collect())
}
