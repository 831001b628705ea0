//! One cross-validation fold, from input tables to written predictions.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use log::info;
use scc_core::{CouplingSlot, ErrorInfo, PairId, RunProvenance, SccError};
use scc_pack::{
    pack, read_coupling_table, read_feature_table, BatchAssembler, CouplingTable, FeatureTable,
    PackWarning, PackedFrame,
};
use scc_rank::{save_map, GaussRankMap};

use crate::config::RunConfig;
use crate::folds::FoldAssignment;
use crate::hash::stable_hash_string;
use crate::manifest::{RowCounts, RunManifest, RunOutputs, RUN_MANIFEST_SCHEMA};
use crate::metrics::LmaeReport;
use crate::model::CouplingModel;
use crate::output::{write_cv, write_sub, OutputNames};
use crate::reconstruct::{collect_predictions, reconstruct};
use crate::stacking::PriorPredictions;

/// Tables a fold run reads.
#[derive(Debug, Clone)]
pub struct FoldInputs {
    /// Labelled couplings.
    pub train: CouplingTable,
    /// Unlabelled couplings.
    pub test: CouplingTable,
    /// Node features of every molecule.
    pub nodes: FeatureTable,
    /// Edge features of every molecule.
    pub edges: FeatureTable,
    /// Fold of every labelled molecule.
    pub folds: FoldAssignment,
    /// Previous-stage test predictions.
    pub prior: Option<PriorPredictions>,
}

impl FoldInputs {
    /// Reads every table named by `config.data`.
    pub fn load(config: &RunConfig) -> Result<Self, SccError> {
        let data = &config.data;
        let prior = match &data.prior_predictions {
            Some(path) => Some(PriorPredictions::load(path)?),
            None => None,
        };
        Ok(Self {
            train: read_coupling_table(&data.train_couplings, true)?,
            test: read_coupling_table(&data.test_couplings, false)?,
            nodes: read_feature_table(&data.nodes, "node", "num_nodes")?,
            edges: read_feature_table(&data.edges, "edge", "num_edge")?,
            folds: FoldAssignment::load(&data.folds)?,
            prior,
        })
    }
}

/// Fitted map and packed frames of one fold.
#[derive(Debug, Clone)]
pub struct PreparedFold {
    /// Rank tables fitted on the training split.
    pub map: GaussRankMap,
    /// Training frame, pseudo-labelled test molecules appended when enabled.
    pub train: PackedFrame,
    /// Validation frame.
    pub valid: PackedFrame,
    /// Test frame.
    pub test: PackedFrame,
    /// Frame sizes.
    pub counts: RowCounts,
    /// Warnings raised while packing.
    pub warnings: Vec<PackWarning>,
}

/// Summary of a finished fold run.
#[derive(Debug, Clone)]
pub struct FoldReport {
    /// Validation scores.
    pub lmae: LmaeReport,
    /// Frame sizes.
    pub counts: RowCounts,
    /// Validation prediction file.
    pub cv_path: PathBuf,
    /// Test prediction file.
    pub sub_path: PathBuf,
    /// Run manifest.
    pub manifest_path: PathBuf,
}

/// Splits, normalises and packs the inputs of `config.fold`.
///
/// The rank map is fitted on training molecules only. Validation types the
/// map lacks are an error. Node-table molecules without a fold are the test
/// set.
pub fn prepare_fold(config: &RunConfig, inputs: &FoldInputs) -> Result<PreparedFold, SccError> {
    let layout = config.layout.pack_layout();
    let split = inputs.folds.split(config.fold, config.num_folds)?;
    let (train, rest) = inputs.train.partition(&split.train);
    let (valid, unassigned) = rest.partition(&split.valid);
    if let Some(record) = unassigned.records().first() {
        return Err(SccError::Schema(
            ErrorInfo::new("fold-unassigned", "labelled molecule has no fold")
                .with_context("molecule", &record.molecule_name)
                .with_context("pairs", unassigned.len()),
        ));
    }

    let map = GaussRankMap::fit(train.records(), config.fold)?;
    let train_slots = map.score_records(train.records())?;
    let valid_slots = map.score_records(valid.records())?;

    let mut counts = RowCounts::default();
    let mut pseudo_slots = Vec::new();
    let mut test_slots = Vec::with_capacity(inputs.test.len());
    match &inputs.prior {
        Some(prior) => {
            let stacked = prior.apply_to(&inputs.test);
            counts.prior_missing = stacked.missing;
            let scored = map.score_records(stacked.labelled.records())?;
            let by_id: HashMap<PairId, &CouplingSlot> =
                scored.iter().map(|slot| (slot.record.id, slot)).collect();
            for record in inputs.test.records() {
                test_slots.push(match by_id.get(&record.id) {
                    Some(slot) => (*slot).clone(),
                    None => CouplingSlot::unscored(record.clone()),
                });
            }
            if config.pseudo_label {
                pseudo_slots = scored;
            }
        }
        None => {
            test_slots.extend(inputs.test.records().iter().cloned().map(CouplingSlot::unscored));
        }
    }

    let test_molecules: HashSet<String> = inputs
        .nodes
        .rows()
        .iter()
        .filter(|row| inputs.folds.fold_of(&row.molecule_name).is_none())
        .map(|row| row.molecule_name.clone())
        .collect();
    let test_nodes = inputs.nodes.retain_molecules(&test_molecules);

    let mut warnings = Vec::new();
    let mut packed = |nodes: &FeatureTable, slots: &[CouplingSlot]| -> Result<PackedFrame, SccError> {
        let outcome = pack(nodes, &inputs.edges, slots, &layout)?;
        warnings.extend(outcome.warnings);
        Ok(outcome.frame)
    };
    let mut train_frame = packed(&inputs.nodes.retain_molecules(&split.train), &train_slots)?;
    let valid_frame = packed(&inputs.nodes.retain_molecules(&split.valid), &valid_slots)?;
    let test_frame = packed(&test_nodes, &test_slots)?;
    if config.pseudo_label {
        counts.pseudo_labelled_pairs = pseudo_slots.len();
        let pseudo = packed(&test_nodes, &pseudo_slots)?;
        train_frame.append(pseudo)?;
    }

    counts.train_molecules = train_frame.len();
    counts.valid_molecules = valid_frame.len();
    counts.test_molecules = test_frame.len();
    counts.train_pairs = train_frame.total_couplings();
    counts.valid_pairs = valid_frame.total_couplings();
    counts.test_pairs = test_frame.total_couplings();
    counts.pack_warnings = warnings.len();
    info!(
        "fold {}: {} train / {} valid / {} test molecules, {} pseudo-labelled pairs",
        config.fold,
        counts.train_molecules,
        counts.valid_molecules,
        counts.test_molecules,
        counts.pseudo_labelled_pairs
    );
    Ok(PreparedFold {
        map,
        train: train_frame,
        valid: valid_frame,
        test: test_frame,
        counts,
        warnings,
    })
}

/// Runs `config.fold` end to end with `model` and writes the prediction
/// tables and the run manifest into `config.output.directory`.
pub fn run_fold(
    config: &RunConfig,
    inputs: &FoldInputs,
    model: &mut dyn CouplingModel,
) -> Result<FoldReport, SccError> {
    if model.num_output() != config.num_output {
        return Err(SccError::Config(
            ErrorInfo::new("model-num-output", "model output count differs from the configuration")
                .with_context("model", model.num_output())
                .with_context("config", config.num_output),
        ));
    }
    let prepared = prepare_fold(config, inputs)?;

    for epoch in 0..config.epochs {
        let mut assembler = BatchAssembler::new(&prepared.train, config.batch_size)?;
        if config.seed.shuffle {
            assembler = assembler.shuffled(config.seed.master_seed, u64::from(epoch));
        }
        for batch in assembler.batches() {
            model.fit_batch(epoch, &batch)?;
        }
        info!("epoch {epoch}: {} batches", assembler.num_batches());
    }

    let valid_outputs = collect_predictions(&*model, &prepared.valid, config.batch_size)?;
    let valid_rows = reconstruct(
        &prepared.valid,
        &valid_outputs,
        config.num_output,
        &prepared.map,
        config.target,
    )?;
    let lmae = LmaeReport::from_predictions(&valid_rows)?;
    info!("fold {} validation: {}", config.fold, lmae.summary_line());

    let test_outputs = collect_predictions(&*model, &prepared.test, config.batch_size)?;
    let test_rows = reconstruct(
        &prepared.test,
        &test_outputs,
        config.num_output,
        &prepared.map,
        config.target,
    )?;

    let out_dir = &config.output.directory;
    fs::create_dir_all(out_dir).map_err(|err| SccError::io("output-mkdir", out_dir, err))?;
    let names = OutputNames::now(
        &config.output.clock_format,
        &config.loss,
        lmae.mean_log_mae,
        config.fold,
    );
    let cv_path = write_cv(&out_dir.join(names.cv_file()), &valid_rows)?;
    let sub_path = write_sub(&out_dir.join(names.sub_file()), &test_rows, config.num_output)?;

    let provenance = RunProvenance {
        config_hash: stable_hash_string(config)?,
        fold: Some(config.fold),
        seed: config.seed.master_seed,
        created_at: Utc::now().to_rfc3339(),
        tool_versions: [("scc-run".to_string(), env!("CARGO_PKG_VERSION").to_string())]
            .into_iter()
            .collect(),
    };
    if let Some(dir) = &config.output.mapping_dir {
        save_map(&prepared.map, &out_dir.join(dir), &provenance)?;
    }

    let manifest = RunManifest {
        schema_version: RUN_MANIFEST_SCHEMA,
        config: config.clone(),
        provenance,
        model: model.name().to_string(),
        counts: prepared.counts.clone(),
        lmae: lmae.clone(),
        outputs: RunOutputs {
            cv: PathBuf::from(names.cv_file()),
            sub: PathBuf::from(names.sub_file()),
            mapping_dir: config.output.mapping_dir.clone(),
        },
    };
    let manifest_path = out_dir.join(names.manifest_file());
    manifest.write(&manifest_path)?;
    info!("fold {} done, manifest at {}", config.fold, manifest_path.display());

    Ok(FoldReport {
        lmae,
        counts: prepared.counts,
        cv_path,
        sub_path,
        manifest_path,
    })
}
