use std::collections::BTreeMap;

use proptest::prelude::*;
use scc_core::{
    Contributions, CouplingRecord, CouplingSlot, CouplingType, PairId, PathDescriptor, SccError,
    COUPLING_MAX,
};
use scc_pack::{pack, BatchAssembler, FeatureLayout, FeatureRow, FeatureTable, PackLayout, PackedFrame};
use scc_rank::GaussRankMap;
use scc_run::{
    collect_predictions, reconstruct, IdentityModel, PredictionCollector, TargetScaling,
};

fn layout() -> PackLayout {
    PackLayout::new(FeatureLayout::new(2, 1), FeatureLayout::new(1, 1))
}

fn table(prefix: &str, width: usize, names: &[String]) -> FeatureTable {
    let mut table = FeatureTable::new(prefix, width);
    for name in names {
        table
            .push(FeatureRow {
                molecule_name: name.clone(),
                count: 1,
                values: vec![1.0; width],
            })
            .expect("row");
    }
    table
}

fn record(molecule: &str, id: u64, ty: CouplingType, value: f64) -> CouplingRecord {
    CouplingRecord {
        molecule_name: molecule.to_string(),
        atom_index_0: (id % 29) as u32,
        atom_index_1: 0,
        coupling_type: ty,
        scalar_coupling_constant: value,
        contributions: Contributions::from_array([value, 0.5, -0.5, 0.25]),
        path: PathDescriptor::default(),
        id: PairId::from_raw(id),
    }
}

fn packed(records: &[CouplingRecord], molecules: &[String], map: &GaussRankMap) -> PackedFrame {
    let slots = map.score_records(records).expect("score");
    pack(
        &table("node", 2, molecules),
        &table("edge", 1, molecules),
        &slots,
        &layout(),
    )
    .expect("pack")
    .frame
}

proptest! {
    #[test]
    fn every_id_reappears_exactly_once(
        raw in prop::collection::vec((0usize..6, 0usize..8, -50.0f64..150.0), 1..120),
        batch_size in 1usize..5,
    ) {
        let molecules: Vec<String> = (0..6).map(|i| format!("mol_{i}")).collect();
        let records: Vec<CouplingRecord> = raw
            .iter()
            .enumerate()
            .map(|(id, (mol, ty, value))| {
                record(&molecules[*mol], id as u64 * 3 + 1, CouplingType::ALL[*ty], *value)
            })
            .collect();
        let map = GaussRankMap::fit(&records, 0).expect("fit");
        let frame = packed(&records, &molecules, &map);

        let model = IdentityModel::new(1, TargetScaling::Gaussrank);
        let outputs = collect_predictions(&model, &frame, batch_size).expect("predict");
        let rows = reconstruct(&frame, &outputs, 1, &map, TargetScaling::Gaussrank).expect("rows");

        prop_assert_eq!(rows.len(), records.len());
        let by_id: BTreeMap<PairId, &CouplingRecord> = records.iter().map(|r| (r.id, r)).collect();
        for pair in rows.windows(2) {
            prop_assert!(pair[0].id < pair[1].id);
        }
        for row in &rows {
            let original = by_id[&row.id];
            prop_assert_eq!(&row.molecule_name, &original.molecule_name);
            prop_assert_eq!(row.coupling_type, original.coupling_type);
            prop_assert_eq!(row.scalar_coupling_constant, original.scalar_coupling_constant);
        }
    }
}

#[test]
fn five_outputs_carry_contributions() {
    let molecules = vec!["a".to_string()];
    let records = vec![
        record("a", 7, CouplingType::J1HC, 90.0),
        record("a", 8, CouplingType::J1HC, 95.0),
    ];
    let map = GaussRankMap::fit(&records, 2).expect("fit");
    let frame = packed(&records, &molecules, &map);
    let model = IdentityModel::new(5, TargetScaling::Raw);
    let outputs = collect_predictions(&model, &frame, 8).expect("predict");
    assert_eq!(outputs.len(), COUPLING_MAX * 5);
    let rows = reconstruct(&frame, &outputs, 5, &map, TargetScaling::Raw).expect("rows");
    assert_eq!(rows[0].scalar_coupling_constant, 90.0);
    assert_eq!(
        rows[1].contributions,
        Some(Contributions::from_array([95.0, 0.5, -0.5, 0.25]))
    );
}

#[test]
fn padded_slots_are_ignored() {
    let molecules = vec!["a".to_string(), "b".to_string()];
    let records = vec![record("a", 1, CouplingType::J2HH, 1.0), record("a", 2, CouplingType::J2HH, 2.0)];
    let map = GaussRankMap::fit(&records, 0).expect("fit");
    let frame = packed(&records, &molecules, &map);
    let mut outputs = collect_predictions(&IdentityModel::new(1, TargetScaling::Gaussrank), &frame, 1)
        .expect("predict");
    for value in &mut outputs[2..COUPLING_MAX] {
        *value = 1e6;
    }
    for value in &mut outputs[COUPLING_MAX..] {
        *value = -1e6;
    }
    let rows = reconstruct(&frame, &outputs, 1, &map, TargetScaling::Gaussrank).expect("rows");
    let values: Vec<f64> = rows.iter().map(|r| r.scalar_coupling_constant).collect();
    assert_eq!(values, vec![1.0, 2.0]);
}

#[test]
fn duplicate_id_across_molecules_is_a_schema_error() {
    let molecules = vec!["a".to_string(), "b".to_string()];
    let records = vec![record("a", 5, CouplingType::J1HN, 40.0), record("b", 5, CouplingType::J1HN, 45.0)];
    let map = GaussRankMap::fit(&records, 0).expect("fit");
    let frame = packed(&records, &molecules, &map);
    let outputs = collect_predictions(&IdentityModel::new(1, TargetScaling::Raw), &frame, 2)
        .expect("predict");
    let err = reconstruct(&frame, &outputs, 1, &map, TargetScaling::Raw).unwrap_err();
    assert!(matches!(err, SccError::Schema(_)));
    assert_eq!(err.info().context["id"], "5");
}

#[test]
fn types_missing_from_the_map_fail_on_inverse() {
    let molecules = vec!["a".to_string()];
    let fitted = vec![record("a", 1, CouplingType::J1HC, 80.0)];
    let map = GaussRankMap::fit(&fitted, 1).expect("fit");
    let other = vec![CouplingSlot::unscored(record("a", 2, CouplingType::J3HN, 1.0))];
    let frame = pack(
        &table("node", 2, &molecules),
        &table("edge", 1, &molecules),
        &other,
        &layout(),
    )
    .expect("pack")
    .frame;
    let outputs = vec![0.0; COUPLING_MAX];
    let err = reconstruct(&frame, &outputs, 1, &map, TargetScaling::Gaussrank).unwrap_err();
    assert!(matches!(err, SccError::UnmappedType(_)));
}

#[test]
fn collector_checks_widths_and_coverage() {
    let molecules = vec!["a".to_string(), "b".to_string()];
    let records = vec![record("a", 1, CouplingType::J1HC, 80.0)];
    let map = GaussRankMap::fit(&records, 0).expect("fit");
    let frame = packed(&records, &molecules, &map);
    let assembler = BatchAssembler::new(&frame, 1).expect("assembler");
    let first = assembler.batches().next().expect("batch");

    let mut collector = PredictionCollector::new(&frame, 1).expect("collector");
    let err = collector.record(&first, &[0.0; 3]).unwrap_err();
    assert!(matches!(err, SccError::ShapeMismatch(_)));
    collector
        .record(&first, &vec![0.0; COUPLING_MAX])
        .expect("record");
    assert!(matches!(collector.finish(), Err(SccError::ShapeMismatch(_))));
    assert!(matches!(
        PredictionCollector::new(&frame, 2),
        Err(SccError::Config(_))
    ));
}

#[test]
fn non_finite_outputs_are_rejected_under_raw_scaling() {
    let molecules = vec!["a".to_string()];
    let records = vec![
        record("a", 1, CouplingType::J1HC, 80.0),
        record("a", 2, CouplingType::J1HC, 90.0),
    ];
    let map = GaussRankMap::fit(&records, 0).expect("fit");
    let frame = packed(&records, &molecules, &map);
    let assembler = BatchAssembler::new(&frame, 1).expect("assembler");
    let batch = assembler.batches().next().expect("batch");

    let mut outputs = vec![0.0; COUPLING_MAX];
    outputs[1] = f64::NAN;
    let mut collector = PredictionCollector::new(&frame, 1).expect("collector");
    let err = collector.record(&batch, &outputs).unwrap_err();
    assert_eq!(err.info().code, "model-output-non-finite");
    assert_eq!(err.info().context["slot"], "1");

    let mut padded = vec![0.0; COUPLING_MAX];
    padded[COUPLING_MAX - 1] = f64::INFINITY;
    let mut collector = PredictionCollector::new(&frame, 1).expect("collector");
    collector.record(&batch, &padded).expect("padding is not inspected");

    let err = reconstruct(&frame, &outputs, 1, &map, TargetScaling::Raw).unwrap_err();
    assert!(matches!(err, SccError::Schema(_)));
    assert_eq!(err.info().code, "reconstruct-non-finite");
}
