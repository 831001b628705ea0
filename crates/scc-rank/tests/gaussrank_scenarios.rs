use scc_core::{
    Contributions, CouplingRecord, CouplingType, PairId, PathDescriptor, SccError,
};
use scc_rank::{normal_quantile, GaussRankMap};

fn record(id: u64, coupling_type: CouplingType, value: f64) -> CouplingRecord {
    CouplingRecord {
        molecule_name: format!("mol_{}", id / 4),
        atom_index_0: 1,
        atom_index_1: 0,
        coupling_type,
        scalar_coupling_constant: value,
        contributions: Contributions::default(),
        path: PathDescriptor::default(),
        id: PairId::from_raw(id),
    }
}

#[test]
fn median_of_five_values_maps_to_zero_and_back() {
    let records: Vec<_> = [1.0, 2.0, 3.0, 4.0, 5.0]
        .iter()
        .enumerate()
        .map(|(idx, v)| record(idx as u64, CouplingType::J1HC, *v))
        .collect();
    let map = GaussRankMap::fit(&records, 0).unwrap();

    let score = map.forward(3.0, CouplingType::J1HC).unwrap();
    assert_eq!(score, normal_quantile(3.0 / 6.0));
    assert!(score.abs() < 1e-12);
    assert_eq!(map.inverse(score, CouplingType::J1HC).unwrap(), 3.0);

    let low = map.forward(1.0, CouplingType::J1HC).unwrap();
    assert!((low - normal_quantile(1.0 / 6.0)).abs() < 1e-15);
}

#[test]
fn each_type_gets_an_independent_table() {
    let mut records = Vec::new();
    for i in 0..10 {
        records.push(record(i, CouplingType::J1HC, 80.0 + i as f64));
        records.push(record(100 + i, CouplingType::J3HH, -2.0 + 0.5 * i as f64));
    }
    let map = GaussRankMap::fit(&records, 3).unwrap();
    assert_eq!(
        map.types().collect::<Vec<_>>(),
        vec![CouplingType::J1HC, CouplingType::J3HH]
    );
    // the same rank inside each type yields the same score
    let a = map.forward(84.0, CouplingType::J1HC).unwrap();
    let b = map.forward(0.0, CouplingType::J3HH).unwrap();
    assert_eq!(a, b);
}

#[test]
fn unfitted_type_fails_instead_of_borrowing_a_table() {
    let records = vec![record(0, CouplingType::J2HC, 1.0), record(1, CouplingType::J2HC, 2.0)];
    let map = GaussRankMap::fit(&records, 4).unwrap();
    let err = map.forward(1.5, CouplingType::J2HN).unwrap_err();
    match &err {
        SccError::UnmappedType(info) => {
            assert_eq!(info.context["fold"], "4");
            assert_eq!(info.context["coupling_type"], "2JHN");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(matches!(
        map.inverse(0.0, CouplingType::J2HN),
        Err(SccError::UnmappedType(_))
    ));
}

#[test]
fn score_records_fills_gaussrank_slot() {
    let records = vec![
        record(0, CouplingType::J2HH, -10.0),
        record(1, CouplingType::J2HH, -5.0),
        record(2, CouplingType::J2HH, 0.0),
    ];
    let map = GaussRankMap::fit(&records, 0).unwrap();
    let slots = map.score_records(&records).unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[1].gaussrank, 0.0);
    assert!(slots[0].gaussrank < slots[1].gaussrank);
    assert!(slots[1].gaussrank < slots[2].gaussrank);
    assert_eq!(slots[2].record, records[2]);
}

#[test]
fn non_finite_target_reports_fold() {
    let records = vec![record(0, CouplingType::J1HN, f64::NAN)];
    let err = GaussRankMap::fit(&records, 2).unwrap_err();
    assert!(matches!(err, SccError::Schema(_)));
    assert_eq!(err.info().context["fold"], "2");
}
