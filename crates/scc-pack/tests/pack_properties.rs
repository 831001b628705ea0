
use std::collections::BTreeMap;

use fixtures::{edges, layout, nodes, slot};
use proptest::prelude::*;
use scc_core::{CouplingSlot, CouplingType, COUPLING_MAX, COUPLING_WIDTH};
use scc_pack::{pack, BatchAssembler};

const MOLECULES: [&str; 4] = ["m0", "m1", "m2", "m3"];

fn slots_strategy() -> impl Strategy<Value = Vec<CouplingSlot>> {
    prop::collection::vec((0usize..MOLECULES.len(), 0u32..29, 0u32..29, 0usize..8), 0..120).prop_map(
        |raw| {
            raw.into_iter()
                .enumerate()
                .map(|(id, (mol, a0, a1, ty))| {
                    let ty = CouplingType::ALL[ty];
                    slot(MOLECULES[mol], a0, a1, ty, id as u64)
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn unpack_recovers_each_molecule_sorted_by_pair(slots in slots_strategy()) {
        let frame = pack(&nodes(&MOLECULES), &edges(&MOLECULES), &slots, &layout())
            .expect("pack")
            .frame;
        let mut expected: BTreeMap<&str, Vec<&CouplingSlot>> = BTreeMap::new();
        for s in &slots {
            expected.entry(s.record.molecule_name.as_str()).or_default().push(s);
        }
        for (row, name) in frame.molecules().iter().enumerate() {
            let mut want: Vec<CouplingSlot> = expected
                .get(name.as_str())
                .map(|v| v.iter().map(|s| (*s).clone()).collect())
                .unwrap_or_default();
            want.sort_by_key(|s| s.record.pair_key());
            let got = frame.unpack(row).expect("unpack");
            prop_assert_eq!(frame.num_coupling(row), want.len());
            prop_assert_eq!(got, want);
        }
    }

    #[test]
    fn coupling_block_is_fixed_width_and_zero_padded(slots in slots_strategy()) {
        let frame = pack(&nodes(&MOLECULES), &edges(&MOLECULES), &slots, &layout())
            .expect("pack")
            .frame;
        for row in 0..frame.len() {
            let block = frame.coupling_row(row);
            prop_assert_eq!(block.len(), COUPLING_WIDTH);
            prop_assert!(frame.num_coupling(row) <= COUPLING_MAX);
            prop_assert!(block[frame.coupling_dim(row)..].iter().all(|v| *v == 0.0));
        }
        prop_assert!(frame.validate().is_ok());
    }

    #[test]
    fn batches_cover_every_row_once(
        rows in 0usize..40,
        batch_size in 1usize..9,
        seed in any::<u64>(),
        shuffle in any::<bool>(),
    ) {
        let names: Vec<String> = (0..rows).map(|i| format!("mol_{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let frame = pack(&nodes(&refs), &edges(&refs), &[], &layout()).expect("pack").frame;
        let mut assembler = BatchAssembler::new(&frame, batch_size).expect("assembler");
        if shuffle {
            assembler = assembler.shuffled(seed, 3);
        }
        let batches: Vec<_> = assembler.batches().collect();
        prop_assert_eq!(batches.len(), assembler.num_batches());
        let mut seen = vec![0usize; rows];
        for (i, batch) in batches.iter().enumerate() {
            prop_assert_eq!(batch.index(), i);
            if i + 1 < batches.len() {
                prop_assert_eq!(batch.len(), batch_size);
            } else {
                prop_assert!(batch.len() >= 1 && batch.len() <= batch_size);
            }
            for &row in batch.rows() {
                seen[row] += 1;
            }
        }
        prop_assert!(seen.iter().all(|count| *count == 1));
    }
}
