
use std::fs;
use std::io::Read;

use fixtures::{edges, layout, nodes, slot};
use scc_core::{CouplingType, SccError, COUPLING_FIELDS};
use scc_pack::{
    export_frame_csv, load_frame, open_table, pack, read_coupling_table, read_feature_table,
    save_frame, PackLayout,
};
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

/// Field-for-field image of the bincode frame encoding.
#[derive(Serialize, Deserialize)]
struct RawFrame {
    layout: PackLayout,
    molecules: Vec<String>,
    num_nodes: Vec<usize>,
    num_edges: Vec<usize>,
    num_coupling: Vec<usize>,
    nodes: Vec<f32>,
    edges: Vec<f32>,
    coupling: Vec<f64>,
}

/// Saves a one-molecule frame, rewrites it through `tamper` and loads it back.
fn load_tampered(tamper: impl FnOnce(&mut RawFrame)) -> Result<(), SccError> {
    let frame = pack(
        &nodes(&["a"]),
        &edges(&["a"]),
        &[slot("a", 1, 0, CouplingType::J1HC, 4)],
        &layout(),
    )
    .expect("pack")
    .frame;
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("frame.bin");
    save_frame(&frame, &path).expect("save");
    let mut raw: RawFrame = bincode::deserialize(&fs::read(&path).expect("read")).expect("raw");
    tamper(&mut raw);
    fs::write(&path, bincode::serialize(&raw).expect("encode")).expect("write");
    load_frame(&path).map(|_| ())
}

fn shape_code(result: Result<(), SccError>) -> String {
    match result {
        Err(SccError::ShapeMismatch(info)) => info.code,
        other => panic!("expected a shape mismatch, got {other:?}"),
    }
}

#[test]
fn frame_survives_save_and_load() {
    let slots = vec![
        slot("a", 1, 0, CouplingType::J1HC, 4),
        slot("b", 2, 1, CouplingType::J3HH, 5),
    ];
    let frame = pack(&nodes(&["a", "b"]), &edges(&["a", "b"]), &slots, &layout())
        .expect("pack")
        .frame;
    let dir = tempdir().expect("tempdir");
    for name in ["frame.bin", "frame.bin.gz"] {
        let path = dir.path().join(name);
        save_frame(&frame, &path).expect("save");
        let restored = load_frame(&path).expect("load");
        assert_eq!(restored, frame);
    }
}

#[test]
fn corrupt_frame_is_a_serde_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("broken.bin");
    fs::write(&path, [1u8, 2, 3]).expect("write");
    assert!(matches!(load_frame(&path), Err(SccError::Serde(_))));
}

#[test]
fn untouched_frame_passes_validation() {
    assert!(load_tampered(|_| {}).is_ok());
}

#[test]
fn counts_beyond_the_layout_are_rejected_on_load() {
    assert_eq!(
        shape_code(load_tampered(|raw| raw.num_nodes[0] = 200)),
        "frame-node-count"
    );
    assert_eq!(
        shape_code(load_tampered(|raw| raw.num_edges[0] = raw.layout.edge.max_items + 1)),
        "frame-edge-count"
    );
    assert_eq!(
        shape_code(load_tampered(|raw| raw.num_coupling[0] = 500)),
        "frame-coupling-count"
    );
}

#[test]
fn dirty_padding_and_short_blocks_are_rejected_on_load() {
    assert_eq!(
        shape_code(load_tampered(|raw| raw.coupling[COUPLING_FIELDS + 3] = 1.0)),
        "frame-padding"
    );
    assert_eq!(
        shape_code(load_tampered(|raw| {
            raw.nodes.pop();
        })),
        "frame-block-length"
    );
    assert_eq!(
        shape_code(load_tampered(|raw| raw.num_edges.push(0))),
        "frame-column-length"
    );
}

#[test]
fn gzip_tables_read_like_plain_ones() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let csv = "molecule_name,num_nodes,node_0,node_1\nm1,1,0.5,1.5\n";
    let dir = tempdir().expect("tempdir");
    let plain = dir.path().join("nodes.csv");
    let gz = dir.path().join("nodes.csv.gz");
    fs::write(&plain, csv).expect("write");
    let mut encoder = GzEncoder::new(fs::File::create(&gz).expect("create"), Compression::fast());
    encoder.write_all(csv.as_bytes()).expect("gzip");
    encoder.finish().expect("finish");

    let a = read_feature_table(&plain, "node", "num_nodes").expect("plain");
    let b = read_feature_table(&gz, "node", "num_nodes").expect("gz");
    assert_eq!(a, b);
    assert_eq!(a.get("m1").expect("row").values, vec![0.5, 1.5]);
}

#[test]
fn missing_coupling_file_reports_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.csv");
    let err = read_coupling_table(&path, true).unwrap_err();
    assert!(matches!(err, SccError::Io(_)));
    assert!(err.info().context["path"].ends_with("absent.csv"));
}

#[test]
fn csv_export_writes_named_columns() {
    let frame = pack(
        &nodes(&["a"]),
        &edges(&["a"]),
        &[slot("a", 1, 0, CouplingType::J1HC, 4)],
        &layout(),
    )
    .expect("pack")
    .frame;
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("packed.csv.gz");
    export_frame_csv(&frame, &path).expect("export");

    let mut text = String::new();
    open_table(&path)
        .expect("open")
        .read_to_string(&mut text)
        .expect("read");
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().expect("header").split(',').collect();
    let row: Vec<&str> = lines.next().expect("row").split(',').collect();
    assert_eq!(header.len(), row.len());
    assert_eq!(&row[..5], &["a", "3", "2", "1", "21"]);
}
