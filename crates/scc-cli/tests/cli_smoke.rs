use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::tempdir;

const COUPLING_HEADER: &str = "id,molecule_name,atom_index_0,atom_index_1,type,\
scalar_coupling_constant,fc,sd,pso,dso,path_index_0,path_index_1,path_index_2,path_index_3,\
path_btype_0,path_btype_1,path_btype_2,path_a_num_0,path_a_num_1,path_a_num_2,path_a_num_3";

fn write_inputs(root: &Path) -> std::path::PathBuf {
    let mut train = format!("{COUPLING_HEADER}\n");
    for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
        let value = 80.0 + i as f64;
        train.push_str(&format!(
            "{i},{name},1,0,1JHC,{value},{value},0,0,0,1,0,,,1,,,1,6,,\n"
        ));
    }
    fs::write(root.join("train.csv"), train).unwrap();
    fs::write(
        root.join("test.csv"),
        format!("{COUPLING_HEADER}\n10,t,1,0,1JHC,0,0,0,0,0,1,0,,,1,,,1,6,,\n"),
    )
    .unwrap();
    let mut nodes = String::from("molecule_name,num_nodes,node_0,node_1\n");
    let mut edges = String::from("molecule_name,num_edge,edge_0\n");
    for name in ["a", "b", "c", "d", "t", "u"] {
        nodes.push_str(&format!("{name},2,1,6\n"));
        edges.push_str(&format!("{name},1,1\n"));
    }
    fs::write(root.join("nodes.csv"), nodes).unwrap();
    fs::write(root.join("edges.csv"), edges).unwrap();
    fs::write(
        root.join("folds.csv"),
        "molecule_name,fold\na,0\nb,1\nc,1\nd,0\n",
    )
    .unwrap();

    let config = root.join("run.yaml");
    fs::write(
        &config,
        format!(
            "data:
  train_couplings: {root}/train.csv
  test_couplings: {root}/test.csv
  nodes: {root}/nodes.csv
  edges: {root}/edges.csv
  folds: {root}/folds.csv
num_folds: 2
layout:
  max_nodes: 2
  node_stride: 1
  max_edges: 1
  edge_stride: 1
output:
  directory: {root}/out
",
            root = root.display()
        ),
    )
    .unwrap();
    config
}

fn scc(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_scc"))
        .args(args)
        .output()
        .expect("run scc");
    assert!(
        output.status.success(),
        "scc {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf8")
}

#[test]
fn run_fold_writes_predictions() {
    let dir = tempdir().expect("tempdir");
    let config = write_inputs(dir.path());
    let stdout = scc(&["run-fold", "--config", config.to_str().unwrap(), "--fold", "1"]);
    assert!(stdout.contains("mean"));
    let written: Vec<String> = fs::read_dir(dir.path().join("out"))
        .expect("out dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert!(written.iter().any(|name| name.starts_with("cv_") && name.ends_with("_fold_1.csv.gz")));
    assert!(written.iter().any(|name| name.starts_with("sub_")));
    assert!(written.contains(&"run_manifest_fold_1.json".to_string()));
}

#[test]
fn fit_rank_then_inspect_mapping() {
    let dir = tempdir().expect("tempdir");
    let config = write_inputs(dir.path());
    let maps = dir.path().join("maps");
    scc(&[
        "fit-rank",
        "--config",
        config.to_str().unwrap(),
        "--out",
        maps.to_str().unwrap(),
    ]);
    let body = scc(&["inspect", "--mapping", maps.to_str().unwrap()]);
    let value: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(value["fold"], 0);
    assert_eq!(value["types"][0]["coupling_type"], "1JHC");
    assert_eq!(value["types"][0]["observations"], 2);
}

#[test]
fn pack_then_inspect_frame() {
    let dir = tempdir().expect("tempdir");
    let config = write_inputs(dir.path());
    let frame = dir.path().join("test.bin.gz");
    scc(&[
        "pack",
        "--config",
        config.to_str().unwrap(),
        "--split",
        "test",
        "--out",
        frame.to_str().unwrap(),
    ]);
    let body = scc(&["inspect", "--frame", frame.to_str().unwrap()]);
    let value: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(value["molecules"], 2);
    assert_eq!(value["couplings"], 1);
    assert_eq!(value["empty_molecules"], 1);
}
