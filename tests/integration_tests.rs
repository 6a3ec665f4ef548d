use plotxml::document::{PLOT_OPTION, SaveMode};
use plotxml::{coerce, copy_options, table, Invocation, Pipeline, PlotDocument, Scalar, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ISING: &str = "\
# L T sweep energy mag
L T sweep energy mag
16 2.27 0 -1.20 0.91
16 2.27 1 -1.35 0.88
16 2.27 2 -1.41 0.86
16 2.27 3 -1.44 0.85
";

/// Helper function to run plotxml with arguments, returning stdout
fn run_plotxml(args: &[&str]) -> Result<String, String> {
    let output = Command::new(env!("CARGO_BIN_EXE_plotxml"))
        .args(args)
        .output()
        .map_err(|e| format!("Failed to spawn process: {}", e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).to_string())
    }
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn write_table(dir: &Path) -> PathBuf {
    let src = dir.join("ising.txt");
    fs::write(&src, ISING).unwrap();
    src
}

fn converted(dir: &TempDir) -> PathBuf {
    let src = write_table(dir.path());
    table::convert_file(&src, dir.path(), &Settings::default()).unwrap()
}

fn arg(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_convert_partitions_columns() {
    let dir = TempDir::new().unwrap();
    let src = write_table(dir.path());
    let out = dir.path().join("xml");

    run_plotxml(&["convert", arg(&src), "--dest", arg(&out)]).unwrap();

    let doc = PlotDocument::open(&out.join("ising.xml")).unwrap();
    assert_eq!(doc.labels(), &["L", "T", "sweep", "energy", "mag"]);
    assert_eq!(doc.parameters()["L"], Scalar::Int(16));
    assert_eq!(doc.parameters()["T"], Scalar::Float(2.27));
    assert_eq!(doc.rows().len(), 4);
    assert_eq!(doc.rows()[1], vec![Scalar::Int(1), Scalar::Float(-1.35), Scalar::Float(0.88)]);
}

#[test]
fn test_converted_document_layout() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);
    let text = fs::read_to_string(path).unwrap();
    assert!(text.starts_with("<?xml version='1.0' encoding='utf-8'?>\n<plot>\n"));
    assert!(text.contains("    <parameter L=\"16\" T=\"2.27\"/>\n"));
    assert!(text.contains("    <label>L T sweep energy mag</label>\n"));
    assert!(text.contains("        <d>0 -1.2 0.91</d>\n"));
}

#[test]
fn test_show_config_prints_merged_options() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);
    let before = fs::read_to_string(&path).unwrap();

    let stdout = run_plotxml(&[
        "plot",
        arg(&path),
        "-s",
        "x=sweep",
        "-s",
        "y=[energy, mag]",
        "-s",
        "legend_loc=upper left",
        "--show-config",
    ])
    .unwrap();

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    // values as merged, before labels and locations are translated
    assert_eq!(json["x"], serde_json::json!("sweep"));
    assert_eq!(json["y"], serde_json::json!(["energy", "mag"]));
    assert_eq!(json["legend_loc"], serde_json::json!("upper left"));
    assert_eq!(json["style"], serde_json::json!(["r^-", "b^-", "g^-", "y^-"]));
    // transient defaults are filled in
    assert_eq!(json["fontsize"], serde_json::json!(12));
    assert_eq!(json["linreg"], serde_json::json!("none"));
    // resolving alone leaves the document untouched
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_plot_renders_and_persists_options() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);

    run_plotxml(&[
        "plot",
        arg(&path),
        "-s",
        "x=sweep",
        "-s",
        "y=energy",
        "-s",
        "title=L={L}",
        "-s",
        "o=plots/L{L}.png",
    ])
    .unwrap();

    let png = fs::read(dir.path().join("plots").join("L16.png")).unwrap();
    assert!(is_valid_png(&png), "Output is not a valid PNG");

    let doc = PlotDocument::open(&path).unwrap();
    let stored = doc.option_set(0).unwrap();
    assert_eq!(stored["x"], Scalar::Str("sweep".into()));
    assert_eq!(stored["o"], Scalar::Str("plots/L{L}.png".into()));
    assert!(!stored.contains_key("fontsize"));
}

fn converted_pair(dir: &TempDir) -> (PathBuf, PathBuf) {
    let first = converted(dir);
    let src = dir.path().join("ising_hot.txt");
    fs::write(&src, ISING.replace("2.27", "3.5")).unwrap();
    let second = table::convert_file(&src, dir.path(), &Settings::default()).unwrap();
    (first, second)
}

#[test]
fn test_plot_joins_documents() {
    let dir = TempDir::new().unwrap();
    let (first, second) = converted_pair(&dir);
    let second_before = fs::read_to_string(&second).unwrap();

    let stdout = run_plotxml(&[
        "plot",
        arg(&first),
        arg(&second),
        "-s",
        "x=00_sweep",
        "-s",
        "y=[00_energy, 01_energy]",
        "-s",
        "title=L={L} T={T}",
        "--show-config",
    ])
    .unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["y"], serde_json::json!(["00_energy", "01_energy"]));

    run_plotxml(&[
        "plot",
        arg(&first),
        arg(&second),
        "-s",
        "x=00_sweep",
        "-s",
        "y=[00_energy, 01_energy]",
        "-s",
        "o=joined.png",
    ])
    .unwrap();

    let png = fs::read(dir.path().join("joined.png")).unwrap();
    assert!(is_valid_png(&png), "Output is not a valid PNG");

    // joined plots save into option set 1 of the first document only
    let doc = PlotDocument::open(&first).unwrap();
    assert_eq!(doc.option_sets().len(), 2);
    assert!(doc.option_set(0).unwrap().is_empty());
    assert_eq!(doc.option_set(1).unwrap()["x"], Scalar::Str("00_sweep".into()));
    assert_eq!(fs::read_to_string(&second).unwrap(), second_before);
}

#[test]
fn test_plot_parallel_keeps_documents_apart() {
    let dir = TempDir::new().unwrap();
    let (first, second) = converted_pair(&dir);

    // labels stay unprefixed, so each document resolves them on its own
    run_plotxml(&[
        "plot",
        arg(&first),
        arg(&second),
        "--parallel",
        "-s",
        "x=sweep",
        "-s",
        "y=energy",
        "-s",
        "o=T{T}.png",
    ])
    .unwrap();

    assert!(is_valid_png(&fs::read(dir.path().join("T2.27.png")).unwrap()));
    assert!(is_valid_png(&fs::read(dir.path().join("T3.5.png")).unwrap()));
    for path in [&first, &second] {
        let doc = PlotDocument::open(path).unwrap();
        assert_eq!(doc.option_set(0).unwrap()["y"], Scalar::Str("energy".into()));
    }
}

#[test]
fn test_plot_joined_rejects_unprefixed_labels() {
    let dir = TempDir::new().unwrap();
    let (first, second) = converted_pair(&dir);
    let result = run_plotxml(&["plot", arg(&first), arg(&second), "-s", "y=energy"]);
    assert!(result.is_err());
}

#[test]
fn test_convert_rejects_duplicate_header() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("dup.txt");
    fs::write(&src, "a a\n1 2\n1 3\n").unwrap();
    let result = run_plotxml(&["convert", arg(&src)]);
    assert!(result.is_err());
    assert!(!dir.path().join("dup.xml").exists());
}

#[test]
fn test_malformed_document_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.xml");
    fs::write(&path, "<plot><label>a</plot>").unwrap();
    let result = run_plotxml(&["plot", arg(&path), "--show-config"]);
    assert!(result.is_err());
}

#[test]
fn test_labels_command() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);
    let stdout = run_plotxml(&["labels", arg(&path)]).unwrap();
    let lines: Vec<&str> = stdout.lines().map(str::trim).collect();
    assert_eq!(lines, vec!["0  L", "1  T", "2  sweep", "3  energy", "4  mag"]);
}

#[test]
fn test_export_command() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);
    let stdout = run_plotxml(&["export", arg(&path)]).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "L T sweep energy mag");
    assert_eq!(lines[1], "16 2.27 0 -1.2 0.91");
    assert_eq!(lines.len(), 5);
}

#[test]
fn test_cp_opt_command() {
    let dir = TempDir::new().unwrap();
    let from = converted(&dir);
    let other_dir = TempDir::new().unwrap();
    let to = converted(&other_dir);

    let mut doc = PlotDocument::open(&from).unwrap();
    let set = [("title".to_string(), coerce("copied"))].into_iter().collect();
    doc.save_options(&set, 0, SaveMode::Overwrite);
    doc.write("    ").unwrap();

    run_plotxml(&["cp-opt", arg(&from), arg(&to), "--osel", "1"]).unwrap();

    let target = PlotDocument::open(&to).unwrap();
    assert_eq!(target.option_sets().len(), 2);
    assert!(target.option_set(0).unwrap().is_empty());
    assert_eq!(target.option_set(1).unwrap()["title"], Scalar::Str("copied".into()));
}

#[test]
fn test_pipeline_round_trip_through_file() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);
    let pipeline = Pipeline::builtin().unwrap();

    let mut first = Invocation::default();
    first.overrides.insert("y".into(), coerce("[energy, mag]"));
    first.overrides.insert("ncol".into(), Scalar::Int(2));
    let mut doc = PlotDocument::open(&path).unwrap();
    pipeline.run(&mut doc, &first).unwrap();
    doc.write("    ").unwrap();

    // second invocation starts from the saved set and suppresses ncol
    let second = Invocation {
        flags: vec!["ncol".into()],
        ..Default::default()
    };
    let mut doc = PlotDocument::open(&path).unwrap();
    let res = pipeline.run(&mut doc, &second).unwrap();
    assert_eq!(res.config().get("y"), Some(&coerce("[3, 4]")));
    doc.write("    ").unwrap();

    let doc = PlotDocument::open(&path).unwrap();
    let stored = doc.option_set(0).unwrap();
    assert_eq!(stored["y"], coerce("[energy, mag]"));
    assert!(!stored.contains_key("ncol"));
    assert_eq!(doc.root().children_named(PLOT_OPTION).count(), 1);
}

#[test]
fn test_copy_options_missing_set() {
    let dir = TempDir::new().unwrap();
    let path = converted(&dir);
    let from = PlotDocument::open(&path).unwrap();
    let mut to = PlotDocument::open(&path).unwrap();
    assert!(copy_options(&from, 3, &mut to, 0).is_err());
}
