use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;

const MODEL: &str = r#"
type User {
    field id type=ID
    field posts type="[Post!]!"
    field comments type="[Comment]"
}
type Post {
    field title type=String
    field comments type="[Comment]"
}
type Comment {
    field body type=String
}
"#;

fn schemaviz(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("schemaviz"));
    cmd.current_dir(dir);
    cmd
}

fn write_model(dir: &Path) {
    fs::write(dir.join("model.kdl"), MODEL).expect("write model");
}

fn layout_json(dir: &Path, extra: &[&str]) -> Value {
    let output = schemaviz(dir)
        .arg("layout")
        .args(extra)
        .arg("model.kdl")
        .output()
        .expect("run schemaviz");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("layout json")
}

fn positions(report: &Value) -> Vec<(String, f64, f64)> {
    report["nodes"]
        .as_array()
        .expect("nodes array")
        .iter()
        .map(|n| {
            (
                n["id"].as_str().expect("id").to_string(),
                n["x"].as_f64().expect("x"),
                n["y"].as_f64().expect("y"),
            )
        })
        .collect()
}

#[test]
fn cli_renders_svg() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());

    schemaviz(tmp.path())
        .args(["render", "--no-cache", "--out", "out.svg", "model.kdl"])
        .assert()
        .success();

    let svg = fs::read_to_string(tmp.path().join("out.svg")).expect("read svg");
    assert!(svg.starts_with("<svg"));
    for name in ["User", "Post", "Comment"] {
        assert!(svg.contains(&format!(">{name}<")), "{name} missing");
    }
    assert!(svg.contains(r#"id="Post.comments""#));
    assert!(svg.contains("d=\"M "));
}

#[test]
fn cli_layout_pins_every_node_apart() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());

    let report = layout_json(tmp.path(), &["--no-cache"]);
    let nodes = positions(&report);
    assert_eq!(nodes.len(), 3);
    assert!(report["nodes"].as_array().unwrap().iter().all(|n| n["fixed"] == true));
    for (i, a) in nodes.iter().enumerate() {
        for b in &nodes[i + 1..] {
            assert!(a.1 != b.1 || a.2 != b.2, "{} and {} overlap", a.0, b.0);
        }
    }
    assert!(report["transform"]["k"].as_f64().unwrap() > 0.0);
    assert!(!tmp.path().join(".schemaviz-cache.json").exists());
}

#[test]
fn cli_reuses_cached_layout() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());

    let first = layout_json(tmp.path(), &["--cache", "positions.json"]);
    assert!(tmp.path().join("positions.json").exists());
    let second = layout_json(tmp.path(), &["--cache", "positions.json"]);

    let (first, second) = (positions(&first), positions(&second));
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.0, b.0);
        assert!((a.1 - b.1).abs() < 1e-6 && (a.2 - b.2).abs() < 1e-6, "{} moved", a.0);
    }
}

#[test]
fn cli_writes_default_cache_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());

    layout_json(tmp.path(), &[]);

    let cache = fs::read_to_string(tmp.path().join(".schemaviz-cache.json")).expect("read cache");
    let stored: Value = serde_json::from_str(&cache).expect("cache json");
    assert!(stored.is_object());
}

#[test]
fn cli_reads_model_from_stdin() {
    let tmp = tempfile::tempdir().expect("tempdir");

    let output = schemaviz(tmp.path())
        .args(["layout", "--no-cache", "-"])
        .write_stdin(MODEL)
        .output()
        .expect("run schemaviz");

    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("layout json");
    assert_eq!(positions(&report).len(), 3);
}

#[test]
fn cli_free_mode_simulates() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());

    let report = layout_json(tmp.path(), &["--free", "--no-cache", "--frames", "400"]);
    let nodes = report["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert!(nodes.iter().all(|n| n["fixed"] == false));
    assert!(positions(&report).iter().all(|(_, x, y)| x.is_finite() && y.is_finite()));
}

#[test]
fn cli_curve_links() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());
    fs::write(tmp.path().join("config.json"), r#"{"use_curve": true}"#).expect("write config");

    let output = schemaviz(tmp.path())
        .args(["render", "--no-cache", "--config", "config.json", "model.kdl"])
        .output()
        .expect("run schemaviz");

    assert!(output.status.success());
    let svg = String::from_utf8(output.stdout).expect("utf8");
    assert!(svg.contains(" Q "));
}

#[test]
fn cli_rejects_invalid_model() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(tmp.path().join("broken.kdl"), "type User {").expect("write model");

    let output = schemaviz(tmp.path())
        .args(["render", "--no-cache", "broken.kdl"])
        .output()
        .expect("run schemaviz");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse broken.kdl"));
}

#[test]
fn cli_rejects_empty_model() {
    let tmp = tempfile::tempdir().expect("tempdir");
    fs::write(tmp.path().join("empty.kdl"), "// nothing here\n").expect("write model");

    let output = schemaviz(tmp.path())
        .args(["layout", "--no-cache", "empty.kdl"])
        .output()
        .expect("run schemaviz");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("declares no types"));
}

#[test]
fn cli_rejects_inverted_zoom_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    write_model(tmp.path());
    fs::write(tmp.path().join("config.json"), r#"{"min_zoom": 5}"#).expect("write config");

    let output = schemaviz(tmp.path())
        .args(["layout", "--no-cache", "--config", "config.json", "model.kdl"])
        .output()
        .expect("run schemaviz");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("min_zoom 5 is above max_zoom 3"));
}
