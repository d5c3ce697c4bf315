use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_rststub")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn read(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join(name))
        .unwrap_or_else(|e| panic!("failed to read {name}: {e}"))
}

// -- stdin mode --

#[test]
fn stdin_mode_produces_stub() {
    let input = fs::read_to_string(fixture_path("rst/bge.logic.rst")).unwrap();
    let expected = fs::read_to_string(fixture_path("bge.logic.expected.pyi")).unwrap();

    let assert = cmd().write_stdin(input).assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(output, expected);
}

#[test]
fn stdin_mode_applies_patches() {
    let input = fs::read_to_string(fixture_path("rst/bge.logic.rst")).unwrap();

    cmd()
        .args(["--patches", &fixture_path("patches")])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("The current mouse, patched."))
        .stdout(predicate::str::contains(
            "keyboard: bge.types.SCA_PythonKeyboard = ...",
        ));
}

#[test]
fn stdin_mode_json() {
    let input = fs::read_to_string(fixture_path("rst/mathutils.rst")).unwrap();

    let assert = cmd()
        .args(["-f", "json"])
        .write_stdin(input)
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["name"], "mathutils");
    assert_eq!(value["members"][0]["kind"], "class");
    assert_eq!(value["members"][0]["name"], "Vector");
}

#[test]
fn stdin_without_module_fails() {
    cmd()
        .write_stdin(".. data:: orphan\n\n   :type: int\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing module element in <stdin>"));
}

#[test]
fn stdin_diagnostics_go_to_stderr() {
    cmd()
        .write_stdin(".. module:: m\n\n.. data:: x\n\n   :type: nothing we know\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("x: typing.Any = ..."))
        .stderr(predicate::str::contains("nothing we know"));
}

// -- file mode --

#[test]
fn file_mode_writes_package_layout() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(fixture_path("rst"))
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["--patches", &fixture_path("patches")])
        .args(["-j", "2"])
        .assert()
        .success();

    for name in [
        "bge/__init__.pyi",
        "bge/logic.pyi",
        "bge/types.pyi",
        "bge/py.typed",
        "mathutils/__init__.pyi",
        "mathutils/geometry.pyi",
        "mathutils/py.typed",
    ] {
        assert!(dir.path().join(name).is_file(), "missing {name}");
    }
    // Blacklisted in the patch directory.
    assert!(!dir.path().join("aud").exists());
}

#[test]
fn file_mode_links_submodules() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(fixture_path("rst"))
        .args(["-o", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let bge = read(&dir, "bge/__init__.pyi");
    assert!(bge.contains("from . import logic"));
    assert!(bge.contains("from . import types"));

    let mathutils = read(&dir, "mathutils/__init__.pyi");
    assert!(mathutils.contains("from . import geometry"));
    assert!(mathutils.contains("def __init__(self, seq: typing.Sequence[float]) -> None:"));
    assert!(mathutils.contains("def dot(self, other: Vector) -> float:"));

    let geometry = read(&dir, "mathutils/geometry.pyi");
    assert!(geometry.contains("import mathutils\n"));
    assert!(geometry.contains("-> mathutils.Vector:"));
}

#[test]
fn file_mode_merges_class_units() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(fixture_path("rst"))
        .args(["-o", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let types = read(&dir, "bge/types.pyi");
    let base = types.find("class SCA_IObject:").expect("base class");
    let derived = types
        .find("class KX_GameObject(SCA_IObject):")
        .expect("derived class");
    assert!(base < derived);
    assert!(types.contains("import mathutils\n"));
    assert!(types.contains("worldPosition: mathutils.Vector = ..."));
    assert!(types.contains("def getDistanceTo(self, other: KX_GameObject) -> float:"));
    assert!(!types.contains("import bge\n"));

    // The module's own declaration and the class unit become one class.
    assert_eq!(types.matches("class KX_GameObject").count(), 1);
    assert!(types.contains("def endObject(self) -> None:"));
    assert!(types.contains("All game objects are derived from this class."));
}

#[test]
fn file_mode_json() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(fixture_path("rst"))
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["-f", "json"])
        .assert()
        .success();

    let logic: serde_json::Value = serde_json::from_str(&read(&dir, "bge/logic.json")).unwrap();
    assert_eq!(logic["name"], "bge.logic");
}

#[test]
fn file_mode_pattern_limits_sources() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(fixture_path("rst"))
        .args(["-o", dir.path().to_str().unwrap()])
        .args(["--pattern", "mathutils*.rst"])
        .assert()
        .success();

    assert!(dir.path().join("mathutils/__init__.pyi").is_file());
    assert!(!dir.path().join("bge").exists());
}

#[test]
fn file_mode_reports_failed_units() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg(fixture_path("broken"))
        .args(["-o", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing module element"))
        .stderr(predicate::str::contains("1 of 3 units failed"));

    // The rest of the batch still ran.
    assert!(dir.path().join("bge/logic.pyi").is_file());
}

#[test]
fn file_mode_requires_output() {
    cmd()
        .arg(fixture_path("rst"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output is required"));
}

#[test]
fn unknown_format_fails() {
    cmd()
        .args(["-f", "yaml"])
        .write_stdin(".. module:: m\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format: yaml"));
}
