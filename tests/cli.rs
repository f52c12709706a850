// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn prints_the_golden_listing() {
    let expected = std::fs::read_to_string(fixture("iface.golden")).unwrap();
    cargo_bin_cmd!("rta")
        .arg(fixture("iface.json"))
        .env_remove("RTA_FLAGS")
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn writes_listing_and_dot_files() {
    let temp = tempdir().unwrap();
    let listing = temp.path().join("out.txt");
    let dot = temp.path().join("cg.dot");

    cargo_bin_cmd!("rta")
        .arg(fixture("func_values.json"))
        .arg("--output")
        .arg(&listing)
        .arg("--dump-call-graph")
        .arg(&dot)
        .arg("--dump-stats")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("#Reachable functions: 4"));

    let expected = std::fs::read_to_string(fixture("func_values.golden")).unwrap();
    assert_eq!(std::fs::read_to_string(&listing).unwrap(), expected);
    let dot = std::fs::read_to_string(&dot).unwrap();
    assert!(dot.contains("dynamic function call"));
    assert!(dot.contains("style = dashed"));
}

#[test]
fn entry_options_select_roots() {
    cargo_bin_cmd!("rta")
        .arg(fixture("recursion.json"))
        .args(["--entry-func", "orphan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reachable orphan\n"))
        .stdout(predicate::str::contains("edge orphan --static function call--> even\n"))
        .stdout(predicate::str::contains("!reachable main\n"));

    cargo_bin_cmd!("rta")
        .arg(fixture("recursion.json"))
        .args(["--entry-regex", "^(main|orphan)$", "--no-call-graph"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edge ").not())
        .stdout(predicate::str::contains("!reachable").not());
}

#[test]
fn flags_from_environment_are_overridden_by_arguments() {
    cargo_bin_cmd!("rta")
        .arg(fixture("recursion.json"))
        .env("RTA_FLAGS", r#"["--entry-func", "orphan"]"#)
        .args(["--entry-func", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("!reachable orphan\n"));
}

#[test]
fn unknown_entry_is_reported() {
    cargo_bin_cmd!("rta")
        .arg(fixture("recursion.json"))
        .args(["--entry-func", "missing"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("entry function `missing` not found"));
}

#[test]
fn malformed_program_names_the_offender() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"functions": [{"name": "main", "calls": [{"static": {"callee": "ghost"}}]}]}"#,
    )
    .unwrap();

    cargo_bin_cmd!("rta")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost"))
        .stderr(predicate::str::contains("main"));
}

#[test]
fn missing_input_fails() {
    cargo_bin_cmd!("rta")
        .env_remove("RTA_FLAGS")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no input program given"));
}
