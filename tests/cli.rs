//! Проверки командной строки на эмуляторе устройства

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn matverify(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_matverify"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run matverify")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn matrix_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn no_arguments_is_usage_error() {
    let output = matverify(&[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!stdout(&output).contains("Device name"));
}

#[test]
fn single_file_is_usage_error() {
    let a = matrix_file("1 2\n3 4\n");
    let output = matverify(&[a.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!stdout(&output).contains("Device name"));
}

#[test]
fn operation_requires_synthetic_operands() {
    let output = matverify(&["--op", "transpose", "a.txt", "b.txt"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn transpose_of_square_files_is_usage_error() {
    let a = matrix_file("1 2\n3 4\n");
    let path = a.path().to_str().unwrap();
    let output = matverify(&["--backend", "host", "--op", "transpose", path, path]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!stdout(&output).contains("Device name"));
    assert!(!stdout(&output).contains("PASSED!"));
}

#[test]
fn fill_with_files_is_usage_error() {
    let a = matrix_file("1 2\n3 4\n");
    let path = a.path().to_str().unwrap();
    let output = matverify(&["--backend", "host", "--fill", "zeros", path, path]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!stdout(&output).contains("Device name"));
}

#[test]
fn synthetic_run_passes() {
    let output = matverify(&["--backend", "host", "--synthetic", "4"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0), "{}", text);
    assert!(text.starts_with("Device name host emulator"));
    assert!(text.trim_end().ends_with("PASSED!"));
}

#[test]
fn synthetic_transpose_with_odd_tile() {
    let output = matverify(&[
        "--backend", "host", "--synthetic", "33", "--op", "transpose", "--tile", "5x3",
        "--element", "f32", "--fill", "normal",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("PASSED!"));
}

#[test]
fn files_are_multiplied() {
    let a = matrix_file("1 2 3\n4 5 6\n");
    let b = matrix_file("7 8\n9 10\n11 12\n");
    let output = matverify(&[
        "--backend",
        "host",
        "--dump",
        a.path().to_str().unwrap(),
        b.path().to_str().unwrap(),
    ]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0), "{}", text);
    assert!(text.contains("2, 2\n58\n64\n139\n154\n"));
}

#[test]
fn mismatched_files_fail_before_device() {
    let a = matrix_file("1 2 3\n4 5 6\n");
    let b = matrix_file("1 2\n3 4\n");
    let output = matverify(&[
        "--backend",
        "host",
        a.path().to_str().unwrap(),
        b.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("Device name"));
}

#[test]
fn dump_prints_operands_and_reference() {
    let output = matverify(&["--backend", "host", "--synthetic", "2", "--dump"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(0));
    let expected = "2, 2\n0\n10\n20\n30\n2, 2\n0\n10\n20\n30\n2, 2\n200\n300\n600\n1100\n";
    assert!(text.contains(expected), "{}", text);
}

#[test]
fn json_report_is_machine_readable() {
    let output = matverify(&["--backend", "host", "--synthetic", "8", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["verification"]["mismatches"], 0);
    assert_eq!(report["verification"]["total"], 64);
    assert_eq!(report["device"]["backend"], "host");
    assert_eq!(report["element"], "u64");
}

#[test]
fn zero_width_is_rejected() {
    let output = matverify(&["--backend", "host", "--synthetic", "0"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("Device name"));
}

#[test]
fn oversized_tile_is_rejected_by_device() {
    let output = matverify(&["--backend", "host", "--synthetic", "8", "--tile", "64x64"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn overflowing_tile_is_rejected_without_panic() {
    let output = matverify(&[
        "--backend",
        "host",
        "--synthetic",
        "4",
        "--tile",
        "4294967296x4294967296",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("panicked"));
}

#[test]
fn width_whose_square_overflows_is_rejected() {
    let output = matverify(&["--backend", "host", "--synthetic", "18446744073709551615"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!stdout(&output).contains("Device name"));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("panicked"));
}
