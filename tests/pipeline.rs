//! Сквозные прогоны на эмуляторе устройства

use matverify::device::geometry::{Dim2, LaunchGeometry};
use matverify::matrix::{
    compare_results, cpu_matrix_multiply, cpu_matrix_transpose, initialize_matrices,
};
use matverify::config::OperandSource;
use matverify::runner::{load_operands, run_pipeline};
use matverify::{
    Element, ElementKind, HostDevice, Matrix, MatrixError, MatrixType, Operation, RunConfig,
    TransferError, TransferOrchestrator,
};
use proptest::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn multiply_on_host<T: Element>(width: usize, fill: MatrixType, tile: Dim2) {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, tile).unwrap();
    let (a, b) = initialize_matrices::<T>(fill, width).unwrap();

    let device_result = orchestrator.multiply(&a, &b).unwrap();
    let reference = cpu_matrix_multiply(&a, &b).unwrap();
    let report = compare_results(&device_result, &reference).unwrap();

    assert_eq!(report.mismatches, 0, "width {} tile {}", width, tile);
    assert_eq!(report.total, width * width);
    assert_eq!(report.verdict(), "PASSED!");
}

#[test]
fn indexed_multiply_matches_reference_for_many_widths() {
    for width in [1, 4, 32, 33, 64] {
        multiply_on_host::<u64>(width, MatrixType::Indexed, Dim2::new(4, 4));
        multiply_on_host::<f32>(width, MatrixType::Indexed, Dim2::new(4, 4));
    }
}

#[test]
fn tile_that_does_not_divide_width() {
    multiply_on_host::<u64>(33, MatrixType::Random, Dim2::new(5, 3));
    multiply_on_host::<f32>(17, MatrixType::Normal, Dim2::new(8, 1));
    multiply_on_host::<u64>(3, MatrixType::Indexed, Dim2::new(16, 16));
}

#[test]
fn four_by_four_scenario() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    let (a, b) = initialize_matrices::<u64>(MatrixType::Indexed, 4).unwrap();
    let c = orchestrator.multiply(&a, &b).unwrap();
    assert_eq!(c.get(0, 0), Some(5600));
    assert_eq!(c.get(3, 3), Some(120 * 30 + 130 * 70 + 140 * 110 + 150 * 150));
}

#[test]
fn zero_operand_gives_zero_result() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    let (a, b) = initialize_matrices::<u64>(MatrixType::Zeros, 9).unwrap();
    let c = orchestrator.multiply(&a, &b).unwrap();
    assert!(c.as_slice().iter().all(|&v| v == 0));
}

#[test]
fn repeated_runs_are_identical() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 8)).unwrap();
    let (a, b) = initialize_matrices::<f32>(MatrixType::Normal, 40).unwrap();
    let first = orchestrator.multiply(&a, &b).unwrap();
    let second = orchestrator.multiply(&a, &b).unwrap();
    assert_eq!(first.as_slice(), second.as_slice());
}

#[test]
fn full_pipeline_on_same_files_is_deterministic() {
    let mut a_file = NamedTempFile::new().unwrap();
    let mut b_file = NamedTempFile::new().unwrap();
    a_file.write_all(b"1.5 2 3\n4 5.25 6\n7 8 9.75\n").unwrap();
    b_file.write_all(b"0.5 1 0\n2 0.25 1\n1 1 3\n").unwrap();

    let mut config = RunConfig::synthetic(3);
    config.source = OperandSource::Files {
        a: a_file.path().to_path_buf(),
        b: b_file.path().to_path_buf(),
    };
    config.element = ElementKind::F32;
    config.tile = Dim2::new(2, 2);
    config.validate().unwrap();

    let device = HostDevice::new();
    let run = || {
        let (a, b) = load_operands::<f32>(&config).unwrap();
        run_pipeline(&device, &config, a, b, false).unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.report.mismatches(), 0);
    assert_eq!(first.report.mismatches(), second.report.mismatches());
    assert_eq!(first.device_result, second.device_result);
    assert_eq!(first.reference_result, second.reference_result);
}

#[test]
fn rectangular_operands() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    let a = Matrix::from_fn(3, 5, |r, c| (r * 5 + c) as u64);
    let b = Matrix::from_fn(5, 7, |r, c| (r + 2 * c) as u64);
    let c = orchestrator.multiply(&a, &b).unwrap();
    assert_eq!((c.height(), c.width()), (3, 7));
    assert_eq!(c, cpu_matrix_multiply(&a, &b).unwrap());
}

#[test]
fn dimension_mismatch_is_rejected_before_launch() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    let a = Matrix::<u64>::zeros(3, 4);
    let b = Matrix::<u64>::zeros(5, 3);
    let err = orchestrator.multiply(&a, &b).unwrap_err();
    assert!(matches!(
        err,
        TransferError::Matrix(MatrixError::DimensionMismatch {
            width_a: 4,
            height_b: 5
        })
    ));
}

#[test]
fn under_covering_geometry_leaves_cells_unwritten() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    let (a, b) = initialize_matrices::<u64>(MatrixType::Indexed, 8).unwrap();
    let geometry = LaunchGeometry::new(Dim2::new(1, 1), Dim2::new(4, 4));

    let c = orchestrator.multiply_with(&a, &b, geometry).unwrap();
    let reference = cpu_matrix_multiply(&a, &b).unwrap();
    assert_eq!(c.get(0, 0), reference.get(0, 0));
    assert_eq!(c.get(3, 3), reference.get(3, 3));
    assert_eq!(c.get(4, 0), Some(0));
    assert_eq!(c.get(7, 7), Some(0));

    let report = compare_results(&c, &reference).unwrap();
    assert_eq!(report.mismatches, 64 - 16);
    assert_eq!(report.verdict(), "FAILED: 48 errors");
}

#[test]
fn transpose_round_trip_on_device() {
    let device = HostDevice::new();
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(3, 5)).unwrap();
    let (a, _) = initialize_matrices::<u64>(MatrixType::Random, 23).unwrap();
    let t = orchestrator.transpose(&a).unwrap();
    assert_eq!(t, cpu_matrix_transpose(&a).unwrap());
    assert_eq!(orchestrator.transpose(&t).unwrap(), a);
}

#[test]
fn pipeline_reports_device_and_verdict() {
    let device = HostDevice::new();
    let mut config = RunConfig::synthetic(12);
    config.operation = Operation::Transpose;
    let (a, b) = load_operands::<u64>(&config).unwrap();
    let outcome = run_pipeline(&device, &config, a, b, false).unwrap();
    assert_eq!(outcome.report.device.backend, "host");
    assert_eq!(outcome.report.output, Dim2::new(12, 12));
    assert_eq!(outcome.report.exit_status(), 0);

    let json = serde_json::to_value(&outcome.report).unwrap();
    assert_eq!(json["operation"], "transpose");
    assert_eq!(json["verification"]["mismatches"], 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn emulated_device_matches_reference(
        h_a in 1usize..12,
        w_a in 1usize..12,
        w_b in 1usize..12,
        tx in 1usize..9,
        ty in 1usize..9,
        seed in any::<u64>(),
    ) {
        let a = Matrix::from_fn(h_a, w_a, |r, c| {
            seed.wrapping_mul(31).wrapping_add((r * w_a + c) as u64) % 1000
        });
        let b = Matrix::from_fn(w_a, w_b, |r, c| {
            seed.rotate_left(7).wrapping_add((r * w_b + c) as u64) % 1000
        });

        let device = HostDevice::new();
        let orchestrator = TransferOrchestrator::new(&device, Dim2::new(tx, ty)).unwrap();
        let c = orchestrator.multiply(&a, &b).unwrap();
        prop_assert_eq!(c, cpu_matrix_multiply(&a, &b).unwrap());
    }
}
