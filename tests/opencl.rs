//! Прогоны на настоящем OpenCL устройстве
//!
//! Без библиотеки OpenCL, платформы или устройства тесты ничего не делают.

use matverify::device::geometry::Dim2;
use matverify::matrix::{
    compare_results, cpu_matrix_multiply, cpu_matrix_transpose, initialize_matrices,
};
use matverify::opencl::ClDevice;
use matverify::{Device, DeviceError, MatrixType, TransferOrchestrator};

fn open_device() -> Option<ClDevice> {
    match ClDevice::open() {
        Ok(device) => Some(device),
        Err(
            DeviceError::LibraryNotFound { .. }
            | DeviceError::MissingSymbol { .. }
            | DeviceError::NoPlatform
            | DeviceError::NoDevice,
        ) => {
            eprintln!("OpenCL недоступен, тест пропущен");
            None
        }
        Err(e) => panic!("не удалось открыть OpenCL устройство: {}", e),
    }
}

#[test]
fn device_reports_capabilities() {
    let Some(device) = open_device() else { return };
    let info = device.info();
    assert_eq!(info.backend, "opencl");
    assert!(!info.name.is_empty());
    assert!(info.max_work_group_size >= 1);
}

#[test]
fn indexed_multiply_matches_reference() {
    let Some(device) = open_device() else { return };
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    for width in [1, 4, 33, 64] {
        let (a, b) = initialize_matrices::<u64>(MatrixType::Indexed, width).unwrap();
        let c = orchestrator.multiply(&a, &b).unwrap();
        let report = compare_results(&c, &cpu_matrix_multiply(&a, &b).unwrap()).unwrap();
        assert_eq!(report.mismatches, 0, "width {}", width);
    }
}

#[test]
fn float_multiply_within_tolerance() {
    let Some(device) = open_device() else { return };
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(2, 2)).unwrap();
    let (a, b) = initialize_matrices::<f32>(MatrixType::OnesAndTwos, 16).unwrap();
    let c = orchestrator.multiply(&a, &b).unwrap();
    let report = compare_results(&c, &cpu_matrix_multiply(&a, &b).unwrap()).unwrap();
    assert!(report.passed(), "{:?}", report);
}

#[test]
fn transpose_matches_reference() {
    let Some(device) = open_device() else { return };
    let orchestrator = TransferOrchestrator::new(&device, Dim2::new(4, 4)).unwrap();
    let (a, _) = initialize_matrices::<u64>(MatrixType::Random, 30).unwrap();
    let t = orchestrator.transpose(&a).unwrap();
    assert_eq!(t, cpu_matrix_transpose(&a).unwrap());
}
