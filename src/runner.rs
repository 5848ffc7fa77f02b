//! Полный прогон: операнды → устройство → эталон CPU → сравнение

use crate::config::{OperandSource, Operation, RunConfig};
use crate::device::geometry::{Dim2, LaunchGeometry};
use crate::device::{Device, DeviceInfo};
use crate::matrix::io::read_matrix;
use crate::matrix::{
    compare_results, cpu_matrix_multiply_with_progress, cpu_matrix_transpose, initialize_matrices,
    Element, Matrix, VerificationReport,
};
use crate::orchestrator::TransferOrchestrator;
use crate::utils::measure_time;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use prettytable::{row, Table};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Отчет об одном прогоне
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub device: DeviceInfo,
    pub operation: Operation,
    pub element: &'static str,
    /// Размер результата (строки, столбцы)
    pub output: Dim2,
    pub geometry: LaunchGeometry,
    pub verification: VerificationReport,
    pub device_ms: f64,
    pub reference_ms: f64,
}

impl RunReport {
    pub fn mismatches(&self) -> usize {
        self.verification.mismatches
    }

    /// Код завершения процесса: число расхождений, не больше 255
    pub fn exit_status(&self) -> u8 {
        u8::try_from(self.mismatches()).unwrap_or(u8::MAX)
    }

    /// Итоговая статистика в виде таблицы
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["Устройство", self.device.name]);
        table.add_row(row!["Бэкенд", self.device.backend]);
        table.add_row(row!["Операция", format!("{:?}", self.operation)]);
        table.add_row(row!["Тип элементов", self.element]);
        table.add_row(row!["Результат", self.output]);
        table.add_row(row!["Геометрия", self.geometry]);
        table.add_row(row!["Время устройства", format!("{:.3} мс", self.device_ms)]);
        table.add_row(row!["Время CPU", format!("{:.3} мс", self.reference_ms)]);
        table.add_row(row!["Допуск", self.verification.tolerance]);
        table.add_row(row!["Расхождений", self.verification.mismatches]);
        table
    }
}

/// Операнды, результаты и отчет прогона
#[derive(Debug, Clone)]
pub struct RunOutcome<T> {
    pub a: Matrix<T>,
    pub b: Option<Matrix<T>>,
    pub device_result: Matrix<T>,
    pub reference_result: Matrix<T>,
    pub report: RunReport,
}

/// Загружает или генерирует операнды согласно конфигурации
pub fn load_operands<T: Element>(config: &RunConfig) -> Result<(Matrix<T>, Matrix<T>)> {
    match &config.source {
        OperandSource::Files { a, b } => {
            let ma = read_matrix(a)
                .with_context(|| format!("не удалось прочитать {}", a.display()))?;
            let mb = read_matrix(b)
                .with_context(|| format!("не удалось прочитать {}", b.display()))?;
            Ok((ma, mb))
        }
        OperandSource::Synthetic { width, fill } => initialize_matrices(*fill, *width)
            .with_context(|| format!("не удалось сгенерировать матрицы {}", fill.name())),
    }
}

/// Выполняет операцию на устройстве и на CPU и сравнивает результаты
pub fn run_pipeline<T: Element, D: Device>(
    device: &D,
    config: &RunConfig,
    a: Matrix<T>,
    b: Matrix<T>,
    show_progress: bool,
) -> Result<RunOutcome<T>> {
    let orchestrator = TransferOrchestrator::new(device, config.tile)?;

    let (output, b) = match config.operation {
        Operation::Multiply => (Dim2::new(a.height(), b.width()), Some(b)),
        Operation::Transpose => (Dim2::new(a.width(), a.height()), None),
    };
    let geometry = orchestrator.geometry_for(output)?;

    let (device_result, device_time) = measure_time(|| match &b {
        Some(b) => orchestrator.multiply_with(&a, b, geometry),
        None => orchestrator.transpose_with(&a, geometry),
    });
    let device_result = device_result.context("вычисление на устройстве не удалось")?;
    info!("вычисления на устройстве завершены за {:?}", device_time);

    let progress = reference_progress(show_progress);
    let (reference_result, reference_time) = measure_time(|| match &b {
        Some(b) => cpu_matrix_multiply_with_progress(&a, b, &progress),
        None => cpu_matrix_transpose(&a),
    });
    let reference_result = reference_result.context("эталонное вычисление не удалось")?;
    info!("вычисления на CPU завершены за {:?}", reference_time);

    let verification = compare_results(&device_result, &reference_result)?;

    let report = RunReport {
        device: device.info().clone(),
        operation: config.operation,
        element: T::NAME,
        output,
        geometry,
        verification,
        device_ms: millis(device_time),
        reference_ms: millis(reference_time),
    };
    Ok(RunOutcome {
        a,
        b,
        device_result,
        reference_result,
        report,
    })
}

fn reference_progress(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} CPU [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} строк ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
