//! Умножение матриц на OpenCL устройстве с проверкой по эталону CPU
//!
//! ```text
//! matverify a.txt b.txt                         # две матрицы из файлов
//! matverify --synthetic 64                      # A = B, элемент = индекс * 10
//! matverify --synthetic 33 --tile 8x8 --element f32 --fill random
//! matverify --synthetic 64 --op transpose --backend host
//! ```
//!
//! Код завершения равен числу расхождений (не больше 255).

use anyhow::{Context, Result};
use clap::Parser;
use matverify::config::{OperandSource, DEFAULT_TILE};
use matverify::device::Dim2;
use matverify::matrix::io::write_matrix;
use matverify::opencl::ClDevice;
use matverify::runner::{load_operands, run_pipeline};
use matverify::utils::init_tracing;
use matverify::{
    BackendKind, Device, Element, ElementKind, HostDevice, Matrix, MatrixError, MatrixType,
    Operation, RunConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Умножение и транспонирование матриц на устройстве с проверкой на CPU
#[derive(Parser, Debug)]
#[command(name = "matverify")]
#[command(version)]
struct Args {
    /// Файл с матрицей A
    #[arg(required_unless_present = "synthetic")]
    a: Option<PathBuf>,

    /// Файл с матрицей B
    #[arg(required_unless_present = "synthetic")]
    b: Option<PathBuf>,

    /// Сгенерировать квадратные матрицы заданной ширины вместо чтения файлов
    #[arg(long, value_name = "WIDTH", conflicts_with_all = ["a", "b"])]
    synthetic: Option<usize>,

    /// Заполнение синтетических матриц [по умолчанию: indexed]
    #[arg(long, value_enum, requires = "synthetic")]
    fill: Option<MatrixType>,

    /// Проверяемая операция; файлы только перемножаются [по умолчанию: multiply]
    #[arg(long, value_enum, requires = "synthetic")]
    op: Option<Operation>,

    /// Тип элементов
    #[arg(long, value_enum, default_value_t = ElementKind::U64)]
    element: ElementKind,

    /// Где исполнять ядра
    #[arg(long, value_enum, default_value_t = BackendKind::OpenCl)]
    backend: BackendKind,

    /// Размер блока потоков, например 4x4 или 16
    #[arg(long, default_value_t = DEFAULT_TILE)]
    tile: Dim2,

    /// Напечатать операнды и эталонный результат
    #[arg(long)]
    dump: bool,

    /// Отчет в JSON вместо таблицы
    #[arg(long)]
    json: bool,

    /// Показывать прогресс эталонного вычисления
    #[arg(long)]
    progress: bool,

    /// Подробность логов (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn to_config(&self) -> RunConfig {
        let source = match (&self.a, &self.b, self.synthetic) {
            (Some(a), Some(b), _) => OperandSource::Files {
                a: a.clone(),
                b: b.clone(),
            },
            (_, _, width) => OperandSource::Synthetic {
                width: width.unwrap_or_default(),
                fill: self.fill.unwrap_or(MatrixType::Indexed),
            },
        };
        RunConfig {
            source,
            operation: self.op.unwrap_or(Operation::Multiply),
            element: self.element,
            backend: self.backend,
            tile: self.tile,
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.to_config();
    config.validate()?;

    match config.element {
        ElementKind::U64 => run::<u64>(&args, &config),
        ElementKind::F32 => run::<f32>(&args, &config),
    }
}

fn run<T: Element>(args: &Args, config: &RunConfig) -> Result<ExitCode> {
    // Операнды готовы и согласованы до первого обращения к устройству
    let (a, b) = load_operands::<T>(config)?;
    if config.operation == Operation::Multiply && a.width() != b.height() {
        return Err(MatrixError::DimensionMismatch {
            width_a: a.width(),
            height_b: b.height(),
        }
        .into());
    }

    match config.backend {
        BackendKind::OpenCl => {
            let device = ClDevice::open().context("не удалось открыть OpenCL устройство")?;
            execute(&device, args, config, a, b)
        }
        BackendKind::Host => execute(&HostDevice::new(), args, config, a, b),
    }
}

fn execute<T: Element, D: Device>(
    device: &D,
    args: &Args,
    config: &RunConfig,
    a: Matrix<T>,
    b: Matrix<T>,
) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.json {
        info!("Device name {}", device.info().name);
    } else {
        writeln!(out, "Device name {}", device.info().name)?;
    }
    config.validate_for_device(device.info())?;

    let outcome = run_pipeline(device, config, a, b, args.progress)?;

    if args.dump {
        write_matrix(&mut out, &outcome.a)?;
        if let Some(b) = &outcome.b {
            write_matrix(&mut out, b)?;
        }
        write_matrix(&mut out, &outcome.reference_result)?;
    }

    if args.json {
        serde_json::to_writer_pretty(&mut out, &outcome.report)?;
        writeln!(out)?;
    } else {
        outcome.report.summary_table().print(&mut out)?;
        writeln!(out, "{}", outcome.report.verification.verdict())?;
    }

    Ok(ExitCode::from(outcome.report.exit_status()))
}
