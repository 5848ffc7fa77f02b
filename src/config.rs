//! Конфигурация запуска
//!
//! Размеры матриц и блока потоков задаются во время выполнения и
//! проверяются один раз до обращения к устройству.

use crate::device::{Dim2, DeviceInfo};
use crate::error::ConfigError;
use crate::matrix::MatrixType;
use clap::ValueEnum;
use serde::Serialize;
use std::path::PathBuf;

/// Ширина синтетических матриц по умолчанию
pub const DEFAULT_WIDTH: usize = 64;
/// Блок потоков по умолчанию
pub const DEFAULT_TILE: Dim2 = Dim2::new(4, 4);

/// Тип элементов матриц
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// 64-битные беззнаковые целые, точное сравнение
    U64,
    /// 32-битные числа с плавающей точкой, сравнение с допуском
    F32,
}

impl ElementKind {
    /// Размер одного элемента в байтах
    pub fn size_bytes(self) -> usize {
        match self {
            ElementKind::U64 => std::mem::size_of::<u64>(),
            ElementKind::F32 => std::mem::size_of::<f32>(),
        }
    }
}

/// Где исполняются ядра
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Первое OpenCL устройство системы
    #[value(name = "opencl")]
    OpenCl,
    /// Эмулятор сетки исполнителей на CPU
    Host,
}

/// Проверяемая операция
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Multiply,
    Transpose,
}

/// Откуда берутся операнды
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandSource {
    /// Две текстовые матрицы
    Files { a: PathBuf, b: PathBuf },
    /// Сгенерированные квадратные матрицы
    Synthetic { width: usize, fill: MatrixType },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source: OperandSource,
    pub operation: Operation,
    pub element: ElementKind,
    pub backend: BackendKind,
    pub tile: Dim2,
}

impl RunConfig {
    pub fn synthetic(width: usize) -> Self {
        Self {
            source: OperandSource::Synthetic {
                width,
                fill: MatrixType::Indexed,
            },
            operation: Operation::Multiply,
            element: ElementKind::U64,
            backend: BackendKind::OpenCl,
            tile: DEFAULT_TILE,
        }
    }

    /// Проверки, не требующие устройства
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            OperandSource::Synthetic { width: 0, .. } => return Err(ConfigError::ZeroWidth),
            OperandSource::Synthetic { width, .. } => {
                let bytes = width
                    .checked_mul(width)
                    .and_then(|n| n.checked_mul(self.element.size_bytes()));
                if !matches!(bytes, Some(b) if b <= isize::MAX as usize) {
                    return Err(ConfigError::WidthTooLarge { width });
                }
            }
            OperandSource::Files { .. } if self.operation != Operation::Multiply => {
                return Err(ConfigError::FileOperandsMultiplyOnly);
            }
            OperandSource::Files { .. } => {}
        }
        if self.tile.x == 0 || self.tile.y == 0 {
            return Err(ConfigError::ZeroTile {
                x: self.tile.x,
                y: self.tile.y,
            });
        }
        Ok(())
    }

    /// Проверка блока потоков против возможностей открытого устройства
    pub fn validate_for_device(&self, info: &DeviceInfo) -> Result<(), ConfigError> {
        validate_tile(self.tile, info)
    }
}

pub(crate) fn validate_tile(tile: Dim2, info: &DeviceInfo) -> Result<(), ConfigError> {
    if tile.x == 0 || tile.y == 0 {
        return Err(ConfigError::ZeroTile { x: tile.x, y: tile.y });
    }
    if !matches!(tile.checked_area(), Some(area) if area <= info.max_work_group_size) {
        return Err(ConfigError::TileTooLarge {
            x: tile.x,
            y: tile.y,
            max: info.max_work_group_size,
        });
    }
    Ok(())
}
