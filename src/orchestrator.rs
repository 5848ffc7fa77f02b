//! Оркестратор пересылок: буферы устройства, копирование и запуск ядер
//!
//! Порядок всегда один: выделение → копирование операндов на устройство →
//! запуск ядра → копирование результата на хост. Каждый шаг блокирующий.
//! Буферы устройства живут только внутри одного вызова и освобождаются
//! при выходе из него при любом исходе.

use crate::config::validate_tile;
use crate::device::geometry::{Dim2, LaunchGeometry};
use crate::device::Device;
use crate::error::{MatrixError, TransferError};
use crate::matrix::kernels::MultiplyDims;
use crate::matrix::{Element, Matrix};
use tracing::{debug, info, warn};

pub struct TransferOrchestrator<'d, D: Device> {
    device: &'d D,
    tile: Dim2,
}

impl<'d, D: Device> TransferOrchestrator<'d, D> {
    /// Проверяет размер блока потоков против возможностей устройства
    pub fn new(device: &'d D, tile: Dim2) -> Result<Self, TransferError> {
        validate_tile(tile, device.info())?;
        Ok(Self { device, tile })
    }

    /// Геометрия, покрывающая результат `extent` (строки по x, столбцы по y)
    pub fn geometry_for(&self, extent: Dim2) -> Result<LaunchGeometry, TransferError> {
        Ok(LaunchGeometry::covering(extent, self.tile)?)
    }

    /// `A * B` на устройстве с геометрией, покрывающей результат
    pub fn multiply<T: Element>(
        &self,
        a: &Matrix<T>,
        b: &Matrix<T>,
    ) -> Result<Matrix<T>, TransferError> {
        let geometry = self.geometry_for(Dim2::new(a.height(), b.width()))?;
        self.multiply_with(a, b, geometry)
    }

    /// `A * B` с явно заданной геометрией
    ///
    /// Геометрия, не покрывающая результат, допустима: незаписанные
    /// ячейки остаются с начальным содержимым буфера устройства.
    pub fn multiply_with<T: Element>(
        &self,
        a: &Matrix<T>,
        b: &Matrix<T>,
        geometry: LaunchGeometry,
    ) -> Result<Matrix<T>, TransferError> {
        if a.width() != b.height() {
            return Err(MatrixError::DimensionMismatch {
                width_a: a.width(),
                height_b: b.height(),
            }
            .into());
        }
        let dims = MultiplyDims {
            h_a: a.height(),
            w_a: a.width(),
            w_b: b.width(),
        };
        let extent = Dim2::new(dims.h_a, dims.w_b);
        warn_if_uncovered(&geometry, extent);

        debug!("Создание буферов устройства...");
        let mut a_buffer = self.device.alloc::<T>(a.len())?;
        let mut b_buffer = self.device.alloc::<T>(b.len())?;
        let mut c_buffer = self.device.alloc::<T>(dims.output_len())?;

        debug!("Копирование операндов на устройство...");
        self.device.write(&mut a_buffer, a.as_slice())?;
        self.device.write(&mut b_buffer, b.as_slice())?;

        info!(
            "Запуск умножения {}x{} * {}x{}: {}",
            dims.h_a, dims.w_a, dims.w_a, dims.w_b, geometry
        );
        self.device
            .launch_multiply(&geometry, &mut c_buffer, &a_buffer, &b_buffer, dims)?;

        debug!("Чтение результата с устройства...");
        let mut c = vec![T::default(); dims.output_len()];
        self.device.read(&c_buffer, &mut c)?;

        drop((a_buffer, b_buffer, c_buffer));
        debug!("Буферы устройства освобождены");

        Ok(Matrix::from_vec(dims.h_a, dims.w_b, c)?)
    }

    /// Транспонирование квадратной матрицы на устройстве
    pub fn transpose<T: Element>(&self, input: &Matrix<T>) -> Result<Matrix<T>, TransferError> {
        let width = input.require_square()?;
        let geometry = self.geometry_for(Dim2::new(width, width))?;
        self.transpose_with(input, geometry)
    }

    pub fn transpose_with<T: Element>(
        &self,
        input: &Matrix<T>,
        geometry: LaunchGeometry,
    ) -> Result<Matrix<T>, TransferError> {
        let width = input.require_square()?;
        warn_if_uncovered(&geometry, Dim2::new(width, width));

        let mut in_buffer = self.device.alloc::<T>(input.len())?;
        let mut out_buffer = self.device.alloc::<T>(input.len())?;
        self.device.write(&mut in_buffer, input.as_slice())?;

        info!("Запуск транспонирования {}x{}: {}", width, width, geometry);
        self.device
            .launch_transpose(&geometry, &mut out_buffer, &in_buffer, width)?;

        let mut out = vec![T::default(); input.len()];
        self.device.read(&out_buffer, &mut out)?;

        drop((in_buffer, out_buffer));
        debug!("Буферы устройства освобождены");

        Ok(Matrix::from_vec(width, width, out)?)
    }
}

fn warn_if_uncovered(geometry: &LaunchGeometry, extent: Dim2) {
    if !geometry.covers(extent) {
        warn!(
            "геометрия {} не покрывает результат {}: часть ячеек не будет записана",
            geometry, extent
        );
    }
}
