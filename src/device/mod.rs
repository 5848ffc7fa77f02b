//! Абстракция вычислительного устройства
//!
//! Оркестратор пересылок работает с любым устройством через [`Device`]:
//! настоящим OpenCL устройством ([`crate::opencl::ClDevice`]) или
//! эмулятором сетки на хосте ([`HostDevice`]). Все операции синхронные
//! и выполняются строго в порядке вызова.

pub mod geometry;
pub mod host;

use crate::error::DeviceError;
use crate::matrix::kernels::MultiplyDims;
use crate::matrix::Element;
use geometry::LaunchGeometry;
use serde::Serialize;
use std::fmt;

pub use geometry::{Dim2, WorkerId};
pub use host::HostDevice;

/// Описание устройства, запрашивается один раз при открытии
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub backend: &'static str,
    pub compute_units: u32,
    pub max_work_group_size: usize,
    pub global_mem_bytes: u64,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}): {} вычислительных блоков, рабочая группа до {}, память {} МиБ",
            self.name,
            self.vendor,
            self.backend,
            self.compute_units,
            self.max_work_group_size,
            self.global_mem_bytes / (1024 * 1024)
        )
    }
}

/// Устройство с собственной памятью и ядрами умножения и транспонирования
///
/// Буфер устройства освобождается при выходе из области видимости,
/// поэтому освобождение не зависит от того, как закончился запуск.
pub trait Device {
    /// Буфер в памяти устройства на `len` элементов типа `T`
    type Buffer<T: Element>;

    fn info(&self) -> &DeviceInfo;

    /// Выделяет буфер; содержимое до первой записи не определено
    fn alloc<T: Element>(&self, len: usize) -> Result<Self::Buffer<T>, DeviceError>;

    /// Копирование хост → устройство, блокирующее
    fn write<T: Element>(&self, buffer: &mut Self::Buffer<T>, src: &[T]) -> Result<(), DeviceError>;

    /// Копирование устройство → хост, блокирующее; дожидается завершения ядра
    fn read<T: Element>(&self, buffer: &Self::Buffer<T>, dst: &mut [T]) -> Result<(), DeviceError>;

    /// Запускает ядро умножения `out = a * b`
    fn launch_multiply<T: Element>(
        &self,
        geometry: &LaunchGeometry,
        out: &mut Self::Buffer<T>,
        a: &Self::Buffer<T>,
        b: &Self::Buffer<T>,
        dims: MultiplyDims,
    ) -> Result<(), DeviceError>;

    /// Запускает ядро транспонирования квадратной матрицы `width x width`
    fn launch_transpose<T: Element>(
        &self,
        geometry: &LaunchGeometry,
        out: &mut Self::Buffer<T>,
        input: &Self::Buffer<T>,
        width: usize,
    ) -> Result<(), DeviceError>;
}
