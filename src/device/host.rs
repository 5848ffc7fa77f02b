//! Эмулятор сетки исполнителей на хосте
//!
//! Каждый исполнитель геометрии запуска выполняет тело ядра из
//! [`crate::matrix::kernels`]; блоки распределяются по пулу rayon.
//! Запись за пределы выходного буфера считается сбоем устройства и
//! возвращается из следующего чтения этого буфера.

use super::geometry::{LaunchGeometry, WorkerId};
use super::{Device, DeviceInfo};
use crate::error::DeviceError;
use crate::matrix::kernels::{self, KernelWrite, MultiplyDims};
use crate::matrix::Element;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Наибольший блок потоков, который принимает эмулятор
const HOST_MAX_WORK_GROUP_SIZE: usize = 1024;

/// Буфер "устройства" в памяти хоста
#[derive(Debug)]
pub struct HostBuffer<T> {
    data: Vec<T>,
    /// Первая запись за границу: (индекс, длина буфера)
    fault: Option<(usize, usize)>,
}

impl<T> HostBuffer<T> {
    fn check_len(&self, len: usize) -> Result<(), DeviceError> {
        if self.data.len() != len {
            return Err(DeviceError::SizeMismatch {
                expected: self.data.len(),
                actual: len,
            });
        }
        Ok(())
    }
}

/// Устройство, исполняющее ядра на хосте
#[derive(Debug, Clone)]
pub struct HostDevice {
    info: DeviceInfo,
}

impl HostDevice {
    pub fn new() -> Self {
        let threads = rayon::current_num_threads();
        Self {
            info: DeviceInfo {
                name: format!("host emulator ({} threads)", threads),
                vendor: "matverify".to_string(),
                backend: "host",
                compute_units: threads as u32,
                max_work_group_size: HOST_MAX_WORK_GROUP_SIZE,
                global_mem_bytes: 0,
            },
        }
    }

    /// Выполняет `worker` для каждого исполнителя сетки и раскладывает записи в `out`
    pub(crate) fn run_grid<T, F>(geometry: &LaunchGeometry, out: &mut HostBuffer<T>, worker: F)
    where
        T: Element,
        F: Fn(WorkerId) -> KernelWrite<T> + Sync,
    {
        let writes: Vec<(usize, T)> = (0..geometry.block_count())
            .into_par_iter()
            .flat_map_iter(|n| {
                geometry
                    .workers_in(geometry.block_at(n))
                    .filter_map(&worker)
                    .collect::<Vec<_>>()
            })
            .collect();

        let len = out.data.len();
        for (index, value) in writes {
            match out.data.get_mut(index) {
                Some(cell) => *cell = value,
                None => {
                    warn!("исполнитель пишет за границу буфера: {} >= {}", index, len);
                    out.fault.get_or_insert((index, len));
                }
            }
        }
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for HostDevice {
    type Buffer<T: Element> = HostBuffer<T>;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc<T: Element>(&self, len: usize) -> Result<HostBuffer<T>, DeviceError> {
        Ok(HostBuffer {
            data: vec![T::default(); len],
            fault: None,
        })
    }

    fn write<T: Element>(&self, buffer: &mut HostBuffer<T>, src: &[T]) -> Result<(), DeviceError> {
        buffer.check_len(src.len())?;
        buffer.data.copy_from_slice(src);
        Ok(())
    }

    fn read<T: Element>(&self, buffer: &HostBuffer<T>, dst: &mut [T]) -> Result<(), DeviceError> {
        if let Some((index, len)) = buffer.fault {
            return Err(DeviceError::OutOfBounds { index, len });
        }
        buffer.check_len(dst.len())?;
        dst.copy_from_slice(&buffer.data);
        Ok(())
    }

    fn launch_multiply<T: Element>(
        &self,
        geometry: &LaunchGeometry,
        out: &mut HostBuffer<T>,
        a: &HostBuffer<T>,
        b: &HostBuffer<T>,
        dims: MultiplyDims,
    ) -> Result<(), DeviceError> {
        a.check_len(dims.h_a * dims.w_a)?;
        b.check_len(dims.w_a * dims.w_b)?;
        debug!("эмуляция matrix_mult: {}", geometry);
        let (a, b) = (&a.data[..], &b.data[..]);
        Self::run_grid(geometry, out, |worker| {
            kernels::matrix_mult_worker(worker, a, b, dims)
        });
        Ok(())
    }

    fn launch_transpose<T: Element>(
        &self,
        geometry: &LaunchGeometry,
        out: &mut HostBuffer<T>,
        input: &HostBuffer<T>,
        width: usize,
    ) -> Result<(), DeviceError> {
        input.check_len(width * width)?;
        debug!("эмуляция matrix_transpose: {}", geometry);
        let input = &input.data[..];
        Self::run_grid(geometry, out, |worker| {
            kernels::matrix_transpose_worker(worker, input, width)
        });
        Ok(())
    }
}
