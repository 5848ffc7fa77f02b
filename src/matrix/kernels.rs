//! Ядра для матричных операций
//!
//! Здесь два представления одних и тех же ядер: исходник OpenCL C для
//! настоящего устройства и тела исполнителей на Rust для эмулятора
//! сетки на хосте. Каждый исполнитель пишет не больше одного элемента
//! результата и никогда не пишет в чужую ячейку.

use super::element::Element;
use crate::device::geometry::WorkerId;

/// Имя ядра умножения в программе (C-строка для `clCreateKernel`)
pub const MATRIX_MULT_KERNEL_NAME: &str = "matrix_mult\0";
/// Имя ядра транспонирования в программе
pub const MATRIX_TRANSPOSE_KERNEL_NAME: &str = "matrix_transpose\0";

/// Исходный код ядер; тип элемента задается при сборке через `-D ELEMENT=...`
pub static MATRIX_KERNELS: &str = r#"
#pragma OPENCL FP_CONTRACT OFF

#ifndef ELEMENT
#error "ELEMENT must be defined at build time"
#endif

__kernel void matrix_mult(
    __global ELEMENT* out,
    __global const ELEMENT* a,
    const int h_a,
    const int w_a,
    __global const ELEMENT* b,
    const int w_b
) {
    const int i = get_group_id(0) * get_local_size(0) + get_local_id(0);
    const int j = get_group_id(1) * get_local_size(1) + get_local_id(1);

    // Лишние исполнители на краю сетки ничего не делают
    if (i >= h_a || j >= w_b) return;

    ELEMENT sum = 0;
    for (int k = 0; k < w_a; k++) {
        sum += a[i * w_a + k] * b[k * w_b + j];
    }
    out[i * w_b + j] = sum;
}

__kernel void matrix_transpose(
    __global ELEMENT* out,
    __global const ELEMENT* in,
    const int width
) {
    const int x = get_group_id(0) * get_local_size(0) + get_local_id(0);
    const int y = get_group_id(1) * get_local_size(1) + get_local_id(1);

    if (x >= width || y >= width) return;

    out[y * width + x] = in[x * width + y];
}
"#;

/// Размерности умножения: A имеет размер `h_a x w_a`, B `w_a x w_b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplyDims {
    pub h_a: usize,
    pub w_a: usize,
    pub w_b: usize,
}

impl MultiplyDims {
    pub fn output_len(&self) -> usize {
        self.h_a * self.w_b
    }
}

/// Запись одного исполнителя: индекс в выходном буфере и значение
pub type KernelWrite<T> = Option<(usize, T)>;

/// Тело ядра умножения для одного исполнителя
pub fn matrix_mult_worker<T: Element>(
    worker: WorkerId,
    a: &[T],
    b: &[T],
    dims: MultiplyDims,
) -> KernelWrite<T> {
    let coord = worker.global();
    let (i, j) = (coord.x, coord.y);
    if i >= dims.h_a || j >= dims.w_b {
        return None;
    }

    let mut sum = T::default();
    for k in 0..dims.w_a {
        sum = T::accumulate(sum, a[i * dims.w_a + k], b[k * dims.w_b + j]);
    }
    Some((i * dims.w_b + j, sum))
}

/// Тело ядра транспонирования для одного исполнителя
pub fn matrix_transpose_worker<T: Element>(
    worker: WorkerId,
    input: &[T],
    width: usize,
) -> KernelWrite<T> {
    let coord = worker.global();
    let (x, y) = (coord.x, coord.y);
    if x >= width || y >= width {
        return None;
    }
    Some((y * width + x, input[x * width + y]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::geometry::Dim2;

    fn worker_at(x: usize, y: usize) -> WorkerId {
        WorkerId {
            block: Dim2::new(x, y),
            thread: Dim2::new(0, 0),
            block_dim: Dim2::new(1, 1),
        }
    }

    #[test]
    fn out_of_extent_workers_do_nothing() {
        let a = [1u64; 4];
        let dims = MultiplyDims { h_a: 2, w_a: 2, w_b: 2 };
        assert_eq!(matrix_mult_worker(worker_at(2, 0), &a, &a, dims), None);
        assert_eq!(matrix_mult_worker(worker_at(0, 2), &a, &a, dims), None);
        assert_eq!(matrix_transpose_worker(worker_at(0, 2), &a, 2), None);
    }

    #[test]
    fn first_element_of_indexed_four_by_four() {
        let m: Vec<u64> = (0..16).map(u64::from_index).collect();
        let dims = MultiplyDims { h_a: 4, w_a: 4, w_b: 4 };
        assert_eq!(matrix_mult_worker(worker_at(0, 0), &m, &m, dims), Some((0, 5600)));
    }

    #[test]
    fn transpose_worker_swaps_coordinates() {
        let m: Vec<u64> = (0..9).collect();
        assert_eq!(matrix_transpose_worker(worker_at(0, 2), &m, 3), Some((6, 2)));
        assert_eq!(matrix_transpose_worker(worker_at(1, 1), &m, 3), Some((4, 4)));
    }

    #[test]
    fn source_defines_both_entry_points() {
        for name in [MATRIX_MULT_KERNEL_NAME, MATRIX_TRANSPOSE_KERNEL_NAME] {
            let bare = name.trim_end_matches('\0');
            assert!(MATRIX_KERNELS.contains(&format!("__kernel void {}(", bare)));
        }
    }
}
