//! Модуль для работы с матрицами
//!
//! Предоставляет:
//! - Тип матрицы и типы элементов
//! - Эталонные операции на CPU
//! - Ядра для устройства
//! - Сравнение результатов
//! - Чтение и печать матриц

mod element;
mod types;
pub mod io;
pub mod kernels;
pub mod operations;
pub mod verify;

pub use element::Element;
pub use operations::{
    cpu_matrix_multiply, cpu_matrix_multiply_with_progress, cpu_matrix_transpose,
    initialize_matrices,
};
pub use types::{Matrix, MatrixType};
pub use verify::{compare_results, VerificationReport};
