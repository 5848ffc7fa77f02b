//! Операции над матрицами на CPU: эталонные умножение и транспонирование,
//! генерация синтетических операндов

use super::element::Element;
use super::types::{Matrix, MatrixType};
use crate::error::MatrixError;
use indicatif::ProgressBar;

/// Инициализирует матрицы заданного типа и размера
pub fn initialize_matrices<T: Element>(
    matrix_type: MatrixType,
    size: usize,
) -> Result<(Matrix<T>, Matrix<T>), MatrixError> {
    let indexed = || Matrix::from_fn(size, size, |r, c| T::from_index(r * size + c));
    let pair = match matrix_type {
        MatrixType::Indexed => {
            let a = indexed();
            let b = a.clone();
            (a, b)
        }
        MatrixType::OnesAndTwos => {
            let one = T::one();
            let two = T::accumulate(one, one, one);
            (
                Matrix::from_fn(size, size, |_, _| one),
                Matrix::from_fn(size, size, |_, _| two),
            )
        }
        MatrixType::Zeros => (indexed(), Matrix::zeros(size, size)),
        MatrixType::Identity => (
            indexed(),
            Matrix::from_fn(size, size, |r, c| if r == c { T::one() } else { T::default() }),
        ),
        MatrixType::Random => {
            let mut rng = rand::thread_rng();
            let a = Matrix::from_fn(size, size, |_, _| T::random(&mut rng));
            let b = Matrix::from_fn(size, size, |_, _| T::random(&mut rng));
            (a, b)
        }
        MatrixType::Normal => {
            let mut rng = rand::thread_rng();
            let mut sample = || {
                (0..size * size)
                    .map(|_| T::standard_normal(&mut rng))
                    .collect::<Option<Vec<T>>>()
            };
            match (sample(), sample()) {
                (Some(a), Some(b)) => (
                    Matrix::from_vec(size, size, a)?,
                    Matrix::from_vec(size, size, b)?,
                ),
                _ => {
                    return Err(MatrixError::UnsupportedFill {
                        fill: matrix_type.name(),
                        element: T::NAME,
                    })
                }
            }
        }
    };
    Ok(pair)
}

/// Эталонное умножение над сырыми построчными буферами
///
/// Три вложенных цикла по возрастанию (i по строкам A, j по столбцам B,
/// k по общей размерности); порядок суммирования тот же, что в ядре.
pub fn matmul_reference<T: Element>(
    output: &mut [T],
    a: &[T],
    h_a: usize,
    w_a: usize,
    b: &[T],
    w_b: usize,
    progress: &ProgressBar,
) {
    for i in 0..h_a {
        for j in 0..w_b {
            let mut c = T::default();
            for k in 0..w_a {
                c = T::accumulate(c, a[i * w_a + k], b[k * w_b + j]);
            }
            output[i * w_b + j] = c;
        }
        progress.inc(1);
    }
}

/// CPU реализация матричного умножения
pub fn cpu_matrix_multiply<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
) -> Result<Matrix<T>, MatrixError> {
    cpu_matrix_multiply_with_progress(a, b, &ProgressBar::hidden())
}

/// То же, что [`cpu_matrix_multiply`], с прогрессом по строкам результата
pub fn cpu_matrix_multiply_with_progress<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    progress: &ProgressBar,
) -> Result<Matrix<T>, MatrixError> {
    if a.width() != b.height() {
        return Err(MatrixError::DimensionMismatch {
            width_a: a.width(),
            height_b: b.height(),
        });
    }
    let (h_a, w_a, w_b) = (a.height(), a.width(), b.width());
    let mut output = vec![T::default(); h_a * w_b];

    progress.set_length(h_a as u64);
    matmul_reference(&mut output, a.as_slice(), h_a, w_a, b.as_slice(), w_b, progress);
    progress.finish_and_clear();

    Matrix::from_vec(h_a, w_b, output)
}

/// CPU реализация транспонирования квадратной матрицы
pub fn cpu_matrix_transpose<T: Element>(input: &Matrix<T>) -> Result<Matrix<T>, MatrixError> {
    let width = input.require_square()?;
    let src = input.as_slice();
    let mut output = vec![T::default(); width * width];
    for j in 0..width {
        for i in 0..width {
            output[i * width + j] = src[j * width + i];
        }
    }
    Matrix::from_vec(width, width, output)
}
