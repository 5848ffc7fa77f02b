//! Типы матриц и связанные структуры

use super::element::Element;
use crate::error::MatrixError;
use clap::ValueEnum;
use serde::Serialize;

/// Плотная матрица в построчном (row-major) порядке
///
/// Высота и ширина задаются при создании и больше не меняются;
/// длина буфера всегда равна `height * width`. Буфер принадлежит
/// матрице и освобождается вместе с ней.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    height: usize,
    width: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Оборачивает готовый буфер, проверяя его длину
    pub fn from_vec(height: usize, width: usize, data: Vec<T>) -> Result<Self, MatrixError> {
        if height.checked_mul(width) != Some(data.len()) {
            return Err(MatrixError::ShapeMismatch {
                height,
                width,
                len: data.len(),
            });
        }
        Ok(Self { height, width, data })
    }

    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![T::default(); height * width],
        }
    }

    /// Строит матрицу, вызывая `f(row, col)` для каждого элемента
    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self { height, width, data }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_square(&self) -> bool {
        self.height == self.width
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn require_square(&self) -> Result<usize, MatrixError> {
        if self.is_square() {
            Ok(self.width)
        } else {
            Err(MatrixError::NotSquare {
                height: self.height,
                width: self.width,
            })
        }
    }
}

/// Тип синтетических матриц для вычислений
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixType {
    /// A = B, элемент равен индексу, умноженному на 10
    Indexed,
    /// A заполнена единицами, B двойками
    OnesAndTwos,
    /// A как в `Indexed`, B нулевая
    Zeros,
    /// A как в `Indexed`, B единичная
    Identity,
    /// Случайные значения (равномерное распределение)
    Random,
    /// Случайные значения N(0, 1), только для f32
    Normal,
}

impl MatrixType {
    pub fn name(self) -> &'static str {
        match self {
            MatrixType::Indexed => "indexed",
            MatrixType::OnesAndTwos => "ones-and-twos",
            MatrixType::Zeros => "zeros",
            MatrixType::Identity => "identity",
            MatrixType::Random => "random",
            MatrixType::Normal => "normal",
        }
    }
}
