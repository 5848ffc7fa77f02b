//! Типы элементов матриц: 64-битные беззнаковые целые и 32-битные числа с плавающей точкой

use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt::{Debug, Display};
use std::str::FromStr;

/// Числовой тип элемента матрицы
///
/// Один запуск работает ровно с одним типом элементов. Тип определяет
/// имя типа в OpenCL C, шаг накопления скалярного произведения и допуск
/// при сравнении результатов устройства и CPU.
pub trait Element:
    Copy + Default + PartialEq + Debug + Display + FromStr + Send + Sync + 'static
{
    /// Имя типа для отчетов и CLI
    const NAME: &'static str;
    /// Соответствующий тип OpenCL C (подставляется в `-D ELEMENT=...`)
    const CL_TYPE: &'static str;
    /// Допустимая абсолютная разница при сравнении; 0 означает точное равенство
    const TOLERANCE: f64;

    fn one() -> Self;

    /// Один шаг накопления: `acc + a * b`, без FMA
    fn accumulate(acc: Self, a: Self, b: Self) -> Self;

    /// Значение синтетического элемента с линейным индексом `index`
    fn from_index(index: usize) -> Self;

    fn abs_diff(a: Self, b: Self) -> f64;

    /// Элемент считается расхождением, если разница превышает допуск
    fn mismatch(device: Self, reference: Self) -> bool {
        Self::abs_diff(device, reference) > Self::TOLERANCE
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Нормально распределенное значение; `None`, если тип его не поддерживает
    fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> Option<Self>;

    /// Текстовое представление для дампа (`%ld` / `%f`)
    fn format(&self) -> String;
}

impl Element for u64 {
    const NAME: &'static str = "u64";
    const CL_TYPE: &'static str = "ulong";
    const TOLERANCE: f64 = 0.0;

    fn one() -> Self {
        1
    }

    fn accumulate(acc: Self, a: Self, b: Self) -> Self {
        // ulong в OpenCL переполняется по модулю 2^64, так же и здесь
        acc.wrapping_add(a.wrapping_mul(b))
    }

    fn from_index(index: usize) -> Self {
        (index as u64).wrapping_mul(10)
    }

    fn abs_diff(a: Self, b: Self) -> f64 {
        a.abs_diff(b) as f64
    }

    fn mismatch(device: Self, reference: Self) -> bool {
        device != reference
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen_range(0..1024)
    }

    fn standard_normal<R: Rng + ?Sized>(_rng: &mut R) -> Option<Self> {
        None
    }

    fn format(&self) -> String {
        format!("{}", self)
    }
}

impl Element for f32 {
    const NAME: &'static str = "f32";
    const CL_TYPE: &'static str = "float";
    const TOLERANCE: f64 = 1.0e-6;

    fn one() -> Self {
        1.0
    }

    fn accumulate(acc: Self, a: Self, b: Self) -> Self {
        acc + a * b
    }

    fn from_index(index: usize) -> Self {
        index as f32 * 10.0
    }

    fn abs_diff(a: Self, b: Self) -> f64 {
        (f64::from(a) - f64::from(b)).abs()
    }

    fn mismatch(device: Self, reference: Self) -> bool {
        // NaN на любой из сторон тоже расхождение
        !(Self::abs_diff(device, reference) <= Self::TOLERANCE)
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen_range(0.0..1.0)
    }

    fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> Option<Self> {
        Some(rng.sample(StandardNormal))
    }

    fn format(&self) -> String {
        format!("{:.6}", self)
    }
}
