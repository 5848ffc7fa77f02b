//! Типы ошибок крейта

use thiserror::Error;

/// Ошибки устройства: загрузка OpenCL, выделение, копирование, запуск ядра
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("библиотека OpenCL не найдена (пробовали: {tried})")]
    LibraryNotFound { tried: String },

    #[error("в библиотеке OpenCL нет символа {symbol}")]
    MissingSymbol { symbol: &'static str },

    #[error("не найдено ни одной OpenCL платформы")]
    NoPlatform,

    #[error("не найдено ни одного OpenCL устройства")]
    NoDevice,

    #[error("{call} вернул код ошибки OpenCL {code}")]
    Api { call: &'static str, code: i32 },

    #[error("{call} вернул нулевой дескриптор")]
    NullHandle { call: &'static str },

    #[error("ошибка компиляции OpenCL программы:\n{log}")]
    BuildFailed { log: String },

    #[error("сбой устройства: запись за границу буфера (индекс {index}, длина {len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("размер {value} не помещается в аргумент ядра типа int")]
    TooLarge { value: usize },

    #[error("размер буфера не совпадает: ожидалось {expected} элементов, получено {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Ошибки построения и чтения матриц
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("длина буфера {len} не равна {height}x{width}")]
    ShapeMismatch { height: usize, width: usize, len: usize },

    #[error("ширина A ({width_a}) не совпадает с высотой B ({height_b})")]
    DimensionMismatch { width_a: usize, height_b: usize },

    #[error("ожидалась квадратная матрица, получено {height}x{width}")]
    NotSquare { height: usize, width: usize },

    #[error("не удалось разобрать число {token:?} (токен {position})")]
    Parse { token: String, position: usize },

    #[error("файл матрицы пуст")]
    Empty,

    #[error("строка {row}: ожидалось {expected} чисел, найдено {found}")]
    Ragged { row: usize, expected: usize, found: usize },

    #[error("тип заполнения {fill} не поддерживается для элементов {element}")]
    UnsupportedFill { fill: &'static str, element: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Ошибки конфигурации запуска
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ширина матрицы должна быть больше нуля")]
    ZeroWidth,

    #[error("матрица {width}x{width} не помещается в адресное пространство")]
    WidthTooLarge { width: usize },

    #[error("матрицы из файлов можно только перемножать")]
    FileOperandsMultiplyOnly,

    #[error("размер блока потоков должен быть больше нуля, получено {x}x{y}")]
    ZeroTile { x: usize, y: usize },

    #[error("блок {x}x{y} превышает максимальный размер рабочей группы ({max})")]
    TileTooLarge { x: usize, y: usize, max: usize },
}

/// Ошибки оркестратора пересылок: объединяет все, что может сорвать один запуск ядра
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
