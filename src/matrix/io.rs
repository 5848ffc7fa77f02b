//! Чтение матриц из текстовых файлов и текстовый дамп
//!
//! Формат файла: десятичные числа через пробел, одна строка матрицы на
//! строку файла. Высота равна числу непустых строк, ширина равна числу чисел
//! в строке.

use super::element::Element;
use super::types::Matrix;
use crate::error::MatrixError;
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Читает матрицу из файла через отображение в память
pub fn read_matrix<T: Element>(path: &Path) -> Result<Matrix<T>, MatrixError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(MatrixError::Empty);
    }
    // SAFETY: отображение только читается, файл открыт на чтение
    let mmap = unsafe { Mmap::map(&file)? };
    let matrix = parse_matrix(&mmap[..])?;
    debug!(
        "прочитана матрица {}x{} из {}",
        matrix.height(),
        matrix.width(),
        path.display()
    );
    Ok(matrix)
}

/// Разбирает текст матрицы
///
/// Токен накапливается в растущем буфере, так что длина числа ничем не
/// ограничена. Строки с разным числом элементов дают [`MatrixError::Ragged`].
pub fn parse_matrix<T: Element>(bytes: &[u8]) -> Result<Matrix<T>, MatrixError> {
    let mut data = Vec::new();
    let mut width: Option<usize> = None;
    let mut height = 0;
    let mut row_len = 0;
    let mut token = Vec::new();

    // Завершающий '\n' закрывает последнюю строку, даже если его нет в файле
    for &byte in bytes.iter().chain(std::iter::once(&b'\n')) {
        if !byte.is_ascii_whitespace() {
            token.push(byte);
            continue;
        }
        if !token.is_empty() {
            data.push(parse_token::<T>(&token, data.len())?);
            token.clear();
            row_len += 1;
        }
        if byte == b'\n' && row_len > 0 {
            match width {
                None => width = Some(row_len),
                Some(expected) if expected != row_len => {
                    return Err(MatrixError::Ragged {
                        row: height,
                        expected,
                        found: row_len,
                    })
                }
                Some(_) => {}
            }
            height += 1;
            row_len = 0;
        }
    }

    match width {
        Some(width) => Matrix::from_vec(height, width, data),
        None => Err(MatrixError::Empty),
    }
}

fn parse_token<T: Element>(token: &[u8], position: usize) -> Result<T, MatrixError> {
    let text = String::from_utf8_lossy(token);
    text.parse::<T>().map_err(|_| MatrixError::Parse {
        token: text.into_owned(),
        position,
    })
}

/// Печатает матрицу: заголовок `высота, ширина`, затем по элементу на строку
pub fn write_matrix<T: Element, W: Write>(out: &mut W, matrix: &Matrix<T>) -> std::io::Result<()> {
    writeln!(out, "{}, {}", matrix.height(), matrix.width())?;
    for value in matrix.as_slice() {
        writeln!(out, "{}", value.format())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_and_columns() {
        let m: Matrix<u64> = parse_matrix(b"1 2 3\n4 5 6\n").unwrap();
        assert_eq!((m.height(), m.width()), (2, 3));
        assert_eq!(m.as_slice(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn tolerates_trailing_spaces_and_missing_final_newline() {
        let m: Matrix<f32> = parse_matrix(b"1.5 2 \n3 4.25").unwrap();
        assert_eq!((m.height(), m.width()), (2, 2));
        assert_eq!(m.as_slice(), &[1.5, 2.0, 3.0, 4.25]);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = parse_matrix::<u64>(b"1 2\n3\n").unwrap_err();
        assert!(matches!(err, MatrixError::Ragged { row: 1, expected: 2, found: 1 }));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(parse_matrix::<u64>(b"\n \n"), Err(MatrixError::Empty)));
    }

    #[test]
    fn rejects_garbage_token() {
        let err = parse_matrix::<u64>(b"1 x2\n").unwrap_err();
        assert!(matches!(err, MatrixError::Parse { position: 1, .. }));
    }

    #[test]
    fn long_tokens_are_not_truncated() {
        let mut text = "0".repeat(5000);
        text.push_str("7 1\n");
        let m: Matrix<u64> = parse_matrix(text.as_bytes()).unwrap();
        assert_eq!(m.as_slice(), &[7, 1]);
    }

    #[test]
    fn dump_format() {
        let m = Matrix::<f32>::from_vec(1, 2, vec![0.5, 10.0]).unwrap();
        let mut out = Vec::new();
        write_matrix(&mut out, &m).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1, 2\n0.500000\n10.000000\n");
    }

    #[test]
    fn reads_file_through_mmap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0 10\n20 30\n").unwrap();
        let m: Matrix<u64> = read_matrix(file.path()).unwrap();
        assert_eq!(m.get(1, 0), Some(20));
    }

    #[test]
    fn empty_file_rejected_before_mapping() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(read_matrix::<u64>(file.path()), Err(MatrixError::Empty)));
    }
}
