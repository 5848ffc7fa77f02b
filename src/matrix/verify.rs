//! Сравнение результатов устройства с эталоном CPU

use super::element::Element;
use super::types::Matrix;
use crate::error::MatrixError;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Итог поэлементного сравнения
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VerificationReport {
    /// Число различающихся элементов; 0 означает PASS
    pub mismatches: usize,
    pub total: usize,
    /// Максимальная абсолютная разница среди расхождений
    pub max_abs_diff: f64,
    pub tolerance: f64,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }

    /// Строка вердикта в формате исходных программ
    pub fn verdict(&self) -> String {
        if self.passed() {
            "PASSED!".to_string()
        } else {
            format!("FAILED: {} errors", self.mismatches)
        }
    }
}

/// Сравнивает результаты GPU и CPU вычислений
///
/// Целые сравниваются точно, числа с плавающей точкой с допуском
/// [`Element::TOLERANCE`].
pub fn compare_results<T: Element>(
    device: &Matrix<T>,
    reference: &Matrix<T>,
) -> Result<VerificationReport, MatrixError> {
    if device.height() != reference.height() || device.width() != reference.width() {
        return Err(MatrixError::ShapeMismatch {
            height: reference.height(),
            width: reference.width(),
            len: device.len(),
        });
    }

    let mut mismatches = 0;
    let mut max_abs_diff = 0.0f64;
    for (idx, (&got, &want)) in device.as_slice().iter().zip(reference.as_slice()).enumerate() {
        if T::mismatch(got, want) {
            if mismatches == 0 {
                debug!(
                    "первое расхождение: [{}][{}] устройство={} эталон={}",
                    idx / reference.width().max(1),
                    idx % reference.width().max(1),
                    got,
                    want
                );
            }
            mismatches += 1;
            let diff = T::abs_diff(got, want);
            if diff.is_nan() {
                max_abs_diff = f64::NAN;
            } else if !max_abs_diff.is_nan() {
                max_abs_diff = max_abs_diff.max(diff);
            }
        }
    }

    let report = VerificationReport {
        mismatches,
        total: reference.len(),
        max_abs_diff,
        tolerance: T::TOLERANCE,
    };
    if report.passed() {
        info!("результаты устройства и CPU совпадают ({} элементов)", report.total);
    } else {
        warn!(
            "обнаружены расхождения: {} из {}, максимальная разница {}",
            report.mismatches, report.total, report.max_abs_diff
        );
    }
    Ok(report)
}
