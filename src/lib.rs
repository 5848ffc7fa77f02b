//! OpenCL-ускоренное умножение и транспонирование матриц с проверкой по эталону CPU

pub mod config;
pub mod device;
pub mod error;
pub mod matrix;
pub mod opencl;
pub mod orchestrator;
pub mod runner;
pub mod utils;

// Реэкспортируем макросы на уровень крейта
#[macro_use]
mod macros {
    /// Макрос для обработки ошибок OpenCL (коды возврата)
    ///
    /// `cl_check!(api, clFinish(queue))` вызывает функцию из загруженного
    /// API и превращает ненулевой код в [`crate::error::DeviceError::Api`].
    #[macro_export]
    macro_rules! cl_check {
        ($api:expr, $func:ident($($arg:expr),* $(,)?)) => {{
            // SAFETY: аргументы соответствуют сигнатуре функции из cl.h
            let code = unsafe { ($api.$func)($($arg),*) };
            if code != $crate::opencl::types::CL_SUCCESS {
                Err($crate::error::DeviceError::Api {
                    call: stringify!($func),
                    code,
                })
            } else {
                Ok(())
            }
        }};
    }

    /// Макрос для функций OpenCL, создающих объекты
    ///
    /// Последний аргумент `errcode_ret` добавляется сам; ненулевой код
    /// или нулевой дескриптор дают ошибку.
    #[macro_export]
    macro_rules! cl_create {
        ($api:expr, $func:ident($($arg:expr),* $(,)?)) => {{
            let mut errcode: $crate::opencl::types::cl_int = $crate::opencl::types::CL_SUCCESS;
            // SAFETY: аргументы соответствуют сигнатуре функции из cl.h
            let obj = unsafe { ($api.$func)($($arg,)* &mut errcode) };
            if errcode != $crate::opencl::types::CL_SUCCESS {
                Err($crate::error::DeviceError::Api {
                    call: stringify!($func),
                    code: errcode,
                })
            } else if obj.is_null() {
                Err($crate::error::DeviceError::NullHandle {
                    call: stringify!($func),
                })
            } else {
                Ok(obj)
            }
        }};
    }
}

// Реэкспорт основных типов для удобства
pub use config::{BackendKind, ElementKind, Operation, RunConfig};
pub use device::{Device, DeviceInfo, HostDevice};
pub use error::{ConfigError, DeviceError, MatrixError, TransferError};
pub use matrix::{Element, Matrix, MatrixType, VerificationReport};
pub use orchestrator::TransferOrchestrator;
