//! Вспомогательные функции для запросов к OpenCL

use super::bindings::OpenClApi;
use super::types::*;
use crate::cl_check;
use crate::error::DeviceError;
use std::ffi::c_void;
use std::ptr;

/// Читает строковый параметр устройства (`CL_DEVICE_NAME` и т.п.)
pub fn device_info_string(
    api: &OpenClApi,
    device: cl_device_id,
    param: cl_device_info,
) -> Result<String, DeviceError> {
    let mut size = 0usize;
    cl_check!(api, clGetDeviceInfo(device, param, 0, ptr::null_mut(), &mut size))?;

    let mut bytes = vec![0u8; size];
    cl_check!(
        api,
        clGetDeviceInfo(device, param, size, bytes.as_mut_ptr() as *mut c_void, ptr::null_mut())
    )?;
    Ok(from_c_bytes(&bytes))
}

/// Читает скалярный параметр устройства фиксированного размера
pub fn device_info_scalar<T: Copy + Default>(
    api: &OpenClApi,
    device: cl_device_id,
    param: cl_device_info,
) -> Result<T, DeviceError> {
    let mut value = T::default();
    cl_check!(
        api,
        clGetDeviceInfo(
            device,
            param,
            std::mem::size_of::<T>(),
            &mut value as *mut T as *mut c_void,
            ptr::null_mut()
        )
    )?;
    Ok(value)
}

/// Лог сборки программы для устройства
pub fn program_build_log(
    api: &OpenClApi,
    program: cl_program,
    device: cl_device_id,
) -> Result<String, DeviceError> {
    let mut log_size = 0usize;
    cl_check!(
        api,
        clGetProgramBuildInfo(
            program,
            device,
            CL_PROGRAM_BUILD_LOG,
            0,
            ptr::null_mut(),
            &mut log_size
        )
    )?;

    let mut log = vec![0u8; log_size];
    cl_check!(
        api,
        clGetProgramBuildInfo(
            program,
            device,
            CL_PROGRAM_BUILD_LOG,
            log_size,
            log.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        )
    )?;
    Ok(from_c_bytes(&log))
}

/// Строка из буфера C с завершающим нулем (или без него)
pub fn from_c_bytes(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_bytes_stop_at_nul() {
        assert_eq!(from_c_bytes(b"Radeon RX\0garbage"), "Radeon RX");
        assert_eq!(from_c_bytes(b"no terminator "), "no terminator");
        assert_eq!(from_c_bytes(b""), "");
    }
}
