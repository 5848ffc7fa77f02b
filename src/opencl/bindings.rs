//! Низкоуровневые привязки к OpenCL API
//!
//! Точки входа загружаются из системной библиотеки OpenCL во время
//! выполнения, так что крейт собирается и работает на машинах без
//! установленного ICD; без библиотеки доступен только эмулятор.

use super::callbacks::ContextNotifyCallback;
use super::types::*;
use crate::error::DeviceError;
use libloading::{Library, Symbol};
use std::ffi::{c_char, c_void};
use std::sync::OnceLock;

/// Колбэк завершения сборки программы (не используется, всегда `None`)
pub type BuildNotifyCallback =
    Option<unsafe extern "C" fn(program: cl_program, user_data: *mut c_void)>;

#[cfg(target_os = "linux")]
const LIBRARY_NAMES: &[&str] = &["libOpenCL.so.1", "libOpenCL.so"];
#[cfg(target_os = "windows")]
const LIBRARY_NAMES: &[&str] = &["OpenCL.dll"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["/System/Library/Frameworks/OpenCL.framework/OpenCL"];
#[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
const LIBRARY_NAMES: &[&str] = &["libOpenCL.so"];

/// Загруженные функции OpenCL
///
/// Указатели действительны, пока жива `_library`; структура хранится в
/// статической переменной и не выгружается.
#[allow(non_snake_case)]
pub struct OpenClApi {
    pub clGetPlatformIDs: unsafe extern "C" fn(
        num_entries: cl_uint,
        platforms: *mut cl_platform_id,
        num_platforms: *mut cl_uint,
    ) -> cl_int,

    pub clGetDeviceIDs: unsafe extern "C" fn(
        platform: cl_platform_id,
        device_type: cl_device_type,
        num_entries: cl_uint,
        devices: *mut cl_device_id,
        num_devices: *mut cl_uint,
    ) -> cl_int,

    pub clGetDeviceInfo: unsafe extern "C" fn(
        device: cl_device_id,
        param_name: cl_device_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int,

    pub clCreateContext: unsafe extern "C" fn(
        properties: *const cl_context_properties,
        num_devices: cl_uint,
        devices: *const cl_device_id,
        pfn_notify: ContextNotifyCallback,
        user_data: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_context,

    pub clCreateCommandQueue: unsafe extern "C" fn(
        context: cl_context,
        device: cl_device_id,
        properties: cl_command_queue_properties,
        errcode_ret: *mut cl_int,
    ) -> cl_command_queue,

    pub clCreateProgramWithSource: unsafe extern "C" fn(
        context: cl_context,
        count: cl_uint,
        strings: *const *const c_char,
        lengths: *const usize,
        errcode_ret: *mut cl_int,
    ) -> cl_program,

    pub clBuildProgram: unsafe extern "C" fn(
        program: cl_program,
        num_devices: cl_uint,
        device_list: *const cl_device_id,
        options: *const c_char,
        pfn_notify: BuildNotifyCallback,
        user_data: *mut c_void,
    ) -> cl_int,

    pub clGetProgramBuildInfo: unsafe extern "C" fn(
        program: cl_program,
        device: cl_device_id,
        param_name: cl_program_build_info,
        param_value_size: usize,
        param_value: *mut c_void,
        param_value_size_ret: *mut usize,
    ) -> cl_int,

    pub clCreateKernel: unsafe extern "C" fn(
        program: cl_program,
        kernel_name: *const c_char,
        errcode_ret: *mut cl_int,
    ) -> cl_kernel,

    pub clSetKernelArg: unsafe extern "C" fn(
        kernel: cl_kernel,
        arg_index: cl_uint,
        arg_size: usize,
        arg_value: *const c_void,
    ) -> cl_int,

    pub clCreateBuffer: unsafe extern "C" fn(
        context: cl_context,
        flags: cl_mem_flags,
        size: usize,
        host_ptr: *mut c_void,
        errcode_ret: *mut cl_int,
    ) -> cl_mem,

    pub clEnqueueWriteBuffer: unsafe extern "C" fn(
        command_queue: cl_command_queue,
        buffer: cl_mem,
        blocking_write: cl_bool,
        offset: usize,
        size: usize,
        ptr: *const c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int,

    pub clEnqueueReadBuffer: unsafe extern "C" fn(
        command_queue: cl_command_queue,
        buffer: cl_mem,
        blocking_read: cl_bool,
        offset: usize,
        size: usize,
        ptr: *mut c_void,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int,

    pub clEnqueueNDRangeKernel: unsafe extern "C" fn(
        command_queue: cl_command_queue,
        kernel: cl_kernel,
        work_dim: cl_uint,
        global_work_offset: *const usize,
        global_work_size: *const usize,
        local_work_size: *const usize,
        num_events_in_wait_list: cl_uint,
        event_wait_list: *const cl_event,
        event: *mut cl_event,
    ) -> cl_int,

    pub clFinish: unsafe extern "C" fn(command_queue: cl_command_queue) -> cl_int,

    pub clReleaseMemObject: unsafe extern "C" fn(memobj: cl_mem) -> cl_int,
    pub clReleaseKernel: unsafe extern "C" fn(kernel: cl_kernel) -> cl_int,
    pub clReleaseProgram: unsafe extern "C" fn(program: cl_program) -> cl_int,
    pub clReleaseCommandQueue: unsafe extern "C" fn(command_queue: cl_command_queue) -> cl_int,
    pub clReleaseContext: unsafe extern "C" fn(context: cl_context) -> cl_int,

    _library: Library,
}

/// Причина, по которой библиотеку не удалось загрузить (запоминается навсегда)
#[derive(Debug, Clone)]
enum LoadFailure {
    NotFound,
    MissingSymbol(&'static str),
}

static API: OnceLock<Result<OpenClApi, LoadFailure>> = OnceLock::new();

impl OpenClApi {
    /// Загружает OpenCL один раз на процесс
    pub fn load() -> Result<&'static Self, DeviceError> {
        match API.get_or_init(Self::load_uncached) {
            Ok(api) => Ok(api),
            Err(LoadFailure::NotFound) => Err(DeviceError::LibraryNotFound {
                tried: LIBRARY_NAMES.join(", "),
            }),
            Err(LoadFailure::MissingSymbol(symbol)) => Err(DeviceError::MissingSymbol { symbol }),
        }
    }

    fn load_uncached() -> Result<Self, LoadFailure> {
        let library = LIBRARY_NAMES
            .iter()
            // SAFETY: загружается системная библиотека OpenCL ICD
            .find_map(|name| unsafe { Library::new(name) }.ok())
            .ok_or(LoadFailure::NotFound)?;

        macro_rules! load_sym {
            ($name:ident) => {
                symbol(&library, concat!(stringify!($name), "\0"), stringify!($name))?
            };
        }

        Ok(Self {
            clGetPlatformIDs: load_sym!(clGetPlatformIDs),
            clGetDeviceIDs: load_sym!(clGetDeviceIDs),
            clGetDeviceInfo: load_sym!(clGetDeviceInfo),
            clCreateContext: load_sym!(clCreateContext),
            clCreateCommandQueue: load_sym!(clCreateCommandQueue),
            clCreateProgramWithSource: load_sym!(clCreateProgramWithSource),
            clBuildProgram: load_sym!(clBuildProgram),
            clGetProgramBuildInfo: load_sym!(clGetProgramBuildInfo),
            clCreateKernel: load_sym!(clCreateKernel),
            clSetKernelArg: load_sym!(clSetKernelArg),
            clCreateBuffer: load_sym!(clCreateBuffer),
            clEnqueueWriteBuffer: load_sym!(clEnqueueWriteBuffer),
            clEnqueueReadBuffer: load_sym!(clEnqueueReadBuffer),
            clEnqueueNDRangeKernel: load_sym!(clEnqueueNDRangeKernel),
            clFinish: load_sym!(clFinish),
            clReleaseMemObject: load_sym!(clReleaseMemObject),
            clReleaseKernel: load_sym!(clReleaseKernel),
            clReleaseProgram: load_sym!(clReleaseProgram),
            clReleaseCommandQueue: load_sym!(clReleaseCommandQueue),
            clReleaseContext: load_sym!(clReleaseContext),
            _library: library,
        })
    }
}

/// Достает функцию `name` (C-строка) из библиотеки; тип задает вызывающий
fn symbol<F: Copy>(
    library: &Library,
    name: &'static str,
    short: &'static str,
) -> Result<F, LoadFailure> {
    // SAFETY: тип поля совпадает с сигнатурой функции из cl.h
    let sym: Symbol<'_, F> =
        unsafe { library.get(name.as_bytes()) }.map_err(|_| LoadFailure::MissingSymbol(short))?;
    Ok(*sym)
}
