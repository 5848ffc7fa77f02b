//! Безопасные обертки над контекстом, программой и буферами OpenCL

use super::bindings::OpenClApi;
use super::callbacks::log_context_error;
use super::types::*;
use super::utils::{device_info_scalar, device_info_string, program_build_log};
use crate::device::geometry::LaunchGeometry;
use crate::device::{Device, DeviceInfo};
use crate::error::DeviceError;
use crate::matrix::kernels::{
    MultiplyDims, MATRIX_KERNELS, MATRIX_MULT_KERNEL_NAME, MATRIX_TRANSPOSE_KERNEL_NAME,
};
use crate::matrix::Element;
use crate::{cl_check, cl_create};
use std::cell::RefCell;
use std::ffi::{c_char, c_void};
use std::marker::PhantomData;
use std::ptr;
use tracing::{debug, info, warn};

/// Буфер в памяти устройства; освобождается в `Drop`
pub struct ClBuffer<T> {
    api: &'static OpenClApi,
    mem: cl_mem,
    len: usize,
    _marker: PhantomData<T>,
}

impl<T> ClBuffer<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn bytes(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    fn check_len(&self, len: usize) -> Result<(), DeviceError> {
        if self.len != len {
            return Err(DeviceError::SizeMismatch {
                expected: self.len,
                actual: len,
            });
        }
        Ok(())
    }
}

impl<T> Drop for ClBuffer<T> {
    fn drop(&mut self) {
        if let Err(e) = cl_check!(self.api, clReleaseMemObject(self.mem)) {
            warn!("не удалось освободить буфер: {}", e);
        }
    }
}

/// Скомпилированная программа для одного типа элементов
struct ClProgram {
    api: &'static OpenClApi,
    element: &'static str,
    program: cl_program,
    mult: cl_kernel,
    transpose: cl_kernel,
}

impl Drop for ClProgram {
    fn drop(&mut self) {
        for kernel in [self.mult, self.transpose] {
            if !kernel.is_null() {
                let _ = cl_check!(self.api, clReleaseKernel(kernel));
            }
        }
        let _ = cl_check!(self.api, clReleaseProgram(self.program));
    }
}

/// OpenCL устройство: контекст, очередь команд и программы ядер
///
/// Очередь упорядоченная, все копирования блокирующие, после запуска
/// ядра вызывается `clFinish`.
pub struct ClDevice {
    api: &'static OpenClApi,
    device: cl_device_id,
    context: cl_context,
    command_queue: cl_command_queue,
    programs: RefCell<Vec<ClProgram>>,
    info: DeviceInfo,
}

impl ClDevice {
    /// Открывает первое устройство первой платформы (GPU, если есть)
    pub fn open() -> Result<Self, DeviceError> {
        let api = OpenClApi::load()?;

        let mut platform: cl_platform_id = ptr::null_mut();
        let mut num_platforms: cl_uint = 0;
        match cl_check!(api, clGetPlatformIDs(1, &mut platform, &mut num_platforms)) {
            Err(DeviceError::Api { code: CL_PLATFORM_NOT_FOUND_KHR, .. }) => {
                return Err(DeviceError::NoPlatform)
            }
            result => result?,
        }
        if num_platforms == 0 || platform.is_null() {
            return Err(DeviceError::NoPlatform);
        }

        let device = Self::pick_device(api, platform)?;
        let info = Self::query_info(api, device)?;
        info!("OpenCL устройство: {}", info);

        let context = cl_create!(
            api,
            clCreateContext(ptr::null(), 1, &device, Some(log_context_error), ptr::null_mut())
        )?;
        let command_queue = match cl_create!(api, clCreateCommandQueue(context, device, 0)) {
            Ok(queue) => queue,
            Err(e) => {
                let _ = cl_check!(api, clReleaseContext(context));
                return Err(e);
            }
        };

        Ok(Self {
            api,
            device,
            context,
            command_queue,
            programs: RefCell::new(Vec::new()),
            info,
        })
    }

    fn pick_device(api: &OpenClApi, platform: cl_platform_id) -> Result<cl_device_id, DeviceError> {
        for device_type in [CL_DEVICE_TYPE_GPU, CL_DEVICE_TYPE_ALL] {
            let mut device: cl_device_id = ptr::null_mut();
            let mut num_devices: cl_uint = 0;
            match cl_check!(
                api,
                clGetDeviceIDs(platform, device_type, 1, &mut device, &mut num_devices)
            ) {
                Ok(()) if num_devices > 0 && !device.is_null() => return Ok(device),
                Ok(()) | Err(DeviceError::Api { code: CL_DEVICE_NOT_FOUND, .. }) => {
                    debug!("нет устройств типа {:#x}", device_type);
                }
                Err(e) => return Err(e),
            }
        }
        Err(DeviceError::NoDevice)
    }

    fn query_info(api: &OpenClApi, device: cl_device_id) -> Result<DeviceInfo, DeviceError> {
        Ok(DeviceInfo {
            name: device_info_string(api, device, CL_DEVICE_NAME)?,
            vendor: device_info_string(api, device, CL_DEVICE_VENDOR)?,
            backend: "opencl",
            compute_units: device_info_scalar::<cl_uint>(api, device, CL_DEVICE_MAX_COMPUTE_UNITS)?,
            max_work_group_size: device_info_scalar::<usize>(
                api,
                device,
                CL_DEVICE_MAX_WORK_GROUP_SIZE,
            )?,
            global_mem_bytes: device_info_scalar::<cl_ulong>(
                api,
                device,
                CL_DEVICE_GLOBAL_MEM_SIZE,
            )?,
        })
    }

    /// Ядра для типа `T`; программа собирается при первом обращении
    fn kernels_for<T: Element>(&self) -> Result<(cl_kernel, cl_kernel), DeviceError> {
        if let Some(p) = self.programs.borrow().iter().find(|p| p.element == T::CL_TYPE) {
            return Ok((p.mult, p.transpose));
        }
        let program = self.build_program(T::CL_TYPE)?;
        let kernels = (program.mult, program.transpose);
        self.programs.borrow_mut().push(program);
        Ok(kernels)
    }

    fn build_program(&self, element: &'static str) -> Result<ClProgram, DeviceError> {
        info!("Компиляция OpenCL программы для ELEMENT={}...", element);
        let api = self.api;
        let source = MATRIX_KERNELS.as_ptr() as *const c_char;
        let source_len = MATRIX_KERNELS.len();
        let program = cl_create!(
            api,
            clCreateProgramWithSource(self.context, 1, &source, &source_len)
        )?;
        let mut built = ClProgram {
            api,
            element,
            program,
            mult: ptr::null_mut(),
            transpose: ptr::null_mut(),
        };

        let options = format!("-D ELEMENT={}\0", element);
        if let Err(e) = cl_check!(
            api,
            clBuildProgram(
                program,
                1,
                &self.device,
                options.as_ptr() as *const c_char,
                None,
                ptr::null_mut()
            )
        ) {
            let log = program_build_log(api, program, self.device).unwrap_or_default();
            return Err(match e {
                DeviceError::Api {
                    code: CL_BUILD_PROGRAM_FAILURE,
                    ..
                } => DeviceError::BuildFailed { log },
                other => {
                    warn!("лог компиляции: {}", log);
                    other
                }
            });
        }

        built.mult = cl_create!(
            api,
            clCreateKernel(program, MATRIX_MULT_KERNEL_NAME.as_ptr() as *const c_char)
        )?;
        built.transpose = cl_create!(
            api,
            clCreateKernel(program, MATRIX_TRANSPOSE_KERNEL_NAME.as_ptr() as *const c_char)
        )?;
        Ok(built)
    }

    fn set_arg<V>(&self, kernel: cl_kernel, index: cl_uint, value: &V) -> Result<(), DeviceError> {
        cl_check!(
            self.api,
            clSetKernelArg(
                kernel,
                index,
                std::mem::size_of::<V>(),
                value as *const V as *const c_void
            )
        )
    }

    /// Запуск ядра на двумерной сетке и ожидание его завершения
    fn enqueue(&self, kernel: cl_kernel, geometry: &LaunchGeometry) -> Result<(), DeviceError> {
        let global = geometry.global_size();
        let global_size = [global.x, global.y];
        let local_size = [geometry.block.x, geometry.block.y];
        cl_check!(
            self.api,
            clEnqueueNDRangeKernel(
                self.command_queue,
                kernel,
                2,
                ptr::null(),
                global_size.as_ptr(),
                local_size.as_ptr(),
                0,
                ptr::null(),
                ptr::null_mut()
            )
        )?;
        cl_check!(self.api, clFinish(self.command_queue))
    }
}

fn kernel_int(value: usize) -> Result<cl_int, DeviceError> {
    cl_int::try_from(value).map_err(|_| DeviceError::TooLarge { value })
}

/// Индексы ядра `row * cols + col` считаются в int: вся матрица должна в него помещаться
fn check_kernel_extent(rows: usize, cols: usize) -> Result<(), DeviceError> {
    kernel_int(rows.saturating_mul(cols)).map(drop)
}

impl Device for ClDevice {
    type Buffer<T: Element> = ClBuffer<T>;

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc<T: Element>(&self, len: usize) -> Result<ClBuffer<T>, DeviceError> {
        let bytes = len * std::mem::size_of::<T>();
        let mem = cl_create!(
            self.api,
            clCreateBuffer(self.context, CL_MEM_READ_WRITE, bytes, ptr::null_mut())
        )?;
        Ok(ClBuffer {
            api: self.api,
            mem,
            len,
            _marker: PhantomData,
        })
    }

    fn write<T: Element>(&self, buffer: &mut ClBuffer<T>, src: &[T]) -> Result<(), DeviceError> {
        buffer.check_len(src.len())?;
        cl_check!(
            self.api,
            clEnqueueWriteBuffer(
                self.command_queue,
                buffer.mem,
                CL_TRUE,
                0,
                buffer.bytes(),
                src.as_ptr() as *const c_void,
                0,
                ptr::null(),
                ptr::null_mut()
            )
        )
    }

    fn read<T: Element>(&self, buffer: &ClBuffer<T>, dst: &mut [T]) -> Result<(), DeviceError> {
        buffer.check_len(dst.len())?;
        cl_check!(
            self.api,
            clEnqueueReadBuffer(
                self.command_queue,
                buffer.mem,
                CL_TRUE,
                0,
                buffer.bytes(),
                dst.as_mut_ptr() as *mut c_void,
                0,
                ptr::null(),
                ptr::null_mut()
            )
        )
    }

    fn launch_multiply<T: Element>(
        &self,
        geometry: &LaunchGeometry,
        out: &mut ClBuffer<T>,
        a: &ClBuffer<T>,
        b: &ClBuffer<T>,
        dims: MultiplyDims,
    ) -> Result<(), DeviceError> {
        a.check_len(dims.h_a * dims.w_a)?;
        b.check_len(dims.w_a * dims.w_b)?;
        out.check_len(dims.output_len())?;
        check_kernel_extent(dims.h_a, dims.w_a)?;
        check_kernel_extent(dims.w_a, dims.w_b)?;
        check_kernel_extent(dims.h_a, dims.w_b)?;
        let (kernel, _) = self.kernels_for::<T>()?;

        self.set_arg(kernel, 0, &out.mem)?;
        self.set_arg(kernel, 1, &a.mem)?;
        self.set_arg(kernel, 2, &kernel_int(dims.h_a)?)?;
        self.set_arg(kernel, 3, &kernel_int(dims.w_a)?)?;
        self.set_arg(kernel, 4, &b.mem)?;
        self.set_arg(kernel, 5, &kernel_int(dims.w_b)?)?;

        debug!("запуск matrix_mult: {}", geometry);
        self.enqueue(kernel, geometry)
    }

    fn launch_transpose<T: Element>(
        &self,
        geometry: &LaunchGeometry,
        out: &mut ClBuffer<T>,
        input: &ClBuffer<T>,
        width: usize,
    ) -> Result<(), DeviceError> {
        input.check_len(width * width)?;
        out.check_len(width * width)?;
        check_kernel_extent(width, width)?;
        let (_, kernel) = self.kernels_for::<T>()?;

        self.set_arg(kernel, 0, &out.mem)?;
        self.set_arg(kernel, 1, &input.mem)?;
        self.set_arg(kernel, 2, &kernel_int(width)?)?;

        debug!("запуск matrix_transpose: {}", geometry);
        self.enqueue(kernel, geometry)
    }
}

impl Drop for ClDevice {
    fn drop(&mut self) {
        debug!("Освобождение ресурсов OpenCL...");
        self.programs.get_mut().clear();
        let _ = cl_check!(self.api, clReleaseCommandQueue(self.command_queue));
        let _ = cl_check!(self.api, clReleaseContext(self.context));
    }
}
