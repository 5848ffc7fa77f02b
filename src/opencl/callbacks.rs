use std::ffi::{c_char, c_void, CStr};
use tracing::warn;

/// Тип callback-функции для контекста OpenCL
pub type ContextNotifyCallback = Option<
    unsafe extern "C" fn(
        errinfo: *const c_char,
        private_info: *const c_void,
        cb: usize,
        user_data: *mut c_void,
    )
>;

/// Пробрасывает асинхронные сообщения драйвера об ошибках в лог
pub unsafe extern "C" fn log_context_error(
    errinfo: *const c_char,
    _private_info: *const c_void,
    _cb: usize,
    _user_data: *mut c_void,
) {
    if errinfo.is_null() {
        return;
    }
    // SAFETY: драйвер передает C-строку, живущую на время вызова
    let message = unsafe { CStr::from_ptr(errinfo) };
    warn!("OpenCL контекст: {}", message.to_string_lossy());
}
