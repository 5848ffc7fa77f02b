//! Модуль для работы с OpenCL
//!
//! Содержит низкоуровневые привязки и безопасные обертки для OpenCL

pub mod bindings;
pub mod callbacks;
pub mod context;
pub mod types;
pub mod utils;

pub use context::{ClBuffer, ClDevice};
