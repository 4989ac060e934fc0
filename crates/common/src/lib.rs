//! common - 通用类型和工具库

pub mod types;
pub mod value;

pub use types::*;
pub use value::*;
