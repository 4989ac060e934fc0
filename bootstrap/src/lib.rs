//! arc-bootstrap - 管道装配
//!
//! 显式注册 handler、performer、校验器、过滤器和授权标记，按配置构建命令/查询管道

mod builder;
mod runtime;

pub use builder::*;
pub use runtime::*;
