//! arc-cqrs-core - CQRS 核心库
//!
//! 命令/查询上下文、过滤器链、handler 解析、响应值处理、管道

mod authorization;
mod bus;
mod command;
mod command_pipeline;
mod context;
mod filters;
mod providers;
mod query;
mod query_pipeline;
mod response;
mod result;
mod validation;

pub use authorization::*;
pub use bus::*;
pub use command::*;
pub use command_pipeline::*;
pub use context::*;
pub use filters::*;
pub use providers::*;
pub use query::*;
pub use query_pipeline::*;
pub use response::*;
pub use result::*;
pub use validation::*;
