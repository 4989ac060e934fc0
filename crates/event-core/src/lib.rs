//! arc-event-core - 事件核心库
//!
//! 事件类型、事件源 ID、事件日志，以及把 handler 返回的事件追加到日志的响应值处理器

mod domain_event;
mod event_log;
mod event_source;
mod event_types;
mod response_handlers;

pub use domain_event::*;
pub use event_log::*;
pub use event_source::*;
pub use event_types::*;
pub use response_handlers::*;
