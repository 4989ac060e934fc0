//! arc-auth-core - 授权核心库
//!
//! Principal、请求上下文、授权标记以及授权评估器

mod evaluator;
mod evaluators;
mod markers;
mod principal;
mod request_context;

pub use evaluator::*;
pub use evaluators::*;
pub use markers::*;
pub use principal::*;
pub use request_context::*;
