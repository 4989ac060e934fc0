//! 命令响应值处理链
//!
//! handler 返回值先交给注册的响应值处理器，处理器可以把它转成副作用（例如追加事件）。
//! 没有任何处理器认领的值作为最终响应返回，不会被丢弃。

use std::sync::Arc;

use arc_common::AnyValue;
use arc_errors::AppResult;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{CommandContext, CommandResult, HandlerOutput};

/// 命令响应值处理器
#[async_trait]
pub trait CommandResponseValueHandler: Send + Sync {
    fn can_handle(&self, context: &CommandContext, value: &AnyValue) -> bool;

    async fn handle(&self, context: &CommandContext, value: &AnyValue) -> AppResult<CommandResult>;
}

/// 有序的响应值处理器链
#[derive(Clone, Default)]
pub struct CommandResponseValueHandlers {
    handlers: Vec<Arc<dyn CommandResponseValueHandler>>,
}

impl CommandResponseValueHandlers {
    pub fn new(handlers: Vec<Arc<dyn CommandResponseValueHandler>>) -> Self {
        Self { handlers }
    }

    pub fn push(&mut self, handler: Arc<dyn CommandResponseValueHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// `Pair` 的两个值从左到右分别分发
    pub async fn handle(
        &self,
        context: &CommandContext,
        output: HandlerOutput,
    ) -> AppResult<CommandResult> {
        let result = CommandResult::success(context.correlation_id);

        match output {
            HandlerOutput::None => Ok(result),
            HandlerOutput::Value(value) => {
                let (dispatched, claimed) = self.dispatch(context, &value).await?;
                let mut result = result.merged_with(Some(dispatched));
                if !claimed {
                    result.response = Some(value);
                }
                Ok(result)
            }
            HandlerOutput::Pair(first, second) => {
                let (first_result, first_claimed) = self.dispatch(context, &first).await?;
                let (second_result, second_claimed) = self.dispatch(context, &second).await?;
                let mut result = result
                    .merged_with(Some(first_result))
                    .merged_with(Some(second_result));

                let response = match (first_claimed, second_claimed) {
                    (true, true) => None,
                    (false, true) => Some(first),
                    (true, false) => Some(second),
                    (false, false) => {
                        warn!(
                            command = %context.command_type,
                            "Neither value of the handler output was claimed, responding with both"
                        );
                        Some(AnyValue::new((first, second)))
                    }
                };
                if response.is_some() {
                    result.response = response;
                }
                Ok(result)
            }
        }
    }

    /// 返回合并后的结果以及是否有处理器认领了该值
    async fn dispatch(
        &self,
        context: &CommandContext,
        value: &AnyValue,
    ) -> AppResult<(CommandResult, bool)> {
        let mut result = CommandResult::success(context.correlation_id);
        let mut claimed = false;

        for handler in &self.handlers {
            if !handler.can_handle(context, value) {
                continue;
            }

            claimed = true;
            let handled = match handler.handle(context, value).await {
                Ok(handled) => handled,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(value = value.type_name(), error = %err, "Response value handler failed");
                    CommandResult::failed(context.correlation_id, &err)
                }
            };
            result = result.merged_with(Some(handled));
        }

        debug!(value = value.type_name(), claimed, "Response value dispatched");
        Ok((result, claimed))
    }
}
