//! 命令管道
//!
//! ```text
//! CommandRequest
//!   ↓ 构造 CommandContext（上下文值提供者）
//!   ↓ 过滤器链（授权、校验……）        -> 不成功则返回
//!   ↓ 解析 handler                     -> 找不到则返回失败结果
//!   ↓ 已取消则返回失败结果，handler 不会被调用
//!   ↓ 解析依赖、修改上下文
//!   ↓ 调用 handler（当前命令上下文仅在此期间可见）
//!   ↓ 响应值处理链
//! CommandResult
//! ```

use std::sync::Arc;
use std::time::Instant;

use arc_errors::{AppError, AppResult};
use metrics::{counter, histogram};
use tracing::{Instrument, debug, info_span, warn};

use crate::context::with_current_command_context;
use crate::{
    CommandContext, CommandContextModifier, CommandContextValuesProvider, CommandFilters,
    CommandHandler, CommandHandlerProvider, CommandRequest, CommandResponseValueHandlers,
    CommandResult, DependencyResolver, ResultEnvelope,
};

pub struct CommandPipeline {
    filters: CommandFilters,
    handlers: Arc<dyn CommandHandlerProvider>,
    response_value_handlers: CommandResponseValueHandlers,
    values_providers: Vec<Arc<dyn CommandContextValuesProvider>>,
    modifiers: Vec<Arc<dyn CommandContextModifier>>,
    dependency_resolver: Option<Arc<dyn DependencyResolver>>,
}

impl CommandPipeline {
    pub fn new(
        filters: CommandFilters,
        handlers: Arc<dyn CommandHandlerProvider>,
        response_value_handlers: CommandResponseValueHandlers,
    ) -> Self {
        Self {
            filters,
            handlers,
            response_value_handlers,
            values_providers: Vec::new(),
            modifiers: Vec::new(),
            dependency_resolver: None,
        }
    }

    pub fn with_values_provider(mut self, provider: Arc<dyn CommandContextValuesProvider>) -> Self {
        self.values_providers.push(provider);
        self
    }

    pub fn with_modifier(mut self, modifier: Arc<dyn CommandContextModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_dependency_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.dependency_resolver = Some(resolver);
        self
    }

    /// 运行过滤器并检查 handler 是否存在，不调用 handler
    pub async fn validate(&self, request: CommandRequest) -> AppResult<CommandResult> {
        let span = info_span!(
            "validate_command",
            command = request.command.type_name(),
            correlation_id = %request.correlation_id
        );

        async move {
            let context = self.create_context(request);
            let result = self.filters.on_execution(&context).await?;

            if self.handlers.try_get_handler_for(&context).is_none() {
                return Ok(result.merged_with(Some(CommandResult::missing_handler(
                    context.correlation_id,
                    context.command_type.name,
                ))));
            }

            Ok(result)
        }
        .instrument(span)
        .await
    }

    pub async fn execute(&self, request: CommandRequest) -> AppResult<CommandResult> {
        let span = info_span!(
            "execute_command",
            command = request.command.type_name(),
            correlation_id = %request.correlation_id
        );

        async move {
            let start = Instant::now();
            let result = self.execute_in_span(request).await;

            let outcome = match &result {
                Ok(result) => outcome_label(result),
                Err(_) => "error",
            };
            counter!("commands_executed_total", "outcome" => outcome).increment(1);
            histogram!("command_execution_duration_ms").record(start.elapsed().as_millis() as f64);

            result
        }
        .instrument(span)
        .await
    }

    async fn execute_in_span(&self, request: CommandRequest) -> AppResult<CommandResult> {
        let mut context = self.create_context(request);

        let filter_result = self.filters.on_execution(&context).await?;
        if !filter_result.is_success() {
            debug!(
                authorized = filter_result.is_authorized,
                valid = filter_result.is_valid(),
                "Command rejected by filters"
            );
            return Ok(filter_result);
        }

        let Some(handler) = self.handlers.try_get_handler_for(&context) else {
            warn!(command = %context.command_type, "No handler found for command");
            return Ok(filter_result.merged_with(Some(CommandResult::missing_handler(
                context.correlation_id,
                context.command_type.name,
            ))));
        };

        if context.cancellation.is_cancelled() {
            debug!(command = %context.command_type, "Command cancelled before dispatch");
            return Ok(filter_result.merged_with(Some(CommandResult::failed(
                context.correlation_id,
                &AppError::Cancelled,
            ))));
        }

        let handled = match self.invoke(&mut context, handler).await {
            Ok(handled) => handled,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(command = %context.command_type, error = %err, "Command handler failed");
                CommandResult::failed(context.correlation_id, &err)
            }
        };

        Ok(filter_result.merged_with(Some(handled)))
    }

    async fn invoke(
        &self,
        context: &mut CommandContext,
        handler: Arc<dyn CommandHandler>,
    ) -> AppResult<CommandResult> {
        if let Some(resolver) = &self.dependency_resolver {
            let mut dependencies = resolver.resolve(context, handler.as_ref()).await?;
            if let Some(count) = handler.dependency_count() {
                dependencies.truncate(count);
            }
            context.dependencies = dependencies;
        }

        for modifier in &self.modifiers {
            modifier.modify(context)?;
        }

        let current = Arc::new(context.clone());
        let output = with_current_command_context(current.clone(), handler.handle(&current)).await?;

        self.response_value_handlers.handle(&current, output).await
    }

    fn create_context(&self, request: CommandRequest) -> CommandContext {
        let mut context = CommandContext::new(request.correlation_id, request.command);
        context.cancellation = request.cancellation;

        for provider in &self.values_providers {
            context.values.extend(provider.provide(&context.command));
        }

        context
    }
}

fn outcome_label(result: &CommandResult) -> &'static str {
    if result.is_success() {
        "success"
    } else if !result.is_authorized {
        "unauthorized"
    } else if !result.is_valid() {
        "invalid"
    } else {
        "failed"
    }
}

impl std::fmt::Debug for CommandPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPipeline")
            .field("filters", &self.filters.len())
            .field("response_value_handlers", &self.response_value_handlers.len())
            .field("values_providers", &self.values_providers.len())
            .field("modifiers", &self.modifiers.len())
            .finish()
    }
}
