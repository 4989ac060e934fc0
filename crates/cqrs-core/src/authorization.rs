//! 授权过滤器

use std::sync::Arc;

use arc_auth_core::{AuthorizationEvaluator, TypeTarget};
use arc_errors::AppResult;
use async_trait::async_trait;
use tracing::warn;

use crate::{
    CommandContext, CommandFilter, CommandHandlerProvider, CommandResult, QueryContext,
    QueryFilter, QueryPerformerProvider, QueryResult,
};

/// 命令授权过滤器
///
/// 命令类型是 handler 方法的外层作用域：能解析到 handler 时，方法上的显式标记覆盖
/// 命令类型和 handler 类型的判断；否则只检查命令类型
pub struct AuthorizationFilter {
    evaluator: Arc<AuthorizationEvaluator>,
    handlers: Arc<dyn CommandHandlerProvider>,
}

impl AuthorizationFilter {
    pub fn new(
        evaluator: Arc<AuthorizationEvaluator>,
        handlers: Arc<dyn CommandHandlerProvider>,
    ) -> Self {
        Self {
            evaluator,
            handlers,
        }
    }
}

#[async_trait]
impl CommandFilter for AuthorizationFilter {
    async fn on_execution(&self, context: &CommandContext) -> AppResult<Option<CommandResult>> {
        let command_type = TypeTarget::named(context.command_type.name);

        let authorized = match self.handlers.try_get_handler_for(context) {
            Some(handler) => {
                let target = handler.authorization_target();
                let scopes = [command_type, target.declaring_type.clone()];
                self.evaluator.is_authorized_method_within(&target, &scopes)?
            }
            None => self.evaluator.is_authorized_type(&command_type)?,
        };

        if authorized {
            return Ok(None);
        }

        warn!(
            command = %context.command_type,
            correlation_id = %context.correlation_id,
            "Command not authorized"
        );
        Ok(Some(CommandResult::unauthorized(context.correlation_id)))
    }
}

/// 查询授权过滤器，找不到 performer 时不发表意见
pub struct QueryAuthorizationFilter {
    evaluator: Arc<AuthorizationEvaluator>,
    performers: Arc<dyn QueryPerformerProvider>,
}

impl QueryAuthorizationFilter {
    pub fn new(
        evaluator: Arc<AuthorizationEvaluator>,
        performers: Arc<dyn QueryPerformerProvider>,
    ) -> Self {
        Self {
            evaluator,
            performers,
        }
    }
}

#[async_trait]
impl QueryFilter for QueryAuthorizationFilter {
    async fn on_perform(&self, context: &QueryContext) -> AppResult<Option<QueryResult>> {
        let Some(performer) = self.performers.try_get_performers_for(&context.name) else {
            return Ok(None);
        };

        if self
            .evaluator
            .is_authorized_method(&performer.authorization_target())?
        {
            return Ok(None);
        }

        warn!(
            query = %context.name,
            correlation_id = %context.correlation_id,
            "Query not authorized"
        );
        Ok(Some(QueryResult::unauthorized(context.correlation_id)))
    }
}
