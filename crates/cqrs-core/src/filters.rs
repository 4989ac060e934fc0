//! 过滤器链
//!
//! 过滤器按注册顺序依次执行，链内不短路：每个过滤器都会运行，结果逐个合并。
//! 是否继续分发由管道根据合并后的 `is_success` 决定。

use std::sync::Arc;

use arc_errors::AppResult;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{CommandContext, CommandResult, QueryContext, QueryResult};

/// Command filter trait
///
/// 返回 `Ok(None)` 表示没有意见
#[async_trait]
pub trait CommandFilter: Send + Sync {
    async fn on_execution(&self, context: &CommandContext) -> AppResult<Option<CommandResult>>;
}

/// Query filter trait
#[async_trait]
pub trait QueryFilter: Send + Sync {
    async fn on_perform(&self, context: &QueryContext) -> AppResult<Option<QueryResult>>;
}

/// 有序的命令过滤器链
#[derive(Clone, Default)]
pub struct CommandFilters {
    filters: Vec<Arc<dyn CommandFilter>>,
}

impl CommandFilters {
    pub fn new(filters: Vec<Arc<dyn CommandFilter>>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: Arc<dyn CommandFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// 致命错误直接返回，其余错误记录进结果后继续执行后面的过滤器
    pub async fn on_execution(&self, context: &CommandContext) -> AppResult<CommandResult> {
        let mut result = CommandResult::success(context.correlation_id);

        for filter in &self.filters {
            let filter_result = match filter.on_execution(context).await {
                Ok(filter_result) => filter_result,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(command = %context.command_type, error = %err, "Command filter failed");
                    Some(CommandResult::failed(context.correlation_id, &err))
                }
            };
            result = result.merged_with(filter_result);
        }

        debug!(
            command = %context.command_type,
            filters = self.filters.len(),
            authorized = result.is_authorized,
            validation_results = result.validation_results.len(),
            "Command filters executed"
        );
        Ok(result)
    }
}

/// 有序的查询过滤器链
#[derive(Clone, Default)]
pub struct QueryFilters {
    filters: Vec<Arc<dyn QueryFilter>>,
}

impl QueryFilters {
    pub fn new(filters: Vec<Arc<dyn QueryFilter>>) -> Self {
        Self { filters }
    }

    pub fn push(&mut self, filter: Arc<dyn QueryFilter>) {
        self.filters.push(filter);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub async fn on_perform(&self, context: &QueryContext) -> AppResult<QueryResult> {
        let mut result = QueryResult::success(context.correlation_id);

        for filter in &self.filters {
            let filter_result = match filter.on_perform(context).await {
                Ok(filter_result) => filter_result,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(query = %context.name, error = %err, "Query filter failed");
                    Some(QueryResult::failed(context.correlation_id, &err))
                }
            };
            result = result.merged_with(filter_result);
        }

        debug!(
            query = %context.name,
            filters = self.filters.len(),
            authorized = result.is_authorized,
            "Query filters executed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FullyQualifiedQueryName, ResultEnvelope, ValidationResult};
    use arc_common::{AnyValue, CorrelationId};
    use arc_errors::AppError;
    use mockall::mock;
    use std::sync::Mutex;

    mock! {
        Filter {}

        #[async_trait]
        impl CommandFilter for Filter {
            async fn on_execution(&self, context: &CommandContext) -> AppResult<Option<CommandResult>>;
        }
    }

    struct Recording {
        name: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
        result: fn(CorrelationId) -> AppResult<Option<CommandResult>>,
    }

    #[async_trait]
    impl CommandFilter for Recording {
        async fn on_execution(&self, context: &CommandContext) -> AppResult<Option<CommandResult>> {
            self.calls.lock().unwrap().push(self.name);
            (self.result)(context.correlation_id)
        }
    }

    fn context() -> CommandContext {
        CommandContext::new(CorrelationId::new(), AnyValue::new("command".to_string()))
    }

    #[tokio::test]
    async fn test_no_filters_is_success() {
        let context = context();
        let result = CommandFilters::default().on_execution(&context).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.correlation_id, context.correlation_id);
    }

    #[tokio::test]
    async fn test_chain_does_not_short_circuit() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let filters = CommandFilters::new(vec![
            Arc::new(Recording {
                name: "authorization",
                calls: calls.clone(),
                result: |id| Ok(Some(CommandResult::unauthorized(id))),
            }),
            Arc::new(Recording {
                name: "validation",
                calls: calls.clone(),
                result: |id| {
                    Ok(Some(CommandResult::with_validation_results(
                        id,
                        vec![ValidationResult::error("Name is required", vec!["name".into()])],
                    )))
                },
            }),
        ]);

        let result = filters.on_execution(&context()).await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["authorization", "validation"]);
        assert!(!result.is_authorized);
        assert!(!result.is_valid());
        assert_eq!(result.validation_results[0].message, "Name is required");
    }

    #[tokio::test]
    async fn test_none_is_no_opinion() {
        let mut filter = MockFilter::new();
        filter.expect_on_execution().times(1).returning(|_| Ok(None));

        let result = CommandFilters::new(vec![Arc::new(filter)])
            .on_execution(&context())
            .await
            .unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_filter_error_is_recorded_and_chain_continues() {
        let mut failing = MockFilter::new();
        failing
            .expect_on_execution()
            .returning(|_| Err(AppError::external_service("policy store offline")));
        let mut after = MockFilter::new();
        after.expect_on_execution().times(1).returning(|_| Ok(None));

        let result = CommandFilters::new(vec![Arc::new(failing), Arc::new(after)])
            .on_execution(&context())
            .await
            .unwrap();

        assert!(result.has_exceptions());
        assert_eq!(
            result.exception_messages,
            vec!["External service error: policy store offline"]
        );
    }

    #[tokio::test]
    async fn test_fatal_filter_error_propagates() {
        let mut failing = MockFilter::new();
        failing
            .expect_on_execution()
            .returning(|_| Err(AppError::ambiguous_authorization_level("Command")));

        let err = CommandFilters::new(vec![Arc::new(failing)])
            .on_execution(&context())
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    struct Rejecting;

    #[async_trait]
    impl QueryFilter for Rejecting {
        async fn on_perform(&self, context: &QueryContext) -> AppResult<Option<QueryResult>> {
            Ok(Some(QueryResult::unauthorized(context.correlation_id)))
        }
    }

    #[tokio::test]
    async fn test_query_filters_merge() {
        let context = QueryContext::new(FullyQualifiedQueryName::new("orders.all"));
        let result = QueryFilters::new(vec![Arc::new(Rejecting)])
            .on_perform(&context)
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.correlation_id, context.correlation_id);
    }
}
