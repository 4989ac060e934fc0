//! 结果信封
//!
//! `CommandResult` / `QueryResult` 及其合并规则：
//! - correlation_id 取最后一个非默认值，不一致时记录警告
//! - is_authorized 取与
//! - validation_results / exception_messages 按顺序拼接，不去重
//! - exception_stack_trace 为空时直接采用，否则换行追加

use arc_common::{AnyValue, CorrelationId, PagingInfo};
use arc_errors::AppError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 校验结果严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResultSeverity {
    Unknown,
    Information,
    Warning,
    Error,
}

/// 单条校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub severity: ValidationResultSeverity,
    pub message: String,
    /// 关联的成员路径
    #[serde(default)]
    pub members: Vec<String>,
    /// 产生该结果的规则
    pub state: Option<String>,
}

impl ValidationResult {
    pub fn new(
        severity: ValidationResultSeverity,
        message: impl Into<String>,
        members: Vec<String>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            members,
            state: None,
        }
    }

    pub fn error(message: impl Into<String>, members: Vec<String>) -> Self {
        Self::new(ValidationResultSeverity::Error, message, members)
    }

    pub fn warning(message: impl Into<String>, members: Vec<String>) -> Self {
        Self::new(ValidationResultSeverity::Warning, message, members)
    }

    pub fn information(message: impl Into<String>, members: Vec<String>) -> Self {
        Self::new(ValidationResultSeverity::Information, message, members)
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ValidationResultSeverity::Error
    }
}

/// 命令和查询结果共享的派生属性
pub trait ResultEnvelope {
    fn is_authorized(&self) -> bool;

    fn validation_results(&self) -> &[ValidationResult];

    fn exception_messages(&self) -> &[String];

    /// 没有 Error 级别的校验结果
    fn is_valid(&self) -> bool {
        !self.validation_results().iter().any(ValidationResult::is_error)
    }

    fn has_exceptions(&self) -> bool {
        !self.exception_messages().is_empty()
    }

    fn is_success(&self) -> bool {
        self.is_authorized() && self.is_valid() && !self.has_exceptions()
    }
}

fn merge_correlation_id(current: CorrelationId, other: CorrelationId) -> CorrelationId {
    if other.is_default() {
        return current;
    }
    if !current.is_default() && current != other {
        warn!(
            current = %current,
            other = %other,
            "Merging results with diverging correlation ids"
        );
    }
    other
}

fn merge_stack_trace(current: Option<String>, other: Option<String>) -> Option<String> {
    match (current, other) {
        (Some(current), Some(other)) if !current.is_empty() => {
            Some(format!("{}\n{}", current, other))
        }
        (current, None) => current,
        (_, other) => other,
    }
}

/// 命令结果
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub correlation_id: CorrelationId,
    pub is_authorized: bool,
    pub validation_results: Vec<ValidationResult>,
    pub exception_messages: Vec<String>,
    pub exception_stack_trace: Option<String>,
    pub response: Option<AnyValue>,
}

impl CommandResult {
    pub fn success(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            is_authorized: true,
            validation_results: Vec::new(),
            exception_messages: Vec::new(),
            exception_stack_trace: None,
            response: None,
        }
    }

    pub fn unauthorized(correlation_id: CorrelationId) -> Self {
        Self {
            is_authorized: false,
            ..Self::success(correlation_id)
        }
    }

    pub fn with_validation_results(
        correlation_id: CorrelationId,
        validation_results: Vec<ValidationResult>,
    ) -> Self {
        Self {
            validation_results,
            ..Self::success(correlation_id)
        }
    }

    /// 由错误构造失败结果，错误的 source 链写入 stack trace
    pub fn failed(correlation_id: CorrelationId, error: &AppError) -> Self {
        Self {
            exception_messages: vec![error.to_string()],
            exception_stack_trace: error.stack_trace(),
            ..Self::success(correlation_id)
        }
    }

    pub fn missing_handler(correlation_id: CorrelationId, command: &str) -> Self {
        Self::failed(correlation_id, &AppError::handler_not_found(command))
    }

    pub fn with_response(mut self, response: AnyValue) -> Self {
        self.response = Some(response);
        self
    }

    pub fn response_as<T: std::any::Any>(&self) -> Option<&T> {
        self.response.as_ref().and_then(|r| r.downcast_ref::<T>())
    }

    /// 合并另一个结果，`None` 不改变当前结果
    pub fn merged_with(self, other: Option<CommandResult>) -> Self {
        let Some(other) = other else {
            return self;
        };

        let mut validation_results = self.validation_results;
        validation_results.extend(other.validation_results);
        let mut exception_messages = self.exception_messages;
        exception_messages.extend(other.exception_messages);

        Self {
            correlation_id: merge_correlation_id(self.correlation_id, other.correlation_id),
            is_authorized: self.is_authorized && other.is_authorized,
            validation_results,
            exception_messages,
            exception_stack_trace: merge_stack_trace(
                self.exception_stack_trace,
                other.exception_stack_trace,
            ),
            response: other.response.or(self.response),
        }
    }
}

impl ResultEnvelope for CommandResult {
    fn is_authorized(&self) -> bool {
        self.is_authorized
    }

    fn validation_results(&self) -> &[ValidationResult] {
        &self.validation_results
    }

    fn exception_messages(&self) -> &[String] {
        &self.exception_messages
    }
}

/// 查询结果
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub correlation_id: CorrelationId,
    pub is_authorized: bool,
    pub validation_results: Vec<ValidationResult>,
    pub exception_messages: Vec<String>,
    pub exception_stack_trace: Option<String>,
    pub data: Option<AnyValue>,
    pub paging: PagingInfo,
}

impl QueryResult {
    pub fn success(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            is_authorized: true,
            validation_results: Vec::new(),
            exception_messages: Vec::new(),
            exception_stack_trace: None,
            data: None,
            paging: PagingInfo::default(),
        }
    }

    pub fn unauthorized(correlation_id: CorrelationId) -> Self {
        Self {
            is_authorized: false,
            ..Self::success(correlation_id)
        }
    }

    pub fn with_validation_results(
        correlation_id: CorrelationId,
        validation_results: Vec<ValidationResult>,
    ) -> Self {
        Self {
            validation_results,
            ..Self::success(correlation_id)
        }
    }

    pub fn failed(correlation_id: CorrelationId, error: &AppError) -> Self {
        Self {
            exception_messages: vec![error.to_string()],
            exception_stack_trace: error.stack_trace(),
            ..Self::success(correlation_id)
        }
    }

    pub fn missing_performer(correlation_id: CorrelationId, query: &str) -> Self {
        Self::failed(correlation_id, &AppError::performer_not_found(query))
    }

    pub fn with_data(mut self, data: AnyValue, paging: PagingInfo) -> Self {
        self.data = Some(data);
        self.paging = paging;
        self
    }

    pub fn data_as<T: std::any::Any>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn merged_with(self, other: Option<QueryResult>) -> Self {
        let Some(other) = other else {
            return self;
        };

        let mut validation_results = self.validation_results;
        validation_results.extend(other.validation_results);
        let mut exception_messages = self.exception_messages;
        exception_messages.extend(other.exception_messages);

        let (data, paging) = match other.data {
            Some(data) => (Some(data), other.paging),
            None => (self.data, self.paging),
        };

        Self {
            correlation_id: merge_correlation_id(self.correlation_id, other.correlation_id),
            is_authorized: self.is_authorized && other.is_authorized,
            validation_results,
            exception_messages,
            exception_stack_trace: merge_stack_trace(
                self.exception_stack_trace,
                other.exception_stack_trace,
            ),
            data,
            paging,
        }
    }
}

impl ResultEnvelope for QueryResult {
    fn is_authorized(&self) -> bool {
        self.is_authorized
    }

    fn validation_results(&self) -> &[ValidationResult] {
        &self.validation_results
    }

    fn exception_messages(&self) -> &[String] {
        &self.exception_messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_common::Paging;

    fn messages(result: &CommandResult) -> Vec<&str> {
        result
            .validation_results
            .iter()
            .map(|v| v.message.as_str())
            .collect()
    }

    #[test]
    fn test_is_valid_ignores_non_errors() {
        let id = CorrelationId::new();
        let result = CommandResult::with_validation_results(
            id,
            vec![
                ValidationResult::warning("looks odd", vec![]),
                ValidationResult::information("fyi", vec![]),
            ],
        );
        assert!(result.is_valid());
        assert!(result.is_success());

        let invalid = result.merged_with(Some(CommandResult::with_validation_results(
            id,
            vec![ValidationResult::error("name is required", vec!["name".into()])],
        )));
        assert!(!invalid.is_valid());
        assert!(!invalid.is_success());
    }

    #[test]
    fn test_is_success_requires_all_three() {
        let id = CorrelationId::new();
        assert!(CommandResult::success(id).is_success());
        assert!(!CommandResult::unauthorized(id).is_success());
        assert!(!CommandResult::failed(id, &AppError::internal("boom")).is_success());
        assert!(CommandResult::failed(id, &AppError::internal("boom")).has_exceptions());
    }

    #[test]
    fn test_merge_none_is_noop() {
        let id = CorrelationId::new();
        let result = CommandResult::with_validation_results(
            id,
            vec![ValidationResult::error("bad", vec![])],
        );
        let merged = result.clone().merged_with(None);
        assert_eq!(merged.correlation_id, id);
        assert_eq!(merged.validation_results, result.validation_results);
        assert_eq!(merged.is_authorized, result.is_authorized);
    }

    #[test]
    fn test_merge_is_order_preserving_and_keeps_duplicates() {
        let id = CorrelationId::new();
        let a = CommandResult::with_validation_results(id, vec![ValidationResult::error("a", vec![])]);
        let b = CommandResult::with_validation_results(id, vec![ValidationResult::error("b", vec![])]);
        let c = CommandResult::with_validation_results(id, vec![ValidationResult::error("a", vec![])]);

        let left = a.clone().merged_with(Some(b.clone())).merged_with(Some(c.clone()));
        let right = a.merged_with(Some(b.merged_with(Some(c))));

        assert_eq!(messages(&left), vec!["a", "b", "a"]);
        assert_eq!(messages(&left), messages(&right));
    }

    #[test]
    fn test_merge_authorization_is_conjunction() {
        let id = CorrelationId::new();
        let merged = CommandResult::unauthorized(id).merged_with(Some(CommandResult::success(id)));
        assert!(!merged.is_authorized);
    }

    #[test]
    fn test_merge_correlation_id_takes_last_non_default() {
        let id = CorrelationId::new();
        let merged = CommandResult::success(CorrelationId::default())
            .merged_with(Some(CommandResult::success(id)));
        assert_eq!(merged.correlation_id, id);

        let kept = CommandResult::success(id)
            .merged_with(Some(CommandResult::success(CorrelationId::default())));
        assert_eq!(kept.correlation_id, id);

        let other = CorrelationId::new();
        let diverged = CommandResult::success(id).merged_with(Some(CommandResult::success(other)));
        assert_eq!(diverged.correlation_id, other);
    }

    #[test]
    fn test_merge_stack_traces() {
        assert_eq!(merge_stack_trace(None, Some("b".into())), Some("b".into()));
        assert_eq!(merge_stack_trace(Some(String::new()), Some("b".into())), Some("b".into()));
        assert_eq!(merge_stack_trace(Some("a".into()), None), Some("a".into()));
        assert_eq!(
            merge_stack_trace(Some("a".into()), Some("b".into())),
            Some("a\nb".into())
        );
    }

    #[test]
    fn test_merge_keeps_response_unless_replaced() {
        let id = CorrelationId::new();
        let merged = CommandResult::success(id)
            .with_response(AnyValue::new(42_u32))
            .merged_with(Some(CommandResult::success(id)));
        assert_eq!(merged.response_as::<u32>(), Some(&42));
    }

    #[test]
    fn test_missing_handler_message() {
        let result = CommandResult::missing_handler(CorrelationId::new(), "CreateOrder");
        assert!(!result.is_success());
        assert_eq!(result.exception_messages, vec!["No handler found for command 'CreateOrder'"]);
    }

    #[test]
    fn test_query_result_merge_takes_data_and_paging_together() {
        let id = CorrelationId::new();
        let paging = PagingInfo::new(&Paging::new(1, 10), 3);
        let merged = QueryResult::success(id)
            .merged_with(Some(QueryResult::success(id).with_data(AnyValue::new(vec![1, 2, 3]), paging)))
            .merged_with(Some(QueryResult::unauthorized(id)));

        assert_eq!(merged.data_as::<Vec<i32>>(), Some(&vec![1, 2, 3]));
        assert_eq!(merged.paging, paging);
        assert!(!merged.is_success());
    }
}
