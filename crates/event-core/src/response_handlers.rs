//! 事件响应值处理器
//!
//! handler 返回的事件（或 `Events`）被追加到事件日志，追加结果转换为命令结果：
//! 约束冲突成为校验错误，日志错误成为异常消息

use std::sync::Arc;

use arc_common::AnyValue;
use arc_cqrs_core::{CommandContext, CommandResponseValueHandler, CommandResult, ValidationResult};
use arc_errors::{AppError, AppResult};
use async_trait::async_trait;
use tracing::debug;

use crate::{AppendResult, EventLog, EventMetadata, EventSourceId, EventTypes, Events, UncommittedEvent};

/// 追加单个事件
pub struct SingleEventCommandResponseValueHandler {
    event_types: Arc<EventTypes>,
    event_log: Arc<dyn EventLog>,
}

impl SingleEventCommandResponseValueHandler {
    pub fn new(event_types: Arc<EventTypes>, event_log: Arc<dyn EventLog>) -> Self {
        Self {
            event_types,
            event_log,
        }
    }
}

#[async_trait]
impl CommandResponseValueHandler for SingleEventCommandResponseValueHandler {
    fn can_handle(&self, _context: &CommandContext, value: &AnyValue) -> bool {
        self.event_types.is_event(value)
    }

    async fn handle(&self, context: &CommandContext, value: &AnyValue) -> AppResult<CommandResult> {
        append(&self.event_types, self.event_log.as_ref(), context, value).await
    }
}

/// 按顺序追加 `Events` 中的所有事件
pub struct EventsCommandResponseValueHandler {
    event_types: Arc<EventTypes>,
    event_log: Arc<dyn EventLog>,
}

impl EventsCommandResponseValueHandler {
    pub fn new(event_types: Arc<EventTypes>, event_log: Arc<dyn EventLog>) -> Self {
        Self {
            event_types,
            event_log,
        }
    }
}

#[async_trait]
impl CommandResponseValueHandler for EventsCommandResponseValueHandler {
    fn can_handle(&self, _context: &CommandContext, value: &AnyValue) -> bool {
        value.is::<Events>()
    }

    /// 整批原子追加，任何一个事件无法追加时都不写入
    async fn handle(&self, context: &CommandContext, value: &AnyValue) -> AppResult<CommandResult> {
        let Some(events) = value.downcast_ref::<Events>() else {
            return Ok(CommandResult::success(context.correlation_id));
        };
        if events.is_empty() {
            return Ok(CommandResult::success(context.correlation_id));
        }

        let batch = events
            .iter()
            .map(|event| uncommitted(&self.event_types, context, event))
            .collect::<AppResult<Vec<_>>>()?;
        let appended = self.event_log.append_many(batch).await?;

        debug!(
            command = %context.command_type,
            events = events.len(),
            sequence_number = ?appended.sequence_number,
            "Event batch append completed"
        );
        Ok(to_command_result(context, appended))
    }
}

async fn append(
    event_types: &EventTypes,
    event_log: &dyn EventLog,
    context: &CommandContext,
    value: &AnyValue,
) -> AppResult<CommandResult> {
    let appended = event_log
        .append(uncommitted(event_types, context, value)?)
        .await?;

    debug!(
        command = %context.command_type,
        sequence_number = ?appended.sequence_number,
        "Event append completed"
    );
    Ok(to_command_result(context, appended))
}

fn uncommitted(
    event_types: &EventTypes,
    context: &CommandContext,
    value: &AnyValue,
) -> AppResult<UncommittedEvent> {
    let event_source_id = EventSourceId::from_context(context).cloned().ok_or_else(|| {
        AppError::validation(format!(
            "No event source id for command {}",
            context.command_type
        ))
    })?;
    let (event_type, content) = event_types.serialize(value)?;

    Ok(UncommittedEvent {
        event_source_id,
        event_type,
        content,
        metadata: EventMetadata::new(context.correlation_id)
            .with_causation(context.command_type.name),
    })
}

fn to_command_result(context: &CommandContext, appended: AppendResult) -> CommandResult {
    let validation_results = appended
        .constraint_violations
        .into_iter()
        .map(|v| ValidationResult::error(v.message, Vec::new()).with_state(v.constraint))
        .collect();

    let mut result = CommandResult::with_validation_results(context.correlation_id, validation_results);
    result.exception_messages = appended.errors;
    result
}
