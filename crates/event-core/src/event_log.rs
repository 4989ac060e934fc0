//! Event Log trait 定义与内存实现

use std::sync::Arc;

use arc_errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{EventMetadata, EventSourceId, EventType};

/// 待追加的事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_source_id: EventSourceId,
    pub event_type: EventType,
    pub content: serde_json::Value,
    pub metadata: EventMetadata,
}

/// 已追加的事件记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendedEvent {
    pub id: Uuid,
    pub sequence_number: u64,
    pub event_source_id: EventSourceId,
    pub event_type: EventType,
    pub content: serde_json::Value,
    pub metadata: EventMetadata,
    pub occurred_at: DateTime<Utc>,
}

/// 约束冲突
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub constraint: String,
    pub message: String,
}

/// 追加结果
#[derive(Debug, Clone, Default)]
pub struct AppendResult {
    pub sequence_number: Option<u64>,
    pub constraint_violations: Vec<ConstraintViolation>,
    pub errors: Vec<String>,
}

impl AppendResult {
    pub fn appended(sequence_number: u64) -> Self {
        Self {
            sequence_number: Some(sequence_number),
            ..Self::default()
        }
    }

    pub fn violated(violations: Vec<ConstraintViolation>) -> Self {
        Self {
            constraint_violations: violations,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.sequence_number.is_some()
            && self.constraint_violations.is_empty()
            && self.errors.is_empty()
    }
}

/// 事件日志
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: UncommittedEvent) -> AppResult<AppendResult>;

    /// 原子追加一批事件：任一事件违反约束则整批都不追加。
    /// 成功时 `sequence_number` 是最后一个事件的序号
    async fn append_many(&self, events: Vec<UncommittedEvent>) -> AppResult<AppendResult>;
}

/// 追加前检查的约束
pub trait EventConstraint: Send + Sync {
    fn check(
        &self,
        existing: &[AppendedEvent],
        candidate: &UncommittedEvent,
    ) -> Option<ConstraintViolation>;
}

/// 内存事件日志（测试和单进程场景）
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<AppendedEvent>>>,
    constraints: Vec<Arc<dyn EventConstraint>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Arc<dyn EventConstraint>) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// 获取所有追加的事件
    pub async fn get_events(&self) -> Vec<AppendedEvent> {
        self.events.read().await.clone()
    }

    /// 获取某个事件源的事件
    pub async fn get_events_for(&self, event_source_id: &EventSourceId) -> Vec<AppendedEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| &e.event_source_id == event_source_id)
            .cloned()
            .collect()
    }

    /// 清空事件（用于测试）
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: UncommittedEvent) -> AppResult<AppendResult> {
        self.append_many(vec![event]).await
    }

    async fn append_many(&self, batch: Vec<UncommittedEvent>) -> AppResult<AppendResult> {
        let mut events = self.events.write().await;
        let base = events.len();
        let mut violations = Vec::new();

        // 批内后面的事件要能看到前面的事件，先暂存到日志里，失败时截断
        for event in batch {
            let rejected: Vec<ConstraintViolation> = self
                .constraints
                .iter()
                .filter_map(|c| c.check(&events, &event))
                .collect();
            if !rejected.is_empty() {
                tracing::warn!(
                    event_type = %event.event_type,
                    event_source_id = %event.event_source_id,
                    violations = rejected.len(),
                    "Event rejected by constraints"
                );
                violations.extend(rejected);
            }

            let sequence_number = events.len() as u64;
            events.push(AppendedEvent {
                id: Uuid::now_v7(),
                sequence_number,
                event_source_id: event.event_source_id,
                event_type: event.event_type,
                content: event.content,
                metadata: event.metadata,
                occurred_at: Utc::now(),
            });
        }

        if !violations.is_empty() {
            events.truncate(base);
            return Ok(AppendResult::violated(violations));
        }

        let Some(last) = events[base..].last() else {
            return Ok(AppendResult::default());
        };
        for appended in &events[base..] {
            tracing::info!(
                event_type = %appended.event_type,
                event_source_id = %appended.event_source_id,
                sequence_number = appended.sequence_number,
                "Event appended"
            );
        }

        Ok(AppendResult::appended(last.sequence_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_common::CorrelationId;

    struct OncePerSource;

    impl EventConstraint for OncePerSource {
        fn check(
            &self,
            existing: &[AppendedEvent],
            candidate: &UncommittedEvent,
        ) -> Option<ConstraintViolation> {
            existing
                .iter()
                .any(|e| {
                    e.event_source_id == candidate.event_source_id
                        && e.event_type == candidate.event_type
                })
                .then(|| ConstraintViolation {
                    constraint: "once-per-source".into(),
                    message: format!("{} already happened", candidate.event_type.name),
                })
        }
    }

    fn opened(source: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_source_id: EventSourceId::new(source),
            event_type: EventType::new("opened"),
            content: serde_json::json!({}),
            metadata: EventMetadata::new(CorrelationId::new()),
        }
    }

    #[tokio::test]
    async fn test_append_assigns_sequence_numbers() {
        let log = InMemoryEventLog::new();

        let first = log.append(opened("a")).await.unwrap();
        let second = log.append(opened("b")).await.unwrap();

        assert_eq!(first.sequence_number, Some(0));
        assert_eq!(second.sequence_number, Some(1));
        assert_eq!(log.get_events_for(&EventSourceId::new("b")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_constraint_violation_prevents_append() {
        let log = InMemoryEventLog::new().with_constraint(Arc::new(OncePerSource));

        assert!(log.append(opened("a")).await.unwrap().is_success());
        let rejected = log.append(opened("a")).await.unwrap();

        assert!(!rejected.is_success());
        assert_eq!(rejected.constraint_violations[0].constraint, "once-per-source");
        assert_eq!(log.get_events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_with_violation_appends_nothing() {
        let log = InMemoryEventLog::new().with_constraint(Arc::new(OncePerSource));
        log.append(opened("a")).await.unwrap();

        let result = log
            .append_many(vec![opened("b"), opened("a"), opened("c")])
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.constraint_violations.len(), 1);
        assert_eq!(log.get_events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_sees_its_own_earlier_events() {
        let log = InMemoryEventLog::new().with_constraint(Arc::new(OncePerSource));

        let result = log.append_many(vec![opened("a"), opened("a")]).await.unwrap();

        assert!(!result.is_success());
        assert!(log.get_events().await.is_empty());
    }

    #[tokio::test]
    async fn test_batch_appended_in_order() {
        let log = InMemoryEventLog::new();

        let result = log
            .append_many(vec![opened("a"), opened("b")])
            .await
            .unwrap();

        assert_eq!(result.sequence_number, Some(1));
        let sources: Vec<String> = log
            .get_events()
            .await
            .into_iter()
            .map(|e| e.event_source_id.0)
            .collect();
        assert_eq!(sources, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let log = InMemoryEventLog::default();
        log.append(opened("a")).await.unwrap();
        log.clear().await;
        assert!(log.get_events().await.is_empty());
    }
}
