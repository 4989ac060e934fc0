//! Domain Event 定义

use std::fmt;

use arc_common::{AnyValue, CorrelationId};
use serde::{Deserialize, Serialize};

/// Domain Event trait
pub trait Event: Send + Sync + Serialize + 'static {
    /// 事件类型名称
    fn event_type() -> EventType;
}

/// 事件类型，带代次以便事件结构演进
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventType {
    pub name: String,
    pub generation: u32,
}

impl EventType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: 1,
        }
    }

    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.name, self.generation)
    }
}

/// 事件元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 关联 ID（用于追踪）
    pub correlation_id: CorrelationId,
    /// 因果：产生事件的命令类型
    pub causation: Option<String>,
    /// 触发用户
    pub user: Option<String>,
}

impl EventMetadata {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            ..Self::default()
        }
    }

    pub fn with_causation(mut self, causation: impl Into<String>) -> Self {
        self.causation = Some(causation.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// handler 一次返回的多个事件，按顺序追加
#[derive(Debug, Clone, Default)]
pub struct Events(Vec<AnyValue>);

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<E: Event>(mut self, event: E) -> Self {
        self.0.push(AnyValue::new(event));
        self
    }

    pub fn push<E: Event>(&mut self, event: E) {
        self.0.push(AnyValue::new(event));
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnyValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Opened;

    impl Event for Opened {
        fn event_type() -> EventType {
            EventType::new("account-opened")
        }
    }

    #[test]
    fn test_event_type_display() {
        let event_type = EventType::new("account-opened").with_generation(2);
        assert_eq!(event_type.to_string(), "account-opened+2");
        assert_eq!(Opened::event_type().generation, 1);
    }

    #[test]
    fn test_events_keep_order() {
        let events = Events::new().with(Opened).with(Opened);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.is::<Opened>()));
    }
}
