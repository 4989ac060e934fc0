//! 事件源 ID
//!
//! 命令上下文创建时从命令中取出事件源 ID，写入上下文值 `eventSourceId`

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_common::AnyValue;
use arc_cqrs_core::{CommandContext, CommandContextValuesProvider, ContextValues};
use serde::{Deserialize, Serialize};

pub const EVENT_SOURCE_ID_KEY: &str = "eventSourceId";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventSourceId(pub String);

impl EventSourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 从命令上下文读取
    pub fn from_context(context: &CommandContext) -> Option<&EventSourceId> {
        context.values.get_as::<EventSourceId>(EVENT_SOURCE_ID_KEY)
    }
}

impl fmt::Display for EventSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 携带事件源 ID 的命令
pub trait HasEventSourceId {
    fn event_source_id(&self) -> EventSourceId;
}

type Extractor = Arc<dyn Fn(&AnyValue) -> Option<EventSourceId> + Send + Sync>;

/// 为注册过的命令类型提供 `eventSourceId` 上下文值
#[derive(Default)]
pub struct EventSourceIdValuesProvider {
    extractors: HashMap<TypeId, Extractor>,
}

impl EventSourceIdValuesProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_command<C>(mut self) -> Self
    where
        C: HasEventSourceId + Any + Send + Sync,
    {
        self.extractors.insert(
            TypeId::of::<C>(),
            Arc::new(|command: &AnyValue| {
                command
                    .downcast_ref::<C>()
                    .map(HasEventSourceId::event_source_id)
            }),
        );
        self
    }
}

impl CommandContextValuesProvider for EventSourceIdValuesProvider {
    fn provide(&self, command: &AnyValue) -> ContextValues {
        let mut values = ContextValues::new();

        if let Some(id) = self
            .extractors
            .get(&command.value_type_id())
            .and_then(|extract| extract(command))
        {
            values.insert(EVENT_SOURCE_ID_KEY, AnyValue::new(id));
        }

        values
    }
}
