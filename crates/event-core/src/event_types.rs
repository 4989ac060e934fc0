//! 事件类型注册表
//!
//! 记录哪些运行时类型是事件，以及如何把它们序列化为 JSON

use std::any::TypeId;
use std::collections::HashMap;

use arc_common::AnyValue;
use arc_errors::{AppError, AppResult};
use tracing::debug;

use crate::{Event, EventType};

type Serializer = fn(&AnyValue) -> AppResult<serde_json::Value>;

struct Registration {
    event_type: EventType,
    serialize: Serializer,
}

#[derive(Default)]
pub struct EventTypes {
    registrations: HashMap<TypeId, Registration>,
}

impl EventTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Event>(&mut self) -> AppResult<()> {
        let type_id = TypeId::of::<E>();
        let event_type = E::event_type();

        if self
            .registrations
            .values()
            .any(|r| r.event_type == event_type)
        {
            return Err(AppError::conflict(format!(
                "Event type {event_type} is already registered"
            )));
        }

        debug!(event_type = %event_type, "Event type registered");
        self.registrations.insert(
            type_id,
            Registration {
                event_type,
                serialize: serialize_as::<E>,
            },
        );
        Ok(())
    }

    pub fn with<E: Event>(mut self) -> AppResult<Self> {
        self.register::<E>()?;
        Ok(self)
    }

    pub fn is_event(&self, value: &AnyValue) -> bool {
        self.registrations.contains_key(&value.value_type_id())
    }

    pub fn event_type_of(&self, value: &AnyValue) -> Option<&EventType> {
        self.registrations
            .get(&value.value_type_id())
            .map(|r| &r.event_type)
    }

    /// 序列化为 (事件类型, JSON 内容)，未注册的类型返回错误
    pub fn serialize(&self, value: &AnyValue) -> AppResult<(EventType, serde_json::Value)> {
        let registration = self
            .registrations
            .get(&value.value_type_id())
            .ok_or_else(|| {
                AppError::internal(format!("{} is not a registered event type", value.type_name()))
            })?;

        let content = (registration.serialize)(value)?;
        Ok((registration.event_type.clone(), content))
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

fn serialize_as<E: Event>(value: &AnyValue) -> AppResult<serde_json::Value> {
    let event = value
        .downcast_ref::<E>()
        .ok_or_else(|| AppError::internal(format!("Expected {}", std::any::type_name::<E>())))?;

    serde_json::to_value(event)
        .map_err(|e| AppError::internal(format!("Failed to serialize event: {}", e)))
}
