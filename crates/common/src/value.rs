//! 类型擦除的值
//!
//! 命令实例、handler 返回值、依赖项和上下文值都以 `AnyValue` 的形式在管道中流转

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 可在线程间共享的类型擦除值，克隆只增加引用计数
#[derive(Clone)]
pub struct AnyValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl AnyValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: value,
        }
    }

    /// 实际值的 TypeId（不是 `AnyValue` 本身的）
    pub fn value_type_id(&self) -> TypeId {
        let any: &dyn Any = &*self.inner;
        any.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyValue({})", self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct OrderPlaced {
        order_id: u32,
    }

    #[test]
    fn test_downcast() {
        let value = AnyValue::new(OrderPlaced { order_id: 42 });
        assert!(value.is::<OrderPlaced>());
        assert!(!value.is::<String>());
        assert_eq!(value.downcast_ref::<OrderPlaced>().unwrap().order_id, 42);
        assert_eq!(*value.downcast::<OrderPlaced>().unwrap(), OrderPlaced { order_id: 42 });
        assert!(value.downcast::<String>().is_none());
    }

    #[test]
    fn test_value_type_id_is_concrete() {
        let value = AnyValue::new("Response Value".to_string());
        assert_eq!(value.value_type_id(), TypeId::of::<String>());
        assert!(value.type_name().ends_with("String"));
    }

    #[test]
    fn test_clone_shares_value() {
        let value = AnyValue::from_arc(Arc::new(7_u64));
        let cloned = value.clone();
        assert_eq!(cloned.downcast_ref::<u64>(), Some(&7));
        assert_eq!(format!("{:?}", cloned), "AnyValue(u64)");
    }
}
