//! Query performer 定义

use std::any::Any;

use arc_auth_core::{MethodTarget, TypeTarget};
use arc_common::AnyValue;
use arc_errors::AppResult;
use async_trait::async_trait;

use crate::{FullyQualifiedQueryName, QueryContext};

/// performer 返回的数据
#[derive(Debug, Clone)]
pub struct QueryData {
    pub value: AnyValue,
    /// 分页前的总条数，未知时为 `None`
    pub total_items: Option<u64>,
}

impl QueryData {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: AnyValue::new(value),
            total_items: None,
        }
    }

    pub fn with_total_items(mut self, total_items: u64) -> Self {
        self.total_items = Some(total_items);
        self
    }
}

/// Query performer，按全限定名绑定到一个查询
#[async_trait]
pub trait QueryPerformer: Send + Sync {
    fn name(&self) -> FullyQualifiedQueryName;

    fn authorization_target(&self) -> MethodTarget {
        MethodTarget::new(TypeTarget::named(std::any::type_name::<Self>()), "perform")
    }

    /// 必须出现在查询参数中的参数名
    fn required_arguments(&self) -> Vec<&'static str> {
        Vec::new()
    }

    async fn perform(&self, context: &QueryContext) -> AppResult<QueryData>;
}
