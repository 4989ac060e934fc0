//! 命令和查询上下文

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_common::{AnyValue, CorrelationId, Paging, Sorting};
use arc_errors::AppResult;
use tokio_util::sync::CancellationToken;

/// 命令声明的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandType {
    pub id: TypeId,
    pub name: &'static str,
}

impl CommandType {
    pub fn of<C: Any>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    pub fn of_value(command: &AnyValue) -> Self {
        Self {
            id: command.value_type_id(),
            name: command.type_name(),
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 上下文值（例如提取出的事件源 ID）
#[derive(Debug, Clone, Default)]
pub struct ContextValues(HashMap<String, AnyValue>);

impl ContextValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: AnyValue) {
        self.0.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: AnyValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        self.0.get(key)
    }

    pub fn get_as<T: Any>(&self, key: &str) -> Option<&T> {
        self.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// 合并另一组值，同名键以后者为准
    pub fn extend(&mut self, other: ContextValues) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 命令执行上下文，每次执行创建一次
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub correlation_id: CorrelationId,
    pub command_type: CommandType,
    pub command: AnyValue,
    /// 按位置排列的依赖项
    pub dependencies: Vec<AnyValue>,
    pub values: ContextValues,
    pub cancellation: CancellationToken,
}

impl CommandContext {
    pub fn new(correlation_id: CorrelationId, command: AnyValue) -> Self {
        Self {
            correlation_id,
            command_type: CommandType::of_value(&command),
            command,
            dependencies: Vec::new(),
            values: ContextValues::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn command_as<C: Any>(&self) -> Option<&C> {
        self.command.downcast_ref::<C>()
    }

    pub fn dependency<T: Any>(&self, index: usize) -> Option<&T> {
        self.dependencies.get(index).and_then(|d| d.downcast_ref::<T>())
    }
}

/// 在命令上下文创建时提供上下文值
pub trait CommandContextValuesProvider: Send + Sync {
    fn provide(&self, command: &AnyValue) -> ContextValues;
}

/// 过滤器通过之后、handler 调用之前修改上下文
pub trait CommandContextModifier: Send + Sync {
    fn modify(&self, context: &mut CommandContext) -> AppResult<()>;
}

tokio::task_local! {
    static CURRENT_COMMAND_CONTEXT: Arc<CommandContext>;
}

/// 当前正在执行的命令上下文，仅在 handler 调用期间可见
pub fn current_command_context() -> Option<Arc<CommandContext>> {
    CURRENT_COMMAND_CONTEXT.try_with(Arc::clone).ok()
}

pub(crate) async fn with_current_command_context<F>(context: Arc<CommandContext>, future: F) -> F::Output
where
    F: std::future::Future,
{
    CURRENT_COMMAND_CONTEXT.scope(context, future).await
}

/// 查询的全限定名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullyQualifiedQueryName(pub String);

impl FullyQualifiedQueryName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullyQualifiedQueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 查询参数，保留传入顺序
#[derive(Debug, Clone, Default)]
pub struct QueryArguments(Vec<(String, AnyValue)>);

impl QueryArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: AnyValue) -> Self {
        self.0.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AnyValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_as<T: Any>(&self, name: &str) -> Option<&T> {
        self.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnyValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 查询上下文，构造后不再修改
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub name: FullyQualifiedQueryName,
    pub correlation_id: CorrelationId,
    pub paging: Paging,
    pub sorting: Option<Sorting>,
    /// 过滤条件或游标
    pub filter: Option<String>,
    pub arguments: QueryArguments,
    pub cancellation: CancellationToken,
}

impl QueryContext {
    pub fn new(name: FullyQualifiedQueryName) -> Self {
        Self {
            name,
            correlation_id: CorrelationId::new(),
            paging: Paging::not_paged(),
            sorting: None,
            filter: None,
            arguments: QueryArguments::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    pub fn with_sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = Some(sorting);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_arguments(mut self, arguments: QueryArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}
