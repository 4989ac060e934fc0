//! Command trait 定义

use std::any::Any;
use std::marker::PhantomData;

use arc_auth_core::{MethodTarget, TypeTarget};
use arc_common::{AnyValue, CorrelationId};
use arc_errors::{AppError, AppResult};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{CommandContext, CommandType};

/// Command trait
pub trait Command: Send + Sync + 'static {
    type Result: Into<HandlerOutput> + Send;
}

/// handler 的返回值
///
/// `Pair` 表示两个相互独立的值，例如 (事件, 响应) 或 (响应, 事件)
#[derive(Debug, Clone, Default)]
pub enum HandlerOutput {
    #[default]
    None,
    Value(AnyValue),
    Pair(AnyValue, AnyValue),
}

impl HandlerOutput {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::Value(AnyValue::new(value))
    }

    pub fn pair<A, B>(first: A, second: B) -> Self
    where
        A: Any + Send + Sync,
        B: Any + Send + Sync,
    {
        Self::Pair(AnyValue::new(first), AnyValue::new(second))
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<AnyValue> for HandlerOutput {
    fn from(value: AnyValue) -> Self {
        Self::Value(value)
    }
}

impl<A, B> From<(A, B)> for HandlerOutput
where
    A: Any + Send + Sync,
    B: Any + Send + Sync,
{
    fn from((first, second): (A, B)) -> Self {
        Self::pair(first, second)
    }
}

/// 单个响应值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<T>(pub T);

impl<T: Any + Send + Sync> From<Response<T>> for HandlerOutput {
    fn from(response: Response<T>) -> Self {
        Self::value(response.0)
    }
}

/// 类型擦除后的命令 handler，由 provider 返回给管道
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn command_type(&self) -> CommandType;

    /// 方法级授权目标
    fn authorization_target(&self) -> MethodTarget;

    /// handler 需要的依赖数量，`None` 表示全部
    fn dependency_count(&self) -> Option<usize> {
        None
    }

    async fn handle(&self, context: &CommandContext) -> AppResult<HandlerOutput>;
}

/// 强类型命令 handler
#[async_trait]
pub trait TypedCommandHandler<C: Command>: Send + Sync + 'static {
    async fn handle(&self, command: &C, context: &CommandContext) -> AppResult<C::Result>;

    fn dependency_count(&self) -> Option<usize> {
        None
    }
}

/// 把 `TypedCommandHandler` 适配为 `CommandHandler`
pub struct TypedHandler<C, H> {
    handler: H,
    _command: PhantomData<fn() -> C>,
}

impl<C, H> TypedHandler<C, H>
where
    C: Command,
    H: TypedCommandHandler<C>,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _command: PhantomData,
        }
    }
}

#[async_trait]
impl<C, H> CommandHandler for TypedHandler<C, H>
where
    C: Command,
    H: TypedCommandHandler<C>,
{
    fn command_type(&self) -> CommandType {
        CommandType::of::<C>()
    }

    fn authorization_target(&self) -> MethodTarget {
        MethodTarget::new(TypeTarget::of::<H>(), "handle")
    }

    fn dependency_count(&self) -> Option<usize> {
        self.handler.dependency_count()
    }

    async fn handle(&self, context: &CommandContext) -> AppResult<HandlerOutput> {
        let command = context.command_as::<C>().ok_or_else(|| {
            AppError::internal(format!(
                "Command type mismatch: expected {}, got {}",
                std::any::type_name::<C>(),
                context.command_type
            ))
        })?;

        self.handler.handle(command, context).await.map(Into::into)
    }
}

/// 为 handler 解析依赖项（依赖注入层实现）
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    async fn resolve(
        &self,
        context: &CommandContext,
        handler: &dyn CommandHandler,
    ) -> AppResult<Vec<AnyValue>>;
}

/// 传输层提交的命令
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: AnyValue,
    pub correlation_id: CorrelationId,
    pub cancellation: CancellationToken,
}

impl CommandRequest {
    pub fn new<C: Any + Send + Sync>(command: C) -> Self {
        Self::from_value(AnyValue::new(command))
    }

    pub fn from_value(command: AnyValue) -> Self {
        Self {
            command,
            correlation_id: CorrelationId::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}
