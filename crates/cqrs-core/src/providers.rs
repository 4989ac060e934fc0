//! Handler / performer 解析
//!
//! 命令按运行时类型精确匹配，查询按全限定名精确匹配，不做回退

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use arc_errors::{AppError, AppResult};
use tracing::debug;

use crate::{
    Command, CommandContext, CommandHandler, FullyQualifiedQueryName, QueryPerformer,
    TypedCommandHandler, TypedHandler,
};

/// 命令 handler 提供者
pub trait CommandHandlerProvider: Send + Sync {
    fn try_get_handler_for(&self, context: &CommandContext) -> Option<Arc<dyn CommandHandler>>;
}

/// 查询 performer 提供者
pub trait QueryPerformerProvider: Send + Sync {
    fn try_get_performers_for(
        &self,
        name: &FullyQualifiedQueryName,
    ) -> Option<Arc<dyn QueryPerformer>>;
}

/// 显式注册的命令 handler 表
#[derive(Default)]
pub struct CommandHandlers {
    handlers: HashMap<TypeId, Arc<dyn CommandHandler>>,
}

impl CommandHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C, H>(&mut self, handler: H) -> AppResult<()>
    where
        C: Command,
        H: TypedCommandHandler<C>,
    {
        self.register_handler(Arc::new(TypedHandler::<C, H>::new(handler)))
    }

    /// 每个命令类型只能有一个 handler
    pub fn register_handler(&mut self, handler: Arc<dyn CommandHandler>) -> AppResult<()> {
        let command_type = handler.command_type();
        if self.handlers.contains_key(&command_type.id) {
            return Err(AppError::conflict(format!(
                "A handler is already registered for command {}",
                command_type
            )));
        }

        debug!(
            command = %command_type,
            handler = %handler.authorization_target(),
            "Command handler registered"
        );
        self.handlers.insert(command_type.id, handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl CommandHandlerProvider for CommandHandlers {
    fn try_get_handler_for(&self, context: &CommandContext) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&context.command_type.id).cloned()
    }
}

/// 显式注册的查询 performer 表
#[derive(Default)]
pub struct QueryPerformers {
    performers: HashMap<FullyQualifiedQueryName, Arc<dyn QueryPerformer>>,
}

impl QueryPerformers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, performer: Arc<dyn QueryPerformer>) -> AppResult<()> {
        let name = performer.name();
        if self.performers.contains_key(&name) {
            return Err(AppError::conflict(format!(
                "A performer is already registered for {}",
                name
            )));
        }

        debug!(query = %name, "Query performer registered");
        self.performers.insert(name, performer);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.performers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.performers.is_empty()
    }
}

impl QueryPerformerProvider for QueryPerformers {
    fn try_get_performers_for(
        &self,
        name: &FullyQualifiedQueryName,
    ) -> Option<Arc<dyn QueryPerformer>> {
        self.performers.get(name).cloned()
    }
}
