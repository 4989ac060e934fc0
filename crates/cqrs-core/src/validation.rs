//! 校验过滤器

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use arc_errors::AppResult;
use async_trait::async_trait;
use tracing::debug;

use crate::{
    Command, CommandContext, CommandFilter, CommandResult, QueryContext, QueryFilter,
    QueryPerformerProvider, QueryResult, ValidationResult,
};

/// 强类型命令校验器
#[async_trait]
pub trait CommandValidator<C: Command>: Send + Sync + 'static {
    async fn validate(
        &self,
        command: &C,
        context: &CommandContext,
    ) -> AppResult<Vec<ValidationResult>>;
}

#[async_trait]
trait ErasedCommandValidator: Send + Sync {
    async fn validate(&self, context: &CommandContext) -> AppResult<Vec<ValidationResult>>;
}

struct TypedValidator<C, V> {
    validator: V,
    _command: PhantomData<fn() -> C>,
}

#[async_trait]
impl<C, V> ErasedCommandValidator for TypedValidator<C, V>
where
    C: Command,
    V: CommandValidator<C>,
{
    async fn validate(&self, context: &CommandContext) -> AppResult<Vec<ValidationResult>> {
        match context.command_as::<C>() {
            Some(command) => self.validator.validate(command, context).await,
            None => Ok(Vec::new()),
        }
    }
}

/// 按命令类型注册的校验器
#[derive(Default)]
pub struct CommandValidators {
    validators: HashMap<TypeId, Vec<Arc<dyn ErasedCommandValidator>>>,
}

impl CommandValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一命令可以注册多个校验器，按注册顺序执行
    pub fn register<C, V>(&mut self, validator: V)
    where
        C: Command,
        V: CommandValidator<C>,
    {
        self.validators
            .entry(TypeId::of::<C>())
            .or_default()
            .push(Arc::new(TypedValidator {
                validator,
                _command: PhantomData,
            }));
    }

    pub fn has_validators_for(&self, command_type: TypeId) -> bool {
        self.validators.contains_key(&command_type)
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// 命令校验过滤器
pub struct ValidationFilter {
    validators: Arc<CommandValidators>,
}

impl ValidationFilter {
    pub fn new(validators: Arc<CommandValidators>) -> Self {
        Self { validators }
    }
}

#[async_trait]
impl CommandFilter for ValidationFilter {
    async fn on_execution(&self, context: &CommandContext) -> AppResult<Option<CommandResult>> {
        let Some(validators) = self.validators.validators.get(&context.command_type.id) else {
            return Ok(None);
        };

        let mut results = Vec::new();
        for validator in validators {
            results.extend(validator.validate(context).await?);
        }

        debug!(
            command = %context.command_type,
            validation_results = results.len(),
            "Command validated"
        );
        Ok(Some(CommandResult::with_validation_results(
            context.correlation_id,
            results,
        )))
    }
}

/// 查询校验过滤器：分页范围和必填参数
pub struct QueryValidationFilter {
    performers: Arc<dyn QueryPerformerProvider>,
    max_page_size: u32,
}

impl QueryValidationFilter {
    pub fn new(performers: Arc<dyn QueryPerformerProvider>, max_page_size: u32) -> Self {
        Self {
            performers,
            max_page_size,
        }
    }
}

#[async_trait]
impl QueryFilter for QueryValidationFilter {
    async fn on_perform(&self, context: &QueryContext) -> AppResult<Option<QueryResult>> {
        let mut results = Vec::new();

        if context.paging.is_paged() {
            if context.paging.page == 0 {
                results.push(
                    ValidationResult::error("Page must be 1 or greater", vec!["page".into()])
                        .with_state("paging"),
                );
            }
            if context.paging.page_size > self.max_page_size {
                results.push(
                    ValidationResult::error(
                        format!("Page size must not exceed {}", self.max_page_size),
                        vec!["pageSize".into()],
                    )
                    .with_state("paging"),
                );
            }
        }

        if let Some(performer) = self.performers.try_get_performers_for(&context.name) {
            for argument in performer.required_arguments() {
                if !context.arguments.contains(argument) {
                    results.push(
                        ValidationResult::error(
                            format!("Argument '{}' is required", argument),
                            vec![argument.to_string()],
                        )
                        .with_state("required"),
                    );
                }
            }
        }

        if results.is_empty() {
            Ok(None)
        } else {
            Ok(Some(QueryResult::with_validation_results(
                context.correlation_id,
                results,
            )))
        }
    }
}
