//! 管道构建器
//!
//! # 示例
//!
//! ```ignore
//! use arc_bootstrap::ArcBuilder;
//!
//! let pipelines = ArcBuilder::new(config)
//!     .with_command_handler::<RegisterUser, _>(RegisterUserHandler::new(repo))
//!     .with_query_performer(Arc::new(AllUsers::new(repo)))
//!     .with_markers(markers)
//!     .build()?;
//!
//! let result = pipelines.commands.execute(CommandRequest::new(command)).await?;
//! ```

use std::sync::Arc;

use arc_auth_core::{
    AuthorizationEvaluator, AuthorizationMarkers, RequestContextAccessor,
    TaskLocalRequestContextAccessor,
};
use arc_common::Paging;
use arc_config::ArcConfig;
use arc_cqrs_core::{
    AuthorizationFilter, Command, CommandContextModifier, CommandContextValuesProvider,
    CommandFilter, CommandFilters, CommandHandlers, CommandPipeline, CommandResponseValueHandler,
    CommandResponseValueHandlers, CommandValidator, CommandValidators, DependencyResolver,
    FullyQualifiedQueryName, QueryAuthorizationFilter, QueryContext, QueryFilter, QueryFilters,
    QueryPerformer, QueryPerformers, QueryPipeline, QueryValidationFilter, TypedCommandHandler,
    ValidationFilter,
};
use arc_errors::{AppError, AppResult};
use arc_event_core::{
    EventLog, EventTypes, EventsCommandResponseValueHandler,
    SingleEventCommandResponseValueHandler,
};
use tracing::info;

/// 构建完成的管道
#[derive(Clone)]
pub struct Pipelines {
    pub commands: Arc<CommandPipeline>,
    pub queries: Arc<QueryPipeline>,
    default_page_size: u32,
}

impl Pipelines {
    /// 使用配置的默认分页创建查询上下文
    pub fn query(&self, name: impl Into<String>) -> QueryContext {
        QueryContext::new(FullyQualifiedQueryName::new(name))
            .with_paging(Paging::new(1, self.default_page_size))
    }
}

pub struct ArcBuilder {
    config: ArcConfig,
    handlers: CommandHandlers,
    performers: QueryPerformers,
    validators: CommandValidators,
    command_filters: Vec<Arc<dyn CommandFilter>>,
    query_filters: Vec<Arc<dyn QueryFilter>>,
    response_value_handlers: Vec<Arc<dyn CommandResponseValueHandler>>,
    values_providers: Vec<Arc<dyn CommandContextValuesProvider>>,
    modifiers: Vec<Arc<dyn CommandContextModifier>>,
    dependency_resolver: Option<Arc<dyn DependencyResolver>>,
    markers: AuthorizationMarkers,
    request_context: Arc<dyn RequestContextAccessor>,
    /// 注册阶段的错误延迟到 `build` 返回
    errors: Vec<AppError>,
}

impl ArcBuilder {
    pub fn new(config: ArcConfig) -> Self {
        Self {
            config,
            handlers: CommandHandlers::new(),
            performers: QueryPerformers::new(),
            validators: CommandValidators::new(),
            command_filters: Vec::new(),
            query_filters: Vec::new(),
            response_value_handlers: Vec::new(),
            values_providers: Vec::new(),
            modifiers: Vec::new(),
            dependency_resolver: None,
            markers: AuthorizationMarkers::new(),
            request_context: Arc::new(TaskLocalRequestContextAccessor),
            errors: Vec::new(),
        }
    }

    pub fn with_command_handler<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: TypedCommandHandler<C>,
    {
        if let Err(e) = self.handlers.register::<C, H>(handler) {
            self.errors.push(e);
        }
        self
    }

    pub fn with_query_performer(mut self, performer: Arc<dyn QueryPerformer>) -> Self {
        if let Err(e) = self.performers.register(performer) {
            self.errors.push(e);
        }
        self
    }

    pub fn with_validator<C, V>(mut self, validator: V) -> Self
    where
        C: Command,
        V: CommandValidator<C>,
    {
        self.validators.register::<C, V>(validator);
        self
    }

    /// 自定义过滤器排在内置过滤器之后
    pub fn with_command_filter(mut self, filter: Arc<dyn CommandFilter>) -> Self {
        self.command_filters.push(filter);
        self
    }

    pub fn with_query_filter(mut self, filter: Arc<dyn QueryFilter>) -> Self {
        self.query_filters.push(filter);
        self
    }

    pub fn with_response_value_handler(
        mut self,
        handler: Arc<dyn CommandResponseValueHandler>,
    ) -> Self {
        self.response_value_handlers.push(handler);
        self
    }

    /// 注册单事件和多事件响应值处理器
    pub fn with_event_log(mut self, event_types: Arc<EventTypes>, event_log: Arc<dyn EventLog>) -> Self {
        self.response_value_handlers
            .push(Arc::new(SingleEventCommandResponseValueHandler::new(
                event_types.clone(),
                event_log.clone(),
            )));
        self.response_value_handlers
            .push(Arc::new(EventsCommandResponseValueHandler::new(
                event_types,
                event_log,
            )));
        self
    }

    pub fn with_values_provider(mut self, provider: Arc<dyn CommandContextValuesProvider>) -> Self {
        self.values_providers.push(provider);
        self
    }

    pub fn with_modifier(mut self, modifier: Arc<dyn CommandContextModifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_dependency_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.dependency_resolver = Some(resolver);
        self
    }

    pub fn with_markers(mut self, markers: AuthorizationMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_request_context(mut self, accessor: Arc<dyn RequestContextAccessor>) -> Self {
        self.request_context = accessor;
        self
    }

    pub fn build(self) -> AppResult<Pipelines> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }

        let handlers = Arc::new(self.handlers);
        let performers = Arc::new(self.performers);
        let evaluator = Arc::new(AuthorizationEvaluator::from_markers(
            Arc::new(self.markers),
            self.request_context,
        ));

        let mut command_filters = CommandFilters::default();
        let mut query_filters = QueryFilters::default();

        if self.config.authorization.enabled {
            command_filters.push(Arc::new(AuthorizationFilter::new(
                evaluator.clone(),
                handlers.clone(),
            )));
            query_filters.push(Arc::new(QueryAuthorizationFilter::new(
                evaluator,
                performers.clone(),
            )));
        }

        if self.config.validation.enabled {
            if !self.validators.is_empty() {
                command_filters.push(Arc::new(ValidationFilter::new(Arc::new(self.validators))));
            }
            query_filters.push(Arc::new(QueryValidationFilter::new(
                performers.clone(),
                self.config.queries.max_page_size,
            )));
        }

        for filter in self.command_filters {
            command_filters.push(filter);
        }
        for filter in self.query_filters {
            query_filters.push(filter);
        }

        info!(
            command_handlers = handlers.len(),
            query_performers = performers.len(),
            command_filters = command_filters.len(),
            query_filters = query_filters.len(),
            "Pipelines built"
        );

        let mut commands = CommandPipeline::new(
            command_filters,
            handlers,
            CommandResponseValueHandlers::new(self.response_value_handlers),
        );
        for provider in self.values_providers {
            commands = commands.with_values_provider(provider);
        }
        for modifier in self.modifiers {
            commands = commands.with_modifier(modifier);
        }
        if let Some(resolver) = self.dependency_resolver {
            commands = commands.with_dependency_resolver(resolver);
        }

        Ok(Pipelines {
            commands: Arc::new(commands),
            queries: Arc::new(QueryPipeline::new(query_filters, performers)),
            default_page_size: self.config.queries.default_page_size,
        })
    }
}
