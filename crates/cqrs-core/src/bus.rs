//! Command/Query Bus

use async_trait::async_trait;
use arc_errors::AppResult;

use crate::{CommandPipeline, CommandRequest, CommandResult, QueryContext, QueryPipeline, QueryResult};

/// Command Bus trait
#[async_trait]
pub trait CommandBus: Send + Sync {
    async fn execute(&self, request: CommandRequest) -> AppResult<CommandResult>;

    async fn validate(&self, request: CommandRequest) -> AppResult<CommandResult>;
}

/// Query Bus trait
#[async_trait]
pub trait QueryBus: Send + Sync {
    async fn perform(&self, context: QueryContext) -> AppResult<QueryResult>;
}

#[async_trait]
impl CommandBus for CommandPipeline {
    async fn execute(&self, request: CommandRequest) -> AppResult<CommandResult> {
        CommandPipeline::execute(self, request).await
    }

    async fn validate(&self, request: CommandRequest) -> AppResult<CommandResult> {
        CommandPipeline::validate(self, request).await
    }
}

#[async_trait]
impl QueryBus for QueryPipeline {
    async fn perform(&self, context: QueryContext) -> AppResult<QueryResult> {
        QueryPipeline::perform(self, context).await
    }
}
