//! 管道构建测试

use std::sync::Arc;

use arc_auth_core::{
    AuthorizationMarkers, AuthorizeAttribute, ClaimsPrincipal, RequestContext,
    TaskLocalRequestContextAccessor, TypeTarget,
};
use arc_bootstrap::ArcBuilder;
use arc_config::ArcConfig;
use arc_cqrs_core::{
    Command, CommandContext, CommandRequest, CommandValidator, FullyQualifiedQueryName,
    QueryContext, QueryData, QueryPerformer, Response, ResultEnvelope, TypedCommandHandler,
    ValidationResult,
};
use arc_errors::{AppError, AppResult};
use async_trait::async_trait;

struct CreateProject {
    name: String,
}

impl Command for CreateProject {
    type Result = Response<String>;
}

struct CreateProjectHandler;

#[async_trait]
impl TypedCommandHandler<CreateProject> for CreateProjectHandler {
    async fn handle(
        &self,
        command: &CreateProject,
        _context: &CommandContext,
    ) -> AppResult<Response<String>> {
        Ok(Response(format!("created {}", command.name)))
    }
}

struct NameRequired;

#[async_trait]
impl CommandValidator<CreateProject> for NameRequired {
    async fn validate(
        &self,
        command: &CreateProject,
        _context: &CommandContext,
    ) -> AppResult<Vec<ValidationResult>> {
        if command.name.is_empty() {
            return Ok(vec![ValidationResult::error("name is required", vec!["name".into()])]);
        }
        Ok(Vec::new())
    }
}

struct AllProjects;

#[async_trait]
impl QueryPerformer for AllProjects {
    fn name(&self) -> FullyQualifiedQueryName {
        FullyQualifiedQueryName::new("projects.all")
    }

    async fn perform(&self, _context: &QueryContext) -> AppResult<QueryData> {
        Ok(QueryData::new(vec!["alpha".to_string()]).with_total_items(1))
    }
}

fn create(name: &str) -> CommandRequest {
    CommandRequest::new(CreateProject { name: name.into() })
}

#[tokio::test]
async fn test_built_pipelines_run_validators_and_handlers() {
    let pipelines = ArcBuilder::new(ArcConfig::default())
        .with_command_handler::<CreateProject, _>(CreateProjectHandler)
        .with_validator::<CreateProject, _>(NameRequired)
        .with_query_performer(Arc::new(AllProjects))
        .build()
        .unwrap();

    let created = pipelines.commands.execute(create("alpha")).await.unwrap();
    assert_eq!(created.response_as::<String>().unwrap(), "created alpha");

    let rejected = pipelines.commands.execute(create("")).await.unwrap();
    assert!(!rejected.is_valid());

    let projects = pipelines
        .queries
        .perform(pipelines.query("projects.all"))
        .await
        .unwrap();
    assert!(projects.is_success());
    assert_eq!(projects.paging.size, 20);
    assert_eq!(projects.paging.total_pages, 1);
}

#[tokio::test]
async fn test_disabled_validation_skips_validators() {
    let mut config = ArcConfig::default();
    config.validation.enabled = false;

    let pipelines = ArcBuilder::new(config)
        .with_command_handler::<CreateProject, _>(CreateProjectHandler)
        .with_validator::<CreateProject, _>(NameRequired)
        .build()
        .unwrap();

    let result = pipelines.commands.execute(create("")).await.unwrap();
    assert!(result.is_success());
}

#[tokio::test]
async fn test_markers_are_enforced() {
    let markers = AuthorizationMarkers::new().authorize_type(
        TypeTarget::of::<CreateProject>(),
        AuthorizeAttribute::with_roles("Owner"),
    );
    let pipelines = ArcBuilder::new(ArcConfig::default())
        .with_command_handler::<CreateProject, _>(CreateProjectHandler)
        .with_markers(markers)
        .build()
        .unwrap();

    let anonymous = pipelines.commands.execute(create("alpha")).await.unwrap();
    assert!(!anonymous.is_authorized);

    let owner = RequestContext::new(ClaimsPrincipal::authenticated("ana", vec!["Owner".into()]));
    let allowed = TaskLocalRequestContextAccessor::scope(
        owner,
        pipelines.commands.execute(create("alpha")),
    )
    .await
    .unwrap();
    assert!(allowed.is_success());
}

#[tokio::test]
async fn test_oversized_page_rejected_by_config_limit() {
    let pipelines = ArcBuilder::new(ArcConfig::default())
        .with_query_performer(Arc::new(AllProjects))
        .build()
        .unwrap();

    let context = pipelines
        .query("projects.all")
        .with_paging(arc_common::Paging::new(1, 1000));
    let result = pipelines.queries.perform(context).await.unwrap();

    assert!(!result.is_valid());
}

#[test]
fn test_duplicate_registration_fails_build() {
    let result = ArcBuilder::new(ArcConfig::default())
        .with_command_handler::<CreateProject, _>(CreateProjectHandler)
        .with_command_handler::<CreateProject, _>(CreateProjectHandler)
        .build();

    assert!(matches!(result, Err(AppError::Conflict(_))));
}
