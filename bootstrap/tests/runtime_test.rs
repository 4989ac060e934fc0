//! 运行时初始化测试（独立进程，全局 subscriber / recorder 只安装一次）

use arc_bootstrap::{ArcBuilder, init_telemetry};
use arc_config::ArcConfig;
use arc_cqrs_core::{Command, CommandContext, CommandRequest, Response, TypedCommandHandler};
use arc_errors::AppResult;
use async_trait::async_trait;

struct Ping;

impl Command for Ping {
    type Result = Response<&'static str>;
}

struct PingHandler;

#[async_trait]
impl TypedCommandHandler<Ping> for PingHandler {
    async fn handle(&self, _command: &Ping, _context: &CommandContext) -> AppResult<Response<&'static str>> {
        Ok(Response("pong"))
    }
}

#[tokio::test]
async fn test_init_telemetry_installs_metrics_recorder() {
    let config = ArcConfig::default();
    let metrics = init_telemetry(&config).unwrap();

    let pipelines = ArcBuilder::new(config.clone())
        .with_command_handler::<Ping, _>(PingHandler)
        .build()
        .unwrap();
    let result = pipelines
        .commands
        .execute(CommandRequest::new(Ping))
        .await
        .unwrap();
    assert_eq!(result.response_as::<&'static str>(), Some(&"pong"));

    let rendered = metrics.render();
    assert!(rendered.contains("commands_executed_total{outcome=\"success\"} 1"));
    assert!(rendered.contains("authorization_checks_total"));

    assert!(init_telemetry(&config).is_err());
}
