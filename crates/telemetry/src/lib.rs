//! arc-telemetry - 可观测性库
//!
//! tracing subscriber 与 Prometheus metrics recorder 的初始化

use arc_errors::{AppError, AppResult};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
pub use metrics_exporter_prometheus::PrometheusHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` 优先，否则使用配置的级别
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// 初始化 tracing
pub fn init_tracing(log_level: &str) -> AppResult<()> {
    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| AppError::internal(format!("Failed to install tracing subscriber: {}", e)))
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) -> AppResult<()> {
    tracing_subscriber::registry()
        .with(env_filter(log_level))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| AppError::internal(format!("Failed to install tracing subscriber: {}", e)))
}

/// 初始化 Prometheus metrics
pub fn init_metrics() -> AppResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    describe_metrics();
    Ok(handle)
}

/// 管道和授权评估器记录的指标
pub fn describe_metrics() {
    describe_counter!(
        "authorization_checks_total",
        "Authorization decisions, labelled by outcome"
    );
    describe_counter!(
        "commands_executed_total",
        "Executed commands, labelled by outcome"
    );
    describe_counter!(
        "queries_performed_total",
        "Performed queries, labelled by outcome"
    );
    describe_histogram!(
        "command_execution_duration_ms",
        "Command execution duration in milliseconds"
    );
    describe_histogram!("query_duration_ms", "Query duration in milliseconds");
}
