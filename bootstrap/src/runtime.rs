//! 运行时初始化

use arc_config::ArcConfig;
use arc_errors::AppResult;
use arc_telemetry::{PrometheusHandle, init_metrics, init_tracing, init_tracing_json};
use tracing::info;

/// 按配置初始化 tracing 和 Prometheus metrics，进程内只能调用一次
///
/// 返回的 handle 用于渲染 `/metrics` 输出
pub fn init_telemetry(config: &ArcConfig) -> AppResult<PrometheusHandle> {
    if config.telemetry.json {
        init_tracing_json(&config.telemetry.log_level)?;
    } else {
        init_tracing(&config.telemetry.log_level)?;
    }
    let metrics = init_metrics()?;

    info!(
        log_level = %config.telemetry.log_level,
        authorization = config.authorization.enabled,
        validation = config.validation.enabled,
        "Telemetry initialized"
    );
    Ok(metrics)
}
