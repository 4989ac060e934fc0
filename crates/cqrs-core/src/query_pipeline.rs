//! 查询管道：过滤器链 → performer 解析 → 取消检查 → 执行 → 分页信息

use std::sync::Arc;
use std::time::Instant;

use arc_common::PagingInfo;
use arc_errors::{AppError, AppResult};
use metrics::{counter, histogram};
use tracing::{Instrument, debug, info_span, warn};

use crate::{QueryContext, QueryFilters, QueryPerformerProvider, QueryResult, ResultEnvelope};

pub struct QueryPipeline {
    filters: QueryFilters,
    performers: Arc<dyn QueryPerformerProvider>,
}

impl QueryPipeline {
    pub fn new(filters: QueryFilters, performers: Arc<dyn QueryPerformerProvider>) -> Self {
        Self {
            filters,
            performers,
        }
    }

    pub async fn perform(&self, context: QueryContext) -> AppResult<QueryResult> {
        let span = info_span!(
            "perform_query",
            query = %context.name,
            correlation_id = %context.correlation_id
        );

        async move {
            let start = Instant::now();
            let result = self.perform_in_span(&context).await;

            let outcome = match &result {
                Ok(result) if result.is_success() => "success",
                Ok(result) if !result.is_authorized => "unauthorized",
                Ok(result) if !result.is_valid() => "invalid",
                Ok(_) => "failed",
                Err(_) => "error",
            };
            counter!("queries_performed_total", "outcome" => outcome).increment(1);
            histogram!("query_duration_ms").record(start.elapsed().as_millis() as f64);

            result
        }
        .instrument(span)
        .await
    }

    async fn perform_in_span(&self, context: &QueryContext) -> AppResult<QueryResult> {
        let filter_result = self.filters.on_perform(context).await?;
        if !filter_result.is_success() {
            debug!(
                authorized = filter_result.is_authorized,
                valid = filter_result.is_valid(),
                "Query rejected by filters"
            );
            return Ok(filter_result);
        }

        let Some(performer) = self.performers.try_get_performers_for(&context.name) else {
            warn!(query = %context.name, "No performer found for query");
            return Ok(filter_result.merged_with(Some(QueryResult::missing_performer(
                context.correlation_id,
                context.name.as_str(),
            ))));
        };

        if context.cancellation.is_cancelled() {
            debug!(query = %context.name, "Query cancelled before dispatch");
            return Ok(filter_result.merged_with(Some(QueryResult::failed(
                context.correlation_id,
                &AppError::Cancelled,
            ))));
        }

        let performed = match performer.perform(context).await {
            Ok(data) => {
                let total_items = data.total_items.unwrap_or_default();
                QueryResult::success(context.correlation_id)
                    .with_data(data.value, PagingInfo::new(&context.paging, total_items))
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(query = %context.name, error = %err, "Query performer failed");
                QueryResult::failed(context.correlation_id, &err)
            }
        };

        Ok(filter_result.merged_with(Some(performed)))
    }
}

impl std::fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("filters", &self.filters.len())
            .finish()
    }
}
