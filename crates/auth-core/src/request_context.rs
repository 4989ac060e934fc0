//! 请求上下文访问器
//!
//! 传输层在每个调用开始时提供身份，授权评估只通过 `RequestContextAccessor` 读取

use std::future::Future;

use crate::ClaimsPrincipal;

/// 正在处理中的调用的上下文
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<ClaimsPrincipal>,
}

impl RequestContext {
    pub fn new(principal: ClaimsPrincipal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn anonymous() -> Self {
        Self { principal: None }
    }
}

/// 获取当前调用的上下文，没有调用在进行时返回 `None`
#[cfg_attr(test, mockall::automock)]
pub trait RequestContextAccessor: Send + Sync {
    fn current(&self) -> Option<RequestContext>;
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// 基于 task-local 的访问器，每个调用各自持有上下文
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocalRequestContextAccessor;

impl TaskLocalRequestContextAccessor {
    /// 在给定上下文中运行 future
    pub async fn scope<F>(context: RequestContext, future: F) -> F::Output
    where
        F: Future,
    {
        REQUEST_CONTEXT.scope(context, future).await
    }
}

impl RequestContextAccessor for TaskLocalRequestContextAccessor {
    fn current(&self) -> Option<RequestContext> {
        REQUEST_CONTEXT.try_with(Clone::clone).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_context_outside_scope() {
        assert!(TaskLocalRequestContextAccessor.current().is_none());
    }

    #[tokio::test]
    async fn test_context_visible_inside_scope_only() {
        let principal = ClaimsPrincipal::authenticated("bob", vec![]);
        let name = TaskLocalRequestContextAccessor::scope(RequestContext::new(principal), async {
            TaskLocalRequestContextAccessor
                .current()
                .and_then(|ctx| ctx.principal)
                .and_then(|p| p.name)
        })
        .await;

        assert_eq!(name.as_deref(), Some("bob"));
        assert!(TaskLocalRequestContextAccessor.current().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let first = tokio::spawn(TaskLocalRequestContextAccessor::scope(
            RequestContext::new(ClaimsPrincipal::authenticated("first", vec![])),
            async {
                tokio::task::yield_now().await;
                TaskLocalRequestContextAccessor
                    .current()
                    .and_then(|ctx| ctx.principal)
                    .and_then(|p| p.name)
            },
        ));
        let second = tokio::spawn(TaskLocalRequestContextAccessor::scope(
            RequestContext::anonymous(),
            async {
                tokio::task::yield_now().await;
                TaskLocalRequestContextAccessor
                    .current()
                    .and_then(|ctx| ctx.principal)
            },
        ));

        assert_eq!(first.await.unwrap().as_deref(), Some("first"));
        assert!(second.await.unwrap().is_none());
    }
}
