//! 授权评估器
//!
//! 决策逻辑:
//! 1. 询问 allow-anonymous 评估器，第一个 `Some` 胜出
//! 2. 询问 authorize 评估器，第一个 `Some` 胜出
//! 3. 同一目标同时允许匿名又声明 authorize -> `AmbiguousAuthorizationLevel`
//! 4. 允许匿名 -> 通过
//! 5. 没有 authorize 声明 -> 通过（默认开放）
//! 6. 没有已认证的 principal -> 拒绝
//! 7. 没有声明角色 -> 通过
//! 8. principal 至少属于一个声明的角色 -> 通过

use std::sync::Arc;

use arc_errors::{AppError, AppResult};
use metrics::counter;
use tracing::debug;

use crate::{
    AnonymousEvaluator, AuthorizationAttributeEvaluator, AuthorizationMarkers,
    AuthorizeAttribute, MarkerAnonymousEvaluator, MarkerAuthorizationAttributeEvaluator,
    MethodTarget, RequestContextAccessor, TypeTarget,
};

/// 单个目标上解析出的授权级别
#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthorizationLevel {
    AllowAnonymous,
    Authorize(AuthorizeAttribute),
    Unspecified,
}

pub struct AuthorizationEvaluator {
    anonymous_evaluators: Vec<Arc<dyn AnonymousEvaluator>>,
    attribute_evaluators: Vec<Arc<dyn AuthorizationAttributeEvaluator>>,
    request_context: Arc<dyn RequestContextAccessor>,
}

impl AuthorizationEvaluator {
    pub fn new(
        anonymous_evaluators: Vec<Arc<dyn AnonymousEvaluator>>,
        attribute_evaluators: Vec<Arc<dyn AuthorizationAttributeEvaluator>>,
        request_context: Arc<dyn RequestContextAccessor>,
    ) -> Self {
        Self {
            anonymous_evaluators,
            attribute_evaluators,
            request_context,
        }
    }

    /// 只使用标记注册表的评估器
    pub fn from_markers(
        markers: Arc<AuthorizationMarkers>,
        request_context: Arc<dyn RequestContextAccessor>,
    ) -> Self {
        Self::new(
            vec![Arc::new(MarkerAnonymousEvaluator::new(markers.clone()))],
            vec![Arc::new(MarkerAuthorizationAttributeEvaluator::new(markers))],
            request_context,
        )
    }

    pub fn is_authorized_type(&self, target: &TypeTarget) -> AppResult<bool> {
        let anonymous = self
            .anonymous_evaluators
            .iter()
            .find_map(|e| e.is_anonymous_allowed_for_type(target));
        let authorize = self
            .attribute_evaluators
            .iter()
            .find_map(|e| e.authorize_for_type(target));

        let level = resolve_level(&target.to_string(), anonymous, authorize)?;
        let allowed = match level {
            AuthorizationLevel::AllowAnonymous | AuthorizationLevel::Unspecified => true,
            AuthorizationLevel::Authorize(attribute) => self.principal_satisfies(&attribute),
        };

        record_decision(&target.to_string(), allowed);
        Ok(allowed)
    }

    /// 方法级判断：先完成类型级判断，方法上的显式标记再覆盖它
    pub fn is_authorized_method(&self, target: &MethodTarget) -> AppResult<bool> {
        self.is_authorized_method_within(target, std::slice::from_ref(&target.declaring_type))
    }

    /// 方法级判断，类型级判断取自给定的外层作用域（全部通过才算通过）
    ///
    /// 例如命令 handler 的方法以命令类型和 handler 类型为作用域。
    /// 方法上的显式标记覆盖作用域的判断，作用域上的歧义仍然报错。
    pub fn is_authorized_method_within(
        &self,
        target: &MethodTarget,
        scopes: &[TypeTarget],
    ) -> AppResult<bool> {
        let mut type_decision = true;
        for scope in scopes {
            type_decision &= self.is_authorized_type(scope)?;
        }

        let anonymous = self
            .anonymous_evaluators
            .iter()
            .find_map(|e| e.is_anonymous_allowed_for_method(target));
        let authorize = self
            .attribute_evaluators
            .iter()
            .find_map(|e| e.authorize_for_method(target));

        let allowed = match resolve_level(&target.to_string(), anonymous, authorize)? {
            AuthorizationLevel::AllowAnonymous => true,
            AuthorizationLevel::Authorize(attribute) => self.principal_satisfies(&attribute),
            AuthorizationLevel::Unspecified => type_decision,
        };

        record_decision(&target.to_string(), allowed);
        Ok(allowed)
    }

    fn principal_satisfies(&self, attribute: &AuthorizeAttribute) -> bool {
        let Some(principal) = self
            .request_context
            .current()
            .and_then(|ctx| ctx.principal)
        else {
            return false;
        };

        if !principal.is_authenticated() {
            return false;
        }

        let roles = attribute.role_list();
        roles.is_empty() || principal.is_in_any_role(&roles)
    }
}

fn resolve_level(
    target: &str,
    anonymous: Option<bool>,
    authorize: Option<AuthorizeAttribute>,
) -> AppResult<AuthorizationLevel> {
    match (anonymous, authorize) {
        (Some(true), Some(_)) => Err(AppError::ambiguous_authorization_level(target)),
        (Some(true), None) => Ok(AuthorizationLevel::AllowAnonymous),
        (_, Some(attribute)) => Ok(AuthorizationLevel::Authorize(attribute)),
        (_, None) => Ok(AuthorizationLevel::Unspecified),
    }
}

fn record_decision(target: &str, allowed: bool) {
    debug!(target_name = target, allowed, "Authorization evaluated");
    counter!("authorization_checks_total", "allowed" => allowed.to_string()).increment(1);
}
