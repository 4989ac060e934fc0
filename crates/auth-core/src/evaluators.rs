//! 可插拔的标记评估器
//!
//! 多个评估器按注册顺序询问，第一个给出明确答案的胜出

use std::sync::Arc;

use crate::{AuthorizationMarkers, AuthorizeAttribute, MethodTarget, TypeTarget};

/// allow-anonymous 评估器
///
/// `Some(true)` 允许匿名，`Some(false)` 明确要求授权，`None` 无意见
pub trait AnonymousEvaluator: Send + Sync {
    fn is_anonymous_allowed_for_type(&self, target: &TypeTarget) -> Option<bool>;

    fn is_anonymous_allowed_for_method(&self, target: &MethodTarget) -> Option<bool>;
}

/// authorize 声明评估器，`None` 表示目标上没有 authorize 声明
pub trait AuthorizationAttributeEvaluator: Send + Sync {
    fn authorize_for_type(&self, target: &TypeTarget) -> Option<AuthorizeAttribute>;

    fn authorize_for_method(&self, target: &MethodTarget) -> Option<AuthorizeAttribute>;
}

/// 读取 `AuthorizationMarkers` 的 allow-anonymous 评估器
pub struct MarkerAnonymousEvaluator {
    markers: Arc<AuthorizationMarkers>,
}

impl MarkerAnonymousEvaluator {
    pub fn new(markers: Arc<AuthorizationMarkers>) -> Self {
        Self { markers }
    }
}

fn anonymous_opinion(markers: Option<&crate::Markers>) -> Option<bool> {
    let markers = markers?;
    if markers.allow_anonymous {
        Some(true)
    } else if markers.authorize.is_some() {
        Some(false)
    } else {
        None
    }
}

impl AnonymousEvaluator for MarkerAnonymousEvaluator {
    fn is_anonymous_allowed_for_type(&self, target: &TypeTarget) -> Option<bool> {
        anonymous_opinion(self.markers.for_type(target))
    }

    fn is_anonymous_allowed_for_method(&self, target: &MethodTarget) -> Option<bool> {
        anonymous_opinion(self.markers.for_method(target))
    }
}

/// 读取 `AuthorizationMarkers` 的 authorize 评估器
pub struct MarkerAuthorizationAttributeEvaluator {
    markers: Arc<AuthorizationMarkers>,
}

impl MarkerAuthorizationAttributeEvaluator {
    pub fn new(markers: Arc<AuthorizationMarkers>) -> Self {
        Self { markers }
    }
}

impl AuthorizationAttributeEvaluator for MarkerAuthorizationAttributeEvaluator {
    fn authorize_for_type(&self, target: &TypeTarget) -> Option<AuthorizeAttribute> {
        self.markers
            .for_type(target)
            .and_then(|m| m.authorize.clone())
    }

    fn authorize_for_method(&self, target: &MethodTarget) -> Option<AuthorizeAttribute> {
        self.markers
            .for_method(target)
            .and_then(|m| m.authorize.clone())
    }
}
