//! 授权标记
//!
//! 对应 allow-anonymous / authorize 声明。标记由注册层显式登记，不做反射扫描。

use std::collections::HashMap;
use std::fmt;

/// 类型级授权目标（命令类型、performer 类型等）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTarget(pub String);

impl TypeTarget {
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 方法级授权目标
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodTarget {
    pub declaring_type: TypeTarget,
    pub method: String,
}

impl MethodTarget {
    pub fn new(declaring_type: TypeTarget, method: impl Into<String>) -> Self {
        Self {
            declaring_type,
            method: method.into(),
        }
    }

    pub fn of<T: ?Sized>(method: impl Into<String>) -> Self {
        Self::new(TypeTarget::of::<T>(), method)
    }
}

impl fmt::Display for MethodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.method)
    }
}

/// authorize 声明，roles 为逗号分隔的角色列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeAttribute {
    pub roles: Option<String>,
}

impl AuthorizeAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(roles: impl Into<String>) -> Self {
        Self {
            roles: Some(roles.into()),
        }
    }

    /// 解析后的角色，去掉空白和空项
    pub fn role_list(&self) -> Vec<&str> {
        self.roles
            .as_deref()
            .map(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// 单个目标上的标记
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markers {
    pub allow_anonymous: bool,
    pub authorize: Option<AuthorizeAttribute>,
}

/// 授权标记注册表
#[derive(Debug, Clone, Default)]
pub struct AuthorizationMarkers {
    types: HashMap<TypeTarget, Markers>,
    methods: HashMap<MethodTarget, Markers>,
}

impl AuthorizationMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_anonymous_type(mut self, target: TypeTarget) -> Self {
        self.types.entry(target).or_default().allow_anonymous = true;
        self
    }

    pub fn authorize_type(mut self, target: TypeTarget, attribute: AuthorizeAttribute) -> Self {
        self.types.entry(target).or_default().authorize = Some(attribute);
        self
    }

    pub fn allow_anonymous_method(mut self, target: MethodTarget) -> Self {
        self.methods.entry(target).or_default().allow_anonymous = true;
        self
    }

    pub fn authorize_method(mut self, target: MethodTarget, attribute: AuthorizeAttribute) -> Self {
        self.methods.entry(target).or_default().authorize = Some(attribute);
        self
    }

    pub fn for_type(&self, target: &TypeTarget) -> Option<&Markers> {
        self.types.get(target)
    }

    pub fn for_method(&self, target: &MethodTarget) -> Option<&Markers> {
        self.methods.get(target)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CreateOrder;

    #[test]
    fn test_role_list_parsing() {
        let attribute = AuthorizeAttribute::with_roles(" Admin, Editor ,,");
        assert_eq!(attribute.role_list(), vec!["Admin", "Editor"]);
        assert!(AuthorizeAttribute::new().role_list().is_empty());
    }

    #[test]
    fn test_markers_accumulate_per_target() {
        let target = TypeTarget::of::<CreateOrder>();
        let markers = AuthorizationMarkers::new()
            .allow_anonymous_type(target.clone())
            .authorize_type(target.clone(), AuthorizeAttribute::new());

        let found = markers.for_type(&target).unwrap();
        assert!(found.allow_anonymous);
        assert!(found.authorize.is_some());
        assert!(markers.for_method(&MethodTarget::new(target, "handle")).is_none());
    }

    #[test]
    fn test_target_display() {
        let method = MethodTarget::new(TypeTarget::named("Orders"), "create");
        assert_eq!(method.to_string(), "Orders::create");
    }
}
