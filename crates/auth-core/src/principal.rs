//! 当前调用的身份

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 调用方身份及其角色
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsPrincipal {
    /// 用户名
    pub name: Option<String>,
    /// 是否已认证
    pub authenticated: bool,
    /// 角色
    #[serde(default)]
    pub roles: Vec<String>,
    /// 其他声明
    #[serde(default)]
    pub claims: HashMap<String, String>,
}

impl ClaimsPrincipal {
    pub fn authenticated(name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            name: Some(name.into()),
            authenticated: true,
            roles,
            claims: HashMap::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// 角色比较区分大小写
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_in_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.is_in_role(r))
    }
}
