use serde::{Deserialize, Serialize};
use std::fmt;

/// 业务关联键（如订单号），用于将相关事件分组并定向重投
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for CorrelationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<i64> for CorrelationKey {
    fn from(key: i64) -> Self {
        Self(key.to_string())
    }
}
