//! 中继配置（RelayConfig）
//!
//! 以 TOML 描述两个清扫任务（保留清理与失败重投）的锁名、陈旧阈值、年龄阈值与
//! 每日触发时间，以及账本分页与监听器超时。缺省值即生产节奏：
//!
//! ```toml
//! [retention]
//! lock_name = "cleanup"
//! staleness = "23h"
//! retention = "1day"
//! run_at = "17:30:00"
//!
//! [resubmission]
//! lock_name = "resubmit"
//! staleness = "23h"
//! min_age = "1h"
//! run_at = "18:30:00"
//!
//! [ledger]
//! page_size = 100
//!
//! [dispatcher]
//! # listener_timeout = "30s"
//! ```
//!
use crate::error::{DomainError, DomainResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub retention: RetentionConfig,
    pub resubmission: ResubmissionConfig,
    pub ledger: LedgerConfig,
    pub dispatcher: DispatcherConfig,
}

/// 保留清理：删除完成时间早于 `retention` 的发布记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub lock_name: String,
    #[serde(with = "humantime_serde")]
    pub staleness: Duration,
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    /// 每日触发时间（UTC）
    pub run_at: NaiveTime,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            lock_name: "cleanup".to_string(),
            staleness: 23 * HOUR,
            retention: 24 * HOUR,
            run_at: NaiveTime::from_hms_opt(17, 30, 0).unwrap_or_default(),
        }
    }
}

/// 失败重投：重新投递发布时间早于 `min_age` 的未完成记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResubmissionConfig {
    pub lock_name: String,
    #[serde(with = "humantime_serde")]
    pub staleness: Duration,
    #[serde(with = "humantime_serde")]
    pub min_age: Duration,
    /// 每日触发时间（UTC）
    pub run_at: NaiveTime,
}

impl Default for ResubmissionConfig {
    fn default() -> Self {
        Self {
            lock_name: "resubmit".to_string(),
            staleness: 23 * HOUR,
            min_age: HOUR,
            run_at: NaiveTime::from_hms_opt(18, 30, 0).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// 扫描未完成记录时每页读取的条数
    pub page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 单次监听器调用的超时；缺省不设上限
    #[serde(with = "humantime_serde")]
    pub listener_timeout: Option<Duration>,
}

impl RelayConfig {
    pub fn from_toml_str(raw: &str) -> DomainResult<Self> {
        let config: RelayConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.retention.lock_name.trim().is_empty() || self.resubmission.lock_name.trim().is_empty()
        {
            return Err(DomainError::config("lock_name must not be blank"));
        }
        // 两个清扫任务必须使用独立的锁，互不阻塞
        if self.retention.lock_name == self.resubmission.lock_name {
            return Err(DomainError::config(format!(
                "retention and resubmission share lock `{}`",
                self.retention.lock_name
            )));
        }
        if self.retention.staleness.is_zero() || self.resubmission.staleness.is_zero() {
            return Err(DomainError::config("staleness must be greater than zero"));
        }
        if self.ledger.page_size == 0 {
            return Err(DomainError::config("ledger.page_size must be greater than zero"));
        }
        if self.dispatcher.listener_timeout.is_some_and(|t| t.is_zero()) {
            return Err(DomainError::config("dispatcher.listener_timeout must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_daily_cadence() {
        let config = RelayConfig::default();
        assert_eq!(config.retention.lock_name, "cleanup");
        assert_eq!(config.retention.staleness, Duration::from_secs(23 * 3600));
        assert_eq!(config.retention.retention, Duration::from_secs(24 * 3600));
        assert_eq!(config.resubmission.lock_name, "resubmit");
        assert_eq!(config.resubmission.min_age, Duration::from_secs(3600));
        assert_eq!(config.dispatcher.listener_timeout, None);
        config.validate().unwrap();
    }

    #[test]
    fn parses_partial_toml_with_humantime_durations() {
        let config = RelayConfig::from_toml_str(
            r#"
            [resubmission]
            min_age = "30m"
            run_at = "06:15:00"

            [dispatcher]
            listener_timeout = "10s"
            "#,
        )
        .unwrap();

        assert_eq!(config.resubmission.min_age, Duration::from_secs(30 * 60));
        assert_eq!(
            config.resubmission.run_at,
            NaiveTime::from_hms_opt(6, 15, 0).unwrap()
        );
        assert_eq!(config.resubmission.lock_name, "resubmit");
        assert_eq!(config.dispatcher.listener_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.retention, RetentionConfig::default());
    }

    #[test]
    fn rejects_shared_lock_name() {
        let err = RelayConfig::from_toml_str(
            r#"
            [retention]
            lock_name = "sweeps"
            [resubmission]
            lock_name = "sweeps"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Config { .. }));
    }

    #[test]
    fn rejects_malformed_duration() {
        let err = RelayConfig::from_toml_str(
            r#"
            [retention]
            staleness = "soon"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Config { .. }));
    }

    #[test]
    fn load_validates_what_it_reads() {
        let path = std::env::temp_dir().join(format!("relay-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[ledger]\npage_size = 0\n").unwrap();

        let err = RelayConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, DomainError::Config { reason } if reason.contains("page_size")));

        let missing = RelayConfig::load(&path).unwrap_err();
        assert!(matches!(missing, DomainError::Config { .. }));
    }
}
