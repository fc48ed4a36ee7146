//! 存储模块 - 规则持久化与配置文件

pub mod config;
pub mod database;
pub mod json_file;

use crate::core::models::RuleSet;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// 规则持久化接口
///
/// 核心逻辑不做 I/O，规则集的保存和恢复全部经由此接口完成。
pub trait RuleRepository {
    /// 加载完整的有序规则集
    fn load_rules(&self) -> Result<RuleSet>;

    /// 整体保存规则集（保持顺序）
    fn save_rules(&self, rules: &RuleSet) -> Result<()>;

    /// 最近一次保存的时间，从未保存过时为 `None`
    fn last_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(None)
    }
}
