//! JSON 文件存储
//!
//! 规则集以格式化的 JSON 数组保存，字段名与内存模型一致，便于手工查看和导入导出。

use crate::core::models::RuleSet;
use crate::storage::RuleRepository;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// JSON 规则文件
pub struct JsonRuleFile {
    path: PathBuf,
}

impl JsonRuleFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// 获取默认规则文件路径
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "personalize", "Personalize")
            .map(|d| d.data_dir().join("rules.json"))
            .unwrap_or_else(|| PathBuf::from("rules.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 解析规则集 JSON
pub fn parse_rules(json: &str) -> Result<RuleSet> {
    Ok(serde_json::from_str(json)?)
}

/// 规则集导出为格式化 JSON
pub fn rules_to_json(rules: &RuleSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(rules)?)
}

impl RuleRepository for JsonRuleFile {
    /// 文件不存在时返回空规则集
    fn load_rules(&self) -> Result<RuleSet> {
        if !self.path.exists() {
            return Ok(RuleSet::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("读取规则文件失败: {}", self.path.display()))?;
        parse_rules(&content)
            .with_context(|| format!("解析规则文件失败: {}", self.path.display()))
    }

    fn save_rules(&self, rules: &RuleSet) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = rules_to_json(rules)?;
        fs::write(&self.path, content)
            .with_context(|| format!("写入规则文件失败: {}", self.path.display()))?;
        tracing::debug!("已保存 {} 条规则到 {}", rules.len(), self.path.display());
        Ok(())
    }

    /// 使用文件的修改时间
    fn last_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let modified = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .with_context(|| format!("读取规则文件时间失败: {}", self.path.display()))?;
        Ok(Some(DateTime::<Utc>::from(modified)))
    }
}
