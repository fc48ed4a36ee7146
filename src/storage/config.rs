//! 配置文件管理模块

use crate::core::models::{AppConfig, StorageBackend};
use crate::storage::database::Database;
use crate::storage::json_file::JsonRuleFile;
use crate::storage::RuleRepository;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// 配置管理器
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// 获取默认配置路径
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "personalize", "Personalize")
            .map(|d| d.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(&self) -> Result<AppConfig> {
        if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            serde_json::from_str(&content)
                .with_context(|| format!("解析配置文件失败: {}", self.config_path.display()))
        } else {
            Ok(AppConfig::default())
        }
    }

    /// 保存配置
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// 重置为默认配置
    pub fn reset(&self) -> Result<()> {
        self.save(&AppConfig::default())
    }
}

/// 按配置打开规则存储
pub fn open_repository(config: &AppConfig) -> Result<Box<dyn RuleRepository>> {
    match config.storage {
        StorageBackend::Sqlite => {
            let path = config
                .rules_db_path
                .clone()
                .unwrap_or_else(Database::default_path);
            Ok(Box::new(Database::open(&path)?))
        }
        StorageBackend::Json => {
            let path = config
                .rules_file_path
                .clone()
                .unwrap_or_else(JsonRuleFile::default_path);
            tracing::info!("使用 JSON 规则文件: {}", path.display());
            Ok(Box::new(JsonRuleFile::new(path)))
        }
    }
}
