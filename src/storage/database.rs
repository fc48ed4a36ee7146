//! 数据库存储模块
//!
//! 使用SQLite存储规则集，`position` 列保存规则顺序（即优先级）并作为主键。
//! 规则ID不要求唯一，导入的规则集可能含有重复ID。

use crate::core::models::{Condition, Rule, RuleSet};
use crate::storage::RuleRepository;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// 数据库管理器
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 打开或创建数据库
    pub fn open(path: &Path) -> Result<Self> {
        // 确保目录存在
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("打开数据库失败: {}", path.display()))?;
        let db = Self { conn };
        db.init_tables()?;
        tracing::info!("已打开规则数据库: {}", path.display());
        Ok(db)
    }

    /// 内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_tables()?;
        Ok(db)
    }

    /// 获取默认数据库路径
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "personalize", "Personalize")
            .map(|d| d.data_dir().join("rules.db"))
            .unwrap_or_else(|| PathBuf::from("rules.db"))
    }

    /// 初始化表结构
    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- 规则表
            CREATE TABLE IF NOT EXISTS rules (
                position INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                conditions_json TEXT NOT NULL,
                content_variant TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl RuleRepository for Database {
    /// 按 position 顺序加载所有规则
    fn load_rules(&self) -> Result<RuleSet> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, conditions_json, content_variant
            FROM rules
            ORDER BY position ASC
            "#,
        )?;

        let rules = stmt.query_map([], |row| {
            let conditions_json: String = row.get(2)?;
            let conditions: Vec<Condition> = serde_json::from_str(&conditions_json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

            Ok(Rule {
                id: row.get(0)?,
                name: row.get(1)?,
                conditions,
                content_variant: row.get(3)?,
            })
        })?;

        let rules = rules.collect::<Result<Vec<_>, _>>()?;
        tracing::debug!("从数据库加载了 {} 条规则", rules.len());
        Ok(RuleSet::new(rules))
    }

    /// 在一个事务中整体替换规则表
    fn save_rules(&self, rules: &RuleSet) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM rules", [])?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO rules (id, position, name, conditions_json, content_variant, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for (position, rule) in rules.iter().enumerate() {
                let conditions_json = serde_json::to_string(&rule.conditions)?;
                stmt.execute(params![
                    rule.id,
                    position as i64,
                    rule.name,
                    conditions_json,
                    rule.content_variant,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("已保存 {} 条规则到数据库", rules.len());
        Ok(())
    }

    /// 取规则表中最新的 `updated_at`
    fn last_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(updated_at) FROM rules", [], |row| row.get(0))?;

        Ok(latest.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .ok()
        }))
    }
}
