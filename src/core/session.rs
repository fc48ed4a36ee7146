//! 个性化会话
//!
//! 编辑界面的控制器：持有当前规则集和正在查看的用户画像。
//! 每次规则修改或切换画像后都会重新求值；配置了持久化时修改后立即保存。

use crate::core::evaluator::{evaluate, evaluate_detailed};
use crate::core::models::{RuleSet, UserProfile, DEFAULT_VARIANT};
use crate::core::rule_store::{ConditionField, RuleField, RuleStore};
use crate::storage::RuleRepository;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// 会话错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("找不到用户画像: {0}")]
    UnknownProfile(String),
}

/// 单个画像的求值结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOutcome {
    pub profile_id: String,
    pub profile_name: String,
    pub variant: String,
    pub matched_rule_id: Option<String>,
}

/// 个性化会话
pub struct PersonalizationSession {
    store: RuleStore,
    profiles: Vec<UserProfile>,
    selected: usize,
    variant: String,
    repository: Option<Box<dyn RuleRepository>>,
    /// 最近一次成功保存的规则集指纹
    saved_fingerprint: Option<String>,
}

impl PersonalizationSession {
    /// 创建会话，默认查看第一个画像
    pub fn new(store: RuleStore, profiles: Vec<UserProfile>) -> Self {
        let mut session = Self {
            store,
            profiles,
            selected: 0,
            variant: DEFAULT_VARIANT.to_string(),
            repository: None,
            saved_fingerprint: None,
        };
        session.recompute();
        session
    }

    /// 绑定持久化层并从中恢复规则集
    pub fn with_repository(mut self, repository: Box<dyn RuleRepository>) -> Result<Self> {
        let rules = repository.load_rules()?;
        tracing::info!("已恢复 {} 条规则", rules.len());
        self.saved_fingerprint = Some(rules.fingerprint());
        self.store.replace(rules);
        self.repository = Some(repository);
        self.recompute();
        Ok(self)
    }

    /// 当前规则集快照
    pub fn rules(&self) -> Arc<RuleSet> {
        self.store.snapshot()
    }

    pub fn profiles(&self) -> &[UserProfile] {
        &self.profiles
    }

    /// 正在查看的画像（画像列表为空时为 `None`）
    pub fn selected_profile(&self) -> Option<&UserProfile> {
        self.profiles.get(self.selected)
    }

    /// 当前画像对应的内容变体键
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// 存储中最近一次保存的时间（未绑定存储时为 `None`）
    pub fn last_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        match &self.repository {
            Some(repository) => repository.last_saved_at(),
            None => Ok(None),
        }
    }

    /// 切换正在查看的画像
    pub fn select_profile(&mut self, profile_id: &str) -> Result<&str, SessionError> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.id == profile_id)
            .ok_or_else(|| SessionError::UnknownProfile(profile_id.to_string()))?;
        self.selected = index;
        self.recompute();
        Ok(&self.variant)
    }

    /// 对所有画像求值
    pub fn evaluate_all(&self) -> Vec<ProfileOutcome> {
        let rules = self.store.snapshot();
        self.profiles
            .iter()
            .map(|profile| {
                let result = evaluate_detailed(profile, &rules);
                ProfileOutcome {
                    profile_id: profile.id.clone(),
                    profile_name: profile.name.clone(),
                    variant: result.variant.to_string(),
                    matched_rule_id: result.matched_rule_id.map(str::to_string),
                }
            })
            .collect()
    }

    /// 新建规则，返回新规则ID
    pub fn add_rule(&mut self) -> Result<String> {
        let (snapshot, id) = self.store.add_rule();
        self.commit(&snapshot)?;
        Ok(id)
    }

    pub fn update_rule(&mut self, id: &str, field: RuleField) -> Result<()> {
        let snapshot = self.store.update_rule(id, field);
        self.commit(&snapshot)
    }

    pub fn add_condition(&mut self, id: &str) -> Result<()> {
        let snapshot = self.store.add_condition(id);
        self.commit(&snapshot)
    }

    pub fn update_condition(&mut self, id: &str, index: usize, field: ConditionField) -> Result<()> {
        let snapshot = self.store.update_condition(id, index, field);
        self.commit(&snapshot)
    }

    pub fn delete_condition(&mut self, id: &str, index: usize) -> Result<()> {
        let snapshot = self.store.delete_condition(id, index);
        self.commit(&snapshot)
    }

    pub fn delete_rule(&mut self, id: &str) -> Result<()> {
        let snapshot = self.store.delete_rule(id);
        self.commit(&snapshot)
    }

    /// 整体替换规则集（导入）
    pub fn replace_rules(&mut self, rules: RuleSet) -> Result<()> {
        let snapshot = self.store.replace(rules);
        self.commit(&snapshot)
    }

    /// 修改后重新求值并保存
    ///
    /// 保存失败时内存中的修改保留，错误返回给调用方。
    fn commit(&mut self, snapshot: &RuleSet) -> Result<()> {
        self.recompute_with(snapshot);

        let Some(repository) = &self.repository else {
            return Ok(());
        };

        let fingerprint = snapshot.fingerprint();
        if self.saved_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            tracing::trace!("规则集未变化，跳过保存");
            return Ok(());
        }

        if let Err(e) = repository.save_rules(snapshot) {
            tracing::warn!("保存规则失败: {:#}", e);
            return Err(e);
        }
        self.saved_fingerprint = Some(fingerprint);
        Ok(())
    }

    fn recompute(&mut self) {
        let snapshot = self.store.snapshot();
        self.recompute_with(&snapshot);
    }

    fn recompute_with(&mut self, rules: &RuleSet) {
        self.variant = match self.profiles.get(self.selected) {
            Some(profile) => evaluate(profile, rules).to_string(),
            None => DEFAULT_VARIANT.to_string(),
        };
    }
}
