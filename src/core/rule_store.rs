//! 规则存储模块
//!
//! 负责规则集的结构性修改：按 ID 操作规则，按下标操作条件。
//! 所有修改都是写时复制：原规则集保持不变，返回一个新的规则集。
//! 找不到目标 ID 或下标越界时静默不做任何修改。

use crate::core::id_gen::{IdGenerator, UuidIdGenerator};
use crate::core::models::{Condition, Operator, Rule, RuleSet, DEFAULT_VARIANT};
use arc_swap::ArcSwap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

/// 规则字段修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleField {
    Name(String),
    ContentVariant(String),
    Conditions(Vec<Condition>),
}

/// 条件字段修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionField {
    Property(String),
    Operator(Operator),
    Value(String),
}

/// 编辑界面传入的字段名无法识别
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("未知的规则字段: {0}（可用: name, contentVariant, conditions）")]
    UnknownRuleField(String),
    #[error("未知的条件字段: {0}（可用: property, operator, value）")]
    UnknownConditionField(String),
    #[error("条件列表格式错误: {0}")]
    InvalidConditions(String),
}

impl RuleField {
    /// 由字段名和文本值构造
    ///
    /// `conditions` 字段的值为条件数组的 JSON。
    pub fn parse(field: &str, value: &str) -> Result<Self, FieldError> {
        match field {
            "name" => Ok(RuleField::Name(value.to_string())),
            "contentVariant" | "content_variant" => {
                Ok(RuleField::ContentVariant(value.to_string()))
            }
            "conditions" => serde_json::from_str(value)
                .map(RuleField::Conditions)
                .map_err(|e| FieldError::InvalidConditions(e.to_string())),
            other => Err(FieldError::UnknownRuleField(other.to_string())),
        }
    }

    fn apply(self, rule: &mut Rule) {
        match self {
            RuleField::Name(name) => rule.name = name,
            RuleField::ContentVariant(variant) => rule.content_variant = variant,
            RuleField::Conditions(conditions) => rule.conditions = conditions,
        }
    }
}

impl ConditionField {
    /// 由字段名和文本值构造
    pub fn parse(field: &str, value: &str) -> Result<Self, FieldError> {
        match field {
            "property" => Ok(ConditionField::Property(value.to_string())),
            "operator" => Ok(ConditionField::Operator(Operator::from(value))),
            "value" => Ok(ConditionField::Value(value.to_string())),
            other => Err(FieldError::UnknownConditionField(other.to_string())),
        }
    }

    fn apply(self, condition: &mut Condition) {
        match self {
            ConditionField::Property(property) => condition.property = property,
            ConditionField::Operator(operator) => condition.operator = operator,
            ConditionField::Value(value) => condition.value = value,
        }
    }
}

impl RuleSet {
    /// 按ID查找规则
    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.iter().find(|r| r.id == id)
    }

    /// 追加一条新规则
    ///
    /// 名称按当前数量生成（"New Rule {n+1}"），带一个空条件。
    pub fn with_rule_added(&self, id: String, content_variant: &str) -> RuleSet {
        let mut rules = self.to_vec();
        let name = format!("New Rule {}", rules.len() + 1);
        rules.push(Rule::new(
            id,
            name,
            vec![Condition::default()],
            content_variant,
        ));
        RuleSet::new(rules)
    }

    /// 修改规则字段
    pub fn with_rule_updated(&self, id: &str, field: RuleField) -> RuleSet {
        self.map_rule(id, |rule| field.apply(rule))
    }

    /// 为规则追加一个空条件
    pub fn with_condition_added(&self, id: &str) -> RuleSet {
        self.map_rule(id, |rule| rule.conditions.push(Condition::default()))
    }

    /// 修改条件字段（下标越界时不修改）
    pub fn with_condition_updated(&self, id: &str, index: usize, field: ConditionField) -> RuleSet {
        self.map_rule(id, |rule| {
            if let Some(condition) = rule.conditions.get_mut(index) {
                field.apply(condition);
            }
        })
    }

    /// 删除条件（规则可能因此没有任何条件）
    pub fn with_condition_deleted(&self, id: &str, index: usize) -> RuleSet {
        self.map_rule(id, |rule| {
            if index < rule.conditions.len() {
                rule.conditions.remove(index);
            }
        })
    }

    /// 删除规则，后面的规则依次前移
    pub fn with_rule_deleted(&self, id: &str) -> RuleSet {
        self.iter().filter(|r| r.id != id).cloned().collect()
    }

    /// 规则集指纹（规范 JSON 的 SHA-256）
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for rule in self.iter() {
            // Rule 只包含字符串和枚举，序列化不会失败
            if let Ok(bytes) = serde_json::to_vec(rule) {
                hasher.update(&bytes);
            }
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    fn map_rule(&self, id: &str, edit: impl FnOnce(&mut Rule)) -> RuleSet {
        let mut rules = self.to_vec();
        if let Some(rule) = rules.iter_mut().find(|r| r.id == id) {
            edit(rule);
        }
        RuleSet::new(rules)
    }
}

/// 可并发访问的规则存储
///
/// 当前规则集保存在 `ArcSwap` 中，读取只需一次原子 load；
/// 每次修改都以整个快照为单位做 read-modify-write，读者不会看到修改到一半的规则。
pub struct RuleStore {
    current: ArcSwap<RuleSet>,
    ids: Arc<dyn IdGenerator>,
    default_variant: String,
}

impl RuleStore {
    /// 创建空的规则存储（UUID 作为规则ID）
    pub fn new() -> Self {
        Self::with_rules(RuleSet::default(), Arc::new(UuidIdGenerator))
    }

    /// 从已有规则集创建
    pub fn with_rules(rules: RuleSet, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            current: ArcSwap::from_pointee(rules),
            ids,
            default_variant: DEFAULT_VARIANT.to_string(),
        }
    }

    /// 设置新建规则使用的内容变体
    pub fn with_default_variant(mut self, variant: impl Into<String>) -> Self {
        self.default_variant = variant.into();
        self
    }

    /// 当前规则集快照
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// 整体替换规则集（如从持久化层恢复）
    pub fn replace(&self, rules: RuleSet) -> Arc<RuleSet> {
        let rules = Arc::new(rules);
        self.current.store(Arc::clone(&rules));
        rules
    }

    /// 追加新规则，返回新快照和新规则ID
    pub fn add_rule(&self) -> (Arc<RuleSet>, String) {
        let id = self.ids.next_id();
        let snapshot = self.update(|rules| rules.with_rule_added(id.clone(), &self.default_variant));
        tracing::debug!(rule = %id, "新建规则");
        (snapshot, id)
    }

    pub fn update_rule(&self, id: &str, field: RuleField) -> Arc<RuleSet> {
        self.update(|rules| rules.with_rule_updated(id, field.clone()))
    }

    pub fn add_condition(&self, id: &str) -> Arc<RuleSet> {
        self.update(|rules| rules.with_condition_added(id))
    }

    pub fn update_condition(&self, id: &str, index: usize, field: ConditionField) -> Arc<RuleSet> {
        self.update(|rules| rules.with_condition_updated(id, index, field.clone()))
    }

    pub fn delete_condition(&self, id: &str, index: usize) -> Arc<RuleSet> {
        self.update(|rules| rules.with_condition_deleted(id, index))
    }

    pub fn delete_rule(&self, id: &str) -> Arc<RuleSet> {
        self.update(|rules| rules.with_rule_deleted(id))
    }

    /// 原子地应用一次修改并返回新快照
    ///
    /// 存在并发写入时 `rcu` 可能多次调用 `edit`，因此它必须只依赖传入的快照。
    fn update(&self, edit: impl Fn(&RuleSet) -> RuleSet) -> Arc<RuleSet> {
        let mut installed = None;
        self.current.rcu(|current| {
            let next = Arc::new(edit(current));
            installed = Some(Arc::clone(&next));
            next
        });
        installed.unwrap_or_else(|| self.snapshot())
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
