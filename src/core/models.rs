//! 核心数据模型定义
//!
//! 序列化字段名与持久化格式保持一致（`id`, `name`, `conditions`, `contentVariant`,
//! `property`, `operator`, `value`），外部存储可以直接读写这些结构。

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;

/// 保留的内容变体键：没有任何规则命中时返回
pub const DEFAULT_VARIANT: &str = "default";

/// 用户属性值
///
/// 只允许布尔、数字、字符串三种类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(f64::from(value))
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// 用户画像
///
/// 除 `id` 和 `name` 外，其余属性平铺存放。值为 `null` 的属性会被保留，
/// 但在求值时与缺失属性等价。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// 画像标识
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 领域属性（如 userType, purchaseCount, browser, device）
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Option<AttributeValue>>,
}

impl UserProfile {
    /// 创建没有任何属性的画像
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// 追加一个属性（构建器风格）
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), Some(value.into()));
        self
    }

    /// 追加一个显式为 null 的属性
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), None);
        self
    }

    /// 按属性名取值
    ///
    /// `id` 和 `name` 同样可以被条件引用。缺失或为 null 时返回 `None`。
    pub fn get(&self, property: &str) -> Option<Cow<'_, AttributeValue>> {
        match property {
            "id" => Some(Cow::Owned(AttributeValue::Text(self.id.clone()))),
            "name" => Some(Cow::Owned(AttributeValue::Text(self.name.clone()))),
            _ => self
                .attributes
                .get(property)
                .and_then(Option::as_ref)
                .map(Cow::Borrowed),
        }
    }
}

/// 条件操作符
///
/// 新建条件时操作符为空（`Unset`，序列化为 `""`）；无法识别的操作符原样保留在
/// `Other` 中以便持久化数据可以完整读回。这两种情况在求值时都不会满足。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    #[default]
    Unset,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    Other(String),
}

impl Operator {
    /// 所有可用的操作符（供编辑界面列出）
    pub const AVAILABLE: [Operator; 6] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::Contains,
        Operator::NotContains,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Unset => "",
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThan => "lessThan",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Operator {
    fn from(raw: &str) -> Self {
        match raw {
            "" => Operator::Unset,
            "equals" => Operator::Equals,
            "notEquals" => Operator::NotEquals,
            "greaterThan" => Operator::GreaterThan,
            "lessThan" => Operator::LessThan,
            "contains" => Operator::Contains,
            "notContains" => Operator::NotContains,
            other => Operator::Other(other.to_string()),
        }
    }
}

impl From<String> for Operator {
    fn from(raw: String) -> Self {
        Operator::from(raw.as_str())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Operator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Operator::from(s))
    }
}

/// 单个匹配条件：属性 / 操作符 / 值
///
/// `value` 始终以作者输入的原始字符串保存，类型转换推迟到求值时进行。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Condition {
    pub property: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(
        property: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// 规则定义
///
/// 所有条件之间为 AND 关系。没有任何条件的规则永远不会命中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// 规则唯一ID，创建后不再变化
    #[serde(deserialize_with = "deserialize_rule_id")]
    pub id: String,
    /// 规则名称（允许重复）
    pub name: String,
    /// 匹配条件
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// 命中后返回的内容变体键
    pub content_variant: String,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        conditions: Vec<Condition>,
        content_variant: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            conditions,
            content_variant: content_variant.into(),
        }
    }
}

/// 规则ID可以是字符串或数字（时间戳形式的旧ID），统一转为字符串
fn deserialize_rule_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(n) => n.to_string(),
    })
}

/// 有序规则集
///
/// 顺序即优先级：下标 0 最先求值。所有修改操作都返回新的规则集（见 `rule_store`）。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }
}

impl Deref for RuleSet {
    type Target = [Rule];

    fn deref(&self) -> &Self::Target {
        &self.rules
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// 规则存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite 数据库
    #[default]
    Sqlite,
    /// JSON 文件
    Json,
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 规则存储后端
    pub storage: StorageBackend,
    /// SQLite 数据库路径（为空时使用平台数据目录）
    pub rules_db_path: Option<PathBuf>,
    /// JSON 规则文件路径（为空时使用平台数据目录）
    pub rules_file_path: Option<PathBuf>,
    /// 自定义内容变体文件（为空时使用内置变体）
    pub variants_file: Option<PathBuf>,
    /// 自定义用户画像文件（为空时使用内置样例画像）
    pub profiles_file: Option<PathBuf>,
    /// 新建规则的默认内容变体
    pub default_variant: String,
    /// 未设置 RUST_LOG 时使用的日志级别
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Sqlite,
            rules_db_path: None,
            rules_file_path: None,
            variants_file: None,
            profiles_file: None,
            default_variant: DEFAULT_VARIANT.to_string(),
            log_level: "info".to_string(),
        }
    }
}
