//! Personalize - 基于规则的内容个性化引擎
//!
//! 核心设计原则：
//! - 求值是纯函数，任何输入都有确定输出
//! - 规则顺序即优先级，第一个命中的规则胜出
//! - 规则集修改一律写时复制
//! - 存储和内容展示都是外部协作者

pub mod cli;
pub mod core;
pub mod storage;

pub use crate::core::evaluator::{evaluate, evaluate_detailed, Evaluation};
pub use crate::core::models::{
    AttributeValue, Condition, Operator, Rule, RuleSet, UserProfile, DEFAULT_VARIANT,
};
pub use crate::core::rule_store::{ConditionField, RuleField, RuleStore};
