//! 规则求值模块
//!
//! 纯函数：给定用户画像和有序规则集，返回应展示的内容变体键。
//! 没有状态、没有 I/O，任何输入都会得到确定的结果，不会返回错误。

use crate::core::coercion::{convert_str, convert_value};
use crate::core::models::{Condition, Operator, Rule, UserProfile, DEFAULT_VARIANT};

/// 求值结果（附带命中信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation<'r> {
    /// 内容变体键
    pub variant: &'r str,
    /// 命中规则在规则集中的下标，未命中为 `None`
    pub matched_index: Option<usize>,
    /// 命中规则的ID
    pub matched_rule_id: Option<&'r str>,
}

impl<'r> Evaluation<'r> {
    fn fallback() -> Self {
        Self {
            variant: DEFAULT_VARIANT,
            matched_index: None,
            matched_rule_id: None,
        }
    }

    /// 是否落到了默认变体
    pub fn is_fallback(&self) -> bool {
        self.matched_index.is_none()
    }
}

/// 计算内容变体键
///
/// 按存储顺序依次检查，第一个全部条件成立的规则胜出；都不成立时返回 `"default"`。
pub fn evaluate<'r>(profile: &UserProfile, rules: &'r [Rule]) -> &'r str {
    evaluate_detailed(profile, rules).variant
}

/// 计算内容变体键，并返回命中的规则
pub fn evaluate_detailed<'r>(profile: &UserProfile, rules: &'r [Rule]) -> Evaluation<'r> {
    for (index, rule) in rules.iter().enumerate() {
        if rule_matches(profile, rule) {
            tracing::debug!(
                profile = %profile.id,
                rule = %rule.id,
                variant = %rule.content_variant,
                "规则命中"
            );
            return Evaluation {
                variant: &rule.content_variant,
                matched_index: Some(index),
                matched_rule_id: Some(&rule.id),
            };
        }
    }

    tracing::debug!(profile = %profile.id, rules = rules.len(), "无规则命中，使用默认变体");
    Evaluation::fallback()
}

/// 判断规则是否命中
///
/// 没有条件的规则一律视为不命中。
pub fn rule_matches(profile: &UserProfile, rule: &Rule) -> bool {
    if rule.conditions.is_empty() {
        tracing::trace!(rule = %rule.id, "规则没有条件，跳过");
        return false;
    }

    rule.conditions
        .iter()
        .all(|condition| condition_matches(profile, condition))
}

/// 判断单个条件是否成立
///
/// 属性缺失（或为 null）、操作符未设置或无法识别时条件都不成立。
pub fn condition_matches(profile: &UserProfile, condition: &Condition) -> bool {
    let Some(attribute) = profile.get(&condition.property) else {
        return false;
    };

    let actual = convert_value(&attribute);
    let expected = convert_str(&condition.value);

    match &condition.operator {
        Operator::Equals => actual.strict_eq(&expected),
        Operator::NotEquals => !actual.strict_eq(&expected),
        Operator::GreaterThan => actual.greater_than(&expected),
        Operator::LessThan => actual.less_than(&expected),
        Operator::Contains => actual.contains(&expected),
        Operator::NotContains => !actual.contains(&expected),
        Operator::Unset | Operator::Other(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Condition;

    fn premium_buyer() -> UserProfile {
        UserProfile::new("user2", "Premium Buyer (Desktop)")
            .with("userType", "premium")
            .with("hasPurchased", true)
            .with("browser", "Firefox")
            .with("device", "desktop")
            .with("purchaseCount", 10)
    }

    fn rule(id: &str, conditions: Vec<Condition>, variant: &str) -> Rule {
        Rule::new(id, id, conditions, variant)
    }

    #[test]
    fn test_empty_rule_set_returns_default() {
        assert_eq!(evaluate(&premium_buyer(), &[]), DEFAULT_VARIANT);
    }

    #[test]
    fn test_rules_without_conditions_never_match() {
        let rules = vec![rule("a", vec![], "premium"), rule("b", vec![], "mobile_optimized")];
        assert_eq!(evaluate(&premium_buyer(), &rules), DEFAULT_VARIANT);
        assert_eq!(evaluate(&UserProfile::new("empty", "Empty"), &rules), DEFAULT_VARIANT);
    }

    #[test]
    fn test_first_match_wins() {
        let rules = vec![
            rule("r1", vec![Condition::new("userType", "equals", "premium")], "premium"),
            rule("r2", vec![Condition::new("device", "equals", "desktop")], "high_value_customer"),
        ];

        let result = evaluate_detailed(&premium_buyer(), &rules);
        assert_eq!(result.variant, "premium");
        assert_eq!(result.matched_index, Some(0));
        assert_eq!(result.matched_rule_id, Some("r1"));
    }

    #[test]
    fn test_skipped_empty_rule_does_not_shadow_later_rule() {
        let rules = vec![
            rule("empty", vec![], "premium"),
            rule("r2", vec![Condition::new("device", "equals", "desktop")], "high_value_customer"),
        ];
        let result = evaluate_detailed(&premium_buyer(), &rules);
        assert_eq!(result.variant, "high_value_customer");
        assert_eq!(result.matched_index, Some(1));
    }

    #[test]
    fn test_numeric_string_matches_number_attribute() {
        let rules = vec![rule(
            "r",
            vec![Condition::new("purchaseCount", "equals", "10")],
            "high_value_customer",
        )];
        assert_eq!(evaluate(&premium_buyer(), &rules), "high_value_customer");
    }

    #[test]
    fn test_capitalized_boolean_literal_does_not_match() {
        let rules = vec![rule(
            "r",
            vec![Condition::new("hasPurchased", "equals", "True")],
            "premium",
        )];
        assert_eq!(evaluate(&premium_buyer(), &rules), DEFAULT_VARIANT);
    }

    #[test]
    fn test_and_semantics() {
        let both = vec![rule(
            "r",
            vec![
                Condition::new("userType", "equals", "premium"),
                Condition::new("purchaseCount", "greaterThan", "5"),
            ],
            "premium",
        )];
        assert_eq!(evaluate(&premium_buyer(), &both), "premium");

        let first_fails = vec![rule(
            "r",
            vec![
                Condition::new("userType", "equals", "basic"),
                Condition::new("purchaseCount", "greaterThan", "5"),
            ],
            "premium",
        )];
        assert_eq!(evaluate(&premium_buyer(), &first_fails), DEFAULT_VARIANT);

        let second_fails = vec![rule(
            "r",
            vec![
                Condition::new("userType", "equals", "premium"),
                Condition::new("purchaseCount", "greaterThan", "50"),
            ],
            "premium",
        )];
        assert_eq!(evaluate(&premium_buyer(), &second_fails), DEFAULT_VARIANT);
    }

    #[test]
    fn test_premium_example() {
        let profile = UserProfile::new("p", "P")
            .with("userType", "premium")
            .with("hasPurchased", true)
            .with("purchaseCount", 10);
        let rules = vec![rule(
            "r",
            vec![Condition::new("userType", "equals", "premium")],
            "premium",
        )];
        assert_eq!(evaluate(&profile, &rules), "premium");
    }

    #[test]
    fn test_failed_threshold_falls_back_to_default() {
        let rules = vec![rule(
            "r",
            vec![Condition::new("purchaseCount", "greaterThan", "20")],
            "high_value_customer",
        )];
        let result = evaluate_detailed(&premium_buyer(), &rules);
        assert_eq!(result.variant, DEFAULT_VARIANT);
        assert!(result.is_fallback());
    }

    #[test]
    fn test_missing_or_null_property_fails_condition() {
        let profile = premium_buyer().with_null("coupon");
        let missing = Condition::new("country", "notEquals", "us");
        let null = Condition::new("coupon", "notContains", "x");
        assert!(!condition_matches(&profile, &missing));
        assert!(!condition_matches(&profile, &null));
    }

    #[test]
    fn test_unset_and_unknown_operators_fail() {
        let profile = premium_buyer();
        assert!(!condition_matches(&profile, &Condition::new("browser", "", "firefox")));
        assert!(!condition_matches(
            &profile,
            &Condition::new("browser", "startsWith", "fire")
        ));
    }

    #[test]
    fn test_string_operators_are_case_insensitive_via_lowercasing() {
        let profile = premium_buyer();
        assert!(condition_matches(&profile, &Condition::new("browser", "equals", "FIREFOX")));
        assert!(condition_matches(&profile, &Condition::new("browser", "contains", "Fox")));
        assert!(condition_matches(&profile, &Condition::new("browser", "notContains", "chrome")));
        assert!(condition_matches(&profile, &Condition::new("device", "notEquals", "mobile")));
        assert!(condition_matches(&profile, &Condition::new("purchaseCount", "lessThan", "11")));
    }

    #[test]
    fn test_boolean_attribute_matches_only_lowercase_literal() {
        let profile = premium_buyer();
        assert!(condition_matches(&profile, &Condition::new("hasPurchased", "equals", "true")));
        assert!(!condition_matches(&profile, &Condition::new("hasPurchased", "notEquals", "true")));
        assert!(!condition_matches(&profile, &Condition::new("hasPurchased", "equals", "True")));
        assert!(condition_matches(&profile, &Condition::new("hasPurchased", "notEquals", "True")));
        assert!(condition_matches(&profile, &Condition::new("hasPurchased", "contains", "true")));
        // 布尔值按 1/0 参与大小比较
        assert!(condition_matches(&profile, &Condition::new("hasPurchased", "greaterThan", "0")));
    }
}
