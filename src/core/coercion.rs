//! 类型转换模块
//!
//! 条件值和用户属性在比较前都经过同一个转换函数：
//! - 字面量 `"true"` / `"false"` 转为布尔值；
//! - 能完整解析为有限数字的转为数字；
//! - 其余一律转为小写字符串。
//!
//! 布尔属性保持布尔值，因此只有小写的 `"true"` / `"false"` 能与之相等，`"True"` 不能。
//! 比较规则是宽松的，数字与字符串之间的大小比较有定义但没有语义。

use crate::core::models::AttributeValue;
use std::cmp::Ordering;

/// 转换后的可比较值
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// 转换用户属性值
pub fn convert_value(value: &AttributeValue) -> Comparable {
    match value {
        AttributeValue::Text(raw) => convert_str(raw),
        AttributeValue::Bool(flag) => Comparable::Bool(*flag),
        AttributeValue::Number(n) if n.is_finite() => Comparable::Number(*n),
        AttributeValue::Number(n) => Comparable::Text(number_to_string(*n).to_lowercase()),
    }
}

/// 转换条件中的原始字符串值
pub fn convert_str(raw: &str) -> Comparable {
    match raw {
        "true" => return Comparable::Bool(true),
        "false" => return Comparable::Bool(false),
        _ => {}
    }

    if let Some(prefix) = parse_float(raw) {
        if string_to_number(raw).is_finite() {
            return Comparable::Number(prefix);
        }
    }

    Comparable::Text(raw.to_lowercase())
}

impl Comparable {
    /// 严格相等：类型不同则不相等
    pub fn strict_eq(&self, other: &Comparable) -> bool {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::Text(a), Comparable::Text(b)) => a == b,
            _ => false,
        }
    }

    /// 宽松大小比较
    ///
    /// 两边都是字符串时按 UTF-16 码元逐个比较；否则两边都转为数字，
    /// 任一边无法转换（NaN）时返回 `None`。
    pub fn loose_cmp(&self, other: &Comparable) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Text(a), Comparable::Text(b)) => {
                Some(a.encode_utf16().cmp(b.encode_utf16()))
            }
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

    pub fn greater_than(&self, other: &Comparable) -> bool {
        self.loose_cmp(other) == Some(Ordering::Greater)
    }

    pub fn less_than(&self, other: &Comparable) -> bool {
        self.loose_cmp(other) == Some(Ordering::Less)
    }

    /// 子串包含（两边先转为字符串）
    pub fn contains(&self, other: &Comparable) -> bool {
        self.to_display_string()
            .contains(other.to_display_string().as_str())
    }

    fn to_number(&self) -> f64 {
        match self {
            Comparable::Bool(true) => 1.0,
            Comparable::Bool(false) => 0.0,
            Comparable::Number(n) => *n,
            Comparable::Text(s) => string_to_number(s),
        }
    }

    /// 字符串形式，数字使用最短往返表示
    pub fn to_display_string(&self) -> String {
        match self {
            Comparable::Bool(flag) => flag.to_string(),
            Comparable::Number(n) => number_to_string(*n),
            Comparable::Text(s) => s.clone(),
        }
    }
}

fn is_blank(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

/// 最长十进制数字前缀的字节长度（含符号和 `Infinity`）
fn decimal_prefix_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i = 1;
    }
    if s[i..].starts_with("Infinity") {
        return Some(i + "Infinity".len());
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        let frac = j - (i + 1);
        if digits + frac > 0 {
            digits += frac;
            i = j;
        }
    }
    if digits == 0 {
        return None;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    Some(i)
}

/// 解析开头的十进制数字前缀，忽略其后的内容（`"12px"` -> 12）
fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_start_matches(is_blank);
    let len = decimal_prefix_len(trimmed)?;
    trimmed[..len].parse::<f64>().ok()
}

/// 整个字符串作为数字字面量解析
///
/// 空串（或只有空白）为 0，支持 `0x` / `0o` / `0b` 前缀，其他无法解析的情况为 NaN。
fn string_to_number(raw: &str) -> f64 {
    let trimmed = raw.trim_matches(is_blank);
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix_literal = |prefix_lower: &str, prefix_upper: &str, radix: u32| {
        trimmed
            .strip_prefix(prefix_lower)
            .or_else(|| trimmed.strip_prefix(prefix_upper))
            .map(|digits| {
                if digits.is_empty() {
                    return f64::NAN;
                }
                digits.chars().try_fold(0.0_f64, |acc, c| {
                    c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
                })
                .unwrap_or(f64::NAN)
            })
    };

    if let Some(n) = radix_literal("0x", "0X", 16)
        .or_else(|| radix_literal("0o", "0O", 8))
        .or_else(|| radix_literal("0b", "0B", 2))
    {
        return n;
    }

    match decimal_prefix_len(trimmed) {
        Some(len) if len == trimmed.len() => trimmed.parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// 数字转字符串：整数不带小数部分，过大或过小的数使用指数形式
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }

    // `{:e}` 给出最短往返表示，如 "1.2345e-7"
    let sci = format!("{:e}", n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exp: i32 = exp.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let point = exp + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, e.abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_literals_only_lowercase() {
        assert_eq!(convert_str("true"), Comparable::Bool(true));
        assert_eq!(convert_str("false"), Comparable::Bool(false));
        assert_eq!(convert_str("True"), Comparable::Text("true".to_string()));
        assert_eq!(convert_str("FALSE"), Comparable::Text("false".to_string()));
    }

    #[test]
    fn test_boolean_attribute_stays_boolean() {
        let attr = convert_value(&AttributeValue::Bool(true));
        assert_eq!(attr, Comparable::Bool(true));
        assert!(attr.strict_eq(&convert_str("true")));
        assert!(!attr.strict_eq(&convert_str("True")));
        assert!(!attr.strict_eq(&convert_str("false")));
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(convert_str("10"), Comparable::Number(10.0));
        assert_eq!(convert_str(" 2.5 "), Comparable::Number(2.5));
        assert_eq!(convert_str("1e3"), Comparable::Number(1000.0));
        assert_eq!(convert_str(".5"), Comparable::Number(0.5));
        assert_eq!(convert_str("-3"), Comparable::Number(-3.0));
        // 十六进制整体合法，但数值取十进制前缀
        assert_eq!(convert_str("0x10"), Comparable::Number(0.0));
    }

    #[test]
    fn test_non_numeric_strings_lowercase() {
        assert_eq!(convert_str("12px"), Comparable::Text("12px".to_string()));
        assert_eq!(convert_str("Infinity"), Comparable::Text("infinity".to_string()));
        assert_eq!(convert_str(""), Comparable::Text(String::new()));
        assert_eq!(convert_str("Chrome"), Comparable::Text("chrome".to_string()));
        assert_eq!(convert_str("1e"), Comparable::Text("1e".to_string()));
    }

    #[test]
    fn test_string_and_number_compare_equal_after_coercion() {
        let profile = convert_value(&AttributeValue::Number(10.0));
        assert!(profile.strict_eq(&convert_str("10")));
        assert!(profile.strict_eq(&convert_str("10.0")));
        assert!(!profile.strict_eq(&convert_str("11")));
    }

    #[test]
    fn test_loose_ordering() {
        let ten = Comparable::Number(10.0);
        assert!(ten.greater_than(&convert_str("9")));
        assert!(ten.less_than(&convert_str("20")));

        // 字符串之间按字典序
        let b = Comparable::Text("b".to_string());
        assert!(b.greater_than(&Comparable::Text("a".to_string())));
        assert!(Comparable::Text("10".to_string()).less_than(&Comparable::Text("9".to_string())));

        // 无法转为数字的字符串与数字比较恒为 false
        let text = Comparable::Text("abc".to_string());
        assert!(!text.greater_than(&ten));
        assert!(!text.less_than(&ten));

        // 空串转为 0
        assert!(ten.greater_than(&convert_str("")));

        // 布尔转为 1 / 0
        assert!(Comparable::Bool(true).greater_than(&Comparable::Number(0.5)));
    }

    #[test]
    fn test_contains_uses_display_strings() {
        let number = Comparable::Number(105.0);
        assert!(number.contains(&convert_str("05")));
        assert!(Comparable::Text("firefox".to_string()).contains(&convert_str("Fire")));
        assert!(Comparable::Text("chrome".to_string()).contains(&convert_str("")));
        assert!(Comparable::Text("true".to_string()).contains(&convert_str("true")));
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(10.0), "10");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(-2.25), "-2.25");
        assert_eq!(number_to_string(123456.789), "123456.789");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(-0.0), "0");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number("  "), 0.0);
        assert_eq!(string_to_number("0b101"), 5.0);
        assert_eq!(string_to_number("0o17"), 15.0);
        assert!(string_to_number("0x").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    }
}
