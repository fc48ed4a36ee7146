//! 内容变体注册表
//!
//! 求值只产出变体键，真正展示的内容由注册表提供。键不存在时由调用方决定如何处理。

use crate::core::models::DEFAULT_VARIANT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 可展示的内容块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentVariant {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub image_url: String,
}

/// 内容变体查询接口
pub trait VariantRegistry: Send + Sync {
    /// 按键查询内容
    fn lookup_variant(&self, key: &str) -> Option<&ContentVariant>;

    /// 所有可用的键（供编辑界面选择）
    fn keys(&self) -> Vec<&str>;

    /// 新建规则时使用的默认键
    fn default_key(&self) -> &str {
        DEFAULT_VARIANT
    }
}

/// 内存中的只读注册表
#[derive(Debug, Clone, Default)]
pub struct StaticVariantRegistry {
    variants: BTreeMap<String, ContentVariant>,
}

impl StaticVariantRegistry {
    pub fn new(variants: BTreeMap<String, ContentVariant>) -> Self {
        Self { variants }
    }

    /// 从 JSON 对象文件加载（键 -> 内容）
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取内容变体文件失败: {}", path.display()))?;
        let variants: BTreeMap<String, ContentVariant> = serde_json::from_str(&content)
            .with_context(|| format!("解析内容变体文件失败: {}", path.display()))?;

        if !variants.contains_key(DEFAULT_VARIANT) {
            tracing::warn!("内容变体文件缺少 \"{}\" 键: {}", DEFAULT_VARIANT, path.display());
        }
        tracing::info!("已加载 {} 个内容变体", variants.len());
        Ok(Self { variants })
    }
}

impl VariantRegistry for StaticVariantRegistry {
    fn lookup_variant(&self, key: &str) -> Option<&ContentVariant> {
        self.variants.get(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.variants.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("variants.json");
        std::fs::write(
            &path,
            r#"{"default":{"title":"Hi","body":"Welcome"},"vip":{"title":"VIP","body":"Thanks","imageUrl":"x.png"}}"#,
        )
        .unwrap();

        let registry = StaticVariantRegistry::load(&path).unwrap();
        assert_eq!(registry.keys(), vec!["default", "vip"]);
        assert_eq!(registry.lookup_variant("vip").unwrap().image_url, "x.png");
        assert_eq!(registry.lookup_variant("default").unwrap().image_url, "");
        assert!(registry.lookup_variant("missing").is_none());
        assert_eq!(registry.default_key(), DEFAULT_VARIANT);
    }

    #[test]
    fn test_load_reports_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("variants.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let err = StaticVariantRegistry::load(&path).unwrap_err();
        assert!(err.to_string().contains("解析内容变体文件失败"));
    }
}
