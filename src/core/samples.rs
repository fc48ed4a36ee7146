//! 内置样例数据
//!
//! 没有配置外部文件时使用的用户画像和内容变体。

use crate::core::content::{ContentVariant, StaticVariantRegistry};
use crate::core::models::UserProfile;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// 内置样例画像
pub fn sample_profiles() -> Vec<UserProfile> {
    vec![
        UserProfile::new("user1", "Standard User (Desktop)")
            .with("userType", "basic")
            .with("hasPurchased", false)
            .with("browser", "Chrome")
            .with("device", "desktop")
            .with("purchaseCount", 1),
        UserProfile::new("user2", "Premium Buyer (Desktop)")
            .with("userType", "premium")
            .with("hasPurchased", true)
            .with("browser", "Firefox")
            .with("device", "desktop")
            .with("purchaseCount", 10),
        UserProfile::new("user3", "New Mobile Shopper")
            .with("userType", "basic")
            .with("hasPurchased", false)
            .with("browser", "Safari")
            .with("device", "mobile")
            .with("purchaseCount", 0),
        UserProfile::new("user4", "Returning Customer")
            .with("userType", "basic")
            .with("hasPurchased", true)
            .with("browser", "Edge")
            .with("device", "desktop")
            .with("purchaseCount", 3),
        UserProfile::new("user5", "Loyal Firefox User")
            .with("userType", "premium")
            .with("hasPurchased", true)
            .with("browser", "Firefox")
            .with("device", "desktop")
            .with("purchaseCount", 15),
    ]
}

/// 条件编辑时可选的属性名
pub const AVAILABLE_PROPERTIES: [&str; 5] =
    ["userType", "hasPurchased", "browser", "device", "purchaseCount"];

/// 内置内容变体
pub fn sample_variants() -> StaticVariantRegistry {
    let entries = [
        (
            "default",
            "Welcome to Our Site!",
            "Explore our wide range of products and services. We have something for everyone!",
            "https://via.placeholder.com/400x200/ADD8E6/000000?text=Default+Content",
        ),
        (
            "premium",
            "Exclusive Offers for Premium Members!",
            "Thank you for being a valued premium customer. Enjoy special discounts and early access!",
            "https://via.placeholder.com/400x200/FFD700/000000?text=Premium+Content",
        ),
        (
            "new_user_discount",
            "Welcome! Get 10% Off Your First Purchase!",
            "As a new user, enjoy a special discount! Use code WELCOME10 at checkout.",
            "https://via.placeholder.com/400x200/90EE90/000000?text=New+User+Offer",
        ),
        (
            "mobile_optimized",
            "Shop On-the-Go!",
            "Discover our mobile-friendly experience. Best viewed on your smartphone!",
            "https://via.placeholder.com/400x200/DDA0DD/000000?text=Mobile+Experience",
        ),
        (
            "high_value_customer",
            "Thank You, Valued Customer!",
            "Your loyalty means a lot to us. Check out your personalized recommendations.",
            "https://via.placeholder.com/400x200/FFA07A/000000?text=High+Value+Content",
        ),
    ];

    let variants: BTreeMap<String, ContentVariant> = entries
        .iter()
        .map(|(key, title, body, image_url)| {
            (
                key.to_string(),
                ContentVariant {
                    title: title.to_string(),
                    body: body.to_string(),
                    image_url: image_url.to_string(),
                },
            )
        })
        .collect();

    StaticVariantRegistry::new(variants)
}

/// 从 JSON 数组文件加载画像
pub fn load_profiles(path: &Path) -> Result<Vec<UserProfile>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("读取画像文件失败: {}", path.display()))?;
    let profiles: Vec<UserProfile> = serde_json::from_str(&content)
        .with_context(|| format!("解析画像文件失败: {}", path.display()))?;
    tracing::info!("已加载 {} 个用户画像", profiles.len());
    Ok(profiles)
}
