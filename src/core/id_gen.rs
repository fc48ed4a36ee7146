//! 规则ID生成
//!
//! ID 只在创建规则时分配一次，之后既不复用也不修改。

use std::sync::atomic::{AtomicU64, Ordering};

/// ID 生成器
pub trait IdGenerator: Send + Sync {
    /// 生成一个新的、此前从未返回过的ID
    fn next_id(&self) -> String;
}

/// 基于 UUID v4 的随机ID（默认实现）
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// 单调递增ID，结果可复现，适合测试
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    /// 从指定序号开始（恢复已有规则后避免撞号）
    pub fn starting_at(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("rule-")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}
