//! CLI 模块
//!
//! 提供命令行接口，支持以下功能：
//!
//! - `rules` - 新建、修改、删除、列出规则
//! - `conditions` - 新建、修改、删除规则条件
//! - `profiles` / `variants` - 查看用户画像和内容变体
//! - `evaluate` - 对画像求值
//! - `export` / `import` - 规则集导入导出
//! - `config` - 配置管理
//!
//! # 使用示例
//!
//! ```bash
//! personalize rules add
//! personalize conditions set <rule-id> 0 property purchaseCount
//! personalize conditions set <rule-id> 0 operator greaterThan
//! personalize conditions set <rule-id> 0 value 5
//! personalize rules update <rule-id> contentVariant high_value_customer
//! personalize evaluate --all
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
