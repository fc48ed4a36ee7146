//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。
//! 命令行是规则集的编辑界面：每个修改命令都会重新求值并保存规则。

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 内容个性化规则工具
#[derive(Parser, Debug)]
#[command(name = "personalize")]
#[command(version, about = "基于规则的内容个性化引擎")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 配置文件路径（默认使用平台配置目录）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 日志级别 (trace, debug, info, warn, error)，RUST_LOG 优先
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 规则管理
    Rules {
        #[command(subcommand)]
        action: RuleCommand,
    },

    /// 条件管理
    Conditions {
        #[command(subcommand)]
        action: ConditionCommand,
    },

    /// 列出所有用户画像及其当前内容变体
    Profiles,

    /// 列出所有内容变体
    Variants,

    /// 对用户画像求值
    ///
    /// 不指定画像时使用第一个画像。
    Evaluate {
        /// 画像ID
        #[arg(short, long, conflicts_with = "all")]
        profile: Option<String>,

        /// 对所有画像求值
        #[arg(long)]
        all: bool,
    },

    /// 导出规则集为 JSON
    Export {
        /// 输出文件（默认打印到标准输出）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 从 JSON 文件导入规则集（整体替换）
    Import {
        /// 规则文件
        file: PathBuf,
    },

    /// 配置管理
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

/// 规则子命令
#[derive(Subcommand, Debug)]
pub enum RuleCommand {
    /// 按优先级列出规则
    List,

    /// 新建规则（带一个空条件）
    Add,

    /// 修改规则字段
    ///
    /// 字段: name, contentVariant, conditions（条件数组 JSON）
    Update {
        /// 规则ID
        id: String,
        /// 字段名
        field: String,
        /// 新值
        value: String,
    },

    /// 删除规则
    Delete {
        /// 规则ID
        id: String,
    },
}

/// 条件子命令
#[derive(Subcommand, Debug)]
pub enum ConditionCommand {
    /// 为规则追加一个空条件
    Add {
        /// 规则ID
        rule_id: String,
    },

    /// 修改条件字段
    ///
    /// 字段: property, operator, value
    Set {
        /// 规则ID
        rule_id: String,
        /// 条件下标（从 0 开始）
        index: usize,
        /// 字段名
        field: String,
        /// 新值
        value: String,
    },

    /// 删除条件
    Delete {
        /// 规则ID
        rule_id: String,
        /// 条件下标（从 0 开始）
        index: usize,
    },
}

/// 配置子命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前配置
    Show,

    /// 切换规则存储后端
    Storage {
        #[arg(value_enum)]
        backend: BackendArg,
    },

    /// 重置为默认配置
    Reset,
}

/// 存储后端参数
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Sqlite,
    Json,
}
