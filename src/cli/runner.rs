//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑：把命令行参数转化为会话上的规则修改和求值。

use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::commands::{BackendArg, Commands, ConditionCommand, ConfigCommand, RuleCommand};
use crate::core::content::{StaticVariantRegistry, VariantRegistry};
use crate::core::id_gen::UuidIdGenerator;
use crate::core::models::{AppConfig, Operator, StorageBackend};
use crate::core::rule_store::{ConditionField, RuleField, RuleStore};
use crate::core::samples::{load_profiles, sample_profiles, sample_variants, AVAILABLE_PROPERTIES};
use crate::core::session::PersonalizationSession;
use crate::storage::config::{open_repository, ConfigManager};
use crate::storage::json_file::{parse_rules, rules_to_json};
use crate::storage::RuleRepository;

/// 命令执行器
pub struct CommandRunner {
    session: PersonalizationSession,
    registry: Box<dyn VariantRegistry>,
}

impl CommandRunner {
    /// 按配置创建：加载画像、内容变体，并从存储中恢复规则
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let repository = open_repository(config)?;
        Self::with_repository(config, repository)
    }

    /// 使用指定的存储创建
    pub fn with_repository(config: &AppConfig, repository: Box<dyn RuleRepository>) -> Result<Self> {
        let profiles = match &config.profiles_file {
            Some(path) => load_profiles(path)?,
            None => sample_profiles(),
        };
        let registry: Box<dyn VariantRegistry> = match &config.variants_file {
            Some(path) => Box::new(StaticVariantRegistry::load(path)?),
            None => Box::new(sample_variants()),
        };

        let default_variant = if registry.lookup_variant(&config.default_variant).is_some() {
            config.default_variant.clone()
        } else {
            tracing::warn!(
                "配置的默认变体 {:?} 未注册，改用 {:?}",
                config.default_variant,
                registry.default_key()
            );
            registry.default_key().to_string()
        };

        let store = RuleStore::with_rules(Default::default(), Arc::new(UuidIdGenerator))
            .with_default_variant(default_variant);
        let session = PersonalizationSession::new(store, profiles).with_repository(repository)?;

        Ok(Self { session, registry })
    }

    pub fn session(&self) -> &PersonalizationSession {
        &self.session
    }

    /// 执行子命令，输出写入 `out`
    pub fn run(&mut self, command: Commands, out: &mut impl Write) -> Result<()> {
        match command {
            Commands::Rules { action } => self.run_rules(action, out),
            Commands::Conditions { action } => self.run_conditions(action, out),
            Commands::Profiles => self.run_profiles(out),
            Commands::Variants => self.run_variants(out),
            Commands::Evaluate { profile, all } => self.run_evaluate(profile.as_deref(), all, out),
            Commands::Export { output } => {
                let json = rules_to_json(&self.session.rules())?;
                match output {
                    Some(path) => {
                        fs::write(&path, json)
                            .with_context(|| format!("写入导出文件失败: {}", path.display()))?;
                        info!("规则已导出到 {}", path.display());
                    }
                    None => writeln!(out, "{}", json)?,
                }
                Ok(())
            }
            Commands::Import { file } => {
                let content = fs::read_to_string(&file)
                    .with_context(|| format!("读取导入文件失败: {}", file.display()))?;
                let rules = parse_rules(&content)
                    .with_context(|| format!("解析导入文件失败: {}", file.display()))?;
                let count = rules.len();
                self.session.replace_rules(rules)?;
                writeln!(out, "已导入 {} 条规则", count)?;
                Ok(())
            }
            // 配置命令不需要打开规则存储
            Commands::Config { .. } => bail!("配置命令需要通过 CommandRunner::run_config 执行"),
        }
    }

    fn run_rules(&mut self, action: RuleCommand, out: &mut impl Write) -> Result<()> {
        match action {
            RuleCommand::List => {
                let rules = self.session.rules();
                if rules.is_empty() {
                    writeln!(out, "（没有规则）")?;
                }
                for (index, rule) in rules.iter().enumerate() {
                    writeln!(
                        out,
                        "{}. [{}] {} -> {}",
                        index + 1,
                        rule.id,
                        rule.name,
                        rule.content_variant
                    )?;
                    if rule.conditions.is_empty() {
                        writeln!(out, "     （没有条件，永不命中）")?;
                    }
                    for (i, cond) in rule.conditions.iter().enumerate() {
                        writeln!(
                            out,
                            "     #{} {} {} {:?}",
                            i, cond.property, cond.operator, cond.value
                        )?;
                    }
                    if self.registry.lookup_variant(&rule.content_variant).is_none() {
                        writeln!(out, "     警告: 内容变体 {:?} 未注册", rule.content_variant)?;
                    }
                }
                if let Some(saved_at) = self.session.last_saved_at()? {
                    writeln!(out, "最近保存: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
                }
            }
            RuleCommand::Add => {
                let id = self.session.add_rule()?;
                writeln!(out, "已新建规则 {}", id)?;
                self.write_current(out)?;
            }
            RuleCommand::Update { id, field, value } => {
                let field = RuleField::parse(&field, &value)?;
                self.session.update_rule(&id, field)?;
                self.write_current(out)?;
            }
            RuleCommand::Delete { id } => {
                self.session.delete_rule(&id)?;
                self.write_current(out)?;
            }
        }
        Ok(())
    }

    fn run_conditions(&mut self, action: ConditionCommand, out: &mut impl Write) -> Result<()> {
        match action {
            ConditionCommand::Add { rule_id } => self.session.add_condition(&rule_id)?,
            ConditionCommand::Set {
                rule_id,
                index,
                field,
                value,
            } => {
                let field = ConditionField::parse(&field, &value)?;
                if let ConditionField::Operator(Operator::Other(raw)) = &field {
                    tracing::warn!("未知操作符 {:?}，该条件永远不会成立", raw);
                }
                self.session.update_condition(&rule_id, index, field)?
            }
            ConditionCommand::Delete { rule_id, index } => {
                self.session.delete_condition(&rule_id, index)?
            }
        }
        self.write_current(out)
    }

    fn run_profiles(&self, out: &mut impl Write) -> Result<()> {
        for outcome in self.session.evaluate_all() {
            writeln!(
                out,
                "{}\t{}\t-> {}",
                outcome.profile_id, outcome.profile_name, outcome.variant
            )?;
        }
        writeln!(out, "可用属性: {}", AVAILABLE_PROPERTIES.join(", "))?;
        let operators: Vec<String> = Operator::AVAILABLE.iter().map(|op| op.to_string()).collect();
        writeln!(out, "可用操作符: {}", operators.join(", "))?;
        Ok(())
    }

    fn run_variants(&self, out: &mut impl Write) -> Result<()> {
        for key in self.registry.keys() {
            if let Some(content) = self.registry.lookup_variant(key) {
                writeln!(out, "{}\t{}", key, content.title)?;
            }
        }
        Ok(())
    }

    fn run_evaluate(&mut self, profile: Option<&str>, all: bool, out: &mut impl Write) -> Result<()> {
        if all {
            for outcome in self.session.evaluate_all() {
                let via = outcome
                    .matched_rule_id
                    .map(|id| format!("规则 {}", id))
                    .unwrap_or_else(|| "无规则命中".to_string());
                writeln!(
                    out,
                    "{}\t{}\t({})",
                    outcome.profile_id, outcome.variant, via
                )?;
            }
            return Ok(());
        }

        if let Some(profile_id) = profile {
            self.session.select_profile(profile_id)?;
        }
        self.write_current(out)?;

        let variant = self.session.variant();
        match self.registry.lookup_variant(variant) {
            Some(content) => {
                writeln!(out, "{}", content.title)?;
                writeln!(out, "{}", content.body)?;
                if !content.image_url.is_empty() {
                    writeln!(out, "{}", content.image_url)?;
                }
            }
            None => writeln!(out, "内容变体 {:?} 没有对应的内容", variant)?,
        }
        Ok(())
    }

    fn write_current(&self, out: &mut impl Write) -> Result<()> {
        match self.session.selected_profile() {
            Some(profile) => writeln!(
                out,
                "当前画像 {} ({}) -> {}",
                profile.id,
                profile.name,
                self.session.variant()
            )?,
            None => writeln!(out, "没有可用的用户画像 -> {}", self.session.variant())?,
        }
        Ok(())
    }

    /// 执行配置子命令
    pub fn run_config(manager: &ConfigManager, action: ConfigCommand, out: &mut impl Write) -> Result<()> {
        match action {
            ConfigCommand::Show => {
                let config = manager.load()?;
                writeln!(out, "# {}", manager.path().display())?;
                writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
            }
            ConfigCommand::Storage { backend } => {
                let mut config = manager.load()?;
                config.storage = match backend {
                    BackendArg::Sqlite => StorageBackend::Sqlite,
                    BackendArg::Json => StorageBackend::Json,
                };
                manager.save(&config)?;
                writeln!(out, "规则存储后端已切换为 {:?}", config.storage)?;
            }
            ConfigCommand::Reset => {
                manager.reset()?;
                writeln!(out, "配置已重置")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::Database;
    use tempfile::tempdir;

    fn runner() -> CommandRunner {
        let repository = Box::new(Database::open_in_memory().unwrap());
        CommandRunner::with_repository(&AppConfig::default(), repository).unwrap()
    }

    fn run(runner: &mut CommandRunner, command: Commands) -> String {
        let mut out = Vec::new();
        runner.run(command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_build_rule_through_commands() {
        let mut runner = runner();
        run(&mut runner, Commands::Rules { action: RuleCommand::Add });
        let id = runner.session().rules()[0].id.clone();

        for (field, value) in [("property", "device"), ("operator", "equals"), ("value", "mobile")] {
            run(
                &mut runner,
                Commands::Conditions {
                    action: ConditionCommand::Set {
                        rule_id: id.clone(),
                        index: 0,
                        field: field.to_string(),
                        value: value.to_string(),
                    },
                },
            );
        }
        run(
            &mut runner,
            Commands::Rules {
                action: RuleCommand::Update {
                    id: id.clone(),
                    field: "contentVariant".to_string(),
                    value: "mobile_optimized".to_string(),
                },
            },
        );

        let output = run(
            &mut runner,
            Commands::Evaluate {
                profile: Some("user3".to_string()),
                all: false,
            },
        );
        assert!(output.contains("-> mobile_optimized"));
        assert!(output.contains("Shop On-the-Go!"));

        let listing = run(&mut runner, Commands::Rules { action: RuleCommand::List });
        assert!(listing.contains("New Rule 1 -> mobile_optimized"));
        assert!(listing.contains("device equals \"mobile\""));
        assert!(listing.contains("最近保存: "));
    }

    #[test]
    fn test_import_keeps_duplicate_and_numeric_ids() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        std::fs::write(
            &file,
            r#"[{"id":1700000000000,"name":"A","conditions":[{"property":"device","operator":"equals","value":"mobile"}],"contentVariant":"mobile_optimized"},
                {"id":1700000000000,"name":"B","conditions":[],"contentVariant":"premium"}]"#,
        )
        .unwrap();

        let mut runner = runner();
        let output = run(&mut runner, Commands::Import { file });
        assert!(output.contains("已导入 2 条规则"));

        let rules = runner.session().rules();
        assert_eq!(rules[0].id, "1700000000000");
        assert_eq!(rules[1].id, "1700000000000");
        assert_eq!(rules[1].name, "B");
    }

    #[test]
    fn test_config_command_needs_config_manager() {
        let mut runner = runner();
        let mut out = Vec::new();
        let result = runner.run(
            Commands::Config {
                action: ConfigCommand::Show,
            },
            &mut out,
        );
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut runner = runner();
        run(&mut runner, Commands::Rules { action: RuleCommand::Add });
        let id = runner.session().rules()[0].id.clone();

        let mut out = Vec::new();
        let result = runner.run(
            Commands::Rules {
                action: RuleCommand::Update {
                    id,
                    field: "priority".to_string(),
                    value: "1".to_string(),
                },
            },
            &mut out,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_export_and_import() {
        let dir = tempdir().unwrap();
        let export_path = dir.path().join("export.json");

        let mut source = runner();
        run(&mut source, Commands::Rules { action: RuleCommand::Add });
        run(
            &mut source,
            Commands::Export {
                output: Some(export_path.clone()),
            },
        );

        let mut target = runner();
        let output = run(&mut target, Commands::Import { file: export_path });
        assert!(output.contains("已导入 1 条规则"));
        assert_eq!(*target.session().rules(), *source.session().rules());
    }

    #[test]
    fn test_evaluate_all_lists_every_profile() {
        let mut runner = runner();
        let output = run(
            &mut runner,
            Commands::Evaluate {
                profile: None,
                all: true,
            },
        );
        assert_eq!(output.lines().count(), 5);
        assert!(output.lines().all(|l| l.contains("default")));
    }

    #[test]
    fn test_config_commands() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::new(dir.path().join("config.json"));

        let mut out = Vec::new();
        CommandRunner::run_config(
            &manager,
            ConfigCommand::Storage {
                backend: BackendArg::Json,
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(manager.load().unwrap().storage, StorageBackend::Json);

        CommandRunner::run_config(&manager, ConfigCommand::Reset, &mut out).unwrap();
        assert_eq!(manager.load().unwrap().storage, StorageBackend::Sqlite);
    }
}
