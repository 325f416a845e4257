// ==========================================
// 物业批量导入系统 - 命令行入口
// ==========================================
// 用法:
//   estate-import import <db_path> <file> [entity_type] [--user <id>] [--dry-run]
//   estate-import template <entity_type>
//
// --dry-run: 使用内存存储,只校验与模拟创建,不写数据库
// ==========================================

use anyhow::{bail, Context};
use estate_bulk_import::config::ConfigManager;
use estate_bulk_import::domain::{EntityType, ImportResult};
use estate_bulk_import::importer::{template_for, ImportOptions, ImportOrchestrator};
use estate_bulk_import::repository::{InMemoryEntityStore, SqliteAuditSink, SqliteEntityStore};
use estate_bulk_import::{logging, ImportConfig, APP_NAME, VERSION};
use std::sync::Arc;

const USAGE: &str = "用法:
  estate-import import <db_path> <file> [entity_type] [--user <id>] [--dry-run]
  estate-import template <entity_type>";

struct ImportArgs {
    db_path: String,
    file: String,
    entity_type: Option<EntityType>,
    user_id: Option<String>,
    dry_run: bool,
}

fn parse_import_args(args: Vec<String>) -> anyhow::Result<ImportArgs> {
    let mut positional = Vec::new();
    let mut user_id = None;
    let mut dry_run = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--user" => user_id = Some(iter.next().context("--user 缺少取值")?),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let (Some(db_path), Some(file)) = (positional.next(), positional.next()) else {
        bail!("import 需要 <db_path> <file>\n{}", USAGE);
    };
    let entity_type = positional
        .next()
        .map(|raw| raw.parse::<EntityType>().map_err(anyhow::Error::msg))
        .transpose()?;

    Ok(ImportArgs {
        db_path,
        file,
        entity_type,
        user_id,
        dry_run,
    })
}

async fn run_import(args: ImportArgs) -> anyhow::Result<ImportResult> {
    let options = ImportOptions {
        user_id: args.user_id,
        ..ImportOptions::default()
    };

    let orchestrator = if args.dry_run {
        tracing::info!("试运行: 使用内存存储");
        let config = ImportConfig::from_env()?;
        ImportOrchestrator::new(config, Arc::new(InMemoryEntityStore::new()))
    } else {
        let store = SqliteEntityStore::new(&args.db_path)
            .with_context(|| format!("无法打开数据库: {}", args.db_path))?;
        let conn = store.connection();
        let config = ConfigManager::from_connection(Arc::clone(&conn))?.load_import_config()?;
        ImportOrchestrator::new(config, Arc::new(store))
            .with_audit(Arc::new(SqliteAuditSink::new(conn)))
    };

    let result = orchestrator
        .import_file(&args.file, args.entity_type, options)
        .await
        .with_context(|| format!("导入失败: {}", args.file))?;
    Ok(result)
}

fn print_result(result: &ImportResult) -> anyhow::Result<()> {
    println!("{}", result.summary);
    println!(
        "import_id={} status={} success={} 耗时={}ms",
        result.import_id, result.status, result.success, result.processing_time_ms
    );
    for error in result.errors.iter().take(50) {
        println!(
            "  行 {:>5} [{}] {} {}: {}",
            error.position, error.severity, error.code, error.field, error.message
        );
    }
    if result.errors.len() > 50 {
        println!("  ... 另有 {} 条", result.errors.len() - 50);
    }
    if std::env::var("ESTATE_IMPORT_JSON").is_ok() {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    tracing::info!("{} v{}", APP_NAME, VERSION);

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "import" => {
            let import_args = parse_import_args(rest)?;
            let result = run_import(import_args).await?;
            print_result(&result)?;
            if !result.success {
                std::process::exit(2);
            }
        }
        "template" => {
            let raw = rest.first().context(USAGE)?;
            let entity_type = raw.parse::<EntityType>().map_err(anyhow::Error::msg)?;
            print!("{}", template_for(entity_type).to_csv()?);
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    }

    Ok(())
}
