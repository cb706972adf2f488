// ==========================================
// 期末考试排考系统 - 命令行入口
// ==========================================
// 用法:
//   exam-scheduler <db_path> <start YYYY-MM-DD> <end YYYY-MM-DD>
//                  [--append] [--formations=1,2] [--seed=N]
// 输出: stdout 为 JSON 报告, 日志走 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use exam_scheduler::config::ConfigManager;
use exam_scheduler::db::{init_schema, open_sqlite_connection};
use exam_scheduler::domain::types::{FormationId, PersistMode};
use exam_scheduler::{logging, ExamScheduler, GenerationRequest, SessionRepository};
use serde_json::json;
use std::sync::{Arc, Mutex};

const USAGE: &str = "用法: exam-scheduler <db_path> <start YYYY-MM-DD> <end YYYY-MM-DD> [--append] [--formations=1,2] [--seed=N]";

struct CliArgs {
    db_path: String,
    request: GenerationRequest,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("日期格式错误: {}", raw))
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut append = false;
    let mut formations: Vec<FormationId> = Vec::new();
    let mut seed = None;

    for arg in args {
        if arg == "--append" {
            append = true;
        } else if let Some(list) = arg.strip_prefix("--formations=") {
            formations = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<FormationId>()
                        .with_context(|| format!("专业 ID 错误: {}", s))
                })
                .collect::<Result<_>>()?;
        } else if let Some(raw) = arg.strip_prefix("--seed=") {
            seed = Some(raw.parse::<u64>().with_context(|| format!("种子错误: {}", raw))?);
        } else if arg.starts_with("--") {
            bail!("未知参数: {}\n{}", arg, USAGE);
        } else {
            positional.push(arg.as_str());
        }
    }

    let [db_path, start, end] = positional.as_slice() else {
        bail!("{}", USAGE);
    };

    let mut request = GenerationRequest::new(
        parse_date(start)?,
        parse_date(end)?,
        PersistMode::from_append_flag(append),
    )
    .with_formations(formations);
    if let Some(seed) = seed {
        request = request.with_seed(seed);
    }

    Ok(CliArgs {
        db_path: db_path.to_string(),
        request,
    })
}

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    tracing::info!("{} v{}", exam_scheduler::APP_NAME, exam_scheduler::VERSION);
    tracing::info!("使用数据库: {}", cli.db_path);

    let conn = open_sqlite_connection(&cli.db_path)
        .with_context(|| format!("无法打开数据库: {}", cli.db_path))?;
    init_schema(&conn).context("建表失败")?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone())
        .load_scheduler_config()
        .context("加载排考配置失败")?;

    let scheduler = ExamScheduler::from_connection(conn.clone(), config);
    let report = scheduler.generate(&cli.request).context("排考失败")?;

    let usage = SessionRepository::new(conn)
        .room_kind_usage()
        .context("统计考场类型分布失败")?;
    let conflicts = scheduler.audit().context("排考结果审计失败")?;
    for violation in &conflicts {
        tracing::warn!("冲突: {}", violation);
    }

    let output = json!({
        "report": report,
        "room_kind_usage": usage,
        "conflicts": conflicts.len(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
