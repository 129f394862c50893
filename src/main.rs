use std::path::PathBuf;
use std::process::ExitCode;

use tokio::sync::mpsc;
use tracing::{error, info};

use syncplan::config::AppConfig;
use syncplan::core::{Decision, PlanStatus, SyncPlanner};
use syncplan::db::CacheStore;
use syncplan::error::PlanError;
use syncplan::storage::create_storage;

fn usage() -> ExitCode {
    eprintln!("用法: syncplan <config.json> [任务名]");
    ExitCode::from(2)
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        return usage();
    };
    let job_filter = args.next();
    if args.next().is_some() {
        return usage();
    }

    let config = match AppConfig::load(&PathBuf::from(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("无法加载配置 '{}': {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    // 进程退出前保持 guard 存活,否则文件日志可能丢尾
    let _log_guard = syncplan::logging::init(&config.log);

    let jobs: Vec<_> = config
        .jobs
        .into_iter()
        .filter(|job| job_filter.as_deref().map_or(true, |name| job.name == name))
        .collect();
    if jobs.is_empty() {
        match &job_filter {
            Some(name) => eprintln!("配置中没有名为 '{}' 的任务", name),
            None => eprintln!("配置中没有任何任务"),
        }
        return ExitCode::FAILURE;
    }

    let mut any_failed = false;
    for job in jobs {
        match run_job(job).await {
            Ok(status) => {
                if status != PlanStatus::Completed {
                    any_failed = true;
                }
            }
            Err(e) => {
                error!("任务规划失败: {}", e);
                any_failed = true;
            }
        }
    }

    if any_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run_job(job: syncplan::config::SyncJobConfig) -> Result<PlanStatus, PlanError> {
    info!("准备任务 '{}'", job.name);
    let left = create_storage(&job.left).await.map_err(PlanError::Storage)?;
    let right = create_storage(&job.right).await.map_err(PlanError::Storage)?;

    let cache = match job.comparison.cache_engine() {
        Some(engine) => Some(CacheStore::open(engine).await?),
        None => None,
    };

    let planner = SyncPlanner::new(job, left, right, cache);

    // 决策边产出边打印,每行一个 JSON 对象
    let (tx, mut rx) = mpsc::channel::<Decision>(64);
    let printer = tokio::spawn(async move {
        while let Some(decision) = rx.recv().await {
            match serde_json::to_string(&decision) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("决策序列化失败: {}", e),
            }
        }
    });

    let result = planner.plan(Some(tx)).await;
    let _ = printer.await;
    let plan = result?;

    info!(
        "任务 '{}' (run {}) 结束: {:?},共 {} 条决策",
        plan.job,
        plan.run_id,
        plan.status,
        plan.decisions.len()
    );
    Ok(plan.status)
}
