use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stitchctl::cli::{Cli, Commands, DEFAULT_LOG_FILTER, DeployArgs, QueueArgs, QueueCommands};
use stitchctl::config::{self, Config};
use stitchctl::deploy::{self, DeployEvent, DeployPlan, PlanOverrides, Step, commands, health};
use stitchctl::docker::{self, CancelToken, OutputLine};
use stitchctl::queue::{self, CleanupSchedule, QueueManager, RepairOutcome};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Priority: CLI > env > default
    let log_filter = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            println!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` for a clean run that should still exit non-zero.
fn run(cli: Cli) -> Result<bool> {
    let cfg = match &cli.config {
        Some(path) => config::load_from(path)?,
        None => config::load(&cli.dir)?,
    };
    tracing::debug!(?cfg, "configuration loaded");

    match cli.command {
        Commands::Deploy(args) => run_deploy(&cfg, &cli.dir, args),
        Commands::Status => run_status(&cfg, &cli.dir),
        Commands::Logs { tail } => run_logs(&cfg, &cli.dir, tail),
        Commands::Queue(args) => run_queue(&cfg, &cli.dir, args),
    }
}

fn run_deploy(cfg: &Config, root: &Path, args: DeployArgs) -> Result<bool> {
    let overrides = PlanOverrides {
        profile: args.profile,
        port: args.port,
        host: args.host,
        settle_secs: args.settle_secs,
        no_probe: args.no_probe,
    };
    let plan = DeployPlan::from_config(cfg, &overrides);
    let json = args.json;

    if !json {
        println!(
            "🚀 Развёртывание приложения (профиль {}, порт {})",
            plan.profile.as_str(),
            plan.port
        );
    }

    let report = deploy::deploy(plan, root.to_path_buf(), CancelToken::new(), |event| {
        if !json {
            print_event(event);
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.success);
    }

    match &report.failure {
        None => {
            println!("✅ Приложение запущено");
            println!("🌐 Доступно по адресу: {}", report.url);
            Ok(true)
        }
        Some(failure) => {
            println!("❌ {failure}");
            Ok(false)
        }
    }
}

fn print_event(event: &DeployEvent) {
    match event {
        DeployEvent::StepStarted(step) => println!("{}", step_label(*step)),
        DeployEvent::Log { line, .. } => println!("{line}"),
        DeployEvent::StepFinished { .. } | DeployEvent::Completed(_) => {}
        DeployEvent::Aborted(reason) => println!("⛔ {reason}"),
    }
}

fn step_label(step: Step) -> &'static str {
    match step {
        Step::CheckTools => "🔍 Проверка docker и docker-compose...",
        Step::PrepareWorkspace => "📁 Подготовка директорий...",
        Step::Down => "🛑 Остановка старых контейнеров...",
        Step::Build => "🔨 Сборка образов...",
        Step::Up => "▶️  Запуск контейнеров...",
        Step::Settle => "⏳ Ожидание запуска...",
        Step::Status => "📊 Статус контейнеров:",
        Step::Probe => "🩺 Проверка доступности...",
        Step::Logs => "📋 Последние логи:",
    }
}

fn run_status(cfg: &Config, root: &Path) -> Result<bool> {
    docker::ensure_tools(&cfg.docker_bin, &cfg.compose_bin)?;
    let plan = DeployPlan::from_config(cfg, &PlanOverrides::default());
    let result = docker::run_to_end(commands::ps(&plan, root)?, &CancelToken::new())?;
    print!("{}", result.log);

    let up = health::status_is_up(&result.log);
    if up {
        println!("✅ Контейнеры запущены");
    } else {
        println!("❌ Контейнеры не запущены");
    }
    Ok(up)
}

fn run_logs(cfg: &Config, root: &Path, tail: Option<usize>) -> Result<bool> {
    docker::ensure_tools(&cfg.docker_bin, &cfg.compose_bin)?;
    let mut plan = DeployPlan::from_config(cfg, &PlanOverrides::default());
    if let Some(tail) = tail {
        plan.log_tail = tail;
    }

    let rx = docker::spawn(commands::logs(&plan, root)?, CancelToken::new())?;
    for line in rx {
        match line {
            OutputLine::Stdout(l) | OutputLine::Stderr(l) => println!("{l}"),
            OutputLine::Done(result) => return Ok(result.success),
        }
    }
    Ok(false)
}

fn run_queue(cfg: &Config, root: &Path, args: QueueArgs) -> Result<bool> {
    let upload_dir = args
        .upload_dir
        .unwrap_or_else(|| root.join(&cfg.upload_dir));
    let max_size = args.max_size.unwrap_or(cfg.max_queue_size);
    let max_age_hours = args.max_age_hours.unwrap_or(cfg.max_file_age_hours);

    let open = || QueueManager::open(root, &upload_dir, max_size, max_age_hours);

    match args.command {
        QueueCommands::Repair => return print_repair(queue::repair_queue(root, &upload_dir)?),
        QueueCommands::List => {
            for entry in open()?.entries() {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.file_id, entry.file_type, entry.file_size, entry.datetime, entry.file_path
                );
            }
        }
        QueueCommands::Stats => {
            println!("{}", serde_json::to_string_pretty(&open()?.stats())?);
        }
        QueueCommands::Add { path, id, kind } => match open()?.add_file(&path, &id, kind)? {
            Some(entry) => println!("✅ Файл добавлен в очередь: {}", entry.file_name),
            None => {
                println!("❌ Файл не существует: {}", path.display());
                return Ok(false);
            }
        },
        QueueCommands::Remove { path, id } => {
            let manager = open()?;
            if let Some(path) = path {
                if !manager.remove_file(&path)? {
                    println!("❌ Файл не найден в очереди: {path}");
                    return Ok(false);
                }
                println!("✅ Удалён: {path}");
            } else if let Some(id) = id {
                let removed = manager.remove_by_id(&id)?;
                println!("✅ Удалено файлов с ID {id}: {removed}");
            }
        }
        QueueCommands::Cleanup => {
            let manager = open()?;
            let aged = manager.cleanup_old_files()?;
            let trimmed = manager.enforce_queue_size()?;
            println!("🧹 Удалено устаревших: {aged}, сверх лимита: {trimmed}");
        }
        QueueCommands::Purge => {
            let removed = open()?.force_cleanup_all()?;
            println!("🧹 Принудительная очистка: удалено {removed} файлов");
        }
        QueueCommands::Sweep => {
            let max_age = Duration::from_secs(max_age_hours * 3600);
            let removed = queue::sweep_stale(&upload_dir, max_age)
                .with_context(|| format!("failed to sweep {}", upload_dir.display()))?;
            for path in &removed {
                println!("Removed old file: {}", path.display());
            }
            println!("🧹 Удалено файлов: {}", removed.len());
        }
        QueueCommands::Watch {
            initial_delay_secs,
            interval_secs,
        } => {
            let schedule = CleanupSchedule {
                initial_delay: Duration::from_secs(initial_delay_secs),
                interval: Duration::from_secs(interval_secs),
                ..CleanupSchedule::default()
            };
            let manager = open()?;
            println!("👀 Автоматическая очистка запущена");
            queue::run_cleanup_loop(&manager, schedule, &CancelToken::new());
        }
    }
    Ok(true)
}

fn print_repair(outcome: RepairOutcome) -> Result<bool> {
    match &outcome {
        RepairOutcome::NotFound => println!("❌ Файл очереди не найден"),
        RepairOutcome::Healthy { entries } => {
            println!("✅ Файл очереди корректен, содержит {entries} записей")
        }
        RepairOutcome::ResetEmpty { backup } => {
            println!("⚠️  Файл очереди пуст, бэкап: {}", backup.display())
        }
        RepairOutcome::ResetCorrupt { backup, error } => {
            println!("❌ Ошибка JSON: {error}");
            println!("✅ Бэкап повреждённого файла: {}", backup.display());
        }
        RepairOutcome::Pruned {
            removed, backup, ..
        } => {
            println!("✅ Очередь исправлена, удалено {removed} записей");
            println!("   Копия: {}", backup.display());
        }
        RepairOutcome::Invalid { reason } => {
            println!("❌ Неверный формат очереди: {reason}");
            return Ok(false);
        }
    }
    Ok(true)
}
