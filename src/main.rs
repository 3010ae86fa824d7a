use clap::Parser;
use registry_harvest::utils::error::{ErrorSeverity, HarvestError};
use registry_harvest::utils::{logger, validation::Validate};
use registry_harvest::{CliArgs, HarvestConfig, HarvestEngine, StopReason};
use std::time::Instant;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 時間預算從行程啟動開始計算
    let started_at = Instant::now();
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting registry-harvest");

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, args.dry_run);

    let engine = HarvestEngine::new(config, started_at);

    if args.dry_run {
        match engine.plan() {
            Ok(plan) => {
                println!("🔍 Dry Run Analysis:");
                println!("  Identifiers in input: {}", plan.total);
                println!("  Already checkpointed: {}", plan.handled);
                println!("  Pending for this run: {}", plan.pending);
                return Ok(());
            }
            Err(e) => fail(e),
        }
    }

    match engine.run().await {
        Ok(report) => {
            let stats = &report.stats;
            tracing::info!(
                "📊 found={} not_found={} failed={} dropped_records={}",
                stats.found,
                stats.not_found,
                stats.failed,
                stats.records_dropped
            );
            match report.stop_reason {
                StopReason::Drained => {
                    println!("✅ All identifiers handled ({} this run)", report.processed.len());
                }
                StopReason::TimeBudgetExceeded => {
                    println!(
                        "⏰ Time budget reached after {} identifiers, {} left for the next run",
                        report.processed.len(),
                        report.remaining
                    );
                }
            }
            if !report.deferred.is_empty() {
                println!("🔁 {} failed identifiers left pending", report.deferred.len());
            }
            if let Some(output_path) = &report.output_path {
                println!("📁 Output saved to: {}", output_path);
            }
        }
        Err(e) => fail(e),
    }

    Ok(())
}

fn fail(e: HarvestError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Harvest failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(config: &HarvestConfig, dry_run: bool) {
    println!("📋 Configuration Summary:");
    println!("  Source: {}", config.source.endpoint);
    println!(
        "  Input: {} (column {})",
        config.input.path, config.input.id_column
    );
    println!("  Output: {}", config.output.output_path);
    println!("  Checkpoint log: {}", config.output.checkpoint_path().display());
    println!("  Time budget: {}s", config.run.time_budget_seconds);
    println!(
        "  Delay: {}-{} ms",
        config.run.min_delay_ms, config.run.max_delay_ms
    );
    println!("  On transient error: {:?}", config.run.on_transient_error);
    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}
