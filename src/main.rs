use clap::Parser;
use reqcheck::config::args::{CheckArgs, Command, ListArgs};
use reqcheck::core::report::render_listing;
use reqcheck::utils::{logger, validation::Validate};
use reqcheck::{CheckEngine, CheckError, CheckPipeline, CliConfig, LocalStorage, Settings};

fn fail(e: &CheckError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn validated(settings: reqcheck::Result<Settings>) -> Settings {
    let settings = settings.unwrap_or_else(|e| fail(&e));
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }
    settings
}

async fn run_check(args: &CheckArgs) -> i32 {
    let settings = validated(args.settings());
    tracing::debug!("Resolved settings: {:?}", settings);

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = CheckPipeline::new(LocalStorage::current_dir(), settings);
    let engine = CheckEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(run) => {
            let summary = &run.report.summary;
            if run.output != "-" {
                tracing::info!("📁 Report saved to: {}", run.output);
                println!("📁 Report saved to: {}", run.output);
            }
            if run.report.has_errors() {
                tracing::warn!(
                    "❌ {} error(s), {} warning(s)",
                    summary.errors,
                    summary.warnings
                );
            } else {
                tracing::info!("✅ Manifest check passed ({} warning(s))", summary.warnings);
            }
            run.report.exit_status()
        }
        Err(e) => fail(&e),
    }
}

async fn run_list(args: &ListArgs) -> i32 {
    let settings = validated(args.settings());
    let pipeline = CheckPipeline::new(LocalStorage::current_dir(), settings);
    let engine = CheckEngine::new(pipeline);

    match engine.inspect().await {
        Ok(report) => {
            print!("{}", render_listing(&report, args.include_deactivated));
            if report.has_errors() {
                tracing::warn!(
                    "⚠️ Manifest has {} error(s); run `reqcheck check` for details",
                    report.summary.errors
                );
            }
            0
        }
        Err(e) => fail(&e),
    }
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let code = match &cli.command {
        Command::Check(args) => run_check(args).await,
        Command::List(args) => run_list(args).await,
    };

    std::process::exit(code);
}
