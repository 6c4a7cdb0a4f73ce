use clap::Parser;
use riftsync::app::App;
use riftsync::cli::{Args, Command};
use riftsync::config::Config;
use riftsync::logging::setup_logging;
use riftsync::riot::Region;
use riftsync::sync::SyncReport;
use riftsync::sync::identity::Handle;
use std::process::ExitCode;
use tracing::{error, info};
use yansi::Paint;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Load config and setup logging before anything else so startup logs are never dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting riftsync"
    );

    match args.command {
        Command::Migrate => match App::migrate(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = ?e, "Migration failed");
                ExitCode::FAILURE
            }
        },
        Command::Sync {
            handle,
            region,
            matches,
            json,
        } => run_sync(config, &handle, region, matches, json).await,
    }
}

async fn run_sync(
    config: Config,
    handle: &str,
    region: Region,
    include_matches: bool,
    json: bool,
) -> ExitCode {
    if let Err(e) = handle.parse::<Handle>() {
        eprintln!("{} {e}", "error:".red().bold());
        return ExitCode::from(2);
    }

    let app = match App::new(config).await {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "Failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    let report = app.sync(handle, region, include_matches).await;
    app.shutdown().await;

    if json {
        match serde_json::to_string(&report) {
            Ok(line) => println!("{line}"),
            Err(e) => error!(error = ?e, "Failed to serialize report"),
        }
    } else {
        print_report(handle, region, include_matches, &report);
    }

    let succeeded = report.metadata_ok && (!include_matches || report.matches_ok);
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(handle: &str, region: Region, include_matches: bool, report: &SyncReport) {
    let status = |ok: bool| if ok { "ok".green() } else { "failed".red() };

    println!("{} {}", handle.bold(), region.dim());
    println!("  metadata  {}", status(report.metadata_ok));
    if include_matches {
        println!("  matches   {}", status(report.matches_ok));
    }
    if let Some(puuid) = &report.puuid {
        println!("  puuid     {}", puuid.dim());
    }
}
