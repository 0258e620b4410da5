use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use site_report_lib::commands::{self, GenerateArgs, SitesArgs, WeeklyArgs};
use site_report_lib::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "site-reports", version, about = "Daily and weekly DOCX site reports from spreadsheet rows")]
struct Cli {
    /// Settings file (.json or .toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the distinct sites and dates in a row source.
    Sites(SitesArgs),
    /// Render one daily report per selected row into a zip archive.
    Generate(GenerateArgs),
    /// Render the weekly report for one Monday-to-Sunday week.
    Weekly(WeeklyArgs),
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if env_bool("SITE_REPORTS_LOG_JSON", false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = AppConfig::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    match &cli.command {
        Commands::Sites(args) => commands::list_sites(args, &config),
        Commands::Generate(args) => commands::generate(args, &config).map(|_| ()),
        Commands::Weekly(args) => commands::weekly(args, &config).map(|_| ()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
