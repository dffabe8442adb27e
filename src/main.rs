use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};

use poco_schedule::{
    build_cron_from_preset, format_schedule_preview, infer_schedule_from_cron, parse_timezone,
    CronExpression, DispatchRequest, FileTaskStore, PresetDraft, Result, ScheduleConfig,
    ScheduleError, ScheduledTaskService,
};

#[derive(Parser)]
#[command(
    name = "poco-schedule",
    about = "Translate cron strings to schedule presets and back"
)]
struct Cli {
    /// JSON config file (defaults plus POCO_SCHEDULE_* overrides if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the preset a cron string maps to, as a dialog draft
    Infer { cron: String },
    /// Build a cron string from a JSON dialog draft
    Build {
        /// e.g. '{"preset":"weekly","weekDays":[1,5],"time":{"hour":8,"minute":30}}'
        draft: String,
    },
    /// Print the localized summary of a cron string
    Summary {
        cron: String,
        /// Override the configured locale
        #[arg(short, long)]
        locale: Option<String>,
    },
    /// List upcoming run times
    Next {
        cron: String,
        /// IANA timezone (default: configured timezone)
        #[arg(long)]
        tz: Option<String>,
        /// Number of runs to print
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
    /// Dispatch due tasks from the configured file store
    Dispatch {
        /// Maximum tasks to claim (default: configured limit)
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ScheduleConfig::load(path),
        None => ScheduleConfig::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[poco-schedule] {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, config).await {
        eprintln!("[poco-schedule] {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, mut config: ScheduleConfig) -> Result<()> {
    match command {
        Commands::Infer { cron } => {
            let preset = infer_schedule_from_cron(&cron);
            match PresetDraft::from_preset(&preset) {
                Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
                None => println!("cron: {}", cron.trim()),
            }
        }
        Commands::Build { draft } => {
            let draft: PresetDraft = serde_json::from_str(&draft)?;
            println!("{}", build_cron_from_preset(&draft));
        }
        Commands::Summary { cron, locale } => {
            if let Some(locale) = locale {
                config.locale = locale;
            }
            let catalog = config.catalog()?;
            println!("{}", format_schedule_preview(&infer_schedule_from_cron(&cron), &catalog));
        }
        Commands::Next { cron, tz, count } => {
            let expr = CronExpression::parse(&cron)?;
            let tz = match tz {
                Some(name) => parse_timezone(&name)?,
                None => config.timezone()?,
            };
            println!("{}", expr.describe());

            let mut after = Utc::now();
            for _ in 0..count {
                match expr.next_after_tz(after, tz) {
                    Some(next) => {
                        println!("{}", next.with_timezone(&tz).to_rfc3339());
                        after = next;
                    }
                    None => break,
                }
            }
        }
        Commands::Dispatch { limit } => {
            let path = config.store_path.clone().ok_or_else(|| {
                ScheduleError::Config("store_path is required for dispatch".to_string())
            })?;
            let store = FileTaskStore::new(path).await?;
            let service = ScheduledTaskService::with_config(Arc::new(store), &config);
            let request = DispatchRequest {
                limit: limit.unwrap_or(0),
            };
            let response = service.dispatch_due(request, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
