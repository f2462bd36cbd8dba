use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hakwonplus::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "hakwonplus",
    version,
    about = "Client for the HakwonPlus multi-tenant academy API",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file (defaults to HAKWON_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Hostname to resolve the tenant from
    #[arg(long, global = true)]
    hostname: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a hostname to its tenant
    Tenant {
        /// Hostname or tenant code
        host: String,
    },

    /// Fetch the program of the current tenant
    Program,

    /// Show the signed-in user
    Whoami,

    /// Sign in and store the tokens
    Login {
        #[arg(short, long)]
        username: String,

        /// Password (read from HAKWON_PASSWORD when omitted)
        #[arg(short, long, env = "HAKWON_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show your result for an exam
    ExamResult {
        /// Exam id
        id: u64,
    },

    /// Wait for a background job to finish
    Job {
        /// Job id
        id: String,

        #[arg(long, value_enum, default_value = "generic")]
        kind: JobKind,
    },

    /// PUT a file to a pre-signed URL
    Upload {
        /// Pre-signed URL
        url: String,

        /// File to upload
        file: PathBuf,

        /// Content type the URL was signed with
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Resolve a path in one of the route tables
    Routes {
        /// admin, student, dev, or auth
        app: String,

        /// Path to resolve
        path: String,
    },

    /// Format a value for display
    Format {
        #[arg(value_enum)]
        kind: FormatKind,

        value: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum JobKind {
    Generic,
    ExcelEnroll,
    WrongNotePdf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatKind {
    Phone,
    Omr,
    Date,
    Datetime,
    Bytes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = load_config(cli.config.as_deref(), cli.hostname)?;
    tracing::debug!(api = %config.api_root(), "Configuration loaded");

    match cli.command {
        Commands::Tenant { host } => commands::tenant::tenant(&host)?,
        Commands::Program => commands::tenant::program(config).await?,
        Commands::Whoami => commands::session::whoami(config).await?,
        Commands::Login { username, password } => {
            tracing::info!(username = %username, "Starting login command");
            commands::session::login(config, &username, &password).await?;
        }
        Commands::Logout => commands::session::logout(config)?,
        Commands::ExamResult { id } => commands::exam::exam_result(config, id).await?,
        Commands::Job { id, kind } => {
            let endpoint = match kind {
                JobKind::Generic => hakwonplus::jobs::JobEndpoint::Generic,
                JobKind::ExcelEnroll => hakwonplus::jobs::JobEndpoint::ExcelEnroll,
                JobKind::WrongNotePdf => hakwonplus::jobs::JobEndpoint::WrongNotePdf,
            };
            commands::job::job(config, &id, endpoint).await?;
        }
        Commands::Upload {
            url,
            file,
            content_type,
        } => {
            tracing::info!(file = %file.display(), "Starting upload command");
            commands::upload::upload(&url, &file, content_type.as_deref()).await?;
        }
        Commands::Routes { app, path } => commands::routes::routes(config, &app, &path).await?,
        Commands::Format { kind, value } => {
            let formatted = match kind {
                FormatKind::Phone => hakwonplus::utils::format_phone(Some(&value)),
                FormatKind::Omr => hakwonplus::utils::format_omr_code(Some(&value)),
                FormatKind::Date => hakwonplus::utils::format_date(Some(&value)),
                FormatKind::Datetime => hakwonplus::utils::format_date_time(Some(&value)),
                FormatKind::Bytes => {
                    let bytes = value
                        .trim()
                        .parse::<u64>()
                        .with_context(|| format!("Not a byte count: {value}"))?;
                    hakwonplus::utils::format_bytes(bytes)
                }
            };
            println!("{formatted}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>, hostname: Option<String>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if hostname.is_some() {
        config.tenant.hostname = hostname;
    }
    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("hakwonplus=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("hakwonplus=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
