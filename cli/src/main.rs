//! Sentinel CLI
//!
//! Command-line console for the Sentinel SOAR platform.
//!
//! # Usage
//!
//! ```bash
//! sentinel overview --watch
//! sentinel incidents list
//! sentinel incidents resolve 42 --action block
//! sentinel audit export --format csv --out ./reports
//! sentinel --mode simulation traffic --watch
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use sentinel_console::{ConsoleConfig, DataMode};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(author = "Sentinel")]
#[command(version)]
#[command(about = "Sentinel SOAR console", long_about = None)]
struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, env = "SENTINEL_API_URL")]
    api_url: Option<String>,

    /// Data source: live backend or local simulation
    #[arg(long, env = "SENTINEL_MODE")]
    mode: Option<DataMode>,

    /// Output format
    #[arg(long, short)]
    format: Option<output::OutputFormat>,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show system health
    Health {
        /// Keep polling until interrupted
        #[arg(long, short)]
        watch: bool,
    },
    /// Show live traffic
    Traffic {
        #[arg(long, short)]
        watch: bool,
        /// Maximum rows to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show the dashboard overview
    Overview {
        #[arg(long, short)]
        watch: bool,
    },
    /// Work the pending incident queue
    Incidents {
        #[command(subcommand)]
        action: IncidentCommands,
    },
    /// Inspect and export the audit log
    Audit {
        #[command(subcommand)]
        action: AuditCommands,
    },
    /// Summarise the threat map
    Threats {
        /// List individual points instead of the per-country summary
        #[arg(long)]
        points: bool,
    },
    /// View or change the detection policy
    Policy {
        #[command(subcommand)]
        action: PolicyCommands,
    },
    /// Log in as admin
    Login {
        #[arg(long, short, default_value = "admin")]
        username: String,
        /// Read from stdin when omitted
        #[arg(long, env = "SENTINEL_ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Clear the stored admin session
    Logout,
    /// Validate the stored admin session
    Whoami,
    /// Ask the assistant
    Chat {
        query: String,
        /// Continue an existing chat session
        #[arg(long)]
        session: Option<i64>,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum IncidentCommands {
    /// List pending incidents
    List {
        /// Also show the most recent actions
        #[arg(long)]
        recent: bool,
        #[arg(long, short)]
        watch: bool,
    },
    /// Resolve a pending incident
    Resolve {
        id: i64,
        #[arg(long, value_enum)]
        action: ResolveChoice,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResolveChoice {
    Block,
    Ignore,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportChoice {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum AuditCommands {
    /// List audit entries with summary stats
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Export the audit log to a file
    Export {
        #[arg(long = "format", value_enum, default_value = "csv")]
        export_format: ExportChoice,
        /// Target directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum PolicyCommands {
    /// Show the current policy
    Show,
    /// Update policy fields; omitted fields are left unchanged
    Set {
        /// Auto-block confidence threshold in [0, 1]
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        dynamic_threshold: Option<bool>,
        /// Model noise rate in [0, 0.5]
        #[arg(long)]
        noise_rate: Option<f64>,
        #[arg(long)]
        min_threshold: Option<f64>,
        #[arg(long)]
        max_threshold: Option<f64>,
        #[arg(long)]
        auto_resolve: Option<bool>,
        #[arg(long)]
        queue_trigger: Option<u32>,
        #[arg(long)]
        resolve_delta: Option<f64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let profile = cli.profile.as_deref();

    // config commands must work on a file that no longer validates
    let command = match cli.command {
        Commands::Config { action } => {
            init_tracing("warn");
            return commands::config::handle(action, profile);
        }
        command => command,
    };

    let mut config = ConsoleConfig::load(profile)?;
    init_tracing(&config.log_level);

    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    config.validate()?;

    let format = cli
        .format
        .or_else(|| {
            config
                .default_format
                .as_deref()
                .and_then(|f| output::OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or(output::OutputFormat::Table);
    let ctx = commands::Context::new(config, format)?;
    tracing::debug!(?format, "dispatching command");

    match command {
        Commands::Health { watch } => commands::health::handle(&ctx, watch).await,
        Commands::Traffic { watch, limit } => commands::traffic::handle(&ctx, watch, limit).await,
        Commands::Overview { watch } => commands::overview::handle(&ctx, watch).await,
        Commands::Incidents { action } => commands::incidents::handle(action, &ctx).await,
        Commands::Audit { action } => commands::audit::handle(action, &ctx).await,
        Commands::Threats { points } => commands::threats::handle(&ctx, points).await,
        Commands::Policy { action } => commands::policy::handle(action, &ctx).await,
        Commands::Login { username, password } => commands::auth::login(&ctx, &username, password).await,
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Whoami => commands::auth::whoami(&ctx).await,
        Commands::Chat { query, session } => commands::chat::handle(&ctx, &query, session).await,
        Commands::Config { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
