//! authmigrate command-line tool.
//!
//! Reconciles legacy application users with Supabase auth accounts, creating
//! the accounts that are missing, and prints the resulting
//! `{legacy_id, auth_id}` mapping as JSON on stdout. Logs and summaries go to
//! stderr so stdout can be redirected straight into a file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use authmigrate_core::config::{EnvFile, MigrationConfig, DEFAULT_ENV_FILE};
use authmigrate_core::errors::ConfigError;
use authmigrate_core::identity::MappingFile;
use authmigrate_core::reconcile::{ReconcileOptions, Reconciler};
use authmigrate_core::supabase::SupabaseClient;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Migrate legacy users into Supabase auth.
#[derive(Parser, Debug)]
#[command(
    name = "authmigrate",
    version,
    about = "Create missing Supabase auth accounts for legacy users and print the ID mapping"
)]
struct Cli {
    /// Path to the env file holding SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY.
    #[arg(short, long, global = true, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile users and print the mapping (default).
    Migrate(MigrateArgs),

    /// Check configuration without contacting Supabase.
    Validate,
}

#[derive(Args, Debug, Default)]
struct MigrateArgs {
    /// Report missing accounts without creating them.
    #[arg(long)]
    dry_run: bool,

    /// Also write the mapping JSON to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// How a run ended, when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    MissingConfig,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout();

    match run(cli, |name| std::env::var(name).ok(), &mut stdout).await {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::MissingConfig) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run<F, W>(cli: Cli, process_env: F, out: &mut W) -> Result<Outcome>
where
    F: Fn(&str) -> Option<String>,
    W: Write,
{
    let config = match load_config(&cli.env_file, process_env)? {
        Some(config) => config,
        None => {
            writeln!(out, "{}", ConfigError::MissingRequired { missing: Vec::new() })?;
            return Ok(Outcome::MissingConfig);
        }
    };

    match cli.command {
        Some(Commands::Validate) => cmd_validate(&config, out)?,
        Some(Commands::Migrate(args)) => cmd_migrate(&config, args, out).await?,
        None => cmd_migrate(&config, MigrateArgs::default(), out).await?,
    }
    Ok(Outcome::Success)
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Resolve the config, returning `None` when the required settings are absent.
fn load_config<F>(env_file: &Path, process_env: F) -> Result<Option<MigrationConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let file_vars = EnvFile::load(env_file).context("failed to read env file")?;
    let config = match MigrationConfig::resolve(&file_vars, process_env) {
        Ok(config) => config,
        Err(ConfigError::MissingRequired { .. }) => return Ok(None),
        Err(e) => return Err(e).context("failed to resolve configuration"),
    };
    config.validate().context("invalid configuration")?;
    Ok(Some(config))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_migrate<W: Write>(
    config: &MigrationConfig,
    args: MigrateArgs,
    out: &mut W,
) -> Result<()> {
    let client = SupabaseClient::new(config).context("failed to build HTTP client")?;
    let reconciler = Reconciler::new(
        client,
        ReconcileOptions {
            dry_run: args.dry_run,
        },
    );

    let report = reconciler.run().await.context("migration failed")?;

    let rendered = MappingFile::render(&report.mapping).context("failed to render mapping")?;
    writeln!(out, "{}", rendered)?;

    if let Some(ref path) = args.output {
        MappingFile::save(path, &report.mapping).context("failed to write mapping file")?;
        info!(path = %path.display(), "mapping written");
    }

    let stats = &report.stats;
    eprintln!(
        "Mapped {} of {} legacy users (matched {}, created {}, skipped {})",
        report.mapping.len(),
        stats.legacy_total,
        stats.matched,
        stats.created,
        stats.skipped(),
    );
    if args.dry_run {
        eprintln!("Dry run: {} auth account(s) would be created", stats.would_create);
    }

    Ok(())
}

fn cmd_validate<W: Write>(config: &MigrationConfig, out: &mut W) -> Result<()> {
    writeln!(out, "Configuration is valid.")?;
    writeln!(out)?;
    writeln!(out, "  Supabase URL     : {}", config.base_url)?;
    writeln!(out, "  Service-role key : {}", config.masked_key())?;
    writeln!(out, "  Legacy users     : {}", config.rest_users_url())?;
    writeln!(out, "  Auth admin users : {}", config.auth_admin_users_url())?;
    Ok(())
}
