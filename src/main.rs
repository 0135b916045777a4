// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use shelfsync::utils::logging::{
    format_difference, format_error, format_info, format_success, format_warning,
    set_color_output,
};
use shelfsync::{
    AppConfig, AutoCheckOutcome, ConflictResolution, FsBackupService, JsonCatalogStore,
    JsonExporter, ManualCheckOutcome, NativeFileAccess, ReconciliationEngine, RecoveryOption,
    StatusController, StatusOptions, SyncOptions, VersionCompareResult, render_catalog,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "shelfsync")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Keep a cached book catalog in sync with a static-site page", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Point the cache at an existing catalog page
    Configure { path: PathBuf },

    /// Show the configured page and cache summary
    Status,

    /// Compare the cache with the catalog page
    Check,

    /// Run background checks on an interval until interrupted
    Watch {
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Replace the cache with the records on the page
    Pull,

    /// Rewrite the page from the cache
    Push {
        #[arg(long)]
        backup: bool,
    },

    /// Settle a conflict by picking a side
    Resolve {
        #[arg(value_enum)]
        side: Side,

        #[arg(long)]
        no_backup: bool,
    },

    /// Print the page the cache would produce
    Render {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    Export {
        output: PathBuf,

        #[arg(short, long)]
        pretty: bool,
    },

    Import { input: PathBuf },

    /// Forget the configured page; cached books are kept
    Reset {
        #[arg(long)]
        confirm: bool,
    },

    /// Recover an empty cache
    Recover {
        #[arg(value_enum)]
        from: RecoverFrom,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Cache,
    Page,
    Abort,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecoverFrom {
    Backup,
    Page,
    Ignore,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    shelfsync::utils::logging::init_logger(cli.color, cli.verbose);
    set_color_output(cli.color);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        AppConfig::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        AppConfig::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            AppConfig::default_config()
        })
    };

    let engine = build_engine(&config);

    match cli.command {
        Commands::Configure { path } => cmd_configure(&engine, path).await?,
        Commands::Status => cmd_status(&engine).await?,
        Commands::Check => cmd_check(&engine, &config).await?,
        Commands::Watch { interval } => cmd_watch(&engine, &config, interval).await?,
        Commands::Pull => cmd_pull(&engine).await?,
        Commands::Push { backup } => cmd_push(&engine, backup).await?,
        Commands::Resolve { side, no_backup } => cmd_resolve(&engine, side, !no_backup).await?,
        Commands::Render { output } => cmd_render(&engine, output).await?,
        Commands::Export { output, pretty } => cmd_export(&engine, output, pretty).await?,
        Commands::Import { input } => cmd_import(&engine, input).await?,
        Commands::Reset { confirm } => cmd_reset(&engine, confirm).await?,
        Commands::Recover { from } => cmd_recover(&engine, from).await?,
    }

    Ok(())
}

fn build_engine(config: &AppConfig) -> ReconciliationEngine {
    ReconciliationEngine::new(
        Arc::new(JsonCatalogStore::new(
            config.storage.data_dir.clone(),
            config.backup.cache_snapshots,
        )),
        Arc::new(NativeFileAccess::new()),
        Arc::new(FsBackupService::new()),
        SyncOptions::from_config(config),
    )
}

fn print_report(result: &VersionCompareResult) {
    println!(
        "{}",
        format_info(&format!(
            "cache: {} books ({})  page: {} books ({})",
            result.cache_books_count,
            result.cache_fingerprint,
            result.external_books_count,
            result.external_fingerprint
        ))
    );
    for difference in &result.differences {
        println!(
            "{}",
            format_difference(difference.kind.as_str(), &difference.description)
        );
    }
    if result.has_conflict {
        println!(
            "{}",
            format_warning("Cache and page differ, run `shelfsync resolve cache|page`")
        );
    } else {
        println!("{}", format_success("Cache and page are in sync"));
    }
}

async fn cmd_configure(engine: &ReconciliationEngine, path: PathBuf) -> Result<()> {
    let config = engine
        .set_external_path(&path)
        .await
        .with_context(|| format!("Cannot use {} as the catalog page", path.display()))?;
    println!(
        "{}",
        format_success(&format!(
            "Catalog page set to {}",
            config.external_file_path.display()
        ))
    );

    if engine.cached_books().await?.is_empty() {
        println!(
            "{}",
            format_info("The cache is empty, run `shelfsync pull` to load the page")
        );
    }
    Ok(())
}

async fn cmd_status(engine: &ReconciliationEngine) -> Result<()> {
    let records = engine.cached_books().await?;
    let config = engine.sync_config().await?;

    match config.filter(|c| c.is_configured()) {
        Some(config) => {
            println!("Catalog page:   {}", config.external_file_path.display());
            println!("Auto check:     {}", config.auto_version_check);
            match config.last_sync_time {
                Some(at) => println!("Last sync:      {}", at.to_rfc3339()),
                None => println!("Last sync:      never"),
            }
            println!("Synced version: {}", config.cache_version);
        }
        None => println!("Catalog page:   not configured"),
    }
    println!("Cached books:   {}", records.books.len());
    println!("Cache version:  {}", engine.current_fingerprint().await?);

    let report = engine.detect_data_loss().await?;
    if report.has_data_loss {
        println!(
            "{}",
            format_warning("The cache is empty, run `shelfsync recover backup|page|ignore`")
        );
    }
    Ok(())
}

async fn cmd_check(engine: &ReconciliationEngine, config: &AppConfig) -> Result<()> {
    let controller = StatusController::new(StatusOptions::from_config(config));
    let configured = engine.external_path().await?.is_some();

    match controller.manual_check(engine).await {
        Ok(ManualCheckOutcome::NothingToCompare) => {
            println!("{}", format_info("Nothing to compare"));
        }
        Ok(ManualCheckOutcome::Synced(result) | ManualCheckOutcome::Conflict(result)) => {
            print_report(&result);
        }
        Err(e) => {
            println!("{}", format_error(&e.user_message()));
            println!("{}", format_info(e.remediation()));
        }
    }
    println!("Status: {}", controller.display(configured));
    Ok(())
}

async fn cmd_watch(
    engine: &ReconciliationEngine,
    config: &AppConfig,
    interval: Option<u64>,
) -> Result<()> {
    let period = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.sync.watch_interval());
    let controller = StatusController::new(StatusOptions::from_config(config)).with_listener(
        Arc::new(|status| println!("{}", format_info(&format!("status: {}", status)))),
    );

    info!("Checking every {}s, press ctrl-c to stop", period.as_secs());
    let mut ticker = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let AutoCheckOutcome::Conflict(result) = controller.auto_check(engine).await {
                    print_report(&result);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
        }
    }
    Ok(())
}

async fn cmd_pull(engine: &ReconciliationEngine) -> Result<()> {
    let books = engine
        .sync_from_external()
        .await
        .context("Failed to load the catalog page")?;
    if books.is_empty() {
        println!("{}", format_warning("The page holds no books, cache unchanged"));
    } else {
        println!(
            "{}",
            format_success(&format!("Loaded {} books from the page", books.len()))
        );
    }
    Ok(())
}

async fn cmd_push(engine: &ReconciliationEngine, backup: bool) -> Result<()> {
    if engine
        .sync_to_external(backup)
        .await
        .context("Failed to write the catalog page")?
    {
        println!("{}", format_success("Catalog page updated"));
    } else {
        println!("{}", format_warning("Nothing was written"));
    }
    Ok(())
}

async fn cmd_resolve(engine: &ReconciliationEngine, side: Side, create_backup: bool) -> Result<()> {
    let resolution = match side {
        Side::Cache => ConflictResolution::UseCache { create_backup },
        Side::Page => ConflictResolution::UseExternal,
        Side::Abort => ConflictResolution::Abort,
    };

    if engine.resolve_conflict(resolution).await {
        println!("{}", format_success("Conflict resolved"));
    } else {
        println!("{}", format_warning("Conflict left unresolved"));
    }
    Ok(())
}

async fn cmd_render(engine: &ReconciliationEngine, output: Option<PathBuf>) -> Result<()> {
    let records = engine.cached_books().await?;
    let rendered = render_catalog(
        &records.ordered_books(),
        records.original_file_structure.as_ref(),
    );

    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{}",
                format_success(&format!("Rendered catalog written to {}", path.display()))
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn cmd_export(engine: &ReconciliationEngine, output: PathBuf, pretty: bool) -> Result<()> {
    let records = engine.cached_books().await?;
    let envelope = JsonExporter::new(pretty)
        .export_to(
            &output,
            &records.ordered_books(),
            records.original_file_structure.as_ref(),
        )
        .await
        .context("Export failed")?;
    println!(
        "{}",
        format_success(&format!(
            "Exported {} books to {}",
            envelope.total_books,
            output.display()
        ))
    );
    Ok(())
}

async fn cmd_import(engine: &ReconciliationEngine, input: PathBuf) -> Result<()> {
    let books = JsonExporter::import_from(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let count = engine.import_books(books).await?;
    println!("{}", format_success(&format!("Imported {} books", count)));

    let controller = StatusController::new(StatusOptions::default());
    if controller.notify_data_changed(engine.external_path().await?.is_some()) {
        println!(
            "{}",
            format_info("The cache now differs from the page, run `shelfsync push` to publish")
        );
    }
    Ok(())
}

async fn cmd_reset(engine: &ReconciliationEngine, confirm: bool) -> Result<()> {
    if !confirm {
        println!(
            "{}",
            format_warning("This forgets the configured page. Re-run with --confirm")
        );
        return Ok(());
    }
    engine.reset().await?;
    println!("{}", format_success("Sync configuration cleared"));
    Ok(())
}

async fn cmd_recover(engine: &ReconciliationEngine, from: RecoverFrom) -> Result<()> {
    let report = engine.detect_data_loss().await?;
    if !report.has_data_loss {
        println!("{}", format_info("No data loss detected"));
        return Ok(());
    }

    let option = match from {
        RecoverFrom::Backup => RecoveryOption::RestoreFromBackup,
        RecoverFrom::Page => RecoveryOption::PullFromExternal,
        RecoverFrom::Ignore => RecoveryOption::Ignore,
    };
    if !report.recovery_options.contains(&option) {
        println!("{}", format_error("That recovery option is not available"));
        return Ok(());
    }

    if engine.recover_data(option).await.context("Recovery failed")? {
        println!("{}", format_success("Recovery complete"));
    } else {
        println!("{}", format_warning("Nothing was recovered"));
    }
    Ok(())
}
