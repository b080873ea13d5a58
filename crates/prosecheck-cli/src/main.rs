//! prosecheck CLI - list conversion checks for rich-text editors
//!
//! Usage:
//!   prosecheck init                 Write a default .prosecheck/config.toml
//!   prosecheck run                  Run the list conversion suite
//!   prosecheck run --dry-run        Run against the simulated editor
//!   prosecheck cases                Print the built-in cases as JSON
//!   prosecheck artifacts [run-id]   List runs or one run's evidence
//!   prosecheck hook                 Apply tool-execute-after hooks to stdin

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prosecheck_browser::{ChromeSession, MemoryPage, MemorySession, Session};
use prosecheck_core::config::{HoldConfig, TimingConfig};
use prosecheck_core::{ArtifactKind, ArtifactStore, EvidenceSink, HarnessConfig};
use prosecheck_runner::{new_run_id, select_cases, standard_suite, RunReport, ScenarioRunner};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Post-run hold for headed runs that do not configure one
const HEADED_INSPECTION_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "prosecheck")]
#[command(author, version, about = "List conversion checks for rich-text editors")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Run the list conversion suite
    Run {
        /// Configuration file (defaults to .prosecheck/config.toml when present)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Application URL to open
        #[arg(long)]
        url: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Attach to a running browser through its DevTools websocket URL
        #[arg(long, value_name = "WS_URL")]
        connect: Option<String>,

        /// Only run the named cases (repeatable)
        #[arg(long = "case", value_name = "NAME")]
        cases: Vec<String>,

        /// Also write the run report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Skip every manual-inspection hold
        #[arg(long)]
        no_hold: bool,

        /// Run against the simulated editor instead of a browser
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the built-in cases as JSON
    Cases,

    /// List runs, or the artifacts of one run
    Artifacts {
        /// Run identifier
        run_id: Option<String>,

        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Read a tool execution as JSON on stdin and print the hooked result
    Hook,
}

/// Flags of the `run` command
struct RunOptions {
    config: Option<PathBuf>,
    url: Option<String>,
    headed: bool,
    connect: Option<String>,
    cases: Vec<String>,
    report: Option<PathBuf>,
    no_hold: bool,
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries command output
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Run {
            config,
            url,
            headed,
            connect,
            cases,
            report,
            no_hold,
            dry_run,
        } => {
            let code = cmd_run(RunOptions {
                config,
                url,
                headed,
                connect,
                cases,
                report,
                no_hold,
                dry_run,
            })
            .await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Cases => cmd_cases(),
        Commands::Artifacts { run_id, config } => cmd_artifacts(run_id, config).await,
        Commands::Hook => cmd_hook().await,
    }
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => HarnessConfig::load_or_default(Path::new(".")).context("Failed to load config"),
    }
}

fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing prosecheck in {:?}", path);
    let config_path = HarnessConfig::write_default(&path).context("Failed to write config")?;

    println!("Initialized prosecheck in {:?}", path);
    println!("Created:");
    println!("  {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set target_url and editor.root_class for your application");
    println!("  2. Run 'prosecheck run --dry-run' to check the harness itself");
    println!("  3. Run 'prosecheck run' against the real editor");
    Ok(())
}

async fn cmd_run(options: RunOptions) -> Result<i32> {
    let mut config = load_config(options.config.as_deref())?;
    if let Some(url) = options.url {
        config.target_url = url;
    }
    if options.headed {
        config.browser.headless = false;
        if config.hold.after_run_secs == 0 {
            config.hold.after_run_secs = HEADED_INSPECTION_SECS;
        }
    }
    if let Some(ws) = options.connect {
        config.browser.debugger_url = Some(ws);
    }
    if options.no_hold || options.dry_run {
        config.hold = HoldConfig::none();
    }
    if options.dry_run {
        config.timing = TimingConfig::immediate();
    }

    let cases = select_cases(standard_suite(&config), &options.cases);
    if cases.is_empty() {
        anyhow::bail!("No cases match {:?}", options.cases);
    }

    let run_id = new_run_id();
    let store = ArtifactStore::new(&config.artifacts.dir, run_id.as_str());

    let session: Box<dyn Session> = if options.dry_run {
        info!("Dry run against the simulated editor");
        Box::new(MemorySession::new(MemoryPage::rich_text_editor(
            &config.editor.root_class,
        )))
    } else {
        Box::new(
            ChromeSession::open(&config.browser)
                .await
                .context("Failed to start browser session")?,
        )
    };

    let runner = ScenarioRunner::new(session.as_ref(), &store, &config).with_run_id(&run_id);
    let report = match runner.run(&cases).await {
        Ok(report) => report,
        Err(aborted) => {
            error!("{}", aborted);
            *aborted.report
        }
    };

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    save_report(&report, &store, options.report.as_deref()).await?;
    print_report(&report);
    Ok(report.exit_code())
}

async fn save_report(report: &RunReport, store: &ArtifactStore, extra: Option<&Path>) -> Result<()> {
    let json = serde_json::to_vec_pretty(report)?;
    match store.save("report", ArtifactKind::Report, &json).await {
        Ok(artifact) => info!(
            "Report saved to {}",
            artifact.absolute_path(store.base_dir()).display()
        ),
        Err(e) => warn!("Failed to store report: {}", e),
    }

    if let Some(path) = extra {
        report
            .save(path)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Run {}", report.run_id);
    println!("==========");
    for case in &report.cases {
        match &case.reason {
            Some(reason) => println!("  {:<28} {:<13} {}", case.name, case.verdict.to_string(), reason),
            None => println!("  {:<28} {}", case.name, case.verdict),
        }
    }
    println!();
    println!("{}", report.summary());
}

fn cmd_cases() -> Result<()> {
    let cases = standard_suite(&HarnessConfig::default());
    println!("{}", serde_json::to_string_pretty(&cases)?);
    Ok(())
}

async fn cmd_artifacts(run_id: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let base = &config.artifacts.dir;

    let Some(run_id) = run_id else {
        let runs = ArtifactStore::list_runs(base).await?;
        if runs.is_empty() {
            println!("No runs recorded under {}", base.display());
        }
        for run in runs {
            println!("{}", run);
        }
        return Ok(());
    };

    let store = ArtifactStore::new(base, run_id.as_str());
    let artifacts = store.list(&run_id).await?;
    if artifacts.is_empty() {
        println!("No artifacts for run {}", run_id);
    }
    for artifact in artifacts {
        println!(
            "{:<13} {:>9} B  {:<32} {}",
            artifact.kind.to_string(),
            artifact.size_bytes,
            artifact.label,
            artifact.absolute_path(store.base_dir()).display()
        );
    }
    Ok(())
}

async fn cmd_hook() -> Result<()> {
    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .context("Failed to read hook payload from stdin")?;

    let pipeline = prosecheck_hooks::default_pipeline();
    let output = pipeline
        .process_json(&payload)
        .await
        .context("Failed to parse hook payload")?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(output.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
