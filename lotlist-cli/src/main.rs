//! lotlist CLI - auction manifest item reports

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output

mod menu;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use lotlist_core::config::{self, ResolvedConfig};
use lotlist_core::convert::CloudConvert;
use lotlist_core::{fetch, sink};
use lotlist_core::{render_html, render_json, render_text, Layout, Report};
use menu::MenuAction;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lotlist")]
#[command(about = "Aggregate liquidation-auction manifests into ranked item reports")]
#[command(version = env!("LOTLIST_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Defaults to the interactive menu
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, convert and report an auction manifest
    Fetch {
        /// Auction identifier
        auction_id: String,

        #[command(flatten)]
        report: ReportArgs,
    },
    /// Report a manifest CSV already on disk
    Render {
        /// Path to the manifest CSV
        path: PathBuf,

        /// Auction id used to name the report (default: from the rows, then the file name)
        #[arg(long)]
        auction_id: Option<String>,

        #[command(flatten)]
        report: ReportArgs,
    },
    /// Interactive menu
    Menu {
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Args, Clone, Default)]
struct ReportArgs {
    /// Output format
    #[arg(long, default_value = "html")]
    format: OutputFormat,

    /// Output file path for HTML (default: derived from the auction id)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Item table column order (overrides config file)
    #[arg(long)]
    layout: Option<LayoutArg>,

    /// Do not open the HTML report in a browser
    #[arg(long)]
    no_open: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Html,
    Text,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LayoutArg {
    Classic,
    Compact,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Classic => Layout::Classic,
            LayoutArg::Compact => Layout::Compact,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Menu {
        report: ReportArgs::default(),
    });

    match command {
        Commands::Config { action } => handle_config(action)?,
        Commands::Fetch { auction_id, report } => {
            let config = load_config(cli.config.as_deref())?;
            run_fetch(&config, &auction_id, &report)?;
        }
        Commands::Render {
            path,
            auction_id,
            report,
        } => {
            let config = load_config(cli.config.as_deref())?;
            run_render(&config, &path, auction_id.as_deref(), &report)?;
        }
        Commands::Menu { report } => {
            let config = load_config(cli.config.as_deref())?;
            let stdin = std::io::stdin();
            menu::run_menu(stdin.lock(), std::io::stdout(), |action| match action {
                MenuAction::Fetch(id) => run_fetch(&config, &id, &report),
                MenuAction::Render(path) => run_render(&config, &path, None, &report),
            })?;
        }
    }

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let project_root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;
    if let Some(path) = &resolved.config_path {
        tracing::info!(path = %path.display(), "using config");
    }
    Ok(resolved)
}

/// Download an auction's manifest, convert it to CSV and report it
fn run_fetch(config: &ResolvedConfig, auction_id: &str, args: &ReportArgs) -> anyhow::Result<()> {
    let client = fetch::http_client()?;
    // Fail on a missing API key before downloading anything
    let converter = CloudConvert::new(client.clone(), &config.cloudconvert)?;

    let xls_path = sink::download_path(
        config.output_naming,
        &config.output_directory,
        auction_id,
    );
    fetch::download_manifest(&client, &config.manifest_url, auction_id, &xls_path)?;
    tracing::info!(path = %xls_path.display(), "manifest downloaded");

    let csv_path = convert_with_spinner(&converter, &xls_path)?;
    run_render(config, &csv_path, Some(auction_id), args)
}

fn convert_with_spinner(converter: &CloudConvert, xls_path: &Path) -> anyhow::Result<PathBuf> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").context("invalid progress template")?,
    );
    spinner.set_message("Converting manifest");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = converter.convert_xls_to_csv(xls_path, &mut |status| {
        spinner.set_message(format!("Converting manifest ({})", status));
    });
    spinner.finish_and_clear();

    result.context("failed to convert manifest to CSV")
}

/// Report a manifest CSV
fn run_render(
    config: &ResolvedConfig,
    path: &Path,
    auction_id: Option<&str>,
    args: &ReportArgs,
) -> anyhow::Result<()> {
    let (manifest, report) = lotlist_core::report_from_file(path, &config.columns)
        .with_context(|| format!("failed to process manifest {}", path.display()))?;
    let auction_id = sink::resolve_auction_id(auction_id, &manifest, path);
    emit(config, &report, &auction_id, args)
}

fn emit(
    config: &ResolvedConfig,
    report: &Report,
    auction_id: &str,
    args: &ReportArgs,
) -> anyhow::Result<()> {
    match args.format {
        OutputFormat::Text => {
            print!("{}", render_text(report));
        }
        OutputFormat::Json => {
            println!("{}", render_json(report, &config.links));
        }
        OutputFormat::Html => {
            let mut options = config.render_options();
            if let Some(layout) = args.layout {
                options.layout = layout.into();
            }
            let html = render_html(report, &options);

            let output_path = args.output.clone().unwrap_or_else(|| {
                sink::report_path(config.output_naming, &config.output_directory, auction_id)
            });
            sink::write_report(&output_path, &html)?;
            println!("HTML file '{}' has been generated.", output_path.display());

            if config.open_browser && !args.no_open {
                if let Err(e) = sink::open_in_browser(&output_path) {
                    tracing::warn!("could not open report in a browser: {:#}", e);
                }
            }
        }
    }
    Ok(())
}

fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate { path } => {
            let project_root = std::env::current_dir()?;
            match config::load_and_resolve(&project_root, path.as_deref()) {
                Ok(config) => {
                    if let Some(ref p) = config.config_path {
                        println!("Config valid: {}", p.display());
                    } else {
                        println!("No config file found. Using defaults.");
                    }
                }
                Err(e) => {
                    eprintln!("Config validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Show { path } => {
            let project_root = std::env::current_dir()?;
            let resolved = config::load_and_resolve(&project_root, path.as_deref())
                .context("failed to load configuration")?;

            println!("Configuration:");
            if let Some(ref p) = resolved.config_path {
                println!("  Source: {}", p.display());
            } else {
                println!("  Source: defaults (no config file found)");
            }
            println!();
            println!("Columns:");
            println!("  title: {}", resolved.columns.title);
            println!("  sku: {}", resolved.columns.sku);
            println!("  manufacturer: {}", resolved.columns.manufacturer);
            println!("  auction_id: {}", resolved.columns.auction_id);
            println!();
            println!("Report:");
            println!("  layout: {}", resolved.layout.as_str());
            println!("  heading: {}", resolved.heading);
            println!("  image_width: {}", resolved.image_width);
            println!("  product_base_url: {}", resolved.links.product_base_url);
            println!("  image_base_url: {}", resolved.links.image_base_url);
            println!();
            println!("Output:");
            println!("  naming: {}", resolved.output_naming.as_str());
            println!("  directory: {}", resolved.output_directory.display());
            println!("  open_browser: {}", resolved.open_browser);
            println!();
            println!("Download:");
            println!("  manifest_url: {}", resolved.manifest_url);
            println!("  cloudconvert.api_url: {}", resolved.cloudconvert.api_url);
            println!(
                "  cloudconvert.api_key: {}",
                if resolved.cloudconvert.api_key.is_some() {
                    "set"
                } else {
                    "not set"
                }
            );
            println!(
                "  cloudconvert.poll_interval_ms: {}",
                resolved.cloudconvert.poll_interval.as_millis()
            );
            println!(
                "  cloudconvert.timeout_secs: {}",
                resolved.cloudconvert.timeout.as_secs()
            );
        }
    }
    Ok(())
}
