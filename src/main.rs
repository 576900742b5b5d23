use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use chemviz::config::{parse_endpoint, ServiceConfig};
use chemviz::prefs::settings::JsonFileBackend;
use chemviz::{Dashboard, HttpAnalysisClient, Preferences, SelectedFile, SessionStatus, Theme};

#[derive(Parser)]
#[command(name = "chemviz", version, about = "Equipment dataset dashboard client")]
struct Cli {
    /// Analysis service upload URL (overrides CHEMVIZ_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Directory holding saved preferences (overrides CHEMVIZ_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a dataset and print the dashboard snapshot as JSON
    Analyze(AnalyzeArgs),
    /// Show or change display preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Args)]
struct AnalyzeArgs {
    file: PathBuf,
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(Subcommand)]
enum PrefsCommand {
    Show,
    Set(SetPrefsArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

#[derive(Args)]
struct SetPrefsArgs {
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,
    /// Zoom percent; clamped to 80-150 in steps of 10
    #[arg(long)]
    zoom: Option<u16>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.endpoint = parse_endpoint(url)?;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{out}");
    Ok(())
}

async fn analyze(config: &ServiceConfig, args: &AnalyzeArgs) -> Result<()> {
    let client = HttpAnalysisClient::from_config(config)?;
    let dashboard = Dashboard::new(client, JsonFileBackend::new(config.preferences_path()));
    let file = SelectedFile::from_path(&args.file).await?;
    if file.is_empty() {
        tracing::warn!(file = file.name(), "selected dataset is empty");
    }
    dashboard.select_file(Some(file));
    let status = dashboard.submit().await?;

    let snapshot = dashboard.snapshot();
    print_json(&snapshot, args.compact)?;
    if status == SessionStatus::Failed {
        bail!(snapshot
            .error
            .unwrap_or_else(|| "analysis failed".to_string()));
    }
    Ok(())
}

fn prefs(config: &ServiceConfig, command: &PrefsCommand) -> Result<()> {
    let backend = JsonFileBackend::new(config.preferences_path());
    let path = backend.path().to_path_buf();
    let store = chemviz::prefs::settings::PreferenceStore::new(backend);
    match command {
        PrefsCommand::Show => {
            let prefs = store.load();
            print_json(
                &serde_json::json!({
                    "path": path.display().to_string(),
                    "preferences": prefs,
                    "display": chemviz::prefs::settings::DisplaySettings::from(prefs),
                }),
                false,
            )
        }
        PrefsCommand::Set(args) => {
            let mut next: Preferences = store.load();
            if let Some(theme) = args.theme {
                next = next.with_theme(match theme {
                    ThemeArg::Light => Theme::Light,
                    ThemeArg::Dark => Theme::Dark,
                });
            }
            if let Some(zoom) = args.zoom {
                next = next.with_zoom(f64::from(zoom));
            }
            store
                .save(&next)
                .with_context(|| format!("saving {}", path.display()))?;
            print_json(&next, false)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    match &cli.command {
        Command::Analyze(args) => analyze(&config, args).await,
        Command::Prefs(command) => prefs(&config, command),
    }
}
