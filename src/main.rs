use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use passtray::app::PassTrayApp;
use passtray::config::Settings;
use passtray::navigation::NavigationState;
use passtray::retriever::SecretCommand;
use passtray::store::{PasswordStore, StoreLocation};
use passtray::ui_model::entry_label;

#[derive(Parser, Debug)]
#[command(name = "passtray")]
#[command(about = "Browse a password store and copy secrets to the clipboard")]
struct Args {
    #[arg(default_value = "")]
    query: String,
    #[arg(long)]
    store: Option<PathBuf>,
    #[arg(long, default_value = "/")]
    dir: String,
    #[arg(long)]
    command: Option<String>,
    #[arg(long)]
    threshold: Option<usize>,
    #[arg(long, default_value_t = false)]
    cli: bool,
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_navigation(args: &Args, settings: &Settings) -> Result<NavigationState> {
    let root = args
        .store
        .clone()
        .unwrap_or_else(|| settings.resolve_store_dir());
    let store = PasswordStore::open(&root)?;
    let threshold = args.threshold.unwrap_or(settings.match_threshold);
    let mut navigation = NavigationState::new(store).with_match_threshold(threshold);

    let location = StoreLocation::parse(&args.dir)
        .with_context(|| format!("invalid directory {}", args.dir))?;
    navigation
        .navigate_to(location)
        .with_context(|| format!("invalid directory {}", args.dir))?;
    Ok(navigation)
}

fn run_cli(args: &Args, settings: &Settings) -> Result<()> {
    let navigation = open_navigation(args, settings)?;
    for entry in navigation.current_entries(&args.query) {
        println!("{}", entry_label(&entry));
    }
    Ok(())
}

fn run_gui(args: &Args, settings: &Settings) -> Result<()> {
    let navigation = open_navigation(args, settings)?;
    let command = SecretCommand::new(
        args.command
            .clone()
            .unwrap_or_else(|| settings.pass_command.clone()),
    )
    .with_args(settings.pass_args.iter());
    let query = args.query.clone();

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = eframe::egui::ViewportBuilder::default()
        .with_inner_size(eframe::egui::vec2(420.0, 560.0))
        .with_always_on_top();

    eframe::run_native(
        "passtray",
        native_options,
        Box::new(move |_cc| Ok(Box::new(PassTrayApp::new(navigation, command, query)))),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    let settings = Settings::load();
    if args.cli {
        run_cli(&args, &settings)
    } else {
        run_gui(&args, &settings)
    }
}
