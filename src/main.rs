#![forbid(unsafe_code)]

mod color;
mod config;
mod constants;
mod display;
mod gui;
mod ipc;
mod media;
mod note;
mod projector;
mod protocol;
mod vault;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, OnceLock};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use config::{SessionHistory, Settings};
use gui::PopoutChannels;
use ipc::{ControlClient, ControlRequest, ControlResponse, ControlServer};
use note::{CommonMarkRenderer, split_sections};
use projector::{ChannelTransport, Projector};
use protocol::SettingsUpdate;
use vault::{FileHandle, FileLookup, FsVault};

#[derive(Parser, Debug)]
#[command(
    name = "vtt-card-display",
    version,
    about = "Project cards, maps and notes from a markdown vault onto a second screen"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the projection window and serve control requests
    Popout {
        /// Vault directory (overrides config and VTT_VAULT)
        #[arg(long)]
        vault: Option<PathBuf>,
    },
    /// Show the card at INDEX, or re-send the current card
    Card { index: Option<usize> },
    /// Next card
    Next,
    /// Previous card
    Prev,
    /// Project any vault image or video
    Media { path: String },
    /// Project a note, keeping DM sections hidden
    Note { path: String },
    /// Project a map by vault path or name
    Map { path: String },
    /// Project a registered item
    Item { id: String },
    /// Project favorite INDEX, or list favorites when no index is given
    Favorite { index: Option<usize> },
    /// Change overlay settings
    Settings(SettingsArgs),
    /// Re-read config and rescan the vault
    Reload,
    /// Export session history into the vault
    History,
    /// Check the popout is running
    Ping,
    /// Close the popout
    Quit,
    /// Print a note's image and player sections (offline)
    Split {
        note: PathBuf,
        /// Keep the player section
        #[arg(long)]
        player_info: bool,
    },
    /// Print the projection HTML for a note (offline)
    Render {
        note: PathBuf,
        /// Vault the note lives in; defaults to the note's folder
        #[arg(long)]
        vault: Option<PathBuf>,
        /// Keep the player section
        #[arg(long)]
        player_info: bool,
    },
}

#[derive(Args, Debug)]
struct SettingsArgs {
    #[arg(long)]
    grid_size: Option<u32>,
    #[arg(long)]
    grid_color: Option<String>,
    #[arg(long)]
    grid_opacity: Option<f32>,
    #[arg(long)]
    fog_reveal_size: Option<u32>,
    #[arg(long)]
    show_player_info: Option<bool>,
}

impl From<SettingsArgs> for SettingsUpdate {
    fn from(args: SettingsArgs) -> Self {
        SettingsUpdate {
            grid_size: args.grid_size,
            grid_color: args.grid_color,
            grid_opacity: args.grid_opacity,
            fog_reveal_size: args.fog_reveal_size,
            show_player_info: args.show_player_info,
        }
    }
}

fn parse_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// LOG_LEVEL wins, then the config file's log_level, then info
fn init_logging() -> Result<()> {
    let level = std::env::var("LOG_LEVEL").ok().or_else(|| {
        fs::read_to_string(Settings::config_path())
            .ok()
            .and_then(|raw| toml::from_str::<Settings>(&raw).ok())
            .and_then(|settings| settings.log_level)
    });
    let log_level = parse_level(level.as_deref().unwrap_or("info"));

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run_popout(vault_override: Option<PathBuf>) -> Result<()> {
    let settings = Settings::load();
    let root = vault_override
        .or_else(|| settings.vault_root.clone())
        .context("No vault configured: pass --vault, set VTT_VAULT or vault_root in the config")?;
    let vault = FsVault::open(&root)?;

    let context: Arc<OnceLock<eframe::egui::Context>> = Arc::new(OnceLock::new());
    let (popout_tx, popout_rx) = mpsc::channel();
    let waker_context = Arc::clone(&context);
    let transport = ChannelTransport::new(popout_tx).with_waker(move || {
        if let Some(ctx) = waker_context.get() {
            ctx.request_repaint();
        }
    });

    let history_path = SessionHistory::default_path();
    let projector = Projector::new(vault, CommonMarkRenderer, transport, settings.clone())
        .with_settings_path(Settings::config_path())
        .with_history(SessionHistory::load_from(&history_path), Some(history_path))
        .with_history_export_dir(root.clone());

    let (events_tx, events_rx) = mpsc::channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let _projector_handle = projector::spawn_projector(projector, events_rx, shutdown_tx);

    let server = ControlServer::bind()?;
    let socket_path = server.path().to_path_buf();
    let _ipc_handle = ipc::spawn_ipc_listener(server, events_tx.clone());
    info!(vault = %root.display(), socket = %socket_path.display(), "Popout starting");

    let result = gui::run_popout(
        settings,
        PopoutChannels {
            inbound: popout_rx,
            projector: events_tx,
            shutdown: shutdown_rx,
            context,
        },
    );

    // The listener thread is parked in accept(); clean up on its behalf
    let _ = fs::remove_file(&socket_path);
    result
}

fn send(request: ControlRequest) -> Result<()> {
    let mut client = ControlClient::connect()?;
    match client.request(request)? {
        ControlResponse::Ready => Ok(()),
        ControlResponse::Pong => {
            println!("popout is running");
            Ok(())
        }
        ControlResponse::Exported(path) => {
            println!("{}", path.display());
            Ok(())
        }
        ControlResponse::Error(msg) => bail!(msg),
    }
}

fn list_favorites() -> Result<()> {
    let settings = Settings::load();
    if settings.favorites.is_empty() {
        println!("No favorites configured in {}", Settings::config_path().display());
    }
    for (index, path) in settings.favorites.iter().enumerate() {
        println!("{index}: {path}");
    }
    Ok(())
}

fn split_note(path: &Path, player_info: bool) -> Result<()> {
    let raw = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let sections = split_sections(&raw, player_info);
    println!("{}", sections.image_content);
    if player_info {
        println!("---");
        println!("{}", sections.player_info_content);
    }
    Ok(())
}

fn render_note(path: &Path, vault_root: Option<PathBuf>, player_info: bool) -> Result<()> {
    let root = match vault_root {
        Some(root) => root,
        None => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let vault = FsVault::open(&root)?;

    let absolute = path.canonicalize().context(format!("Failed to resolve {}", path.display()))?;
    let root_abs = root.canonicalize().context(format!("Failed to resolve {}", root.display()))?;
    let relative = absolute
        .strip_prefix(&root_abs)
        .context(format!("{} is not inside the vault {}", path.display(), root.display()))?;
    let handle = vault
        .find_by_exact_path(&relative.to_string_lossy())
        .unwrap_or_else(|| FileHandle::new(&relative.to_string_lossy()));

    let projection = note::prepare_note(&vault, &CommonMarkRenderer, &handle, player_info)?;
    println!("{}", projection.html);
    if !projection.player_info.is_empty() {
        println!("<!-- player info -->");
        println!("{}", projection.player_info);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    match cli.command {
        Commands::Popout { vault } => run_popout(vault),
        Commands::Card { index } => send(ControlRequest::ShowCard { index }),
        Commands::Next => send(ControlRequest::Next),
        Commands::Prev => send(ControlRequest::Prev),
        Commands::Media { path } => send(ControlRequest::ShowMedia { path }),
        Commands::Note { path } => send(ControlRequest::ShowNote { path }),
        Commands::Map { path } => send(ControlRequest::ShowMap { path }),
        Commands::Item { id } => send(ControlRequest::ShowItem { id }),
        Commands::Favorite { index: Some(index) } => send(ControlRequest::ShowFavorite { index }),
        Commands::Favorite { index: None } => list_favorites(),
        Commands::Settings(args) => send(ControlRequest::ApplySettings(args.into())),
        Commands::Reload => send(ControlRequest::Reload),
        Commands::History => send(ControlRequest::ExportHistory),
        Commands::Ping => send(ControlRequest::Ping),
        Commands::Quit => send(ControlRequest::Shutdown),
        Commands::Split { note, player_info } => split_note(&note, player_info),
        Commands::Render {
            note,
            vault,
            player_info,
        } => render_note(&note, vault, player_info),
    }
}
