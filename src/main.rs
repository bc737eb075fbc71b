//! Binary entrypoint for panorama-tour.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use panorama_tour::config::Configuration;
use panorama_tour::events::{ViewerCommand, ViewerUpdate};
use panorama_tour::property::PropertyClient;
use panorama_tour::rooms::{RoomKey, RoomMap};
use panorama_tour::session::ViewerSession;
use panorama_tour::texture::HttpTextureSource;

#[derive(Debug, Parser)]
#[command(name = "panorama-tour", version, about = "Panoramic room viewer for property listings")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the rooms of a property and the number of views in each
    Rooms {
        #[arg(value_name = "PROPERTY_ID")]
        id: String,
    },
    /// Load one view of a room and write the decoded texture to disk
    View {
        #[arg(value_name = "PROPERTY_ID")]
        id: String,
        #[arg(value_name = "ROOM")]
        room: String,
        /// One-based view number within the room
        #[arg(long, value_name = "N", default_value_t = 1)]
        view: usize,
        /// Output image path (format chosen by extension)
        #[arg(short, long, value_name = "PATH", default_value = "panorama.png")]
        output: PathBuf,
    },
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("panorama_tour={level}").parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("validating configuration")?;

    let client = PropertyClient::new(&cfg)?;
    match cli.command {
        Command::Rooms { id } => {
            let rooms = load_rooms(&client, &id).await?;
            for summary in rooms.summaries() {
                println!("{}\t{}", summary.key, summary.image_count);
            }
        }
        Command::View {
            id,
            room,
            view,
            output,
        } => {
            if view == 0 {
                bail!("--view is one-based");
            }
            let rooms = load_rooms(&client, &id).await?;
            let source = Arc::new(HttpTextureSource::new(cfg.request_timeout)?);
            let mut session = ViewerSession::start(&cfg, rooms, source);
            // Ctrl-C cancels the pipeline
            let result = tokio::select! {
                res = show_view(&mut session, RoomKey::new(room), view - 1, &output) => res,
                res = tokio::signal::ctrl_c() => {
                    res.context("listening for ctrl-c")?;
                    info!("ctrl-c received; shutting down viewer");
                    Err(anyhow!("interrupted before the texture was written"))
                }
            };
            session.shutdown().await?;
            result?;
        }
    }
    Ok(())
}

async fn load_rooms(
    client: &PropertyClient,
    id: &str,
) -> Result<RoomMap> {
    client
        .load_panorama(id)
        .await
        .into_result()
        .with_context(|| format!("property {id}"))
}

async fn show_view(
    session: &mut ViewerSession,
    room: RoomKey,
    index: usize,
    output: &Path,
) -> Result<()> {
    session.send(ViewerCommand::SelectRoom(room)).await?;
    if index > 0 {
        session.send(ViewerCommand::SelectView(index)).await?;
    }

    // Updates for the first view may arrive before the requested one; the
    // viewer only forwards textures for its latest selection.
    let mut pending = if index > 0 { 2 } else { 1 };
    while let Some(update) = session.next_update().await {
        match update {
            ViewerUpdate::Selection { room, image } => {
                pending -= 1;
                info!(%room, image = ?image.as_ref().map(|i| i.as_str()), "selected");
            }
            ViewerUpdate::TextureReady(texture) if pending == 0 => {
                let rgba = (*texture)
                    .clone()
                    .into_rgba8()
                    .ok_or_else(|| anyhow!("texture buffer has the wrong size"))?;
                rgba.save(output)
                    .with_context(|| format!("writing {}", output.display()))?;
                println!(
                    "{} {}x{} -> {}",
                    texture.image,
                    texture.width,
                    texture.height,
                    output.display()
                );
                return Ok(());
            }
            ViewerUpdate::TextureReady(_) => {}
            ViewerUpdate::TextureFailed(err) if pending == 0 => return Err(err.into()),
            ViewerUpdate::TextureFailed(_) => {}
            ViewerUpdate::Rejected(err) => return Err(err.into()),
            ViewerUpdate::Cleared => break,
        }
    }
    bail!("viewer stopped before a texture was loaded")
}
