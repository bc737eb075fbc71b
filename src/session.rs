use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Configuration;
use crate::events::{LoadTexture, TextureLoaded, ViewerCommand, ViewerUpdate};
use crate::rooms::RoomMap;
use crate::tasks::{loader, viewer};
use crate::texture::TextureSource;
use crate::viewer::PanoramaViewer;

/// Running viewer + loader pair for one property.
pub struct ViewerSession {
    commands: Sender<ViewerCommand>,
    updates: Receiver<ViewerUpdate>,
    cancel: CancellationToken,
    tasks: JoinSet<Result<()>>,
}

impl ViewerSession {
    pub fn start<S: TextureSource>(cfg: &Configuration, rooms: RoomMap, source: Arc<S>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<ViewerCommand>(cfg.command_queue); // UI -> Viewer
        let (load_tx, load_rx) = mpsc::channel::<LoadTexture>(cfg.loader_max_in_flight); // Viewer -> Loader
        let (loaded_tx, loaded_rx) = mpsc::channel::<TextureLoaded>(cfg.loader_max_in_flight); // Loader -> Viewer
        let (update_tx, update_rx) = mpsc::channel::<ViewerUpdate>(cfg.command_queue); // Viewer -> UI

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        tasks.spawn(loader::run(
            load_rx,
            loaded_tx,
            source,
            cancel.clone(),
            cfg.loader_max_in_flight,
            cfg.max_texture_dimension,
        ));
        tasks.spawn(viewer::run(
            PanoramaViewer::new(rooms, cfg.image_base_url()),
            cmd_rx,
            loaded_rx,
            load_tx,
            update_tx,
            cancel.clone(),
        ));

        Self {
            commands: cmd_tx,
            updates: update_rx,
            cancel,
            tasks,
        }
    }

    pub async fn send(&self, cmd: ViewerCommand) -> Result<()> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| anyhow!("viewer task has stopped"))
    }

    /// Next update for the presentation layer; `None` once the viewer stopped.
    pub async fn next_update(&mut self) -> Option<ViewerUpdate> {
        self.updates.recv().await
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("viewer task failed: {err:#}"),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}
