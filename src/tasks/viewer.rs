use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{LoadTexture, TextureLoaded, ViewerCommand, ViewerUpdate};
use crate::viewer::{Applied, PanoramaViewer};

/// Owns the viewer state. Commands come from the UI, load results from the
/// loader; only results for the current selection reach `to_ui`.
///
/// The viewer never waits on the loader: the next load is parked in a single
/// slot and handed over once the loader has room. A newer selection replaces
/// whatever is parked, so the loader only ever sees the latest request.
pub async fn run(
    mut viewer: PanoramaViewer,
    mut commands: Receiver<ViewerCommand>,
    mut from_loader: Receiver<TextureLoaded>,
    to_loader: Sender<LoadTexture>,
    to_ui: Sender<ViewerUpdate>,
    cancel: CancellationToken,
) -> Result<()> {
    info!(rooms = viewer.rooms().len(), "viewer ready");
    let mut parked: Option<LoadTexture> = None;
    loop {
        select! {
            _ = cancel.cancelled() => break,

            permit = to_loader.reserve(), if parked.is_some() => {
                let Ok(permit) = permit else {
                    warn!("loader channel closed");
                    break;
                };
                if let Some(load) = parked.take() {
                    if load.generation == viewer.generation() {
                        permit.send(load);
                    } else {
                        debug!(generation = load.generation, "dropping superseded load request");
                    }
                }
            }

            maybe_cmd = commands.recv() => {
                let Some(cmd) = maybe_cmd else {
                    debug!("command channel closed; closing viewer");
                    break;
                };
                let load = match cmd {
                    ViewerCommand::SelectRoom(room) => viewer.select_room(&room),
                    ViewerCommand::SelectImage(image) => viewer.select_image(&image).map(Some),
                    ViewerCommand::SelectView(index) => viewer.select_view(index).map(Some),
                    ViewerCommand::Close => {
                        viewer.close();
                        parked = None;
                        let _ = to_ui.send(ViewerUpdate::Cleared).await;
                        continue;
                    }
                };
                match load {
                    Ok(load) => {
                        if let Some(room) = viewer.selected_room() {
                            let _ = to_ui
                                .send(ViewerUpdate::Selection {
                                    room: room.clone(),
                                    image: viewer.selected_image().cloned(),
                                })
                                .await;
                        }
                        if let Some(load) = load {
                            if let Some(old) = parked.replace(load) {
                                debug!(generation = old.generation, "superseded before dispatch");
                            }
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "selection rejected");
                        let _ = to_ui.send(ViewerUpdate::Rejected(err)).await;
                    }
                }
            }

            Some(result) = from_loader.recv() => {
                match result {
                    TextureLoaded::Ready { generation, texture } => {
                        if viewer.apply_loaded(generation, texture) == Applied::Installed {
                            if let Some(texture) = viewer.loaded_texture() {
                                let _ = to_ui.send(ViewerUpdate::TextureReady(Arc::clone(texture))).await;
                            }
                        }
                    }
                    TextureLoaded::Failed { generation, error } => {
                        if viewer.apply_failed(generation, error.clone()) == Applied::Failed {
                            let _ = to_ui.send(ViewerUpdate::TextureFailed(error)).await;
                        }
                    }
                }
            }
        }
    }
    viewer.close();
    Ok(())
}
