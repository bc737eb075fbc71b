use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::TextureLoadFailed;
use crate::events::{LoadTexture, TextureLoaded};
use crate::texture::{TextureSource, decode_texture};

/// Fetches and decodes textures.
/// - At most `max_in_flight` requests run at once; further requests wait in
///   the channel.
/// - Superseded requests are not cancelled; they finish and the viewer drops
///   the result by generation.
#[instrument(skip(load_rx, to_viewer, source, cancel))]
pub async fn run<S: TextureSource>(
    mut load_rx: Receiver<LoadTexture>,
    to_viewer: Sender<TextureLoaded>,
    source: Arc<S>,
    cancel: CancellationToken,
    max_in_flight: usize,
    max_dimension: u32,
) -> Result<()> {
    let mut tasks: JoinSet<TextureLoaded> = JoinSet::new();
    let mut requests_open = true;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            // Accept new load requests while under limit
            maybe_req = load_rx.recv(), if requests_open && tasks.len() < max_in_flight => {
                match maybe_req {
                    Some(req) => {
                        debug!(generation = req.generation, url = %req.url, "loading texture");
                        tasks.spawn(load_one(Arc::clone(&source), req, max_dimension));
                    }
                    None => requests_open = false,
                }
            }

            Some(join_res) = tasks.join_next() => {
                match join_res {
                    Ok(result) => {
                        if to_viewer.send(result).await.is_err() {
                            debug!("viewer channel closed; stopping loader");
                            break;
                        }
                    }
                    Err(err) => warn!("texture load task failed: {err}"),
                }
            }

            else => break,
        }
    }
    Ok(())
}

async fn load_one<S: TextureSource>(
    source: Arc<S>,
    req: LoadTexture,
    max_dimension: u32,
) -> TextureLoaded {
    let LoadTexture {
        generation,
        image,
        url,
    } = req;

    let bytes = match source.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return TextureLoaded::Failed {
                generation,
                error: TextureLoadFailed::new(image, format!("{err:#}")),
            };
        }
    };

    let failed_image = image.clone();
    let decoded =
        tokio::task::spawn_blocking(move || decode_texture(image, url, &bytes, max_dimension))
            .await;
    match decoded {
        Ok(Ok(texture)) => TextureLoaded::Ready {
            generation,
            texture,
        },
        Ok(Err(error)) => TextureLoaded::Failed { generation, error },
        Err(join_err) => TextureLoaded::Failed {
            generation,
            error: TextureLoadFailed::new(failed_image, join_err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::ImageRef;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::io::Cursor;
    use tokio::sync::mpsc;

    struct MapSource(HashMap<String, Vec<u8>>);

    impl TextureSource for MapSource {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("404 for {url}"))
        }
    }

    fn png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 1, image::Rgba([1, 2, 3, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn request(generation: u64, url: &str) -> LoadTexture {
        LoadTexture {
            generation,
            image: ImageRef::from(url),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn reports_ready_and_failed_with_generation() {
        let source = Arc::new(MapSource(HashMap::from([
            ("ok.png".to_string(), png()),
            ("bad.png".to_string(), b"nope".to_vec()),
        ])));
        let (load_tx, load_rx) = mpsc::channel(4);
        let (done_tx, mut done_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(load_rx, done_tx, source, cancel.clone(), 1, 64));

        load_tx.send(request(1, "ok.png")).await.unwrap();
        match done_rx.recv().await.unwrap() {
            TextureLoaded::Ready { generation, texture } => {
                assert_eq!(generation, 1);
                assert_eq!((texture.width, texture.height), (2, 1));
            }
            other => panic!("unexpected {other:?}"),
        }

        load_tx.send(request(2, "bad.png")).await.unwrap();
        let failed = done_rx.recv().await.unwrap();
        assert_eq!(failed.generation(), 2);
        assert!(matches!(failed, TextureLoaded::Failed { .. }));

        load_tx.send(request(3, "missing.png")).await.unwrap();
        match done_rx.recv().await.unwrap() {
            TextureLoaded::Failed { generation, error } => {
                assert_eq!(generation, 3);
                assert!(error.reason.contains("404"));
            }
            other => panic!("unexpected {other:?}"),
        }

        drop(load_tx);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn exits_on_cancel() {
        let source = Arc::new(MapSource(HashMap::new()));
        let (_load_tx, load_rx) = mpsc::channel(1);
        let (done_tx, _done_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(load_rx, done_tx, source, cancel.clone(), 2, 64));
        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
