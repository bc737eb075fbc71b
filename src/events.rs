use std::sync::Arc;

use crate::error::TextureLoadFailed;
use crate::rooms::{ImageRef, RoomKey};
use crate::texture::Texture;

/// Viewer -> Loader: fetch and decode one image. `generation` identifies the
/// selection that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTexture {
    pub generation: u64,
    pub image: ImageRef,
    pub url: String,
}

/// Loader -> Viewer.
#[derive(Debug)]
pub enum TextureLoaded {
    Ready { generation: u64, texture: Texture },
    Failed {
        generation: u64,
        error: TextureLoadFailed,
    },
}

impl TextureLoaded {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Ready { generation, .. } | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// External -> Viewer: user selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    SelectRoom(RoomKey),
    SelectImage(ImageRef),
    /// Zero-based view within the selected room.
    SelectView(usize),
    Close,
}

/// Viewer -> presentation layer.
#[derive(Debug, Clone)]
pub enum ViewerUpdate {
    Selection {
        room: RoomKey,
        image: Option<ImageRef>,
    },
    TextureReady(Arc<Texture>),
    TextureFailed(TextureLoadFailed),
    Rejected(crate::error::SelectionError),
    Cleared,
}
