use thiserror::Error;

use crate::rooms::{ImageRef, RoomKey};

/// Failures reported to the presentation layer. None of these escape a task;
/// they travel as values inside `PanoramaStatus` and `ViewerUpdate`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PanoramaError {
    /// The property record carries no panoramic images.
    #[error("no panoramic images available for this property")]
    NoData,

    /// The property record could not be fetched or decoded. Retryable.
    #[error("failed to fetch property record: {0}")]
    FetchFailed(String),

    /// The property record has not been fetched yet.
    #[error("panoramic images are still loading")]
    NotLoaded,

    /// A single image failed to load; the rest of the tour is unaffected.
    #[error(transparent)]
    TextureLoadFailed(#[from] TextureLoadFailed),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to load texture for {image}: {reason}")]
pub struct TextureLoadFailed {
    pub image: ImageRef,
    pub reason: String,
}

impl TextureLoadFailed {
    pub fn new(image: ImageRef, reason: impl ToString) -> Self {
        Self {
            image,
            reason: reason.to_string(),
        }
    }
}

/// Caller errors from the viewer state machine. Rejected selections leave
/// the state untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown room: {0}")]
    UnknownRoom(RoomKey),

    #[error("no room is selected")]
    NoRoomSelected,

    #[error("image {image} is not part of room {room}")]
    ImageNotInRoom { room: RoomKey, image: ImageRef },

    #[error("room {room} has no view #{index}")]
    ViewOutOfRange { room: RoomKey, index: usize },
}
