pub mod config;
pub mod error;
pub mod events;
pub mod property;
pub mod rooms;
pub mod session;
pub mod texture;
pub mod viewer;
pub mod tasks {
    pub mod loader;
    pub mod viewer;
}

pub use error::{PanoramaError, SelectionError, TextureLoadFailed};
pub use rooms::{ImageRef, RoomKey, RoomMap, group_by_room};
