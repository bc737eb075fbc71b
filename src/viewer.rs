//! Selection state of the panoramic viewer.
//!
//! Every selection bumps a generation counter and yields a `LoadTexture`
//! tagged with it. Load results are only applied when their generation is
//! still current, so a slow load for an earlier selection can never replace
//! the texture of a newer one.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{SelectionError, TextureLoadFailed};
use crate::events::LoadTexture;
use crate::rooms::{ImageRef, RoomKey, RoomMap};
use crate::texture::{Texture, resolve_image_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Idle,
    RoomSelected,
    ImageSelected,
}

/// What happened to a load result handed to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Installed,
    Failed,
    Stale,
}

pub struct PanoramaViewer {
    rooms: RoomMap,
    image_base_url: String,
    selected_room: Option<RoomKey>,
    selected_image: Option<ImageRef>,
    loaded_texture: Option<Arc<Texture>>,
    last_error: Option<TextureLoadFailed>,
    generation: u64,
}

impl PanoramaViewer {
    pub fn new(rooms: RoomMap, image_base_url: impl Into<String>) -> Self {
        Self {
            rooms,
            image_base_url: image_base_url.into(),
            selected_room: None,
            selected_image: None,
            loaded_texture: None,
            last_error: None,
            generation: 0,
        }
    }

    pub fn rooms(&self) -> &RoomMap {
        &self.rooms
    }

    pub fn selected_room(&self) -> Option<&RoomKey> {
        self.selected_room.as_ref()
    }

    pub fn selected_image(&self) -> Option<&ImageRef> {
        self.selected_image.as_ref()
    }

    pub fn loaded_texture(&self) -> Option<&Arc<Texture>> {
        self.loaded_texture.as_ref()
    }

    pub fn last_error(&self) -> Option<&TextureLoadFailed> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> ViewerPhase {
        match (&self.selected_room, &self.selected_image) {
            (None, _) => ViewerPhase::Idle,
            (Some(_), None) => ViewerPhase::RoomSelected,
            (Some(_), Some(_)) => ViewerPhase::ImageSelected,
        }
    }

    /// Selects `room` and its first image. Returns the load to dispatch, or
    /// `None` when the room has no images.
    pub fn select_room(&mut self, room: &RoomKey) -> Result<Option<LoadTexture>, SelectionError> {
        let images = self
            .rooms
            .get(room)
            .ok_or_else(|| SelectionError::UnknownRoom(room.clone()))?;
        let first = images.first().cloned();
        info!(room = %room, views = images.len(), "room selected");

        self.selected_room = Some(room.clone());
        match first {
            Some(image) => Ok(Some(self.begin_load(image))),
            None => {
                self.selected_image = None;
                self.release_texture();
                self.generation += 1;
                Ok(None)
            }
        }
    }

    /// Selects an image of the current room.
    pub fn select_image(&mut self, image: &ImageRef) -> Result<LoadTexture, SelectionError> {
        let room = self
            .selected_room
            .as_ref()
            .ok_or(SelectionError::NoRoomSelected)?;
        if !self.rooms.contains_image(room, image) {
            return Err(SelectionError::ImageNotInRoom {
                room: room.clone(),
                image: image.clone(),
            });
        }
        Ok(self.begin_load(image.clone()))
    }

    /// Selects the `index`-th (zero-based) view of the current room.
    pub fn select_view(&mut self, index: usize) -> Result<LoadTexture, SelectionError> {
        let room = self
            .selected_room
            .as_ref()
            .ok_or(SelectionError::NoRoomSelected)?;
        let image = self
            .rooms
            .image_at(room, index)
            .cloned()
            .ok_or_else(|| SelectionError::ViewOutOfRange {
                room: room.clone(),
                index,
            })?;
        Ok(self.begin_load(image))
    }

    /// Back to `Idle`. Outstanding loads become stale.
    pub fn close(&mut self) {
        self.selected_room = None;
        self.selected_image = None;
        self.last_error = None;
        self.release_texture();
        self.generation += 1;
        info!("viewer closed");
    }

    pub fn apply_loaded(&mut self, generation: u64, texture: Texture) -> Applied {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                image = %texture.image,
                "dropping stale texture"
            );
            return Applied::Stale;
        }
        self.release_texture();
        debug!(image = %texture.image, width = texture.width, height = texture.height, "texture installed");
        self.last_error = None;
        self.loaded_texture = Some(Arc::new(texture));
        Applied::Installed
    }

    pub fn apply_failed(&mut self, generation: u64, error: TextureLoadFailed) -> Applied {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale load failure");
            return Applied::Stale;
        }
        warn!(image = %error.image, reason = %error.reason, "texture load failed");
        self.release_texture();
        self.last_error = Some(error);
        Applied::Failed
    }

    fn begin_load(&mut self, image: ImageRef) -> LoadTexture {
        self.generation += 1;
        self.last_error = None;
        let url = resolve_image_url(&self.image_base_url, &image);
        debug!(generation = self.generation, image = %image, %url, "requesting texture");
        self.selected_image = Some(image.clone());
        LoadTexture {
            generation: self.generation,
            image,
            url,
        }
    }

    fn release_texture(&mut self) {
        if let Some(texture) = self.loaded_texture.take() {
            debug!(image = %texture.image, "releasing texture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::group_by_room;

    fn viewer() -> PanoramaViewer {
        let rooms = group_by_room(["p/room1a.jpg", "p/room1b.jpg", "p/room2.jpg", "p/hall.jpg"]);
        PanoramaViewer::new(rooms, "http://img.test/")
    }

    fn texture_for(load: &LoadTexture) -> Texture {
        Texture {
            image: load.image.clone(),
            url: load.url.clone(),
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0, 255],
        }
    }

    #[test]
    fn starts_idle() {
        let v = viewer();
        assert_eq!(v.phase(), ViewerPhase::Idle);
        assert!(v.selected_room().is_none());
        assert!(v.selected_image().is_none());
        assert!(v.loaded_texture().is_none());
    }

    #[test]
    fn selecting_room_picks_first_image() {
        let mut v = viewer();
        let load = v.select_room(&RoomKey::from("ROOM1")).unwrap().unwrap();
        assert_eq!(load.image, ImageRef::from("p/room1a.jpg"));
        assert_eq!(load.url, "http://img.test/p/room1a.jpg");
        assert_eq!(v.selected_image(), Some(&ImageRef::from("p/room1a.jpg")));
        assert_eq!(v.phase(), ViewerPhase::ImageSelected);
    }

    #[test]
    fn unknown_room_is_rejected_without_touching_state() {
        let mut v = viewer();
        let load = v.select_room(&RoomKey::from("ROOM2")).unwrap().unwrap();
        assert_eq!(v.apply_loaded(load.generation, texture_for(&load)), Applied::Installed);

        let err = v.select_room(&RoomKey::from("ROOM9")).unwrap_err();
        assert_eq!(err, SelectionError::UnknownRoom(RoomKey::from("ROOM9")));
        assert_eq!(v.selected_room(), Some(&RoomKey::from("ROOM2")));
        assert_eq!(v.generation(), load.generation);
        assert!(v.loaded_texture().is_some());
    }

    #[test]
    fn image_must_belong_to_selected_room() {
        let mut v = viewer();
        assert_eq!(
            v.select_image(&ImageRef::from("p/room2.jpg")).unwrap_err(),
            SelectionError::NoRoomSelected
        );
        v.select_room(&RoomKey::from("ROOM1")).unwrap();
        let err = v.select_image(&ImageRef::from("p/room2.jpg")).unwrap_err();
        assert!(matches!(err, SelectionError::ImageNotInRoom { .. }));
        assert_eq!(v.selected_image(), Some(&ImageRef::from("p/room1a.jpg")));

        let load = v.select_image(&ImageRef::from("p/room1b.jpg")).unwrap();
        assert_eq!(load.image, ImageRef::from("p/room1b.jpg"));
    }

    #[test]
    fn select_view_indexes_current_room() {
        let mut v = viewer();
        v.select_room(&RoomKey::from("ROOM1")).unwrap();
        let load = v.select_view(1).unwrap();
        assert_eq!(load.image, ImageRef::from("p/room1b.jpg"));
        assert!(matches!(
            v.select_view(2),
            Err(SelectionError::ViewOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn latest_selection_wins_over_late_result() {
        let mut v = viewer();
        let a = v.select_room(&RoomKey::from("ROOM1")).unwrap().unwrap();
        let b = v.select_room(&RoomKey::from("ROOM2")).unwrap().unwrap();

        assert_eq!(v.apply_loaded(b.generation, texture_for(&b)), Applied::Installed);
        assert_eq!(v.apply_loaded(a.generation, texture_for(&a)), Applied::Stale);
        assert_eq!(
            v.loaded_texture().unwrap().image,
            ImageRef::from("p/room2.jpg")
        );
    }

    #[test]
    fn new_texture_replaces_previous() {
        let mut v = viewer();
        let a = v.select_room(&RoomKey::from("ROOM1")).unwrap().unwrap();
        v.apply_loaded(a.generation, texture_for(&a));
        let held = Arc::clone(v.loaded_texture().unwrap());
        assert_eq!(Arc::strong_count(&held), 2);

        let b = v.select_image(&ImageRef::from("p/room1b.jpg")).unwrap();
        v.apply_loaded(b.generation, texture_for(&b));
        assert_eq!(Arc::strong_count(&held), 1);
        assert_eq!(
            v.loaded_texture().unwrap().image,
            ImageRef::from("p/room1b.jpg")
        );
    }

    #[test]
    fn failure_keeps_selection() {
        let mut v = viewer();
        let load = v.select_room(&RoomKey::from("ROOM1")).unwrap().unwrap();
        let error = TextureLoadFailed::new(load.image.clone(), "boom");
        assert_eq!(v.apply_failed(load.generation, error.clone()), Applied::Failed);
        assert_eq!(v.selected_room(), Some(&RoomKey::from("ROOM1")));
        assert_eq!(v.selected_image(), Some(&load.image));
        assert!(v.loaded_texture().is_none());
        assert_eq!(v.last_error(), Some(&error));

        let retry = v.select_image(&load.image).unwrap();
        assert!(v.last_error().is_none());
        assert_eq!(v.apply_loaded(retry.generation, texture_for(&retry)), Applied::Installed);
    }

    #[test]
    fn close_clears_and_releases() {
        let mut v = viewer();
        let load = v.select_room(&RoomKey::from("ROOM1")).unwrap().unwrap();
        v.apply_loaded(load.generation, texture_for(&load));
        let held = Arc::clone(v.loaded_texture().unwrap());

        v.close();
        assert_eq!(v.phase(), ViewerPhase::Idle);
        assert!(v.selected_room().is_none());
        assert!(v.selected_image().is_none());
        assert!(v.loaded_texture().is_none());
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn results_after_close_are_stale() {
        let mut v = viewer();
        let load = v.select_room(&RoomKey::from("ROOM1")).unwrap().unwrap();
        v.close();
        assert_eq!(v.apply_loaded(load.generation, texture_for(&load)), Applied::Stale);
        assert!(v.loaded_texture().is_none());
        let error = TextureLoadFailed::new(load.image.clone(), "late");
        assert_eq!(v.apply_failed(load.generation, error), Applied::Stale);
        assert!(v.last_error().is_none());
    }
}
