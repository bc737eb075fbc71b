//! Grouping of a property's panoramic images into rooms.
//!
//! Images are grouped by the `room<digits>` token in their filename
//! (`living_room2.jpg` and `ROOM2-b.jpg` both land in `ROOM2`). Filenames
//! without such a token become a room of their own, keyed by the filename,
//! so that every image stays reachable from the viewer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

const ROOM_PREFIX: &[u8] = b"room";

/// Identifier of one image as returned by the backend: an absolute URL or a
/// path relative to the image base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_absolute_url(&self) -> bool {
        self.0.starts_with("http")
    }

    /// Last non-empty path segment, splitting on both `/` and `\`.
    pub fn filename(&self) -> &str {
        self.0
            .rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ImageRef {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Label of a logical room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Outcome of classifying a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomClass {
    /// The filename carries a `room<digits>` token; the key is that token
    /// upper-cased.
    Numbered(RoomKey),
    /// No token found; the key is the filename itself.
    Fallback(RoomKey),
}

impl RoomClass {
    pub fn key(&self) -> &RoomKey {
        match self {
            Self::Numbered(key) | Self::Fallback(key) => key,
        }
    }

    pub fn into_key(self) -> RoomKey {
        match self {
            Self::Numbered(key) | Self::Fallback(key) => key,
        }
    }
}

pub fn classify(image: &ImageRef) -> RoomClass {
    let filename = image.filename();
    match find_room_token(filename) {
        Some(token) => RoomClass::Numbered(RoomKey::new(token.to_ascii_uppercase())),
        None => RoomClass::Fallback(RoomKey::new(filename)),
    }
}

/// Leftmost case-insensitive `room` followed by at least one ASCII digit;
/// the digit run is taken greedily.
fn find_room_token(filename: &str) -> Option<&str> {
    let bytes = filename.as_bytes();
    let mut start = 0;
    while start + ROOM_PREFIX.len() < bytes.len() {
        let digits_at = start + ROOM_PREFIX.len();
        if bytes[start..digits_at].eq_ignore_ascii_case(ROOM_PREFIX)
            && bytes[digits_at].is_ascii_digit()
        {
            let end = bytes[digits_at..]
                .iter()
                .position(|b| !b.is_ascii_digit())
                .map_or(bytes.len(), |n| digits_at + n);
            // The matched range is pure ASCII, so these are char boundaries.
            return Some(&filename[start..end]);
        }
        start += 1;
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub key: RoomKey,
    pub images: Vec<ImageRef>,
}

/// Per-room numbers shown next to the room buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub key: RoomKey,
    pub image_count: usize,
}

/// Rooms in first-occurrence order, each holding its images in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomMap {
    rooms: Vec<Room>,
    index: HashMap<RoomKey, usize>,
}

impl RoomMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RoomKey, image: ImageRef) {
        match self.index.get(&key) {
            Some(&pos) => self.rooms[pos].images.push(image),
            None => {
                self.index.insert(key.clone(), self.rooms.len());
                self.rooms.push(Room {
                    key,
                    images: vec![image],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn contains(&self, key: &RoomKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &RoomKey) -> Option<&[ImageRef]> {
        self.index
            .get(key)
            .map(|&pos| self.rooms[pos].images.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RoomKey> {
        self.rooms.iter().map(|room| &room.key)
    }

    /// Total number of images across all rooms.
    pub fn image_count(&self) -> usize {
        self.rooms.iter().map(|room| room.images.len()).sum()
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|room| RoomSummary {
                key: room.key.clone(),
                image_count: room.images.len(),
            })
            .collect()
    }

    pub fn first_image(&self, key: &RoomKey) -> Option<&ImageRef> {
        self.get(key).and_then(|images| images.first())
    }

    /// Zero-based view within a room.
    pub fn image_at(&self, key: &RoomKey, index: usize) -> Option<&ImageRef> {
        self.get(key).and_then(|images| images.get(index))
    }

    pub fn contains_image(&self, key: &RoomKey, image: &ImageRef) -> bool {
        self.get(key)
            .is_some_and(|images| images.iter().any(|candidate| candidate == image))
    }
}

impl<'a> IntoIterator for &'a RoomMap {
    type Item = &'a Room;
    type IntoIter = std::slice::Iter<'a, Room>;

    fn into_iter(self) -> Self::IntoIter {
        self.rooms.iter()
    }
}

/// Partition `images` into rooms. Never fails and never drops an entry;
/// duplicates stay as separate entries.
pub fn group_by_room<I, T>(images: I) -> RoomMap
where
    I: IntoIterator<Item = T>,
    T: Into<ImageRef>,
{
    let mut map = RoomMap::new();
    for image in images {
        let image = image.into();
        let key = classify(&image).into_key();
        map.insert(key, image);
    }
    map
}
