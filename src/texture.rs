use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use tracing::debug;

use crate::error::TextureLoadFailed;
use crate::rooms::ImageRef;

/// Decoded RGBA8 image handed to the renderer.
#[derive(Clone, PartialEq, Eq)]
pub struct Texture {
    pub image: ImageRef,
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("image", &self.image)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl Texture {
    pub fn into_rgba8(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels)
    }
}

/// Absolute `http…` refs pass through; anything else is appended to `base`
/// with exactly one `/` between the two.
pub fn resolve_image_url(base: &str, image: &ImageRef) -> String {
    if image.is_absolute_url() {
        return image.as_str().to_owned();
    }
    let path = image.as_str().replace('\\', "/");
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Where texture bytes come from.
pub trait TextureSource: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTextureSource {
    client: reqwest::Client,
}

impl HttpTextureSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build texture http client")?;
        Ok(Self { client })
    }
}

impl TextureSource for HttpTextureSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("image request failed status={status} url={url}");
        }
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Decodes `bytes`, normalises to RGBA8, and applies EXIF orientation.
pub fn decode_texture(
    image: ImageRef,
    url: String,
    bytes: &[u8],
    max_dimension: u32,
) -> Result<Texture, TextureLoadFailed> {
    match decode_rgba8_apply_exif(bytes, max_dimension) {
        Ok(rgba) => {
            let (width, height) = rgba.dimensions();
            Ok(Texture {
                image,
                url,
                width,
                height,
                pixels: rgba.into_raw(),
            })
        }
        Err(err) => Err(TextureLoadFailed::new(image, format!("{err:#}"))),
    }
}

fn decode_rgba8_apply_exif(bytes: &[u8], max_dimension: u32) -> Result<image::RgbaImage> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .context("failed to decode image data")?;
    let (width, height) = (img.width(), img.height());
    ensure!(width > 0 && height > 0, "image has no pixels");
    ensure!(
        width <= max_dimension && height <= max_dimension,
        "image {width}x{height} exceeds max-texture-dimension {max_dimension}"
    );

    let img = img.to_rgba8();
    let orientation = read_orientation(bytes).unwrap_or(1);
    Ok(apply_orientation(img, orientation))
}

fn apply_orientation(img: image::RgbaImage, orientation: u16) -> image::RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)? as u16;
    debug!(orientation = value, "exif orientation");
    Some(value)
}
