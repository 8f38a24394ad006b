//! Rasterization and PNG encoding
//!
//! [`SoftwareRasterizer`] renders the display list's SVG scene with resvg
//! at an integer oversampling factor, composites decoded photos on top, then
//! the result is encoded as an RGB PNG so the output file never carries
//! transparency.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, warn};
use resvg::tiny_skia;
use resvg::usvg::{self, fontdb};
use std::io::Cursor;
use std::sync::Arc;

use crate::rendering::paint::{DisplayList, PaintCommand};
use crate::rendering::svg;
use crate::rendering::{ImageSet, Screenshot};
use crate::{Error, FontConfig, Result};

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Sans families tried, in order, when the configured one is not installed
const FALLBACK_FAMILIES: [&str; 5] = ["Arial", "Helvetica", "Liberation Sans", "DejaVu Sans", "Noto Sans"];

/// Converts a display list into pixels.
///
/// The returned bitmap must be exactly `list.width * scale` by
/// `list.height * scale`; the export pipeline rejects anything else.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, list: &DisplayList, images: &ImageSet, scale: u32) -> Result<RgbaImage>;
}

/// CPU rasterizer backed by resvg and a font database loaded once.
#[derive(Clone)]
pub struct SoftwareRasterizer {
    fontdb: Arc<fontdb::Database>,
    family: String,
}

impl std::fmt::Debug for SoftwareRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareRasterizer")
            .field("family", &self.family)
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl Default for SoftwareRasterizer {
    fn default() -> Self {
        Self::new(&FontConfig::default())
    }
}

impl SoftwareRasterizer {
    pub fn new(fonts: &FontConfig) -> Self {
        let mut db = fontdb::Database::new();
        if fonts.system_fonts {
            db.load_system_fonts();
        }
        for dir in &fonts.dirs {
            db.load_fonts_dir(dir);
        }

        let family = pick_family(&db, &fonts.family);
        match &family {
            Some(name) => {
                db.set_sans_serif_family(name.clone());
                debug!("Loaded {} font faces, report text uses {:?}", db.len(), name);
            }
            None => warn!("No font faces loaded; report text will not be drawn"),
        }

        Self {
            fontdb: Arc::new(db),
            family: family.unwrap_or_else(|| fonts.family.clone()),
        }
    }

    /// Family that `sans-serif` resolves to.
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn font_faces(&self) -> usize {
        self.fontdb.len()
    }
}

fn has_family(db: &fontdb::Database, name: &str) -> bool {
    let families = [fontdb::Family::Name(name)];
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    db.query(&query).is_some()
}

/// The configured family when installed, else a common sans face, else
/// whatever face was loaded first.
fn pick_family(db: &fontdb::Database, preferred: &str) -> Option<String> {
    std::iter::once(preferred)
        .chain(FALLBACK_FAMILIES)
        .find(|name| has_family(db, name))
        .map(str::to_string)
        .or_else(|| {
            db.faces()
                .next()
                .and_then(|face| face.families.first())
                .map(|(name, _)| name.clone())
        })
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, list: &DisplayList, images: &ImageSet, scale: u32) -> Result<RgbaImage> {
        let (width, height) = match (list.width.checked_mul(scale), list.height.checked_mul(scale)) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                return Err(Error::Render(format!(
                    "cannot rasterize a {}x{} page at scale {}",
                    list.width, list.height, scale
                )))
            }
        };

        let mut options = usvg::Options::default();
        options.font_family = self.family.clone();
        options.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&svg::scene(list), &options)
            .map_err(|e| Error::Render(format!("scene rejected: {}", e)))?;
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| Error::Render(format!("cannot allocate a {}x{} pixmap", width, height)))?;
        let (r, g, b, _) = list.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(scale as f32, scale as f32),
            &mut pixmap.as_mut(),
        );

        // Opaque background, so premultiplied and straight alpha agree.
        let mut canvas = RgbaImage::from_raw(width, height, pixmap.take())
            .ok_or_else(|| Error::Render("pixmap size mismatch".into()))?;

        let s = scale as i64;
        for cmd in &list.commands {
            if let PaintCommand::Image {
                x,
                y,
                width,
                height,
                slot,
            } = cmd
            {
                // Slots that vanished between paint and raster are left blank.
                if let Some(img) = images.get(slot) {
                    draw_image(&mut canvas, img, *x as i64 * s, *y as i64 * s, width * scale, height * scale);
                }
            }
        }

        Ok(canvas)
    }
}

fn draw_image(canvas: &mut RgbaImage, img: &RgbaImage, x: i64, y: i64, w: u32, h: u32) {
    if w == 0 || h == 0 {
        return;
    }
    if img.dimensions() == (w, h) {
        imageops::overlay(canvas, img, x, y);
    } else {
        let resized = imageops::resize(img, w, h, FilterType::Triangle);
        imageops::overlay(canvas, &resized, x, y);
    }
}

/// True when every pixel matches the first one.
pub fn is_blank(bitmap: &RgbaImage) -> bool {
    let mut pixels = bitmap.pixels();
    match pixels.next() {
        Some(first) => pixels.all(|p| p == first),
        None => true,
    }
}

/// Encode a bitmap as an opaque RGB PNG.
pub fn encode_png(bitmap: &RgbaImage) -> Result<Screenshot> {
    let rgb = DynamicImage::ImageRgba8(bitmap.clone()).into_rgb8();
    let mut png_data = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(Screenshot {
        width: bitmap.width(),
        height: bitmap.height(),
        png_data,
    })
}

/// Reject output that is truncated, implausibly small or the wrong size.
pub fn verify_png(shot: &Screenshot, expected: (u32, u32), min_bytes: usize) -> Result<()> {
    if shot.png_data.len() < min_bytes {
        return Err(Error::Encode(format!(
            "encoded image is only {} bytes (minimum {})",
            shot.png_data.len(),
            min_bytes
        )));
    }
    if !shot.png_data.starts_with(PNG_SIGNATURE) {
        return Err(Error::Encode("output is not a PNG stream".into()));
    }
    if (shot.width, shot.height) != expected {
        return Err(Error::Encode(format!(
            "encoded image is {}x{}, expected {}x{}",
            shot.width, shot.height, expected.0, expected.1
        )));
    }
    Ok(())
}
