//! Rendering: report view model, page layout, display list and rasterizer
//!
//! The export path never looks at the interactive preview. It builds an
//! [`ExportView`](view::ExportView) from the model alone, lays it out at a
//! fixed page geometry, turns the layout into paint commands and rasterizes
//! those, through an SVG scene, into an opaque bitmap.

pub mod html;
pub mod layout;
pub mod paint;
pub mod raster;
pub mod svg;
pub mod view;

pub use view::{render_for_export, render_preview, ExportView, PreviewView, ReportView};

use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

/// Decoded photos keyed by item-table row index. Rows missing from the map
/// are painted with the "No Image" placeholder.
pub type ImageSet = HashMap<usize, Arc<RgbaImage>>;

/// An encoded page image
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}
