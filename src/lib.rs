//! Laporan: daily collection report composer
//!
//! Builds a fixed-layout "daily collection" report from user-entered fields
//! and photographs, previews it, and exports the rendered page as a PNG
//! sized to a standard sheet (or hands it to a print window).
//!
//! # Features
//!
//! - **Immutable editing**: every `FormEditor` operation returns a new
//!   `ReportModel`; derived totals are recomputed synchronously
//! - **Deterministic rendering**: the export view is a pure function of the
//!   model and a timestamp, laid out at fixed page geometry
//! - **Single-flight export**: at most one export or print runs at a time;
//!   image waits are bounded and never block the export
//!
//! # Example
//!
//! ```no_run
//! use laporan::export::{DirectorySink, ExportPipeline};
//! use laporan::{EditorConfig, ExportConfig, FormEditor, ItemField, ReportModel};
//! use std::sync::Arc;
//!
//! # async fn run() -> laporan::Result<()> {
//! let editor = FormEditor::new(EditorConfig::default());
//! let model = editor.add_item(&ReportModel::default());
//! let id = model.items[0].id;
//! let model = editor.update_item(&model, id, ItemField::Quantity, "5")?;
//!
//! let pipeline = ExportPipeline::new(
//!     ExportConfig::default(),
//!     Arc::new(DirectorySink::new("out")),
//! );
//! let outcome = pipeline.export_png(&model).await?;
//! println!("saved {} ({}x{})", outcome.filename, outcome.width, outcome.height);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result, ValidationRejection};

pub mod model;
pub use model::{Amount, ItemField, LineItem, ReportField, ReportModel, SummaryBlock};

pub mod editor;
pub use editor::FormEditor;

pub mod image_source;

// Report view model, page layout, display list and software rasterizer
pub mod rendering;

// Export orchestration: single-flight state machine, delivery and notifications
pub mod export;
pub use export::{ExportOutcome, ExportPipeline, ExportState};

/// An 8-bit RGBA colour
pub type Rgba = (u8, u8, u8, u8);

/// How the summary block is filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryMode {
    /// `total` is the sum of item quantities; deposits and recommendations
    /// are entered by hand
    #[default]
    Derived,
    /// All three values are entered by hand
    FreeEntry,
}

/// How item quantities are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuantityMode {
    /// Only non-negative whole numbers are accepted
    #[default]
    Strict,
    /// Any text is stored; it is coerced to a number only for totals
    FreeText,
}

/// Configuration for the form editor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub summary_mode: SummaryMode,
    pub quantity_mode: QuantityMode,
    /// Largest accepted image upload in bytes
    pub max_image_bytes: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            summary_mode: SummaryMode::Derived,
            quantity_mode: QuantityMode::Strict,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Logical page size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: u32,
    pub height: u32,
}

impl PageGeometry {
    /// A4 at 96 DPI
    pub const A4: PageGeometry = PageGeometry {
        width: 794,
        height: 1123,
    };

    /// Physical pixel size after oversampling by `scale`, or `None` when
    /// it does not fit in `u32`.
    pub fn scaled(&self, scale: u32) -> Option<(u32, u32)> {
        Some((self.width.checked_mul(scale)?, self.height.checked_mul(scale)?))
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// Largest rasterized page accepted, in physical pixels (256 MB of RGBA).
/// A4 at the maximum scale of 8 fits.
pub const MAX_EXPORT_PIXELS: u64 = 64_000_000;

/// Smallest byte count of any well-formed PNG stream we produce
const MIN_PNG_STREAM_BYTES: usize = 64;

/// Fonts used to rasterize report text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Preferred family; a common sans face, then the first loaded face, stand in when it is missing
    pub family: String,
    /// Load the fonts installed on the system
    pub system_fonts: bool,
    /// Extra directories scanned for font files
    pub dirs: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            system_fonts: true,
            dirs: Vec::new(),
        }
    }
}

/// Configuration for the export pipeline
///
/// The defaults reproduce an A4 page at 96 DPI oversampled 2x, which yields
/// a 1588x2246 PNG on a white background.
///
/// # Examples
///
/// ```
/// let cfg = laporan::ExportConfig::default();
/// assert_eq!(cfg.page.scaled(cfg.scale), Some((1588, 2246)));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Page geometry the export view is laid out at
    pub page: PageGeometry,
    /// Oversampling factor applied by the rasterizer
    pub scale: u32,
    /// Solid page background; the output never carries transparency
    pub background: Rgba,
    /// Bound on each individual image decode
    pub image_timeout_ms: u64,
    /// Bound on a whole export, from preparation to delivery
    pub export_timeout_ms: u64,
    /// Encoded output smaller than this is treated as a rendering failure.
    /// Small pages use a proportionally lower floor, see
    /// [`ExportConfig::png_size_floor`].
    pub min_png_bytes: usize,
    /// Page margin used by the print document
    pub print_margin_mm: f32,
    pub fonts: FontConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page: PageGeometry::A4,
            scale: 2,
            background: (255, 255, 255, 255),
            image_timeout_ms: 4000,
            export_timeout_ms: 20000,
            min_png_bytes: 1024,
            print_margin_mm: 0.0,
            fonts: FontConfig::default(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page.width == 0 || self.page.height == 0 {
            return Err(Error::Config("page geometry must be non-zero".into()));
        }
        if !(1..=8).contains(&self.scale) {
            return Err(Error::Config(format!("scale must be between 1 and 8, got {}", self.scale)));
        }
        let (w, h) = self.page.scaled(self.scale).ok_or_else(|| {
            Error::Config(format!(
                "page {}x{} at scale {} overflows",
                self.page.width, self.page.height, self.scale
            ))
        })?;
        if w as u64 * h as u64 > MAX_EXPORT_PIXELS {
            return Err(Error::Config(format!(
                "page {}x{} at scale {} is {}x{} pixels, above the {} pixel limit",
                self.page.width, self.page.height, self.scale, w, h, MAX_EXPORT_PIXELS
            )));
        }
        if self.image_timeout_ms == 0 || self.export_timeout_ms == 0 {
            return Err(Error::Config("timeouts must be greater than zero".into()));
        }
        if self.print_margin_mm < 0.0 || !self.print_margin_mm.is_finite() {
            return Err(Error::Config("print margin must be a non-negative number".into()));
        }
        Ok(())
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    /// Minimum encoded size for this page: `min_png_bytes`, lowered to one
    /// byte per 256 pixels on small pages.
    pub fn png_size_floor(&self) -> usize {
        let pixels = self
            .page
            .scaled(self.scale)
            .map_or(u64::MAX, |(w, h)| w as u64 * h as u64);
        let proportional = usize::try_from(pixels / 256).unwrap_or(usize::MAX);
        self.min_png_bytes.min(proportional).max(MIN_PNG_STREAM_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.page.width, 794);
        assert_eq!(config.page.height, 1123);
        assert_eq!(config.scale, 2);
        assert_eq!(config.background.3, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_editor_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.summary_mode, SummaryMode::Derived);
        assert_eq!(config.quantity_mode, QuantityMode::Strict);
        assert_eq!(config.max_image_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_scale_rejected() {
        let config = ExportConfig {
            scale: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_oversized_page_rejected() {
        let overflowing = ExportConfig {
            page: PageGeometry {
                width: 600_000_000,
                height: 1123,
            },
            scale: 8,
            ..Default::default()
        };
        let a4_max = ExportConfig {
            scale: 8,
            ..Default::default()
        };
        assert!(a4_max.validate().is_ok());

        assert_eq!(overflowing.page.scaled(8), None);
        assert!(matches!(overflowing.validate(), Err(Error::Config(_))));

        let huge = ExportConfig {
            page: PageGeometry {
                width: 20_000,
                height: 20_000,
            },
            scale: 8,
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_png_floor_scales_with_page() {
        let a4 = ExportConfig::default();
        assert_eq!(a4.png_size_floor(), 1024);

        let small = ExportConfig {
            page: PageGeometry { width: 120, height: 80 },
            scale: 1,
            ..Default::default()
        };
        assert!(small.validate().is_ok());
        assert_eq!(small.png_size_floor(), MIN_PNG_STREAM_BYTES);
    }

    #[test]
    fn test_config_from_partial_json() {
        let cfg: ExportConfig = serde_json::from_str(r#"{"scale": 3, "image_timeout_ms": 500}"#).unwrap();
        assert_eq!(cfg.scale, 3);
        assert_eq!(cfg.image_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.page, PageGeometry::A4);

        let ed: EditorConfig = serde_json::from_str(r#"{"quantity_mode": "free-text"}"#).unwrap();
        assert_eq!(ed.quantity_mode, QuantityMode::FreeText);
        assert_eq!(ed.summary_mode, SummaryMode::Derived);

        let cfg: ExportConfig = serde_json::from_str(r#"{"fonts": {"dirs": ["fonts"]}}"#).unwrap();
        assert_eq!(cfg.fonts.family, "Arial");
        assert!(cfg.fonts.system_fonts);
        assert_eq!(cfg.fonts.dirs, vec![PathBuf::from("fonts")]);
    }
}
