//! Export pipeline
//!
//! One export at a time moves through
//! `Preparing → WaitingForImages → Rendering → Encoding → Delivered`, or lands
//! in `Failed` from any in-flight state. The print path shares the preparing
//! step and then hands a standalone document to a [`PrintWindow`].
//!
//! The off-screen container is detached on every exit path, including a
//! top-level timeout that drops the export future partway through.

use chrono::NaiveDateTime;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::image_source::{BlockingDecoder, ImageDecoder};
use crate::model::ReportModel;
use crate::rendering::html::print_document;
use crate::rendering::layout::{layout_report, PageLayout};
use crate::rendering::paint::{build_display_list, RenderMode};
use crate::rendering::raster::{encode_png, is_blank, verify_png, Rasterizer, SoftwareRasterizer};
use crate::rendering::{render_for_export, ImageSet, ReportView, Screenshot};
use crate::{Error, ExportConfig, Result};

pub mod delivery;
pub mod notify;
pub mod stage;

pub use delivery::{
    export_filename, print_document_name, DirectorySink, ExportSink, HtmlFilePrinter, MemorySink, PrintContext,
    PrintWindow,
};
pub use notify::{LogNotifier, Notification, NotificationKind, NotificationSink, RecordingNotifier};
pub use stage::{OffscreenContainer, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Preparing,
    WaitingForImages,
    Rendering,
    Encoding,
    Delivered,
    Failed,
}

impl ExportState {
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ExportState::Preparing | ExportState::WaitingForImages | ExportState::Rendering | ExportState::Encoding
        )
    }
}

/// How one embedded photo fared while the export waited for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLoad {
    Loaded { width: u32, height: u32 },
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStatus {
    /// Item table row the photo belongs to
    pub slot: usize,
    pub load: ImageLoad,
}

/// Result of a delivered raster export
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub filename: String,
    pub location: PathBuf,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
    /// Hex SHA-256 of `png`
    pub sha256: String,
    pub images: Vec<ImageStatus>,
    /// Item table rows, including the placeholder row of an empty report
    pub rows: usize,
    /// Photo cells painted with the "No Image" placeholder
    pub placeholders: usize,
    /// True when the simplified rendering had to be used
    pub fallback_used: bool,
}

struct Rendered {
    shot: Screenshot,
    images: Vec<ImageStatus>,
    rows: usize,
    placeholders: usize,
    fallback_used: bool,
}

/// Orchestrates exports and prints of a [`ReportModel`].
pub struct ExportPipeline {
    config: ExportConfig,
    state: Mutex<ExportState>,
    trace: Mutex<Vec<ExportState>>,
    stage: Arc<Stage>,
    decoder: Arc<dyn ImageDecoder>,
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn ExportSink>,
    notifier: Arc<dyn NotificationSink>,
    printer: Arc<dyn PrintWindow>,
}

/// Held for the duration of one export or print. Dropping it while the
/// pipeline is still in flight marks the run as failed.
struct Flight<'a> {
    pipeline: &'a ExportPipeline,
}

impl Flight<'_> {
    fn enter(&self, next: ExportState) {
        self.pipeline.transition(next);
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if self.pipeline.state().is_in_flight() {
            self.pipeline.transition(ExportState::Failed);
        }
    }
}

impl ExportPipeline {
    pub fn new(config: ExportConfig, sink: Arc<dyn ExportSink>) -> Self {
        let rasterizer = Arc::new(SoftwareRasterizer::new(&config.fonts));
        Self {
            config,
            state: Mutex::new(ExportState::Idle),
            trace: Mutex::new(Vec::new()),
            stage: Arc::new(Stage::new()),
            decoder: Arc::new(BlockingDecoder),
            rasterizer,
            sink,
            notifier: Arc::new(LogNotifier),
            printer: Arc::new(HtmlFilePrinter::new(std::env::temp_dir())),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_printer(mut self, printer: Arc<dyn PrintWindow>) -> Self {
        self.printer = printer;
        self
    }

    pub fn with_stage(mut self, stage: Arc<Stage>) -> Self {
        self.stage = stage;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn state(&self) -> ExportState {
        *self.lock_state()
    }

    pub fn in_flight(&self) -> bool {
        self.state().is_in_flight()
    }

    /// States visited by the most recent run, starting at `Preparing`
    pub fn last_trace(&self) -> Vec<ExportState> {
        self.trace.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn stage(&self) -> &Arc<Stage> {
        &self.stage
    }

    fn lock_state(&self) -> MutexGuard<'_, ExportState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, next: ExportState) {
        let mut state = self.lock_state();
        log::debug!("export state {:?} -> {:?}", *state, next);
        *state = next;
        self.trace.lock().unwrap_or_else(|e| e.into_inner()).push(next);
    }

    /// Single-flight guard: claim the pipeline or refuse.
    fn begin(&self) -> Result<Flight<'_>> {
        let mut state = self.lock_state();
        if state.is_in_flight() {
            log::warn!("export requested while {:?}; ignoring", *state);
            return Err(Error::ExportInFlight);
        }
        log::debug!("export state {:?} -> {:?}", *state, ExportState::Preparing);
        *state = ExportState::Preparing;
        *self.trace.lock().unwrap_or_else(|e| e.into_inner()) = vec![ExportState::Preparing];
        Ok(Flight { pipeline: self })
    }

    /// Export `model` as a PNG stamped with the current local time.
    pub async fn export_png(&self, model: &ReportModel) -> Result<ExportOutcome> {
        self.export_png_at(model, chrono::Local::now().naive_local()).await
    }

    /// Export `model` as a PNG generated at `at`.
    pub async fn export_png_at(&self, model: &ReportModel, at: NaiveDateTime) -> Result<ExportOutcome> {
        self.config.validate()?;
        let flight = self.begin()?;
        self.notifier.notify(Notification::progress("Membuat laporan..."));

        let bound = self.config.export_timeout();
        let result = match tokio::time::timeout(bound, self.run_export(&flight, model, at)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.config.export_timeout_ms)),
        };

        match result {
            Ok(outcome) => {
                flight.enter(ExportState::Delivered);
                self.notifier
                    .notify(Notification::success(format!("Laporan tersimpan: {}", outcome.filename)));
                Ok(outcome)
            }
            Err(e) => {
                log::error!("export failed: {}", e);
                flight.enter(ExportState::Failed);
                self.notifier.notify(Notification::failure(&e));
                Err(e)
            }
        }
    }

    async fn run_export(&self, flight: &Flight<'_>, model: &ReportModel, at: NaiveDateTime) -> Result<ExportOutcome> {
        let export = render_for_export(model, self.config.page, at);
        let container = self.stage.attach(export)?;

        let delivered = match self.render_container(flight, &container).await {
            Ok(rendered) => self.deliver(model, at, rendered),
            Err(e) => Err(e),
        };
        container.detach();
        delivered
    }

    async fn render_container(&self, flight: &Flight<'_>, container: &OffscreenContainer) -> Result<Rendered> {
        let export = container.view();

        flight.enter(ExportState::WaitingForImages);
        let (images, statuses) = self.load_images(&export.view).await;

        flight.enter(ExportState::Rendering);
        let layout = layout_report(export);
        if layout.overflow {
            log::warn!("{} item rows do not fit on one page; output is clipped", export.view.rows.len());
        }

        let (shot, placeholders, fallback_used) = match self.rasterize(flight, &layout, &images, RenderMode::Full).await {
            Ok((shot, placeholders)) => (shot, placeholders, false),
            Err(e) if e.is_recoverable() => {
                log::warn!("rasterization failed ({}); retrying with simplified rendering", e);
                flight.enter(ExportState::Rendering);
                let (shot, placeholders) = self
                    .rasterize(flight, &layout, &images, RenderMode::Simplified)
                    .await
                    .map_err(|e| Error::Export(format!("rendering failed after fallback: {}", e)))?;
                (shot, placeholders, true)
            }
            Err(e) => return Err(e),
        };

        Ok(Rendered {
            shot,
            images: statuses,
            rows: export.view.rows.len(),
            placeholders,
            fallback_used,
        })
    }

    /// Wait for every embedded photo concurrently, each under its own bound.
    async fn load_images(&self, view: &ReportView) -> (ImageSet, Vec<ImageStatus>) {
        let bound = self.config.image_timeout();
        let bound_ms = self.config.image_timeout_ms;
        let decoder = self.decoder.as_ref();

        let waits = view.photo_sources().into_iter().map(|(slot, src)| async move {
            let settled = match tokio::time::timeout(bound, decoder.decode(src)).await {
                Ok(Ok(img)) => Ok(img),
                Ok(Err(e)) => {
                    log::warn!("photo in row {} could not be decoded: {}", slot, e);
                    Err(ImageLoad::Failed(e.to_string()))
                }
                Err(_) => {
                    log::warn!("photo in row {}: {}; using placeholder", slot, Error::ImageLoadTimeout(bound_ms));
                    Err(ImageLoad::TimedOut)
                }
            };
            (slot, settled)
        });

        let mut images = ImageSet::new();
        let mut statuses = Vec::new();
        for (slot, settled) in join_all(waits).await {
            let load = match settled {
                Ok(img) => {
                    let load = ImageLoad::Loaded {
                        width: img.width(),
                        height: img.height(),
                    };
                    images.insert(slot, img);
                    load
                }
                Err(load) => load,
            };
            statuses.push(ImageStatus { slot, load });
        }
        (images, statuses)
    }

    async fn rasterize(
        &self,
        flight: &Flight<'_>,
        layout: &PageLayout,
        images: &ImageSet,
        mode: RenderMode,
    ) -> Result<(Screenshot, usize)> {
        let list = build_display_list(layout, images, mode, self.config.background);
        let placeholders = list.placeholders;
        let scale = self.config.scale;
        let expected = self
            .config
            .page
            .scaled(scale)
            .ok_or_else(|| Error::Render(format!("page does not fit at scale {}", scale)))?;
        let min_bytes = self.config.png_size_floor();

        let rasterizer = Arc::clone(&self.rasterizer);
        let images = images.clone();
        let bitmap = tokio::task::spawn_blocking(move || rasterizer.rasterize(&list, &images, scale))
            .await
            .map_err(|e| Error::Render(format!("rasterizer task aborted: {}", e)))??;

        if bitmap.dimensions() != expected {
            return Err(Error::Render(format!(
                "bitmap is {}x{}, expected {}x{}",
                bitmap.width(),
                bitmap.height(),
                expected.0,
                expected.1
            )));
        }
        if is_blank(&bitmap) {
            return Err(Error::Render("bitmap is blank".into()));
        }

        flight.enter(ExportState::Encoding);
        let shot = tokio::task::spawn_blocking(move || -> Result<Screenshot> {
            let shot = encode_png(&bitmap)?;
            verify_png(&shot, expected, min_bytes)?;
            Ok(shot)
        })
        .await
        .map_err(|e| Error::Encode(format!("encoder task aborted: {}", e)))??;

        Ok((shot, placeholders))
    }

    fn deliver(&self, model: &ReportModel, at: NaiveDateTime, rendered: Rendered) -> Result<ExportOutcome> {
        let filename = export_filename(&model.employee, at.date());
        let png = rendered.shot.png_data;
        let location = self.sink.save(&filename, &png).map_err(|e| match e {
            Error::Delivery(_) => e,
            other => Error::Delivery(other.to_string()),
        })?;
        let sha256 = hex::encode(Sha256::digest(&png));
        log::info!(
            "exported {} ({}x{}, {} bytes, sha256 {})",
            filename,
            rendered.shot.width,
            rendered.shot.height,
            png.len(),
            sha256
        );
        Ok(ExportOutcome {
            filename,
            location,
            width: rendered.shot.width,
            height: rendered.shot.height,
            png,
            sha256,
            images: rendered.images,
            rows: rendered.rows,
            placeholders: rendered.placeholders,
            fallback_used: rendered.fallback_used,
        })
    }

    /// Send `model` to the print window, stamped with the current local time.
    pub fn print(&self, model: &ReportModel) -> Result<()> {
        self.print_at(model, chrono::Local::now().naive_local())
    }

    pub fn print_at(&self, model: &ReportModel, at: NaiveDateTime) -> Result<()> {
        self.config.validate()?;
        let flight = self.begin()?;

        match self.run_print(model, at) {
            Ok(()) => {
                flight.enter(ExportState::Delivered);
                self.notifier.notify(Notification::success("Laporan dikirim ke printer"));
                Ok(())
            }
            Err(e) => {
                log::error!("print failed: {}", e);
                flight.enter(ExportState::Failed);
                self.notifier.notify(Notification::failure(&e));
                Err(e)
            }
        }
    }

    fn run_print(&self, model: &ReportModel, at: NaiveDateTime) -> Result<()> {
        let export = render_for_export(model, self.config.page, at);
        let container = self.stage.attach(export)?;
        let document = print_document(container.view(), self.config.print_margin_mm);

        let mut ctx = self.printer.open(&print_document_name(&model.employee, at.date()))?;
        let printed = ctx.write(&document).and_then(|_| ctx.print());
        ctx.close();
        container.detach();
        printed
    }
}
