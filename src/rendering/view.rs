//! Report view model
//!
//! A `ReportView` is the report's visible content in display order:
//! header, info block, item table, summary rows, generation footer. Both the
//! on-screen preview and the export representation are built from the same
//! view, so they can never disagree about content or ordering.

use chrono::NaiveDateTime;

use crate::model::{timestamp_id, ReportModel};
use crate::PageGeometry;

pub const LABEL_PERIOD: &str = "Periode :";
pub const LABEL_EMPLOYEE: &str = "Karyawan :";
pub const COLUMN_QUANTITY: &str = "Jumlah Cash Pick Up (NOA)";
pub const COLUMN_PHOTO: &str = "Foto (Struk Terakhir)";
pub const LABEL_TOTAL: &str = "Pembukaan Tabungan (NOA)";
pub const LABEL_DEPOSITS: &str = "Pembukaan Deposit (NOA)";
pub const LABEL_RECOMMENDATIONS: &str = "Rekomendasi Kredit";
pub const NO_ITEMS: &str = "No items";
pub const NO_IMAGE: &str = "No Image";
pub const FOOTER_PREFIX: &str = "Laporan dibuat pada: ";

/// Smallest preview width before horizontal scrolling takes over
pub const MIN_PREVIEW_WIDTH: u32 = 320;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Info,
    ItemTable,
    Summary,
    Footer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoCell {
    Image { src: String, alt: String },
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    /// `None` for the placeholder row of an empty report
    pub item_id: Option<u64>,
    pub quantity: String,
    pub caption: String,
    pub photo: PhotoCell,
}

impl ItemRow {
    fn placeholder() -> Self {
        Self {
            item_id: None,
            quantity: "0".to_string(),
            caption: NO_ITEMS.to_string(),
            photo: PhotoCell::Placeholder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledValue {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    pub title: String,
    pub address: String,
    pub company: String,
    pub info: [LabeledValue; 2],
    pub columns: [&'static str; 2],
    /// Never empty: an empty report gets one placeholder row
    pub rows: Vec<ItemRow>,
    pub summary: [LabeledValue; 3],
    pub footer: String,
}

impl ReportView {
    pub fn build(model: &ReportModel, generated_at: NaiveDateTime) -> Self {
        let mut rows: Vec<ItemRow> = model
            .items
            .iter()
            .map(|item| ItemRow {
                item_id: Some(item.id),
                quantity: if item.quantity.is_blank() {
                    "-".to_string()
                } else {
                    item.quantity.to_string()
                },
                caption: item.name.clone(),
                photo: match &item.image {
                    Some(src) if !src.is_empty() => PhotoCell::Image {
                        src: src.clone(),
                        alt: item.name.clone(),
                    },
                    _ => PhotoCell::Placeholder,
                },
            })
            .collect();
        if rows.is_empty() {
            rows.push(ItemRow::placeholder());
        }

        Self {
            title: model.title.clone(),
            address: model.address.clone(),
            company: model.company.clone(),
            info: [
                LabeledValue {
                    label: LABEL_PERIOD,
                    value: model.period.clone(),
                },
                LabeledValue {
                    label: LABEL_EMPLOYEE,
                    value: model.employee.clone(),
                },
            ],
            columns: [COLUMN_QUANTITY, COLUMN_PHOTO],
            rows,
            summary: [
                LabeledValue {
                    label: LABEL_TOTAL,
                    value: model.summary.total.to_string(),
                },
                LabeledValue {
                    label: LABEL_DEPOSITS,
                    value: model.summary.deposits.to_string(),
                },
                LabeledValue {
                    label: LABEL_RECOMMENDATIONS,
                    value: model.summary.recommendations.to_string(),
                },
            ],
            footer: format!("{}{}", FOOTER_PREFIX, timestamp_id(generated_at)),
        }
    }

    pub fn sections(&self) -> [Section; 5] {
        [
            Section::Header,
            Section::Info,
            Section::ItemTable,
            Section::Summary,
            Section::Footer,
        ]
    }

    /// Embedded photo sources with their row index.
    pub fn photo_sources(&self) -> Vec<(usize, &str)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| match &row.photo {
                PhotoCell::Image { src, .. } => Some((i, src.as_str())),
                PhotoCell::Placeholder => None,
            })
            .collect()
    }
}

/// The interactive preview: same content, zoomed to fit a viewport.
#[derive(Debug, Clone)]
pub struct PreviewView {
    pub view: ReportView,
    /// Never above 1.0; the preview only ever shrinks the page
    pub zoom: f32,
    pub width: u32,
    pub height: u32,
}

/// The export representation: exactly one page, no zoom, no clipping
/// container.
#[derive(Debug, Clone)]
pub struct ExportView {
    pub page: PageGeometry,
    pub view: ReportView,
}

pub fn render_preview(
    model: &ReportModel,
    page: PageGeometry,
    viewport_width: u32,
    generated_at: NaiveDateTime,
) -> PreviewView {
    let target = viewport_width.max(MIN_PREVIEW_WIDTH);
    let zoom = (target as f32 / page.width as f32).min(1.0);
    PreviewView {
        view: ReportView::build(model, generated_at),
        zoom,
        width: (page.width as f32 * zoom).round() as u32,
        height: (page.height as f32 * zoom).round() as u32,
    }
}

pub fn render_for_export(model: &ReportModel, page: PageGeometry, generated_at: NaiveDateTime) -> ExportView {
    ExportView {
        page,
        view: ReportView::build(model, generated_at),
    }
}
