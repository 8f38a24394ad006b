//! Page-fixed box layout for the export view
//!
//! All coordinates are logical (CSS) pixels on the configured page; the
//! rasterizer applies the oversampling factor. Blocks are stacked vertically
//! the same way the preview stacks them.

use crate::rendering::view::{ExportView, PhotoCell};
use crate::Rgba;

/// Average glyph advance in twentieths of the font size. Wrapping is
/// estimated from it so layout does not depend on which fonts are installed.
const ADVANCE_TWENTIETHS: u64 = 11;

pub const PAGE_PADDING: u32 = 20;
pub const CELL_PADDING: u32 = 12;
pub const HEADING_ROW_HEIGHT: u32 = 44;
pub const SUMMARY_ROW_HEIGHT: u32 = 48;
pub const MIN_ROW_HEIGHT: u32 = 48;
pub const MAX_ROW_HEIGHT: u32 = 220;
pub const MAX_PHOTO_HEIGHT: u32 = 192;

pub const WHITE: Rgba = (255, 255, 255, 255);
pub const BLUE_900: Rgba = (30, 58, 138, 255);
pub const BLUE_800: Rgba = (30, 64, 175, 255);
pub const BLUE_700: Rgba = (29, 78, 216, 255);
pub const BLUE_600: Rgba = (37, 99, 235, 255);
pub const GRAY_100: Rgba = (243, 244, 246, 255);
pub const GRAY_300: Rgba = (209, 213, 219, 255);
pub const GRAY_400: Rgba = (156, 163, 175, 255);
pub const GRAY_600: Rgba = (75, 85, 99, 255);
pub const TEXT: Rgba = (17, 24, 39, 255);

/// Distance between baselines for a font size in px.
pub fn line_height(size: u32) -> u32 {
    size + size / 4
}

/// How many average characters fit on a line of `width` px.
pub fn chars_per_line(width: u32, size: u32) -> usize {
    (width as u64 * 20 / (size.max(1) as u64 * ADVANCE_TWENTIETHS)).max(1) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn inset(&self, by: u32) -> Rect {
        Rect {
            x: self.x + by as i32,
            y: self.y + by as i32,
            width: self.width.saturating_sub(by * 2),
            height: self.height.saturating_sub(by * 2),
        }
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// What a box represents in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Title,
    Address,
    Company,
    HeaderRule,
    InfoLabel,
    InfoValue,
    ColumnHeading,
    QuantityCell,
    Quantity,
    Caption,
    PhotoCell,
    Photo,
    SummaryLabel,
    SummaryValue,
    Footer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    /// Font size in logical px
    pub size: u32,
    pub bold: bool,
    pub color: Rgba,
    pub align: Align,
}

impl TextBlock {
    pub fn new(text: &str, width: u32, size: u32, bold: bool, color: Rgba, align: Align) -> Self {
        Self {
            lines: wrap_text(text, chars_per_line(width, size)),
            size,
            bold,
            color,
            align,
        }
    }

    pub fn height(&self) -> u32 {
        self.lines.len() as u32 * line_height(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Box,
    Text(TextBlock),
    /// `slot` is the item-table row whose photo belongs here, or `None` when
    /// the row has no photo at all
    Photo { slot: Option<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    pub rect: Rect,
    pub role: Role,
    pub background: Option<Rgba>,
    pub border: Option<Rgba>,
    pub content: Content,
}

#[derive(Debug, Clone)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<LayoutNode>,
    /// Set when the item rows could not be squeezed onto the page; content
    /// past the bottom edge is cut off by the rasterizer
    pub overflow: bool,
}

impl PageLayout {
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.iter().filter(move |n| n.role == role)
    }
}

/// Word-wrap `text` into lines of at most `max_chars` characters. Words
/// longer than a line are split. Empty text yields a single empty line so
/// blank fields still occupy their slot.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !cur.is_empty() {
                lines.push(std::mem::take(&mut cur));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let cur_len = cur.chars().count();
        if cur_len > 0 && cur_len + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(&word);
    }
    if !cur.is_empty() || lines.is_empty() {
        lines.push(cur);
    }
    lines
}

struct Builder {
    nodes: Vec<LayoutNode>,
}

impl Builder {
    fn text(&mut self, role: Role, x: i32, y: u32, width: u32, block: TextBlock) -> u32 {
        let height = block.height();
        self.nodes.push(LayoutNode {
            rect: Rect::new(x, y as i32, width, height),
            role,
            background: None,
            border: None,
            content: Content::Text(block),
        });
        y + height
    }

    /// A bordered band cell with centred text.
    fn cell(&mut self, role: Role, rect: Rect, text: &str, size: u32, bold: bool) {
        let inner = rect.inset(CELL_PADDING);
        self.nodes.push(LayoutNode {
            rect,
            role,
            background: Some(BLUE_600),
            border: Some(BLUE_800),
            content: Content::Text(TextBlock::new(text, inner.width, size, bold, WHITE, Align::Center)),
        });
    }
}

/// Lay the export view out on its page.
pub fn layout_report(export: &ExportView) -> PageLayout {
    let page = export.page;
    let view = &export.view;
    let x = PAGE_PADDING as i32;
    let content_w = page.width.saturating_sub(PAGE_PADDING * 2);
    let col_w = content_w / 2;
    let info_w = col_w.saturating_sub(8);
    let mut b = Builder { nodes: Vec::new() };
    let mut y = PAGE_PADDING;

    // Header
    let centred = |text: &str, size, color| TextBlock::new(text, content_w, size, true, color, Align::Center);
    y = b.text(Role::Title, x, y, content_w, centred(&view.title, 24, BLUE_900)) + 12;
    y = b.text(Role::Address, x, y, content_w, centred(&view.address, 16, BLUE_700)) + 4;
    y = b.text(Role::Company, x, y, content_w, centred(&view.company, 16, BLUE_700)) + 12;
    b.nodes.push(LayoutNode {
        rect: Rect::new(x, y as i32, content_w, 4),
        role: Role::HeaderRule,
        background: Some(BLUE_600),
        border: None,
        content: Content::Box,
    });
    y += 4 + 24;

    // Info block, two columns
    let mut info_bottom = y;
    for (i, entry) in view.info.iter().enumerate() {
        let cx = x + (i as u32 * col_w) as i32;
        let label = TextBlock::new(entry.label, info_w, 14, true, BLUE_900, Align::Left);
        let after_label = b.text(Role::InfoLabel, cx, y, info_w, label) + 4;
        let value = TextBlock::new(&entry.value, info_w, 14, false, TEXT, Align::Left);
        let after_value = b.text(Role::InfoValue, cx, after_label, info_w, value);
        info_bottom = info_bottom.max(after_value);
    }
    y = info_bottom + 24;

    // Item table
    for (i, heading) in view.columns.iter().enumerate() {
        let cx = x + (i as u32 * col_w) as i32;
        let w = if i == 0 { col_w } else { content_w - col_w };
        let rect = Rect::new(cx, y as i32, w, HEADING_ROW_HEIGHT);
        b.cell(Role::ColumnHeading, rect, heading, 14, true);
    }
    y += HEADING_ROW_HEIGHT;

    let reserved = 24 + 3 * SUMMARY_ROW_HEIGHT + 32 + line_height(14) + PAGE_PADDING;
    let available = page.height.saturating_sub(y + reserved);
    let n = view.rows.len().max(1) as u32;
    let row_h = (available / n).clamp(MIN_ROW_HEIGHT, MAX_ROW_HEIGHT);
    let overflow = row_h * n > available;

    for (slot, row) in view.rows.iter().enumerate() {
        let qcell = Rect::new(x, y as i32, col_w, row_h);
        b.nodes.push(LayoutNode {
            rect: qcell,
            role: Role::QuantityCell,
            background: None,
            border: Some(GRAY_300),
            content: Content::Box,
        });

        let inner_w = col_w.saturating_sub(CELL_PADDING * 2);
        let q_size = (row_h / 3).clamp(16, 60);
        let c_size = if row_h >= 72 { 14 } else { 12 };
        let quantity = TextBlock::new(&row.quantity, inner_w, q_size, true, BLUE_600, Align::Center);
        let caption = (!row.caption.trim().is_empty())
            .then(|| TextBlock::new(&row.caption, inner_w, c_size, false, GRAY_600, Align::Center));
        let block_h = quantity.height() + caption.as_ref().map_or(0, |c| 6 + c.height());
        let mut ty = y + row_h.saturating_sub(block_h) / 2;
        let qh = quantity.height();
        b.nodes.push(LayoutNode {
            rect: Rect::new(x + CELL_PADDING as i32, ty as i32, inner_w, qh),
            role: Role::Quantity,
            background: None,
            border: None,
            content: Content::Text(quantity),
        });
        ty += qh + 6;
        if let Some(caption) = caption {
            let ch = caption.height();
            b.nodes.push(LayoutNode {
                rect: Rect::new(x + CELL_PADDING as i32, ty as i32, inner_w, ch),
                role: Role::Caption,
                background: None,
                border: None,
                content: Content::Text(caption),
            });
        }

        let pcell = Rect::new(x + col_w as i32, y as i32, content_w - col_w, row_h);
        b.nodes.push(LayoutNode {
            rect: pcell,
            role: Role::PhotoCell,
            background: None,
            border: Some(GRAY_300),
            content: Content::Box,
        });
        let inner = pcell.inset(CELL_PADDING);
        let ph = inner.height.min(MAX_PHOTO_HEIGHT);
        let photo = Rect::new(inner.x, inner.y + ((inner.height - ph) / 2) as i32, inner.width, ph);
        b.nodes.push(LayoutNode {
            rect: photo,
            role: Role::Photo,
            background: None,
            border: None,
            content: Content::Photo {
                slot: match row.photo {
                    PhotoCell::Image { .. } => Some(slot),
                    PhotoCell::Placeholder => None,
                },
            },
        });
        y += row_h;
    }

    // Summary
    y += 24;
    for entry in view.summary.iter() {
        let label = Rect::new(x, y as i32, col_w, SUMMARY_ROW_HEIGHT);
        b.cell(Role::SummaryLabel, label, entry.label, 14, false);
        let value = Rect::new(x + col_w as i32, y as i32, content_w - col_w, SUMMARY_ROW_HEIGHT);
        b.cell(Role::SummaryValue, value, &entry.value, 20, true);
        y += SUMMARY_ROW_HEIGHT;
    }

    // Footer
    y += 32;
    let footer = TextBlock::new(&view.footer, content_w, 14, false, GRAY_600, Align::Center);
    b.text(Role::Footer, x, y, content_w, footer);

    PageLayout {
        width: page.width,
        height: page.height,
        nodes: b.nodes,
        overflow,
    }
}
