//! Paint command set and display-list construction

use crate::rendering::layout::{line_height, Align, Content, PageLayout, Rect, TextBlock, BLUE_900, GRAY_100, GRAY_400, WHITE};
use crate::rendering::view::NO_IMAGE;
use crate::rendering::ImageSet;
use crate::Rgba;

/// Height of the grey "No Image" box inside a photo cell
pub const PLACEHOLDER_HEIGHT: u32 = 96;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        thickness: u32,
        rgba: Rgba,
    },
    /// One line of text. `y` is the baseline; `x` is the left edge for
    /// `Align::Left` and the centre for `Align::Center`.
    Text {
        x: i32,
        y: i32,
        text: String,
        size: u32,
        bold: bool,
        anchor: Align,
        rgba: Rgba,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        slot: usize,
    },
}

/// `Simplified` is the fallback used after a failed rasterization: same
/// text and photos, no fills, borders or rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Full,
    Simplified,
}

#[derive(Debug, Clone)]
pub struct DisplayList {
    pub width: u32,
    pub height: u32,
    pub background: Rgba,
    pub commands: Vec<PaintCommand>,
    pub images_painted: usize,
    pub placeholders: usize,
}

/// Turn a page layout into paint commands. Photo slots without a decoded
/// image in `images` get the placeholder.
pub fn build_display_list(layout: &PageLayout, images: &ImageSet, mode: RenderMode, background: Rgba) -> DisplayList {
    let simplified = mode == RenderMode::Simplified;
    let mut list = DisplayList {
        width: layout.width,
        height: layout.height,
        background,
        commands: Vec::new(),
        images_painted: 0,
        placeholders: 0,
    };

    for node in &layout.nodes {
        if let (Some(rgba), false) = (node.background, simplified) {
            list.commands.push(PaintCommand::SolidRect {
                x: node.rect.x,
                y: node.rect.y,
                width: node.rect.width,
                height: node.rect.height,
                rgba,
            });
        }

        match &node.content {
            Content::Box => {}
            Content::Text(block) => paint_text(&mut list.commands, node.rect, block, simplified),
            Content::Photo { slot } => match slot.and_then(|s| images.get(&s).map(|img| (s, img))) {
                Some((slot, img)) => {
                    let fit = fit_contain(node.rect, img.width(), img.height());
                    list.commands.push(PaintCommand::Image {
                        x: fit.x,
                        y: fit.y,
                        width: fit.width,
                        height: fit.height,
                        slot,
                    });
                    list.images_painted += 1;
                }
                None => {
                    paint_placeholder(&mut list.commands, node.rect, simplified);
                    list.placeholders += 1;
                }
            },
        }

        if let (Some(rgba), false) = (node.border, simplified) {
            list.commands.push(PaintCommand::StrokeRect {
                x: node.rect.x,
                y: node.rect.y,
                width: node.rect.width,
                height: node.rect.height,
                thickness: 1,
                rgba,
            });
        }
    }

    list
}

fn paint_text(out: &mut Vec<PaintCommand>, rect: Rect, block: &TextBlock, simplified: bool) {
    // Without the coloured bands white text would vanish into the page.
    let rgba = if simplified && block.color == WHITE {
        BLUE_900
    } else {
        block.color
    };
    let lh = line_height(block.size);
    let top = rect.y + (rect.height.saturating_sub(block.height()) / 2) as i32;
    let x = match block.align {
        Align::Left => rect.x,
        Align::Center => rect.x + (rect.width / 2) as i32,
    };
    for (i, line) in block.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        out.push(PaintCommand::Text {
            x,
            y: top + (i as u32 * lh + block.size) as i32,
            text: line.clone(),
            size: block.size,
            bold: block.bold,
            anchor: block.align,
            rgba,
        });
    }
}

fn paint_placeholder(out: &mut Vec<PaintCommand>, rect: Rect, simplified: bool) {
    let h = rect.height.min(PLACEHOLDER_HEIGHT);
    let boxed = Rect::new(rect.x, rect.y + ((rect.height - h) / 2) as i32, rect.width, h);
    if !simplified {
        out.push(PaintCommand::SolidRect {
            x: boxed.x,
            y: boxed.y,
            width: boxed.width,
            height: boxed.height,
            rgba: GRAY_100,
        });
    }
    let size = if h >= 32 { 14 } else { 10 };
    let block = TextBlock {
        lines: vec![NO_IMAGE.to_string()],
        size,
        bold: false,
        color: GRAY_400,
        align: Align::Center,
    };
    paint_text(out, boxed, &block, simplified);
}

/// Largest rect with the image's aspect ratio that fits inside `rect`,
/// centred. Images are never enlarged.
pub fn fit_contain(rect: Rect, img_w: u32, img_h: u32) -> Rect {
    if img_w == 0 || img_h == 0 || rect.width == 0 || rect.height == 0 {
        return Rect::new(rect.x, rect.y, 0, 0);
    }
    let sx = rect.width as f64 / img_w as f64;
    let sy = rect.height as f64 / img_h as f64;
    let s = sx.min(sy).min(1.0);
    let w = ((img_w as f64 * s).round() as u32).clamp(1, rect.width);
    let h = ((img_h as f64 * s).round() as u32).clamp(1, rect.height);
    Rect::new(
        rect.x + ((rect.width - w) / 2) as i32,
        rect.y + ((rect.height - h) / 2) as i32,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, ReportModel};
    use crate::rendering::layout::layout_report;
    use crate::rendering::view::render_for_export;
    use crate::PageGeometry;
    use chrono::NaiveDate;
    use image::RgbaImage;
    use std::sync::Arc;

    fn layout_with_photo() -> PageLayout {
        let at = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let mut m = ReportModel::new(at.date());
        let mut item = LineItem::new(1);
        item.image = Some("data:image/png;base64,AAAA".into());
        m.items.push(item);
        m.items.push(LineItem::new(2));
        layout_report(&render_for_export(&m, PageGeometry::A4, at))
    }

    #[test]
    fn fit_contain_keeps_aspect_and_never_enlarges() {
        let r = Rect::new(0, 0, 200, 100);
        let fit = fit_contain(r, 400, 400);
        assert_eq!((fit.width, fit.height), (100, 100));
        assert_eq!(fit.x, 50);
        let small = fit_contain(r, 10, 20);
        assert_eq!((small.width, small.height), (10, 20));
    }

    #[test]
    fn missing_image_becomes_placeholder() {
        let layout = layout_with_photo();
        let list = build_display_list(&layout, &ImageSet::new(), RenderMode::Full, WHITE);
        assert_eq!(list.images_painted, 0);
        assert_eq!(list.placeholders, 2);
    }

    #[test]
    fn decoded_image_is_painted() {
        let layout = layout_with_photo();
        let mut images = ImageSet::new();
        images.insert(0, Arc::new(RgbaImage::new(40, 30)));
        let list = build_display_list(&layout, &images, RenderMode::Full, WHITE);
        assert_eq!(list.images_painted, 1);
        assert_eq!(list.placeholders, 1);
        assert!(list
            .commands
            .iter()
            .any(|c| matches!(c, PaintCommand::Image { slot: 0, width: 40, height: 30, .. })));
    }

    #[test]
    fn simplified_mode_drops_effects_but_keeps_text() {
        let layout = layout_with_photo();
        let full = build_display_list(&layout, &ImageSet::new(), RenderMode::Full, WHITE);
        let simple = build_display_list(&layout, &ImageSet::new(), RenderMode::Simplified, WHITE);
        let texts = |l: &DisplayList| {
            l.commands
                .iter()
                .filter_map(|c| match c {
                    PaintCommand::Text { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(texts(&full), texts(&simple));
        assert!(simple
            .commands
            .iter()
            .all(|c| matches!(c, PaintCommand::Text { .. } | PaintCommand::Image { .. })));
        assert!(simple
            .commands
            .iter()
            .all(|c| !matches!(c, PaintCommand::Text { rgba, .. } if *rgba == WHITE)));
    }

    #[test]
    fn text_keeps_case_and_sits_on_baselines() {
        let layout = layout_with_photo();
        let list = build_display_list(&layout, &ImageSet::new(), RenderMode::Full, WHITE);
        let period = list
            .commands
            .iter()
            .find_map(|c| match c {
                PaintCommand::Text { text, y, size, anchor, .. } if text.starts_with("Jumat") => {
                    Some((text.clone(), *y, *size, *anchor))
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(period.0, "Jumat, 16 Oktober 2026");
        assert_eq!(period.2, 14);
        assert_eq!(period.3, Align::Left);

        let title = list
            .commands
            .iter()
            .find_map(|c| match c {
                PaintCommand::Text { x, y, bold, anchor, .. } => Some((*x, *y, *bold, *anchor)),
                _ => None,
            })
            .unwrap();
        // Centred on the content box, baseline one font size below the top padding
        assert_eq!(title, (20 + 754 / 2, 20 + 24, true, Align::Center));
        assert!(period.1 > title.1);
    }
}
