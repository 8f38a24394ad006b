//! SVG scene for a display list
//!
//! The rasterizer parses this document with usvg, so text is shaped from
//! real font faces. Photos are composited afterwards from the decoded
//! bitmaps and are left out of the scene. Every coordinate is an integer in
//! logical pixels, which keeps the scene text stable across runs.

use std::fmt::Write as _;

use crate::rendering::html::escape;
use crate::rendering::layout::Align;
use crate::rendering::paint::{DisplayList, PaintCommand};
use crate::Rgba;

/// Generic family written into the scene; the rasterizer maps it onto the
/// configured face.
pub const FONT_FAMILY: &str = "sans-serif";

fn fill(rgba: Rgba) -> String {
    let (r, g, b, a) = rgba;
    if a == 255 {
        format!("fill=\"#{:02x}{:02x}{:02x}\"", r, g, b)
    } else {
        format!(
            "fill=\"#{:02x}{:02x}{:02x}\" fill-opacity=\"{:.3}\"",
            r,
            g,
            b,
            a as f32 / 255.0
        )
    }
}

fn rect(out: &mut String, x: i32, y: i32, width: u32, height: u32, rgba: Rgba) {
    if width == 0 || height == 0 {
        return;
    }
    let _ = writeln!(
        out,
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" {}/>",
        x,
        y,
        width,
        height,
        fill(rgba)
    );
}

/// Serialize `list` as a standalone SVG document.
pub fn scene(list: &DisplayList) -> String {
    let (w, h) = (list.width, list.height);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"{FONT_FAMILY}\">",
        w = w,
        h = h,
        FONT_FAMILY = FONT_FAMILY
    );
    let (r, g, b, _) = list.background;
    rect(&mut out, 0, 0, w, h, (r, g, b, 255));

    for cmd in &list.commands {
        match cmd {
            PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                rgba,
            } => rect(&mut out, *x, *y, *width, *height, *rgba),
            PaintCommand::StrokeRect {
                x,
                y,
                width,
                height,
                thickness,
                rgba,
            } => {
                // Inside stroke as four bands so edges stay on whole pixels
                let t = (*thickness).min(*width).min(*height);
                rect(&mut out, *x, *y, *width, t, *rgba);
                rect(&mut out, *x, *y + (*height - t) as i32, *width, t, *rgba);
                rect(&mut out, *x, *y, t, *height, *rgba);
                rect(&mut out, *x + (*width - t) as i32, *y, t, *height, *rgba);
            }
            PaintCommand::Text {
                x,
                y,
                text,
                size,
                bold,
                anchor,
                rgba,
            } => {
                let _ = writeln!(
                    out,
                    "<text x=\"{}\" y=\"{}\" font-size=\"{}\"{}{} {}>{}</text>",
                    x,
                    y,
                    size,
                    if *bold { " font-weight=\"bold\"" } else { "" },
                    if *anchor == Align::Center { " text-anchor=\"middle\"" } else { "" },
                    fill(*rgba),
                    escape(text)
                );
            }
            PaintCommand::Image { .. } => {}
        }
    }

    out.push_str("</svg>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(commands: Vec<PaintCommand>) -> DisplayList {
        DisplayList {
            width: 40,
            height: 30,
            background: (255, 255, 255, 0),
            commands,
            images_painted: 0,
            placeholders: 0,
        }
    }

    #[test]
    fn background_is_forced_opaque() {
        let svg = scene(&list(vec![]));
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"40\" height=\"30\""));
        assert!(svg.contains("<rect x=\"0\" y=\"0\" width=\"40\" height=\"30\" fill=\"#ffffff\"/>"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn text_is_kept_verbatim_and_escaped() {
        let svg = scene(&list(vec![PaintCommand::Text {
            x: 20,
            y: 14,
            text: "José & Ünal <QA> ok".into(),
            size: 14,
            bold: true,
            anchor: Align::Center,
            rgba: (37, 99, 235, 255),
        }]));
        assert!(svg.contains(
            "<text x=\"20\" y=\"14\" font-size=\"14\" font-weight=\"bold\" text-anchor=\"middle\" fill=\"#2563eb\">José &amp; Ünal &lt;QA&gt; ok</text>"
        ));
    }

    #[test]
    fn stroke_becomes_inside_bands() {
        let svg = scene(&list(vec![PaintCommand::StrokeRect {
            x: 2,
            y: 3,
            width: 10,
            height: 6,
            thickness: 1,
            rgba: (0, 0, 0, 128),
        }]));
        assert!(svg.contains("<rect x=\"2\" y=\"8\" width=\"10\" height=\"1\" fill=\"#000000\" fill-opacity=\"0.502\"/>"));
        assert!(svg.contains("<rect x=\"11\" y=\"3\" width=\"1\" height=\"6\""));
        assert_eq!(svg.matches("<rect").count(), 5);
    }

    #[test]
    fn images_are_not_part_of_the_scene() {
        let svg = scene(&list(vec![PaintCommand::Image {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            slot: 0,
        }]));
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(!svg.contains("<image"));
    }
}
