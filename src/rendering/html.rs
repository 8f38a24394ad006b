//! Standalone HTML document for the print path
//!
//! Mirrors the export view's content and ordering with page-size CSS so the
//! platform print flow reproduces the page exactly, colours included.

use std::fmt::Write as _;

use crate::rendering::view::{ExportView, PhotoCell, NO_IMAGE};

/// Escape text for element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn stylesheet(export: &ExportView, margin_mm: f32) -> String {
    let (w, h) = (export.page.width, export.page.height);
    format!(
        r#"@page {{ size: {w}px {h}px; margin: {m}mm; }}
* {{ box-sizing: border-box; -webkit-print-color-adjust: exact; print-color-adjust: exact; color-adjust: exact; }}
html, body {{ margin: 0; padding: 0; background: #ffffff; }}
body {{ font-family: Arial, Helvetica, sans-serif; color: #111827; }}
.page {{ width: {w}px; height: {h}px; padding: 20px; overflow: hidden; background: #ffffff; }}
.header {{ text-align: center; margin-bottom: 24px; border-bottom: 4px solid #2563eb; padding-bottom: 16px; }}
.header h1 {{ font-size: 24px; color: #1e3a8a; margin: 0 0 12px; }}
.header p {{ font-weight: 600; color: #1d4ed8; margin: 4px 0; }}
.info {{ display: flex; gap: 32px; margin-bottom: 24px; font-size: 14px; }}
.info > div {{ flex: 1; }}
.info .label {{ font-weight: 600; color: #1e3a8a; }}
table {{ width: 100%; border-collapse: collapse; }}
th, .band td {{ background: #2563eb; color: #ffffff; border: 1px solid #1e40af; text-align: center; }}
th {{ padding: 12px; font-size: 14px; }}
.items td {{ border: 1px solid #d1d5db; padding: 24px; text-align: center; width: 50%; }}
.qty {{ font-size: 60px; font-weight: 700; color: #2563eb; }}
.caption {{ font-size: 14px; color: #4b5563; }}
.photo img {{ max-width: 100%; max-height: 192px; object-fit: contain; }}
.placeholder {{ height: 96px; background: #f3f4f6; color: #9ca3af; display: flex; align-items: center; justify-content: center; font-size: 14px; }}
.summary {{ margin-top: 24px; }}
.summary td {{ padding: 16px; }}
.summary .value {{ font-size: 20px; font-weight: 700; }}
.footer {{ margin-top: 32px; text-align: center; font-size: 14px; color: #4b5563; }}
"#,
        w = w,
        h = h,
        m = margin_mm
    )
}

/// Build the print document for an export view.
pub fn print_document(export: &ExportView, margin_mm: f32) -> String {
    let view = &export.view;
    let mut html = String::new();
    let _ = writeln!(
        html,
        "<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n<div class=\"page\">",
        escape(&view.title),
        stylesheet(export, margin_mm)
    );

    let _ = writeln!(
        html,
        "<div class=\"header\"><h1>{}</h1><p>{}</p><p>{}</p></div>",
        escape(&view.title),
        escape(&view.address),
        escape(&view.company)
    );

    html.push_str("<div class=\"info\">");
    for entry in &view.info {
        let _ = write!(
            html,
            "<div><div class=\"label\">{}</div><div>{}</div></div>",
            escape(entry.label),
            escape(&entry.value)
        );
    }
    html.push_str("</div>\n");

    let _ = writeln!(
        html,
        "<table class=\"items\"><thead><tr><th>{}</th><th>{}</th></tr></thead><tbody>",
        escape(view.columns[0]),
        escape(view.columns[1])
    );
    for row in &view.rows {
        let photo = match &row.photo {
            PhotoCell::Image { src, alt } => format!("<img src=\"{}\" alt=\"{}\">", escape(src), escape(alt)),
            PhotoCell::Placeholder => format!("<div class=\"placeholder\">{}</div>", NO_IMAGE),
        };
        let _ = writeln!(
            html,
            "<tr><td><div class=\"qty\">{}</div><div class=\"caption\">{}</div></td><td class=\"photo\">{}</td></tr>",
            escape(&row.quantity),
            escape(&row.caption),
            photo
        );
    }
    html.push_str("</tbody></table>\n");

    html.push_str("<table class=\"summary\"><tbody>\n");
    for entry in &view.summary {
        let _ = writeln!(
            html,
            "<tr class=\"band\"><td>{}</td><td class=\"value\">{}</td></tr>",
            escape(entry.label),
            escape(&entry.value)
        );
    }
    html.push_str("</tbody></table>\n");

    let _ = writeln!(
        html,
        "<div class=\"footer\"><p>{}</p></div>\n</div>\n</body>\n</html>",
        escape(&view.footer)
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, ReportModel};
    use crate::rendering::view::render_for_export;
    use crate::PageGeometry;
    use chrono::NaiveDate;

    fn export() -> ExportView {
        let at = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let mut m = ReportModel::new(at.date());
        m.employee = "Budi <admin>".into();
        let mut item = LineItem::new(1);
        item.image = Some("data:image/png;base64,AAAA".into());
        m.items.push(item);
        render_for_export(&m, PageGeometry::A4, at)
    }

    #[test]
    fn page_css_and_exact_colours() {
        let html = print_document(&export(), 0.0);
        assert!(html.contains("@page { size: 794px 1123px; margin: 0mm; }"));
        assert!(html.contains("print-color-adjust: exact"));
    }

    #[test]
    fn content_is_escaped_and_ordered() {
        let html = print_document(&export(), 5.0);
        assert!(html.contains("Budi &lt;admin&gt;"));
        assert!(!html.contains("<admin>"));
        assert!(html.contains("src=\"data:image/png;base64,AAAA\""));
        let pos = |s: &str| html.find(s).unwrap();
        assert!(pos("LAPORAN HARIAN COLLECTION</h1>") < pos("Periode :"));
        assert!(pos("Periode :") < pos("Jumlah Cash Pick Up (NOA)"));
        assert!(pos("Jumlah Cash Pick Up (NOA)") < pos("Rekomendasi Kredit"));
        assert!(pos("Rekomendasi Kredit") < pos("Laporan dibuat pada:"));
    }
}
