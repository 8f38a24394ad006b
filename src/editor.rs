//! Form editing operations over `ReportModel`
//!
//! Every operation takes the current model by reference and returns the
//! model that supersedes it. Ids are never reassigned, and in
//! [`SummaryMode::Derived`] the summary total is recomputed before the new
//! model is handed back.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::image_source;
use crate::model::{Amount, ItemField, LineItem, ReportField, ReportModel};
use crate::{EditorConfig, Error, QuantityMode, Result, SummaryMode, ValidationRejection};

/// Binds edits to a `ReportModel` according to an `EditorConfig`.
#[derive(Debug)]
pub struct FormEditor {
    config: EditorConfig,
    next_id: AtomicU64,
}

impl FormEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Set a report-level field.
    ///
    /// Summary fields are parsed like quantities. Writing `total` while the
    /// summary is derived is refused.
    pub fn update_field(&self, model: &ReportModel, field: ReportField, value: &str) -> Result<ReportModel> {
        let mut next = model.clone();
        match field {
            ReportField::Title => next.title = value.to_string(),
            ReportField::Company => next.company = value.to_string(),
            ReportField::Address => next.address = value.to_string(),
            ReportField::Period => next.period = value.to_string(),
            ReportField::Employee => next.employee = value.to_string(),
            ReportField::Total => {
                if self.config.summary_mode == SummaryMode::Derived {
                    return Err(ValidationRejection::DerivedField(field.name().into()).into());
                }
                next.summary.total = self.parse_amount(value)?;
            }
            ReportField::Deposits => next.summary.deposits = self.parse_amount(value)?,
            ReportField::Recommendations => next.summary.recommendations = self.parse_amount(value)?,
        }
        Ok(self.finish(next))
    }

    /// Append a blank item with a fresh id.
    pub fn add_item(&self, model: &ReportModel) -> ReportModel {
        let id = self.fresh_id(model);
        let mut next = model.clone();
        let mut item = LineItem::new(id);
        if self.config.quantity_mode == QuantityMode::FreeText {
            item.quantity = Amount::Text(String::new());
        }
        next.items.push(item);
        log::debug!("added item {}", id);
        self.finish(next)
    }

    /// Update one field of an item. Unknown ids leave the model as it was.
    pub fn update_item(&self, model: &ReportModel, id: u64, field: ItemField, value: &str) -> Result<ReportModel> {
        let quantity = match field {
            ItemField::Quantity => Some(self.parse_amount(value)?),
            ItemField::Name => None,
        };
        let mut next = model.clone();
        if let Some(item) = next.items.iter_mut().find(|item| item.id == id) {
            match quantity {
                Some(q) => item.quantity = q,
                None => item.name = value.to_string(),
            }
        }
        Ok(self.finish(next))
    }

    /// Remove an item. Unknown ids leave the model as it was.
    pub fn remove_item(&self, model: &ReportModel, id: u64) -> ReportModel {
        let mut next = model.clone();
        next.items.retain(|item| item.id != id);
        self.finish(next)
    }

    /// Decode an uploaded file and attach it to an item as a data URI.
    ///
    /// Oversized or unreadable files are rejected with
    /// [`Error::Validation`] and nothing is attached.
    pub async fn attach_image(&self, model: &ReportModel, id: u64, file: &[u8]) -> Result<ReportModel> {
        let max = self.config.max_image_bytes;
        if file.len() > max {
            log::warn!("rejected image for item {}: {} bytes over {} limit", id, file.len(), max);
            return Err(ValidationRejection::TooLarge { size: file.len(), max }.into());
        }
        let bytes = file.to_vec();
        let uri = tokio::task::spawn_blocking(move || image_source::to_data_uri(&bytes))
            .await
            .map_err(|e| Error::ImageDecode(format!("decode task aborted: {}", e)))??;

        let mut next = model.clone();
        if let Some(item) = next.items.iter_mut().find(|item| item.id == id) {
            item.image = Some(uri);
        }
        Ok(self.finish(next))
    }

    pub fn clear_image(&self, model: &ReportModel, id: u64) -> ReportModel {
        let mut next = model.clone();
        if let Some(item) = next.items.iter_mut().find(|item| item.id == id) {
            item.image = None;
        }
        self.finish(next)
    }

    fn parse_amount(&self, value: &str) -> Result<Amount> {
        match self.config.quantity_mode {
            QuantityMode::FreeText => Ok(Amount::Text(value.to_string())),
            QuantityMode::Strict => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Ok(Amount::Count(0));
                }
                // `u64::from_str` takes a leading '+', a quantity field does not
                if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ValidationRejection::InvalidQuantity(value.to_string()).into());
                }
                trimmed
                    .parse::<u64>()
                    .map(Amount::Count)
                    .map_err(|_| ValidationRejection::InvalidQuantity(value.to_string()).into())
            }
        }
    }

    // Ids stay above anything already in the model, so a model loaded from
    // elsewhere never collides with a freshly added item.
    fn fresh_id(&self, model: &ReportModel) -> u64 {
        let floor = model.max_item_id().map_or(1, |max| max + 1);
        self.next_id.fetch_max(floor, Ordering::SeqCst);
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn finish(&self, mut next: ReportModel) -> ReportModel {
        if self.config.summary_mode == SummaryMode::Derived {
            next.summary.total = Amount::Count(next.quantity_total());
        }
        next
    }
}

impl Default for FormEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn blank() -> ReportModel {
        ReportModel::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    #[test]
    fn add_item_assigns_increasing_ids() {
        let editor = FormEditor::default();
        let m = editor.add_item(&blank());
        let m = editor.add_item(&m);
        assert_eq!(m.items.len(), 2);
        assert!(m.items[1].id > m.items[0].id);
        assert_eq!(m.items[0].quantity, Amount::Count(0));
        assert!(m.items[0].image.is_none());
    }

    #[test]
    fn ids_skip_past_loaded_items() {
        let editor = FormEditor::default();
        let mut m = blank();
        m.items.push(LineItem::new(41));
        let m = editor.add_item(&m);
        assert_eq!(m.items[1].id, 42);
    }

    #[test]
    fn derived_total_tracks_quantities() {
        let editor = FormEditor::default();
        let m = editor.add_item(&editor.add_item(&blank()));
        let (a, b) = (m.items[0].id, m.items[1].id);
        let m = editor.update_item(&m, a, ItemField::Quantity, "5").unwrap();
        let m = editor.update_item(&m, b, ItemField::Quantity, "3").unwrap();
        assert_eq!(m.summary.total, Amount::Count(8));
        let m = editor.remove_item(&m, a);
        assert_eq!(m.summary.total, Amount::Count(3));
    }

    #[test]
    fn strict_mode_rejects_non_numeric_quantity() {
        let editor = FormEditor::default();
        let m = editor.add_item(&blank());
        let id = m.items[0].id;
        let err = editor.update_item(&m, id, ItemField::Quantity, "lima").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationRejection::InvalidQuantity(_))));
        let err = editor.update_item(&m, id, ItemField::Quantity, "-2").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationRejection::InvalidQuantity(_))));
    }

    #[test]
    fn strict_mode_rejects_signed_quantity() {
        let editor = FormEditor::default();
        let m = editor.add_item(&blank());
        let id = m.items[0].id;
        let err = editor.update_item(&m, id, ItemField::Quantity, "+5").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationRejection::InvalidQuantity(ref v)) if v == "+5"));
        let m = editor.update_item(&m, id, ItemField::Quantity, " 5 ").unwrap();
        assert_eq!(m.item(id).unwrap().quantity, Amount::Count(5));
    }

    #[test]
    fn free_text_mode_keeps_text_and_coerces_total() {
        let editor = FormEditor::new(EditorConfig {
            quantity_mode: QuantityMode::FreeText,
            ..Default::default()
        });
        let m = editor.add_item(&editor.add_item(&blank()));
        let (a, b) = (m.items[0].id, m.items[1].id);
        let m = editor.update_item(&m, a, ItemField::Quantity, "7 lembar").unwrap();
        let m = editor.update_item(&m, b, ItemField::Quantity, "tidak ada").unwrap();
        assert_eq!(m.item(a).unwrap().quantity, Amount::Text("7 lembar".into()));
        assert_eq!(m.summary.total, Amount::Count(7));
    }

    #[test]
    fn derived_total_cannot_be_typed() {
        let editor = FormEditor::default();
        let err = editor.update_field(&blank(), ReportField::Total, "99").unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationRejection::DerivedField(_))));
    }

    #[test]
    fn free_entry_summary_accepts_total() {
        let editor = FormEditor::new(EditorConfig {
            summary_mode: SummaryMode::FreeEntry,
            ..Default::default()
        });
        let m = editor.add_item(&blank());
        let m = editor.update_item(&m, m.items[0].id, ItemField::Quantity, "4").unwrap();
        let m = editor.update_field(&m, ReportField::Total, "99").unwrap();
        assert_eq!(m.summary.total, Amount::Count(99));
        let m = editor.update_field(&m, ReportField::Deposits, "2").unwrap();
        assert_eq!(m.summary.deposits, Amount::Count(2));
        assert_eq!(m.summary.total, Amount::Count(99));
    }

    #[test]
    fn text_fields_update() {
        let editor = FormEditor::default();
        let m = editor.update_field(&blank(), ReportField::Employee, "Siti").unwrap();
        assert_eq!(m.employee, "Siti");
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let editor = FormEditor::new(EditorConfig {
            max_image_bytes: 16,
            ..Default::default()
        });
        let m = editor.add_item(&blank());
        let err = editor
            .attach_image(&m, m.items[0].id, &[0u8; 17])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationRejection::TooLarge { size: 17, max: 16 })
        ));
    }

    #[tokio::test]
    async fn attach_then_clear_image() {
        use std::io::Cursor;

        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 255, 255]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let editor = FormEditor::default();
        let m = editor.add_item(&blank());
        let id = m.items[0].id;
        let m = editor.attach_image(&m, id, &png).await.unwrap();
        assert!(m.items[0]
            .image
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        let unreadable = editor.attach_image(&m, id, b"not a picture").await;
        assert!(matches!(
            unreadable,
            Err(Error::Validation(ValidationRejection::Unreadable(_)))
        ));

        let cleared = editor.clear_image(&m, id);
        assert!(cleared.items[0].image.is_none());
        assert_eq!(editor.clear_image(&cleared, 999), cleared);
    }
}
