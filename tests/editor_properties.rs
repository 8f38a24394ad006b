use std::collections::HashSet;

use laporan::{
    Amount, EditorConfig, Error, FormEditor, ItemField, QuantityMode, ReportField, ReportModel, SummaryMode,
    ValidationRejection,
};

/// Small deterministic generator so the operation sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn run_sequence(editor: &FormEditor, seed: u64, steps: usize) {
    let mut rng = Lcg(seed);
    let mut model = ReportModel::default();
    let mut ever_seen = HashSet::new();

    for _ in 0..steps {
        let before = model.clone();
        match rng.next() % 4 {
            0 | 1 => {
                model = editor.add_item(&model);
                let id = model.items.last().unwrap().id;
                assert!(ever_seen.insert(id), "id {} was handed out twice", id);
            }
            2 if !model.items.is_empty() => {
                let idx = (rng.next() as usize) % model.items.len();
                let id = model.items[idx].id;
                model = editor.remove_item(&model, id);
                assert!(model.item(id).is_none());
            }
            _ if !model.items.is_empty() => {
                let idx = (rng.next() as usize) % model.items.len();
                let id = model.items[idx].id;
                let value = (rng.next() % 50).to_string();
                model = editor.update_item(&model, id, ItemField::Quantity, &value).unwrap();
            }
            _ => continue,
        }

        // Surviving items keep their ids and their relative order.
        let survivors: Vec<u64> = before
            .items
            .iter()
            .map(|i| i.id)
            .filter(|id| model.item(*id).is_some())
            .collect();
        let now: Vec<u64> = model
            .items
            .iter()
            .map(|i| i.id)
            .filter(|id| before.item(*id).is_some())
            .collect();
        assert_eq!(survivors, now);

        let ids: HashSet<u64> = model.items.iter().map(|i| i.id).collect();
        assert_eq!(ids.len(), model.items.len());

        if editor.config().summary_mode == SummaryMode::Derived {
            let sum: u64 = model.items.iter().map(|i| i.quantity.value()).sum();
            assert_eq!(model.summary.total, Amount::Count(sum));
        }
    }
}

#[test]
fn ids_stay_unique_and_total_tracks_items() {
    let editor = FormEditor::default();
    for seed in [1, 7, 42, 2026] {
        run_sequence(&editor, seed, 200);
    }
}

#[test]
fn free_text_quantities_coerce_for_totals() {
    let editor = FormEditor::new(EditorConfig {
        quantity_mode: QuantityMode::FreeText,
        ..Default::default()
    });
    let m = editor.add_item(&ReportModel::default());
    let m = editor.add_item(&m);
    let (a, b) = (m.items[0].id, m.items[1].id);
    let m = editor.update_item(&m, a, ItemField::Quantity, "12").unwrap();
    let m = editor.update_item(&m, b, ItemField::Quantity, "banyak").unwrap();
    assert_eq!(m.items[1].quantity, Amount::Text("banyak".into()));
    assert_eq!(m.summary.total, Amount::Count(12));
}

#[test]
fn strict_mode_rejects_without_touching_model() {
    let editor = FormEditor::default();
    let m = editor.add_item(&ReportModel::default());
    let id = m.items[0].id;
    let err = editor.update_item(&m, id, ItemField::Quantity, "-3").unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationRejection::InvalidQuantity(_))
    ));
    assert_eq!(m.items[0].quantity, Amount::Count(0));
}

#[test]
fn removing_unknown_id_is_a_no_op() {
    let editor = FormEditor::default();
    let m = editor.add_item(&ReportModel::default());
    assert_eq!(editor.remove_item(&m, 9999), m);
}

#[test]
fn free_entry_summary_accepts_manual_total() {
    let editor = FormEditor::new(EditorConfig {
        summary_mode: SummaryMode::FreeEntry,
        ..Default::default()
    });
    let m = editor.update_field(&ReportModel::default(), ReportField::Total, "17").unwrap();
    let m = editor.add_item(&m);
    assert_eq!(m.summary.total, Amount::Count(17));

    let derived = FormEditor::default();
    assert!(matches!(
        derived.update_field(&m, ReportField::Total, "3"),
        Err(Error::Validation(ValidationRejection::DerivedField(_)))
    ));
}

#[tokio::test]
async fn oversized_image_is_rejected_before_decoding() {
    let editor = FormEditor::new(EditorConfig {
        max_image_bytes: 16,
        ..Default::default()
    });
    let m = editor.add_item(&ReportModel::default());
    let id = m.items[0].id;
    let err = editor.attach_image(&m, id, &[0u8; 17]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationRejection::TooLarge { size: 17, max: 16 })
    ));
    assert!(m.items[0].image.is_none());
}
