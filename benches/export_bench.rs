use criterion::{criterion_group, criterion_main, Criterion};

use chrono::NaiveDate;
use laporan::model::{Amount, LineItem, ReportModel};
use laporan::rendering::layout::{layout_report, WHITE};
use laporan::rendering::paint::{build_display_list, RenderMode};
use laporan::rendering::raster::{encode_png, Rasterizer, SoftwareRasterizer};
use laporan::rendering::{render_for_export, ImageSet};
use laporan::PageGeometry;

fn model() -> ReportModel {
    let mut model = ReportModel::new(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    model.employee = "Budi".into();
    for id in 1..=3 {
        let mut item = LineItem::new(id);
        item.quantity = Amount::Count(id * 2);
        item.name = format!("Lokasi {}", id);
        model.items.push(item);
    }
    model
}

fn bench_layout(c: &mut Criterion) {
    let at = NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let model = model();
    c.bench_function("layout_report", |b| {
        b.iter(|| {
            let export = render_for_export(&model, PageGeometry::A4, at);
            let layout = layout_report(&export);
            build_display_list(&layout, &ImageSet::new(), RenderMode::Full, WHITE)
        })
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let at = NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let export = render_for_export(&model(), PageGeometry::A4, at);
    let list = build_display_list(&layout_report(&export), &ImageSet::new(), RenderMode::Full, WHITE);

    let raster = SoftwareRasterizer::default();
    let mut group = c.benchmark_group("rasterize");
    group.sample_size(10);
    group.bench_function("a4_2x", |b| {
        b.iter(|| raster.rasterize(&list, &ImageSet::new(), 2).unwrap())
    });
    group.bench_function("a4_2x_encode", |b| {
        let bitmap = raster.rasterize(&list, &ImageSet::new(), 2).unwrap();
        b.iter(|| encode_png(&bitmap).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_layout, bench_rasterize);
criterion_main!(benches);
