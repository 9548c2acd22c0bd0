//! Benchmarks for the per-scene transforms

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use greenup_algorithms::imagery::{ndvi, BandScalerMasker};
use greenup_core::{Band, GeoTransform, Raster, Scene, SceneStage, SensorProfile};

fn create_band(size: usize, base: u16) -> Raster<u16> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 2000) as u16;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn create_scene(size: usize) -> Scene {
    let gt = GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0);
    let acquired = NaiveDate::from_ymd_opt(2019, 7, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
    Scene::new("bench", "landsat8-c2-l2", acquired, gt, (size, size))
        .with_band("SR_B4", create_band(size, 8_000))
        .unwrap()
        .with_band("SR_B5", create_band(size, 20_000))
        .unwrap()
        .with_band("ST_B10", create_band(size, 40_000))
        .unwrap()
        .with_band("QA_PIXEL", create_band(size, 21_824))
        .unwrap()
        .with_band("QA_RADSAT", Raster::new(size, size).with_transform(gt))
        .unwrap()
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    for size in [256, 512, 1024] {
        let nir = Band::U16(create_band(size, 20_000));
        let red = Band::U16(create_band(size, 8_000));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&nir), black_box(&red)).unwrap())
        });
    }
    group.finish();
}

fn bench_scale_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/scale_mask");
    let stage = BandScalerMasker::from_profile(&SensorProfile::landsat8_c2_l2());
    for size in [256, 512, 1024] {
        let scene = create_scene(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| stage.apply(black_box(&scene)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_scale_mask);
criterion_main!(benches);
