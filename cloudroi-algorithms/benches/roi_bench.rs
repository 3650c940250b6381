use std::time::Duration;

use cloudroi_algorithms::{extraction, outliers::StatisticalOutlierFilter};
use cloudroi_core::{
    cloud::{CloudHeader, ColoredPoint, StructuredCloud},
    nalgebra::{Point2, Vector3},
    region::{PixelRect, RegionDescriptor},
};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{distributions::Uniform, thread_rng, Rng};

const CLOUD_SIZES: [(&str, usize, usize); 3] = [
    ("qvga", 320, 240),
    ("vga", 640, 480),
    ("hd", 1280, 720),
];

fn random_point<R: Rng + ?Sized>(rng: &mut R) -> ColoredPoint {
    if rng.gen_bool(0.1) {
        return ColoredPoint::invalid();
    }
    ColoredPoint::new(
        Vector3::new(
            rng.sample(Uniform::new(-1.0, 1.0)),
            rng.sample(Uniform::new(-1.0, 1.0)),
            rng.sample(Uniform::new(0.3, 4.0)),
        ),
        Vector3::new(rng.gen(), rng.gen(), rng.gen()),
    )
}

fn get_dummy_cloud(width: usize, height: usize) -> StructuredCloud {
    let mut rng = thread_rng();
    let points = (0..width * height).map(|_| random_point(&mut rng)).collect();
    StructuredCloud::new(
        width,
        height,
        points,
        CloudHeader::new("camera", Duration::ZERO, 0),
    )
    .unwrap()
}

fn bench(c: &mut Criterion) {
    for (name, width, height) in CLOUD_SIZES.iter() {
        let cloud = get_dummy_cloud(*width, *height);
        let rect = RegionDescriptor::Rect(PixelRect::new(
            (*width / 4) as u32,
            (*height / 4) as u32,
            (*width / 2) as u32,
            (*height / 2) as u32,
        ));
        let polygon = RegionDescriptor::Polygon {
            vertices: vec![
                Point2::new(*width as f64 / 2.0, 0.0),
                Point2::new(*width as f64 - 1.0, *height as f64 / 2.0),
                Point2::new(*width as f64 / 2.0, *height as f64 - 1.0),
                Point2::new(0.0, *height as f64 / 2.0),
            ],
        };

        c.bench_function(&format!("extract_rect_{}", name), |b| {
            b.iter(|| extraction::extract_roi(&cloud, &rect, 0, false))
        });
        c.bench_function(&format!("extract_polygon_{}", name), |b| {
            b.iter(|| extraction::extract_roi(&cloud, &polygon, 0, false))
        });
    }

    let cloud = get_dummy_cloud(160, 120);
    let points = cloud
        .points()
        .iter()
        .copied()
        .filter(ColoredPoint::is_valid)
        .collect::<Vec<_>>();
    let filter = StatisticalOutlierFilter::default();
    c.bench_function("outlier_removal_serial", |b| {
        b.iter(|| filter.inlier_indices(&points))
    });
    c.bench_function("outlier_removal_parallel", |b| {
        b.iter(|| filter.inlier_indices_par(&points))
    });
}

criterion_group! {
    name = roi;
    config = Criterion::default().sample_size(20);
    targets = bench
}
criterion_main!(roi);
