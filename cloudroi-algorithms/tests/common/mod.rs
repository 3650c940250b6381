use std::time::Duration;

use cloudroi_core::{
    cloud::{CloudHeader, ColoredPoint, StructuredCloud},
    nalgebra::Vector3,
};
use rand::{distributions::Uniform, prelude::Distribution, Rng};

/// Points in front of a camera, a share of them invalid the way depth sensors report missing measurements
pub struct TestDepthPointDistribution {
    pub invalid_ratio: f64,
}

impl Distribution<ColoredPoint> for TestDepthPointDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ColoredPoint {
        if rng.gen_bool(self.invalid_ratio) {
            return ColoredPoint::invalid();
        }
        let mut point = ColoredPoint::new(
            Vector3::new(
                rng.sample(Uniform::new(-1.0, 1.0)),
                rng.sample(Uniform::new(-1.0, 1.0)),
                rng.sample(Uniform::new(0.3, 4.0)),
            ),
            Vector3::new(rng.gen(), rng.gen(), rng.gen()),
        );
        // a single broken channel is enough to invalidate a point
        if rng.gen_bool(self.invalid_ratio / 2.0) {
            match rng.gen_range(0..6) {
                0 => point.position.x = f64::NAN,
                1 => point.position.y = f64::NAN,
                2 => point.position.z = f64::NAN,
                3 => point.color.x = f32::NAN,
                4 => point.color.y = f32::NAN,
                _ => point.color.z = f32::NAN,
            }
        }
        point
    }
}

pub fn random_cloud<R: Rng + ?Sized>(
    rng: &mut R,
    width: usize,
    height: usize,
    invalid_ratio: f64,
) -> StructuredCloud {
    let points = rng
        .sample_iter(TestDepthPointDistribution { invalid_ratio })
        .take(width * height)
        .collect();
    StructuredCloud::new(
        width,
        height,
        points,
        CloudHeader::new("camera_depth_optical_frame", Duration::from_millis(1500), 3),
    )
    .expect("Point count matches the grid")
}

/// Cloud of valid points where the point at pixel (u, v) sits at (u, v, 1)
pub fn pixel_grid_cloud(width: usize, height: usize) -> StructuredCloud {
    let mut points = Vec::with_capacity(width * height);
    for v in 0..height {
        for u in 0..width {
            points.push(ColoredPoint::new(
                Vector3::new(u as f64, v as f64, 1.0),
                Vector3::new(0.0, 0.5, 1.0),
            ));
        }
    }
    StructuredCloud::new(
        width,
        height,
        points,
        CloudHeader::new("camera_depth_optical_frame", Duration::ZERO, 0),
    )
    .expect("Point count matches the grid")
}

pub fn contains_point(points: &[ColoredPoint], point: &ColoredPoint) -> bool {
    points
        .iter()
        .any(|p| p.position == point.position && p.color == point.color)
}
