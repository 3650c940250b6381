use std::time::Duration;

use nalgebra::{Point3, Vector3};

use crate::error::{RoiError, RoiResult};
use crate::math::AABB;

/// A single point of an RGB-D cloud: position in world units and an RGB color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Vector3<f64>,
    pub color: Vector3<f32>,
}

impl ColoredPoint {
    pub fn new(position: Vector3<f64>, color: Vector3<f32>) -> Self {
        Self { position, color }
    }

    /// Creates the point that a depth camera reports for a pixel without a depth measurement
    pub fn invalid() -> Self {
        Self {
            position: Vector3::new(f64::NAN, f64::NAN, f64::NAN),
            color: Vector3::new(f32::NAN, f32::NAN, f32::NAN),
        }
    }

    /// A point is valid if none of its coordinates or color channels is NaN
    /// ```
    /// # use cloudroi_core::cloud::ColoredPoint;
    /// # use nalgebra::Vector3;
    /// let mut point = ColoredPoint::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.5, 0.5, 0.5));
    /// assert!(point.is_valid());
    /// point.color.y = f32::NAN;
    /// assert!(!point.is_valid());
    /// ```
    pub fn is_valid(&self) -> bool {
        !(self.position.x.is_nan()
            || self.position.y.is_nan()
            || self.position.z.is_nan()
            || self.color.x.is_nan()
            || self.color.y.is_nan()
            || self.color.z.is_nan())
    }

    pub fn position_array(&self) -> [f64; 3] {
        [self.position.x, self.position.y, self.position.z]
    }
}

/// Metadata that travels with a cloud: the frame its coordinates are expressed in, the capture
/// time and the sensor sequence number
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CloudHeader {
    pub frame_id: String,
    pub stamp: Duration,
    pub sequence: u32,
}

impl CloudHeader {
    pub fn new<S: Into<String>>(frame_id: S, stamp: Duration, sequence: u32) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp,
            sequence,
        }
    }
}

/// An organized point cloud with one point per image pixel, stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredCloud {
    width: usize,
    height: usize,
    points: Vec<ColoredPoint>,
    pub header: CloudHeader,
}

impl StructuredCloud {
    /// Creates a new cloud from row-major `points`. Fails if `points` does not hold exactly
    /// `width * height` entries
    pub fn new(
        width: usize,
        height: usize,
        points: Vec<ColoredPoint>,
        header: CloudHeader,
    ) -> RoiResult<Self> {
        if width.checked_mul(height) != Some(points.len()) {
            return Err(RoiError::InvalidCloud(format!(
                "{} points cannot form a {}x{} grid",
                points.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            points,
            header,
        })
    }

    /// Creates a cloud where every pixel holds `point`
    pub fn filled(width: usize, height: usize, point: ColoredPoint, header: CloudHeader) -> Self {
        Self {
            width,
            height,
            points: vec![point; width * height],
            header,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ColoredPoint] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [ColoredPoint] {
        &mut self.points
    }

    /// Returns the point at pixel column `u` and row `v`, or `None` outside of the grid
    pub fn at(&self, u: usize, v: usize) -> Option<&ColoredPoint> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.points.get(v * self.width + u)
    }

    pub fn at_mut(&mut self, u: usize, v: usize) -> Option<&mut ColoredPoint> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.points.get_mut(v * self.width + u)
    }

    /// A cloud is organized if both of its dimensions are larger than one
    pub fn is_organized(&self) -> bool {
        self.width > 1 && self.height > 1
    }

    /// Like [is_organized](StructuredCloud::is_organized), but returns the matching error
    pub fn ensure_organized(&self) -> RoiResult<()> {
        if self.is_organized() {
            Ok(())
        } else {
            Err(RoiError::UnorganizedCloud {
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn valid_point_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_valid()).count()
    }
}

/// The valid points of a cloud that fell inside a region of interest. The grid structure is lost,
/// points are stored in the scan order of the extraction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedCloud {
    pub header: CloudHeader,
    pub points: Vec<ColoredPoint>,
}

impl ExtractedCloud {
    pub fn new(header: CloudHeader) -> Self {
        Self {
            header,
            points: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColoredPoint> {
        self.points.iter()
    }

    /// Bounding box of the extracted positions, `None` if no point was extracted
    pub fn bounds(&self) -> Option<AABB<f64>> {
        let first = self.points.first()?;
        let first = Point3::from(first.position);
        Some(self.points.iter().skip(1).fold(
            AABB::from_min_max_unchecked(first, first),
            |bounds, point| AABB::extend_with_point(&bounds, &Point3::from(point.position)),
        ))
    }

    /// Mean position of the extracted points
    pub fn centroid(&self) -> Option<Vector3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, point| acc + point.position);
        Some(sum / self.points.len() as f64)
    }
}
