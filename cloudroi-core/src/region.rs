#[cfg(feature = "serde")]
use std::convert::TryFrom;

use nalgebra::{Point2, Point3};

use crate::error::{RoiError, RoiResult};

/// Mask value marking a pixel as part of the region
pub const FOREGROUND: u8 = 255;
/// Mask value of every pixel outside of the region
pub const BACKGROUND: u8 = 0;

/// An 8-bit image marking the pixels of a region with [FOREGROUND]. Values are stored row-major and there are always
/// exactly `width * height` of them, also for masks read through serde
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBinaryMask"))]
pub struct BinaryMask {
    width: usize,
    height: usize,
    values: Vec<u8>,
}

/// Unchecked serde representation of a [BinaryMask]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawBinaryMask {
    width: usize,
    height: usize,
    values: Vec<u8>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBinaryMask> for BinaryMask {
    type Error = RoiError;

    fn try_from(raw: RawBinaryMask) -> RoiResult<Self> {
        Self::from_values(raw.width, raw.height, raw.values)
    }
}

impl BinaryMask {
    /// Creates a mask of the given size where every pixel is background
    pub fn new_background(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![BACKGROUND; width * height],
        }
    }

    /// Wraps existing row-major mask values. Fails if `values` does not hold `width * height` entries
    pub fn from_values(width: usize, height: usize, values: Vec<u8>) -> RoiResult<Self> {
        if width.checked_mul(height) != Some(values.len()) {
            return Err(RoiError::InvalidMask {
                width,
                height,
                len: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Mask value at column `u` and row `v`, `None` outside of the mask
    pub fn get(&self, u: usize, v: usize) -> Option<u8> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.values.get(v * self.width + u).copied()
    }

    /// Only the exact [FOREGROUND] value counts, any other non-zero value is background
    pub fn is_foreground(&self, u: usize, v: usize) -> bool {
        self.get(u, v) == Some(FOREGROUND)
    }

    pub fn set(&mut self, u: usize, v: usize, value: u8) {
        if u >= self.width || v >= self.height {
            return;
        }
        if let Some(pixel) = self.values.get_mut(v * self.width + u) {
            *pixel = value;
        }
    }

    /// Marks the pixels `[u_start, u_end]` of row `v` as foreground, clipped to the mask
    pub fn fill_row_span(&mut self, v: usize, u_start: usize, u_end: usize) {
        if v >= self.height || u_start >= self.width {
            return;
        }
        let u_end = u_end.min(self.width - 1);
        if u_start > u_end {
            return;
        }
        let row = v * self.width;
        if let Some(span) = self.values.get_mut(row + u_start..=row + u_end) {
            span.iter_mut().for_each(|value| *value = FOREGROUND);
        }
    }

    pub fn foreground_count(&self) -> usize {
        self.values.iter().filter(|v| **v == FOREGROUND).count()
    }
}

/// Pixel rectangle of a region of interest, as reported by 2D detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelRect {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

/// Half-open pixel range `[min_x, max_x) x [min_y, max_y)` enumerated by the rectangle path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl PixelBounds {
    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// All pixels of the range, column by column
    pub fn pixels(&self) -> impl Iterator<Item = (i64, i64)> {
        let (min_y, max_y) = (self.min_y, self.max_y);
        (self.min_x..self.max_x).flat_map(move |x| (min_y..max_y).map(move |y| (x, y)))
    }
}

impl PixelRect {
    pub fn new(x_offset: u32, y_offset: u32, width: u32, height: u32) -> Self {
        Self {
            x_offset,
            y_offset,
            width,
            height,
        }
    }

    /// Computes the pixel range covered by this rectangle after the padding adjustment.
    ///
    /// The adjustment only ever moves the minimum corner: it is moved outwards by `padding` when the
    /// offset is larger than `padding`, and moved back inwards by `padding` when the rectangle plus
    /// `padding` is narrower than the cloud. The maximum corner is never moved. This is not a symmetric
    /// dilation, and for `padding == 0` the rectangle is returned unchanged.
    /// ```
    /// # use cloudroi_core::region::{PixelBounds, PixelRect};
    /// // Offset larger than padding, rectangle spans the whole cloud: grows to the left/top only
    /// let bounds = PixelRect::new(4, 4, 8, 8).padded_bounds(2, 8, 8);
    /// assert_eq!(bounds, PixelBounds { min_x: 2, min_y: 2, max_x: 12, max_y: 12 });
    /// ```
    pub fn padded_bounds(&self, padding: u32, cloud_width: usize, cloud_height: usize) -> PixelBounds {
        let padding = i64::from(padding);
        let (min_x, max_x) = padded_axis(
            i64::from(self.x_offset),
            i64::from(self.width),
            padding,
            cloud_width as i64,
        );
        let (min_y, max_y) = padded_axis(
            i64::from(self.y_offset),
            i64::from(self.height),
            padding,
            cloud_height as i64,
        );
        PixelBounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

fn padded_axis(offset: i64, extent: i64, padding: i64, cloud_extent: i64) -> (i64, i64) {
    let mut min = offset;
    let max = offset + extent;
    if offset > padding {
        min -= padding;
    }
    if extent + padding < cloud_extent {
        min += padding;
    }
    (min, max)
}

/// Image-space description of a region of interest
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum RegionDescriptor {
    /// Pre-rendered mask, must have the resolution of the cloud
    Mask(BinaryMask),
    /// Convex polygon in pixel coordinates, vertices in boundary order
    Polygon { vertices: Vec<Point2<f64>> },
    /// Axis-aligned pixel rectangle
    Rect(PixelRect),
}

impl RegionDescriptor {
    /// Builds a polygon region from the corners of an oriented bounding box that were projected into the
    /// image. Only `x` and `y` are used and truncated to whole pixels, the way detector messages carry them
    pub fn from_bounding_box_vertices<I: IntoIterator<Item = Point3<f64>>>(vertices: I) -> Self {
        RegionDescriptor::Polygon {
            vertices: vertices
                .into_iter()
                .map(|v| Point2::new(v.x.trunc(), v.y.trunc()))
                .collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegionDescriptor::Mask(_) => "mask",
            RegionDescriptor::Polygon { .. } => "polygon",
            RegionDescriptor::Rect(_) => "rect",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_padding_keeps_rect() {
        let bounds = PixelRect::new(1, 2, 3, 2).padded_bounds(0, 640, 480);
        assert_eq!(
            bounds,
            PixelBounds {
                min_x: 1,
                min_y: 2,
                max_x: 4,
                max_y: 4
            }
        );
    }

    #[test]
    fn padding_moves_min_corner_only() {
        // offset > padding and rect + padding < cloud: both adjustments cancel out
        let bounds = PixelRect::new(10, 10, 20, 20).padded_bounds(5, 100, 100);
        assert_eq!((bounds.min_x, bounds.min_y), (10, 10));
        assert_eq!((bounds.max_x, bounds.max_y), (30, 30));

        // offset <= padding and rect + padding < cloud: minimum corner moves inwards
        let bounds = PixelRect::new(3, 5, 20, 20).padded_bounds(5, 100, 100);
        assert_eq!((bounds.min_x, bounds.min_y), (8, 10));
        assert_eq!((bounds.max_x, bounds.max_y), (23, 25));

        // offset > padding and rect + padding >= cloud: minimum corner moves outwards
        let bounds = PixelRect::new(10, 1, 95, 20).padded_bounds(5, 100, 100);
        assert_eq!((bounds.min_x, bounds.min_y), (5, 6));
        assert_eq!((bounds.max_x, bounds.max_y), (105, 21));
    }

    #[test]
    fn pixels_are_column_major() {
        let bounds = PixelBounds {
            min_x: 0,
            min_y: 0,
            max_x: 2,
            max_y: 2,
        };
        let pixels = bounds.pixels().collect::<Vec<_>>();
        assert_eq!(pixels, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!(PixelBounds {
            min_x: 3,
            min_y: 0,
            max_x: 3,
            max_y: 4
        }
        .is_empty());
    }

    #[test]
    fn mask_foreground_requires_sentinel() {
        let mut mask = BinaryMask::new_background(3, 2);
        mask.set(1, 1, 1);
        mask.set(2, 0, FOREGROUND);
        assert!(!mask.is_foreground(1, 1));
        assert!(mask.is_foreground(2, 0));
        assert!(!mask.is_foreground(5, 0));
        assert_eq!(mask.foreground_count(), 1);
    }

    #[test]
    fn fill_row_span_clips() {
        let mut mask = BinaryMask::new_background(4, 2);
        mask.fill_row_span(1, 2, 10);
        assert_eq!(mask.values(), &[0, 0, 0, 0, 0, 0, 255, 255]);
        mask.fill_row_span(5, 0, 1);
        assert_eq!(mask.foreground_count(), 2);
    }

    #[test]
    fn from_values_checks_length() {
        assert_eq!(
            BinaryMask::from_values(2, 2, vec![0; 3]),
            Err(RoiError::InvalidMask {
                width: 2,
                height: 2,
                len: 3
            })
        );
        assert!(BinaryMask::from_values(2, 2, vec![0; 4]).is_ok());
    }

    #[test]
    fn bounding_box_vertices_are_truncated() {
        let region = RegionDescriptor::from_bounding_box_vertices(vec![
            Point3::new(1.7, 2.2, 0.5),
            Point3::new(3.9, 0.1, 0.5),
        ]);
        assert_eq!(
            region,
            RegionDescriptor::Polygon {
                vertices: vec![Point2::new(1.0, 2.0), Point2::new(3.0, 0.0)]
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn region_from_json() {
        let region: RegionDescriptor =
            serde_json::from_str(r#"{"type": "rect", "x_offset": 1, "y_offset": 2, "width": 3, "height": 4}"#)
                .unwrap();
        assert_eq!(region, RegionDescriptor::Rect(PixelRect::new(1, 2, 3, 4)));

        let region: RegionDescriptor =
            serde_json::from_str(r#"{"type": "polygon", "vertices": [[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]]}"#)
                .unwrap();
        assert_eq!(region.name(), "polygon");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn mask_from_json_is_validated() {
        let region: RegionDescriptor = serde_json::from_str(
            r#"{"type": "mask", "width": 2, "height": 2, "values": [255, 0, 0, 255]}"#,
        )
        .unwrap();
        match region {
            RegionDescriptor::Mask(mask) => assert_eq!(mask.foreground_count(), 2),
            other => panic!("expected a mask, got {:?}", other),
        }

        let short = serde_json::from_str::<RegionDescriptor>(
            r#"{"type": "mask", "width": 4, "height": 4, "values": [255, 255]}"#,
        );
        assert!(short.is_err());
        assert!(serde_json::from_str::<BinaryMask>(r#"{"width": 4, "height": 4, "values": [0]}"#).is_err());
    }
}
