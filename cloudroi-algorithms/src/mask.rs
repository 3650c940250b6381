use cloudroi_core::{
    nalgebra::Point2,
    region::{BinaryMask, PixelRect, RegionDescriptor},
    RoiError, RoiResult,
};
use log::error;

use crate::extraction::checked_pixel;

/// Tolerance for pixel centers lying on a polygon edge
const EDGE_EPSILON: f64 = 1e-9;

/// Converts `region` into a binary mask of `width x height` pixels.
///
/// * Masks are returned unchanged if their resolution is `width x height`, otherwise this fails with
///   `DimensionMismatch`
/// * Polygons are rasterized with [fill_convex_polygon]
/// * Rectangles are rasterized without padding adjustment. They must lie inside the grid, a rectangle that
///   reaches past it fails with `PixelOutOfRange`, the same way the rectangle extraction path does
///
/// # Examples
///
/// ```
/// # use cloudroi_algorithms::mask::build_mask;
/// # use cloudroi_core::region::{PixelRect, RegionDescriptor};
/// let mask = build_mask(&RegionDescriptor::Rect(PixelRect::new(1, 1, 2, 2)), 4, 4).unwrap();
/// assert_eq!(mask.foreground_count(), 4);
/// assert!(mask.is_foreground(2, 2));
/// assert!(!mask.is_foreground(3, 3));
/// ```
pub fn build_mask(region: &RegionDescriptor, width: usize, height: usize) -> RoiResult<BinaryMask> {
    match region {
        RegionDescriptor::Mask(mask) => {
            if mask.dimensions() != (width, height) {
                error!(
                    "Mask resolution is {}x{} but {}x{} is required",
                    mask.width(),
                    mask.height(),
                    width,
                    height
                );
                return Err(RoiError::DimensionMismatch {
                    expected: (width, height),
                    actual: mask.dimensions(),
                });
            }
            Ok(mask.clone())
        }
        RegionDescriptor::Polygon { vertices } => {
            let mut mask = BinaryMask::new_background(width, height);
            fill_convex_polygon(&mut mask, vertices);
            Ok(mask)
        }
        RegionDescriptor::Rect(rect) => rect_mask(rect, width, height),
    }
}

fn rect_mask(rect: &PixelRect, width: usize, height: usize) -> RoiResult<BinaryMask> {
    let mut mask = BinaryMask::new_background(width, height);
    for (x, y) in rect.padded_bounds(0, width, height).pixels() {
        let (u, v) = checked_pixel(x, y, width, height)?;
        mask.fill_row_span(v, u, u);
    }
    Ok(mask)
}

/// Fills the convex polygon given by `vertices` into `mask`, leaving all other pixels untouched.
///
/// The center of pixel `(u, v)` is the image coordinate `(u, v)`. A pixel is filled if its center lies inside
/// the polygon or on its boundary. Vertices are connected in the given order and the last vertex is connected to
/// the first one. The polygon must be simple and convex: for self-intersecting or concave input each row is filled
/// between its outermost edge crossings, which is not the polygon's interior. Polygons with non-finite vertices
/// fill nothing.
///
/// Works row by row: every row between the topmost and bottommost vertex is intersected with all polygon edges and
/// the span between the leftmost and rightmost crossing is filled.
pub fn fill_convex_polygon(mask: &mut BinaryMask, vertices: &[Point2<f64>]) {
    if vertices.is_empty() || mask.width() == 0 || mask.height() == 0 {
        return;
    }
    if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
        return;
    }

    let (min_y, max_y) = vertices
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v.y), hi.max(v.y)));
    let first_row = (min_y - EDGE_EPSILON).ceil().max(0.0);
    let last_row = (max_y + EDGE_EPSILON)
        .floor()
        .min((mask.height() - 1) as f64);
    if first_row > last_row {
        return;
    }

    for v in first_row as usize..=last_row as usize {
        if let Some((x_min, x_max)) = row_crossings(vertices, v as f64) {
            let u_start = (x_min - EDGE_EPSILON).ceil().max(0.0);
            let u_end = (x_max + EDGE_EPSILON).floor();
            if u_end < 0.0 || u_start > u_end {
                continue;
            }
            mask.fill_row_span(v, u_start as usize, u_end as usize);
        }
    }
}

/// Leftmost and rightmost x coordinate where the horizontal line at `y` meets the polygon boundary
fn row_crossings(vertices: &[Point2<f64>], y: f64) -> Option<(f64, f64)> {
    let mut crossings: Option<(f64, f64)> = None;
    let mut add = |x: f64| {
        crossings = Some(match crossings {
            None => (x, x),
            Some((lo, hi)) => (lo.min(x), hi.max(x)),
        });
    };

    for (idx, a) in vertices.iter().enumerate() {
        let b = &vertices[(idx + 1) % vertices.len()];
        let (low, high) = if a.y <= b.y { (a, b) } else { (b, a) };
        if y < low.y - EDGE_EPSILON || y > high.y + EDGE_EPSILON {
            continue;
        }
        if high.y - low.y < EDGE_EPSILON {
            // horizontal edge lying on this row
            add(low.x);
            add(high.x);
        } else {
            let t = ((y - low.y) / (high.y - low.y)).max(0.0).min(1.0);
            add(low.x + t * (high.x - low.x));
        }
    }

    crossings
}
