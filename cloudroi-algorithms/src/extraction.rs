use cloudroi_core::{
    cloud::{ExtractedCloud, StructuredCloud},
    config::RoiConfig,
    nalgebra::Point2,
    region::{BinaryMask, PixelRect, RegionDescriptor},
    RoiError, RoiResult,
};
use log::{debug, error};

use crate::mask::fill_convex_polygon;
use crate::outliers::StatisticalOutlierFilter;

/// Parameters of a region-of-interest extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionOptions {
    /// Adjustment of the minimum corner of rectangle regions, see [PixelRect::padded_bounds]
    pub padding_adjustment: u32,
    /// Filter applied to the extracted points, `None` keeps all of them
    pub outlier_filter: Option<StatisticalOutlierFilter>,
}

impl ExtractionOptions {
    pub fn new(padding_adjustment: u32, remove_outliers: bool) -> Self {
        Self {
            padding_adjustment,
            outlier_filter: if remove_outliers {
                Some(StatisticalOutlierFilter::default())
            } else {
                None
            },
        }
    }

    /// Options as configured in `config`, including its outlier filter parameters
    pub fn from_config(config: &RoiConfig) -> Self {
        Self {
            padding_adjustment: config.padding_adjustment,
            outlier_filter: if config.remove_outliers {
                Some(StatisticalOutlierFilter::new(
                    config.outlier_mean_k,
                    config.outlier_std_dev_mul,
                ))
            } else {
                None
            },
        }
    }
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::new(0, false)
    }
}

/// Extracts all valid points of `cloud` that lie inside `region`. The extracted cloud carries the header of `cloud`.
///
/// Masks and polygons are evaluated per pixel of the cloud. Rectangles are enumerated directly after the
/// `padding_adjustment` has been applied to them, and fail with `PixelOutOfRange` as soon as a pixel outside of the
/// cloud is reached. Points with a NaN coordinate or color channel are skipped on all paths. If `remove_outliers`
/// is set, a [StatisticalOutlierFilter] with default parameters is applied to a non-empty result.
///
/// Fails with `UnorganizedCloud` if the width or height of `cloud` is not larger than one.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use cloudroi_algorithms::extraction::extract_roi;
/// # use cloudroi_core::{cloud::*, nalgebra::Vector3, region::*};
/// let point = ColoredPoint::new(Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 1.0, 1.0));
/// let cloud = StructuredCloud::filled(4, 4, point, CloudHeader::new("camera", Duration::ZERO, 7));
///
/// let roi = extract_roi(&cloud, &RegionDescriptor::Rect(PixelRect::new(1, 1, 2, 3)), 0, false).unwrap();
/// assert_eq!(roi.len(), 6);
/// assert_eq!(roi.header.frame_id, "camera");
/// assert_eq!(roi.header.sequence, 7);
/// ```
pub fn extract_roi(
    cloud: &StructuredCloud,
    region: &RegionDescriptor,
    padding_adjustment: u32,
    remove_outliers: bool,
) -> RoiResult<ExtractedCloud> {
    extract_roi_with(
        cloud,
        region,
        &ExtractionOptions::new(padding_adjustment, remove_outliers),
    )
}

/// Like [extract_roi], with an explicitly configured outlier filter
pub fn extract_roi_with(
    cloud: &StructuredCloud,
    region: &RegionDescriptor,
    options: &ExtractionOptions,
) -> RoiResult<ExtractedCloud> {
    ensure_organized(cloud)?;
    let mut extracted = match region {
        RegionDescriptor::Mask(mask) => {
            ensure_mask_matches(cloud, mask)?;
            collect_masked(cloud, mask)
        }
        RegionDescriptor::Polygon { vertices } => collect_polygon(cloud, vertices),
        RegionDescriptor::Rect(rect) => collect_rect(cloud, rect, options.padding_adjustment)?,
    };
    debug!(
        "Extracted {} points from {} region of a {}x{} cloud",
        extracted.len(),
        region.name(),
        cloud.width(),
        cloud.height()
    );
    apply_outlier_filter(&mut extracted, options.outlier_filter.as_ref());
    Ok(extracted)
}

/// Extracts the valid points of all pixels marked as foreground in `mask`. `mask` must have the resolution of `cloud`
pub fn extract_masked(
    cloud: &StructuredCloud,
    mask: &BinaryMask,
    remove_outliers: bool,
) -> RoiResult<ExtractedCloud> {
    ensure_organized(cloud)?;
    ensure_mask_matches(cloud, mask)?;
    let mut extracted = collect_masked(cloud, mask);
    apply_outlier_filter(&mut extracted, default_filter(remove_outliers).as_ref());
    Ok(extracted)
}

/// Extracts the valid points inside the convex polygon spanned by `vertices` (pixel coordinates)
pub fn extract_polygon(
    cloud: &StructuredCloud,
    vertices: &[Point2<f64>],
    remove_outliers: bool,
) -> RoiResult<ExtractedCloud> {
    ensure_organized(cloud)?;
    let mut extracted = collect_polygon(cloud, vertices);
    apply_outlier_filter(&mut extracted, default_filter(remove_outliers).as_ref());
    Ok(extracted)
}

/// Extracts the valid points inside `rect` after applying `padding_adjustment`. Fails with `PixelOutOfRange` if the
/// adjusted rectangle reaches past the cloud
pub fn extract_rect(
    cloud: &StructuredCloud,
    rect: &PixelRect,
    padding_adjustment: u32,
    remove_outliers: bool,
) -> RoiResult<ExtractedCloud> {
    ensure_organized(cloud)?;
    let mut extracted = collect_rect(cloud, rect, padding_adjustment)?;
    apply_outlier_filter(&mut extracted, default_filter(remove_outliers).as_ref());
    Ok(extracted)
}

fn ensure_organized(cloud: &StructuredCloud) -> RoiResult<()> {
    cloud.ensure_organized().map_err(|e| {
        error!(
            "Pointcloud input height is {} and width is {}",
            cloud.height(),
            cloud.width()
        );
        e
    })
}

fn ensure_mask_matches(cloud: &StructuredCloud, mask: &BinaryMask) -> RoiResult<()> {
    if mask.dimensions() == (cloud.width(), cloud.height()) {
        return Ok(());
    }
    error!(
        "Mask resolution {}x{} does not match point cloud resolution {}x{}",
        mask.width(),
        mask.height(),
        cloud.width(),
        cloud.height()
    );
    Err(RoiError::DimensionMismatch {
        expected: (cloud.width(), cloud.height()),
        actual: mask.dimensions(),
    })
}

fn default_filter(remove_outliers: bool) -> Option<StatisticalOutlierFilter> {
    if remove_outliers {
        Some(StatisticalOutlierFilter::default())
    } else {
        None
    }
}

fn apply_outlier_filter(extracted: &mut ExtractedCloud, filter: Option<&StatisticalOutlierFilter>) {
    let filter = match filter {
        Some(filter) => filter,
        None => return,
    };
    if extracted.is_empty() {
        return;
    }
    let before = extracted.len();
    filter.filter_in_place(&mut extracted.points);
    debug!(
        "Outlier removal kept {} of {} points",
        extracted.len(),
        before
    );
}

/// Walks the cloud column by column and collects the valid points of foreground pixels.
/// The mask must have the cloud's resolution
fn collect_masked(cloud: &StructuredCloud, mask: &BinaryMask) -> ExtractedCloud {
    let mut extracted = ExtractedCloud::new(cloud.header.clone());
    for u in 0..cloud.width() {
        for v in 0..cloud.height() {
            if !mask.is_foreground(u, v) {
                continue;
            }
            if let Some(point) = cloud.at(u, v) {
                if point.is_valid() {
                    extracted.points.push(*point);
                }
            }
        }
    }
    extracted
}

fn collect_polygon(cloud: &StructuredCloud, vertices: &[Point2<f64>]) -> ExtractedCloud {
    let mut mask = BinaryMask::new_background(cloud.width(), cloud.height());
    fill_convex_polygon(&mut mask, vertices);
    collect_masked(cloud, &mask)
}

fn collect_rect(
    cloud: &StructuredCloud,
    rect: &PixelRect,
    padding_adjustment: u32,
) -> RoiResult<ExtractedCloud> {
    let bounds = rect.padded_bounds(padding_adjustment, cloud.width(), cloud.height());
    let mut extracted = ExtractedCloud::new(cloud.header.clone());
    for (x, y) in bounds.pixels() {
        let (u, v) = checked_pixel(x, y, cloud.width(), cloud.height())?;
        if let Some(point) = cloud.at(u, v) {
            if point.is_valid() {
                extracted.points.push(*point);
            }
        }
    }
    Ok(extracted)
}

/// Converts a signed pixel location into grid indices, failing for locations outside of a `width x height` grid
pub(crate) fn checked_pixel(x: i64, y: i64, width: usize, height: usize) -> RoiResult<(usize, usize)> {
    if x < 0 || y < 0 || x as u64 >= width as u64 || y as u64 >= height as u64 {
        error!("Pixel location ({}, {}) is out of range.", x, y);
        return Err(RoiError::PixelOutOfRange {
            x,
            y,
            width,
            height,
        });
    }
    Ok((x as usize, y as usize))
}
