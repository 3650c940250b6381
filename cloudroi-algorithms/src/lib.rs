#![warn(clippy::all)]
//! Algorithms that operate on organized point clouds.
//!
//! Extracts the points behind an image-space region, removes statistical outliers from the result and moves clouds
//! between coordinate frames.

// Maps masks, convex polygons and pixel rectangles onto the pixels of an organized cloud and collects their points.
pub mod extraction;
// Rasterizes region descriptions into binary masks.
pub mod mask;
// Statistical outlier removal based on the mean distance of each point to its nearest neighbours, in serial and parallel.
pub mod outliers;
// Bounded waiting on a value that becomes available asynchronously, with a ready / timed-out / not-ready result.
pub mod polling;
// Rate limiting of error messages emitted at sensor frame rate.
pub mod throttle;
// Frame transforms of whole clouds through a pluggable transform provider.
pub mod transform;
