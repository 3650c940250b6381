#![warn(clippy::all)]

//! Core data structures for extracting regions of interest from organized point clouds
//!
//! An organized cloud ([StructuredCloud](crate::cloud::StructuredCloud)) stores one point per image pixel
//! of an RGB-D camera, so that image-space regions ([RegionDescriptor](crate::region::RegionDescriptor))
//! can be mapped to their 3D points in constant time per pixel. The algorithms operating on these types
//! live in the `cloudroi-algorithms` crate.

pub extern crate nalgebra;

/// Point and cloud types
pub mod cloud;
/// Runtime configuration of the pipeline
#[cfg(feature = "serde")]
pub mod config;
mod error;
pub use self::error::{RoiError, RoiResult};
/// Useful mathematical tools when working with point cloud data
pub mod math;
/// Image-space region descriptions: masks, polygons and pixel rectangles
pub mod region;
