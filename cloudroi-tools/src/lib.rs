#![warn(clippy::all)]
//! Input and output helpers of the cloudroi command line tools

/// Reading and writing organized clouds as text
pub mod ascii;
pub mod static_transforms;
