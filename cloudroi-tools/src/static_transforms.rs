use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use cloudroi_algorithms::transform::TransformBuffer;
use cloudroi_core::nalgebra::{Isometry3, Translation3, UnitQuaternion};
use serde::Deserialize;

/// Fixed transform between two frames, as listed in a transforms file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaticTransform {
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub translation: [f64; 3],
    /// Roll, pitch and yaw in radians
    #[serde(default)]
    pub rotation: [f64; 3],
}

impl StaticTransform {
    /// Maps coordinates of the child frame into the parent frame
    pub fn isometry(&self) -> Isometry3<f64> {
        let [x, y, z] = self.translation;
        let [roll, pitch, yaw] = self.rotation;
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        )
    }
}

pub fn parse_static_transforms(json: &str) -> Result<Vec<StaticTransform>> {
    Ok(serde_json::from_str(json)?)
}

/// Reads a JSON list of static transforms into a new [TransformBuffer]
pub fn load_transform_buffer<P: AsRef<Path>>(path: P) -> Result<TransformBuffer> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Could not open transforms file {}", path.display()))?;
    let transforms: Vec<StaticTransform> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Could not parse transforms file {}", path.display()))?;
    transform_buffer_from(&transforms)
}

pub fn transform_buffer_from(transforms: &[StaticTransform]) -> Result<TransformBuffer> {
    let buffer = TransformBuffer::new();
    for transform in transforms {
        buffer
            .set_transform(
                &transform.parent,
                &transform.child,
                Duration::ZERO,
                transform.isometry(),
            )
            .with_context(|| {
                format!(
                    "Invalid transform from '{}' to '{}'",
                    transform.child, transform.parent
                )
            })?;
    }
    Ok(buffer)
}
