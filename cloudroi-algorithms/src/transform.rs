use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use cloudroi_core::{
    cloud::{CloudHeader, ColoredPoint, ExtractedCloud, StructuredCloud},
    config::RoiConfig,
    nalgebra::{Isometry3, Point3},
    RoiError, RoiResult,
};
use log::debug;
use rayon::prelude::*;

use crate::polling::{wait_for, PollStatus, Readiness};
use crate::throttle::LogThrottle;

/// Source of rigid transforms between named coordinate frames.
///
/// `lookup_transform(target, source, time)` returns the transform that maps coordinates expressed in `source` into
/// `target`. A `time` of zero means "latest available".
pub trait TransformProvider: Send + Sync {
    /// The most recent time at which the transform between the two frames is known. Fails if one of the frames is
    /// unknown or the frames are not connected
    fn latest_common_time(&self, target_frame: &str, source_frame: &str) -> Result<Duration>;
    /// Whether the transform at `time` can be looked up right now
    fn readiness(&self, target_frame: &str, source_frame: &str, time: Duration) -> Readiness;
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        time: Duration,
    ) -> Result<Isometry3<f64>>;

    /// Transforms a single point from `source_frame` into `target_frame`
    fn apply(
        &self,
        target_frame: &str,
        source_frame: &str,
        time: Duration,
        point: &Point3<f64>,
    ) -> Result<Point3<f64>> {
        Ok(self.lookup_transform(target_frame, source_frame, time)? * point)
    }
}

/// Default time to wait for a transform to become available
pub const DEFAULT_TRANSFORM_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Moves clouds into other coordinate frames using a [TransformProvider].
///
/// Waiting for the transform is the only blocking operation and is bounded by the configured timeout. All failures are
/// returned as errors (`TransformListenerUnset` without a provider, `TransformUnavailable` for everything the provider
/// cannot deliver) and logged at error level, at most once per throttle period, since transforms are usually requested
/// at the frame rate of the sensor.
pub struct FrameTransformer {
    provider: Option<Arc<dyn TransformProvider>>,
    timeout: Duration,
    poll_interval: Duration,
    missing_provider_log: LogThrottle,
    failure_log: LogThrottle,
}

impl FrameTransformer {
    pub fn new(provider: Option<Arc<dyn TransformProvider>>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TRANSFORM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            missing_provider_log: LogThrottle::default(),
            failure_log: LogThrottle::default(),
        }
    }

    pub fn from_config(config: &RoiConfig, provider: Option<Arc<dyn TransformProvider>>) -> Self {
        Self::new(provider)
            .with_timeout(config.transform_timeout())
            .with_poll_interval(config.transform_poll_interval())
            .with_error_throttle(config.error_throttle_period())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_error_throttle(mut self, period: Duration) -> Self {
        self.missing_provider_log = LogThrottle::new(period);
        self.failure_log = LogThrottle::new(period);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transforms every point of `cloud` into `target_frame`. Width, height and the order of the points are kept,
    /// invalid points stay invalid. The result is stamped with the time of the transform that was used
    pub fn transform(
        &self,
        cloud: &StructuredCloud,
        target_frame: &str,
    ) -> RoiResult<StructuredCloud> {
        let (transform, header) = self.resolve(&cloud.header, target_frame)?;
        let mut transformed = cloud.clone();
        transformed.header = header;
        transform_points(transformed.points_mut(), &transform);
        Ok(transformed)
    }

    /// Same as [transform](FrameTransformer::transform) for extracted regions
    pub fn transform_extracted(
        &self,
        cloud: &ExtractedCloud,
        target_frame: &str,
    ) -> RoiResult<ExtractedCloud> {
        let (transform, header) = self.resolve(&cloud.header, target_frame)?;
        let mut points = cloud.points.clone();
        transform_points(&mut points, &transform);
        Ok(ExtractedCloud { header, points })
    }

    fn resolve(
        &self,
        header: &CloudHeader,
        target_frame: &str,
    ) -> RoiResult<(Isometry3<f64>, CloudHeader)> {
        let provider = match &self.provider {
            Some(provider) => provider,
            None => {
                self.missing_provider_log
                    .error(format_args!("TF listener not initialized."));
                return Err(RoiError::TransformListenerUnset);
            }
        };
        let source_frame = header.frame_id.as_str();
        let unavailable = |reason: String| {
            self.failure_log
                .error(format_args!("PCL transform error: {}", reason));
            RoiError::TransformUnavailable {
                target_frame: target_frame.to_owned(),
                source_frame: source_frame.to_owned(),
                reason,
            }
        };

        let common_time = provider
            .latest_common_time(target_frame, source_frame)
            .map_err(|e| unavailable(e.to_string()))?;

        let mut handle = || provider.readiness(target_frame, source_frame, common_time);
        match wait_for(&mut handle, self.timeout, self.poll_interval) {
            PollStatus::Ready => {}
            PollStatus::TimedOut => {
                return Err(unavailable(format!(
                    "transform from '{}' to '{}' did not become available within {:.3}s",
                    source_frame,
                    target_frame,
                    self.timeout.as_secs_f64()
                )))
            }
            PollStatus::NotReady => {
                return Err(unavailable(format!(
                    "frames '{}' and '{}' are not connected",
                    source_frame, target_frame
                )))
            }
        }

        let transform = provider
            .lookup_transform(target_frame, source_frame, common_time)
            .map_err(|e| unavailable(e.to_string()))?;
        debug!(
            "Transforming from '{}' to '{}' at {:?}",
            source_frame, target_frame, common_time
        );

        // A zero common time stands for static transforms that do not carry a time of their own
        let stamp = if common_time == Duration::ZERO {
            header.stamp
        } else {
            common_time
        };
        Ok((
            transform,
            CloudHeader {
                frame_id: target_frame.to_owned(),
                stamp,
                sequence: header.sequence,
            },
        ))
    }
}

fn transform_points(points: &mut [ColoredPoint], transform: &Isometry3<f64>) {
    points.par_iter_mut().for_each(|point| {
        point.position = (transform * Point3::from(point.position)).coords;
    });
}

#[derive(Debug, Clone)]
struct FrameEdge {
    parent: String,
    /// Maps coordinates of the child frame into the parent frame
    parent_from_child: Isometry3<f64>,
    /// Zero for static transforms
    stamp: Duration,
}

/// In-memory [TransformProvider] holding a tree of frames. Every frame has at most one parent, transforms between two
/// frames are found through their closest common ancestor. Each edge stores only its most recent transform, lookups
/// do not interpolate in time. Edges with a zero stamp are static and valid at any time.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use cloudroi_algorithms::transform::{TransformBuffer, TransformProvider};
/// # use cloudroi_core::nalgebra::{Isometry3, Point3, Vector3};
/// let buffer = TransformBuffer::new();
/// buffer
///     .set_transform("base_link", "camera", Duration::ZERO, Isometry3::translation(0.0, 0.0, 1.0))
///     .unwrap();
/// let point = buffer
///     .apply("base_link", "camera", Duration::ZERO, &Point3::new(1.0, 0.0, 0.0))
///     .unwrap();
/// assert_eq!(point, Point3::new(1.0, 0.0, 1.0));
/// ```
#[derive(Debug, Default)]
pub struct TransformBuffer {
    edges: RwLock<HashMap<String, FrameEdge>>,
}

impl TransformBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transform that maps coordinates of `child_frame` into `parent_frame`, replacing an earlier transform of
    /// `child_frame`. Fails if the edge would create a cycle
    pub fn set_transform(
        &self,
        parent_frame: &str,
        child_frame: &str,
        stamp: Duration,
        parent_from_child: Isometry3<f64>,
    ) -> Result<()> {
        if parent_frame == child_frame {
            bail!("Frame '{}' cannot be its own parent", child_frame);
        }
        let mut edges = self
            .edges
            .write()
            .map_err(|_| anyhow!("Transform buffer lock is poisoned"))?;
        let mut ancestor = Some(parent_frame);
        while let Some(frame) = ancestor {
            if frame == child_frame {
                bail!(
                    "Adding '{}' as parent of '{}' would create a cycle",
                    parent_frame,
                    child_frame
                );
            }
            ancestor = edges.get(frame).map(|e| e.parent.as_str());
        }
        edges.insert(
            child_frame.to_owned(),
            FrameEdge {
                parent: parent_frame.to_owned(),
                parent_from_child,
                stamp,
            },
        );
        Ok(())
    }

    pub fn has_frame(&self, frame: &str) -> bool {
        match self.edges.read() {
            Ok(edges) => Self::knows_frame(&edges, frame),
            Err(_) => false,
        }
    }

    fn knows_frame(edges: &HashMap<String, FrameEdge>, frame: &str) -> bool {
        edges.contains_key(frame) || edges.values().any(|e| e.parent == frame)
    }

    /// Transform from `source_frame` into `target_frame` together with the stamps of all edges on the way
    fn resolve_path(
        &self,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<(Isometry3<f64>, Vec<Duration>)> {
        let edges = self
            .edges
            .read()
            .map_err(|_| anyhow!("Transform buffer lock is poisoned"))?;
        for frame in [target_frame, source_frame].iter() {
            if !Self::knows_frame(&edges, frame) {
                bail!("Frame '{}' does not exist", frame);
            }
        }

        let target_chain = ancestors(&edges, target_frame);
        let common_ancestor = ancestors(&edges, source_frame)
            .into_iter()
            .find(|frame| target_chain.contains(frame))
            .ok_or_else(|| {
                anyhow!(
                    "Frames '{}' and '{}' are not part of the same tree",
                    target_frame,
                    source_frame
                )
            })?;

        let mut stamps = vec![];
        let ancestor_from_source = walk_to_ancestor(&edges, source_frame, &common_ancestor, &mut stamps);
        let ancestor_from_target = walk_to_ancestor(&edges, target_frame, &common_ancestor, &mut stamps);
        Ok((ancestor_from_target.inverse() * ancestor_from_source, stamps))
    }
}

/// `frame` followed by all of its ancestors up to the root
fn ancestors(edges: &HashMap<String, FrameEdge>, frame: &str) -> Vec<String> {
    let mut chain = vec![frame.to_owned()];
    let mut current = frame;
    while let Some(edge) = edges.get(current) {
        chain.push(edge.parent.clone());
        current = &edge.parent;
    }
    chain
}

fn walk_to_ancestor(
    edges: &HashMap<String, FrameEdge>,
    frame: &str,
    ancestor: &str,
    stamps: &mut Vec<Duration>,
) -> Isometry3<f64> {
    let mut ancestor_from_frame = Isometry3::identity();
    let mut current = frame;
    while current != ancestor {
        match edges.get(current) {
            Some(edge) => {
                ancestor_from_frame = edge.parent_from_child * ancestor_from_frame;
                stamps.push(edge.stamp);
                current = &edge.parent;
            }
            None => break,
        }
    }
    ancestor_from_frame
}

impl TransformProvider for TransformBuffer {
    fn latest_common_time(&self, target_frame: &str, source_frame: &str) -> Result<Duration> {
        let (_, stamps) = self.resolve_path(target_frame, source_frame)?;
        Ok(stamps
            .into_iter()
            .filter(|stamp| *stamp != Duration::ZERO)
            .min()
            .unwrap_or(Duration::ZERO))
    }

    fn readiness(&self, target_frame: &str, source_frame: &str, time: Duration) -> Readiness {
        match self.resolve_path(target_frame, source_frame) {
            Ok((_, stamps)) => {
                if stamps
                    .iter()
                    .all(|stamp| *stamp == Duration::ZERO || *stamp >= time)
                {
                    Readiness::Ready
                } else {
                    Readiness::Pending
                }
            }
            Err(_) => Readiness::Unavailable,
        }
    }

    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        _time: Duration,
    ) -> Result<Isometry3<f64>> {
        Ok(self.resolve_path(target_frame, source_frame)?.0)
    }
}
