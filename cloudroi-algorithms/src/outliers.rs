// The statistical outlier removal is modelled after the filter of the same name in the PCL library (https://pointclouds.org/)
use cloudroi_core::cloud::ColoredPoint;
use kd_tree::KdTree;
use num_traits::Float;
use rayon::prelude::*;

/// Default number of nearest neighbours that make up the neighbourhood of a point
pub const DEFAULT_MEAN_K: usize = 50;
/// Default multiple of the standard deviation that bounds the accepted mean neighbour distances
pub const DEFAULT_STD_DEV_MUL: f64 = 3.0;

/// Statistical outlier removal.
///
/// For every point the mean distance to its `mean_k` nearest neighbours is computed. Over all points, the mean `μ` and
/// sample standard deviation `σ` of these mean distances are calculated, and a point is kept if its mean neighbour
/// distance lies within `[μ - std_dev_mul * σ, μ + std_dev_mul * σ]`.
///
/// If there are not more than `mean_k` points, every other point is part of the neighbourhood. A single point has no
/// neighbours and is always kept, as are all points if `mean_k` is zero.
///
/// # Examples
///
/// ```
/// # use cloudroi_algorithms::outliers::StatisticalOutlierFilter;
/// # use cloudroi_core::{cloud::ColoredPoint, nalgebra::Vector3};
/// let mut points = vec![];
/// for i in 0..10 {
///     for j in 0..10 {
///         points.push(ColoredPoint::new(
///             Vector3::new(i as f64 * 0.01, j as f64 * 0.01, 1.0),
///             Vector3::new(1.0, 0.0, 0.0),
///         ));
///     }
/// }
/// // a stray depth measurement far behind the object
/// points.push(ColoredPoint::new(Vector3::new(0.05, 0.05, 10.0), Vector3::new(1.0, 0.0, 0.0)));
///
/// let filtered = StatisticalOutlierFilter::default().filter(&points);
/// assert_eq!(filtered.len(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalOutlierFilter {
    pub mean_k: usize,
    pub std_dev_mul: f64,
}

impl Default for StatisticalOutlierFilter {
    fn default() -> Self {
        Self {
            mean_k: DEFAULT_MEAN_K,
            std_dev_mul: DEFAULT_STD_DEV_MUL,
        }
    }
}

impl StatisticalOutlierFilter {
    pub fn new(mean_k: usize, std_dev_mul: f64) -> Self {
        Self {
            mean_k,
            std_dev_mul,
        }
    }

    /// Mean distance of every point to its nearest neighbours, in input order
    pub fn mean_neighbour_distances(&self, points: &[ColoredPoint]) -> Vec<f64> {
        if points.is_empty() || self.mean_k == 0 {
            return vec![0.0; points.len()];
        }
        let kd_tree = build_kd_tree(points);
        points
            .iter()
            .map(|point| mean_distance(&kd_tree, point, self.mean_k))
            .collect()
    }

    /// Same as [mean_neighbour_distances](StatisticalOutlierFilter::mean_neighbour_distances), with the neighbour
    /// queries running in parallel
    pub fn mean_neighbour_distances_par(&self, points: &[ColoredPoint]) -> Vec<f64> {
        if points.is_empty() || self.mean_k == 0 {
            return vec![0.0; points.len()];
        }
        let kd_tree = build_kd_tree(points);
        points
            .par_iter()
            .map(|point| mean_distance(&kd_tree, point, self.mean_k))
            .collect()
    }

    /// Indices of all points that are not outliers, in ascending order
    pub fn inlier_indices(&self, points: &[ColoredPoint]) -> Vec<usize> {
        self.select_inliers(&self.mean_neighbour_distances(points))
    }

    /// Parallel version of [inlier_indices](StatisticalOutlierFilter::inlier_indices), yields the same indices
    pub fn inlier_indices_par(&self, points: &[ColoredPoint]) -> Vec<usize> {
        self.select_inliers(&self.mean_neighbour_distances_par(points))
    }

    /// Returns the points that are not outliers, in input order
    pub fn filter(&self, points: &[ColoredPoint]) -> Vec<ColoredPoint> {
        self.inlier_indices(points)
            .into_iter()
            .map(|idx| points[idx])
            .collect()
    }

    /// Removes all outliers from `points`, keeping the order of the remaining points
    pub fn filter_in_place(&self, points: &mut Vec<ColoredPoint>) {
        let inliers = self.inlier_indices(points);
        if inliers.len() == points.len() {
            return;
        }
        let mut inliers = inliers.into_iter().peekable();
        let mut idx = 0;
        points.retain(|_| {
            let keep = inliers.peek() == Some(&idx);
            if keep {
                inliers.next();
            }
            idx += 1;
            keep
        });
    }

    fn select_inliers(&self, mean_distances: &[f64]) -> Vec<usize> {
        let (mean, std_dev) = mean_and_std_dev(mean_distances);
        let lower = mean - self.std_dev_mul * std_dev;
        let upper = mean + self.std_dev_mul * std_dev;
        mean_distances
            .iter()
            .enumerate()
            .filter(|(_, distance)| **distance >= lower && **distance <= upper)
            .map(|(idx, _)| idx)
            .collect()
    }
}

fn build_kd_tree(points: &[ColoredPoint]) -> KdTree<[f64; 3]> {
    KdTree::build_by_ordered_float(points.iter().map(|p| p.position_array()).collect())
}

fn mean_distance(kd_tree: &KdTree<[f64; 3]>, point: &ColoredPoint, mean_k: usize) -> f64 {
    let nearest = kd_tree.nearests(&point.position_array(), mean_k + 1);
    // First element will be the point itself
    let distances = nearest
        .iter()
        .skip(1)
        .map(|n| n.squared_distance.sqrt())
        .collect::<Vec<_>>();
    if distances.is_empty() {
        return 0.0;
    }
    distances.iter().sum::<f64>() / distances.len() as f64
}

/// Mean and sample standard deviation of `values`. The standard deviation of fewer than two values is zero
fn mean_and_std_dev<T: Float>(values: &[T]) -> (T, T) {
    if values.is_empty() {
        return (T::zero(), T::zero());
    }
    let count = T::from(values.len()).unwrap_or_else(T::one);
    let mean = values.iter().fold(T::zero(), |acc, v| acc + *v) / count;
    if values.len() < 2 {
        return (mean, T::zero());
    }
    let squared_deviations = values
        .iter()
        .fold(T::zero(), |acc, v| acc + (*v - mean) * (*v - mean));
    let variance = squared_deviations / (count - T::one());
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use cloudroi_core::nalgebra::Vector3;
    use rand::{thread_rng, Rng};

    fn point(x: f64, y: f64, z: f64) -> ColoredPoint {
        ColoredPoint::new(Vector3::new(x, y, z), Vector3::new(0.5, 0.5, 0.5))
    }

    fn planar_patch_with_outliers() -> Vec<ColoredPoint> {
        let mut points = vec![];
        for i in 0..10 {
            for j in 0..10 {
                points.push(point(i as f64 * 0.01, j as f64 * 0.01, 1.0));
            }
        }
        points.insert(37, point(0.05, 0.05, 10.0));
        points
    }

    #[test]
    fn removes_far_point() {
        let points = planar_patch_with_outliers();
        let inliers = StatisticalOutlierFilter::default().inlier_indices(&points);
        assert_eq!(inliers.len(), 100);
        assert!(!inliers.contains(&37));
    }

    #[test]
    fn serial_and_parallel_agree() {
        let mut rng = thread_rng();
        let points = (0..500)
            .map(|_| point(rng.gen(), rng.gen(), rng.gen_range(0.0..5.0)))
            .collect::<Vec<_>>();
        let filter = StatisticalOutlierFilter::new(8, 1.0);
        assert_eq!(filter.inlier_indices(&points), filter.inlier_indices_par(&points));
    }

    #[test]
    fn output_is_ordered_subset_of_input() {
        let mut rng = thread_rng();
        let points = (0..300)
            .map(|_| point(rng.gen(), rng.gen(), rng.gen()))
            .collect::<Vec<_>>();
        let filter = StatisticalOutlierFilter::new(10, 0.5);
        let inliers = filter.inlier_indices(&points);
        assert!(inliers.len() <= points.len());
        assert!(inliers.windows(2).all(|w| w[0] < w[1]));

        let filtered = filter.filter(&points);
        assert_eq!(filtered.len(), inliers.len());
        for (kept, idx) in filtered.iter().zip(inliers.iter()) {
            assert_eq!(*kept, points[*idx]);
        }
    }

    #[test]
    fn filter_in_place_matches_filter() {
        let points = planar_patch_with_outliers();
        let filter = StatisticalOutlierFilter::default();
        let expected = filter.filter(&points);
        let mut in_place = points;
        filter.filter_in_place(&mut in_place);
        assert_eq!(in_place, expected);
    }

    #[test]
    fn small_inputs_never_fail() {
        let filter = StatisticalOutlierFilter::default();
        assert!(filter.filter(&[]).is_empty());
        assert_eq!(filter.filter(&[point(1.0, 2.0, 3.0)]).len(), 1);

        let line = vec![point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0), point(2.0, 0.0, 0.0)];
        let distances = filter.mean_neighbour_distances(&line);
        assert_approx_eq!(distances[0], 1.5);
        assert_approx_eq!(distances[1], 1.0);
        assert_approx_eq!(distances[2], 1.5);
        assert_eq!(filter.filter(&line).len(), 3);
    }

    #[test]
    fn zero_neighbours_keeps_everything() {
        let points = planar_patch_with_outliers();
        let filter = StatisticalOutlierFilter::new(0, 3.0);
        assert_eq!(filter.filter(&points).len(), points.len());
    }

    #[test]
    fn statistics_use_sample_std_dev() {
        let (mean, std_dev) = mean_and_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_approx_eq!(mean, 5.0);
        assert_approx_eq!(std_dev, (32.0f64 / 7.0).sqrt());
        assert_eq!(mean_and_std_dev::<f64>(&[]), (0.0, 0.0));
        assert_eq!(mean_and_std_dev(&[3.0]), (3.0, 0.0));
    }
}
