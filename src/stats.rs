//! Area and position aggregates over object instances
//!
//! Standard deviations are population deviations. Instances without an `area`
//! are left out of the area aggregates and instances without a `bbox` are left
//! out of the position aggregates; they still count as instances. An aggregate
//! over no values is all zeros.

use crate::coco::Instance;

/// Summary of instance areas
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AreaStats {
    pub total: f64,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub stdev: f64,
}

impl AreaStats {
    pub fn from_areas(areas: &[f64]) -> Self {
        if areas.is_empty() {
            return Self::default();
        }

        let total: f64 = areas.iter().sum();
        let mean = total / areas.len() as f64;
        Self {
            total,
            min: areas.iter().copied().fold(f64::INFINITY, f64::min),
            mean,
            max: areas.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            stdev: stdev(areas.iter().copied(), mean, areas.len()),
        }
    }
}

/// Summary of the top-left corners of instance bounding boxes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionStats {
    pub mean_x: f64,
    pub mean_y: f64,
    pub stdev_x: f64,
    pub stdev_y: f64,
}

impl PositionStats {
    /// Aggregate `[x, y, width, height]` boxes
    pub fn from_bboxes(bboxes: &[[f64; 4]]) -> Self {
        if bboxes.is_empty() {
            return Self::default();
        }

        let n = bboxes.len();
        let mean_x = bboxes.iter().map(|b| b[0]).sum::<f64>() / n as f64;
        let mean_y = bboxes.iter().map(|b| b[1]).sum::<f64>() / n as f64;
        Self {
            mean_x,
            mean_y,
            stdev_x: stdev(bboxes.iter().map(|b| b[0]), mean_x, n),
            stdev_y: stdev(bboxes.iter().map(|b| b[1]), mean_y, n),
        }
    }
}

fn stdev(values: impl Iterator<Item = f64>, mean: f64, n: usize) -> f64 {
    (values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
}

/// Instance count with area and position aggregates, for one image or for
/// one category of an image
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InstanceStats {
    pub num_instances: usize,
    pub area: AreaStats,
    pub position: PositionStats,
}

impl InstanceStats {
    pub fn from_instances<'a, I>(instances: I) -> Self
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        let mut num_instances = 0;
        let mut areas = Vec::new();
        let mut bboxes = Vec::new();
        for instance in instances {
            num_instances += 1;
            areas.extend(instance.area);
            bboxes.extend(instance.bbox);
        }

        Self {
            num_instances,
            area: AreaStats::from_areas(&areas),
            position: PositionStats::from_bboxes(&bboxes),
        }
    }
}
