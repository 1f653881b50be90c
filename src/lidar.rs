use crate::{
    config,
    encoder::encode_cloud,
    message::PointCloud2,
    pattern::{PatternParams, RayPattern, SensorBasis},
    scene::RayCaster,
};
use anyhow::Result;
use nalgebra::{Isometry3, Point3, Vector3};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, UnitBall};
use rayon::prelude::*;
use tracing::{debug, warn};

/// A simulated scanning range sensor.
///
/// The ray pattern is fixed at construction from the initial orientation.
/// Each scan only uses the sensor position.
pub struct LidarSimulator {
    pattern: RayPattern,
    max_uncertainty: f32,
    frame_id: String,
    rng: StdRng,
}

impl LidarSimulator {
    pub fn new(lidar: &config::Lidar, frame_id: &str, pose: &Isometry3<f32>) -> Result<Self> {
        lidar.validate()?;

        let config::Lidar {
            fov_x_deg,
            fov_y_deg,
            lines_x,
            lines_y,
            range_m,
            max_uncertainty_m,
            seed,
        } = *lidar;

        let params = PatternParams {
            fov_x_deg,
            fov_y_deg,
            lines_x,
            lines_y,
            range: range_m,
        };
        let pattern = RayPattern::new(&params, &SensorBasis::from_rotation(&pose.rotation));
        debug!(
            "Built ray pattern with {} rays ({} x {} lines)",
            pattern.len(),
            pattern.lines().0,
            pattern.lines().1
        );

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            pattern,
            max_uncertainty: max_uncertainty_m,
            frame_id: frame_id.to_string(),
            rng,
        })
    }

    pub fn pattern(&self) -> &RayPattern {
        &self.pattern
    }

    /// Cast every ray from `position` and return the hits relative to the
    /// sensor, in pattern order.
    ///
    /// Misses are dropped. If the caster fails, the whole scan is empty.
    pub fn scan<C>(&mut self, position: &Point3<f32>, caster: &C) -> Vec<Point3<f32>>
    where
        C: RayCaster + ?Sized,
    {
        // Indexed parallel collect keeps the pattern order.
        let hits: Result<Vec<Option<Point3<f32>>>> = self
            .pattern
            .directions()
            .par_iter()
            .map(|dir| caster.cast(position, dir, dir.norm()))
            .collect();

        let hits = match hits {
            Ok(hits) => hits,
            Err(err) => {
                warn!("Ray casting failed, emitting an empty scan: {err:#}");
                return vec![];
            }
        };

        hits.into_iter()
            .flatten()
            .map(|hit| self.jitter(Point3::from(hit - position)))
            .collect()
    }

    /// Scan and pack the result into a wire message.
    pub fn measure<C>(&mut self, position: &Point3<f32>, caster: &C) -> PointCloud2
    where
        C: RayCaster + ?Sized,
    {
        let points = self.scan(position, caster);
        encode_cloud(&self.frame_id, &points)
    }

    /// Offset `point` uniformly inside the uncertainty ball. A zero bound
    /// leaves the point untouched.
    fn jitter(&mut self, point: Point3<f32>) -> Point3<f32> {
        if self.max_uncertainty <= 0.0 {
            return point;
        }
        let offset: [f32; 3] = UnitBall.sample(&mut self.rng);
        point + Vector3::from(offset) * self.max_uncertainty
    }
}
