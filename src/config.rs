use crate::consts::DEFAULT_FRAME_ID;
use anyhow::{ensure, Context, Result};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use std::{borrow::Cow, fs, num::NonZeroUsize, path::Path};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub lidar: Lidar,
    pub pose: Pose,
    pub publish: Publish,
    #[serde(default)]
    pub scene: Scene,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lidar {
    pub fov_x_deg: f32,
    pub fov_y_deg: f32,
    pub lines_x: NonZeroUsize,
    pub lines_y: NonZeroUsize,
    pub range_m: f32,
    #[serde(default)]
    pub max_uncertainty_m: f32,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Sensor placement in the simulation world (Y-up).
///
/// `rotation_deg` holds Euler angles in degrees about the X, Y and Z axes.
#[derive(Debug, Clone, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_deg: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Publish {
    pub topic: Cow<'static, str>,
    #[serde(default = "default_frame_id")]
    pub frame_id: Cow<'static, str>,
    pub period_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scene {
    pub objects: Cow<'static, [Object]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Object {
    Plane { point: [f32; 3], normal: [f32; 3] },
    Sphere { center: [f32; 3], radius: f32 },
    Box { min: [f32; 3], max: [f32; 3] },
}

fn default_frame_id() -> Cow<'static, str> {
    Cow::Borrowed(DEFAULT_FRAME_ID)
}

impl Config {
    /// Load a JSON5 config file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file '{}'", path.display()))?;
        let config: Config = json5::from_str(&text)
            .with_context(|| format!("unable to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.lidar.validate().context("invalid lidar config")?;
        self.pose.validate().context("invalid pose config")?;
        self.publish.validate().context("invalid publish config")?;
        Ok(())
    }
}

impl Lidar {
    pub fn validate(&self) -> Result<()> {
        let Self {
            fov_x_deg,
            fov_y_deg,
            range_m,
            max_uncertainty_m,
            ..
        } = *self;

        for (name, fov) in [("fov_x_deg", fov_x_deg), ("fov_y_deg", fov_y_deg)] {
            ensure!(
                fov.is_finite() && (0.0..=360.0).contains(&fov),
                "{name} must be within [0, 360], but got {fov}"
            );
        }
        ensure!(
            range_m.is_finite() && range_m > 0.0,
            "range_m must be positive, but got {range_m}"
        );
        ensure!(
            max_uncertainty_m.is_finite() && max_uncertainty_m >= 0.0,
            "max_uncertainty_m must be non-negative, but got {max_uncertainty_m}"
        );
        Ok(())
    }
}

impl Pose {
    pub fn validate(&self) -> Result<()> {
        let all_finite = self
            .position
            .iter()
            .chain(&self.rotation_deg)
            .all(|value| value.is_finite());
        ensure!(all_finite, "pose contains non-finite values");
        Ok(())
    }

    pub fn to_isometry(&self) -> Isometry3<f32> {
        let [x, y, z] = self.position;
        let [rx, ry, rz] = self.rotation_deg.map(f32::to_radians);
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(rx, ry, rz),
        )
    }
}

impl Publish {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.topic.is_empty(), "topic must not be empty");
        ensure!(self.period_ms > 0, "period_ms must be positive");
        Ok(())
    }
}

impl Object {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Object::Plane { normal, .. } => {
                ensure!(
                    Vector3::from(normal).norm() > 0.0,
                    "plane normal must not be zero"
                );
            }
            Object::Sphere { radius, .. } => {
                ensure!(radius > 0.0, "sphere radius must be positive");
            }
            Object::Box { min, max } => {
                let ok = min.iter().zip(&max).all(|(lo, hi)| lo <= hi);
                ensure!(ok, "box min corner must not exceed max corner");
            }
        }
        Ok(())
    }
}
