use crate::config::{self, Config};
use std::{borrow::Cow, num::NonZeroUsize};

pub const DEFAULT_FRAME_ID: &str = "lidar";

pub const DEFAULT_CONFIG: Config = Config {
    lidar: config::Lidar {
        fov_x_deg: 90.0,
        fov_y_deg: 90.0,
        lines_x: unsafe { NonZeroUsize::new_unchecked(7) },
        lines_y: unsafe { NonZeroUsize::new_unchecked(7) },
        range_m: 10.0,
        max_uncertainty_m: 0.0,
        seed: None,
    },
    pose: config::Pose {
        position: [0.0, 1.0, 0.0],
        rotation_deg: [0.0; 3],
    },
    publish: config::Publish {
        topic: Cow::Borrowed("/lidar/points"),
        frame_id: Cow::Borrowed(DEFAULT_FRAME_ID),
        period_ms: 100,
    },
    scene: config::Scene {
        objects: Cow::Borrowed(&[
            config::Object::Plane {
                point: [0.0, 0.0, 0.0],
                normal: [0.0, 1.0, 0.0],
            },
            config::Object::Box {
                min: [-2.0, 0.0, 4.0],
                max: [2.0, 2.5, 5.0],
            },
            config::Object::Sphere {
                center: [3.0, 1.0, 3.0],
                radius: 0.75,
            },
        ]),
    },
};
