use crate::config;
use anyhow::{Context, Result};
use itertools::Itertools;
use nalgebra::{Isometry3, Point3, Unit, Vector3};
use parry3d::{
    query::{Ray, RayCast},
    shape::{Ball, Cuboid, HalfSpace},
};

/// Answers ray intersection queries against the simulated world.
///
/// Returns the nearest hit point within `max_distance` of `origin` along
/// `direction`, or `None` if nothing was hit. An `Err` means the query
/// could not be answered at all.
pub trait RayCaster: Sync {
    fn cast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
    ) -> Result<Option<Point3<f32>>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Plane {
        point: Point3<f32>,
        normal: Unit<Vector3<f32>>,
    },
    Sphere {
        center: Point3<f32>,
        radius: f32,
    },
    Aabb {
        min: Point3<f32>,
        max: Point3<f32>,
    },
}

impl TryFrom<&config::Object> for Primitive {
    type Error = anyhow::Error;

    fn try_from(from: &config::Object) -> Result<Self> {
        use config::Object as O;

        from.validate()?;

        let primitive = match *from {
            O::Plane { point, normal } => Self::Plane {
                point: point.into(),
                normal: Unit::new_normalize(normal.into()),
            },
            O::Sphere { center, radius } => Self::Sphere {
                center: center.into(),
                radius,
            },
            O::Box { min, max } => Self::Aabb {
                min: min.into(),
                max: max.into(),
            },
        };
        Ok(primitive)
    }
}

impl Primitive {
    /// Distance along `ray` to the first surface crossing within `max_toi`.
    ///
    /// Surfaces are hit from either side, so a sensor placed inside a
    /// primitive sees its inner walls.
    fn cast_ray(&self, ray: &Ray, max_toi: f32) -> Option<f32> {
        match *self {
            Self::Plane { point, normal } => {
                let iso = Isometry3::translation(point.x, point.y, point.z);
                HalfSpace::new(normal).cast_ray(&iso, ray, max_toi, false)
            }
            Self::Sphere { center, radius } => {
                let iso = Isometry3::translation(center.x, center.y, center.z);
                Ball::new(radius).cast_ray(&iso, ray, max_toi, false)
            }
            Self::Aabb { min, max } => {
                let center = nalgebra::center(&min, &max);
                let iso = Isometry3::translation(center.x, center.y, center.z);
                Cuboid::new((max - min) / 2.0).cast_ray(&iso, ray, max_toi, false)
            }
        }
    }
}

/// A static world made of analytic primitives.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    primitives: Vec<Primitive>,
}

impl Scene {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self { primitives }
    }

    pub fn from_config(config: &config::Scene) -> Result<Self> {
        let primitives: Vec<Primitive> = config
            .objects
            .iter()
            .enumerate()
            .map(|(index, object)| {
                Primitive::try_from(object).with_context(|| format!("invalid scene object #{index}"))
            })
            .try_collect()?;
        Ok(Self::new(primitives))
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }
}

impl RayCaster for Scene {
    fn cast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
    ) -> Result<Option<Point3<f32>>> {
        let Some(dir) = Unit::try_new(*direction, f32::EPSILON) else {
            return Ok(None);
        };

        let ray = Ray::new(*origin, dir.into_inner());

        let nearest = self
            .primitives
            .iter()
            .filter_map(|primitive| primitive.cast_ray(&ray, max_distance))
            .min_by(|a, b| a.total_cmp(b));

        Ok(nearest.map(|toi| ray.point_at(toi)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wall(distance: f32) -> Primitive {
        Primitive::Plane {
            point: Point3::new(0.0, 0.0, distance),
            normal: -Vector3::z_axis(),
        }
    }

    #[test]
    fn plane_hit_within_range() {
        let scene = Scene::new(vec![wall(5.0)]);
        let hit = scene
            .cast(&Point3::origin(), &Vector3::new(0.0, 0.0, 10.0), 10.0)
            .unwrap()
            .unwrap();
        assert_relative_eq!(hit, Point3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
    }

    #[test]
    fn plane_beyond_range_is_a_miss() {
        let scene = Scene::new(vec![wall(20.0)]);
        let hit = scene
            .cast(&Point3::origin(), &Vector3::new(0.0, 0.0, 10.0), 10.0)
            .unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn plane_behind_origin_is_a_miss() {
        let scene = Scene::new(vec![wall(-5.0)]);
        let hit = scene
            .cast(&Point3::origin(), &Vector3::new(0.0, 0.0, 10.0), 10.0)
            .unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn surface_just_past_range_is_a_miss() {
        let scene = Scene::new(vec![wall(10.01)]);
        let hit = scene
            .cast(&Point3::origin(), &Vector3::new(0.0, 0.0, 10.0), 10.0)
            .unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn plane_is_hit_from_behind() {
        let scene = Scene::new(vec![Primitive::Plane {
            point: Point3::new(0.0, 0.0, 5.0),
            normal: Vector3::z_axis(),
        }]);
        let hit = scene
            .cast(&Point3::origin(), &Vector3::new(0.0, 0.0, 10.0), 10.0)
            .unwrap()
            .unwrap();
        assert_relative_eq!(hit, Point3::new(0.0, 0.0, 5.0), epsilon = 1e-5);
    }

    #[test]
    fn nearest_primitive_wins() {
        let scene = Scene::new(vec![
            wall(8.0),
            Primitive::Sphere {
                center: Point3::new(0.0, 0.0, 4.0),
                radius: 1.0,
            },
            Primitive::Aabb {
                min: Point3::new(-1.0, -1.0, 6.0),
                max: Point3::new(1.0, 1.0, 7.0),
            },
        ]);
        let hit = scene
            .cast(&Point3::origin(), &Vector3::new(0.0, 0.0, 10.0), 10.0)
            .unwrap()
            .unwrap();
        assert_relative_eq!(hit, Point3::new(0.0, 0.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn box_hit_from_outside() {
        let scene = Scene::new(vec![Primitive::Aabb {
            min: Point3::new(-1.0, -1.0, 6.0),
            max: Point3::new(1.0, 1.0, 7.0),
        }]);
        let hit = scene
            .cast(&Point3::new(0.5, 0.0, 0.0), &Vector3::z(), 10.0)
            .unwrap()
            .unwrap();
        assert_relative_eq!(hit, Point3::new(0.5, 0.0, 6.0), epsilon = 1e-5);

        let miss = scene
            .cast(&Point3::new(3.0, 0.0, 0.0), &Vector3::z(), 10.0)
            .unwrap();
        assert_eq!(miss, None);
    }

    #[test]
    fn from_config_rejects_bad_objects() {
        let objects = [config::Object::Sphere {
            center: [0.0; 3],
            radius: -1.0,
        }];
        let config = config::Scene {
            objects: objects.to_vec().into(),
        };
        assert!(Scene::from_config(&config).is_err());
    }

    #[test]
    fn from_config_keeps_object_order() {
        let scene = Scene::from_config(&crate::consts::DEFAULT_CONFIG.scene).unwrap();
        assert_eq!(scene.primitives().len(), 3);
        assert!(matches!(scene.primitives()[0], Primitive::Plane { .. }));
        assert!(matches!(scene.primitives()[2], Primitive::Sphere { .. }));
    }
}
