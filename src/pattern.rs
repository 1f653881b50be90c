use nalgebra::{Unit, UnitQuaternion, Vector3};
use std::num::NonZeroUsize;

/// Parameters of the angular sampling grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternParams {
    pub fov_x_deg: f32,
    pub fov_y_deg: f32,
    pub lines_x: NonZeroUsize,
    pub lines_y: NonZeroUsize,
    pub range: f32,
}

/// The local axes of the sensor, expressed in the simulation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorBasis {
    pub forward: Unit<Vector3<f32>>,
    pub up: Unit<Vector3<f32>>,
    pub right: Unit<Vector3<f32>>,
}

impl SensorBasis {
    /// Rotate the simulation axes (right = +X, up = +Y, forward = +Z) by the
    /// sensor orientation.
    pub fn from_rotation(rotation: &UnitQuaternion<f32>) -> Self {
        Self {
            forward: rotation * Vector3::z_axis(),
            up: rotation * Vector3::y_axis(),
            right: rotation * Vector3::x_axis(),
        }
    }
}

/// Round an even line count up to the next odd one.
pub fn oddify(lines: NonZeroUsize) -> NonZeroUsize {
    if lines.get() % 2 == 0 {
        lines.saturating_add(1)
    } else {
        lines
    }
}

/// The fixed set of ray directions cast by the sensor on every cycle.
///
/// Each direction is scaled to the sensing range so its length doubles as the
/// maximum trace distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RayPattern {
    lines_x: usize,
    lines_y: usize,
    directions: Vec<Vector3<f32>>,
}

impl RayPattern {
    pub fn new(params: &PatternParams, basis: &SensorBasis) -> Self {
        let PatternParams {
            fov_x_deg,
            fov_y_deg,
            lines_x,
            lines_y,
            range,
        } = *params;
        let lines_x = oddify(lines_x).get();
        let lines_y = oddify(lines_y).get();

        // Sweep the forward ray about the up axis.
        let middle = basis.forward.into_inner() * range;
        let mut fan = Vec::with_capacity(lines_y);
        fan.push(middle);
        fan.extend(rotated_copies(&[middle], &basis.up, fov_y_deg, lines_y));

        // Sweep the whole fan about the right axis. The unrotated fan comes first.
        let mut directions = Vec::with_capacity(lines_x * lines_y);
        directions.extend_from_slice(&fan);
        directions.extend(rotated_copies(&fan, &basis.right, fov_x_deg, lines_x));

        debug_assert_eq!(directions.len(), lines_x * lines_y);

        Self {
            lines_x,
            lines_y,
            directions,
        }
    }

    pub fn directions(&self) -> &[Vector3<f32>] {
        &self.directions
    }

    /// Line counts after odd normalization, as `(lines_x, lines_y)`.
    pub fn lines(&self) -> (usize, usize) {
        (self.lines_x, self.lines_y)
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }
}

/// For each step `k` in `1..=(lines-1)/2`, yield the pair of copies of every
/// seed vector rotated by `+angle_k` and `-angle_k` about `axis`.
fn rotated_copies<'a>(
    seed: &'a [Vector3<f32>],
    axis: &'a Unit<Vector3<f32>>,
    fov_deg: f32,
    lines: usize,
) -> impl Iterator<Item = Vector3<f32>> + 'a {
    let per_side = (lines - 1) / 2;

    (1..=per_side).flat_map(move |step| {
        let angle = (fov_deg / 2.0) * (step as f32 / per_side as f32);
        let pos = UnitQuaternion::from_axis_angle(axis, angle.to_radians());
        let neg = UnitQuaternion::from_axis_angle(axis, -angle.to_radians());
        seed.iter().flat_map(move |v| [pos * v, neg * v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn identity_basis() -> SensorBasis {
        SensorBasis::from_rotation(&UnitQuaternion::identity())
    }

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn params(fov: f32, lines_x: usize, lines_y: usize) -> PatternParams {
        PatternParams {
            fov_x_deg: fov,
            fov_y_deg: fov,
            lines_x: nz(lines_x),
            lines_y: nz(lines_y),
            range: 10.0,
        }
    }

    #[test]
    fn oddify_rounds_even_up() {
        assert_eq!(oddify(nz(1)).get(), 1);
        assert_eq!(oddify(nz(2)).get(), 3);
        assert_eq!(oddify(nz(7)).get(), 7);
        assert_eq!(oddify(nz(8)).get(), 9);
    }

    #[test]
    fn pattern_size_uses_odd_line_counts() {
        let basis = identity_basis();
        for lines_x in 1..=6 {
            for lines_y in 1..=6 {
                let pattern = RayPattern::new(&params(60.0, lines_x, lines_y), &basis);
                let expect = oddify(nz(lines_x)).get() * oddify(nz(lines_y)).get();
                assert_eq!(pattern.len(), expect);
            }
        }
    }

    #[test]
    fn exactly_one_forward_ray() {
        let basis = identity_basis();
        let forward = Vector3::new(0.0, 0.0, 10.0);

        for (lines_x, lines_y) in [(1, 1), (3, 3), (4, 7), (7, 2)] {
            let pattern = RayPattern::new(&params(90.0, lines_x, lines_y), &basis);
            let n_forward = pattern.directions().iter().filter(|d| **d == forward).count();
            assert_eq!(n_forward, 1);
            assert_eq!(pattern.directions()[0], forward);
        }
    }

    #[test]
    fn zero_fov_collapses_to_forward() {
        let basis = identity_basis();
        let pattern = RayPattern::new(&params(0.0, 5, 4), &basis);
        assert_eq!(pattern.len(), 25);
        assert!(pattern
            .directions()
            .iter()
            .all(|d| *d == Vector3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn generation_is_deterministic() {
        let basis = SensorBasis::from_rotation(&UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3));
        let first = RayPattern::new(&params(75.0, 6, 9), &basis);
        let second = RayPattern::new(&params(75.0, 6, 9), &basis);
        assert_eq!(first, second);
    }

    #[test]
    fn directions_are_scaled_to_range() {
        let basis = identity_basis();
        let pattern = RayPattern::new(&params(90.0, 5, 5), &basis);
        for d in pattern.directions() {
            assert_relative_eq!(d.norm(), 10.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn fan_spans_half_fov_each_side() {
        let basis = identity_basis();
        let pattern = RayPattern::new(&params(90.0, 1, 3), &basis);
        let dirs = pattern.directions();
        assert_eq!(dirs.len(), 3);

        // Rotations about +Y tilt the forward ray into the X/Z plane.
        let half = 45f32.to_radians();
        assert_relative_eq!(dirs[1], Vector3::new(half.sin(), 0.0, half.cos()) * 10.0, epsilon = 1e-4);
        assert_relative_eq!(dirs[2], Vector3::new(-half.sin(), 0.0, half.cos()) * 10.0, epsilon = 1e-4);
    }

    #[test]
    fn fan_replicas_follow_the_central_fan() {
        let basis = identity_basis();
        let pattern = RayPattern::new(&params(90.0, 3, 3), &basis);
        let dirs = pattern.directions();
        assert_eq!(pattern.lines(), (3, 3));

        // Rotating about +X pitches rays toward -Y for positive angles.
        let half = 45f32.to_radians();
        let mid_up = Vector3::new(0.0, -half.sin(), half.cos()) * 10.0;
        let mid_down = Vector3::new(0.0, half.sin(), half.cos()) * 10.0;
        assert_relative_eq!(dirs[3], mid_up, epsilon = 1e-4);
        assert_relative_eq!(dirs[4], mid_down, epsilon = 1e-4);
    }

    #[test]
    fn basis_follows_orientation() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 90f32.to_radians());
        let basis = SensorBasis::from_rotation(&yaw);
        assert_relative_eq!(basis.forward.into_inner(), Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(basis.up.into_inner(), Vector3::y(), epsilon = 1e-6);
        assert_relative_eq!(basis.right.into_inner(), -Vector3::z(), epsilon = 1e-6);

        let pattern = RayPattern::new(&params(0.0, 1, 1), &basis);
        assert_relative_eq!(pattern.directions()[0], Vector3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
    }
}
