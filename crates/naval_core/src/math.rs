//! Geometry and kinematics kernel.
//!
//! Angles are in degrees, `0°` points along +x and positive rotation
//! turns toward +y (screen coordinates, y down). Every function here is
//! pure; the simulation relies on identical inputs producing identical
//! outputs, so nothing in this module touches a random source.

use serde::{Deserialize, Serialize};

/// 2D vector / point in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Vec2 {
    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Rotate the vector by `degrees` around the origin.
    #[must_use]
    pub fn rotated(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Unit vector pointing along `degrees`.
    #[must_use]
    pub fn from_heading(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(cos, sin)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Center of an axis-aligned rectangle given its top-left corner.
#[must_use]
pub fn parallelepiped_center(top_left: Vec2, width: f64, height: f64) -> Vec2 {
    Vec2::new(top_left.x + width / 2.0, top_left.y + height / 2.0)
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Vec2, b: Vec2) -> f64 {
    a.distance(b)
}

/// Normalize an angle into `(-180, 180]`.
#[must_use]
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Signed minimal rotation that brings `current` onto `target`.
///
/// The result lies in `(-180, 180]`; a half-turn is reported as `+180`.
#[must_use]
pub fn smallest_angle(target: f64, current: f64) -> f64 {
    normalize_angle(target - current)
}

/// Proportional controller step.
///
/// Uses `diff` as the error when supplied, otherwise `target - current`,
/// and clamps the correction to `±max_gain`.
#[must_use]
pub fn proportional(target: f64, current: f64, max_gain: f64, diff: Option<f64>) -> f64 {
    let error = diff.unwrap_or(target - current);
    let gain = max_gain.abs();
    error.clamp(-gain, gain)
}

/// Move `origin` by `distance` along `heading` degrees.
#[must_use]
pub fn movement_by(origin: Vec2, distance: f64, heading: f64) -> Vec2 {
    origin + Vec2::from_heading(heading) * distance
}

/// Distance needed to stop from `speed` with constant deceleration.
#[must_use]
pub fn brake_distance(speed: f64, deceleration: f64) -> f64 {
    let decel = deceleration.abs();
    if decel <= f64::EPSILON {
        return f64::INFINITY;
    }
    speed * speed / (2.0 * decel)
}

/// Radius of the circle traced at `speed` while turning `turn_rate` degrees per tick.
///
/// A zero turn rate never closes the circle and yields infinity.
#[must_use]
pub fn rotation_radius(speed: f64, turn_rate: f64) -> f64 {
    let omega = turn_rate.abs();
    if omega <= f64::EPSILON {
        return f64::INFINITY;
    }
    speed.abs() * 180.0 / (std::f64::consts::PI * omega)
}

/// Centers of the hardest port and starboard turning circles.
///
/// Port turns decrease the heading and pivot around the point at
/// `heading - 90°`; starboard turns pivot around `heading + 90°`.
/// Returns `(port, starboard)`.
#[must_use]
pub fn rotation_centers(center: Vec2, heading: f64, speed: f64, turn_rate: f64) -> (Vec2, Vec2) {
    let radius = rotation_radius(speed, turn_rate);
    if !radius.is_finite() {
        return (center, center);
    }
    (
        movement_by(center, radius, heading - 90.0),
        movement_by(center, radius, heading + 90.0),
    )
}

/// Check whether segment AB intersects segment CD.
///
/// Touching endpoints count as an intersection. Collinear segments
/// intersect when their projections overlap.
#[must_use]
pub fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    const EPS: f64 = 1e-9;

    let r = b - a;
    let s = d - c;
    let denom = r.cross(s);
    let ac = c - a;

    if denom.abs() < EPS {
        if ac.cross(r).abs() >= EPS {
            // Parallel, not collinear
            return false;
        }
        let rr = r.dot(r);
        if rr < EPS {
            // AB is a point
            return ac.cross(s).abs() < EPS && on_segment(c, d, a);
        }
        let t0 = ac.dot(r) / rr;
        let t1 = t0 + s.dot(r) / rr;
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        return hi >= -EPS && lo <= 1.0 + EPS;
    }

    let t = ac.cross(s) / denom;
    let u = ac.cross(r) / denom;
    (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u)
}

fn on_segment(start: Vec2, end: Vec2, point: Vec2) -> bool {
    point.x >= start.x.min(end.x) - 1e-9
        && point.x <= start.x.max(end.x) + 1e-9
        && point.y >= start.y.min(end.y) - 1e-9
        && point.y <= start.y.max(end.y) + 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parallelepiped_center() {
        let c = parallelepiped_center(Vec2::new(100.0, 50.0), 40.0, 20.0);
        assert_eq!(c, Vec2::new(120.0, 60.0));
    }

    #[test]
    fn test_distance() {
        assert!(approx(distance(Vec2::new(3.0, 0.0), Vec2::new(0.0, 4.0)), 5.0));
    }

    #[test]
    fn test_smallest_angle_basic() {
        assert!(approx(smallest_angle(10.0, 350.0), 20.0));
        assert!(approx(smallest_angle(350.0, 10.0), -20.0));
        assert!(approx(smallest_angle(90.0, 0.0), 90.0));
        assert!(approx(smallest_angle(-170.0, 170.0), 20.0));
    }

    #[test]
    fn test_smallest_angle_half_turn_convention() {
        // Same direction written two ways
        assert!(approx(smallest_angle(180.0, -180.0), 0.0));
        // A half-turn is always reported as +180
        assert!(approx(smallest_angle(180.0, 0.0), 180.0));
        assert!(approx(smallest_angle(0.0, 180.0), 180.0));
    }

    #[test]
    fn test_normalize_angle() {
        assert!(approx(normalize_angle(540.0), 180.0));
        assert!(approx(normalize_angle(-180.0), 180.0));
        assert!(approx(normalize_angle(-190.0), 170.0));
        assert!(approx(normalize_angle(725.0), 5.0));
    }

    #[test]
    fn test_proportional_clamps() {
        assert!(approx(proportional(10.0, 0.0, 2.0, None), 2.0));
        assert!(approx(proportional(0.0, 10.0, 2.0, None), -2.0));
        assert!(approx(proportional(1.0, 0.5, 2.0, None), 0.5));
        assert!(approx(proportional(0.0, 0.0, 1.5, Some(-7.0)), -1.5));
    }

    #[test]
    fn test_movement_by() {
        let p = movement_by(Vec2::new(1.0, 1.0), 10.0, 90.0);
        assert!(approx(p.x, 1.0));
        assert!(approx(p.y, 11.0));
    }

    #[test]
    fn test_brake_distance() {
        assert!(approx(brake_distance(9.0, 0.5), 81.0));
        assert!(approx(brake_distance(9.0, -0.5), 81.0));
        assert!(brake_distance(1.0, 0.0).is_infinite());
    }

    #[test]
    fn test_rotation_radius() {
        // 1 degree per tick at speed pi/180 traces a unit circle
        let r = rotation_radius(std::f64::consts::PI / 180.0, 1.0);
        assert!(approx(r, 1.0));
        assert!(rotation_radius(5.0, 0.0).is_infinite());
    }

    #[test]
    fn test_rotation_centers_heading_east() {
        let (port, starboard) = rotation_centers(Vec2::ZERO, 0.0, std::f64::consts::PI, 180.0);
        // radius 1: port center above (negative y), starboard below
        assert!(approx(port.x, 0.0) && approx(port.y, -1.0));
        assert!(approx(starboard.x, 0.0) && approx(starboard.y, 1.0));
    }

    #[test]
    fn test_segments_intersect_cases() {
        let p = Vec2::new;
        // Crossing
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 2.0), p(0.0, 2.0), p(2.0, 0.0)));
        // Disjoint
        assert!(!segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0)));
        // Touching at an endpoint
        assert!(segments_intersect(p(0.0, 0.0), p(1.0, 1.0), p(1.0, 1.0), p(2.0, 0.0)));
        // Collinear overlapping
        assert!(segments_intersect(p(0.0, 0.0), p(2.0, 0.0), p(1.0, 0.0), p(3.0, 0.0)));
        // Collinear apart
        assert!(!segments_intersect(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)));
        // Non-parallel but the intersection lies outside CD
        assert!(!segments_intersect(p(0.0, 0.0), p(4.0, 0.0), p(2.0, 1.0), p(2.0, 3.0)));
    }

    proptest! {
        #[test]
        fn prop_smallest_angle_in_range(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
            let d = smallest_angle(a, b);
            prop_assert!(d > -180.0 && d <= 180.0);
        }

        #[test]
        fn prop_smallest_angle_antisymmetric(a in -1000.0f64..1000.0, b in -1000.0f64..1000.0) {
            let ab = smallest_angle(a, b);
            let ba = smallest_angle(b, a);
            if (ab.abs() - 180.0).abs() > 1e-6 {
                prop_assert!((ab + ba).abs() < 1e-6);
            }
        }

        #[test]
        fn prop_proportional_never_exceeds_gain(t in -500.0f64..500.0, c in -500.0f64..500.0, g in 0.0f64..10.0) {
            prop_assert!(proportional(t, c, g, None).abs() <= g + 1e-12);
        }
    }
}
