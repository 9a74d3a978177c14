//! Continuous 2D geometry shared by the world and pure systems.

use serde::{Deserialize, Serialize};

/// Location in continuous world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    x: f32,
    y: f32,
}

impl WorldPoint {
    /// Creates a new point from raw coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate of the point.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate of the point.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Squared euclidean distance between two points.
    #[must_use]
    pub fn distance_squared(self, other: WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: WorldPoint) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Returns the point displaced by the provided velocity for one tick.
    #[must_use]
    pub fn offset(self, velocity: Velocity) -> Self {
        Self::new(self.x + velocity.dx(), self.y + velocity.dy())
    }

    /// Linear interpolation toward `other` by the factor `t` in `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: WorldPoint, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Displacement applied to a projectile every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    dx: f32,
    dy: f32,
}

impl Velocity {
    /// Creates a velocity from its per-tick components.
    #[must_use]
    pub const fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    /// Velocity pointing from `from` toward `to` with the provided per-tick speed.
    ///
    /// Coincident points yield a zero velocity.
    #[must_use]
    pub fn toward(from: WorldPoint, to: WorldPoint, speed: f32) -> Self {
        let distance = from.distance(to);
        if distance <= f32::EPSILON {
            return Self::default();
        }
        Self::new(
            (to.x() - from.x()) / distance * speed,
            (to.y() - from.y()) / distance * speed,
        )
    }

    /// Horizontal component.
    #[must_use]
    pub const fn dx(&self) -> f32 {
        self.dx
    }

    /// Vertical component.
    #[must_use]
    pub const fn dy(&self) -> f32 {
        self.dy
    }

    /// Distance covered in a single tick.
    #[must_use]
    pub fn speed(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }
}

/// Polyline the enemies follow from their entrance to the goal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    waypoints: Vec<WorldPoint>,
}

impl Track {
    /// Creates a track from its ordered waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<WorldPoint>) -> Self {
        Self { waypoints }
    }

    /// Ordered waypoints composing the track.
    #[must_use]
    pub fn waypoints(&self) -> &[WorldPoint] {
        &self.waypoints
    }

    /// Total length of the track measured along its segments.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }

    /// Position reached after travelling `progress` units from the entrance.
    ///
    /// Progress beyond the end clamps to the final waypoint; an empty track
    /// resolves every progress to the origin.
    #[must_use]
    pub fn point_at(&self, progress: f32) -> WorldPoint {
        let Some(first) = self.waypoints.first().copied() else {
            return WorldPoint::default();
        };

        let mut remaining = progress.max(0.0);
        let mut current = first;
        for next in self.waypoints.iter().skip(1).copied() {
            let segment = current.distance(next);
            if remaining <= segment {
                if segment <= f32::EPSILON {
                    return next;
                }
                return current.lerp(next, remaining / segment);
            }
            remaining -= segment;
            current = next;
        }
        current
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new(vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(1000.0, 0.0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_point_at_walks_segments() {
        let track = Track::new(vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(10.0, 0.0),
            WorldPoint::new(10.0, 10.0),
        ]);

        assert_eq!(track.length(), 20.0);
        assert_eq!(track.point_at(5.0), WorldPoint::new(5.0, 0.0));
        assert_eq!(track.point_at(15.0), WorldPoint::new(10.0, 5.0));
        assert_eq!(track.point_at(99.0), WorldPoint::new(10.0, 10.0));
        assert_eq!(track.point_at(-3.0), WorldPoint::new(0.0, 0.0));
    }

    #[test]
    fn empty_track_resolves_to_origin() {
        let track = Track::new(Vec::new());
        assert_eq!(track.length(), 0.0);
        assert_eq!(track.point_at(12.0), WorldPoint::default());
    }

    #[test]
    fn velocity_toward_scales_to_speed() {
        let velocity = Velocity::toward(WorldPoint::new(0.0, 0.0), WorldPoint::new(3.0, 4.0), 10.0);
        assert!((velocity.dx() - 6.0).abs() < 1e-5);
        assert!((velocity.dy() - 8.0).abs() < 1e-5);
        assert!((velocity.speed() - 10.0).abs() < 1e-5);
    }

    #[test]
    fn velocity_toward_same_point_is_zero() {
        let point = WorldPoint::new(2.0, 2.0);
        assert_eq!(Velocity::toward(point, point, 5.0), Velocity::default());
    }
}
