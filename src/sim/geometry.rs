//! 2D geometry helpers
//!
//! World coordinates are pixels with the y axis pointing down, matching the
//! tile map layout. Boxes are anchored at their top-left corner.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// Pulls sampled corners just inside a box so an edge lying exactly on a tile
/// boundary does not count as touching the next tile.
pub const EDGE_EPSILON: f32 = 0.01;

/// How far the melee arc anchor is pulled back behind the attacker's center.
pub const MELEE_ARC_INSET: f32 = 4.0;

/// Cardinal facing direction of an entity or projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Unit vector in screen space (y grows downward).
    pub fn unit(self) -> Vec2 {
        match self {
            Facing::Up => Vec2::new(0.0, -1.0),
            Facing::Down => Vec2::new(0.0, 1.0),
            Facing::Left => Vec2::new(-1.0, 0.0),
            Facing::Right => Vec2::new(1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Facing::Left | Facing::Right)
    }

    /// Dominant facing for a movement vector, `None` for a zero vector.
    pub fn from_vector(v: Vec2) -> Option<Self> {
        if v == Vec2::ZERO {
            return None;
        }
        if v.x.abs() >= v.y.abs() {
            Some(if v.x > 0.0 { Facing::Right } else { Facing::Left })
        } else {
            Some(if v.y > 0.0 { Facing::Down } else { Facing::Up })
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self::new(self.min + offset, self.size)
    }

    /// Strict overlap test: boxes sharing only an edge do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x && other.min.x < a_max.x && self.min.y < b_max.y && other.min.y < a_max.y
    }

    /// The four corners used for tile sampling, pulled just inside the box.
    pub fn sample_corners(&self) -> [Vec2; 4] {
        let far = self.max() - Vec2::splat(EDGE_EPSILON);
        [
            self.min,
            Vec2::new(far.x, self.min.y),
            Vec2::new(self.min.x, far.y),
            far,
        ]
    }
}

/// Pie-shaped melee hit region: the half ellipse in front of the attacker.
///
/// The anchor sits at the attacker's center, pulled back by
/// [`MELEE_ARC_INSET`] so the swing starts inside the attacker's body; the
/// forward semi-axis still ends `range` past the center. The lateral semi-axis
/// is half the attacker's extent across the facing direction (its height when
/// facing left or right).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeleeArc {
    pub anchor: Vec2,
    pub facing: Facing,
    pub reach: f32,
    pub half_width: f32,
}

impl MeleeArc {
    pub fn new(attacker: &Aabb, facing: Facing, range: f32) -> Self {
        let lateral = if facing.is_horizontal() {
            attacker.size.y
        } else {
            attacker.size.x
        };
        Self {
            anchor: attacker.center() - facing.unit() * MELEE_ARC_INSET,
            facing,
            reach: range + MELEE_ARC_INSET,
            half_width: lateral * 0.5,
        }
    }

    /// True when any part of `target` lies inside the arc.
    pub fn intersects(&self, target: &Aabb) -> bool {
        if self.reach <= 0.0 || self.half_width <= 0.0 {
            return false;
        }

        let lo = target.min - self.anchor;
        let hi = target.max() - self.anchor;

        // Rotate into the arc's frame: forward along +f, lateral along l.
        let (f0, f1, l0, l1) = match self.facing {
            Facing::Right => (lo.x, hi.x, lo.y, hi.y),
            Facing::Left => (-hi.x, -lo.x, lo.y, hi.y),
            Facing::Down => (lo.y, hi.y, lo.x, hi.x),
            Facing::Up => (-hi.y, -lo.y, lo.x, hi.x),
        };

        // Entirely behind the anchor line.
        if f1 < 0.0 {
            return false;
        }

        // Scale the ellipse to a unit circle and find the box point closest
        // to the anchor on the forward half-plane.
        let f = f0.max(0.0) / self.reach;
        let l = 0.0f32.clamp(l0, l1) / self.half_width;
        f * f + l * l <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f32, y: f32, w: f32, h: f32) -> Aabb {
        Aabb::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[test]
    fn test_aabb_edge_contact_is_not_overlap() {
        let a = boxed(0.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&boxed(10.0, 0.0, 10.0, 10.0)));
        assert!(a.intersects(&boxed(9.0, 9.0, 10.0, 10.0)));
    }

    #[test]
    fn test_sample_corners_stay_inside() {
        let corners = boxed(32.0, 0.0, 32.0, 32.0).sample_corners();
        assert!(corners.iter().all(|c| c.x < 64.0 && c.y < 32.0));
    }

    #[test]
    fn test_facing_from_vector_prefers_horizontal_on_tie() {
        assert_eq!(Facing::from_vector(Vec2::new(1.0, 1.0)), Some(Facing::Right));
        assert_eq!(Facing::from_vector(Vec2::new(0.0, -2.0)), Some(Facing::Up));
        assert_eq!(Facing::from_vector(Vec2::ZERO), None);
    }

    #[test]
    fn test_arc_hits_target_in_front_only() {
        let attacker = boxed(0.0, 0.0, 20.0, 20.0);
        let arc = MeleeArc::new(&attacker, Facing::Right, 30.0);

        // Just in front, vertically centered.
        assert!(arc.intersects(&boxed(22.0, 5.0, 10.0, 10.0)));
        // Behind the attacker.
        assert!(!arc.intersects(&boxed(-30.0, 5.0, 10.0, 10.0)));
        // Beyond reach.
        assert!(!arc.intersects(&boxed(60.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn test_arc_follows_facing() {
        let attacker = boxed(100.0, 100.0, 20.0, 20.0);
        let target_above = boxed(105.0, 80.0, 10.0, 10.0);

        assert!(MeleeArc::new(&attacker, Facing::Up, 25.0).intersects(&target_above));
        assert!(!MeleeArc::new(&attacker, Facing::Down, 25.0).intersects(&target_above));
    }

    #[test]
    fn test_arc_lateral_extent_is_bounded() {
        let attacker = boxed(0.0, 0.0, 20.0, 20.0);
        let arc = MeleeArc::new(&attacker, Facing::Right, 40.0);

        // Far off to the side even though within forward reach.
        assert!(!arc.intersects(&boxed(15.0, 60.0, 10.0, 10.0)));
    }
}
