use glam::{Vec2, Vec3};

/// Axis-aligned rectangle on the ground plane (x, z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepOutZone {
    pub center: Vec2,
    pub half_size: Vec2,
}

impl KeepOutZone {
    pub fn square(center: Vec2, half_size: f32) -> Self {
        Self {
            center,
            half_size: Vec2::splat(half_size),
        }
    }
}

/// Room footprint plus the fixed set of zones, shared by camera and actor.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialClamp {
    half_extents: Vec2,
    zones: Vec<KeepOutZone>,
}

impl SpatialClamp {
    pub fn new(half_extents: Vec2, zones: Vec<KeepOutZone>) -> Self {
        Self {
            half_extents,
            zones,
        }
    }

    pub fn zones(&self) -> &[KeepOutZone] {
        &self.zones
    }

    pub fn half_extents(&self) -> Vec2 {
        self.half_extents
    }

    /// Clamps a ground position with the given margin.
    ///
    /// Room bounds are applied before zones. A point strictly inside an
    /// expanded zone moves along the axis on which it is farther from the
    /// zone centre (x on ties) onto the expanded edge. Zones are resolved one
    /// at a time and are expected not to overlap.
    pub fn clamp_ground(&self, point: Vec2, margin: f32) -> Vec2 {
        let limit = self.half_extents - Vec2::splat(margin);
        let mut p = point.clamp(-limit, limit);

        for zone in &self.zones {
            let reach = zone.half_size + Vec2::splat(margin);
            let d = p - zone.center;
            if d.x.abs() < reach.x && d.y.abs() < reach.y {
                if d.x.abs() >= d.y.abs() {
                    p.x = zone.center.x + if d.x > 0.0 { reach.x } else { -reach.x };
                } else {
                    p.y = zone.center.y + if d.y > 0.0 { reach.y } else { -reach.y };
                }
            }
        }
        p
    }

    /// Clamps a 3D position and pins its height.
    pub fn clamp_position(&self, position: Vec3, margin: f32, height: f32) -> Vec3 {
        let ground = self.clamp_ground(Vec2::new(position.x, position.z), margin);
        Vec3::new(ground.x, height, ground.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery() -> SpatialClamp {
        SpatialClamp::new(
            Vec2::new(6.0, 8.0),
            vec![
                KeepOutZone::square(Vec2::new(-3.0, -2.0), 0.45),
                KeepOutZone::square(Vec2::new(2.0, -2.0), 0.45),
                KeepOutZone::square(Vec2::new(4.0, -2.0), 0.45),
            ],
        )
    }

    #[test]
    fn far_request_lands_on_corner() {
        let clamp = gallery();
        let p = clamp.clamp_position(Vec3::new(100.0, 0.0, 100.0), 0.5, 0.0);
        assert_eq!(p, Vec3::new(5.5, 0.0, 7.5));
        let p = clamp.clamp_position(Vec3::new(-100.0, 3.0, 1.0), 0.5, 0.0);
        assert_eq!(p, Vec3::new(-5.5, 0.0, 1.0));
    }

    #[test]
    fn height_is_pinned() {
        let clamp = gallery();
        let p = clamp.clamp_position(Vec3::new(0.0, 7.0, 0.0), 0.35, 1.6);
        assert_eq!(p, Vec3::new(0.0, 1.6, 0.0));
    }

    #[test]
    fn valid_positions_are_unchanged() {
        let clamp = gallery();
        for point in [
            Vec2::new(0.0, 0.0),
            Vec2::new(5.5, 7.5),
            Vec2::new(-3.0, -1.0),
            Vec2::new(3.0, -3.5),
        ] {
            assert_eq!(clamp.clamp_ground(point, 0.5), point);
            let once = clamp.clamp_ground(point * 7.0, 0.5);
            assert_eq!(clamp.clamp_ground(once, 0.5), once);
        }
    }

    fn assert_close(actual: Vec2, expected: Vec2) {
        assert!(actual.distance(expected) < 1e-5, "{actual} != {expected}");
    }

    #[test]
    fn zone_pushes_along_farther_axis() {
        let clamp = gallery();
        // Inside the first zone, farther along x.
        let p = clamp.clamp_ground(Vec2::new(-2.6, -1.9), 0.5);
        assert_close(p, Vec2::new(-2.05, -1.9));
        // Farther along z, on the negative side.
        let p = clamp.clamp_ground(Vec2::new(2.1, -2.5), 0.5);
        assert_close(p, Vec2::new(2.1, -2.95));
    }

    #[test]
    fn ties_resolve_along_x() {
        let clamp = gallery();
        let p = clamp.clamp_ground(Vec2::new(-2.75, -1.75), 0.5);
        assert_close(p, Vec2::new(-2.05, -1.75));
        let p = clamp.clamp_ground(Vec2::new(-3.25, -2.25), 0.5);
        assert_close(p, Vec2::new(-3.95, -2.25));
    }

    #[test]
    fn zone_edge_is_outside() {
        let clamp = SpatialClamp::new(
            Vec2::new(6.0, 8.0),
            vec![KeepOutZone::square(Vec2::new(2.0, -2.0), 0.5)],
        );
        let edge = Vec2::new(2.75, -2.0);
        assert_eq!(clamp.clamp_ground(edge, 0.25), edge);
        let inside = Vec2::new(2.5, -2.0);
        assert_eq!(clamp.clamp_ground(inside, 0.25), edge);
    }

    #[test]
    fn room_bound_applies_before_zone() {
        let clamp = SpatialClamp::new(
            Vec2::new(6.0, 8.0),
            vec![KeepOutZone::square(Vec2::new(5.5, 0.0), 0.45)],
        );
        // The room clamp moves x to 5.5, which then lies in the zone and is
        // pushed along x to its negative edge.
        let p = clamp.clamp_ground(Vec2::new(9.0, 0.0), 0.5);
        assert_close(p, Vec2::new(4.55, 0.0));
    }
}
