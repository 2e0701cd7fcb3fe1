use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::DustConfig;
use crate::placement::{
    Drawable, MaterialBinding, MaterialId, PlacedInstance, RenderPhase, SurfaceKind, UvParams,
};

const SPAWN_MIN: Vec3 = Vec3::new(-5.0, 0.0, -8.0);
const SPAWN_MAX: Vec3 = Vec3::new(5.0, 4.0, 2.0);
const DRIFT: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustMote {
    pub position: Vec3,
    pub fall_speed: f32,
    pub phase: f32,
}

/// Slowly falling motes that wrap from the floor back to the top.
#[derive(Debug, Clone)]
pub struct DustField {
    motes: Vec<DustMote>,
    floor: f32,
    ceiling: f32,
    size: f32,
    alpha: f32,
}

impl DustField {
    pub fn new(config: &DustConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let motes = (0..config.count)
            .map(|_| DustMote {
                position: Vec3::new(
                    rng.gen_range(SPAWN_MIN.x..SPAWN_MAX.x),
                    rng.gen_range(SPAWN_MIN.y..SPAWN_MAX.y),
                    rng.gen_range(SPAWN_MIN.z..SPAWN_MAX.z),
                ),
                fall_speed: rng.gen_range(0.005..0.055),
                phase: rng.gen_range(0.0..10.0),
            })
            .collect();
        Self {
            motes,
            floor: SPAWN_MIN.y,
            ceiling: SPAWN_MAX.y,
            size: config.size,
            alpha: config.alpha,
        }
    }

    pub fn motes(&self) -> &[DustMote] {
        &self.motes
    }

    /// One simulation step at time `time` seconds.
    pub fn advance(&mut self, time: f32) {
        for mote in &mut self.motes {
            mote.position.y -= mote.fall_speed;
            mote.position.x += (time + mote.phase).sin() * DRIFT;
            if mote.position.y < self.floor {
                mote.position.y = self.ceiling;
            }
        }
    }

    /// Camera-facing quads for the transparent sub-pass.
    pub fn billboards(&self, camera_right: Vec3, camera_up: Vec3) -> Vec<PlacedInstance> {
        let normal = camera_right.cross(camera_up);
        let material = MaterialBinding {
            id: MaterialId::Dust,
            uv: UvParams::IDENTITY,
            surface: SurfaceKind::Fullbright { alpha: self.alpha },
        };
        self.motes
            .iter()
            .map(|mote| PlacedInstance {
                label: "dust",
                drawable: Drawable::Quad,
                transform: Mat4::from_cols(
                    (camera_right * self.size).extend(0.0),
                    (camera_up * self.size).extend(0.0),
                    normal.extend(0.0),
                    mote.position.extend(1.0),
                ),
                material,
                phase: RenderPhase::Transparent,
                casts_shadow: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_fields_match() {
        let config = DustConfig::default();
        let a = DustField::new(&config);
        let b = DustField::new(&config);
        assert_eq!(a.motes(), b.motes());
        assert_eq!(a.motes().len(), 250);
        for mote in a.motes() {
            let p = mote.position;
            assert!(p.cmpge(SPAWN_MIN).all() && p.cmplt(SPAWN_MAX).all());
            assert!((0.005..0.055).contains(&mote.fall_speed));
        }
    }

    #[test]
    fn motes_wrap_to_ceiling() {
        let mut field = DustField::new(&DustConfig::default());
        field.motes[0] = DustMote {
            position: Vec3::new(0.0, 0.01, 0.0),
            fall_speed: 0.05,
            phase: 0.0,
        };
        field.advance(0.0);
        assert_eq!(field.motes()[0].position.y, 4.0);
        for step in 0..500 {
            field.advance(step as f32 / 60.0);
        }
        for mote in field.motes() {
            assert!((0.0..=4.0).contains(&mote.position.y));
        }
    }

    #[test]
    fn billboards_face_the_camera() {
        let field = DustField::new(&DustConfig {
            count: 3,
            ..DustConfig::default()
        });
        let quads = field.billboards(Vec3::X, Vec3::Y);
        assert_eq!(quads.len(), 3);
        for quad in &quads {
            assert_eq!(quad.phase, RenderPhase::Transparent);
            assert!(!quad.casts_shadow);
            let facing = quad.transform.transform_vector3(Vec3::Z);
            assert!(facing.distance(Vec3::Z) < 1e-6);
        }
    }
}
