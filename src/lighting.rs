use glam::{Mat4, Vec3, Vec4};

use crate::config::{ShadowLightConfig, SpotlightConfig};

/// Size of the spotlight table uploaded with the main pass globals.
pub const MAX_SPOTLIGHTS: usize = 4;

/// The lights that own a shadow map, in the order their passes run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowCaster {
    Sun,
    Window,
}

impl ShadowCaster {
    pub const ALL: [ShadowCaster; 2] = [ShadowCaster::Sun, ShadowCaster::Window];

    pub fn label(self) -> &'static str {
        match self {
            ShadowCaster::Sun => "sun",
            ShadowCaster::Window => "window",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Unit vector along which the light travels.
    pub direction: Vec3,
    pub color: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spotlight {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub inner_cos: f32,
    pub outer_cos: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub intensity: f32,
}

impl Spotlight {
    pub fn from_config(config: &SpotlightConfig) -> Self {
        Self {
            position: config.position,
            direction: config.direction.normalize_or_zero(),
            color: config.color,
            inner_cos: config.inner_degrees.to_radians().cos(),
            outer_cos: config.outer_degrees.to_radians().cos(),
            constant: config.constant,
            linear: config.linear,
            quadratic: config.quadratic,
            intensity: config.intensity,
        }
    }
}

/// View and orthographic projection of one shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpaceTransform {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl LightSpaceTransform {
    /// Maps a world position into the light's clip space.
    pub fn project(&self, world: Vec3) -> Vec3 {
        let clip = self.view_projection * Vec4::new(world.x, world.y, world.z, 1.0);
        clip.truncate() / clip.w
    }
}

/// Builds the light-space transform for a directional shadow caster.
///
/// The eye is placed half way through the depth range behind `center`, so
/// `center` lands on the clip-space origin in x/y and half depth in z.
pub fn compute_light_space(
    direction: Vec3,
    half_extent: f32,
    near: f32,
    far: f32,
    center: Vec3,
) -> LightSpaceTransform {
    let dir = if direction.length_squared() > 1e-6 {
        direction.normalize()
    } else {
        Vec3::NEG_Y
    };
    let up = if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let distance = (near + far) * 0.5;
    let eye = center - dir * distance;
    let view = Mat4::look_at_rh(eye, center, up);
    let projection =
        Mat4::orthographic_rh(-half_extent, half_extent, -half_extent, half_extent, near, far);
    LightSpaceTransform {
        view,
        projection,
        view_projection: projection * view,
    }
}

/// A shadow-casting directional light together with its frame transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowLight {
    pub caster: ShadowCaster,
    pub light: DirectionalLight,
    pub transform: LightSpaceTransform,
    pub map_size: u32,
}

impl ShadowLight {
    pub fn solve(caster: ShadowCaster, config: &ShadowLightConfig) -> Self {
        let transform = compute_light_space(
            config.direction,
            config.half_extent,
            config.near,
            config.far,
            config.center,
        );
        Self {
            caster,
            light: DirectionalLight {
                direction: config.direction.normalize_or_zero(),
                color: config.color,
            },
            transform,
            map_size: config.map_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_projects_to_clip_origin() {
        for config in [ShadowLightConfig::sun(), ShadowLightConfig::window()] {
            let solved = compute_light_space(
                config.direction,
                config.half_extent,
                config.near,
                config.far,
                config.center,
            );
            let clip = solved.project(config.center);
            assert!(clip.x.abs() < 1e-4 && clip.y.abs() < 1e-4, "{clip}");
            assert!((clip.z - 0.5).abs() < 1e-4, "{clip}");
        }
    }

    #[test]
    fn points_toward_the_light_are_closer() {
        let config = ShadowLightConfig::sun();
        let solved = compute_light_space(
            config.direction,
            config.half_extent,
            config.near,
            config.far,
            config.center,
        );
        let nearer = solved.project(config.center - config.direction * 2.0);
        let farther = solved.project(config.center + config.direction * 2.0);
        assert!(nearer.z < farther.z);
    }

    #[test]
    fn room_corners_fit_inside_sun_frustum() {
        let config = ShadowLightConfig::sun();
        let solved = ShadowLight::solve(ShadowCaster::Sun, &config).transform;
        for x in [-6.0, 6.0] {
            for y in [0.0, 4.0] {
                for z in [-8.0, 8.0] {
                    let clip = solved.project(Vec3::new(x, y, z));
                    assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0, "{clip}");
                    assert!((0.0..=1.0).contains(&clip.z), "{clip}");
                }
            }
        }
    }

    #[test]
    fn vertical_light_uses_fallback_up() {
        let solved = compute_light_space(Vec3::NEG_Y, 5.0, 1.0, 10.0, Vec3::ZERO);
        assert!(solved.view_projection.is_finite());
        let clip = solved.project(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
    }

    #[test]
    fn spotlight_cone_angles_become_cosines() {
        let spot = Spotlight::from_config(&SpotlightConfig::default());
        assert!(spot.inner_cos > spot.outer_cos);
        assert!((spot.direction.length() - 1.0).abs() < 1e-5);
    }
}
