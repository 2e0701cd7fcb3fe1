use bytemuck::{Pod, Zeroable};
use glam::Mat3;

use crate::frame::FrameContext;
use crate::lighting::{LightSpaceTransform, Spotlight, MAX_SPOTLIGHTS};
use crate::placement::{PlacedInstance, SurfaceKind};

const AMBIENT: f32 = 0.15;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SpotUniform {
    /// xyz position, w intensity.
    pub position: [f32; 4],
    /// xyz direction, w inner cone cosine.
    pub direction: [f32; 4],
    /// rgb colour, w outer cone cosine.
    pub color: [f32; 4],
    /// constant, linear, quadratic.
    pub attenuation: [f32; 4],
}

impl From<&Spotlight> for SpotUniform {
    fn from(spot: &Spotlight) -> Self {
        Self {
            position: spot.position.extend(spot.intensity).into(),
            direction: spot.direction.extend(spot.inner_cos).into(),
            color: spot.color.extend(spot.outer_cos).into(),
            attenuation: [spot.constant, spot.linear, spot.quadratic, 0.0],
        }
    }
}

/// Main pass globals, bound at group 0 of the lit program.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LitGlobals {
    pub view_proj: [[f32; 4]; 4],
    pub sun_view_proj: [[f32; 4]; 4],
    pub window_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub window_direction: [f32; 4],
    pub window_color: [f32; 4],
    /// rgb fog colour, w density.
    pub fog: [f32; 4],
    /// spot count, flat shading, ambient, unused.
    pub settings: [f32; 4],
    pub spots: [SpotUniform; MAX_SPOTLIGHTS],
}

impl LitGlobals {
    pub fn from_frame(frame: &FrameContext) -> Self {
        let [sun, window] = &frame.shadow_lights;
        let mut spots = [SpotUniform::zeroed(); MAX_SPOTLIGHTS];
        for (slot, spot) in spots.iter_mut().zip(&frame.spotlights) {
            *slot = SpotUniform::from(spot);
        }
        let spot_count = frame.spotlights.len().min(MAX_SPOTLIGHTS);
        Self {
            view_proj: frame.view_projection().to_cols_array_2d(),
            sun_view_proj: sun.transform.view_projection.to_cols_array_2d(),
            window_view_proj: window.transform.view_projection.to_cols_array_2d(),
            camera_position: frame.camera_position.extend(1.0).into(),
            sun_direction: sun.light.direction.extend(0.0).into(),
            sun_color: sun.light.color.extend(1.0).into(),
            window_direction: window.light.direction.extend(0.0).into(),
            window_color: window.light.color.extend(1.0).into(),
            fog: frame.fog.color.extend(frame.fog.density).into(),
            settings: [
                spot_count as f32,
                if frame.flat_shading { 1.0 } else { 0.0 },
                AMBIENT,
                0.0,
            ],
            spots,
        }
    }
}

/// Light-space matrix for one shadow pass, bound at group 0 of the depth program.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightSpaceUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl From<&LightSpaceTransform> for LightSpaceUniform {
    fn from(transform: &LightSpaceTransform) -> Self {
        Self {
            view_proj: transform.view_projection.to_cols_array_2d(),
        }
    }
}

/// Surface kinds as the shader sees them.
pub const SURFACE_LIT: f32 = 0.0;
pub const SURFACE_FULLBRIGHT: f32 = 1.0;
pub const SURFACE_GLASS: f32 = 2.0;

/// Per-instance block addressed by dynamic offset at group 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct InstanceUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    /// xy tiling, zw offset.
    pub uv_transform: [f32; 4],
    /// Sub-rectangle min.xy, max.xy.
    pub uv_rect: [f32; 4],
    /// Surface kind, alpha or glass opacity.
    pub surface: [f32; 4],
}

impl From<&PlacedInstance> for InstanceUniform {
    fn from(instance: &PlacedInstance) -> Self {
        let normal = Mat3::from_mat4(instance.transform).inverse().transpose();
        let uv = instance.material.uv;
        let (kind, factor) = match instance.material.surface {
            SurfaceKind::Lit => (SURFACE_LIT, 1.0),
            SurfaceKind::Fullbright { alpha } => (SURFACE_FULLBRIGHT, alpha),
            SurfaceKind::Glass { opacity } => (SURFACE_GLASS, opacity),
        };
        Self {
            model: instance.transform.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            uv_transform: [uv.tiling.x, uv.tiling.y, uv.offset.x, uv.offset.y],
            uv_rect: uv.rect.into(),
            surface: [kind, factor, 0.0, 0.0],
        }
    }
}

/// Flags of one material, bound with its textures at group 3.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    /// has normal map, has opacity mask, unused, unused.
    pub flags: [f32; 4],
}

impl MaterialUniform {
    pub fn new(has_normal_map: bool, has_opacity_mask: bool) -> Self {
        let flag = |set: bool| if set { 1.0 } else { 0.0 };
        Self {
            flags: [flag(has_normal_map), flag(has_opacity_mask), 0.0, 0.0],
        }
    }
}

pub fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

/// Rounds `size` up to the device's dynamic offset alignment.
pub fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalkthroughConfig;
    use crate::session::Walkthrough;
    use glam::{Mat4, Vec3};

    fn transform_normal(uniform: &InstanceUniform, normal: Vec3) -> Vec3 {
        let [c0, c1, c2] = uniform.normal;
        let matrix = Mat3::from_cols(
            Vec3::new(c0[0], c0[1], c0[2]),
            Vec3::new(c1[0], c1[1], c1[2]),
            Vec3::new(c2[0], c2[1], c2[2]),
        );
        (matrix * normal).normalize_or_zero()
    }

    #[test]
    fn block_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<SpotUniform>(), 64);
        assert_eq!(std::mem::size_of::<LitGlobals>(), 3 * 64 + 7 * 16 + 4 * 64);
        assert_eq!(std::mem::size_of::<InstanceUniform>(), 160);
        assert_eq!(std::mem::size_of::<LightSpaceUniform>(), 64);
    }

    #[test]
    fn stride_respects_alignment() {
        assert_eq!(aligned_stride(160, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(300, 256), 512);
        assert_eq!(aligned_stride(160, 0), 160);
    }

    #[test]
    fn globals_carry_both_shadow_lights() {
        let walkthrough = Walkthrough::new(WalkthroughConfig::default()).unwrap();
        let frame = walkthrough.frame_context(1280, 720, 0.0);
        let globals = LitGlobals::from_frame(&frame);
        assert_eq!(globals.settings[0], 3.0);
        assert_eq!(globals.settings[1], 0.0);
        assert_ne!(globals.sun_view_proj, globals.window_view_proj);
        assert_eq!(
            globals.sun_view_proj,
            frame.shadow_lights[0].transform.view_projection.to_cols_array_2d()
        );
        assert_eq!(globals.spots[3].position, [0.0; 4]);
    }

    #[test]
    fn floor_normal_points_up() {
        let walkthrough = Walkthrough::new(WalkthroughConfig::default()).unwrap();
        let frame = walkthrough.frame_context(800, 600, 0.0);
        let floor = frame
            .instances
            .iter()
            .find(|instance| instance.label == "floor")
            .unwrap();
        let uniform = InstanceUniform::from(floor);
        let up = transform_normal(&uniform, Vec3::Z);
        assert!(up.distance(Vec3::Y) < 1e-5, "{up}");
        assert_eq!(Mat4::from_cols_array_2d(&uniform.model), floor.transform);
        assert_eq!(uniform.uv_transform[..2], [6.0, 6.0]);
    }

    #[test]
    fn glass_exports_opacity() {
        let walkthrough = Walkthrough::new(WalkthroughConfig::default()).unwrap();
        let frame = walkthrough.frame_context(800, 600, 0.0);
        let glass = frame
            .instances
            .iter()
            .find(|instance| instance.label == "glass")
            .unwrap();
        let uniform = InstanceUniform::from(glass);
        assert_eq!(uniform.surface[0], SURFACE_GLASS);
        assert!((uniform.surface[1] - 0.4).abs() < f32::EPSILON);
    }
}
