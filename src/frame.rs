use glam::{Mat4, Vec3};

use crate::config::FogConfig;
use crate::lighting::{ShadowCaster, ShadowLight, Spotlight};
use crate::placement::{PlacedInstance, RenderPhase};

/// Grey the main pass clears to before drawing.
pub const CLEAR_COLOR: Vec3 = Vec3::splat(0.7);

/// Everything the passes of one frame read. Built once per frame by the
/// session and borrowed immutably by the renderer.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub frame_index: u64,
    pub time: f32,
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    /// Sun first, then window, matching the shadow pass order.
    pub shadow_lights: [ShadowLight; 2],
    pub spotlights: Vec<Spotlight>,
    pub fog: FogConfig,
    pub flat_shading: bool,
    /// Lit passes draw triangle edges only, when the device supports it.
    pub wireframe: bool,
    pub instances: Vec<PlacedInstance>,
}

impl FrameContext {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn shadow_light(&self, caster: ShadowCaster) -> &ShadowLight {
        match caster {
            ShadowCaster::Sun => &self.shadow_lights[0],
            ShadowCaster::Window => &self.shadow_lights[1],
        }
    }

    /// Instances drawn into the shadow maps, with their list index.
    pub fn shadow_casters(&self) -> impl Iterator<Item = (usize, &PlacedInstance)> {
        self.instances
            .iter()
            .enumerate()
            .filter(|(_, instance)| instance.casts_shadow)
    }

    /// Instances of one main-pass phase in draw order, with their list index.
    pub fn phase(&self, phase: RenderPhase) -> impl Iterator<Item = (usize, &PlacedInstance)> {
        self.instances
            .iter()
            .enumerate()
            .filter(move |(_, instance)| instance.phase == phase)
    }
}
