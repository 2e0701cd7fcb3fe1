use glam::Vec3;
use log::debug;

use crate::actor::NavigableActor;
use crate::camera::{perspective, Camera, LookAngles, MoveDirection};
use crate::clamp::SpatialClamp;
use crate::config::WalkthroughConfig;
use crate::dust::DustField;
use crate::error::InitError;
use crate::frame::FrameContext;
use crate::input::{InputSnapshot, KeyCode, NamedKey};
use crate::lighting::{ShadowCaster, ShadowLight, Spotlight};
use crate::placement::{place_scene, SceneLayout};

const CAMERA_KEYS: [(char, MoveDirection); 4] = [
    ('W', MoveDirection::Forward),
    ('S', MoveDirection::Backward),
    ('A', MoveDirection::Left),
    ('D', MoveDirection::Right),
];

const WIREFRAME_KEY: KeyCode = KeyCode::Function(1);
const FLAT_SHADING_KEY: KeyCode = KeyCode::Function(2);

/// Owns the camera, actor, dust and toggles of a running session.
#[derive(Debug)]
pub struct Walkthrough {
    config: WalkthroughConfig,
    layout: SceneLayout,
    clamp: SpatialClamp,
    camera: Camera,
    look: LookAngles,
    actor: NavigableActor,
    dust: DustField,
    flat_shading: bool,
    wireframe: bool,
    exit_requested: bool,
    frame_index: u64,
}

impl Walkthrough {
    pub fn new(config: WalkthroughConfig) -> Result<Self, InitError> {
        config.validate()?;
        let layout = SceneLayout::from_config(&config);
        let clamp = SpatialClamp::new(layout.half_extents(), layout.keep_out_zones());
        let camera_config = &config.camera;
        let mut camera = Camera::new(camera_config.position, camera_config.target, camera_config.up);
        let look = LookAngles::new(camera_config.initial_yaw, camera_config.initial_pitch);
        camera.rotate(look.pitch, look.yaw);

        let nav = &config.navigation;
        let mut actor = NavigableActor::new(nav.actor_start, nav.actor_yaw);
        actor.set_position(clamp.clamp_position(actor.position(), nav.actor_margin, 0.0));
        let dust = DustField::new(&config.dust);

        Ok(Self {
            layout,
            clamp,
            camera,
            look,
            actor,
            dust,
            flat_shading: false,
            wireframe: false,
            exit_requested: false,
            frame_index: 0,
            config,
        })
    }

    pub fn config(&self) -> &WalkthroughConfig {
        &self.config
    }

    pub fn layout(&self) -> &SceneLayout {
        &self.layout
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn actor(&self) -> &NavigableActor {
        &self.actor
    }

    pub fn dust(&self) -> &DustField {
        &self.dust
    }

    pub fn flat_shading(&self) -> bool {
        self.flat_shading
    }

    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Applies one frame of input and advances the simulation to `time`.
    pub fn update(&mut self, input: &InputSnapshot, time: f32) {
        let nav = &self.config.navigation;

        let mut moved = false;
        for (key, direction) in CAMERA_KEYS {
            if input.is_held(KeyCode::Character(key)) {
                self.camera.move_by(direction, nav.camera_speed);
                moved = true;
            }
        }
        if moved {
            let clamped =
                self.clamp
                    .clamp_position(self.camera.position(), nav.camera_margin, nav.eye_height);
            self.camera.set_position(clamped);
        }

        if input.pointer_delta != glam::Vec2::ZERO {
            self.look
                .apply_pointer_delta(input.pointer_delta, nav.mouse_sensitivity);
            self.camera.rotate(self.look.pitch, self.look.yaw);
        }

        if input.is_held(KeyCode::Named(NamedKey::Left)) {
            self.actor.turn(nav.actor_turn_degrees);
        }
        if input.is_held(KeyCode::Named(NamedKey::Right)) {
            self.actor.turn(-nav.actor_turn_degrees);
        }
        let mut walk = 0.0;
        if input.is_held(KeyCode::Named(NamedKey::Up)) {
            walk += nav.actor_speed;
        }
        if input.is_held(KeyCode::Named(NamedKey::Down)) {
            walk -= nav.actor_speed;
        }
        if walk != 0.0 {
            self.actor.walk(walk);
            let clamped = self
                .clamp
                .clamp_position(self.actor.position(), nav.actor_margin, 0.0);
            self.actor.set_position(clamped);
        }
        if input.was_pressed(KeyCode::Named(NamedKey::Space)) {
            self.actor.toggle_animation();
            debug!("actor animation {}", self.actor.pose().animating);
        }
        self.actor.advance(nav.actor_anim_step);

        if input.was_pressed(WIREFRAME_KEY) {
            self.wireframe = !self.wireframe;
            debug!("wireframe {}", self.wireframe);
        }
        if input.was_pressed(FLAT_SHADING_KEY) {
            self.flat_shading = !self.flat_shading;
            debug!("flat shading {}", self.flat_shading);
        }
        if input.was_pressed(KeyCode::Named(NamedKey::Escape)) {
            self.exit_requested = true;
        }

        self.dust.advance(time);
        self.frame_index += 1;
    }

    /// Builds the immutable per-frame view for a `width` x `height` target.
    pub fn frame_context(&self, width: u32, height: u32, time: f32) -> FrameContext {
        let camera_config = &self.config.camera;
        let mut instances = place_scene(&self.layout, time, &self.actor.pose());
        instances.extend(self.dust.billboards(self.camera.right(), self.camera.up()));

        FrameContext {
            frame_index: self.frame_index,
            time,
            view: self.camera.view_matrix(),
            projection: perspective(
                camera_config.fov_degrees,
                width,
                height,
                camera_config.near,
                camera_config.far,
            ),
            camera_position: self.camera.position(),
            shadow_lights: [
                ShadowLight::solve(ShadowCaster::Sun, &self.config.sun),
                ShadowLight::solve(ShadowCaster::Window, &self.config.window_light),
            ],
            spotlights: self.config.spotlights.iter().map(Spotlight::from_config).collect(),
            fog: self.config.fog.clone(),
            flat_shading: self.flat_shading,
            wireframe: self.wireframe,
            instances,
        }
    }

    /// One-line description of where everything stands, used by the CLI.
    pub fn describe(&self) -> String {
        let camera: Vec3 = self.camera.position();
        let actor = self.actor.pose();
        format!(
            "frame {} camera ({:.2}, {:.2}, {:.2}) actor ({:.2}, {:.2}, {:.2}) yaw {:.1} flat_shading {}",
            self.frame_index,
            camera.x,
            camera.y,
            camera.z,
            actor.position.x,
            actor.position.y,
            actor.position.z,
            actor.yaw_degrees,
            self.flat_shading
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::RenderPhase;

    fn session() -> Walkthrough {
        Walkthrough::new(WalkthroughConfig::default()).unwrap()
    }

    fn key(name: &str) -> KeyCode {
        KeyCode::from_name(name).unwrap()
    }

    #[test]
    fn forward_moves_toward_the_window() {
        let mut walkthrough = session();
        walkthrough.update(&InputSnapshot::holding([key("W")]), 0.0);
        let position = walkthrough.camera().position();
        assert!(position.distance(Vec3::new(0.0, 1.6, 5.9)) < 1e-4, "{position}");
    }

    #[test]
    fn camera_cannot_leave_the_room() {
        let mut walkthrough = session();
        let hold = InputSnapshot::holding([key("S")]);
        for frame in 0..100 {
            walkthrough.update(&hold, frame as f32 / 60.0);
        }
        let position = walkthrough.camera().position();
        assert!((position.z - 7.65).abs() < 1e-4, "{position}");
        assert!((position.y - 1.6).abs() < 1e-6);
    }

    #[test]
    fn pointer_rotates_view() {
        let mut walkthrough = session();
        let input = InputSnapshot {
            pointer_delta: glam::Vec2::new(0.0, -100.0),
            ..InputSnapshot::default()
        };
        walkthrough.update(&input, 0.0);
        assert!(walkthrough.camera().front().y > 0.1);
    }

    #[test]
    fn actor_walks_and_toggles() {
        let mut walkthrough = session();
        let mut input = InputSnapshot::holding([key("Up")]);
        input.pressed.insert(key("Space"));
        walkthrough.update(&input, 0.0);
        let pose = walkthrough.actor().pose();
        assert!(pose.animating);
        assert!(pose.position.distance(Vec3::new(0.0, 0.0, 1.9)) < 1e-4);

        walkthrough.update(&InputSnapshot::holding([key("Left")]), 0.0);
        assert!((walkthrough.actor().pose().yaw_degrees - 183.0).abs() < 1e-4);
    }

    #[test]
    fn edge_keys_toggle_once() {
        let mut walkthrough = session();
        let mut input = InputSnapshot::holding([key("F2")]);
        input.pressed.insert(key("F2"));
        walkthrough.update(&input, 0.0);
        assert!(walkthrough.flat_shading());
        walkthrough.update(&InputSnapshot::holding([key("F2")]), 0.0);
        assert!(walkthrough.flat_shading());

        let mut escape = InputSnapshot::default();
        escape.pressed.insert(key("Escape"));
        walkthrough.update(&escape, 0.0);
        assert!(walkthrough.exit_requested());
    }

    #[test]
    fn wireframe_flips_on_each_press() {
        let mut walkthrough = session();
        let mut press = InputSnapshot::holding([key("F1")]);
        press.pressed.insert(key("F1"));

        walkthrough.update(&press, 0.0);
        assert!(walkthrough.wireframe());
        walkthrough.update(&InputSnapshot::holding([key("F1")]), 0.0);
        assert!(walkthrough.wireframe());
        assert!(walkthrough.frame_context(800, 600, 0.0).wireframe);

        walkthrough.update(&press, 0.0);
        assert!(!walkthrough.wireframe());
        assert!(!walkthrough.flat_shading());
        assert!(!walkthrough.frame_context(800, 600, 0.0).wireframe);
    }

    #[test]
    fn frame_context_orders_glass_before_dust() {
        let walkthrough = session();
        let frame = walkthrough.frame_context(800, 600, 0.0);
        let transparent: Vec<_> = frame
            .phase(RenderPhase::Transparent)
            .map(|(_, instance)| instance.label)
            .collect();
        assert_eq!(transparent[0], "glass");
        assert_eq!(transparent.len(), 1 + walkthrough.dust().motes().len());
        assert!(frame.shadow_casters().all(|(_, i)| i.phase == RenderPhase::Opaque));
        assert_eq!(frame.shadow_light(ShadowCaster::Window).caster, ShadowCaster::Window);
    }

    #[test]
    fn invalid_config_fails_to_start() {
        let mut config = WalkthroughConfig::default();
        config.sun.map_size = 0;
        assert!(matches!(
            Walkthrough::new(config),
            Err(InitError::ZeroSizedShadowTarget(_))
        ));
    }
}
