use glam::Vec3;

/// Amplitude of the forward/back sway while the walk animation runs.
pub const WALK_SWAY: f32 = 0.25;

/// Pose snapshot consumed by scene placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorPose {
    pub position: Vec3,
    pub yaw_degrees: f32,
    pub animating: bool,
    pub anim_phase: f32,
}

impl ActorPose {
    /// Offset along z added on top of the pose while animating.
    pub fn walk_offset(&self) -> f32 {
        if self.animating {
            WALK_SWAY * self.anim_phase.sin()
        } else {
            0.0
        }
    }
}

/// Keyboard driven figure that shares the room clamp with the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigableActor {
    pose: ActorPose,
}

impl NavigableActor {
    pub fn new(position: Vec3, yaw_degrees: f32) -> Self {
        Self {
            pose: ActorPose {
                position,
                yaw_degrees,
                animating: false,
                anim_phase: 0.0,
            },
        }
    }

    pub fn pose(&self) -> ActorPose {
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    /// Unit heading on the ground plane for the current yaw.
    pub fn heading(&self) -> Vec3 {
        let (sin, cos) = self.pose.yaw_degrees.to_radians().sin_cos();
        Vec3::new(sin, 0.0, cos)
    }

    pub fn turn(&mut self, degrees: f32) {
        self.pose.yaw_degrees += degrees;
    }

    /// Moves along the heading; negative distances walk backwards.
    pub fn walk(&mut self, distance: f32) {
        self.pose.position += self.heading() * distance;
    }

    pub fn toggle_animation(&mut self) {
        self.pose.animating = !self.pose.animating;
    }

    /// Advances the walk phase, only while animating.
    pub fn advance(&mut self, phase_step: f32) {
        if self.pose.animating {
            self.pose.anim_phase += phase_step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_follows_yaw() {
        let mut actor = NavigableActor::new(Vec3::new(0.0, 0.0, 2.0), 180.0);
        actor.walk(0.1);
        assert!(actor.position().distance(Vec3::new(0.0, 0.0, 1.9)) < 1e-5);
        actor.turn(-90.0);
        actor.walk(1.0);
        assert!(actor.position().distance(Vec3::new(1.0, 0.0, 1.9)) < 1e-5);
    }

    #[test]
    fn animation_only_advances_when_enabled() {
        let mut actor = NavigableActor::new(Vec3::ZERO, 0.0);
        actor.advance(0.02);
        assert_eq!(actor.pose().anim_phase, 0.0);
        assert_eq!(actor.pose().walk_offset(), 0.0);

        actor.toggle_animation();
        for _ in 0..50 {
            actor.advance(0.02);
        }
        let pose = actor.pose();
        assert!((pose.anim_phase - 1.0).abs() < 1e-4);
        assert!((pose.walk_offset() - WALK_SWAY * 1.0f32.sin()).abs() < 1e-4);
    }
}
