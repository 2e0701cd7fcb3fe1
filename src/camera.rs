use glam::{Mat4, Vec2, Vec3};

const WORLD_UP: Vec3 = Vec3::Y;

/// Pitch limit keeping the look-at basis away from world up.
pub const PITCH_LIMIT: f32 = 89.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Camera state; `front`, `up` and `right` stay orthonormal after every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    target: Vec3,
}

impl Camera {
    /// Builds the basis from a look-at triple. `up` does not need to be
    /// orthogonal to the view direction, but must not be parallel to it.
    pub fn new(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let front = (target - position).normalize();
        let right = front.cross(up.normalize()).normalize();
        let up = right.cross(front).normalize();
        Self {
            position,
            front,
            up,
            right,
            target: position + front,
        }
    }

    /// Translates along the basis; bounds are the caller's concern.
    pub fn move_by(&mut self, direction: MoveDirection, speed: f32) {
        let delta = match direction {
            MoveDirection::Forward => self.front * speed,
            MoveDirection::Backward => -self.front * speed,
            MoveDirection::Right => self.right * speed,
            MoveDirection::Left => -self.right * speed,
        };
        self.position += delta;
        self.target = self.position + self.front;
    }

    /// Rebuilds the basis from absolute angles in degrees.
    ///
    /// This is not incremental: callers keep the accumulated angles (see
    /// [`LookAngles`]) and must keep `pitch` inside `±PITCH_LIMIT`.
    pub fn rotate(&mut self, pitch: f32, yaw: f32) {
        let (sin_pitch, cos_pitch) = pitch.to_radians().sin_cos();
        let (sin_yaw, cos_yaw) = yaw.to_radians().sin_cos();
        self.front = Vec3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize();
        self.right = self.front.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.front).normalize();
        self.target = self.position + self.front;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.target = position + self.front;
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }
}

/// Accumulated yaw/pitch owned by whoever drives [`Camera::rotate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub yaw: f32,
    pub pitch: f32,
}

impl LookAngles {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    /// Applies a pointer delta in pixels; screen y grows downwards.
    pub fn apply_pointer_delta(&mut self, delta: Vec2, sensitivity: f32) {
        self.yaw += delta.x * sensitivity;
        self.pitch = (self.pitch - delta.y * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

/// Vertical field of view projection, guarding against a zero-height surface.
pub fn perspective(fov_degrees: f32, width: u32, height: u32, near: f32, far: f32) -> Mat4 {
    let aspect = if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    };
    Mat4::perspective_rh(fov_degrees.to_radians(), aspect.max(0.01), near, far)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_orthonormal(camera: &Camera) {
        let (f, u, r) = (camera.front(), camera.up(), camera.right());
        assert!(f.dot(u).abs() < EPS);
        assert!(f.dot(r).abs() < EPS);
        assert!(u.dot(r).abs() < EPS);
        for v in [f, u, r] {
            assert!((v.length() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn basis_is_orthonormal_for_skewed_up() {
        let samples = [
            (Vec3::new(0.0, 1.6, 6.0), Vec3::new(0.0, 1.6, 0.0), Vec3::Y),
            (Vec3::new(1.0, 2.0, 3.0), Vec3::new(-4.0, 0.5, 2.0), Vec3::new(0.3, 1.0, 0.2)),
            (Vec3::ZERO, Vec3::new(0.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 0.0)),
        ];
        for (position, target, up) in samples {
            assert_orthonormal(&Camera::new(position, target, up));
        }
    }

    #[test]
    fn forward_move_keeps_front() {
        let mut camera = Camera::new(Vec3::new(0.0, 1.6, 6.0), Vec3::new(0.0, 1.6, 0.0), Vec3::Y);
        camera.move_by(MoveDirection::Forward, 0.1);
        assert!(camera.position().distance(Vec3::new(0.0, 1.6, 5.9)) < EPS);
        assert!(camera.front().distance(Vec3::new(0.0, 0.0, -1.0)) < EPS);
        assert!(camera.target().distance(Vec3::new(0.0, 1.6, 4.9)) < EPS);
    }

    #[test]
    fn strafing_uses_right_vector() {
        let mut camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        camera.move_by(MoveDirection::Right, 1.0);
        assert!(camera.position().distance(Vec3::X) < EPS);
        camera.move_by(MoveDirection::Left, 2.0);
        assert!(camera.position().distance(Vec3::NEG_X) < EPS);
    }

    #[test]
    fn rotate_sets_elevation_from_pitch() {
        for (pitch, yaw) in [(0.0, -90.0), (30.0, 10.0), (-45.0, 200.0), (89.0, 0.0)] {
            let mut camera = Camera::new(Vec3::new(3.0, 1.0, -2.0), Vec3::ZERO, Vec3::Y);
            camera.rotate(pitch, yaw);
            let view = camera.view_matrix();
            // The third row of a look-at view holds the negated view direction.
            let forward = -Vec3::new(view.x_axis.z, view.y_axis.z, view.z_axis.z);
            let angle = forward.angle_between(Vec3::Y).to_degrees();
            assert!((angle - (90.0 - pitch)).abs() < 1e-2, "pitch {pitch}: {angle}");
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn initial_yaw_matches_default_view() {
        let mut camera = Camera::new(Vec3::new(0.0, 1.6, 6.0), Vec3::new(0.0, 1.6, 0.0), Vec3::Y);
        let before = camera.front();
        camera.rotate(0.0, -90.0);
        assert!(camera.front().distance(before) < EPS);
    }

    #[test]
    fn look_angles_clamp_pitch() {
        let mut look = LookAngles::new(-90.0, 0.0);
        look.apply_pointer_delta(Vec2::new(10.0, -5000.0), 0.08);
        assert!((look.yaw - -89.2).abs() < EPS);
        assert_eq!(look.pitch, PITCH_LIMIT);
        look.apply_pointer_delta(Vec2::new(0.0, 10000.0), 0.08);
        assert_eq!(look.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn projection_survives_zero_height() {
        let projection = perspective(45.0, 800, 0, 0.1, 20.0);
        assert!(projection.is_finite());
    }
}
