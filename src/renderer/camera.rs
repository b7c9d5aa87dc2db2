//! Free-fly camera

use glam::{Mat4, Vec3};

/// Perspective camera driven by yaw/pitch angles.
///
/// Angles are stored in degrees. `front` is derived from them and is always
/// unit length; `up` stays the fixed world up and is never re-orthogonalised.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// World up vector
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Translation speed in units per second
    pub move_speed: f32,
    /// Degrees of rotation per unit of pointer movement
    pub mouse_sensitivity: f32,
    front: Vec3,
    yaw: f32,
    pitch: f32,
    /// No pointer sample seen yet in the current capture session
    first_sample: bool,
}

impl Camera {
    /// Pitch limit in degrees, keeps the view from flipping over the pole
    pub const PITCH_LIMIT: f32 = 89.0;

    /// Create a new camera with default settings
    pub fn new() -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            up: Vec3::Y,
            fov: 45.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
            move_speed: 3.0,
            mouse_sensitivity: 0.1,
            front: Vec3::NEG_Z,
            yaw: -90.0,
            pitch: 0.0,
            first_sample: true,
        };
        camera.update_vectors();
        camera
    }

    /// Yaw in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Unit view direction
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Unit vector pointing to the camera's right
    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    /// Set the orientation directly; pitch is clamped.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.update_vectors();
    }

    /// Rebuild `front` from yaw and pitch.
    ///
    /// Axis convention: yaw -90 degrees looks down -Z.
    pub fn update_vectors(&mut self) {
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        self.front = Vec3::new(cy * cp, sp, sy * cp).normalize();
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix (projection applied after view)
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Update aspect ratio from a viewport size.
    ///
    /// A zero height (minimised window) leaves the aspect unchanged.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Start a new capture session; the next pointer sample is a baseline.
    pub fn begin_capture(&mut self) {
        self.first_sample = true;
    }

    /// Rotate from a pointer delta.
    ///
    /// The first sample of a capture session only establishes the baseline
    /// and produces no rotation.
    pub fn on_mouse_delta(&mut self, dx: f32, dy: f32) {
        if self.first_sample {
            self.first_sample = false;
            return;
        }

        self.yaw += dx * self.mouse_sensitivity;
        // Screen y grows downwards, moving up should look up
        self.pitch -= dy * self.mouse_sensitivity;
        self.pitch = self.pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.update_vectors();
    }

    /// Move from held direction keys at the camera's own speed
    pub fn on_keyboard_intent(&mut self, forward: bool, back: bool, left: bool, right: bool, dt: f32) {
        self.on_keyboard_intent_scaled(forward, back, left, right, dt, 1.0);
    }

    /// Move from held direction keys with a transient speed multiplier.
    ///
    /// Opposite keys cancel out. The stored `move_speed` is never changed.
    pub fn on_keyboard_intent_scaled(
        &mut self,
        forward: bool,
        back: bool,
        left: bool,
        right: bool,
        dt: f32,
        multiplier: f32,
    ) {
        let velocity = self.move_speed * multiplier * dt;
        let right_vec = self.right();

        let mut motion = Vec3::ZERO;
        if forward {
            motion += self.front;
        }
        if back {
            motion -= self.front;
        }
        if left {
            motion -= right_vec;
        }
        if right {
            motion += right_vec;
        }

        self.position += motion * velocity;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::new();
        assert!((camera.front() - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn test_first_mouse_sample_is_discarded() {
        let mut camera = Camera::new();
        let (yaw, pitch) = (camera.yaw(), camera.pitch());

        camera.on_mouse_delta(40.0, 25.0);
        assert_eq!(camera.yaw(), yaw);
        assert_eq!(camera.pitch(), pitch);

        camera.on_mouse_delta(40.0, 25.0);
        assert!((camera.yaw() - (yaw + 40.0 * camera.mouse_sensitivity)).abs() < EPS);
        assert!((camera.pitch() - (pitch - 25.0 * camera.mouse_sensitivity)).abs() < EPS);
    }

    #[test]
    fn test_begin_capture_resets_baseline() {
        let mut camera = Camera::new();
        camera.on_mouse_delta(0.0, 0.0);
        camera.on_mouse_delta(10.0, 0.0);
        let yaw = camera.yaw();

        camera.begin_capture();
        camera.on_mouse_delta(500.0, 500.0);
        assert_eq!(camera.yaw(), yaw);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new();
        camera.on_mouse_delta(0.0, 0.0);
        camera.on_mouse_delta(0.0, -10_000.0);
        assert_eq!(camera.pitch(), Camera::PITCH_LIMIT);

        camera.on_mouse_delta(0.0, 10_000.0);
        assert_eq!(camera.pitch(), -Camera::PITCH_LIMIT);
        assert!((camera.front().length() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut camera = Camera::new();
        let start = camera.position;

        camera.on_keyboard_intent(true, true, true, true, 0.5);
        assert!((camera.position - start).length() < EPS);
    }

    #[test]
    fn test_forward_and_strafe() {
        let mut camera = Camera::new();
        let start = camera.position;

        camera.on_keyboard_intent(true, false, false, false, 1.0);
        assert!((camera.position - (start + Vec3::NEG_Z * 3.0)).length() < EPS);

        camera.on_keyboard_intent(false, false, false, true, 1.0);
        assert!((camera.position - (start + Vec3::new(3.0, 0.0, -3.0))).length() < EPS);
    }

    #[test]
    fn test_boost_does_not_persist() {
        let mut camera = Camera::new();
        let start = camera.position;

        camera.on_keyboard_intent_scaled(true, false, false, false, 1.0, 2.5);
        assert!((camera.position - (start + Vec3::NEG_Z * 7.5)).length() < EPS);
        assert_eq!(camera.move_speed, 3.0);
    }

    #[test]
    fn test_zero_height_keeps_aspect() {
        let mut camera = Camera::new();
        camera.set_viewport(400, 300);
        assert!((camera.aspect - 4.0 / 3.0).abs() < EPS);

        camera.set_viewport(400, 0);
        assert!((camera.aspect - 4.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_view_projection_order() {
        let camera = Camera::new();
        let expected = camera.projection_matrix() * camera.view_matrix();
        assert!(camera.view_projection().abs_diff_eq(expected, EPS));

        // A point straight ahead lands in the centre of clip space
        let ahead = camera.position + camera.front() * 5.0;
        let clip = camera.view_projection() * ahead.extend(1.0);
        assert!((clip.x / clip.w).abs() < EPS);
        assert!((clip.y / clip.w).abs() < EPS);
    }
}
