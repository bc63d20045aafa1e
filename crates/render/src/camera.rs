use glam::{Mat4, Vec3};

/// Scene camera with position, yaw, pitch and projection parameters.
///
/// Angles are radians. The sky follows the camera position and reads its
/// view direction for the sun glare.
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: "Camera".into(),
            position: Vec3::ZERO,
            yaw: -90.0_f32.to_radians(),
            pitch: 0.0,
            fov: 55.0_f32.to_radians(),
            aspect: 4.0 / 3.0,
            near: 5.0,
            far: 10_000.0,
        }
    }
}

impl Camera {
    pub fn new(name: impl Into<String>, fov_degrees: f32, near: f32) -> Self {
        Self {
            name: name.into(),
            fov: fov_degrees.to_radians(),
            near,
            ..Self::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn set_fov_degrees(&mut self, degrees: f32) {
        self.fov = degrees.to_radians();
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    pub fn rotate(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-89.0_f32.to_radians(), 89.0_f32.to_radians());
    }

    /// Point the camera along `direction`. Zero vectors are ignored.
    pub fn look_along(&mut self, direction: Vec3) {
        let Some(dir) = direction.try_normalize() else {
            return;
        };
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
        self.yaw = dir.z.atan2(dir.x);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
