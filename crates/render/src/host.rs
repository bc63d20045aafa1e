use serde::{Deserialize, Serialize};

use crate::camera::Camera;

/// Errors from render host operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RenderError {
    #[error("no scene: call create_scene first")]
    NoScene,
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("field of view must be in (0, 180) degrees, got {0}")]
    InvalidFov(f32),
}

/// Window settings handed to the host. Stored and reported only; window
/// creation belongs to the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub vsync: bool,
    pub fullscreen: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Multisample level, empty for none.
    pub fsaa: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            vsync: false,
            fullscreen: false,
            window_width: 800,
            window_height: 600,
            fsaa: String::new(),
        }
    }
}

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Lifecycle wrapper around the scene camera and viewport.
///
/// Created once, given a scene with [`RenderHost::create_scene`], updated
/// once per frame and torn down with [`RenderHost::cleanup`].
#[derive(Debug)]
pub struct RenderHost {
    settings: RenderSettings,
    camera: Option<Camera>,
    viewport: Viewport,
    frames: u64,
    elapsed: f64,
}

impl RenderHost {
    pub fn new(settings: RenderSettings) -> Self {
        let viewport = Viewport {
            width: settings.window_width.max(1),
            height: settings.window_height.max(1),
        };
        Self {
            settings,
            camera: None,
            viewport,
            frames: 0,
            elapsed: 0.0,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Set up the scene camera. Replaces any previous scene.
    pub fn create_scene(
        &mut self,
        camera_name: &str,
        fov_degrees: f32,
        near_clip: f32,
    ) -> Result<&mut Camera, RenderError> {
        validate_fov(fov_degrees)?;
        let mut camera = Camera::new(camera_name, fov_degrees, near_clip);
        camera.aspect = self.viewport.aspect();
        tracing::debug!(
            camera = camera_name,
            fov = fov_degrees,
            near = near_clip,
            "scene created"
        );
        Ok(self.camera.insert(camera))
    }

    /// Scene with the default camera: "Camera", 55 degrees, near clip 5.
    pub fn create_default_scene(&mut self) -> Result<&mut Camera, RenderError> {
        self.create_scene("Camera", 55.0, 5.0)
    }

    pub fn has_scene(&self) -> bool {
        self.camera.is_some()
    }

    pub fn set_fov(&mut self, fov_degrees: f32) -> Result<(), RenderError> {
        validate_fov(fov_degrees)?;
        let camera = self.camera.as_mut().ok_or(RenderError::NoScene)?;
        camera.set_fov_degrees(fov_degrees);
        Ok(())
    }

    /// Resize the viewport and keep the camera aspect ratio in step.
    pub fn adjust_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport { width, height });
        }
        self.viewport = Viewport { width, height };
        if let Some(camera) = &mut self.camera {
            camera.aspect = self.viewport.aspect();
        }
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn camera(&self) -> Result<&Camera, RenderError> {
        self.camera.as_ref().ok_or(RenderError::NoScene)
    }

    pub fn camera_mut(&mut self) -> Result<&mut Camera, RenderError> {
        self.camera.as_mut().ok_or(RenderError::NoScene)
    }

    /// Account for one rendered frame of `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.frames += 1;
        self.elapsed += dt.max(0.0) as f64;
        tracing::trace!(frame = self.frames, dt, "render host update");
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Drop the scene. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.camera.take().is_some() {
            tracing::debug!(frames = self.frames, "render host cleaned up");
        }
    }
}

fn validate_fov(fov_degrees: f32) -> Result<(), RenderError> {
    if fov_degrees > 0.0 && fov_degrees < 180.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidFov(fov_degrees))
    }
}
