//! Rendering adapter: renderer-agnostic backend interface.
//!
//! # Invariants
//! - Sky code never touches a concrete graphics API, only [`RenderBackend`].
//! - The backend owns scene objects; callers hold handles.
//!
//! [`RecordingBackend`] implements the trait in memory for tests and
//! headless runs. A GPU backend implements the same trait without changing
//! consumers.

mod backend;
mod camera;
mod host;
mod recording;

pub use backend::{MaterialParam, ParamSlot, RenderBackend};
pub use camera::Camera;
pub use host::{RenderError, RenderHost, RenderSettings, Viewport};
pub use recording::{
    BackendCommand, RecordedBillboardSet, RecordedEntity, RecordedMaterial, RecordedNode,
    RecordingBackend,
};

pub fn crate_info() -> &'static str {
    "firmament-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
