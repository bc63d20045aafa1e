//! Sky rendering: sun, sun glare, the two moons, cloud layer, atmosphere
//! and night dome.
//!
//! # Invariants
//! - Every sky object hangs off one root node that follows the camera.
//! - Billboards sit at a fixed distance along a unit direction and face
//!   the root.
//! - Weather parameters are written to the backend only when they change.
//! - Dropping [`SkyManager`] releases every backend object it created.

mod billboard;
mod config;
mod error;
mod manager;
mod moon;
mod summary;
mod weather;

pub use billboard::{BILLBOARD_BASE_SIZE, Billboard, BillboardKind, PHASE_ALPHA, SKY_DISTANCE};
pub use config::{MAX_DAYS_PER_PHASE, SkyConfig};
pub use error::SkyError;
pub use manager::{RED_MOON, SkyManager, cloud_constants, render_queue};
pub use moon::{MoonBody, MoonPhase, MoonState, PhaseAppearance, appearance, phase_texture};
pub use summary::SkySummary;
pub use weather::{
    WeatherResult, WeatherSettings, WeatherTable, WeatherTransition, night_fade_for_hour,
};

/// Directory prefix for every texture the sky binds.
pub const TEXTURE_DIR: &str = "textures/";

pub fn crate_info() -> &'static str {
    "firmament-sky v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("sky"));
    }
}
