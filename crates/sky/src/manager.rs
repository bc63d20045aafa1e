use firmament_common::{Colour, MaterialId, NodeId};
use firmament_render::{MaterialParam, RenderBackend};
use glam::Vec3;

use crate::TEXTURE_DIR;
use crate::billboard::{Billboard, clamp_unit, unit_direction};
use crate::config::SkyConfig;
use crate::error::SkyError;
use crate::moon::{MoonBody, MoonPhase};
use crate::summary::SkySummary;
use crate::weather::{WeatherResult, WeatherTable, WeatherTransition, night_fade_for_hour};

/// Render queue groups for sky objects; higher draws later.
pub mod render_queue {
    pub const SKIES_EARLY: u8 = 5;
    pub const SKIES_LATE: u8 = 95;
    pub const ATMOSPHERE: u8 = SKIES_EARLY;
    pub const NIGHT_DOME: u8 = SKIES_EARLY + 1;
    pub const MASSER: u8 = SKIES_EARLY + 3;
    pub const SECUNDA: u8 = SKIES_EARLY + 4;
    pub const SUN: u8 = SKIES_EARLY + 4;
    pub const CLOUDS: u8 = SKIES_EARLY + 5;
    pub const SUN_GLARE: u8 = SKIES_LATE;
}

/// Cloud shader constants.
pub mod cloud_constants {
    pub const TIME: &str = "time";
    pub const TRANSITION_FACTOR: &str = "transitionFactor";
    pub const OPACITY: &str = "opacity";
    pub const SPEED: &str = "speed";
    pub const NIGHT_FADE: &str = "nightFade";
}

/// Secunda's colour while the red moon is shown.
pub const RED_MOON: Colour = Colour::rgb(1.0, 0.0784, 0.0784);

/// Sun height (|y| of the unit direction) below which sun and glare fade out.
const GLARE_HORIZON: f32 = 0.44;

/// Cloud self-illumination is this fraction of sun plus ambient colour.
const CLOUD_LIGHT_FACTOR: f32 = 0.7;

/// Owns the sky: sun, sun glare, two moons, cloud layer, day atmosphere and
/// night dome, all placed under one root node that follows the camera.
///
/// Driven once per frame with [`SkyManager::update`] and from weather with
/// [`SkyManager::set_weather`] or [`SkyManager::change_weather`]. Dropping
/// the manager releases every backend object it created, in reverse order.
pub struct SkyManager<B: RenderBackend> {
    backend: B,
    weathers: WeatherTable,
    days_per_phase: u32,
    secunda_offset: u32,

    root: NodeId,
    secunda: Billboard,
    masser: Billboard,
    sun: Billboard,
    sun_glare: Billboard,
    night_dome: NodeId,
    stars_material: MaterialId,
    atmosphere_node: NodeId,
    atmosphere_material: MaterialId,
    clouds_node: NodeId,
    cloud_material: MaterialId,

    // Last values pushed to the backend, so unchanged values are skipped.
    clouds: String,
    next_clouds: String,
    cloud_blend_factor: f32,
    cloud_opacity: f32,
    cloud_speed: f32,
    cloud_colour: Colour,
    sky_colour: Colour,
    stars_opacity: f32,
    clouds_alpha: f32,
    cloud_time: f32,
    glare_view: f32,
    night: bool,
    dome_visible: bool,

    transition: Option<WeatherTransition>,
    current_weather: Option<String>,

    view_direction: Vec3,
    glare_fade: f32,
    hour: f64,
    day: u32,
    month: u32,

    enabled: bool,
    sun_enabled: bool,
    glare_enabled: bool,
    masser_enabled: bool,
    secunda_enabled: bool,
}

impl<B: RenderBackend> SkyManager<B> {
    /// Build the sky scene on `backend`.
    pub fn new(mut backend: B, config: &SkyConfig) -> Result<Self, SkyError> {
        config.validate()?;
        let _span = tracing::debug_span!("sky_create").entered();

        let root = backend.create_node(None);

        let mut secunda = Billboard::moon(
            &mut backend,
            "Secunda",
            MoonBody::Secunda,
            config.secunda_size,
            config.secunda_direction,
            root,
        )?;
        secunda.set_render_queue(&mut backend, render_queue::SECUNDA);

        let mut masser = Billboard::moon(
            &mut backend,
            "Masser",
            MoonBody::Masser,
            config.masser_size,
            config.masser_direction,
            root,
        )?;
        masser.set_render_queue(&mut backend, render_queue::MASSER);

        let mut sun = Billboard::new(
            &mut backend,
            "Sun",
            &config.sun_texture,
            config.sun_size,
            config.sun_direction,
            root,
        )?;
        sun.set_render_queue(&mut backend, render_queue::SUN);

        let mut sun_glare = Billboard::new(
            &mut backend,
            "SunGlare",
            &config.sun_glare_texture,
            config.sun_glare_size,
            config.sun_direction,
            root,
        )?;
        sun_glare.set_render_queue(&mut backend, render_queue::SUN_GLARE);

        let night_dome = backend.create_node(Some(root));
        let stars_material = backend.create_material("Stars");
        backend.set_material_param(stars_material, MaterialParam::constant(cloud_constants::NIGHT_FADE, 0.0));
        let stars = backend.create_entity(night_dome, stars_material, &config.night_dome_mesh);
        backend.set_entity_render_queue(stars, render_queue::NIGHT_DOME);
        backend.set_node_visible(night_dome, false);

        let atmosphere_node = backend.create_node(Some(root));
        let atmosphere_material = backend.create_material("Atmosphere");
        backend.set_material_param(atmosphere_material, MaterialParam::SelfIllumination(Colour::WHITE));
        backend.set_material_param(atmosphere_material, MaterialParam::Diffuse(Colour::new(0.0, 0.0, 0.0, 0.0)));
        backend.set_material_param(atmosphere_material, MaterialParam::Ambient(Colour::BLACK));
        let atmosphere = backend.create_entity(atmosphere_node, atmosphere_material, &config.atmosphere_mesh);
        backend.set_entity_render_queue(atmosphere, render_queue::ATMOSPHERE);

        let clouds_node = backend.create_node(Some(root));
        let cloud_material = backend.create_material("Clouds");
        backend.set_material_param(cloud_material, MaterialParam::SelfIllumination(Colour::WHITE));
        backend.set_material_param(cloud_material, MaterialParam::Ambient(Colour::BLACK));
        let clouds = config.default_cloud_texture.clone();
        backend.set_material_param(cloud_material, MaterialParam::texture(0, texture_path(&clouds)));
        backend.set_material_param(cloud_material, MaterialParam::texture(1, ""));
        for (name, value) in [
            (cloud_constants::TIME, 0.0),
            (cloud_constants::TRANSITION_FACTOR, 0.0),
            (cloud_constants::OPACITY, 1.0),
            (cloud_constants::SPEED, 0.0),
        ] {
            backend.set_material_param(cloud_material, MaterialParam::constant(name, value));
        }
        let cloud_layer = backend.create_entity(clouds_node, cloud_material, &config.clouds_mesh);
        backend.set_entity_render_queue(cloud_layer, render_queue::CLOUDS);

        let mut sky = Self {
            backend,
            weathers: config.weathers.clone(),
            days_per_phase: config.days_per_phase,
            secunda_offset: config.secunda_phase_offset_days,
            root,
            secunda,
            masser,
            sun,
            sun_glare,
            night_dome,
            stars_material,
            atmosphere_node,
            atmosphere_material,
            clouds_node,
            cloud_material,
            clouds,
            next_clouds: String::new(),
            cloud_blend_factor: 0.0,
            cloud_opacity: 1.0,
            cloud_speed: 0.0,
            cloud_colour: Colour::WHITE,
            sky_colour: Colour::WHITE,
            stars_opacity: 0.0,
            clouds_alpha: 0.0,
            cloud_time: 0.0,
            glare_view: 1.0,
            night: false,
            dome_visible: false,
            transition: None,
            current_weather: None,
            view_direction: Vec3::NEG_Z,
            glare_fade: config.glare_fade,
            hour: 0.0,
            day: 0,
            month: 0,
            enabled: true,
            sun_enabled: true,
            glare_enabled: true,
            masser_enabled: true,
            secunda_enabled: true,
        };
        sky.set_clouds_opacity(config.clouds_alpha);

        tracing::debug!(weathers = sky.weathers.len(), "sky created");
        Ok(sky)
    }

    /// Advance the sky by `duration` seconds. Does nothing while disabled.
    ///
    /// Scrolls the clouds, advances an in-flight weather transition, rescales
    /// the sun glare for the current view direction and pushes visibility
    /// flags. A zero duration leaves every blended parameter unchanged.
    pub fn update(&mut self, duration: f32) {
        if !self.enabled {
            return;
        }
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        let _span = tracing::trace_span!("sky_update", duration).entered();

        if duration > 0.0 {
            self.cloud_time += duration;
            self.backend.set_material_param(
                self.cloud_material,
                MaterialParam::constant(cloud_constants::TIME, self.cloud_time),
            );

            if let Some(transition) = &mut self.transition {
                transition.advance(duration);
                let result = transition.result().with_hour(self.hour);
                let finished = transition.is_finished().then(|| transition.to().name.clone());
                self.apply_weather(&result);
                if let Some(name) = finished {
                    tracing::debug!(weather = %name, "weather transition finished");
                    self.transition = None;
                    self.current_weather = Some(name);
                }
            }
        }

        self.update_glare();

        let (sun, glare) = (self.sun_enabled, self.sun_enabled && self.glare_enabled);
        self.sun.set_visible(&mut self.backend, sun);
        self.sun_glare.set_visible(&mut self.backend, glare);
        self.masser.set_visible(&mut self.backend, self.masser_enabled);
        self.secunda.set_visible(&mut self.backend, self.secunda_enabled);
    }

    /// Glare grows as the view turns toward the sun.
    fn update_glare(&mut self) {
        if !self.sun_enabled {
            return;
        }
        let size = if self.glare_enabled {
            let angle = self
                .sun_glare
                .direction()
                .angle_between(self.view_direction)
                .to_degrees();
            let val = (1.0 - angle / 180.0).powi(4) * 2.0;
            val * self.glare_fade
        } else {
            0.0
        };
        self.sun_glare.set_size(&mut self.backend, size);
    }

    pub fn enable(&mut self) {
        self.backend.set_node_visible(self.root, true);
        self.enabled = true;
        self.sync_night_dome();
    }

    pub fn disable(&mut self) {
        self.backend.set_node_visible(self.root, false);
        self.enabled = false;
        self.sync_night_dome();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the hour of day. Accepted while disabled.
    ///
    /// Under a named weather the star dome follows the hour at once. A result
    /// given to `set_weather` keeps its own night values.
    pub fn set_hour(&mut self, hour: f64) {
        self.hour = hour;
        if self.current_weather.is_some() || self.transition.is_some() {
            let fade = night_fade_for_hour(hour);
            self.apply_night(fade > 0.0, fade);
        }
    }

    /// Record the date and move both moons to the matching phase. Accepted
    /// while disabled.
    pub fn set_date(&mut self, day: u32, month: u32) {
        self.day = day;
        self.month = month;
        let masser = MoonPhase::from_day(day, self.days_per_phase);
        let secunda = MoonPhase::from_day(day.wrapping_add(self.secunda_offset), self.days_per_phase);
        for (moon, phase) in [(&mut self.masser, masser), (&mut self.secunda, secunda)] {
            if let Err(err) = moon.set_phase(&mut self.backend, phase) {
                tracing::warn!(%err, "moon phase not applied");
            }
        }
        tracing::debug!(day, month, %masser, %secunda, "moon phases updated");
    }

    /// 0 new, 1 crescent, 2 half, 3 gibbous, 4 full.
    pub fn masser_phase(&self) -> u8 {
        self.masser.phase_int().unwrap_or(0)
    }

    /// 0 new, 1 crescent, 2 half, 3 gibbous, 4 full.
    pub fn secunda_phase(&self) -> u8 {
        self.secunda.phase_int().unwrap_or(0)
    }

    /// Tint Secunda red, or back to white.
    pub fn set_moon_colour(&mut self, red: bool) {
        let colour = if red { RED_MOON } else { Colour::WHITE };
        self.secunda.set_colour(&mut self.backend, colour);
    }

    /// Cloud layer alpha, independent of the weather opacity.
    pub fn set_clouds_opacity(&mut self, opacity: f32) {
        let opacity = clamp_unit(opacity);
        self.backend.set_material_param(
            self.cloud_material,
            MaterialParam::Diffuse(Colour::new(1.0, 1.0, 1.0, opacity)),
        );
        self.clouds_alpha = opacity;
    }

    /// Apply an externally computed weather result. Cancels any in-flight
    /// transition. Applying the same result twice leaves the same state.
    pub fn set_weather(&mut self, weather: &WeatherResult) {
        if self.transition.take().is_some() {
            tracing::debug!("weather transition cancelled by set_weather");
        }
        self.current_weather = None;
        self.apply_weather(weather);
    }

    /// Switch to the named weather over `seconds`. Applies at once when no
    /// named weather is current or `seconds` is not positive. Interrupting a
    /// transition completes it to its target first.
    pub fn change_weather(&mut self, name: &str, seconds: f32) -> Result<(), SkyError> {
        let target = self
            .weathers
            .get(name)
            .cloned()
            .ok_or_else(|| SkyError::UnknownWeather(name.to_string()))?;

        if let Some(interrupted) = self.transition.take() {
            self.current_weather = Some(interrupted.to().name.clone());
        }

        let from = self
            .current_weather
            .as_deref()
            .and_then(|n| self.weathers.get(n))
            .cloned();

        match from {
            Some(from) if seconds > 0.0 && seconds.is_finite() => {
                tracing::debug!(from = %from.name, to = %target.name, seconds, "weather transition started");
                let transition = WeatherTransition::new(from, target, seconds);
                let result = transition.result().with_hour(self.hour);
                self.transition = Some(transition);
                self.apply_weather(&result);
            }
            _ => {
                tracing::debug!(to = %target.name, "weather applied");
                let result = WeatherResult::from_settings(&target).with_hour(self.hour);
                self.apply_weather(&result);
                self.current_weather = Some(target.name);
            }
        }
        Ok(())
    }

    fn apply_weather(&mut self, weather: &WeatherResult) {
        let _span = tracing::trace_span!("apply_weather").entered();
        let material = self.cloud_material;

        if self.clouds != weather.cloud_texture {
            self.backend.set_material_param(
                material,
                MaterialParam::texture(0, texture_path(&weather.cloud_texture)),
            );
            self.clouds = weather.cloud_texture.clone();
        }

        if self.next_clouds != weather.next_cloud_texture {
            self.backend.set_material_param(
                material,
                MaterialParam::texture(1, texture_path(&weather.next_cloud_texture)),
            );
            self.next_clouds = weather.next_cloud_texture.clone();
        }

        if self.cloud_blend_factor != weather.cloud_blend_factor {
            self.backend.set_material_param(
                material,
                MaterialParam::constant(cloud_constants::TRANSITION_FACTOR, weather.cloud_blend_factor),
            );
            self.cloud_blend_factor = weather.cloud_blend_factor;
        }

        if self.cloud_opacity != weather.cloud_opacity {
            self.backend.set_material_param(
                material,
                MaterialParam::constant(cloud_constants::OPACITY, weather.cloud_opacity),
            );
            self.cloud_opacity = weather.cloud_opacity;
        }

        let cloud_colour = weather
            .sun_colour
            .add_rgb(weather.ambient_colour)
            .scaled(CLOUD_LIGHT_FACTOR)
            .with_alpha(1.0);
        if self.cloud_colour != cloud_colour {
            self.backend
                .set_material_param(material, MaterialParam::SelfIllumination(cloud_colour));
            self.cloud_colour = cloud_colour;
        }

        if self.sky_colour != weather.sky_colour {
            self.backend.set_material_param(
                self.atmosphere_material,
                MaterialParam::SelfIllumination(weather.sky_colour),
            );
            self.sky_colour = weather.sky_colour;
        }

        if self.cloud_speed != weather.cloud_speed {
            self.backend.set_material_param(
                material,
                MaterialParam::constant(cloud_constants::SPEED, weather.cloud_speed),
            );
            self.cloud_speed = weather.cloud_speed;
        }

        self.glare_view = clamp_unit(weather.glare_view);
        self.apply_sun_strength();
        self.apply_night(weather.night, weather.night_fade);
    }

    /// Sun and glare fade out as the sun nears the horizon.
    fn apply_sun_strength(&mut self) {
        let sun = self.sun_glare.direction();
        let height = sun.y.abs() / sun.length();
        let strength = if height <= GLARE_HORIZON {
            height / GLARE_HORIZON
        } else {
            1.0
        };
        let glare = clamp_unit(self.glare_view * self.glare_fade * strength);
        self.sun_glare.set_visibility(&mut self.backend, glare);
        self.sun
            .set_visibility(&mut self.backend, self.glare_view * strength);
    }

    fn apply_night(&mut self, night: bool, fade: f32) {
        if night && self.stars_opacity != fade {
            self.backend.set_material_param(
                self.stars_material,
                MaterialParam::constant(cloud_constants::NIGHT_FADE, fade),
            );
            self.stars_opacity = fade;
        }
        self.night = night;
        self.sync_night_dome();
    }

    /// The star dome shows only at night on an enabled sky.
    fn sync_night_dome(&mut self) {
        let visible = self.night && self.enabled;
        if self.dome_visible != visible {
            self.backend.set_node_visible(self.night_dome, visible);
            self.dome_visible = visible;
        }
    }

    pub fn sun_enable(&mut self) {
        self.sun_enabled = true;
    }

    pub fn sun_disable(&mut self) {
        self.sun_enabled = false;
    }

    pub fn set_glare(&mut self, glare: bool) {
        self.glare_enabled = glare;
    }

    pub fn set_glare_fade(&mut self, fade: f32) {
        self.glare_fade = if fade.is_finite() { fade.max(0.0) } else { 0.0 };
    }

    /// Move the sun and its glare, and rescale their visibility for the new
    /// height.
    pub fn set_sun_direction(&mut self, direction: Vec3) -> Result<(), SkyError> {
        self.sun.set_position(&mut self.backend, direction)?;
        self.sun_glare.set_position(&mut self.backend, direction)?;
        self.apply_sun_strength();
        Ok(())
    }

    pub fn set_masser_direction(&mut self, direction: Vec3) -> Result<(), SkyError> {
        self.masser.set_position(&mut self.backend, direction)
    }

    pub fn set_secunda_direction(&mut self, direction: Vec3) -> Result<(), SkyError> {
        self.secunda.set_position(&mut self.backend, direction)
    }

    pub fn set_masser_fade(&mut self, fade: f32) {
        self.masser.set_visibility(&mut self.backend, fade);
    }

    pub fn set_secunda_fade(&mut self, fade: f32) {
        self.secunda.set_visibility(&mut self.backend, fade);
    }

    pub fn masser_enable(&mut self) {
        self.masser_enabled = true;
    }

    pub fn masser_disable(&mut self) {
        self.masser_enabled = false;
    }

    pub fn secunda_enable(&mut self) {
        self.secunda_enabled = true;
    }

    pub fn secunda_disable(&mut self) {
        self.secunda_enabled = false;
    }

    /// Follow the camera: the sky root sits at `eye`, and `direction` (when
    /// non-zero) drives the glare size.
    pub fn set_view(&mut self, eye: Vec3, direction: Vec3) {
        self.backend.set_node_position(self.root, eye);
        if let Ok(dir) = unit_direction(direction) {
            self.view_direction = dir;
        }
    }

    /// World-space position of the sun billboard.
    pub fn real_sun_pos(&self) -> Vec3 {
        self.backend
            .derived_position(self.sun.node())
            .unwrap_or_else(|| self.sun.position())
    }

    pub fn cloud_opacity(&self) -> f32 {
        self.cloud_opacity
    }

    /// Cloud self-illumination last written.
    pub fn cloud_colour(&self) -> Colour {
        self.cloud_colour
    }

    pub fn cloud_speed(&self) -> f32 {
        self.cloud_speed
    }

    pub fn cloud_blend_factor(&self) -> f32 {
        self.cloud_blend_factor
    }

    pub fn clouds_alpha(&self) -> f32 {
        self.clouds_alpha
    }

    /// Seconds of cloud scrolling accumulated by `update`.
    pub fn cloud_time(&self) -> f32 {
        self.cloud_time
    }

    pub fn sky_colour(&self) -> Colour {
        self.sky_colour
    }

    pub fn stars_opacity(&self) -> f32 {
        self.stars_opacity
    }

    /// Cloud textures bound to units 0 and 1, relative to the texture directory.
    pub fn cloud_textures(&self) -> (&str, &str) {
        (&self.clouds, &self.next_clouds)
    }

    pub fn remaining_transition_time(&self) -> f32 {
        self.transition.as_ref().map_or(0.0, WeatherTransition::remaining)
    }

    pub fn current_weather(&self) -> Option<&str> {
        self.current_weather.as_deref()
    }

    /// Name of the weather being transitioned to, if any.
    pub fn next_weather(&self) -> Option<&str> {
        self.transition.as_ref().map(|t| t.to().name.as_str())
    }

    pub fn weathers(&self) -> &WeatherTable {
        &self.weathers
    }

    pub fn hour(&self) -> f64 {
        self.hour
    }

    /// (day, month) last passed to `set_date`.
    pub fn date(&self) -> (u32, u32) {
        (self.day, self.month)
    }

    pub fn is_sun_enabled(&self) -> bool {
        self.sun_enabled
    }

    pub fn is_glare_enabled(&self) -> bool {
        self.glare_enabled
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn night_dome(&self) -> NodeId {
        self.night_dome
    }

    pub fn atmosphere_node(&self) -> NodeId {
        self.atmosphere_node
    }

    pub fn clouds_node(&self) -> NodeId {
        self.clouds_node
    }

    /// Whether the last applied weather or hour was night.
    pub fn is_night(&self) -> bool {
        self.night
    }

    pub fn cloud_material(&self) -> MaterialId {
        self.cloud_material
    }

    pub fn atmosphere_material(&self) -> MaterialId {
        self.atmosphere_material
    }

    pub fn stars_material(&self) -> MaterialId {
        self.stars_material
    }

    pub fn sun(&self) -> &Billboard {
        &self.sun
    }

    pub fn sun_glare(&self) -> &Billboard {
        &self.sun_glare
    }

    pub fn masser(&self) -> &Billboard {
        &self.masser
    }

    pub fn secunda(&self) -> &Billboard {
        &self.secunda
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn summary(&self) -> SkySummary {
        SkySummary {
            enabled: self.enabled,
            sun_enabled: self.sun_enabled,
            glare_enabled: self.glare_enabled,
            hour: self.hour,
            day: self.day,
            month: self.month,
            masser_phase: self.masser.phase(),
            secunda_phase: self.secunda.phase(),
            weather: self.current_weather.clone(),
            next_weather: self.next_weather().map(str::to_string),
            remaining_transition: self.remaining_transition_time(),
            cloud_opacity: self.cloud_opacity,
            cloud_speed: self.cloud_speed,
            cloud_blend_factor: self.cloud_blend_factor,
            sun_visibility: self.sun.visibility(),
        }
    }
}

impl<B: RenderBackend> Drop for SkyManager<B> {
    fn drop(&mut self) {
        let backend = &mut self.backend;
        backend.destroy_node(self.clouds_node);
        backend.destroy_material(self.cloud_material);
        backend.destroy_node(self.atmosphere_node);
        backend.destroy_material(self.atmosphere_material);
        backend.destroy_node(self.night_dome);
        backend.destroy_material(self.stars_material);
        self.sun_glare.destroy(backend);
        self.sun.destroy(backend);
        self.masser.destroy(backend);
        self.secunda.destroy(backend);
        backend.destroy_node(self.root);
        tracing::debug!("sky destroyed");
    }
}

fn texture_path(name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("{TEXTURE_DIR}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firmament_render::{BackendCommand, ParamSlot, RecordingBackend};

    fn sky() -> SkyManager<RecordingBackend> {
        SkyManager::new(RecordingBackend::new(), &SkyConfig::default()).unwrap()
    }

    fn rain_result() -> WeatherResult {
        WeatherResult::from_settings(WeatherTable::default().get("rain").unwrap())
    }

    fn blended_params(sky: &SkyManager<RecordingBackend>) -> (f32, Colour, f32, f32, f32) {
        (
            sky.cloud_opacity(),
            sky.cloud_colour(),
            sky.cloud_speed(),
            sky.cloud_blend_factor(),
            sky.cloud_time(),
        )
    }

    #[test]
    fn new_builds_scene() {
        let sky = sky();
        let backend = sky.backend();
        // root, two moons, sun, glare, night dome, atmosphere, clouds
        assert_eq!(backend.node_count(), 8);
        // four billboards plus stars, atmosphere and clouds
        assert_eq!(backend.material_count(), 7);
        assert_eq!(backend.billboard_set_count(), 4);
        assert_eq!(backend.entity_count(), 3);
        assert!(sky.is_enabled());
        assert_eq!(sky.masser_phase(), 4);
        assert_eq!(sky.secunda_phase(), 4);
        assert_eq!(sky.clouds_alpha(), 0.75);
        assert_eq!(
            backend.texture(sky.cloud_material(), 0),
            Some("textures/tx_sky_cloudy.dds")
        );
        assert_eq!(
            backend.billboard_set(sky.sun_glare().billboard_set()).unwrap().render_queue,
            render_queue::SUN_GLARE
        );
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = SkyConfig {
            sun_direction: Vec3::ZERO,
            ..SkyConfig::default()
        };
        assert!(SkyManager::new(RecordingBackend::new(), &config).is_err());
    }

    #[test]
    fn update_zero_leaves_blended_parameters_unchanged() {
        let mut sky = sky();
        sky.change_weather("clear", 0.0).unwrap();
        sky.change_weather("rain", 10.0).unwrap();
        sky.update(3.0);
        let before = blended_params(&sky);
        let remaining = sky.remaining_transition_time();
        sky.update(0.0);
        sky.update(0.0);
        assert_eq!(blended_params(&sky), before);
        assert_eq!(sky.remaining_transition_time(), remaining);
    }

    #[test]
    fn update_zero_leaves_material_state_unchanged() {
        let mut sky = sky();
        sky.set_weather(&rain_result());
        sky.update(0.5);
        let material = sky.cloud_material();
        let before = sky.backend().material(material).unwrap().params.clone();
        sky.update(0.0);
        assert_eq!(sky.backend().material(material).unwrap().params, before);
    }

    #[test]
    fn set_weather_is_deterministic() {
        let mut a = sky();
        let mut b = sky();
        let weather = rain_result();
        a.set_weather(&weather);
        b.set_weather(&weather);
        b.set_weather(&weather);
        let m = a.cloud_material();
        assert_eq!(
            a.backend().material(m).unwrap().params,
            b.backend().material(m).unwrap().params
        );
        assert_eq!(blended_params(&a), blended_params(&b));
    }

    #[test]
    fn set_weather_skips_unchanged_values() {
        let mut sky = sky();
        let weather = rain_result();
        sky.set_weather(&weather);
        sky.backend_mut().drain_commands();
        sky.set_weather(&weather);
        let cloud = sky.cloud_material();
        let cloud_writes = sky
            .backend()
            .commands()
            .iter()
            .filter(|c| matches!(c, BackendCommand::SetMaterialParam { material, .. } if *material == cloud))
            .count();
        assert_eq!(cloud_writes, 0);
    }

    #[test]
    fn set_weather_writes_cloud_and_sky_parameters() {
        let mut sky = sky();
        let weather = rain_result();
        sky.set_weather(&weather);
        let backend = sky.backend();
        let m = sky.cloud_material();
        assert_eq!(backend.constant(m, cloud_constants::OPACITY), Some(weather.cloud_opacity));
        assert_eq!(backend.constant(m, cloud_constants::SPEED), Some(weather.cloud_speed));
        assert_eq!(backend.texture(m, 0), Some("textures/tx_sky_rainy.dds"));
        let expected = weather
            .sun_colour
            .add_rgb(weather.ambient_colour)
            .scaled(0.7)
            .with_alpha(1.0);
        assert_eq!(sky.cloud_colour(), expected);
        assert_eq!(
            backend.material_param(sky.atmosphere_material(), &ParamSlot::SelfIllumination),
            Some(&MaterialParam::SelfIllumination(weather.sky_colour))
        );
    }

    #[test]
    fn glare_view_scales_with_sun_height() {
        let mut sky = sky();
        sky.set_sun_direction(Vec3::Y).unwrap();
        let mut weather = rain_result();
        weather.glare_view = 1.0;
        sky.set_weather(&weather);
        assert_eq!(sky.sun().visibility(), 1.0);
        assert_eq!(sky.sun_glare().visibility(), 1.0);

        sky.set_sun_direction(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        sky.set_weather(&weather);
        assert_eq!(sky.sun().visibility(), 0.0);
    }

    #[test]
    fn change_weather_unknown_name() {
        let mut sky = sky();
        assert!(matches!(
            sky.change_weather("drizzle", 1.0),
            Err(SkyError::UnknownWeather(_))
        ));
    }

    #[test]
    fn first_change_weather_applies_immediately() {
        let mut sky = sky();
        sky.change_weather("rain", 30.0).unwrap();
        assert_eq!(sky.current_weather(), Some("rain"));
        assert_eq!(sky.remaining_transition_time(), 0.0);
        assert_eq!(sky.cloud_speed(), rain_result().cloud_speed);
    }

    #[test]
    fn transition_blends_to_target() {
        let table = WeatherTable::default();
        let clear = table.get("clear").unwrap().clone();
        let rain = table.get("rain").unwrap().clone();

        let mut sky = sky();
        sky.change_weather("clear", 0.0).unwrap();
        sky.change_weather("rain", 10.0).unwrap();
        assert_eq!(sky.remaining_transition_time(), 10.0);
        assert_eq!(sky.next_weather(), Some("rain"));
        assert_eq!(sky.cloud_speed(), clear.cloud_speed);

        sky.update(5.0);
        let mid = (clear.cloud_speed + rain.cloud_speed) / 2.0;
        assert!((sky.cloud_speed() - mid).abs() < 1e-5);
        assert!((sky.cloud_blend_factor() - 0.5).abs() < 1e-6);
        assert_eq!(sky.cloud_textures(), ("tx_sky_clear.dds", "tx_sky_rainy.dds"));

        sky.update(5.0);
        assert_eq!(sky.current_weather(), Some("rain"));
        assert_eq!(sky.remaining_transition_time(), 0.0);
        assert_eq!(sky.cloud_speed(), rain.cloud_speed);
        assert_eq!(sky.cloud_opacity(), rain.clouds_maximum_percent);
    }

    #[test]
    fn interrupted_transition_completes_first() {
        let mut sky = sky();
        sky.change_weather("clear", 0.0).unwrap();
        sky.change_weather("rain", 10.0).unwrap();
        sky.update(2.0);
        sky.change_weather("blight", 10.0).unwrap();
        let summary = sky.summary();
        assert_eq!(summary.weather.as_deref(), Some("rain"));
        assert_eq!(summary.next_weather.as_deref(), Some("blight"));
    }

    #[test]
    fn set_weather_cancels_transition() {
        let mut sky = sky();
        sky.change_weather("clear", 0.0).unwrap();
        sky.change_weather("rain", 10.0).unwrap();
        sky.set_weather(&rain_result());
        assert_eq!(sky.remaining_transition_time(), 0.0);
        assert!(sky.current_weather().is_none());
    }

    #[test]
    fn disabled_sky_ignores_update() {
        let mut sky = sky();
        sky.disable();
        assert!(!sky.backend().is_effectively_visible(sky.sun().node()));
        sky.update(1.0);
        assert_eq!(sky.cloud_time(), 0.0);
        sky.enable();
        sky.update(1.0);
        assert_eq!(sky.cloud_time(), 1.0);
        assert!(sky.backend().is_effectively_visible(sky.sun().node()));
    }

    #[test]
    fn set_date_updates_phases_even_when_disabled() {
        let mut sky = sky();
        sky.disable();
        sky.set_date(4, 2);
        assert_eq!(sky.date(), (4, 2));
        assert_eq!(sky.masser().phase(), Some(MoonPhase::WaxingCrescent));
        assert_eq!(sky.masser_phase(), 1);
        sky.set_date(0, 2);
        assert_eq!(sky.secunda_phase(), 0);
        assert_eq!(
            sky.backend().texture(sky.secunda().material(), 0),
            Some("textures/tx_secunda_new.dds")
        );
    }

    #[test]
    fn secunda_offset_shifts_phase() {
        let config = SkyConfig {
            secunda_phase_offset_days: 16,
            ..SkyConfig::default()
        };
        let mut sky = SkyManager::new(RecordingBackend::new(), &config).unwrap();
        sky.set_date(0, 1);
        assert_eq!(sky.masser().phase(), Some(MoonPhase::New));
        assert_eq!(sky.secunda().phase(), Some(MoonPhase::Full));
    }

    #[test]
    fn moon_colour_toggles_red() {
        let mut sky = sky();
        sky.set_moon_colour(true);
        assert_eq!(sky.secunda().colour(), RED_MOON);
        sky.set_moon_colour(false);
        assert_eq!(sky.secunda().colour(), Colour::WHITE);
    }

    #[test]
    fn clouds_opacity_is_diffuse_alpha() {
        let mut sky = sky();
        sky.set_clouds_opacity(0.3);
        assert_eq!(sky.clouds_alpha(), 0.3);
        assert_eq!(
            sky.backend().material_param(sky.cloud_material(), &ParamSlot::Diffuse),
            Some(&MaterialParam::Diffuse(Colour::new(1.0, 1.0, 1.0, 0.3)))
        );
    }

    #[test]
    fn glare_grows_when_looking_at_sun() {
        let mut sky = sky();
        sky.set_sun_direction(Vec3::Y).unwrap();
        sky.set_view(Vec3::ZERO, Vec3::Y);
        sky.update(0.1);
        assert!((sky.sun_glare().size() - 2.0).abs() < 1e-4);

        sky.set_view(Vec3::ZERO, Vec3::NEG_Y);
        sky.update(0.1);
        assert!(sky.sun_glare().size() < 1e-4);

        sky.set_view(Vec3::ZERO, Vec3::Y);
        sky.set_glare(false);
        sky.update(0.1);
        assert_eq!(sky.sun_glare().size(), 0.0);
        assert!(!sky.sun_glare().is_visible());
    }

    #[test]
    fn sun_disable_hides_sun_and_glare() {
        let mut sky = sky();
        sky.sun_disable();
        sky.update(0.1);
        assert!(!sky.sun().is_visible());
        assert!(!sky.sun_glare().is_visible());
        sky.sun_enable();
        sky.update(0.1);
        assert!(sky.sun().is_visible());
    }

    #[test]
    fn moons_can_be_hidden() {
        let mut sky = sky();
        sky.masser_disable();
        sky.update(0.0);
        assert!(!sky.masser().is_visible());
        assert!(sky.secunda().is_visible());
        sky.secunda_disable();
        sky.masser_enable();
        sky.update(0.0);
        assert!(sky.masser().is_visible());
        assert!(!sky.secunda().is_visible());
    }

    #[test]
    fn moon_fades_pass_through() {
        let mut sky = sky();
        sky.set_masser_fade(0.4);
        sky.set_secunda_fade(0.6);
        assert_eq!(sky.masser().visibility(), 0.4);
        assert_eq!(sky.secunda().visibility(), 0.6);
    }

    #[test]
    fn real_sun_pos_follows_camera() {
        let mut sky = sky();
        sky.set_sun_direction(Vec3::Y).unwrap();
        sky.set_view(Vec3::new(10.0, 0.0, 0.0), Vec3::Y);
        let pos = sky.real_sun_pos();
        assert!(pos.distance(Vec3::new(10.0, 1000.0, 0.0)) < 1e-3);
    }

    #[test]
    fn night_dome_visible_at_night() {
        let mut sky = sky();
        sky.set_hour(23.0);
        sky.change_weather("clear", 0.0).unwrap();
        assert!(sky.backend().node(sky.night_dome()).unwrap().visible);
        assert_eq!(sky.stars_opacity(), 1.0);

        sky.set_hour(12.0);
        sky.change_weather("cloudy", 0.0).unwrap();
        assert!(!sky.backend().node(sky.night_dome()).unwrap().visible);
    }

    #[test]
    fn zero_direction_is_rejected() {
        let mut sky = sky();
        assert!(matches!(
            sky.set_sun_direction(Vec3::ZERO),
            Err(SkyError::ZeroDirection)
        ));
        assert!(sky.set_masser_direction(Vec3::ZERO).is_err());
        assert!(sky.set_secunda_direction(Vec3::X).is_ok());
    }

    #[test]
    fn drop_releases_everything() {
        let mut backend = RecordingBackend::new();
        {
            let sky = SkyManager::new(&mut backend, &SkyConfig::default()).unwrap();
            assert_eq!(sky.backend().node_count(), 8);
        }
        assert_eq!(backend.node_count(), 0);
        assert_eq!(backend.entity_count(), 0);
        assert_eq!(backend.material_count(), 0);
        assert_eq!(backend.billboard_set_count(), 0);
        assert!(matches!(
            backend.commands().last(),
            Some(BackendCommand::DestroyNode { .. })
        ));
    }

    #[test]
    fn night_dome_returns_after_enable() {
        let mut sky = sky();
        sky.set_hour(23.0);
        sky.disable();
        sky.change_weather("clear", 0.0).unwrap();
        assert!(!sky.backend().node(sky.night_dome()).unwrap().visible);

        sky.enable();
        sky.update(1.0);
        assert!(sky.backend().node(sky.night_dome()).unwrap().visible);
        assert!(sky.backend().is_effectively_visible(sky.night_dome()));

        sky.disable();
        assert!(!sky.backend().node(sky.night_dome()).unwrap().visible);
    }

    #[test]
    fn stars_follow_the_hour_under_steady_weather() {
        let mut sky = sky();
        sky.set_hour(12.0);
        sky.change_weather("clear", 0.0).unwrap();
        assert!(!sky.is_night());

        sky.set_hour(20.0);
        sky.update(1.0);
        assert!(sky.backend().node(sky.night_dome()).unwrap().visible);
        assert_eq!(sky.stars_opacity(), 0.5);
        assert_eq!(
            sky.backend().constant(sky.stars_material(), cloud_constants::NIGHT_FADE),
            Some(0.5)
        );

        sky.set_hour(23.0);
        assert_eq!(sky.stars_opacity(), 1.0);

        sky.set_hour(7.0);
        assert!(!sky.is_night());
        assert!(!sky.backend().node(sky.night_dome()).unwrap().visible);
    }

    #[test]
    fn external_weather_keeps_its_night_values() {
        let mut sky = sky();
        sky.set_weather(&rain_result());
        sky.set_hour(23.0);
        assert!(!sky.is_night());
        assert!(!sky.backend().node(sky.night_dome()).unwrap().visible);
    }

    #[test]
    fn setting_sun_dims_under_steady_weather() {
        let mut sky = sky();
        sky.set_sun_direction(Vec3::Y).unwrap();
        sky.change_weather("clear", 0.0).unwrap();
        assert_eq!(sky.sun().visibility(), 1.0);

        let low = Vec3::new(0.9, 0.3, 0.0);
        sky.set_sun_direction(low).unwrap();
        let expected = (low.y / low.length()) / 0.44;
        assert!((sky.sun().visibility() - expected).abs() < 1e-5);
        assert!((sky.sun_glare().visibility() - expected).abs() < 1e-5);

        sky.set_sun_direction(Vec3::X).unwrap();
        sky.update(0.1);
        assert_eq!(sky.sun().visibility(), 0.0);
        assert_eq!(sky.sun_glare().visibility(), 0.0);
    }

    #[test]
    fn clouds_and_atmosphere_hang_off_the_root() {
        let mut sky = sky();
        let clouds = sky.backend().entities_on(sky.clouds_node());
        assert_eq!(clouds.len(), 1);
        let layer = sky.backend().entity(clouds[0]).unwrap();
        assert_eq!(layer.material, sky.cloud_material());
        assert_eq!(layer.render_queue, render_queue::CLOUDS);
        let atmosphere = sky.backend().entities_on(sky.atmosphere_node());
        assert_eq!(
            sky.backend().entity(atmosphere[0]).unwrap().material,
            sky.atmosphere_material()
        );
        let stars = sky.backend().entities_on(sky.night_dome());
        assert_eq!(sky.backend().entity(stars[0]).unwrap().material, sky.stars_material());

        assert!(sky.backend().is_effectively_visible(sky.clouds_node()));
        sky.disable();
        for node in [sky.clouds_node(), sky.atmosphere_node(), sky.night_dome()] {
            assert!(!sky.backend().is_effectively_visible(node));
        }
    }

    #[test]
    fn long_phases_do_not_overflow() {
        let config = SkyConfig {
            days_per_phase: crate::MAX_DAYS_PER_PHASE,
            ..SkyConfig::default()
        };
        let mut sky = SkyManager::new(RecordingBackend::new(), &config).unwrap();
        sky.set_date(u32::MAX, 1);
        sky.set_date(5, 1);
        assert_eq!(sky.masser().phase(), Some(MoonPhase::New));

        let huge = SkyConfig {
            days_per_phase: 600_000_000,
            ..SkyConfig::default()
        };
        assert!(matches!(
            SkyManager::new(RecordingBackend::new(), &huge),
            Err(SkyError::InvalidConfig(_))
        ));
    }
}
