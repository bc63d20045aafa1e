//! Weather: named sky states, blended results and timed transitions.
//!
//! A [`WeatherResult`] is the per-frame blend target the sky applies. It is
//! produced from one [`WeatherSettings`] (steady state) or by linearly
//! blending two of them while a [`WeatherTransition`] counts down.

use firmament_common::Colour;
use serde::{Deserialize, Serialize};

/// One named sky state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub name: String,
    /// Cloud texture file name, relative to the texture directory.
    pub cloud_texture: String,
    /// Cloud layer opacity at full strength of this state.
    pub clouds_maximum_percent: f32,
    pub cloud_speed: f32,
    /// How strongly the sun and its glare show through, `[0, 1]`.
    pub glare_view: f32,
    pub sky_colour: Colour,
    pub fog_colour: Colour,
    pub ambient_colour: Colour,
    pub sun_colour: Colour,
    pub sun_disc_colour: Colour,
    pub fog_depth: f32,
    pub wind_speed: f32,
    /// Fraction of a game day a transition into this state takes.
    pub transition_delta: f32,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            name: "clear".into(),
            cloud_texture: "tx_sky_clear.dds".into(),
            clouds_maximum_percent: 1.0,
            cloud_speed: 1.25,
            glare_view: 1.0,
            sky_colour: rgb8(95, 135, 203),
            fog_colour: rgb8(206, 227, 255),
            ambient_colour: rgb8(137, 140, 160),
            sun_colour: rgb8(255, 242, 231),
            sun_disc_colour: rgb8(255, 253, 253),
            fog_depth: 0.69,
            wind_speed: 0.1,
            transition_delta: 0.015,
        }
    }
}

fn rgb8(r: u8, g: u8, b: u8) -> Colour {
    Colour::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}

/// Blend target applied to the sky.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherResult {
    pub cloud_texture: String,
    pub next_cloud_texture: String,
    /// Blend between the two cloud textures, `[0, 1]`.
    pub cloud_blend_factor: f32,
    pub fog_colour: Colour,
    pub ambient_colour: Colour,
    pub sky_colour: Colour,
    pub sun_colour: Colour,
    pub sun_disc_colour: Colour,
    pub fog_depth: f32,
    pub wind_speed: f32,
    pub cloud_speed: f32,
    pub cloud_opacity: f32,
    pub glare_view: f32,
    /// Draw the night (star) dome.
    pub night: bool,
    /// Star dome fade, `[0, 1]`.
    pub night_fade: f32,
}

impl Default for WeatherResult {
    fn default() -> Self {
        Self::from_settings(&WeatherSettings::default())
    }
}

impl WeatherResult {
    /// Steady state of a single named weather.
    pub fn from_settings(s: &WeatherSettings) -> Self {
        Self {
            cloud_texture: s.cloud_texture.clone(),
            next_cloud_texture: String::new(),
            cloud_blend_factor: 0.0,
            fog_colour: s.fog_colour,
            ambient_colour: s.ambient_colour,
            sky_colour: s.sky_colour,
            sun_colour: s.sun_colour,
            sun_disc_colour: s.sun_disc_colour,
            fog_depth: s.fog_depth,
            wind_speed: s.wind_speed,
            cloud_speed: s.cloud_speed,
            cloud_opacity: s.clouds_maximum_percent,
            glare_view: s.glare_view,
            night: false,
            night_fade: 0.0,
        }
    }

    /// Linear blend between two named states. `factor` is clamped to
    /// `[0, 1]`; 0 gives `from`, 1 gives `to` (with `from`'s texture still
    /// bound and fully blended out).
    pub fn blend(from: &WeatherSettings, to: &WeatherSettings, factor: f32) -> Self {
        let t = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        let mix = |a: f32, b: f32| a * (1.0 - t) + b * t;
        Self {
            cloud_texture: from.cloud_texture.clone(),
            next_cloud_texture: to.cloud_texture.clone(),
            cloud_blend_factor: t,
            fog_colour: Colour::lerp(from.fog_colour, to.fog_colour, t),
            ambient_colour: Colour::lerp(from.ambient_colour, to.ambient_colour, t),
            sky_colour: Colour::lerp(from.sky_colour, to.sky_colour, t),
            sun_colour: Colour::lerp(from.sun_colour, to.sun_colour, t),
            sun_disc_colour: Colour::lerp(from.sun_disc_colour, to.sun_disc_colour, t),
            fog_depth: mix(from.fog_depth, to.fog_depth),
            wind_speed: mix(from.wind_speed, to.wind_speed),
            cloud_speed: mix(from.cloud_speed, to.cloud_speed),
            cloud_opacity: mix(from.clouds_maximum_percent, to.clouds_maximum_percent),
            glare_view: mix(from.glare_view, to.glare_view),
            night: false,
            night_fade: 0.0,
        }
    }

    /// Fill the night flag and fade from the hour of day.
    pub fn with_hour(mut self, hour: f64) -> Self {
        self.night_fade = night_fade_for_hour(hour);
        self.night = self.night_fade > 0.0;
        self
    }
}

/// Star dome fade for an hour of day: fades in 19h-21h, full until 4h,
/// fades out 4h-6h.
pub fn night_fade_for_hour(hour: f64) -> f32 {
    let h = hour.rem_euclid(24.0);
    let fade = if h >= 21.0 || h < 4.0 {
        1.0
    } else if h >= 19.0 {
        (h - 19.0) / 2.0
    } else if h < 6.0 {
        (6.0 - h) / 2.0
    } else {
        0.0
    };
    fade as f32
}

/// A timed blend from one named state to another.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherTransition {
    from: WeatherSettings,
    to: WeatherSettings,
    duration: f32,
    remaining: f32,
}

impl WeatherTransition {
    /// Start a transition lasting `duration` seconds. A non-positive or
    /// non-finite duration produces an already finished transition.
    pub fn new(from: WeatherSettings, to: WeatherSettings, duration: f32) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            from,
            to,
            duration,
            remaining: duration,
        }
    }

    /// Count down by `dt` seconds. Negative `dt` is ignored.
    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.remaining = (self.remaining - dt).max(0.0);
        }
    }

    /// Progress in `[0, 1]`.
    pub fn factor(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            1.0 - self.remaining / self.duration
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn from(&self) -> &WeatherSettings {
        &self.from
    }

    pub fn to(&self) -> &WeatherSettings {
        &self.to
    }

    /// Current blended result. A finished transition yields the target's
    /// steady state.
    pub fn result(&self) -> WeatherResult {
        if self.is_finished() {
            WeatherResult::from_settings(&self.to)
        } else {
            WeatherResult::blend(&self.from, &self.to, self.factor())
        }
    }
}

/// Named weather states, looked up by name. Keeps insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherTable {
    states: Vec<WeatherSettings>,
}

impl WeatherTable {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&WeatherSettings> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Insert or replace the state with the same name.
    pub fn insert(&mut self, settings: WeatherSettings) {
        match self.states.iter_mut().find(|s| s.name == settings.name) {
            Some(existing) => *existing = settings,
            None => self.states.push(settings),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeatherSettings> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for WeatherTable {
    fn default() -> Self {
        let base = WeatherSettings::default();
        let state = |name: &str,
                     texture: &str,
                     clouds: f32,
                     speed: f32,
                     glare: f32,
                     sky: Colour,
                     fog: Colour,
                     sun: Colour,
                     wind: f32| WeatherSettings {
            name: name.into(),
            cloud_texture: texture.into(),
            clouds_maximum_percent: clouds,
            cloud_speed: speed,
            glare_view: glare,
            sky_colour: sky,
            fog_colour: fog,
            sun_colour: sun,
            wind_speed: wind,
            ..base.clone()
        };

        let mut table = Self::new();
        table.insert(state(
            "clear",
            "tx_sky_clear.dds",
            0.75,
            1.25,
            1.0,
            rgb8(95, 135, 203),
            rgb8(206, 227, 255),
            rgb8(255, 242, 231),
            0.1,
        ));
        table.insert(state(
            "cloudy",
            "tx_sky_cloudy.dds",
            1.0,
            2.0,
            1.0,
            rgb8(117, 160, 215),
            rgb8(245, 235, 224),
            rgb8(242, 159, 99),
            0.2,
        ));
        table.insert(state(
            "foggy",
            "tx_sky_foggy.dds",
            1.0,
            1.25,
            0.25,
            rgb8(106, 91, 91),
            rgb8(197, 190, 180),
            rgb8(223, 223, 223),
            0.0,
        ));
        table.insert(state(
            "overcast",
            "tx_sky_overcast.dds",
            1.0,
            1.5,
            0.0,
            rgb8(143, 146, 149),
            rgb8(143, 146, 149),
            rgb8(108, 115, 127),
            0.2,
        ));
        table.insert(state(
            "rain",
            "tx_sky_rainy.dds",
            1.0,
            2.0,
            0.0,
            rgb8(116, 120, 122),
            rgb8(116, 120, 122),
            rgb8(98, 115, 134),
            0.3,
        ));
        table.insert(state(
            "thunderstorm",
            "tx_sky_thunder.dds",
            1.0,
            3.0,
            0.0,
            rgb8(78, 81, 82),
            rgb8(78, 81, 82),
            rgb8(76, 83, 90),
            0.5,
        ));
        table.insert(state(
            "ashstorm",
            "tx_sky_ashstorm.dds",
            1.0,
            7.0,
            0.0,
            rgb8(159, 79, 61),
            rgb8(142, 84, 53),
            rgb8(196, 153, 109),
            0.8,
        ));
        table.insert(state(
            "blight",
            "tx_sky_blight.dds",
            1.0,
            9.0,
            0.0,
            rgb8(157, 77, 68),
            rgb8(129, 64, 50),
            rgb8(176, 109, 72),
            0.9,
        ));
        table.insert(state(
            "snow",
            "tx_bm_sky_snow.dds",
            1.0,
            1.5,
            0.0,
            rgb8(153, 158, 166),
            rgb8(150, 155, 164),
            rgb8(141, 109, 109),
            0.0,
        ));
        table.insert(state(
            "blizzard",
            "tx_bm_sky_blizzard.dds",
            1.0,
            7.5,
            0.0,
            rgb8(121, 133, 145),
            rgb8(121, 133, 145),
            rgb8(147, 108, 97),
            0.9,
        ));
        table
    }
}
