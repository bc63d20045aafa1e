use crate::moon::MoonPhase;

/// Snapshot of the sky state for logging and tooling.
#[derive(Debug, Clone, PartialEq)]
pub struct SkySummary {
    pub enabled: bool,
    pub sun_enabled: bool,
    pub glare_enabled: bool,
    pub hour: f64,
    pub day: u32,
    pub month: u32,
    pub masser_phase: Option<MoonPhase>,
    pub secunda_phase: Option<MoonPhase>,
    pub weather: Option<String>,
    pub next_weather: Option<String>,
    pub remaining_transition: f32,
    pub cloud_opacity: f32,
    pub cloud_speed: f32,
    pub cloud_blend_factor: f32,
    pub sun_visibility: f32,
}

impl std::fmt::Display for SkySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = |p: Option<MoonPhase>| p.map_or_else(|| "-".to_string(), |p| p.to_string());
        write!(
            f,
            "Sky: {} hour={:.2} date={}/{} masser={} secunda={}",
            if self.enabled { "enabled" } else { "disabled" },
            self.hour,
            self.day,
            self.month,
            phase(self.masser_phase),
            phase(self.secunda_phase),
        )?;
        write!(f, " weather={}", self.weather.as_deref().unwrap_or("-"))?;
        if let Some(next) = &self.next_weather {
            write!(f, " -> {next} ({:.1}s left)", self.remaining_transition)?;
        }
        write!(
            f,
            " clouds(opacity={:.2} speed={:.2} blend={:.2}) sun={}{} visibility={:.2}",
            self.cloud_opacity,
            self.cloud_speed,
            self.cloud_blend_factor,
            if self.sun_enabled { "on" } else { "off" },
            if self.glare_enabled { "+glare" } else { "" },
            self.sun_visibility,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SkySummary {
        SkySummary {
            enabled: true,
            sun_enabled: true,
            glare_enabled: true,
            hour: 13.5,
            day: 4,
            month: 2,
            masser_phase: Some(MoonPhase::WaxingCrescent),
            secunda_phase: Some(MoonPhase::Full),
            weather: Some("clear".into()),
            next_weather: None,
            remaining_transition: 0.0,
            cloud_opacity: 0.75,
            cloud_speed: 1.25,
            cloud_blend_factor: 0.0,
            sun_visibility: 1.0,
        }
    }

    #[test]
    fn display_steady_weather() {
        let text = summary().to_string();
        assert!(text.starts_with("Sky: enabled hour=13.50 date=4/2"));
        assert!(text.contains("masser=waxing crescent"));
        assert!(text.contains("weather=clear clouds("));
        assert!(text.contains("sun=on+glare"));
    }

    #[test]
    fn display_transition() {
        let s = SkySummary {
            next_weather: Some("rain".into()),
            remaining_transition: 4.5,
            enabled: false,
            weather: None,
            ..summary()
        };
        let text = s.to_string();
        assert!(text.contains("disabled"));
        assert!(text.contains("weather=- -> rain (4.5s left)"));
    }
}
