//! Moon phases and bodies, and the static phase -> texture/alpha lookup.

use serde::{Deserialize, Serialize};

use crate::TEXTURE_DIR;
use crate::error::SkyError;

/// One of eight named illumination states of a moon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MoonPhase {
    New = 0,
    WaxingCrescent,
    WaxingHalf,
    WaxingGibbous,
    WaningCrescent,
    WaningHalf,
    WaningGibbous,
    Full,
}

/// Order the phases follow across a lunar cycle.
const CYCLE: [MoonPhase; 8] = [
    MoonPhase::New,
    MoonPhase::WaxingCrescent,
    MoonPhase::WaxingHalf,
    MoonPhase::WaxingGibbous,
    MoonPhase::Full,
    MoonPhase::WaningGibbous,
    MoonPhase::WaningHalf,
    MoonPhase::WaningCrescent,
];

impl MoonPhase {
    /// All phases in discriminant order.
    pub const ALL: [MoonPhase; 8] = [
        MoonPhase::New,
        MoonPhase::WaxingCrescent,
        MoonPhase::WaxingHalf,
        MoonPhase::WaxingGibbous,
        MoonPhase::WaningCrescent,
        MoonPhase::WaningHalf,
        MoonPhase::WaningGibbous,
        MoonPhase::Full,
    ];

    pub fn texture_suffix(self) -> &'static str {
        match self {
            MoonPhase::New => "new",
            MoonPhase::WaxingCrescent => "one_wax",
            MoonPhase::WaxingHalf => "half_wax",
            MoonPhase::WaxingGibbous => "three_wax",
            MoonPhase::WaningCrescent => "one_wan",
            MoonPhase::WaningHalf => "half_wan",
            MoonPhase::WaningGibbous => "three_wan",
            MoonPhase::Full => "full",
        }
    }

    /// Lit fraction of the disc.
    pub fn alpha(self) -> f32 {
        match self {
            MoonPhase::New => 0.0,
            MoonPhase::WaxingCrescent | MoonPhase::WaningCrescent => 0.25,
            MoonPhase::WaxingHalf | MoonPhase::WaningHalf => 0.5,
            MoonPhase::WaxingGibbous | MoonPhase::WaningGibbous => 0.75,
            MoonPhase::Full => 1.0,
        }
    }

    /// Collapsed phase: 0 new, 1 crescent, 2 half, 3 gibbous, 4 full.
    /// Waxing and waning share a value.
    pub fn phase_int(self) -> u8 {
        match self {
            MoonPhase::New => 0,
            MoonPhase::WaxingCrescent | MoonPhase::WaningCrescent => 1,
            MoonPhase::WaxingHalf | MoonPhase::WaningHalf => 2,
            MoonPhase::WaxingGibbous | MoonPhase::WaningGibbous => 3,
            MoonPhase::Full => 4,
        }
    }

    /// Phase on a given calendar day. Each phase lasts `days_per_phase`
    /// days; the cycle starts at new moon on day 0.
    pub fn from_day(day: u32, days_per_phase: u32) -> MoonPhase {
        let days_per_phase = u64::from(days_per_phase.max(1));
        let cycle_len = days_per_phase * CYCLE.len() as u64;
        CYCLE[((u64::from(day) % cycle_len) / days_per_phase) as usize]
    }
}

impl TryFrom<u8> for MoonPhase {
    type Error = SkyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MoonPhase::ALL
            .get(value as usize)
            .copied()
            .ok_or(SkyError::InvalidPhase(value))
    }
}

impl std::fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MoonPhase::New => "new",
            MoonPhase::WaxingCrescent => "waxing crescent",
            MoonPhase::WaxingHalf => "waxing half",
            MoonPhase::WaxingGibbous => "waxing gibbous",
            MoonPhase::WaningCrescent => "waning crescent",
            MoonPhase::WaningHalf => "waning half",
            MoonPhase::WaningGibbous => "waning gibbous",
            MoonPhase::Full => "full",
        };
        f.write_str(name)
    }
}

/// Which of the two moons a billboard draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MoonBody {
    Masser = 0,
    Secunda,
}

impl MoonBody {
    pub fn texture_prefix(self) -> &'static str {
        match self {
            MoonBody::Masser => "masser",
            MoonBody::Secunda => "secunda",
        }
    }

    pub fn default_size(self) -> f32 {
        match self {
            MoonBody::Masser => 0.75,
            MoonBody::Secunda => 0.5,
        }
    }
}

impl TryFrom<u8> for MoonBody {
    type Error = SkyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MoonBody::Masser),
            1 => Ok(MoonBody::Secunda),
            other => Err(SkyError::InvalidBody(other)),
        }
    }
}

impl std::fmt::Display for MoonBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoonBody::Masser => f.write_str("Masser"),
            MoonBody::Secunda => f.write_str("Secunda"),
        }
    }
}

/// Moon-specific billboard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoonState {
    pub phase: MoonPhase,
    pub body: MoonBody,
}

/// Texture path for a moon body in a given phase.
pub fn phase_texture(body: MoonBody, phase: MoonPhase) -> String {
    format!(
        "{TEXTURE_DIR}tx_{}_{}.dds",
        body.texture_prefix(),
        phase.texture_suffix()
    )
}

/// Texture and alpha drawn for one (body, phase) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAppearance {
    pub texture: String,
    pub alpha: f32,
}

/// Static phase lookup. Pure: no time or scene dependency.
pub fn appearance(body: MoonBody, phase: MoonPhase) -> PhaseAppearance {
    PhaseAppearance {
        texture: phase_texture(body, phase),
        alpha: phase.alpha(),
    }
}
