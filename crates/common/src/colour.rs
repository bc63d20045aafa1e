use serde::{Deserialize, Serialize};

/// Linear RGBA colour with components nominally in `[0, 1]`.
///
/// Components are not clamped; lighting values above 1.0 are legal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Default for Colour {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Colour {
    pub const WHITE: Colour = Colour::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Colour = Colour::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from RGB components.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Scale the RGB components by `k`, keeping alpha.
    pub fn scaled(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k, self.a)
    }

    /// Component-wise sum of RGB, keeping `self`'s alpha.
    pub fn add_rgb(self, other: Colour) -> Self {
        Self::new(self.r + other.r, self.g + other.g, self.b + other.b, self.a)
    }

    /// Component-wise linear blend: `a * (1 - t) + b * t`.
    pub fn lerp(a: Colour, b: Colour, t: f32) -> Colour {
        let mix = |x: f32, y: f32| x * (1.0 - t) + y * t;
        Colour::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b), mix(a.a, b.a))
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[f32; 4]> for Colour {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<[f32; 3]> for Colour {
    fn from(c: [f32; 3]) -> Self {
        Self::rgb(c[0], c[1], c[2])
    }
}

impl std::fmt::Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3}, {:.3})",
            self.r, self.g, self.b, self.a
        )
    }
}
