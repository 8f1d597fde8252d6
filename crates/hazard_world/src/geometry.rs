use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_Y: f64 = 0.0;
pub const DEFAULT_MAX_Y: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl WorldPos {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn with_y(self, y: f64) -> Self {
        Self { y, ..self }
    }
}

/// Valid build height of a world. Positions are clamped into it before a
/// spatial query so entities above or below the world still resolve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalBounds {
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for VerticalBounds {
    fn default() -> Self {
        Self {
            min_y: DEFAULT_MIN_Y,
            max_y: DEFAULT_MAX_Y,
        }
    }
}

impl VerticalBounds {
    pub fn new(min_y: f64, max_y: f64) -> Self {
        if min_y <= max_y {
            Self { min_y, max_y }
        } else {
            Self {
                min_y: max_y,
                max_y: min_y,
            }
        }
    }

    pub fn is_finite(&self) -> bool {
        self.min_y.is_finite() && self.max_y.is_finite()
    }

    /// Bounds are reordered first since the fields may be set out of order.
    /// A NaN bound leaves that side unclamped.
    pub fn clamp_y(&self, y: f64) -> f64 {
        let low = self.min_y.min(self.max_y);
        let high = self.min_y.max(self.max_y);
        y.max(low).min(high)
    }

    pub fn clamp(&self, pos: WorldPos) -> WorldPos {
        pos.with_y(self.clamp_y(pos.y))
    }
}

/// Axis-aligned box, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub min: WorldPos,
    pub max: WorldPos,
}

impl Cuboid {
    pub fn new(a: WorldPos, b: WorldPos) -> Self {
        Self {
            min: WorldPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: WorldPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn contains(&self, pos: WorldPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }
}
