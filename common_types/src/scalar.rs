//! Clamped scalar newtypes shared across the pipeline.

use serde::{Deserialize, Serialize};

/// A float clamped to [0, 1] at construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct UnitInterval(f32);

impl UnitInterval {
    pub fn new(v: f32) -> Self {
        Self(v.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for UnitInterval {
    fn default() -> Self {
        Self(0.0)
    }
}

impl From<f32> for UnitInterval {
    fn from(v: f32) -> Self {
        Self::new(v)
    }
}

/// A 1..=5 scale used for warmth/directness tone knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FivePointScale(u8);

impl FivePointScale {
    pub fn new(v: u8) -> Self {
        Self(v.clamp(1, 5))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for FivePointScale {
    fn default() -> Self {
        Self(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_interval_clamps() {
        assert_eq!(UnitInterval::new(-1.0).get(), 0.0);
        assert_eq!(UnitInterval::new(2.0).get(), 1.0);
        assert_eq!(UnitInterval::new(0.4).get(), 0.4);
    }

    #[test]
    fn five_point_scale_clamps() {
        assert_eq!(FivePointScale::new(0).get(), 1);
        assert_eq!(FivePointScale::new(9).get(), 5);
    }
}
