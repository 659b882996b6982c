//! Output of the dimensional detector (component C).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{Domain, Vertical};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Integration {
    pub phi: f32,
    pub complexity: u32,
    pub coherence: f32,
    pub tension: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionalState {
    pub vertical: HashMap<Vertical, f32>,
    pub horizontal: HashMap<Domain, f32>,
    pub primary_vertical: Vertical,
    /// Top <=3 horizontal domains by weight.
    pub primary_horizontal: Vec<Domain>,
    pub v_mode_triggered: bool,
    pub emergency_detected: bool,
    pub cross_dimensional: bool,
    pub integration: Integration,
}

impl DimensionalState {
    pub fn vertical_weight(&self, v: Vertical) -> f32 {
        *self.vertical.get(&v).unwrap_or(&0.0)
    }

    pub fn horizontal_weight(&self, d: Domain) -> f32 {
        *self.horizontal.get(&d).unwrap_or(&0.0)
    }
}
