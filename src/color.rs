use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::PropertyType;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Property type → Color32
// ---------------------------------------------------------------------------

/// One fixed colour per property type, shared by every chart.
#[derive(Debug, Clone)]
pub struct TypeColors {
    mapping: BTreeMap<PropertyType, Color32>,
}

impl Default for TypeColors {
    fn default() -> Self {
        let mapping = PropertyType::ALL
            .into_iter()
            .zip(generate_palette(PropertyType::ALL.len()))
            .collect();
        TypeColors { mapping }
    }
}

impl TypeColors {
    pub fn color_for(&self, property_type: PropertyType) -> Color32 {
        self.mapping
            .get(&property_type)
            .copied()
            .unwrap_or(Color32::GRAY)
    }
}

// ---------------------------------------------------------------------------
// Continuous ramp for price per m²
// ---------------------------------------------------------------------------

/// Sequential ramp from dark purple (low) through teal to yellow (high).
///
/// `t` is clamped to `[0, 1]`.
pub fn price_ramp(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let hue = 270.0 - 210.0 * t;
    let lightness = 0.30 + 0.35 * t;
    hsl_to_color32(hue, 0.80, lightness)
}

/// Position of `value` inside `[min, max]`, 0.5 for a degenerate range.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span.abs() < f64::EPSILON {
        0.5
    } else {
        (value - min) / span
    }
}
