// SKYLINE Parameter Variation Engine
// Copyright (c) 2026 Xing_The_Creator | SKYLINE
//
// Perturbs a base StyleParameters record within curated bounds so each
// generated artwork drifts from what the user dialled in. The engine is a
// pure function of its input and the injected random source.

use crate::params::{ColorTone, NumericField, StyleParameters};
use rand::Rng;

// ─────────────────────────────────────────────────────────────────────────────
// Random source
// ─────────────────────────────────────────────────────────────────────────────

/// Draws the engine needs. Any `rand::Rng` qualifies, so tests can pass a
/// seeded `StdRng` and production passes the thread RNG.
pub trait VariationSource {
    /// Uniform real in `[low, high]`.
    fn uniform_real(&mut self, low: f64, high: f64) -> f64;
    /// Uniform integer in `[low, high]`, both ends inclusive.
    fn uniform_int(&mut self, low: i64, high: i64) -> i64;
    /// `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool;
}

impl<R: Rng> VariationSource for R {
    fn uniform_real(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.gen_range(low..=high)
    }

    fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.gen_range(low..=high)
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.gen::<f64>() < probability
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variation table
// ─────────────────────────────────────────────────────────────────────────────

/// How a field's delta is derived from its magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariationKind {
    /// Whole-number step in `[-magnitude, magnitude]`.
    AdditiveInteger,
    /// Real step in `[-magnitude, magnitude]`, scaled by [`HUE_STEP_SCALE`].
    AdditiveAbsolute,
    /// Real step in `[-magnitude, magnitude]`, scaled by the base value.
    Proportional,
}

/// Curated variation envelope for one numeric field.
#[derive(Debug, Clone, Copy)]
pub struct VariationRule {
    pub field: NumericField,
    pub range: f64,
    pub min: f64,
    pub max: f64,
    pub weight: f64,
    pub kind: VariationKind,
}

impl VariationRule {
    pub fn magnitude(&self) -> f64 {
        self.range * self.weight
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Vary one value and clamp it into bounds.
    pub fn apply<S: VariationSource + ?Sized>(&self, base: f64, rng: &mut S) -> f64 {
        let magnitude = self.magnitude();
        let varied = match self.kind {
            VariationKind::AdditiveInteger => {
                let steps = magnitude.trunc() as i64;
                base + rng.uniform_int(-steps, steps) as f64
            }
            VariationKind::AdditiveAbsolute => {
                base + rng.uniform_real(-magnitude, magnitude) * HUE_STEP_SCALE
            }
            VariationKind::Proportional => {
                base + rng.uniform_real(-magnitude, magnitude) * base
            }
        };
        self.clamp(varied)
    }
}

/// Multiplier applied to the hue delta (degrees per unit of magnitude).
pub const HUE_STEP_SCALE: f64 = 15.0;

/// Probability that a present color tone is redrawn.
pub const TONE_SWAP_PROBABILITY: f64 = 0.5;

/// Relative weights for tone redraws. They need not sum to 1.
pub const TONE_WEIGHTS: [(ColorTone, f64); 5] = [
    (ColorTone::Downtown, 0.3),
    (ColorTone::Sunset, 0.25),
    (ColorTone::Industrial, 0.15),
    (ColorTone::Riverfront, 0.2),
    (ColorTone::Storm, 0.1),
];

pub static VARIATION_RULES: [VariationRule; 8] = [
    VariationRule {
        field: NumericField::Intensity,
        range: 0.3,
        min: 0.1,
        max: 1.0,
        weight: 1.2,
        kind: VariationKind::Proportional,
    },
    VariationRule {
        field: NumericField::Chaos,
        range: 0.35,
        min: 0.1,
        max: 1.0,
        weight: 1.4,
        kind: VariationKind::Proportional,
    },
    VariationRule {
        field: NumericField::LineThickness,
        range: 0.4,
        min: 0.5,
        max: 3.0,
        weight: 1.0,
        kind: VariationKind::Proportional,
    },
    VariationRule {
        field: NumericField::BuildingDensity,
        range: 0.3,
        min: 0.2,
        max: 2.0,
        weight: 1.1,
        kind: VariationKind::Proportional,
    },
    VariationRule {
        field: NumericField::SkylineComplexity,
        range: 3.0,
        min: 3.0,
        max: 12.0,
        weight: 1.2,
        kind: VariationKind::AdditiveInteger,
    },
    VariationRule {
        field: NumericField::TextureGrain,
        range: 0.3,
        min: 0.2,
        max: 2.0,
        weight: 0.9,
        kind: VariationKind::Proportional,
    },
    VariationRule {
        field: NumericField::ColorIntensity,
        range: 0.25,
        min: 0.5,
        max: 1.5,
        weight: 1.3,
        kind: VariationKind::Proportional,
    },
    VariationRule {
        field: NumericField::HueAdjust,
        range: 30.0,
        min: -180.0,
        max: 180.0,
        weight: 0.8,
        kind: VariationKind::AdditiveAbsolute,
    },
];

pub fn rule_for(field: NumericField) -> &'static VariationRule {
    VARIATION_RULES
        .iter()
        .find(|rule| rule.field == field)
        .unwrap_or_else(|| unreachable!("every numeric field has a variation rule"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Produce a varied copy of `base`.
///
/// Fields absent from `base` stay absent and flags are copied verbatim.
/// Numeric outputs are always inside their rule's bounds.
pub fn randomize<S: VariationSource + ?Sized>(
    base: &StyleParameters,
    rng: &mut S,
) -> StyleParameters {
    let mut params = base.clone();

    for rule in &VARIATION_RULES {
        let slot = params.slot_mut(rule.field);
        if let Some(value) = *slot {
            *slot = Some(rule.apply(value, &mut *rng));
        }
    }

    if params.color_tone.is_some() && rng.chance(TONE_SWAP_PROBABILITY) {
        params.color_tone = Some(draw_tone(rng));
    }

    apply_coupling(&mut params);
    params
}

/// Weighted tone draw by cumulative-weight search.
pub fn draw_tone<S: VariationSource + ?Sized>(rng: &mut S) -> ColorTone {
    let total: f64 = TONE_WEIGHTS.iter().map(|(_, w)| w).sum();
    let target = rng.uniform_real(0.0, total);

    let mut cumulative = 0.0;
    for (tone, weight) in TONE_WEIGHTS {
        cumulative += weight;
        if target < cumulative {
            return tone;
        }
    }
    TONE_WEIGHTS[TONE_WEIGHTS.len() - 1].0
}

/// Cross-field adjustments, applied in order on already-varied values.
/// A rule only touches a field that is present.
pub fn apply_coupling(params: &mut StyleParameters) {
    if params.chaos.is_some_and(|c| c > 0.8) {
        if let Some(thickness) = params.line_thickness.as_mut() {
            *thickness = (*thickness * 1.2).min(3.0);
        }
    }

    if params.intensity.is_some_and(|i| i < 0.3) {
        if let Some(density) = params.building_density.as_mut() {
            *density = (*density * 0.8).max(0.2);
        }
    }

    if let Some(color) = params.color_intensity.as_mut() {
        match params.color_tone {
            Some(ColorTone::Industrial) => *color = (*color * 0.85).clamp(0.5, 1.2),
            Some(ColorTone::Sunset) => *color = (*color * 1.15).clamp(0.5, 1.5),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Source that always returns the midpoint and never swaps tones.
    struct Midpoint;

    impl VariationSource for Midpoint {
        fn uniform_real(&mut self, low: f64, high: f64) -> f64 {
            (low + high) / 2.0
        }
        fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
            (low + high) / 2
        }
        fn chance(&mut self, _probability: f64) -> bool {
            false
        }
    }

    /// Source pinned to the top of every range.
    struct Ceiling;

    impl VariationSource for Ceiling {
        fn uniform_real(&mut self, _low: f64, high: f64) -> f64 {
            high
        }
        fn uniform_int(&mut self, _low: i64, high: i64) -> i64 {
            high
        }
        fn chance(&mut self, _probability: f64) -> bool {
            true
        }
    }

    fn full_base() -> StyleParameters {
        StyleParameters {
            intensity: Some(0.5),
            chaos: Some(0.5),
            line_thickness: Some(1.0),
            building_density: Some(1.0),
            skyline_complexity: Some(5.0),
            texture_grain: Some(1.0),
            color_intensity: Some(1.0),
            hue_adjust: Some(0.0),
            color_tone: Some(ColorTone::Downtown),
            red_sculpture: Some(true),
            glass_toledo: Some(false),
            mud_hens: Some(true),
            toledo_museum: Some(false),
        }
    }

    #[test]
    fn test_midpoint_source_leaves_values_unchanged() {
        let base = full_base();
        let out = randomize(&base, &mut Midpoint);
        assert_eq!(out, base);
    }

    #[test]
    fn test_ceiling_source_hits_documented_steps() {
        let mut base = full_base();
        base.color_intensity = None;
        let out = randomize(&base, &mut Ceiling);

        // skylineComplexity: trunc(3 * 1.2) = 3 steps
        assert_eq!(out.skyline_complexity, Some(8.0));
        // hueAdjust: 30 * 0.8 * 15
        assert_eq!(out.hue_adjust, Some(180.0));
        // intensity: 0.5 + 0.36 * 0.5
        assert!((out.intensity.unwrap() - 0.68).abs() < 1e-9);
        // chaos: 0.5 + 0.49 * 0.5 = 0.745, below the coupling threshold
        assert!((out.chaos.unwrap() - 0.745).abs() < 1e-9);
        // Ceiling draw lands past the cumulative total, falling back to the last tone
        assert_eq!(out.color_tone, Some(ColorTone::Storm));
    }

    #[test]
    fn test_magnitudes() {
        assert!((rule_for(NumericField::Chaos).magnitude() - 0.49).abs() < 1e-12);
        assert!((rule_for(NumericField::HueAdjust).magnitude() - 24.0).abs() < 1e-12);
        assert_eq!(
            rule_for(NumericField::SkylineComplexity).kind,
            VariationKind::AdditiveInteger
        );
    }

    #[test]
    fn test_clamps_out_of_range_base() {
        let base = StyleParameters {
            intensity: Some(5.0),
            hue_adjust: Some(-400.0),
            skyline_complexity: Some(40.0),
            ..Default::default()
        };
        let out = randomize(&base, &mut Midpoint);
        assert_eq!(out.intensity, Some(1.0));
        assert_eq!(out.hue_adjust, Some(-180.0));
        assert_eq!(out.skyline_complexity, Some(12.0));
    }

    #[test]
    fn test_coupling_chaos_thickens_lines_and_clamps() {
        let mut params = StyleParameters {
            chaos: Some(0.9),
            line_thickness: Some(2.9),
            ..Default::default()
        };
        apply_coupling(&mut params);
        assert_eq!(params.line_thickness, Some(3.0));

        let mut params = StyleParameters {
            chaos: Some(0.9),
            line_thickness: Some(1.0),
            ..Default::default()
        };
        apply_coupling(&mut params);
        assert!((params.line_thickness.unwrap() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_coupling_low_intensity_thins_buildings() {
        let mut params = StyleParameters {
            intensity: Some(0.2),
            building_density: Some(0.22),
            ..Default::default()
        };
        apply_coupling(&mut params);
        assert_eq!(params.building_density, Some(0.2));
    }

    #[test]
    fn test_coupling_tone_rules() {
        let mut industrial = StyleParameters {
            color_tone: Some(ColorTone::Industrial),
            color_intensity: Some(1.5),
            ..Default::default()
        };
        apply_coupling(&mut industrial);
        assert_eq!(industrial.color_intensity, Some(1.2));

        let mut sunset = StyleParameters {
            color_tone: Some(ColorTone::Sunset),
            color_intensity: Some(1.0),
            ..Default::default()
        };
        apply_coupling(&mut sunset);
        assert!((sunset.color_intensity.unwrap() - 1.15).abs() < 1e-12);

        let mut storm = StyleParameters {
            color_tone: Some(ColorTone::Storm),
            color_intensity: Some(1.0),
            ..Default::default()
        };
        apply_coupling(&mut storm);
        assert_eq!(storm.color_intensity, Some(1.0));
    }

    #[test]
    fn test_coupling_never_fabricates_fields() {
        let mut params = StyleParameters {
            chaos: Some(0.95),
            intensity: Some(0.1),
            color_tone: Some(ColorTone::Sunset),
            ..Default::default()
        };
        apply_coupling(&mut params);
        assert_eq!(params.line_thickness, None);
        assert_eq!(params.building_density, None);
        assert_eq!(params.color_intensity, None);
    }

    #[test]
    fn test_tone_draw_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut storm = 0;
        let mut downtown = 0;
        for _ in 0..10_000 {
            match draw_tone(&mut rng) {
                ColorTone::Storm => storm += 1,
                ColorTone::Downtown => downtown += 1,
                _ => {}
            }
        }
        assert!(storm > 800 && storm < 1200, "storm drawn {} / 10000", storm);
        assert!(downtown > 2700 && downtown < 3300, "downtown drawn {} / 10000", downtown);
    }

    #[test]
    fn test_same_seed_same_output() {
        let base = full_base();
        let a = randomize(&base, &mut StdRng::seed_from_u64(99));
        let b = randomize(&base, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
