// SKYLINE Style Parameters
// Copyright (c) 2026 Xing_The_Creator | SKYLINE
//
// The record of stylistic knobs that drives cityscape artwork generation,
// plus the coercion layer that turns untrusted form input into it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Color Tone
// ─────────────────────────────────────────────────────────────────────────────

/// Palette family applied to the rendered skyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTone {
    Downtown,
    Sunset,
    Industrial,
    Riverfront,
    Storm,
}

impl ColorTone {
    pub const ALL: [ColorTone; 5] = [
        ColorTone::Downtown,
        ColorTone::Sunset,
        ColorTone::Industrial,
        ColorTone::Riverfront,
        ColorTone::Storm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorTone::Downtown => "downtown",
            ColorTone::Sunset => "sunset",
            ColorTone::Industrial => "industrial",
            ColorTone::Riverfront => "riverfront",
            ColorTone::Storm => "storm",
        }
    }
}

impl fmt::Display for ColorTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorTone {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorTone::ALL
            .iter()
            .copied()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParamError::UnknownTone(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coercion errors
// ─────────────────────────────────────────────────────────────────────────────

/// Rejection raised while coercing request input into [`StyleParameters`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    InvalidNumber { field: &'static str, value: String },
    UnknownTone(String),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::InvalidNumber { field, value } => {
                write!(f, "Invalid value for '{}': '{}' is not a number", field, value)
            }
            ParamError::UnknownTone(tone) => write!(f, "Unknown color tone '{}'", tone),
        }
    }
}

impl std::error::Error for ParamError {}

// ─────────────────────────────────────────────────────────────────────────────
// StyleParameters
// ─────────────────────────────────────────────────────────────────────────────

/// Stylistic knobs for one artwork.
///
/// Every field is optional so partial records survive a round trip through
/// the variation engine without gaining keys they never had.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos: Option<f64>,
    #[serde(rename = "lineThickness", default, skip_serializing_if = "Option::is_none")]
    pub line_thickness: Option<f64>,
    #[serde(rename = "buildingDensity", default, skip_serializing_if = "Option::is_none")]
    pub building_density: Option<f64>,
    /// Integer-valued, kept as `f64` like every other numeric knob.
    #[serde(rename = "skylineComplexity", default, skip_serializing_if = "Option::is_none")]
    pub skyline_complexity: Option<f64>,
    #[serde(rename = "textureGrain", default, skip_serializing_if = "Option::is_none")]
    pub texture_grain: Option<f64>,
    #[serde(rename = "colorIntensity", default, skip_serializing_if = "Option::is_none")]
    pub color_intensity: Option<f64>,
    #[serde(rename = "hueAdjust", default, skip_serializing_if = "Option::is_none")]
    pub hue_adjust: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tone: Option<ColorTone>,
    #[serde(rename = "redSculpture", default, skip_serializing_if = "Option::is_none")]
    pub red_sculpture: Option<bool>,
    #[serde(rename = "glassToledo", default, skip_serializing_if = "Option::is_none")]
    pub glass_toledo: Option<bool>,
    #[serde(rename = "mudHens", default, skip_serializing_if = "Option::is_none")]
    pub mud_hens: Option<bool>,
    #[serde(rename = "toledoMuseum", default, skip_serializing_if = "Option::is_none")]
    pub toledo_museum: Option<bool>,
}

/// Numeric knobs, used to address fields generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Intensity,
    Chaos,
    LineThickness,
    BuildingDensity,
    SkylineComplexity,
    TextureGrain,
    ColorIntensity,
    HueAdjust,
}

impl NumericField {
    pub const ALL: [NumericField; 8] = [
        NumericField::Intensity,
        NumericField::Chaos,
        NumericField::LineThickness,
        NumericField::BuildingDensity,
        NumericField::SkylineComplexity,
        NumericField::TextureGrain,
        NumericField::ColorIntensity,
        NumericField::HueAdjust,
    ];

    /// Wire name, as sent by the drawing client.
    pub fn key(&self) -> &'static str {
        match self {
            NumericField::Intensity => "intensity",
            NumericField::Chaos => "chaos",
            NumericField::LineThickness => "lineThickness",
            NumericField::BuildingDensity => "buildingDensity",
            NumericField::SkylineComplexity => "skylineComplexity",
            NumericField::TextureGrain => "textureGrain",
            NumericField::ColorIntensity => "colorIntensity",
            NumericField::HueAdjust => "hueAdjust",
        }
    }

    /// Value substituted when the form omits the field.
    pub fn default_value(&self) -> f64 {
        match self {
            NumericField::SkylineComplexity => 5.0,
            NumericField::HueAdjust => 0.0,
            NumericField::Intensity | NumericField::Chaos => 0.5,
            _ => 1.0,
        }
    }
}

impl StyleParameters {
    pub fn get(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Intensity => self.intensity,
            NumericField::Chaos => self.chaos,
            NumericField::LineThickness => self.line_thickness,
            NumericField::BuildingDensity => self.building_density,
            NumericField::SkylineComplexity => self.skyline_complexity,
            NumericField::TextureGrain => self.texture_grain,
            NumericField::ColorIntensity => self.color_intensity,
            NumericField::HueAdjust => self.hue_adjust,
        }
    }

    pub fn slot_mut(&mut self, field: NumericField) -> &mut Option<f64> {
        match field {
            NumericField::Intensity => &mut self.intensity,
            NumericField::Chaos => &mut self.chaos,
            NumericField::LineThickness => &mut self.line_thickness,
            NumericField::BuildingDensity => &mut self.building_density,
            NumericField::SkylineComplexity => &mut self.skyline_complexity,
            NumericField::TextureGrain => &mut self.texture_grain,
            NumericField::ColorIntensity => &mut self.color_intensity,
            NumericField::HueAdjust => &mut self.hue_adjust,
        }
    }

    /// Build a fully populated record from form fields.
    ///
    /// Missing numeric fields take their defaults, a missing tone becomes
    /// `downtown`, and a flag is only set when its value is exactly `"true"`.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, ParamError> {
        let mut params = StyleParameters::default();

        for field in NumericField::ALL {
            let value = match form.get(field.key()) {
                Some(raw) => parse_number(field.key(), raw)?,
                None => field.default_value(),
            };
            *params.slot_mut(field) = Some(value);
        }

        params.color_tone = Some(match form.get("color_tone") {
            Some(raw) => raw.parse()?,
            None => ColorTone::Downtown,
        });

        let flag = |key: &str| Some(form.get(key).map(|v| v == "true").unwrap_or(false));
        params.red_sculpture = flag("redSculpture");
        params.glass_toledo = flag("glassToledo");
        params.mud_hens = flag("mudHens");
        params.toledo_museum = flag("toledoMuseum");

        Ok(params)
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ParamError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ParamError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}
