//! YAML recipes: an ordered list of tonal adjustments.
//!
//! ```yaml
//! name: warm fade
//! steps:
//!   - op: levels
//!     input_black_point: 0.05
//!     output_black_point: 0.1
//!   - op: color_balance
//!     midtones: { cyan_red: 0.3, yellow_blue: -0.2 }
//!   - op: hue_sat_preset
//!     hue: blue
//!     sat_offset: -40
//! ```
//!
//! Every step's fields are optional and default to the matching params
//! record's `Default`. Steps run in order on the output of the previous one;
//! the selection masks of hue/saturation steps are discarded.

use pixblend_core::PixelBuffer;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::black_white::{black_white, BlackWhiteParams};
use crate::color_balance::{
    color_balance, color_balance_advanced, ColorBalanceAdvancedParams, ColorBalanceParams,
};
use crate::hue_sat::{hue_sat, hue_sat_preset, HueSatParams, HueSatPresetParams};
use crate::levels::{levels, LevelsParams};
use crate::OpsResult;

/// One adjustment in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// [`levels`]
    Levels(LevelsParams),
    /// [`color_balance`]
    ColorBalance(ColorBalanceParams),
    /// [`color_balance_advanced`]
    ColorBalanceAdvanced(ColorBalanceAdvancedParams),
    /// [`hue_sat`]
    HueSat(HueSatParams),
    /// [`hue_sat_preset`]
    HueSatPreset(HueSatPresetParams),
    /// [`black_white`]
    BlackWhite(BlackWhiteParams),
}

impl Step {
    /// Short name of the operation, as written in the `op` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Levels(_) => "levels",
            Self::ColorBalance(_) => "color_balance",
            Self::ColorBalanceAdvanced(_) => "color_balance_advanced",
            Self::HueSat(_) => "hue_sat",
            Self::HueSatPreset(_) => "hue_sat_preset",
            Self::BlackWhite(_) => "black_white",
        }
    }

    /// Runs this step on `image`.
    pub fn apply(&self, image: &PixelBuffer) -> OpsResult<PixelBuffer> {
        match self {
            Self::Levels(p) => levels(image, p),
            Self::ColorBalance(p) => color_balance(image, p),
            Self::ColorBalanceAdvanced(p) => color_balance_advanced(image, p),
            Self::HueSat(p) => Ok(hue_sat(image, p)?.0),
            Self::HueSatPreset(p) => Ok(hue_sat_preset(image, p)?.0),
            Self::BlackWhite(p) => black_white(image, p),
        }
    }
}

/// An ordered list of adjustments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Adjustments, applied first to last.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Parses a recipe from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OpsError::Recipe`] for malformed YAML, an unknown
    /// `op`, or an unknown enum name inside a step.
    pub fn from_yaml(yaml: &str) -> OpsResult<Self> {
        let recipe: Recipe = serde_yaml::from_str(yaml)?;
        debug!(name = ?recipe.name, steps = recipe.steps.len(), "Loaded recipe");
        Ok(recipe)
    }

    /// Serializes the recipe back to YAML.
    pub fn to_yaml(&self) -> OpsResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Applies every step in order. An empty recipe returns a copy.
    pub fn apply(&self, image: &PixelBuffer) -> OpsResult<PixelBuffer> {
        trace!(shape = ?image.shape(), steps = self.steps.len(), "recipe::apply");
        let mut current = image.clone();
        for (i, step) in self.steps.iter().enumerate() {
            debug!(index = i, op = step.name(), "Recipe step");
            current = step.apply(&current)?;
        }
        Ok(current)
    }
}
