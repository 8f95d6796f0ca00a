//! Selection state behind the cart-item customization dialog.
//!
//! Only the state is modelled here: which color and which features the
//! shopper has picked while the dialog is open, and what gets handed back on
//! save. Rendering belongs to the storefront frontend.

use crate::error::{ModelError, Result};

/// The customizable slice of a product description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductOptions {
    pub name: String,
    /// Comma-separated list as stored on the product, e.g. `"Red, Blue"`.
    pub color: Option<String>,
    pub features: Vec<String>,
}

impl ProductOptions {
    pub fn available_colors(&self) -> Vec<&str> {
        self.color
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|color| !color.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn offers_color(&self, color: &str) -> bool {
        self.available_colors().contains(&color)
    }

    pub fn offers_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|offered| offered == feature)
    }
}

/// What the dialog hands back on save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    pub color: Option<String>,
    pub features: Vec<String>,
}

/// In-progress edit of one cart item.
#[derive(Debug, Clone)]
pub struct CustomizationDraft {
    options: ProductOptions,
    color: Option<String>,
    features: Vec<String>,
}

impl CustomizationDraft {
    /// Opening the dialog always resets the draft to the cart item's current
    /// values, discarding anything left over from a previous cancel.
    pub fn open(
        options: ProductOptions,
        current_color: Option<String>,
        current_features: Vec<String>,
    ) -> Self {
        Self {
            options,
            color: current_color,
            features: current_features,
        }
    }

    pub fn options(&self) -> &ProductOptions {
        &self.options
    }

    pub fn selected_color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn selected_features(&self) -> &[String] {
        &self.features
    }

    /// Picking the already selected color clears the choice.
    pub fn select_color(&mut self, color: &str) -> Result<()> {
        if !self.options.offers_color(color) {
            return Err(ModelError::UnknownOption {
                kind: "color",
                value: color.to_string(),
            });
        }
        if self.color.as_deref() == Some(color) {
            self.color = None;
        } else {
            self.color = Some(color.to_string());
        }
        Ok(())
    }

    /// Adds the feature if absent, removes it if present. Returns whether the
    /// feature is selected afterwards.
    pub fn toggle_feature(&mut self, feature: &str) -> Result<bool> {
        if !self.options.offers_feature(feature) {
            return Err(ModelError::UnknownOption {
                kind: "feature",
                value: feature.to_string(),
            });
        }
        if let Some(idx) = self.features.iter().position(|f| f == feature) {
            self.features.remove(idx);
            Ok(false)
        } else {
            self.features.push(feature.to_string());
            Ok(true)
        }
    }

    pub fn save(self) -> Selection {
        Selection {
            color: self.color,
            features: self.features,
        }
    }

    pub fn cancel(self) {}
}
