//! Catalog-side product description, keyed by sku and owned by the catalog.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::{Dims3D, Vector2};
use crate::model::Pricing;

/// Metadata resolved for one projection, keyed by sku.
pub type MetadataMap = FxHashMap<String, Arc<ProductMetadata>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// Sprite footprint plus the normalized anchor (0..1, y pointing down the image).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualDims {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_anchor")]
    pub anchor: Vector2,
}

impl Default for VisualDims {
    fn default() -> Self { Self { width: 0.0, height: 0.0, anchor: default_anchor() } }
}

/// Bottom-centre: products rest on their base.
pub fn default_anchor() -> Vector2 { Vector2::new(0.5, 1.0) }

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDimensions {
    pub physical: Dims3D,
    #[serde(default)]
    pub visual: VisualDims,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowType {
    None,
    #[default]
    Drop,
    Contact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteVariant {
    pub view: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualProperties {
    #[serde(default)]
    pub sprite_variants: Vec<SpriteVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_transparency: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_type: Option<ShadowType>,
}

impl VisualProperties {
    /// Front view when the catalog has one, else the first variant.
    pub fn primary_sprite(&self) -> Option<&SpriteVariant> {
        self.sprite_variants
            .iter()
            .find(|v| v.view.eq_ignore_ascii_case("front"))
            .or_else(|| self.sprite_variants.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMetadata {
    pub sku: String,
    pub name: String,
    pub classification: Classification,
    pub dimensions: ProductDimensions,
    #[serde(default)]
    pub visual_properties: VisualProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
}

impl ProductMetadata {
    pub fn physical(&self) -> Dims3D { self.dimensions.physical }
}
