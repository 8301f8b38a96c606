//! Render instances: one physical copy of a product, fully positioned for a drawing
//! engine. Recomputed on every projection and never persisted.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Dims3D, Vector2, Vector3};
use crate::metadata::{ShadowType, VisualDims};
use crate::model::{FacingConfig, PyramidConfig, SemanticPosition};
use crate::validation::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthBucket {
    #[default]
    Front,
    Middle,
    Back,
}

impl DepthBucket {
    pub fn for_ratio(ratio: f64) -> Self {
        if ratio < 0.33 {
            DepthBucket::Front
        } else if ratio <= 0.66 {
            DepthBucket::Middle
        } else {
            DepthBucket::Back
        }
    }
}

/// Components that were summed into `z_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZLayer {
    pub shelf: i64,
    pub depth: i64,
    pub promotion: i64,
}

impl ZLayer {
    pub fn total(&self) -> i64 { self.shelf + self.depth + self.promotion }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowProfile {
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShadowSpec {
    pub enabled: bool,
    pub contact: bool,
    pub profile: ShadowProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskType {
    AlphaChannel,
    Silhouette,
    Outline,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskSpec {
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_type: Option<MaskType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_url: Option<String>,
    pub has_transparency: bool,
}

impl AssetRefs {
    pub fn is_empty(&self) -> bool { self.sprite_url.is_none() && self.mask_url.is_none() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderInstance {
    pub id: String,
    pub source_product_id: String,
    pub sku: String,
    pub category: String,

    // hydrated
    pub physical: Dims3D,
    pub visual: VisualDims,
    pub assets: AssetRefs,
    pub shadow_type: Option<ShadowType>,
    pub promotional: bool,

    // semantic
    pub semantic: SemanticPosition,
    /// Facings as authored (not clamped) so validation can flag odd counts.
    pub facings: Option<FacingConfig>,
    pub pyramid: Option<PyramidConfig>,
    pub expansion_offset: Vector3,

    // derived
    pub world_position: Vector3,
    pub depth_ratio: f64,
    pub depth_bucket: DepthBucket,
    pub render_scale: f64,
    pub scaled_dimensions: Dims3D,
    pub z_index: i64,
    pub z_layer: ZLayer,
    pub shadow: ShadowSpec,
    pub mask: MaskSpec,
    pub render_bounds: Bounds,
    /// Where the product touches its support, in world mm.
    pub baseline_point: Vector2,
    pub collision_bounds: Bounds,
    pub validation: ValidationResult,
}

impl RenderInstance {
    /// Unhydrated template for a source product; pipeline stages fill in the rest.
    pub fn template(id: impl Into<String>, sku: impl Into<String>, semantic: SemanticPosition) -> Self {
        let id = id.into();
        Self {
            source_product_id: id.clone(),
            id,
            sku: sku.into(),
            category: String::new(),
            physical: Dims3D::default(),
            visual: VisualDims::default(),
            assets: AssetRefs::default(),
            shadow_type: None,
            promotional: false,
            semantic,
            facings: None,
            pyramid: None,
            expansion_offset: Vector3::ZERO,
            world_position: Vector3::ZERO,
            depth_ratio: 0.0,
            depth_bucket: DepthBucket::Front,
            render_scale: 1.0,
            scaled_dimensions: Dims3D::default(),
            z_index: 0,
            z_layer: ZLayer::default(),
            shadow: ShadowSpec::default(),
            mask: MaskSpec::default(),
            render_bounds: Bounds::default(),
            baseline_point: Vector2::default(),
            collision_bounds: Bounds::default(),
            validation: ValidationResult::ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_buckets_split_at_thirds() {
        assert_eq!(DepthBucket::for_ratio(0.0), DepthBucket::Front);
        assert_eq!(DepthBucket::for_ratio(0.329), DepthBucket::Front);
        assert_eq!(DepthBucket::for_ratio(0.33), DepthBucket::Middle);
        assert_eq!(DepthBucket::for_ratio(0.66), DepthBucket::Middle);
        assert_eq!(DepthBucket::for_ratio(0.67), DepthBucket::Back);
    }
}
