//! Pipeline tunables. Defaults follow the retail rendering rules; every knob can be
//! overridden through a `PLANO_*` environment variable.

use plano_core::{FixtureKind, PlacementModelRegistry, ShadowProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowProfiles {
    pub shelf: ShadowProfile,
    pub pegboard: ShadowProfile,
    pub refrigerated: ShadowProfile,
}

impl Default for ShadowProfiles {
    fn default() -> Self {
        Self {
            shelf: profile(8.0, 0.0, 4.0, "rgba(0,0,0,0.25)"),
            pegboard: profile(4.0, 2.0, 2.0, "rgba(0,0,0,0.35)"),
            refrigerated: profile(12.0, 0.0, 6.0, "rgba(0,0,0,0.18)"),
        }
    }
}

impl ShadowProfiles {
    pub fn for_kind(&self, kind: FixtureKind) -> &ShadowProfile {
        match kind {
            FixtureKind::Pegboard => &self.pegboard,
            FixtureKind::Refrigerated => &self.refrigerated,
            FixtureKind::Shelf | FixtureKind::Gondola | FixtureKind::Endcap | FixtureKind::Basket => &self.shelf,
        }
    }
}

fn profile(blur: f64, offset_x: f64, offset_y: f64, color: &str) -> ShadowProfile {
    ShadowProfile { blur, offset_x, offset_y, color: color.to_string() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Render scale of an item at the very back of the fixture (front is always 1.0).
    pub back_row_scale: f64,
    /// Fallback spacing between shelf depth rows when a fixture does not set one.
    pub depth_spacing_mm: f64,
    pub max_horizontal_facings: u32,
    pub max_vertical_facings: u32,
    /// Products that would expand past this many instances are skipped whole.
    pub max_instances_per_product: u64,
    pub min_render_scale: f64,
    pub max_render_scale: f64,
    pub shelf_z_stride: i64,
    pub depth_z_range: i64,
    pub promo_z_boost: i64,
    /// Categories that always get an alpha mask.
    pub mask_allow: Vec<String>,
    /// Categories that never do; wins over the allow list and transparency.
    pub mask_deny: Vec<String>,
    pub shadows: ShadowProfiles,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            back_row_scale: 0.92,
            depth_spacing_mm: plano_core::placement::DEFAULT_DEPTH_SPACING_MM,
            max_horizontal_facings: 10,
            max_vertical_facings: 5,
            max_instances_per_product: 200,
            min_render_scale: 0.1,
            max_render_scale: 5.0,
            shelf_z_stride: 1000,
            depth_z_range: 500,
            promo_z_boost: 5,
            mask_allow: strings(&["beverages", "produce", "bottles", "cosmetics", "personal-care"]),
            mask_deny: strings(&["boxed", "cereal", "bulk"]),
            shadows: ShadowProfiles::default(),
        }
    }
}

fn strings(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|s| {
        s.split(',').map(|t| t.trim().to_ascii_lowercase()).filter(|t| !t.is_empty()).collect()
    })
}

impl PipelineConfig {
    /// Defaults overlaid with any `PLANO_*` overrides present in the environment.
    pub fn from_env() -> Self {
        let mut c = Self::default();
        if let Some(v) = env_parse::<f64>("PLANO_BACK_ROW_SCALE") { c.back_row_scale = v; }
        if let Some(v) = env_parse::<f64>("PLANO_DEPTH_SPACING_MM").filter(|v| *v > 0.0) { c.depth_spacing_mm = v; }
        if let Some(v) = env_parse::<u32>("PLANO_MAX_H_FACINGS") { c.max_horizontal_facings = v; }
        if let Some(v) = env_parse::<u32>("PLANO_MAX_V_FACINGS") { c.max_vertical_facings = v; }
        if let Some(v) = env_parse::<u64>("PLANO_MAX_INSTANCES").filter(|v| *v > 0) { c.max_instances_per_product = v; }
        if let Some(v) = env_list("PLANO_MASK_ALLOW") { c.mask_allow = v; }
        if let Some(v) = env_list("PLANO_MASK_DENY") { c.mask_deny = v; }
        c
    }
    /// Built-in placement models using this config's fallback depth spacing.
    pub fn registry(&self) -> PlacementModelRegistry { PlacementModelRegistry::with_depth_spacing(self.depth_spacing_mm) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plano_core::model::{FixtureLayout, SHELF_SURFACE};
    use plano_core::{Dims3D, FixtureConfig, SemanticPosition, Vector2};

    #[test]
    fn registry_carries_fallback_depth_spacing() {
        let cfg = PipelineConfig { depth_spacing_mm: 120.0, ..PipelineConfig::default() };
        let reg = cfg.registry();
        let fixture = FixtureConfig {
            fixture_type: "shelf".into(),
            placement_model: SHELF_SURFACE.into(),
            dimensions: Dims3D::new(1000.0, 1000.0, 500.0),
            config: FixtureLayout::default(),
        };
        let model = reg.resolve(SHELF_SURFACE).unwrap();
        let w = model
            .transform(&SemanticPosition::shelf(0.0, 0, 2), &fixture, &Dims3D::new(10.0, 10.0, 10.0), Vector2::new(0.5, 1.0), None)
            .unwrap();
        assert_eq!(w.z, 240.0);
    }

    #[test]
    fn deny_list_and_shadow_profiles() {
        let c = PipelineConfig::default();
        assert!(c.mask_deny.iter().any(|d| d == "cereal"));
        assert_eq!(c.shadows.for_kind(FixtureKind::Refrigerated).blur, 12.0);
        assert_eq!(c.shadows.for_kind(FixtureKind::Endcap), &c.shadows.shelf);
    }
}
