//! Planogram configuration: the retail truth an editor produces and the engine projects.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PlanoError;
use crate::geometry::{Dims3D, Vector2, Vector3};

pub const SHELF_SURFACE: &str = "shelf-surface";
pub const PEGBOARD_GRID: &str = "pegboard-grid";
pub const FREEFORM_3D: &str = "freeform-3d";
pub const BASKET_BIN: &str = "basket-bin";

/// Standard pegboard pitch (1 inch).
pub const DEFAULT_GRID_SPACING_MM: f64 = 25.4;

/// Retail-domain coordinate, tagged by placement model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum SemanticPosition {
    #[serde(rename = "shelf-surface")]
    ShelfSurface(ShelfSurfacePosition),
    #[serde(rename = "pegboard-grid")]
    PegboardGrid(PegboardGridPosition),
    #[serde(rename = "freeform-3d")]
    Freeform3d(FreeformPosition),
    #[serde(rename = "basket-bin")]
    BasketBin(BasketBinPosition),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfSurfacePosition {
    pub x: f64,
    pub shelf_index: u32,
    /// Front-to-back row, 0 (front) ..= 3 (back).
    #[serde(default)]
    pub depth: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_offset: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PegboardGridPosition {
    pub hole_x: i32,
    pub hole_y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_spacing: Option<f64>,
}

impl PegboardGridPosition {
    pub fn spacing(&self) -> f64 { self.grid_spacing.unwrap_or(DEFAULT_GRID_SPACING_MM) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeformPosition {
    pub position: Vector3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vector3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketBinPosition {
    pub container_id: String,
    pub slot_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Vector2>,
}

impl SemanticPosition {
    pub fn shelf(x: f64, shelf_index: u32, depth: u8) -> Self {
        SemanticPosition::ShelfSurface(ShelfSurfacePosition { x, shelf_index, depth, y_offset: None })
    }

    pub fn model_id(&self) -> &'static str {
        match self {
            SemanticPosition::ShelfSurface(_) => SHELF_SURFACE,
            SemanticPosition::PegboardGrid(_) => PEGBOARD_GRID,
            SemanticPosition::Freeform3d(_) => FREEFORM_3D,
            SemanticPosition::BasketBin(_) => BASKET_BIN,
        }
    }

    pub fn shelf_index(&self) -> Option<u32> {
        match self {
            SemanticPosition::ShelfSurface(p) => Some(p.shelf_index),
            _ => None,
        }
    }

    /// Depth row for shelf placements; every other model sits on the front plane.
    pub fn depth_row(&self) -> u8 {
        match self {
            SemanticPosition::ShelfSurface(p) => p.depth,
            _ => 0,
        }
    }

    /// Absolute z when the position carries one (freeform only).
    pub fn absolute_z(&self) -> Option<f64> {
        match self {
            SemanticPosition::Freeform3d(p) => Some(p.position.z),
            _ => None,
        }
    }
}

/// Horizontal × vertical repetition grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacingConfig {
    pub horizontal: u32,
    pub vertical: u32,
}

impl Default for FacingConfig {
    fn default() -> Self { Self { horizontal: 1, vertical: 1 } }
}

impl FacingConfig {
    pub const fn new(horizontal: u32, vertical: u32) -> Self { Self { horizontal, vertical } }

    pub fn clamped(&self) -> Self { Self { horizontal: self.horizontal.max(1), vertical: self.vertical.max(1) } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PyramidAlignment {
    #[default]
    Center,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFacings {
    pub h: u32,
    pub v: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PyramidConfig {
    pub layers: u32,
    pub base_facings: BaseFacings,
    #[serde(default)]
    pub horizontal_decrement: u32,
    #[serde(default)]
    pub vertical_increment: u32,
    #[serde(default)]
    pub alignment: PyramidAlignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_shift: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_gap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_shelves: Option<Vec<u32>>,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: SemanticPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facings: Option<FacingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pyramid: Option<PyramidConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<PlacementConstraints>,
}

impl Placement {
    pub fn at(position: SemanticPosition) -> Self {
        Self { position, facings: None, pyramid: None, constraints: None }
    }

    /// Horizontal repetitions occupying the front row: pyramid base, else facings, else one.
    pub fn front_count(&self) -> u32 {
        if let Some(p) = &self.pyramid { return p.base_facings.h.max(1); }
        self.facings.map(|f| f.clamped().horizontal).unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotional_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProduct {
    pub id: String,
    pub sku: String,
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<BTreeMap<String, serde_json::Value>>,
}

impl SourceProduct {
    pub fn new(id: impl Into<String>, sku: impl Into<String>, position: SemanticPosition) -> Self {
        Self { id: id.into(), sku: sku.into(), placement: Placement::at(position), pricing: None, performance: None }
    }

    pub fn with_facings(mut self, facings: FacingConfig) -> Self {
        self.placement.facings = Some(facings);
        self
    }

    pub fn with_pyramid(mut self, pyramid: PyramidConfig) -> Self {
        self.placement.pyramid = Some(pyramid);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfConfig {
    pub id: String,
    pub index: u32,
    pub base_height: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureLayout {
    #[serde(default)]
    pub shelves: Vec<ShelfConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_spacing: Option<f64>,
}

/// Closed set of fixture families the engine knows how to light and validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureKind {
    Shelf,
    Gondola,
    Endcap,
    Pegboard,
    Refrigerated,
    Basket,
}

impl FixtureKind {
    /// Floor-standing fixtures put their lowest shelf on the floor itself.
    pub fn is_floor_standing(&self) -> bool {
        matches!(self, FixtureKind::Gondola | FixtureKind::Endcap | FixtureKind::Basket)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FixtureKind::Shelf => "shelf",
            FixtureKind::Gondola => "gondola",
            FixtureKind::Endcap => "endcap",
            FixtureKind::Pegboard => "pegboard",
            FixtureKind::Refrigerated => "refrigerated",
            FixtureKind::Basket => "basket",
        }
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FixtureKind {
    type Err = PlanoError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shelf" => Ok(FixtureKind::Shelf),
            "gondola" => Ok(FixtureKind::Gondola),
            "endcap" => Ok(FixtureKind::Endcap),
            "pegboard" => Ok(FixtureKind::Pegboard),
            "refrigerated" | "cooler" => Ok(FixtureKind::Refrigerated),
            "basket" | "bin" => Ok(FixtureKind::Basket),
            _ => Err(PlanoError::FixtureNotFound(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureConfig {
    #[serde(rename = "type")]
    pub fixture_type: String,
    pub placement_model: String,
    pub dimensions: Dims3D,
    #[serde(default)]
    pub config: FixtureLayout,
}

impl FixtureConfig {
    pub fn kind(&self) -> Result<FixtureKind, PlanoError> { self.fixture_type.parse() }

    pub fn shelf(&self, index: u32) -> Option<&ShelfConfig> {
        self.config.shelves.iter().find(|s| s.index == index)
    }

    /// Shelf indices in ascending order.
    pub fn shelf_indices(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.config.shelves.iter().map(|s| s.index).collect();
        v.sort_unstable();
        v.dedup();
        v
    }
}

/// Root aggregate. Shared sub-structures live behind `Arc` so derived snapshots
/// reuse whatever an action did not touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanogramConfig {
    pub fixture: Arc<FixtureConfig>,
    #[serde(default)]
    pub products: Vec<Arc<SourceProduct>>,
}

impl PlanogramConfig {
    pub fn new(fixture: FixtureConfig) -> Self { Self { fixture: Arc::new(fixture), products: Vec::new() } }

    pub fn with_product(mut self, p: SourceProduct) -> Self {
        self.products.push(Arc::new(p));
        self
    }

    pub fn product(&self, id: &str) -> Option<&Arc<SourceProduct>> { self.products.iter().find(|p| p.id == id) }

    /// Distinct skus in first-seen order.
    pub fn skus(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.products.iter().filter(|p| seen.insert(p.sku.as_str())).map(|p| p.sku.clone()).collect()
    }
}
