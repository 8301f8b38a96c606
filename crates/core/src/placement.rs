//! Placement models: strategies that turn a semantic position into fixture-space
//! millimetres and back.
//!
//! This module provides:
//! - The `PlacementModel` trait (transform + approximate inverse)
//! - Four built-in models keyed by stable string ids
//! - A registry mapping ids to models, built explicitly and injected by callers

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::{PlanoError, PlanoResult};
use crate::geometry::{Dims3D, Vector2, Vector3};
use crate::model::{
    BasketBinPosition, FixtureConfig, FreeformPosition, PegboardGridPosition, SemanticPosition, ShelfSurfacePosition,
    BASKET_BIN, DEFAULT_GRID_SPACING_MM, FREEFORM_3D, PEGBOARD_GRID, SHELF_SURFACE,
};

pub const DEFAULT_DEPTH_SPACING_MM: f64 = 300.0;
pub const BASKET_SLOT_WIDTH_MM: f64 = 100.0;
/// Deepest shelf row a position can name.
pub const MAX_DEPTH_ROW: u8 = 3;

/// Coordinate strategy for one family of semantic positions.
pub trait PlacementModel: Send + Sync {
    fn id(&self) -> &str;

    /// World position (bottom-left-front corner, mm) of a product placed at `pos`.
    /// `expansion_offset` shifts one facing/pyramid copy relative to the product origin.
    /// `anchor` is the sprite anchor; built-in models place by origin and ignore it.
    fn transform(
        &self,
        pos: &SemanticPosition,
        fixture: &FixtureConfig,
        dims: &Dims3D,
        anchor: Vector2,
        expansion_offset: Option<Vector3>,
    ) -> PlanoResult<Vector3>;

    /// Approximate inverse of `transform` for an unexpanded product.
    fn project(&self, world: Vector3, fixture: &FixtureConfig) -> SemanticPosition;
}

fn mismatch(expected: &str, pos: &SemanticPosition) -> PlanoError {
    PlanoError::PositionMismatch { expected: expected.to_string(), found: pos.model_id().to_string() }
}

// ---------------- shelf-surface ----------------

#[derive(Debug, Clone)]
pub struct ShelfSurfaceModel {
    default_depth_spacing: f64,
}

impl Default for ShelfSurfaceModel {
    fn default() -> Self { Self { default_depth_spacing: DEFAULT_DEPTH_SPACING_MM } }
}

impl ShelfSurfaceModel {
    pub fn with_depth_spacing(default_depth_spacing: f64) -> Self { Self { default_depth_spacing } }

    fn depth_spacing(&self, fixture: &FixtureConfig) -> f64 {
        fixture.config.depth_spacing.filter(|d| *d > 0.0).unwrap_or(self.default_depth_spacing)
    }
}

impl PlacementModel for ShelfSurfaceModel {
    fn id(&self) -> &str { SHELF_SURFACE }

    fn transform(
        &self,
        pos: &SemanticPosition,
        fixture: &FixtureConfig,
        _dims: &Dims3D,
        _anchor: Vector2,
        expansion_offset: Option<Vector3>,
    ) -> PlanoResult<Vector3> {
        let SemanticPosition::ShelfSurface(p) = pos else { return Err(mismatch(SHELF_SURFACE, pos)) };
        let off = expansion_offset.unwrap_or(Vector3::ZERO);
        let base = match fixture.shelf(p.shelf_index) {
            Some(s) => s.base_height,
            None => {
                warn!(shelf_index = p.shelf_index, "shelf index not on fixture; placing at y=0");
                0.0
            }
        };
        Ok(Vector3::new(
            p.x + off.x,
            base + p.y_offset.unwrap_or(0.0) + off.y,
            f64::from(p.depth) * self.depth_spacing(fixture) + off.z,
        ))
    }

    fn project(&self, world: Vector3, fixture: &FixtureConfig) -> SemanticPosition {
        let mut best: Option<(u32, f64)> = None;
        for idx in fixture.shelf_indices() {
            let Some(shelf) = fixture.shelf(idx) else { continue };
            let d = (world.y - shelf.base_height).abs();
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((idx, d));
            }
        }
        let (shelf_index, base) = match best.and_then(|(i, _)| fixture.shelf(i).map(|s| (i, s.base_height))) {
            Some(v) => v,
            None => (0, 0.0),
        };
        let rows = (world.z / self.depth_spacing(fixture)).round().clamp(0.0, f64::from(MAX_DEPTH_ROW));
        let y_offset = world.y - base;
        SemanticPosition::ShelfSurface(ShelfSurfacePosition {
            x: world.x,
            shelf_index,
            depth: rows as u8,
            y_offset: if y_offset.abs() < 1e-9 { None } else { Some(y_offset) },
        })
    }
}

// ---------------- pegboard-grid ----------------

#[derive(Debug, Clone)]
pub struct PegboardGridModel {
    spacing: f64,
}

impl Default for PegboardGridModel {
    fn default() -> Self { Self { spacing: DEFAULT_GRID_SPACING_MM } }
}

impl PegboardGridModel {
    /// Model for boards drilled at a non-standard pitch.
    pub fn with_spacing(spacing: f64) -> Self { Self { spacing } }
}

impl PlacementModel for PegboardGridModel {
    fn id(&self) -> &str { PEGBOARD_GRID }

    fn transform(
        &self,
        pos: &SemanticPosition,
        _fixture: &FixtureConfig,
        _dims: &Dims3D,
        _anchor: Vector2,
        expansion_offset: Option<Vector3>,
    ) -> PlanoResult<Vector3> {
        let SemanticPosition::PegboardGrid(p) = pos else { return Err(mismatch(PEGBOARD_GRID, pos)) };
        let off = expansion_offset.unwrap_or(Vector3::ZERO);
        let s = p.spacing();
        Ok(Vector3::new(f64::from(p.hole_x) * s + off.x, f64::from(p.hole_y) * s + off.y, off.z))
    }

    /// Snaps to the nearest hole at this model's spacing; sub-hole detail is lost.
    /// Positions authored with their own `gridSpacing` only round-trip through a
    /// model registered with that same spacing.
    fn project(&self, world: Vector3, _fixture: &FixtureConfig) -> SemanticPosition {
        SemanticPosition::PegboardGrid(PegboardGridPosition {
            hole_x: (world.x / self.spacing).round() as i32,
            hole_y: (world.y / self.spacing).round() as i32,
            grid_spacing: (self.spacing != DEFAULT_GRID_SPACING_MM).then_some(self.spacing),
        })
    }
}

// ---------------- freeform-3d ----------------

#[derive(Debug, Clone, Default)]
pub struct FreeformModel;

impl PlacementModel for FreeformModel {
    fn id(&self) -> &str { FREEFORM_3D }

    fn transform(
        &self,
        pos: &SemanticPosition,
        _fixture: &FixtureConfig,
        _dims: &Dims3D,
        _anchor: Vector2,
        expansion_offset: Option<Vector3>,
    ) -> PlanoResult<Vector3> {
        let SemanticPosition::Freeform3d(p) = pos else { return Err(mismatch(FREEFORM_3D, pos)) };
        Ok(p.position + expansion_offset.unwrap_or(Vector3::ZERO))
    }

    fn project(&self, world: Vector3, _fixture: &FixtureConfig) -> SemanticPosition {
        SemanticPosition::Freeform3d(FreeformPosition { position: world, rotation: None })
    }
}

// ---------------- basket-bin ----------------

#[derive(Debug, Clone, Default)]
pub struct BasketBinModel;

impl PlacementModel for BasketBinModel {
    fn id(&self) -> &str { BASKET_BIN }

    fn transform(
        &self,
        pos: &SemanticPosition,
        _fixture: &FixtureConfig,
        _dims: &Dims3D,
        _anchor: Vector2,
        expansion_offset: Option<Vector3>,
    ) -> PlanoResult<Vector3> {
        let SemanticPosition::BasketBin(p) = pos else { return Err(mismatch(BASKET_BIN, pos)) };
        let off = expansion_offset.unwrap_or(Vector3::ZERO);
        let local = p.offset.unwrap_or_default();
        Ok(Vector3::new(f64::from(p.slot_index) * BASKET_SLOT_WIDTH_MM + local.x + off.x, local.y + off.y, off.z))
    }

    /// Floors to the containing slot; the container id and in-slot offset are not recoverable.
    fn project(&self, world: Vector3, _fixture: &FixtureConfig) -> SemanticPosition {
        SemanticPosition::BasketBin(BasketBinPosition {
            container_id: String::new(),
            slot_index: (world.x / BASKET_SLOT_WIDTH_MM).floor().max(0.0) as u32,
            offset: None,
        })
    }
}

// ---------------- registry ----------------

/// Strategy table from model id to placement model.
#[derive(Clone, Default)]
pub struct PlacementModelRegistry {
    models: FxHashMap<String, Arc<dyn PlacementModel>>,
}

impl std::fmt::Debug for PlacementModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementModelRegistry").field("ids", &self.ids()).finish()
    }
}

impl PlacementModelRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registry holding the four built-in models.
    pub fn with_builtins() -> Self { Self::with_depth_spacing(DEFAULT_DEPTH_SPACING_MM) }

    /// Built-ins, with the shelf model's fallback depth spacing overridden.
    pub fn with_depth_spacing(depth_spacing: f64) -> Self {
        let mut r = Self::new();
        let builtins: [Arc<dyn PlacementModel>; 4] = [
            Arc::new(ShelfSurfaceModel::with_depth_spacing(depth_spacing)),
            Arc::new(PegboardGridModel::default()),
            Arc::new(FreeformModel),
            Arc::new(BasketBinModel),
        ];
        for m in builtins {
            r.models.insert(m.id().to_string(), m);
        }
        r
    }

    /// Add or replace a model. Models without an id are rejected.
    pub fn register(&mut self, model: Arc<dyn PlacementModel>) -> PlanoResult<()> {
        let id = model.id().trim();
        if id.is_empty() {
            return Err(PlanoError::InvalidModel("placement model has no id".to_string()));
        }
        self.models.insert(id.to_string(), model);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn PlacementModel>> { self.models.get(id).cloned() }

    pub fn resolve(&self, id: &str) -> PlanoResult<Arc<dyn PlacementModel>> {
        self.get(id).ok_or_else(|| PlanoError::PlacementModelNotFound(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut v: Vec<String> = self.models.keys().cloned().collect();
        v.sort();
        v
    }

    pub fn len(&self) -> usize { self.models.len() }
    pub fn is_empty(&self) -> bool { self.models.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixtureLayout, ShelfConfig};

    fn fixture(model: &str) -> FixtureConfig {
        FixtureConfig {
            fixture_type: "shelf".into(),
            placement_model: model.into(),
            dimensions: Dims3D::new(1200.0, 1800.0, 900.0),
            config: FixtureLayout {
                shelves: vec![
                    ShelfConfig { id: "s0".into(), index: 0, base_height: 100.0 },
                    ShelfConfig { id: "s1".into(), index: 1, base_height: 500.0 },
                    ShelfConfig { id: "s2".into(), index: 2, base_height: 900.0 },
                ],
                depth_spacing: None,
            },
        }
    }

    fn round_trip(reg: &PlacementModelRegistry, fx: &FixtureConfig, p: &SemanticPosition) -> SemanticPosition {
        let m = reg.resolve(p.model_id()).unwrap();
        let w = m.transform(p, fx, &Dims3D::new(80.0, 120.0, 60.0), Vector2::new(0.5, 1.0), None).unwrap();
        m.project(w, fx)
    }

    #[test]
    fn shelf_surface_transform_uses_shelf_height_and_depth_spacing() {
        let reg = PlacementModelRegistry::with_builtins();
        let fx = fixture(SHELF_SURFACE);
        let m = reg.resolve(SHELF_SURFACE).unwrap();
        let p = SemanticPosition::ShelfSurface(ShelfSurfacePosition { x: 210.0, shelf_index: 1, depth: 2, y_offset: Some(5.0) });
        let w = m.transform(&p, &fx, &Dims3D::default(), Vector2::default(), Some(Vector3::new(80.0, 0.0, 0.0))).unwrap();
        assert_eq!(w, Vector3::new(290.0, 505.0, 600.0));
    }

    #[test]
    fn unknown_shelf_falls_back_to_floor() {
        let reg = PlacementModelRegistry::with_builtins();
        let fx = fixture(SHELF_SURFACE);
        let w = reg
            .resolve(SHELF_SURFACE)
            .unwrap()
            .transform(&SemanticPosition::shelf(10.0, 7, 0), &fx, &Dims3D::default(), Vector2::default(), None)
            .unwrap();
        assert_eq!(w.y, 0.0);
    }

    #[test]
    fn shelf_and_freeform_round_trip_exactly() {
        let reg = PlacementModelRegistry::with_builtins();
        let fx = fixture(SHELF_SURFACE);
        for p in [
            SemanticPosition::shelf(210.0, 1, 0),
            SemanticPosition::shelf(0.0, 2, 3),
            SemanticPosition::ShelfSurface(ShelfSurfacePosition { x: 33.5, shelf_index: 0, depth: 1, y_offset: Some(12.0) }),
            SemanticPosition::Freeform3d(FreeformPosition { position: Vector3::new(12.5, 340.0, 77.0), rotation: None }),
        ] {
            assert_eq!(round_trip(&reg, &fx, &p), p);
        }
    }

    #[test]
    fn pegboard_and_basket_round_trips_quantize() {
        let reg = PlacementModelRegistry::with_builtins();
        let fx = fixture(PEGBOARD_GRID);
        let peg = SemanticPosition::PegboardGrid(PegboardGridPosition { hole_x: 4, hole_y: 9, grid_spacing: None });
        assert_eq!(round_trip(&reg, &fx, &peg), peg);

        // off-grid world point snaps to the nearest hole
        let m = reg.resolve(PEGBOARD_GRID).unwrap();
        match m.project(Vector3::new(40.0, 60.0, 0.0), &fx) {
            SemanticPosition::PegboardGrid(g) => assert_eq!((g.hole_x, g.hole_y), (2, 2)),
            other => panic!("unexpected {:?}", other),
        }

        // custom pitch: only a model drilled at that pitch round-trips it
        let wide = SemanticPosition::PegboardGrid(PegboardGridPosition { hole_x: 2, hole_y: 4, grid_spacing: Some(38.1) });
        let w = m.transform(&wide, &fx, &Dims3D::new(10.0, 10.0, 10.0), Vector2::new(0.5, 0.0), None).unwrap();
        assert_eq!(PegboardGridModel::with_spacing(38.1).project(w, &fx), wide);
        match m.project(w, &fx) {
            SemanticPosition::PegboardGrid(g) => assert_eq!((g.hole_x, g.hole_y, g.grid_spacing), (3, 6, None)),
            other => panic!("unexpected {:?}", other),
        }

        let bin = SemanticPosition::BasketBin(BasketBinPosition {
            container_id: "bin-a".into(),
            slot_index: 3,
            offset: Some(Vector2::new(45.0, 10.0)),
        });
        match round_trip(&reg, &fx, &bin) {
            SemanticPosition::BasketBin(b) => {
                assert_eq!(b.slot_index, 3);
                assert_eq!(b.offset, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transform_rejects_foreign_positions() {
        let reg = PlacementModelRegistry::with_builtins();
        let fx = fixture(PEGBOARD_GRID);
        let err = reg
            .resolve(PEGBOARD_GRID)
            .unwrap()
            .transform(&SemanticPosition::shelf(0.0, 0, 0), &fx, &Dims3D::default(), Vector2::default(), None)
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::PositionMismatch);
    }

    struct Nameless;
    impl PlacementModel for Nameless {
        fn id(&self) -> &str { "" }
        fn transform(&self, _: &SemanticPosition, _: &FixtureConfig, _: &Dims3D, _: Vector2, _: Option<Vector3>) -> PlanoResult<Vector3> {
            Ok(Vector3::ZERO)
        }
        fn project(&self, world: Vector3, _: &FixtureConfig) -> SemanticPosition {
            SemanticPosition::Freeform3d(FreeformPosition { position: world, rotation: None })
        }
    }

    #[test]
    fn registry_lookup_and_registration() {
        let mut reg = PlacementModelRegistry::with_builtins();
        assert_eq!(reg.ids(), vec![BASKET_BIN, FREEFORM_3D, PEGBOARD_GRID, SHELF_SURFACE]);
        assert!(reg.get("hex-grid").is_none());
        assert!(matches!(reg.resolve("hex-grid"), Err(PlanoError::PlacementModelNotFound(_))));
        assert_eq!(reg.register(Arc::new(Nameless)).unwrap_err().code(), crate::error::ErrorCode::InvalidPlacementModel);
        assert_eq!(reg.len(), 4);
        assert!(PlacementModelRegistry::new().is_empty());
    }
}
