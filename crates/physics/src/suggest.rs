//! First-fit free-slot search across shelves and depth rows.

use plano_core::model::{Placement, SHELF_SURFACE};
use plano_core::{FacingConfig, MetadataMap, PlanogramAction, PlanogramConfig, SemanticPosition, COLLISION_TOLERANCE_MM};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collision::{occupant, Occupant};

/// Front-to-back search order.
pub const DEPTH_ORDER: [u8; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_shelf: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_shelves: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facings: Option<FacingConfig>,
    /// In-flight edits that are not committed yet.
    #[serde(default)]
    pub pending: Vec<PlanogramAction>,
}

impl SuggestionRequest {
    pub fn new(sku: impl Into<String>) -> Self { Self { sku: sku.into(), ..Self::default() } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSuggestion {
    pub position: SemanticPosition,
}

pub struct PlacementSuggester<'a> {
    config: &'a PlanogramConfig,
    metadata: &'a MetadataMap,
}

impl<'a> PlacementSuggester<'a> {
    pub fn new(config: &'a PlanogramConfig, metadata: &'a MetadataMap) -> Self { Self { config, metadata } }

    /// Shelves to try, in order. An allowed list is taken as given (minus
    /// shelves the fixture lacks); otherwise the preferred shelf goes first.
    pub fn shelf_order(&self, req: &SuggestionRequest) -> Vec<u32> {
        let existing = self.config.fixture.shelf_indices();
        match &req.allowed_shelves {
            Some(allowed) => {
                let mut out: Vec<u32> = Vec::with_capacity(allowed.len());
                for s in allowed.iter().filter(|s| existing.contains(s)) {
                    if !out.contains(s) {
                        out.push(*s);
                    }
                }
                out
            }
            None => {
                let mut out = Vec::with_capacity(existing.len());
                if let Some(p) = req.preferred_shelf.filter(|p| existing.contains(p)) {
                    out.push(p);
                }
                out.extend(existing.into_iter().filter(|s| Some(*s) != req.preferred_shelf));
                out
            }
        }
    }

    pub fn suggest(&self, req: &SuggestionRequest) -> Option<PlacementSuggestion> {
        if self.config.fixture.placement_model != SHELF_SURFACE {
            debug!(model = %self.config.fixture.placement_model, "suggestions only cover shelf-surface fixtures");
            return None;
        }
        let meta = self.metadata.get(&req.sku)?;
        let count = req.facings.map(|f| f.clamped().horizontal).unwrap_or(1);
        let width = meta.physical().width * f64::from(count);
        let fixture_width = self.config.fixture.dimensions.width;
        let occupied = self.overlay(&req.pending);

        let mut tried = 0u64;
        for shelf in self.shelf_order(req) {
            for depth in DEPTH_ORDER {
                let spans: Vec<_> = occupied.iter().filter(|o| o.shelf == shelf && o.depth == depth).map(|o| o.span).collect();
                let mut candidates: Vec<f64> = std::iter::once(0.0).chain(spans.iter().map(|s| s.end)).collect();
                candidates.sort_by(f64::total_cmp);
                candidates.dedup();
                for x in candidates {
                    tried += 1;
                    let span = plano_core::Span::new(x, x + width);
                    if span.end > fixture_width + COLLISION_TOLERANCE_MM {
                        continue;
                    }
                    if spans.iter().all(|s| !s.collides(&span)) {
                        metrics::histogram!("suggest_candidates", tried as f64);
                        debug!(sku = %req.sku, shelf, depth, x, tried, "slot found");
                        return Some(PlacementSuggestion { position: SemanticPosition::shelf(x, shelf, depth) });
                    }
                }
            }
        }
        metrics::histogram!("suggest_candidates", tried as f64);
        debug!(sku = %req.sku, tried, "no free slot");
        None
    }

    /// Committed products with pending ADD / MOVE / REMOVE applied on top.
    fn overlay(&self, pending: &[PlanogramAction]) -> Vec<Occupant> {
        let mut items: Vec<(String, String, Placement)> =
            self.config.products.iter().map(|p| (p.id.clone(), p.sku.clone(), p.placement.clone())).collect();
        for action in pending.iter().flat_map(|a| a.flatten()) {
            match action {
                PlanogramAction::ProductAdd { product } => {
                    if !items.iter().any(|(id, _, _)| *id == product.id) {
                        items.push((product.id.clone(), product.sku.clone(), product.placement.clone()));
                    }
                }
                PlanogramAction::ProductMove { product_id, to } => {
                    if let Some(item) = items.iter_mut().find(|(id, _, _)| id == product_id) {
                        item.2.position = to.clone();
                    }
                }
                PlanogramAction::ProductRemove { product_id } => items.retain(|(id, _, _)| id != product_id),
                _ => {}
            }
        }
        items.iter().filter_map(|(id, sku, pl)| occupant(id, sku, pl, self.metadata)).collect()
    }
}
