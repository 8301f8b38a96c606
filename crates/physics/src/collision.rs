//! Shelf-space collision detection.
//!
//! Products are bucketed by (shelf index, depth row); within a bucket, horizontal
//! spans are compared pairwise with the shared 0.5 mm tolerance.

use std::collections::BTreeMap;

use plano_core::model::Placement;
use plano_core::{FacingConfig, MetadataMap, PlanogramConfig, SemanticPosition, SourceProduct, Span};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

/// Cell a collision happened in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionPosition {
    pub shelf_index: u32,
    pub depth: u8,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionEntry {
    pub source_id: String,
    pub target_id: String,
    pub overlap_mm: f64,
    pub position: CollisionPosition,
}

/// Source id reported for a hypothetical placement with no product id yet.
pub const CANDIDATE_ID: &str = "candidate";

/// Product id → every collision it takes part in. Ordered for stable output.
pub type CollisionMap = BTreeMap<String, Vec<CollisionEntry>>;

/// A product's footprint on one shelf cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Occupant {
    pub id: String,
    pub shelf: u32,
    pub depth: u8,
    pub span: Span,
}

/// Width of a front row: physical width times the horizontal count.
pub(crate) fn occupant(id: &str, sku: &str, placement: &Placement, metadata: &MetadataMap) -> Option<Occupant> {
    let SemanticPosition::ShelfSurface(p) = &placement.position else { return None };
    let meta = metadata.get(sku)?;
    let width = meta.physical().width * f64::from(placement.front_count());
    Some(Occupant { id: id.to_string(), shelf: p.shelf_index, depth: p.depth, span: Span::new(p.x, p.x + width) })
}

fn product_occupant(p: &SourceProduct, metadata: &MetadataMap) -> Option<Occupant> {
    occupant(&p.id, &p.sku, &p.placement, metadata)
}

pub struct CollisionEngine<'a> {
    config: &'a PlanogramConfig,
    metadata: &'a MetadataMap,
}

impl<'a> CollisionEngine<'a> {
    pub fn new(config: &'a PlanogramConfig, metadata: &'a MetadataMap) -> Self { Self { config, metadata } }

    fn buckets(&self) -> FxHashMap<(u32, u8), SmallVec<[Occupant; 8]>> {
        let mut buckets: FxHashMap<(u32, u8), SmallVec<[Occupant; 8]>> = FxHashMap::default();
        for p in self.config.products.iter() {
            match product_occupant(p, self.metadata) {
                Some(o) => buckets.entry((o.shelf, o.depth)).or_default().push(o),
                None => debug!(product_id = %p.id, sku = %p.sku, "skipped in collision pass"),
            }
        }
        buckets
    }

    /// Every colliding pair, recorded under both products.
    pub fn get_collisions(&self) -> CollisionMap {
        let mut map = CollisionMap::new();
        let mut pairs = 0u64;
        for ((shelf, depth), occupants) in self.buckets() {
            for (i, a) in occupants.iter().enumerate() {
                for b in occupants.iter().skip(i + 1) {
                    if !a.span.collides(&b.span) {
                        continue;
                    }
                    pairs += 1;
                    let overlap = a.span.overlap(&b.span);
                    let x = a.span.start.max(b.span.start);
                    let position = CollisionPosition { shelf_index: shelf, depth, x };
                    map.entry(a.id.clone()).or_default().push(CollisionEntry {
                        source_id: a.id.clone(),
                        target_id: b.id.clone(),
                        overlap_mm: overlap,
                        position,
                    });
                    map.entry(b.id.clone()).or_default().push(CollisionEntry {
                        source_id: b.id.clone(),
                        target_id: a.id.clone(),
                        overlap_mm: overlap,
                        position,
                    });
                }
            }
        }
        metrics::counter!("collision_pairs_total", pairs);
        map
    }

    /// Test one hypothetical placement against the existing products, ignoring
    /// `exclude_id` (the product being dragged). Unknown skus and non-shelf
    /// positions never collide.
    pub fn check_collision(
        &self,
        position: &SemanticPosition,
        sku: &str,
        facings: Option<FacingConfig>,
        exclude_id: Option<&str>,
    ) -> Vec<CollisionEntry> {
        let placement = Placement { facings, ..Placement::at(position.clone()) };
        let Some(candidate) = occupant(exclude_id.unwrap_or(CANDIDATE_ID), sku, &placement, self.metadata) else {
            return Vec::new();
        };
        self.collisions_for(&candidate, exclude_id)
    }

    pub(crate) fn collisions_for(&self, candidate: &Occupant, exclude_id: Option<&str>) -> Vec<CollisionEntry> {
        self.config
            .products
            .iter()
            .filter(|p| Some(p.id.as_str()) != exclude_id)
            .filter_map(|p| product_occupant(p, self.metadata))
            .filter(|o| o.shelf == candidate.shelf && o.depth == candidate.depth && o.span.collides(&candidate.span))
            .map(|o| CollisionEntry {
                source_id: candidate.id.clone(),
                target_id: o.id.clone(),
                overlap_mm: candidate.span.overlap(&o.span),
                position: CollisionPosition {
                    shelf_index: o.shelf,
                    depth: o.depth,
                    x: candidate.span.start.max(o.span.start),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupant_spans_front_row_only() {
        let meta: plano_core::ProductMetadata = serde_json::from_value(serde_json::json!({
            "sku": "S", "name": "s",
            "classification": { "category": "snacks" },
            "dimensions": { "physical": { "width": 50.0, "height": 10.0, "depth": 10.0 } }
        }))
        .unwrap();
        let mut md = MetadataMap::default();
        md.insert("S".into(), std::sync::Arc::new(meta));

        let placement = Placement { facings: Some(FacingConfig::new(3, 4)), ..Placement::at(SemanticPosition::shelf(10.0, 2, 1)) };
        let o = occupant("p", "S", &placement, &md).unwrap();
        assert_eq!((o.shelf, o.depth), (2, 1));
        assert_eq!(o.span, Span::new(10.0, 160.0));

        assert!(occupant("p", "UNKNOWN", &placement, &md).is_none());
    }
}
