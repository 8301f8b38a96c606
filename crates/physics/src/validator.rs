//! Action-intent validation: would this edit leave the planogram physically sound?

use plano_core::model::{Placement, PlacementConstraints};
use plano_core::{
    ErrorCode, MetadataMap, PlanogramAction, PlanogramConfig, SemanticPosition, SourceProduct, ValidationResult,
    COLLISION_TOLERANCE_MM,
};
use plano_core::placement::MAX_DEPTH_ROW;
use plano_store::reduce;
use tracing::debug;

use crate::collision::{occupant, CollisionEngine};

pub struct IntentValidator<'a> {
    metadata: &'a MetadataMap,
}

impl<'a> IntentValidator<'a> {
    pub fn new(metadata: &'a MetadataMap) -> Self { Self { metadata } }

    /// Validate `action` against `config`. BATCH sub-actions are checked in order
    /// against a snapshot that only advances through the valid ones.
    pub fn validate_action(&self, config: &PlanogramConfig, action: &PlanogramAction) -> ValidationResult {
        match action {
            PlanogramAction::ProductAdd { product } => {
                let mut v = self.validate_placement(config, &product.id, &product.sku, &product.placement);
                if let Some(c) = &product.placement.constraints {
                    check_allowed_shelf(&mut v, &product.id, c, &product.placement.position);
                }
                v
            }
            PlanogramAction::ProductMove { product_id, to } => {
                let Some(p) = config.product(product_id) else { return not_found(product_id) };
                let mut v = ValidationResult::ok();
                check_locked(&mut v, p, "moved");
                if let Some(c) = &p.placement.constraints {
                    check_allowed_shelf(&mut v, product_id, c, to);
                }
                let placement = Placement { position: to.clone(), ..p.placement.clone() };
                v.merge(self.validate_placement(config, product_id, &p.sku, &placement));
                v
            }
            PlanogramAction::ProductUpdateFacings { product_id, facings } => {
                if config.product(product_id).is_none() {
                    return not_found(product_id);
                }
                // judge the placement the reducer would commit; a pyramid keeps its base
                let next = reduce(config, action);
                let Some(p) = next.product(product_id) else { return not_found(product_id) };
                debug!(%product_id, requested = ?facings, front = p.placement.front_count(), "facings update");
                self.validate_placement(config, product_id, &p.sku, &p.placement)
            }
            PlanogramAction::ProductRemove { product_id } => match config.product(product_id) {
                Some(p) => {
                    let mut v = ValidationResult::ok();
                    check_locked(&mut v, p, "removed");
                    v
                }
                None => not_found(product_id),
            },
            PlanogramAction::Batch { actions } => {
                let mut v = ValidationResult::ok();
                let mut current = config.clone();
                for sub in actions.iter() {
                    let r = self.validate_action(&current, sub);
                    if r.valid {
                        current = reduce(&current, sub);
                    } else {
                        debug!(kind = sub.kind(), "batch sub-action rejected; snapshot not advanced");
                    }
                    v.merge(r);
                }
                v
            }
            _ => ValidationResult::ok(),
        }
    }

    /// Bounds, metadata and collision checks for one prospective placement of
    /// `product_id`. Only shelf-surface positions are checked.
    pub fn validate_placement(
        &self,
        config: &PlanogramConfig,
        product_id: &str,
        sku: &str,
        placement: &Placement,
    ) -> ValidationResult {
        let SemanticPosition::ShelfSurface(pos) = &placement.position else { return ValidationResult::ok() };
        let mut v = ValidationResult::ok();
        let Some(meta) = self.metadata.get(sku) else {
            v.push_error(ErrorCode::MetadataMissing, format!("no catalog metadata for sku {sku}"));
            return v;
        };
        let Some(candidate) = occupant(product_id, sku, placement, self.metadata) else { return v };

        let fixture = &config.fixture;
        let dims = fixture.dimensions;
        let t = COLLISION_TOLERANCE_MM;
        if candidate.span.start < -t || candidate.span.end > dims.width + t {
            v.push_error(
                ErrorCode::OutOfBounds,
                format!("x {:.1}..{:.1} exceeds fixture width {}", candidate.span.start, candidate.span.end, dims.width),
            );
        }
        if pos.depth > MAX_DEPTH_ROW {
            v.push_error(ErrorCode::OutOfBounds, format!("depth row {} beyond back row {}", pos.depth, MAX_DEPTH_ROW));
        }
        match fixture.shelf(pos.shelf_index) {
            None => v.push_error(ErrorCode::ShelfNotFound, format!("shelf {} does not exist on fixture", pos.shelf_index)),
            Some(shelf) => {
                let top = shelf.base_height + pos.y_offset.unwrap_or(0.0) + meta.physical().height;
                if top > dims.height + t {
                    v.push_error(ErrorCode::OutOfBounds, format!("top {:.1} exceeds fixture height {}", top, dims.height));
                }
            }
        }

        let hits = CollisionEngine::new(config, self.metadata).collisions_for(&candidate, Some(product_id));
        if !hits.is_empty() {
            let ids: Vec<&str> = hits.iter().map(|h| h.target_id.as_str()).collect();
            v.push_error(ErrorCode::Collision, format!("{} overlaps {}", product_id, ids.join(", ")));
        }
        v
    }
}

fn not_found(product_id: &str) -> ValidationResult {
    ValidationResult::error(ErrorCode::ProductNotFound, format!("product {product_id} is not on the planogram"))
}

fn check_locked(v: &mut ValidationResult, p: &SourceProduct, verb: &str) {
    if p.placement.constraints.as_ref().is_some_and(|c| c.locked) {
        v.push_warning(ErrorCode::ConstraintViolation, format!("locked product {} is being {}", p.id, verb));
    }
}

fn check_allowed_shelf(v: &mut ValidationResult, id: &str, c: &PlacementConstraints, to: &SemanticPosition) {
    let (Some(allowed), Some(shelf)) = (&c.allowed_shelves, to.shelf_index()) else { return };
    if !allowed.contains(&shelf) {
        v.push_warning(ErrorCode::ConstraintViolation, format!("{id} placed on shelf {shelf}, allowed {allowed:?}"));
    }
}
