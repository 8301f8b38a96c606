//! Plano store: the pure action reducer and an epoch-stamped snapshot builder.
//!
//! `reduce` is the single state transition used both when simulating an action for
//! validation and when committing it. Inputs are never mutated; products an action
//! does not touch keep sharing their `Arc` with the previous snapshot.

#![forbid(unsafe_code)]

use std::sync::Arc;

use plano_core::{FixtureConfig, PlanogramAction, PlanogramConfig, SourceProduct};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, warn};

/// Apply one action, returning the derived configuration.
pub fn reduce(config: &PlanogramConfig, action: &PlanogramAction) -> PlanogramConfig {
    match action {
        PlanogramAction::Batch { actions } => actions.iter().fold(config.clone(), |acc, a| reduce(&acc, a)),
        PlanogramAction::ProductAdd { product } => {
            if config.product(&product.id).is_some() {
                warn!(product_id = %product.id, "add: product id already present; ignoring");
                return config.clone();
            }
            let mut next = config.clone();
            next.products.push(Arc::new(product.clone()));
            next
        }
        PlanogramAction::ProductRemove { product_id } => {
            if config.product(product_id).is_none() {
                debug!(product_id = %product_id, "remove: unknown product");
                return config.clone();
            }
            let mut next = config.clone();
            next.products.retain(|p| p.id != *product_id);
            next
        }
        PlanogramAction::ProductMove { product_id, to } => update_product(config, product_id, |p| {
            p.placement.position = to.clone();
        }),
        PlanogramAction::ProductUpdateFacings { product_id, facings } => update_product(config, product_id, |p| {
            p.placement.facings = Some(facings.clamped());
        }),
        PlanogramAction::FixtureUpdate { changes } => update_fixture(config, |f| {
            if let Some(t) = &changes.fixture_type { f.fixture_type = t.clone(); }
            if let Some(m) = &changes.placement_model { f.placement_model = m.clone(); }
            if let Some(d) = changes.dimensions { f.dimensions = d; }
            if let Some(s) = changes.depth_spacing { f.config.depth_spacing = Some(s); }
        }),
        PlanogramAction::ShelfAdd { shelf } => {
            let fx = &config.fixture;
            if fx.config.shelves.iter().any(|s| s.index == shelf.index || s.id == shelf.id) {
                warn!(shelf_id = %shelf.id, index = shelf.index, "shelf add: id or index already used; ignoring");
                return config.clone();
            }
            update_fixture(config, |f| {
                f.config.shelves.push(shelf.clone());
                f.config.shelves.sort_by_key(|s| s.index);
            })
        }
        PlanogramAction::ShelfRemove { shelf_id } => {
            if !config.fixture.config.shelves.iter().any(|s| s.id == *shelf_id) {
                debug!(shelf_id = %shelf_id, "shelf remove: unknown shelf");
                return config.clone();
            }
            update_fixture(config, |f| f.config.shelves.retain(|s| s.id != *shelf_id))
        }
        PlanogramAction::ShelfUpdate { shelf_id, changes } => {
            let shelves = &config.fixture.config.shelves;
            if !shelves.iter().any(|s| s.id == *shelf_id) {
                debug!(shelf_id = %shelf_id, "shelf update: unknown shelf");
                return config.clone();
            }
            if let Some(idx) = changes.index {
                if shelves.iter().any(|s| s.index == idx && s.id != *shelf_id) {
                    warn!(shelf_id = %shelf_id, index = idx, "shelf update: index already used; ignoring");
                    return config.clone();
                }
            }
            update_fixture(config, |f| {
                if let Some(s) = f.config.shelves.iter_mut().find(|s| s.id == *shelf_id) {
                    if let Some(idx) = changes.index { s.index = idx; }
                    if let Some(h) = changes.base_height { s.base_height = h; }
                }
                f.config.shelves.sort_by_key(|s| s.index);
            })
        }
    }
}

/// Fold an action log over a base configuration.
pub fn reduce_all<'a, I>(base: &PlanogramConfig, actions: I) -> PlanogramConfig
where
    I: IntoIterator<Item = &'a PlanogramAction>,
{
    actions.into_iter().fold(base.clone(), |acc, a| reduce(&acc, a))
}

fn update_product(config: &PlanogramConfig, product_id: &str, f: impl FnOnce(&mut SourceProduct)) -> PlanogramConfig {
    let Some(idx) = config.products.iter().position(|p| p.id == product_id) else {
        debug!(product_id = %product_id, "update: unknown product");
        return config.clone();
    };
    let mut next = config.clone();
    let mut product = (*next.products[idx]).clone();
    f(&mut product);
    next.products[idx] = Arc::new(product);
    next
}

fn update_fixture(config: &PlanogramConfig, f: impl FnOnce(&mut FixtureConfig)) -> PlanogramConfig {
    let mut fixture = (*config.fixture).clone();
    f(&mut fixture);
    PlanogramConfig { fixture: Arc::new(fixture), products: config.products.clone() }
}

/// Frozen configuration tagged with the number of batches applied so far.
#[derive(Debug, Clone, Serialize)]
pub struct PlanogramSnapshot {
    pub epoch: u64,
    pub config: Arc<PlanogramConfig>,
}

/// Builds snapshots from action batches. Cheap to freeze: a snapshot is an `Arc` bump.
pub struct PlanogramBuilder {
    epoch: u64,
    current: Arc<PlanogramConfig>,
    applied: usize,
}

impl PlanogramBuilder {
    pub fn new(base: PlanogramConfig) -> Self { Self { epoch: 0, current: Arc::new(base), applied: 0 } }

    pub fn epoch(&self) -> u64 { self.epoch }
    pub fn applied(&self) -> usize { self.applied }

    /// Apply a batch of actions in order.
    pub fn apply(&mut self, batch: Vec<PlanogramAction>) {
        if batch.is_empty() { return; }
        self.applied += batch.len();
        self.current = Arc::new(reduce_all(&self.current, batch.iter()));
        self.epoch = self.epoch.saturating_add(1);
    }

    pub fn freeze(&self) -> PlanogramSnapshot { PlanogramSnapshot { epoch: self.epoch, config: Arc::clone(&self.current) } }
}

/// Product ids present in `next` whose `Arc` is not shared with `prev`.
pub fn changed_products(prev: &PlanogramConfig, next: &PlanogramConfig) -> Vec<String> {
    let before: FxHashSet<*const SourceProduct> = prev.products.iter().map(Arc::as_ptr).collect();
    next.products.iter().filter(|p| !before.contains(&Arc::as_ptr(p))).map(|p| p.id.clone()).collect()
}
