//! Plano projector façade (in-process).
//!
//! Frontends hand over a base planogram plus an action log; the projector derives
//! the current config, resolves catalog metadata once, and returns render
//! instances and collisions computed from the same snapshot.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use plano_catalog::{resolve_metadata, FixtureRepository, MetadataRepository};
use plano_core::{
    FacingConfig, MetadataMap, PlacementModelRegistry, PlanoError, PlanoResult, PlanogramAction, PlanogramConfig,
    SemanticPosition, ValidationResult,
};
use plano_physics::{CollisionEngine, IntentValidator, PlacementSuggester};
use plano_render::{PipelineConfig, PlanogramProcessor, ProcessedPlanogram};
use plano_store::PlanogramBuilder;
use serde::Serialize;
use tracing::info;

pub use plano_physics::{CollisionEntry, CollisionMap, PlacementSuggestion, SuggestionRequest};
pub use plano_render::ProcessingSummary;

/// Everything a frontend needs for one frame, all derived from `config`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSnapshot {
    /// Number of top-level actions folded into `config`; a BATCH counts once.
    pub epoch: u64,
    pub config: Arc<PlanogramConfig>,
    pub render: ProcessedPlanogram,
    pub collisions: CollisionMap,
}

pub struct PlanogramProjector {
    registry: Arc<PlacementModelRegistry>,
    catalog: Arc<dyn MetadataRepository>,
    fixtures: Arc<dyn FixtureRepository>,
    pipeline: PlanogramProcessor,
}

impl PlanogramProjector {
    /// Built-in placement models and `PipelineConfig::default()`.
    pub fn new(catalog: Arc<dyn MetadataRepository>, fixtures: Arc<dyn FixtureRepository>) -> Self {
        Self::from_config(PipelineConfig::default(), catalog, fixtures)
    }

    /// Built-in placement models tuned by `config`.
    pub fn from_config(
        config: PipelineConfig,
        catalog: Arc<dyn MetadataRepository>,
        fixtures: Arc<dyn FixtureRepository>,
    ) -> Self {
        Self::with_parts(Arc::new(config.registry()), config, catalog, fixtures)
    }

    pub fn with_parts(
        registry: Arc<PlacementModelRegistry>,
        config: PipelineConfig,
        catalog: Arc<dyn MetadataRepository>,
        fixtures: Arc<dyn FixtureRepository>,
    ) -> Self {
        let pipeline = PlanogramProcessor::with_config(Arc::clone(&registry), config);
        Self { registry, catalog, fixtures, pipeline }
    }

    pub fn registry(&self) -> &PlacementModelRegistry { &self.registry }

    pub fn pipeline(&self) -> &PlanogramProcessor { &self.pipeline }

    fn derive(base: &PlanogramConfig, actions: &[PlanogramAction]) -> (u64, Arc<PlanogramConfig>) {
        let mut builder = PlanogramBuilder::new(base.clone());
        for a in actions.iter() {
            builder.apply(vec![a.clone()]);
        }
        let snap = builder.freeze();
        (snap.epoch, snap.config)
    }

    /// Pure projection over already-resolved metadata.
    pub fn project_with_metadata(
        &self,
        base: &PlanogramConfig,
        actions: &[PlanogramAction],
        metadata: &MetadataMap,
    ) -> PlanoResult<ProjectionSnapshot> {
        let (epoch, config) = Self::derive(base, actions);
        let render = self.pipeline.process(&config, metadata)?;
        let collisions = CollisionEngine::new(&config, metadata).get_collisions();
        Ok(ProjectionSnapshot { epoch, config, render, collisions })
    }

    /// Derive, resolve every distinct sku once, then project.
    pub async fn project(&self, base: &PlanogramConfig, actions: &[PlanogramAction]) -> PlanoResult<ProjectionSnapshot> {
        let t0 = Instant::now();
        let (epoch, config) = Self::derive(base, actions);
        let metadata = resolve_metadata(self.catalog.as_ref(), &config.skus()).await;
        let render = self.pipeline.process(&config, &metadata)?;
        let collisions = CollisionEngine::new(&config, &metadata).get_collisions();
        info!(
            actions = actions.len(),
            instances = render.render_instances.len(),
            colliding = collisions.len(),
            took_ms = %t0.elapsed().as_millis(),
            "api: project ok"
        );
        Ok(ProjectionSnapshot { epoch, config, render, collisions })
    }

    /// Would `action` be sound on top of `base` + `actions`? Nothing is committed.
    pub async fn validate_intent(
        &self,
        base: &PlanogramConfig,
        actions: &[PlanogramAction],
        action: &PlanogramAction,
    ) -> ValidationResult {
        let (_, config) = Self::derive(base, actions);
        let mut skus = config.skus();
        skus.extend(added_skus(std::slice::from_ref(action)));
        let metadata = resolve_metadata(self.catalog.as_ref(), &skus).await;
        let result = IntentValidator::new(&metadata).validate_action(&config, action);
        info!(kind = action.kind(), valid = result.valid, errors = result.errors.len(), "api: validate_intent");
        result
    }

    /// First free shelf slot for `request.sku`, honouring the request's pending edits.
    pub async fn suggest_placement(
        &self,
        base: &PlanogramConfig,
        actions: &[PlanogramAction],
        request: &SuggestionRequest,
    ) -> Option<PlacementSuggestion> {
        let (_, config) = Self::derive(base, actions);
        let mut skus = config.skus();
        skus.push(request.sku.clone());
        skus.extend(added_skus(&request.pending));
        let metadata = resolve_metadata(self.catalog.as_ref(), &skus).await;
        let found = PlacementSuggester::new(&config, &metadata).suggest(request);
        info!(sku = %request.sku, found = found.is_some(), "api: suggest_placement");
        found
    }

    /// Drag-time check: what would `sku` hit at `position`?
    pub async fn check_collision(
        &self,
        config: &PlanogramConfig,
        position: &SemanticPosition,
        sku: &str,
        facings: Option<FacingConfig>,
        exclude_id: Option<&str>,
    ) -> Vec<CollisionEntry> {
        let mut skus = config.skus();
        skus.push(sku.to_string());
        let metadata = resolve_metadata(self.catalog.as_ref(), &skus).await;
        CollisionEngine::new(config, &metadata).check_collision(position, sku, facings, exclude_id)
    }

    /// Empty planogram on the catalog's fixture template for `fixture_type`.
    pub async fn new_planogram(&self, fixture_type: &str) -> PlanoResult<PlanogramConfig> {
        let fixture = self
            .fixtures
            .get_by_type(fixture_type)
            .await
            .map_err(|e| PlanoError::Catalog(e.to_string()))?
            .ok_or_else(|| PlanoError::FixtureNotFound(fixture_type.to_string()))?;
        fixture.kind()?;
        self.registry.resolve(&fixture.placement_model)?;
        Ok(PlanogramConfig { fixture, products: Vec::new() })
    }
}

fn added_skus(actions: &[PlanogramAction]) -> Vec<String> {
    actions
        .iter()
        .flat_map(|a| a.flatten())
        .filter_map(|a| match a {
            PlanogramAction::ProductAdd { product } => Some(product.sku.clone()),
            _ => None,
        })
        .collect()
}
