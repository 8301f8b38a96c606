//! Planogram processor: hydrate → expand → per-instance stages, with per-product
//! failure isolation.

use std::sync::Arc;
use std::time::Instant;

use plano_core::{ErrorCode, FixtureConfig, MetadataMap, PlacementModelRegistry, PlanoError, PlanoResult, PlanogramConfig, RenderInstance};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::expand::{expand, instance_count};
use crate::stage::{Stage, StageContext};
use crate::stages::{default_stages, hydrate};

/// One product or instance that was dropped from the render set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub sku: String,
    pub stage: String,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub total_instances: usize,
    pub valid_instances: usize,
    pub invalid_count: usize,
    pub processing_errors: Vec<ProcessingError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPlanogram {
    /// Valid instances only, in product then expansion order.
    pub render_instances: Vec<RenderInstance>,
    pub fixture: Arc<FixtureConfig>,
    pub metadata: ProcessingSummary,
}

impl ProcessedPlanogram {
    /// Instances in the order a drawing engine should paint them.
    pub fn paint_order(&self) -> Vec<&RenderInstance> {
        let mut v: Vec<&RenderInstance> = self.render_instances.iter().collect();
        v.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        v
    }
}

pub struct PlanogramProcessor {
    registry: Arc<PlacementModelRegistry>,
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl PlanogramProcessor {
    pub fn new(registry: Arc<PlacementModelRegistry>) -> Self { Self::with_config(registry, PipelineConfig::default()) }

    pub fn with_config(registry: Arc<PlacementModelRegistry>, config: PipelineConfig) -> Self {
        Self { registry, config, stages: default_stages() }
    }

    pub fn config(&self) -> &PipelineConfig { &self.config }

    pub fn stage_names(&self) -> Vec<&'static str> {
        std::iter::once("hydrate").chain(self.stages.iter().map(|s| s.name())).collect()
    }

    /// Project every product of `planogram`. `metadata` must already hold every sku the
    /// caller could resolve; absent skus fail only their own product.
    ///
    /// Returns `Err` only for structural problems: an unknown fixture type or an
    /// unregistered placement model.
    pub fn process(&self, planogram: &PlanogramConfig, metadata: &MetadataMap) -> PlanoResult<ProcessedPlanogram> {
        let started = Instant::now();
        let fixture = &planogram.fixture;
        let kind = fixture.kind()?;
        let model = self.registry.resolve(&fixture.placement_model)?;
        let ctx = StageContext::new(fixture, kind, model.as_ref(), &self.config);

        let mut render_instances = Vec::new();
        let mut summary = ProcessingSummary::default();

        for product in planogram.products.iter() {
            let template = match hydrate(product, metadata) {
                Ok(t) => t,
                Err(e) => {
                    summary.total_instances += 1;
                    warn!(product_id = %product.id, sku = %product.sku, error = %e, "hydrate failed; product skipped");
                    summary.processing_errors.push(ProcessingError {
                        product_id: product.id.clone(),
                        instance_id: None,
                        sku: product.sku.clone(),
                        stage: "hydrate".to_string(),
                        code: e.code(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let count = instance_count(&template);
            let limit = self.config.max_instances_per_product;
            if count > limit {
                summary.total_instances += 1;
                let e = PlanoError::ExpansionLimit { product_id: product.id.clone(), count, limit };
                warn!(product_id = %product.id, sku = %product.sku, count, limit, "expansion over limit; product skipped");
                summary.processing_errors.push(ProcessingError {
                    product_id: product.id.clone(),
                    instance_id: None,
                    sku: product.sku.clone(),
                    stage: "expand".to_string(),
                    code: e.code(),
                    message: e.to_string(),
                });
                continue;
            }

            for mut inst in expand(&template) {
                summary.total_instances += 1;
                match self.run_stages(&mut inst, &ctx) {
                    Ok(()) if inst.validation.valid => render_instances.push(inst),
                    Ok(()) => {
                        let first = inst.validation.first_error().cloned();
                        let message = inst.validation.errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
                        debug!(instance = %inst.id, %message, "instance failed validation");
                        summary.processing_errors.push(ProcessingError {
                            product_id: inst.source_product_id.clone(),
                            instance_id: Some(inst.id.clone()),
                            sku: inst.sku.clone(),
                            stage: "validate".to_string(),
                            code: first.map(|i| i.code).unwrap_or(ErrorCode::OutOfBounds),
                            message,
                        });
                    }
                    Err((stage, e)) => {
                        warn!(instance = %inst.id, stage, error = %e, "stage failed; instance skipped");
                        summary.processing_errors.push(ProcessingError {
                            product_id: inst.source_product_id.clone(),
                            instance_id: Some(inst.id.clone()),
                            sku: inst.sku.clone(),
                            stage: stage.to_string(),
                            code: e.code(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        summary.valid_instances = render_instances.len();
        summary.invalid_count = summary.processing_errors.len();

        metrics::counter!("pipeline_instances_total", summary.total_instances as u64);
        for e in summary.processing_errors.iter() {
            metrics::counter!("pipeline_errors_total", 1u64, "code" => e.code.as_str());
        }
        let elapsed = started.elapsed();
        metrics::histogram!("pipeline_process_ms", elapsed.as_secs_f64() * 1_000.0);
        info!(
            fixture = %kind,
            products = planogram.products.len(),
            total = summary.total_instances,
            valid = summary.valid_instances,
            invalid = summary.invalid_count,
            took_ms = %elapsed.as_millis(),
            "planogram processed"
        );

        Ok(ProcessedPlanogram { render_instances, fixture: Arc::clone(fixture), metadata: summary })
    }

    fn run_stages(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> Result<(), (&'static str, PlanoError)> {
        for stage in self.stages.iter() {
            stage.apply(inst, ctx).map_err(|e| (stage.name(), e))?;
        }
        Ok(())
    }
}
