//! Pipeline stage abstraction.
//!
//! Each stage is a pure step over one expanded instance. Stages share nothing but
//! the read-only `StageContext`, so instances can be processed in any order.

use plano_core::{FixtureConfig, FixtureKind, PlacementModel, PlanoResult, RenderInstance};

use crate::config::PipelineConfig;

/// Read-only inputs every stage may consult.
pub struct StageContext<'a> {
    pub fixture: &'a FixtureConfig,
    pub kind: FixtureKind,
    pub model: &'a dyn PlacementModel,
    pub config: &'a PipelineConfig,
    /// Lowest shelf index on the fixture, if it has shelves.
    pub bottom_shelf: Option<u32>,
}

impl<'a> StageContext<'a> {
    pub fn new(fixture: &'a FixtureConfig, kind: FixtureKind, model: &'a dyn PlacementModel, config: &'a PipelineConfig) -> Self {
        let bottom_shelf = fixture.shelf_indices().first().copied();
        Self { fixture, kind, model, config, bottom_shelf }
    }
}

pub trait Stage: Send + Sync {
    /// Stage name for logs and error records.
    fn name(&self) -> &'static str;

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()>;
}
