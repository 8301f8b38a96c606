//! Plano core: planogram data model, action log, placement models and errors.

#![forbid(unsafe_code)]

pub mod action;
pub mod error;
pub mod geometry;
pub mod instance;
pub mod metadata;
pub mod model;
pub mod placement;
pub mod validation;

pub use action::{FixtureChanges, PlanogramAction, ShelfChanges};
pub use error::{ErrorCode, PlanoError, PlanoResult};
pub use geometry::{Bounds, Dims3D, Span, Vector2, Vector3, COLLISION_TOLERANCE_MM};
pub use instance::{DepthBucket, MaskSpec, MaskType, RenderInstance, ShadowProfile, ShadowSpec, ZLayer};
pub use metadata::{MetadataMap, ProductMetadata, ShadowType};
pub use model::{
    FacingConfig, FixtureConfig, FixtureKind, PlanogramConfig, PyramidAlignment, PyramidConfig, SemanticPosition,
    ShelfConfig, SourceProduct,
};
pub use placement::{PlacementModel, PlacementModelRegistry};
pub use validation::{ValidationIssue, ValidationResult};

pub mod prelude {
    pub use super::{
        Dims3D, ErrorCode, FacingConfig, FixtureConfig, MetadataMap, PlacementModel, PlacementModelRegistry,
        PlanoError, PlanoResult, PlanogramAction, PlanogramConfig, ProductMetadata, RenderInstance, SemanticPosition,
        SourceProduct, ValidationResult, Vector2, Vector3,
    };
}
